//! Error taxonomy for the analytics core
//!
//! Every failure carries enough context (offending id, field, window) for the
//! caller to render a user-facing message. Nothing in the core logs or swallows
//! these; they are returned as-is.

use thiserror::Error;

use crate::storage::StorageError;

/// Entity names used in `NotFound` errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Farm,
    Batch,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Farm => write!(f, "farm"),
            EntityKind::Batch => write!(f, "batch"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid argument `{field}`: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: i64 },

    #[error("Insufficient data for batch {batch_id}: need {required} weighings, have {available}")]
    InsufficientData {
        batch_id: i64,
        required: usize,
        available: usize,
    },

    #[error("Computation cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AnalyticsError {
    pub fn invalid_argument(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    pub const fn farm_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: EntityKind::Farm,
            id,
        }
    }

    pub const fn batch_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: EntityKind::Batch,
            id,
        }
    }
}

pub type Result<T, E = AnalyticsError> = std::result::Result<T, E>;

//! Farm and batch (lote) entities

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

pub type FarmId = i64;
pub type BatchId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Farm {
    pub id: FarmId,
    pub name: String,
    #[serde(default)]
    pub location: String,
}

/// Lifecycle state of a batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    Active,
    Closed,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Active => write!(f, "ACTIVE"),
            BatchStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A cohort of birds raised together from placement to slaughter.
///
/// Child records reference the batch by `id` only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub id: BatchId,
    pub farm_id: FarmId,
    #[serde(default)]
    pub code: String,
    /// Placement date (age 0)
    pub start_date: NaiveDate,
    pub initial_count: u32,
    pub current_count: u32,
    /// Housing floor area (m²)
    pub area_m2: f64,
    #[serde(default)]
    pub genetic_line: String,
    #[serde(default)]
    pub status: BatchStatus,
}

impl Batch {
    /// Check the entity invariants: live count never exceeds placement and
    /// the housing area is a usable number.
    pub fn validate(&self) -> Result<()> {
        if self.current_count > self.initial_count {
            return Err(AnalyticsError::invalid_argument(
                "current_count",
                format!(
                    "batch {}: current count {} exceeds initial count {}",
                    self.id, self.current_count, self.initial_count
                ),
            ));
        }
        if !self.area_m2.is_finite() || self.area_m2 < 0.0 {
            return Err(AnalyticsError::invalid_argument(
                "area_m2",
                format!(
                    "batch {}: area must be a non-negative number, got {}",
                    self.id, self.area_m2
                ),
            ));
        }
        Ok(())
    }

    /// Age in days on `date`, counting the placement date as day 0
    pub fn age_on(&self, date: NaiveDate) -> i64 {
        (date - self.start_date).num_days()
    }

    /// Birds lost since placement
    pub const fn deaths(&self) -> u32 {
        self.initial_count.saturating_sub(self.current_count)
    }
}

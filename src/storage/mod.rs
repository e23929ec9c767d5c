//! Record source abstraction for the analytics core.
//!
//! The core reads through a single async capability, [`RecordSource`]:
//! look up a farm or batch, list a farm's batches, and fetch date-ordered rows
//! of one record kind for a batch or a whole farm. Two implementations ship:
//!
//! - [`MemoryStore`]: an immutable in-memory [`Dataset`] snapshot
//! - [`SledStore`]: a persistent sled database with ordered range scans

mod dataset;
mod memory;
mod sled_store;

pub use dataset::Dataset;
pub use memory::MemoryStore;
pub use sled_store::{ImportStats, SledStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Batch, BatchId, DateRange, Farm, FarmId, RecordKind, RecordRow, RecordScope};

/// Error type for record source operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Where analytics rows come from.
///
/// Implementations return rows ordered by date (timestamp for timestamped
/// rows) ascending; rows sharing a date keep their insertion order, which is
/// what makes "latest record of the day wins" well defined.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Look up a farm; `Ok(None)` when it does not exist.
    async fn query_farm(&self, id: FarmId) -> Result<Option<Farm>, StorageError>;

    /// Look up a batch; `Ok(None)` when it does not exist.
    async fn query_batch(&self, id: BatchId) -> Result<Option<Batch>, StorageError>;

    /// All batches housed on a farm, ordered by id.
    async fn farm_batches(&self, farm_id: FarmId) -> Result<Vec<Batch>, StorageError>;

    /// Rows of `kind` for `scope`, restricted to `range` when given.
    async fn query_records(
        &self,
        kind: RecordKind,
        scope: RecordScope,
        range: Option<DateRange>,
    ) -> Result<Vec<RecordRow>, StorageError>;

    /// Human-readable name for logging (e.g. "memory", "sled").
    fn source_name(&self) -> &str;
}

/// Check the batch-scoped row invariant: owned by a known batch, not dated
/// before that batch's placement, and with a recorded age matching its date.
pub(crate) fn check_row_against_batch(
    row: &RecordRow,
    batch: Option<&Batch>,
) -> Result<(), StorageError> {
    let Some(batch_id) = row.batch_id() else {
        return Ok(());
    };
    let Some(batch) = batch else {
        return Err(StorageError::Integrity(format!(
            "{} row references unknown batch {batch_id}",
            row.kind()
        )));
    };
    if row.date() < batch.start_date {
        return Err(StorageError::Integrity(format!(
            "{} row dated {} precedes batch {} start date {}",
            row.kind(),
            row.date(),
            batch.id,
            batch.start_date
        )));
    }
    let recorded_age = match row {
        RecordRow::Weighing(w) => Some(w.age_days),
        RecordRow::Mortality(m) => Some(m.age_days),
        _ => None,
    };
    if let Some(age_days) = recorded_age {
        let expected = batch.age_on(row.date());
        if i64::from(age_days) != expected {
            return Err(StorageError::Integrity(format!(
                "{} row dated {} records age {age_days}, batch {} is {expected} days old then",
                row.kind(),
                row.date(),
                batch.id
            )));
        }
    }
    Ok(())
}

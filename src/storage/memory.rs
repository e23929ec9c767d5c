//! In-memory record source over an immutable dataset snapshot

use async_trait::async_trait;
use std::sync::Arc;

use super::{Dataset, RecordSource, StorageError};
use crate::types::{Batch, BatchId, DateRange, Farm, FarmId, RecordKind, RecordRow, RecordScope};

/// Read-only store over a validated [`Dataset`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    data: Arc<Dataset>,
}

impl MemoryStore {
    /// Wrap a dataset after checking its integrity
    pub fn new(dataset: Dataset) -> Result<Self, StorageError> {
        dataset.validate()?;
        Ok(Self {
            data: Arc::new(dataset),
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    fn in_scope(&self, row: &RecordRow, scope: RecordScope) -> bool {
        match (scope, row) {
            (RecordScope::Farm(farm_id), RecordRow::Transaction(tx)) => tx.farm_id == farm_id,
            (RecordScope::Batch(batch_id), _) => row.batch_id() == Some(batch_id),
            (RecordScope::Farm(farm_id), _) => row
                .batch_id()
                .and_then(|id| self.data.batches.iter().find(|b| b.id == id))
                .is_some_and(|b| b.farm_id == farm_id),
        }
    }
}

#[async_trait]
impl RecordSource for MemoryStore {
    async fn query_farm(&self, id: FarmId) -> Result<Option<Farm>, StorageError> {
        Ok(self.data.farms.iter().find(|f| f.id == id).cloned())
    }

    async fn query_batch(&self, id: BatchId) -> Result<Option<Batch>, StorageError> {
        Ok(self.data.batches.iter().find(|b| b.id == id).cloned())
    }

    async fn farm_batches(&self, farm_id: FarmId) -> Result<Vec<Batch>, StorageError> {
        let mut batches: Vec<Batch> = self
            .data
            .batches
            .iter()
            .filter(|b| b.farm_id == farm_id)
            .cloned()
            .collect();
        batches.sort_by_key(|b| b.id);
        Ok(batches)
    }

    async fn query_records(
        &self,
        kind: RecordKind,
        scope: RecordScope,
        range: Option<DateRange>,
    ) -> Result<Vec<RecordRow>, StorageError> {
        let mut rows: Vec<RecordRow> = self
            .data
            .rows()
            .filter(|row| row.kind() == kind)
            .filter(|row| self.in_scope(row, scope))
            .filter(|row| range.map_or(true, |r| r.contains(row.date())))
            .collect();
        // Stable: same-instant rows keep file order
        rows.sort_by_key(RecordRow::timestamp);
        Ok(rows)
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}

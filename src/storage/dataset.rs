//! Serializable snapshot of a farm database

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::{check_row_against_batch, StorageError};
use crate::types::{
    AirQualityReading, Batch, BatchId, DailyFeedRecord, DailyWaterRecord, Farm,
    FinancialTransaction, MortalityRecord, RecordRow, SanitaryEvent, WeeklyWeighingRecord,
};

/// Every entity and record of a deployment, as loaded from JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub farms: Vec<Farm>,
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub feed: Vec<DailyFeedRecord>,
    #[serde(default)]
    pub water: Vec<DailyWaterRecord>,
    #[serde(default)]
    pub weighings: Vec<WeeklyWeighingRecord>,
    #[serde(default)]
    pub mortality: Vec<MortalityRecord>,
    #[serde(default)]
    pub sanitary: Vec<SanitaryEvent>,
    #[serde(default)]
    pub air_quality: Vec<AirQualityReading>,
    #[serde(default)]
    pub transactions: Vec<FinancialTransaction>,
}

impl Dataset {
    /// Load a dataset from a JSON file and check its integrity
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let contents = std::fs::read(path.as_ref())?;
        let dataset: Self = serde_json::from_slice(&contents)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// All records as untyped rows, in file order per kind
    pub fn rows(&self) -> impl Iterator<Item = RecordRow> + '_ {
        self.feed
            .iter()
            .cloned()
            .map(RecordRow::from)
            .chain(self.water.iter().cloned().map(RecordRow::from))
            .chain(self.weighings.iter().cloned().map(RecordRow::from))
            .chain(self.mortality.iter().cloned().map(RecordRow::from))
            .chain(self.sanitary.iter().cloned().map(RecordRow::from))
            .chain(self.air_quality.iter().cloned().map(RecordRow::from))
            .chain(self.transactions.iter().cloned().map(RecordRow::from))
    }

    /// Check entity invariants and ownership of every record
    pub fn validate(&self) -> Result<(), StorageError> {
        let farm_ids: Vec<_> = self.farms.iter().map(|f| f.id).collect();
        let mut batches: HashMap<BatchId, &Batch> = HashMap::with_capacity(self.batches.len());

        for batch in &self.batches {
            batch
                .validate()
                .map_err(|e| StorageError::Integrity(e.to_string()))?;
            if !farm_ids.contains(&batch.farm_id) {
                return Err(StorageError::Integrity(format!(
                    "batch {} references unknown farm {}",
                    batch.id, batch.farm_id
                )));
            }
            if batches.insert(batch.id, batch).is_some() {
                return Err(StorageError::Integrity(format!("duplicate batch id {}", batch.id)));
            }
        }

        for row in self.rows() {
            let owner = row.batch_id().and_then(|id| batches.get(&id).copied());
            check_row_against_batch(&row, owner)?;
        }

        for tx in &self.transactions {
            if !farm_ids.contains(&tx.farm_id) {
                return Err(StorageError::Integrity(format!(
                    "transaction {} references unknown farm {}",
                    tx.id, tx.farm_id
                )));
            }
        }

        Ok(())
    }
}

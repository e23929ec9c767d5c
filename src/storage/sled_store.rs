//! Persistent record source backed by sled.
//!
//! Layout (one tree per concern):
//! - `farms`: farm id → JSON `Farm`
//! - `batches`: batch id → JSON `Batch`
//! - `farm_batches`: farm id ++ batch id → empty (ownership index)
//! - one tree per record kind: owner id ++ timestamp millis ++ sequence → JSON `RecordRow`
//!
//! Ids and timestamps are encoded with the sign bit flipped, big-endian, so
//! byte order equals numeric order and a range scan over one owner yields rows
//! in date order. The trailing sequence number (sled `generate_id`) keeps
//! same-instant rows in insertion order.

use async_trait::async_trait;
use chrono::{Days, NaiveTime};
use std::path::Path;
use std::sync::Arc;

use super::{check_row_against_batch, Dataset, RecordSource, StorageError};
use crate::types::{Batch, BatchId, DateRange, Farm, FarmId, RecordKind, RecordRow, RecordScope};

const FARMS_TREE: &str = "farms";
const BATCHES_TREE: &str = "batches";
const FARM_BATCHES_TREE: &str = "farm_batches";

/// Counts of entities written by [`SledStore::import`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub farms: usize,
    pub batches: usize,
    pub records: usize,
}

#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
}

fn sortable_i64(v: i64) -> [u8; 8] {
    ((v as u64) ^ (1 << 63)).to_be_bytes()
}

fn record_tree_name(kind: RecordKind) -> String {
    format!("records_{}", kind.as_str())
}

fn owner_key(row: &RecordRow) -> Result<i64, StorageError> {
    match row {
        RecordRow::Transaction(tx) => Ok(tx.farm_id),
        other => other.batch_id().ok_or_else(|| {
            StorageError::Integrity(format!("{} row without a batch id", other.kind()))
        }),
    }
}

/// Millisecond bounds [lo, hi) covering every instant of the given dates
fn range_millis(range: Option<DateRange>) -> (i64, i64) {
    match range {
        Some(r) => {
            let lo = r.start.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
            let hi = r
                .end
                .checked_add_days(Days::new(1))
                .map_or(i64::MAX, |d| d.and_time(NaiveTime::MIN).and_utc().timestamp_millis());
            (lo, hi)
        }
        None => (i64::MIN, i64::MAX),
    }
}

impl SledStore {
    /// Open or create the record store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        tracing::info!("Record store opened at {:?}", path_ref);
        Ok(Self { db: Arc::new(db) })
    }

    pub fn insert_farm(&self, farm: &Farm) -> Result<(), StorageError> {
        let tree = self.db.open_tree(FARMS_TREE)?;
        tree.insert(sortable_i64(farm.id), serde_json::to_vec(farm)?)?;
        Ok(())
    }

    /// Store a batch. The owning farm must already exist.
    pub fn insert_batch(&self, batch: &Batch) -> Result<(), StorageError> {
        batch
            .validate()
            .map_err(|e| StorageError::Integrity(e.to_string()))?;
        if self.get_json::<Farm>(FARMS_TREE, batch.farm_id)?.is_none() {
            return Err(StorageError::Integrity(format!(
                "batch {} references unknown farm {}",
                batch.id, batch.farm_id
            )));
        }

        self.db
            .open_tree(BATCHES_TREE)?
            .insert(sortable_i64(batch.id), serde_json::to_vec(batch)?)?;

        let mut index_key = Vec::with_capacity(16);
        index_key.extend_from_slice(&sortable_i64(batch.farm_id));
        index_key.extend_from_slice(&sortable_i64(batch.id));
        self.db
            .open_tree(FARM_BATCHES_TREE)?
            .insert(index_key, Vec::<u8>::new())?;
        Ok(())
    }

    /// Store one record after checking it against its owning batch
    pub fn insert_record(&self, row: &RecordRow) -> Result<(), StorageError> {
        let owner = match row.batch_id() {
            Some(batch_id) => self.get_json::<Batch>(BATCHES_TREE, batch_id)?,
            None => None,
        };
        check_row_against_batch(row, owner.as_ref())?;
        if let RecordRow::Transaction(tx) = row {
            if self.get_json::<Farm>(FARMS_TREE, tx.farm_id)?.is_none() {
                return Err(StorageError::Integrity(format!(
                    "transaction {} references unknown farm {}",
                    tx.id, tx.farm_id
                )));
            }
        }

        let seq = self.db.generate_id()?;
        let mut key = Vec::with_capacity(24);
        key.extend_from_slice(&sortable_i64(owner_key(row)?));
        key.extend_from_slice(&sortable_i64(row.timestamp().timestamp_millis()));
        key.extend_from_slice(&seq.to_be_bytes());

        self.db
            .open_tree(record_tree_name(row.kind()))?
            .insert(key, serde_json::to_vec(row)?)?;
        Ok(())
    }

    /// Replace the store contents with a whole dataset and flush.
    ///
    /// The dataset is validated before anything is touched; importing the
    /// same dataset again leaves the store unchanged.
    pub fn import(&self, dataset: &Dataset) -> Result<ImportStats, StorageError> {
        dataset.validate()?;
        self.clear()?;
        let mut stats = ImportStats::default();

        for farm in &dataset.farms {
            self.insert_farm(farm)?;
            stats.farms += 1;
        }
        for batch in &dataset.batches {
            self.insert_batch(batch)?;
            stats.batches += 1;
        }
        for row in dataset.rows() {
            self.insert_record(&row)?;
            stats.records += 1;
        }

        self.db.flush()?;
        tracing::info!(
            farms = stats.farms,
            batches = stats.batches,
            records = stats.records,
            "Dataset imported"
        );
        Ok(stats)
    }

    /// Empty every entity and record tree
    fn clear(&self) -> Result<(), StorageError> {
        let record_trees = RecordKind::ALL.into_iter().map(record_tree_name);
        let entity_trees = [FARMS_TREE, BATCHES_TREE, FARM_BATCHES_TREE].map(String::from);
        let mut removed = 0;
        for name in entity_trees.into_iter().chain(record_trees) {
            let tree = self.db.open_tree(name)?;
            removed += tree.len();
            tree.clear()?;
        }
        if removed > 0 {
            tracing::info!(removed, "Cleared existing records before import");
        }
        Ok(())
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        tree: &str,
        id: i64,
    ) -> Result<Option<T>, StorageError> {
        match self.db.open_tree(tree)?.get(sortable_i64(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_owner(
        &self,
        kind: RecordKind,
        owner: i64,
        range: Option<DateRange>,
    ) -> Result<Vec<RecordRow>, StorageError> {
        let tree = self.db.open_tree(record_tree_name(kind))?;
        let (lo_ms, hi_ms) = range_millis(range);

        let mut lo = Vec::with_capacity(16);
        lo.extend_from_slice(&sortable_i64(owner));
        lo.extend_from_slice(&sortable_i64(lo_ms));
        let mut hi = Vec::with_capacity(16);
        hi.extend_from_slice(&sortable_i64(owner));
        hi.extend_from_slice(&sortable_i64(hi_ms));

        let mut rows = Vec::new();
        for item in tree.range(lo..hi) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice::<RecordRow>(&value)?);
        }
        Ok(rows)
    }

    fn batch_ids_for_farm(&self, farm_id: FarmId) -> Result<Vec<BatchId>, StorageError> {
        let index = self.db.open_tree(FARM_BATCHES_TREE)?;
        let mut ids = Vec::new();
        for item in index.scan_prefix(sortable_i64(farm_id)) {
            let (key, _) = item?;
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&key[8..16]);
            ids.push((u64::from_be_bytes(bytes) ^ (1 << 63)) as i64);
        }
        Ok(ids)
    }
}

#[async_trait]
impl RecordSource for SledStore {
    async fn query_farm(&self, id: FarmId) -> Result<Option<Farm>, StorageError> {
        self.get_json(FARMS_TREE, id)
    }

    async fn query_batch(&self, id: BatchId) -> Result<Option<Batch>, StorageError> {
        self.get_json(BATCHES_TREE, id)
    }

    async fn farm_batches(&self, farm_id: FarmId) -> Result<Vec<Batch>, StorageError> {
        let mut batches = Vec::new();
        for id in self.batch_ids_for_farm(farm_id)? {
            if let Some(batch) = self.get_json::<Batch>(BATCHES_TREE, id)? {
                batches.push(batch);
            }
        }
        Ok(batches)
    }

    async fn query_records(
        &self,
        kind: RecordKind,
        scope: RecordScope,
        range: Option<DateRange>,
    ) -> Result<Vec<RecordRow>, StorageError> {
        match (scope, kind) {
            (RecordScope::Batch(batch_id), RecordKind::Transaction) => {
                // Transactions are keyed by farm; filter the owning farm's rows
                let Some(batch) = self.get_json::<Batch>(BATCHES_TREE, batch_id)? else {
                    return Ok(Vec::new());
                };
                let mut rows = self.scan_owner(kind, batch.farm_id, range)?;
                rows.retain(|r| r.batch_id() == Some(batch_id));
                Ok(rows)
            }
            (RecordScope::Batch(batch_id), _) => self.scan_owner(kind, batch_id, range),
            (RecordScope::Farm(farm_id), RecordKind::Transaction) => {
                self.scan_owner(kind, farm_id, range)
            }
            (RecordScope::Farm(farm_id), _) => {
                let mut rows = Vec::new();
                for batch_id in self.batch_ids_for_farm(farm_id)? {
                    rows.extend(self.scan_owner(kind, batch_id, range)?);
                }
                rows.sort_by_key(RecordRow::timestamp);
                Ok(rows)
            }
        }
    }

    fn source_name(&self) -> &str {
        "sled"
    }
}

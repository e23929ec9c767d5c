//! Sled Record Store Tests
//!
//! Imports the shared fixture into an on-disk sled store and checks that it
//! answers every query exactly like the in-memory source, survives a reopen,
//! and refuses rows that break batch ownership.

mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use common::{date, march};
use poultry_ops::types::{DailyFeedRecord, MortalityRecord, RecordKind, RecordRow, RecordScope};
use poultry_ops::{
    AnalyticsConfig, DateRange, MemoryStore, RecordSource, ReportAggregationService, SledStore,
    StorageError,
};

fn imported_store(dir: &tempfile::TempDir) -> SledStore {
    let store = SledStore::open(dir.path().join("records")).expect("open sled");
    let stats = store.import(&common::dataset()).expect("import fixture");
    assert_eq!(stats.farms, 2);
    assert_eq!(stats.batches, 3);
    store
}

// ============================================================================
// Query Parity
// ============================================================================

#[tokio::test]
async fn sled_matches_memory_for_every_kind_and_scope() {
    let dir = tempfile::tempdir().unwrap();
    let sled = imported_store(&dir);
    let memory = MemoryStore::new(common::dataset()).unwrap();

    let scopes = [
        RecordScope::Farm(1),
        RecordScope::Farm(2),
        RecordScope::Batch(10),
        RecordScope::Batch(11),
    ];
    let ranges = [
        None,
        Some(DateRange::new(date(2024, 3, 3), date(2024, 3, 15)).unwrap()),
    ];

    for kind in RecordKind::ALL {
        for scope in scopes {
            for range in ranges {
                let expected = memory.query_records(kind, scope, range).await.unwrap();
                let actual = sled.query_records(kind, scope, range).await.unwrap();
                assert_eq!(actual, expected, "{kind} {scope:?} {range:?}");
            }
        }
    }
}

#[tokio::test]
async fn sled_entity_lookups_match_memory() {
    let dir = tempfile::tempdir().unwrap();
    let sled = imported_store(&dir);
    let memory = MemoryStore::new(common::dataset()).unwrap();

    assert_eq!(sled.query_farm(1).await.unwrap(), memory.query_farm(1).await.unwrap());
    assert_eq!(sled.query_batch(11).await.unwrap(), memory.query_batch(11).await.unwrap());
    assert_eq!(sled.query_farm(99).await.unwrap(), None);
    assert_eq!(sled.query_batch(99).await.unwrap(), None);

    let ids: Vec<i64> = sled.farm_batches(1).await.unwrap().iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![10, 11]);
    assert!(sled.farm_batches(99).await.unwrap().is_empty());
}

#[tokio::test]
async fn reports_agree_across_sources() {
    let dir = tempfile::tempdir().unwrap();
    let sled: Arc<dyn RecordSource> = Arc::new(imported_store(&dir));
    let (start, end) = march();
    let cancel = CancellationToken::new();

    let from_sled = ReportAggregationService::new(sled, AnalyticsConfig::default())
        .general_report(1, start, end, &cancel)
        .await
        .unwrap();
    let from_memory =
        ReportAggregationService::new(common::memory_source(), AnalyticsConfig::default())
            .general_report(1, start, end, &cancel)
            .await
            .unwrap();

    assert_eq!(
        serde_json::to_value(&from_sled).unwrap(),
        serde_json::to_value(&from_memory).unwrap()
    );
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        imported_store(&dir);
    }
    let reopened = SledStore::open(dir.path().join("records")).unwrap();
    let rows = reopened
        .query_records(RecordKind::Transaction, RecordScope::Farm(1), None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(reopened.source_name(), "sled");
}

#[tokio::test]
async fn reimport_replaces_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let store = imported_store(&dir);
    let stats = store.import(&common::dataset()).unwrap();
    assert_eq!(stats.batches, 3);

    let feed = store
        .query_records(RecordKind::Feed, RecordScope::Batch(10), None)
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);

    let summary = ReportAggregationService::new(Arc::new(store), AnalyticsConfig::default())
        .aggregator()
        .consumption(10, None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.totals.total_feed_kg, 20.0);
}

#[tokio::test]
async fn reimport_drops_entities_missing_from_new_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let store = imported_store(&dir);

    let mut dataset = common::dataset();
    dataset.farms.retain(|f| f.id == 1);
    dataset.batches.retain(|b| b.farm_id == 1);
    dataset.feed.retain(|r| r.batch_id != 20);
    dataset.water.retain(|r| r.batch_id != 20);
    dataset.air_quality.retain(|r| r.batch_id != 20);
    dataset.transactions.retain(|t| t.farm_id == 1);
    store.import(&dataset).unwrap();

    assert_eq!(store.query_farm(2).await.unwrap(), None);
    assert_eq!(store.query_batch(20).await.unwrap(), None);
    assert!(store.farm_batches(2).await.unwrap().is_empty());
    let readings = store
        .query_records(RecordKind::AirQuality, RecordScope::Batch(20), None)
        .await
        .unwrap();
    assert!(readings.is_empty());
}

// ============================================================================
// Integrity
// ============================================================================

#[test]
fn record_before_batch_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = imported_store(&dir);

    let early = RecordRow::Feed(DailyFeedRecord {
        batch_id: 11,
        date: date(2024, 3, 10),
        quantity_kg: 5.0,
        live_birds: 1_000,
    });
    let err = store.insert_record(&early).unwrap_err();
    assert!(matches!(err, StorageError::Integrity(_)), "got {err}");
}

#[test]
fn record_for_unknown_batch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = imported_store(&dir);

    let orphan = RecordRow::Feed(DailyFeedRecord {
        batch_id: 77,
        date: date(2024, 3, 10),
        quantity_kg: 5.0,
        live_birds: 100,
    });
    assert!(matches!(
        store.insert_record(&orphan),
        Err(StorageError::Integrity(_))
    ));
}

#[test]
fn invalid_dataset_is_not_imported() {
    let dir = tempfile::tempdir().unwrap();
    let store = SledStore::open(dir.path().join("records")).unwrap();

    let mut dataset = common::dataset();
    dataset.batches[0].current_count = dataset.batches[0].initial_count + 1;
    assert!(matches!(
        store.import(&dataset),
        Err(StorageError::Integrity(_))
    ));
}

#[test]
fn memory_store_rejects_invalid_dataset() {
    let mut dataset = common::dataset();
    dataset.transactions[0].farm_id = 42;
    assert!(matches!(
        MemoryStore::new(dataset),
        Err(StorageError::Integrity(_))
    ));
}

#[test]
fn mortality_age_must_match_its_date() {
    // 2024-03-04 is age 3 for batch 10
    let inflated = MortalityRecord {
        batch_id: 10,
        date: date(2024, 3, 4),
        age_days: 70_000,
        deaths: 1,
        cause: String::new(),
        live_count: 1_969,
    };

    let mut dataset = common::dataset();
    dataset.mortality.push(inflated.clone());
    assert!(matches!(
        MemoryStore::new(dataset),
        Err(StorageError::Integrity(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    let store = imported_store(&dir);
    assert!(matches!(
        store.insert_record(&RecordRow::Mortality(inflated)),
        Err(StorageError::Integrity(_))
    ));
}

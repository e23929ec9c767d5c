//! Shared fixture for the integration tests
//!
//! Farm 1 houses batch 10 (placed 2024-03-01) and batch 11 (placed
//! 2024-03-15). Farm 2 houses batch 20 and exists to prove farm scoping.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use poultry_ops::types::{
    AirQualityReading, BatchStatus, DailyFeedRecord, DailyWaterRecord, FinancialTransaction,
    MortalityRecord, SanitaryEvent, SanitaryEventType, TransactionKind, WeeklyWeighingRecord,
};
use poultry_ops::{Batch, Dataset, Farm, MemoryStore, RecordSource};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// 2024-03-01 00:00 to 2024-03-31 23:59:59
pub fn march() -> (DateTime<Utc>, DateTime<Utc>) {
    (at(2024, 3, 1, 0, 0), Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap())
}

fn batch(id: i64, farm_id: i64, start: NaiveDate, initial: u32, current: u32, area: f64) -> Batch {
    Batch {
        id,
        farm_id,
        code: format!("L-{id}"),
        start_date: start,
        initial_count: initial,
        current_count: current,
        area_m2: area,
        genetic_line: "Cobb 500".to_string(),
        status: BatchStatus::Active,
    }
}

fn weighing(batch_id: i64, day: NaiveDate, age: u32, mean: f64) -> WeeklyWeighingRecord {
    WeeklyWeighingRecord {
        batch_id,
        date: day,
        age_days: age,
        sample_size: 50,
        mean_weight_g: mean,
        min_weight_g: mean * 0.85,
        max_weight_g: mean * 1.15,
        std_dev_g: mean * 0.08,
        sample_weights_g: Vec::new(),
    }
}

fn reading(batch_id: i64, when: DateTime<Utc>, temp: f64, nh3: f64) -> AirQualityReading {
    AirQualityReading {
        batch_id,
        timestamp: when,
        temperature_c: temp,
        humidity_percent: 60.0,
        ammonia_ppm: nh3,
        co2_ppm: 1_500.0,
        o2_percent: 20.9,
    }
}

fn tx(
    id: i64,
    farm_id: i64,
    when: DateTime<Utc>,
    kind: TransactionKind,
    category: &str,
    cents: i64,
) -> FinancialTransaction {
    FinancialTransaction {
        id,
        farm_id,
        batch_id: None,
        timestamp: when,
        kind,
        category: category.to_string(),
        description: String::new(),
        amount: Decimal::new(cents, 2),
    }
}

pub fn dataset() -> Dataset {
    let mut chicks = tx(1, 1, at(2024, 3, 1, 9, 0), TransactionKind::Expense, "chicks", 500_000);
    chicks.batch_id = Some(10);

    Dataset {
        farms: vec![
            Farm {
                id: 1,
                name: "Granja Boa Vista".to_string(),
                location: "Chapecó".to_string(),
            },
            Farm {
                id: 2,
                name: "Sítio Verde".to_string(),
                location: String::new(),
            },
        ],
        batches: vec![
            batch(10, 1, date(2024, 3, 1), 2_000, 1_970, 120.0),
            batch(11, 1, date(2024, 3, 15), 1_000, 995, 60.0),
            batch(20, 2, date(2024, 3, 1), 500, 500, 30.0),
        ],
        feed: vec![
            DailyFeedRecord {
                batch_id: 11,
                date: date(2024, 3, 16),
                quantity_kg: 10.0,
                live_birds: 1_000,
            },
            DailyFeedRecord {
                batch_id: 10,
                date: date(2024, 3, 2),
                quantity_kg: 20.0,
                live_birds: 2_000,
            },
            DailyFeedRecord {
                batch_id: 20,
                date: date(2024, 3, 2),
                quantity_kg: 5.0,
                live_birds: 500,
            },
        ],
        water: vec![DailyWaterRecord {
            batch_id: 10,
            date: date(2024, 3, 2),
            quantity_l: 40.0,
            live_birds: 2_000,
        }],
        weighings: vec![
            weighing(10, date(2024, 3, 8), 7, 180.0),
            weighing(10, date(2024, 3, 15), 14, 400.0),
            weighing(11, date(2024, 3, 22), 7, 175.0),
        ],
        mortality: vec![
            MortalityRecord {
                batch_id: 10,
                date: date(2024, 3, 3),
                age_days: 2,
                deaths: 30,
                cause: "omphalitis".to_string(),
                live_count: 1_970,
            },
            MortalityRecord {
                batch_id: 11,
                date: date(2024, 3, 16),
                age_days: 1,
                deaths: 5,
                cause: String::new(),
                live_count: 995,
            },
        ],
        sanitary: vec![
            SanitaryEvent {
                batch_id: 11,
                date: date(2024, 3, 20),
                event_type: SanitaryEventType::Medication,
                product: "Enrofloxacin".to_string(),
                route: "water".to_string(),
                dosage: "10 mg/kg".to_string(),
                cost: Decimal::new(12_000, 2),
            },
            SanitaryEvent {
                batch_id: 10,
                date: date(2024, 3, 8),
                event_type: SanitaryEventType::Vaccination,
                product: "Gumboro".to_string(),
                route: "water".to_string(),
                dosage: "1 dose".to_string(),
                cost: Decimal::new(35_000, 2),
            },
        ],
        air_quality: vec![
            reading(10, at(2024, 3, 3, 8, 0), 31.0, 12.0),
            reading(10, at(2024, 3, 3, 20, 0), 35.0, 28.0),
            reading(20, at(2024, 3, 3, 10, 0), 31.0, 60.0),
        ],
        transactions: vec![
            chicks,
            tx(2, 1, at(2024, 3, 10, 14, 0), TransactionKind::Expense, "feed", 80_000),
            tx(3, 1, at(2024, 3, 20, 15, 30), TransactionKind::Income, "manure", 120_000),
            tx(4, 1, at(2024, 4, 2, 11, 0), TransactionKind::Income, "birds", 30_000),
            tx(5, 2, at(2024, 3, 12, 8, 0), TransactionKind::Income, "eggs", 99_900),
        ],
    }
}

pub fn memory_source() -> Arc<dyn RecordSource> {
    Arc::new(MemoryStore::new(dataset()).expect("fixture passes integrity checks"))
}

//! Shared fixtures for unit tests

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::storage::{Dataset, MemoryStore};
use crate::types::*;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Batch 10 on farm 1: placed 2024-03-01, 2000 birds, 1880 alive, 120 m²
pub fn batch() -> Batch {
    Batch {
        id: 10,
        farm_id: 1,
        code: "L-2024-03".to_string(),
        start_date: date(2024, 3, 1),
        initial_count: 2000,
        current_count: 1880,
        area_m2: 120.0,
        genetic_line: "Cobb 500".to_string(),
        status: BatchStatus::Active,
    }
}

pub fn weighing(day: u32, age_days: u32, mean_weight_g: f64) -> WeeklyWeighingRecord {
    WeeklyWeighingRecord {
        batch_id: 10,
        date: date(2024, 3, 1) + chrono::Days::new(u64::from(day)),
        age_days,
        sample_size: 50,
        mean_weight_g,
        min_weight_g: mean_weight_g * 0.85,
        max_weight_g: mean_weight_g * 1.15,
        std_dev_g: mean_weight_g * 0.08,
        sample_weights_g: Vec::new(),
    }
}

pub fn feed(on: NaiveDate, quantity_kg: f64, live_birds: u32) -> DailyFeedRecord {
    DailyFeedRecord {
        batch_id: 10,
        date: on,
        quantity_kg,
        live_birds,
    }
}

pub fn water(on: NaiveDate, quantity_l: f64, live_birds: u32) -> DailyWaterRecord {
    DailyWaterRecord {
        batch_id: 10,
        date: on,
        quantity_l,
        live_birds,
    }
}

pub fn reading(day: u32, hour: u32, temperature_c: f64, ammonia_ppm: f64) -> AirQualityReading {
    let d = date(2024, 3, 1) + chrono::Days::new(u64::from(day));
    AirQualityReading {
        batch_id: 10,
        timestamp: Utc.from_utc_datetime(&d.and_hms_opt(hour, 0, 0).unwrap()),
        temperature_c,
        humidity_percent: 60.0,
        ammonia_ppm,
        co2_ppm: 1500.0,
        o2_percent: 20.9,
    }
}

/// One farm with one batch and a few days of every record kind
pub fn dataset() -> Dataset {
    Dataset {
        farms: vec![Farm {
            id: 1,
            name: "Granja Boa Vista".to_string(),
            location: "Chapecó".to_string(),
        }],
        batches: vec![batch()],
        feed: vec![
            feed(date(2024, 3, 2), 20.0, 400),
            feed(date(2024, 3, 3), 18.0, 600),
            // Second delivery the same day; its live count wins
            feed(date(2024, 3, 3), 12.0, 600),
        ],
        water: vec![
            water(date(2024, 3, 2), 40.0, 400),
            water(date(2024, 3, 3), 60.0, 600),
        ],
        weighings: vec![weighing(7, 7, 180.0), weighing(14, 14, 410.0)],
        mortality: vec![
            MortalityRecord {
                batch_id: 10,
                date: date(2024, 3, 3),
                age_days: 2,
                deaths: 30,
                cause: "omphalitis".to_string(),
                live_count: 1970,
            },
            MortalityRecord {
                batch_id: 10,
                date: date(2024, 3, 12),
                age_days: 11,
                deaths: 10,
                cause: "leg problems".to_string(),
                live_count: 1960,
            },
        ],
        sanitary: vec![SanitaryEvent {
            batch_id: 10,
            date: date(2024, 3, 8),
            event_type: SanitaryEventType::Vaccination,
            product: "Gumboro".to_string(),
            route: "drinking water".to_string(),
            dosage: "1 dose/bird".to_string(),
            cost: Decimal::new(35000, 2),
        }],
        air_quality: vec![reading(2, 8, 31.0, 12.0), reading(2, 20, 35.0, 28.0)],
        transactions: vec![
            FinancialTransaction {
                id: 1,
                farm_id: 1,
                batch_id: Some(10),
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
                kind: TransactionKind::Expense,
                category: "chicks".to_string(),
                description: "Day-old chicks".to_string(),
                amount: Decimal::new(500000, 2),
            },
            FinancialTransaction {
                id: 2,
                farm_id: 1,
                batch_id: None,
                timestamp: Utc.with_ymd_and_hms(2024, 3, 20, 15, 30, 0).unwrap(),
                kind: TransactionKind::Income,
                category: "manure".to_string(),
                description: "Litter sale".to_string(),
                amount: Decimal::new(120000, 2),
            },
        ],
    }
}

pub fn store() -> MemoryStore {
    MemoryStore::new(dataset()).unwrap()
}

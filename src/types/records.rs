//! Batch-scoped time-series records and the query vocabulary used to fetch them

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BatchId, FarmId};
use crate::error::{AnalyticsError, Result};

// ============================================================================
// Query vocabulary
// ============================================================================

/// Inclusive calendar-date window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AnalyticsError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Calendar-date window covering an inclusive UTC instant range
    pub fn from_utc(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(AnalyticsError::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self {
            start: start.date_naive(),
            end: end.date_naive(),
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Kind of record requested from a [`RecordSource`](crate::storage::RecordSource)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Feed,
    Water,
    Weighing,
    Mortality,
    Sanitary,
    AirQuality,
    Transaction,
}

impl RecordKind {
    pub const ALL: [RecordKind; 7] = [
        RecordKind::Feed,
        RecordKind::Water,
        RecordKind::Weighing,
        RecordKind::Mortality,
        RecordKind::Sanitary,
        RecordKind::AirQuality,
        RecordKind::Transaction,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RecordKind::Feed => "feed",
            RecordKind::Water => "water",
            RecordKind::Weighing => "weighing",
            RecordKind::Mortality => "mortality",
            RecordKind::Sanitary => "sanitary",
            RecordKind::AirQuality => "air_quality",
            RecordKind::Transaction => "transaction",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whose records to fetch: a single batch, or every batch of a farm
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecordScope {
    Batch(BatchId),
    Farm(FarmId),
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyFeedRecord {
    pub batch_id: BatchId,
    pub date: NaiveDate,
    /// Feed delivered that day (kg)
    pub quantity_kg: f64,
    pub live_birds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyWaterRecord {
    pub batch_id: BatchId,
    pub date: NaiveDate,
    /// Water consumed that day (litres)
    pub quantity_l: f64,
    pub live_birds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyWeighingRecord {
    pub batch_id: BatchId,
    pub date: NaiveDate,
    pub age_days: u32,
    pub sample_size: u32,
    pub mean_weight_g: f64,
    pub min_weight_g: f64,
    pub max_weight_g: f64,
    pub std_dev_g: f64,
    /// Individual bird weights, when the scale export includes them
    #[serde(default)]
    pub sample_weights_g: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MortalityRecord {
    pub batch_id: BatchId,
    pub date: NaiveDate,
    pub age_days: u32,
    pub deaths: u32,
    #[serde(default)]
    pub cause: String,
    /// Live count after this record's deaths
    pub live_count: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SanitaryEventType {
    Vaccination,
    Medication,
}

impl std::fmt::Display for SanitaryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SanitaryEventType::Vaccination => write!(f, "vaccination"),
            SanitaryEventType::Medication => write!(f, "medication"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SanitaryEvent {
    pub batch_id: BatchId,
    pub date: NaiveDate,
    pub event_type: SanitaryEventType,
    pub product: String,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AirQualityReading {
    pub batch_id: BatchId,
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub ammonia_ppm: f64,
    pub co2_ppm: f64,
    pub o2_percent: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialTransaction {
    pub id: i64,
    pub farm_id: FarmId,
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    pub timestamp: DateTime<Utc>,
    pub kind: TransactionKind,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
}

// ============================================================================
// Untyped row returned by a record source
// ============================================================================

/// One row of any record kind, as returned by `RecordSource::query_records`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "row", rename_all = "snake_case")]
pub enum RecordRow {
    Feed(DailyFeedRecord),
    Water(DailyWaterRecord),
    Weighing(WeeklyWeighingRecord),
    Mortality(MortalityRecord),
    Sanitary(SanitaryEvent),
    AirQuality(AirQualityReading),
    Transaction(FinancialTransaction),
}

impl RecordRow {
    pub const fn kind(&self) -> RecordKind {
        match self {
            RecordRow::Feed(_) => RecordKind::Feed,
            RecordRow::Water(_) => RecordKind::Water,
            RecordRow::Weighing(_) => RecordKind::Weighing,
            RecordRow::Mortality(_) => RecordKind::Mortality,
            RecordRow::Sanitary(_) => RecordKind::Sanitary,
            RecordRow::AirQuality(_) => RecordKind::AirQuality,
            RecordRow::Transaction(_) => RecordKind::Transaction,
        }
    }

    /// Calendar date of the row (UTC date for timestamped rows)
    pub fn date(&self) -> NaiveDate {
        match self {
            RecordRow::Feed(r) => r.date,
            RecordRow::Water(r) => r.date,
            RecordRow::Weighing(r) => r.date,
            RecordRow::Mortality(r) => r.date,
            RecordRow::Sanitary(r) => r.date,
            RecordRow::AirQuality(r) => r.timestamp.date_naive(),
            RecordRow::Transaction(r) => r.timestamp.date_naive(),
        }
    }

    /// Ordering instant; date-only rows sort at midnight UTC
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            RecordRow::AirQuality(r) => r.timestamp,
            RecordRow::Transaction(r) => r.timestamp,
            other => other.date().and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// Owning batch; `None` for farm-level transactions
    pub const fn batch_id(&self) -> Option<BatchId> {
        match self {
            RecordRow::Feed(r) => Some(r.batch_id),
            RecordRow::Water(r) => Some(r.batch_id),
            RecordRow::Weighing(r) => Some(r.batch_id),
            RecordRow::Mortality(r) => Some(r.batch_id),
            RecordRow::Sanitary(r) => Some(r.batch_id),
            RecordRow::AirQuality(r) => Some(r.batch_id),
            RecordRow::Transaction(r) => r.batch_id,
        }
    }
}

/// A concrete record type that can be recovered from a [`RecordRow`]
pub trait TypedRecord: Sized + Send {
    const KIND: RecordKind;

    fn from_row(row: RecordRow) -> Option<Self>;
}

macro_rules! typed_record {
    ($ty:ty, $variant:ident) => {
        impl TypedRecord for $ty {
            const KIND: RecordKind = RecordKind::$variant;

            fn from_row(row: RecordRow) -> Option<Self> {
                match row {
                    RecordRow::$variant(r) => Some(r),
                    _ => None,
                }
            }
        }

        impl From<$ty> for RecordRow {
            fn from(r: $ty) -> Self {
                RecordRow::$variant(r)
            }
        }
    };
}

typed_record!(DailyFeedRecord, Feed);
typed_record!(DailyWaterRecord, Water);
typed_record!(WeeklyWeighingRecord, Weighing);
typed_record!(MortalityRecord, Mortality);
typed_record!(SanitaryEvent, Sanitary);
typed_record!(AirQualityReading, AirQuality);
typed_record!(FinancialTransaction, Transaction);

//! Report DTOs: plain aggregates of dates, decimals and strings

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    AirQualitySummary, BatchId, BatchWeighingSummary, ConsumptionTotals, FarmId,
    SanitaryEventType, SanitarySummary, TransactionKind,
};

// ============================================================================
// Financial
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub kind: TransactionKind,
    pub category: String,
    pub description: String,
    pub amount: Decimal,
    pub batch_id: Option<BatchId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub income: Decimal,
    pub expense: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialReport {
    pub farm_id: FarmId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    /// income − expense
    pub balance: Decimal,
    /// Sorted by category name
    pub by_category: Vec<CategoryTotal>,
    /// Sorted by timestamp ascending
    pub entries: Vec<FinancialEntry>,
}

// ============================================================================
// Sector rows
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionRow {
    pub batch_id: BatchId,
    pub date: NaiveDate,
    pub feed_kg: f64,
    pub water_l: f64,
    pub live_birds: u32,
    pub feed_per_bird_g: f64,
    pub water_per_bird_ml: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeighingRow {
    pub batch_id: BatchId,
    pub date: NaiveDate,
    pub age_days: u32,
    pub sample_size: u32,
    pub mean_weight_g: f64,
    pub standard_weight_g: f64,
    pub cv_percent: f64,
    pub uniformity_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SanitaryRow {
    pub batch_id: BatchId,
    pub date: NaiveDate,
    pub event_type: SanitaryEventType,
    pub product: String,
    pub route: String,
    pub dosage: String,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorRow {
    pub batch_id: BatchId,
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub ammonia_ppm: f64,
    pub co2_ppm: f64,
    pub o2_percent: f64,
}

// ============================================================================
// Batch performance & general report
// ============================================================================

/// Zootechnical snapshot of one batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchPerformance {
    pub batch_id: BatchId,
    pub code: String,
    pub age_days: u32,
    pub initial_count: u32,
    pub current_count: u32,
    pub viability_percent: f64,
    pub cumulative_mortality_percent: f64,
    pub total_feed_kg: f64,
    pub latest_weight_g: Option<f64>,
    pub standard_weight_g: f64,
    pub daily_gain_g: Option<f64>,
    pub feed_conversion_ratio: f64,
    pub density_kg_m2: f64,
    pub uniformity_percent: Option<f64>,
    pub production_efficiency_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralReport {
    pub farm_id: FarmId,
    pub farm_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub batch_count: usize,
    pub consumption: ConsumptionTotals,
    /// Per batch, ordered by batch id
    pub weighing: Vec<BatchWeighingSummary>,
    pub sanitary: SanitarySummary,
    pub sensor: AirQualitySummary,
    pub batches: Vec<BatchPerformance>,
    pub alert_count: usize,
    pub critical_alert_count: usize,
}

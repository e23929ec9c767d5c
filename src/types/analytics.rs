//! Computed batch analytics: rollups, summaries and growth projections

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BatchId, DateRange};

// ============================================================================
// Consumption
// ============================================================================

/// Feed and water for one batch on one date, duplicates already merged
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyConsumption {
    pub batch_id: BatchId,
    pub date: NaiveDate,
    pub feed_kg: f64,
    /// Live birds on the feed record (latest record of the date)
    pub feed_live_birds: u32,
    pub water_l: f64,
    /// Live birds on the water record (latest record of the date)
    pub water_live_birds: u32,
}

/// Population-weighted consumption totals over a window
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionTotals {
    pub days_recorded: usize,
    pub total_feed_kg: f64,
    pub total_water_l: f64,
    /// Σ live birds over days with a feed record
    pub feed_bird_days: u64,
    /// Σ live birds over days with a water record
    pub water_bird_days: u64,
    pub feed_per_bird_kg: f64,
    pub water_per_bird_l: f64,
    /// Litres of water per kg of feed
    pub water_to_feed_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionSummary {
    pub batch_id: BatchId,
    pub window: Option<DateRange>,
    pub totals: ConsumptionTotals,
    pub daily: Vec<DailyConsumption>,
}

// ============================================================================
// Mortality
// ============================================================================

/// Mortality for one week of age (week 1 = ages 0..=7)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyMortality {
    pub week: u32,
    pub first_age_day: u32,
    pub last_age_day: u32,
    pub deaths: u32,
    pub live_at_start: u32,
    pub rate_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CauseCount {
    pub cause: String,
    pub deaths: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MortalitySummary {
    pub batch_id: BatchId,
    pub initial_count: u32,
    pub current_count: u32,
    pub recorded_deaths: u32,
    /// (initial − current) / initial × 100
    pub cumulative_percent: f64,
    pub weeks: Vec<WeeklyMortality>,
    /// Deaths per cause, largest first
    pub by_cause: Vec<CauseCount>,
}

// ============================================================================
// Weighing, sanitary and air quality
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeighingSummary {
    pub weighings: usize,
    pub birds_sampled: u64,
    /// Mean weight across weighings, weighted by sample size (g)
    pub average_weight_g: f64,
    pub latest_age_days: Option<u32>,
    pub latest_mean_weight_g: Option<f64>,
    pub latest_cv_percent: Option<f64>,
    /// Uniformity of the latest weighing, when individual weights exist
    pub latest_uniformity_percent: Option<f64>,
    /// Gain per day between the first and last weighing (g)
    pub average_daily_gain_g: Option<f64>,
}

/// One batch's weighing summary inside a farm-wide report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchWeighingSummary {
    pub batch_id: BatchId,
    #[serde(flatten)]
    pub summary: WeighingSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SanitarySummary {
    pub vaccinations: usize,
    pub medications: usize,
    pub total_cost: Decimal,
    /// Distinct products, in first-use order
    pub products: Vec<String>,
}

/// Mean/min/max of one sensor parameter
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ParameterStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl ParameterStats {
    /// Stats over `values`; all zero when empty
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            mean: sum / count as f64,
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AirQualitySummary {
    pub readings: usize,
    pub temperature_c: ParameterStats,
    pub humidity_percent: ParameterStats,
    pub ammonia_ppm: ParameterStats,
    pub co2_ppm: ParameterStats,
    pub o2_percent: ParameterStats,
}

// ============================================================================
// Growth curve
// ============================================================================

/// Observed weighing next to the reference curve at the same age
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurvePoint {
    pub age_days: u32,
    pub observed_weight_g: f64,
    pub standard_weight_g: f64,
    /// (observed − standard) / standard × 100
    pub deviation_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightProjection {
    pub batch_id: BatchId,
    pub last_weighing_date: NaiveDate,
    pub last_weight_g: f64,
    pub daily_gain_g: f64,
    pub target_date: NaiveDate,
    pub target_age_days: u32,
    pub projected_weight_g: f64,
    pub standard_weight_g: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlaughterDateProjection {
    pub batch_id: BatchId,
    pub target_weight_g: f64,
    pub daily_gain_g: f64,
    pub projected_age_days: u32,
    pub projected_date: NaiveDate,
}

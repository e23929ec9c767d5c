//! Alert types produced by the anomaly detector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BatchId;

/// Alert severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertSeverity {
    Warning = 1,
    Critical = 2,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Metric category. Declaration order is the alert ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Temperature,
    Humidity,
    Ammonia,
    CarbonDioxide,
    Oxygen,
    Mortality,
    BodyWeight,
    Uniformity,
}

impl AlertCategory {
    /// Metric name reported on alerts of this category
    pub const fn metric_name(self) -> &'static str {
        match self {
            AlertCategory::Temperature => "temperature_c",
            AlertCategory::Humidity => "humidity_percent",
            AlertCategory::Ammonia => "ammonia_ppm",
            AlertCategory::CarbonDioxide => "co2_ppm",
            AlertCategory::Oxygen => "o2_percent",
            AlertCategory::Mortality => "weekly_mortality_percent",
            AlertCategory::BodyWeight => "mean_weight_g",
            AlertCategory::Uniformity => "uniformity_percent",
        }
    }
}

/// Accepted band for a metric; an open side is `None`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExpectedRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ExpectedRange {
    pub const fn at_most(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }

    pub const fn at_least(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    pub const fn between(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    /// Distance outside the band (0 when inside)
    pub fn excess(&self, value: f64) -> f64 {
        match (self.min, self.max) {
            (Some(min), _) if value < min => min - value,
            (_, Some(max)) if value > max => value - max,
            _ => 0.0,
        }
    }
}

impl std::fmt::Display for ExpectedRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "{min:.1}..{max:.1}"),
            (Some(min), None) => write!(f, ">= {min:.1}"),
            (None, Some(max)) => write!(f, "<= {max:.1}"),
            (None, None) => write!(f, "any"),
        }
    }
}

/// A single out-of-standard observation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub category: AlertCategory,
    pub metric: String,
    pub observed: f64,
    pub expected: ExpectedRange,
    pub batch_id: BatchId,
    pub observed_at: DateTime<Utc>,
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] batch {} {} = {:.2} (expected {}) at {}",
            self.severity,
            self.batch_id,
            self.metric,
            self.observed,
            self.expected,
            self.observed_at.format("%Y-%m-%d %H:%M")
        )
    }
}

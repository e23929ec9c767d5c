//! Poultry Ops: broiler batch analytics and farm reporting
//!
//! Turns raw batch records (feed, water, weighings, mortality, sanitary
//! events, air-quality readings and transactions) into performance metrics,
//! growth projections, alerts and date-ranged farm reports.
//!
//! ## Architecture
//!
//! - **Formulas** ([`formulas`]): pure zootechnical ratios (FCR, viability, uniformity, EPEF)
//! - **Standards** ([`standards`]): the Cobb 500 reference curve as a constant table
//! - **Storage** ([`storage`]): the [`RecordSource`] capability, in memory or on sled
//! - **Time series** ([`timeseries`]): population-weighted daily and weekly rollups
//! - **Growth** ([`growth`]): observed-vs-standard curves and slaughter projections
//! - **Anomaly** ([`anomaly`]): threshold rules producing ordered alerts
//! - **Reports** ([`reports`]): financial, general and sector reports for a farm window
//!
//! Components are wired by passing collaborators to constructors:
//!
//! ```ignore
//! let source: Arc<dyn RecordSource> = Arc::new(MemoryStore::new(dataset)?);
//! let reports = ReportAggregationService::new(source, AnalyticsConfig::load());
//! let report = reports.financial_report(farm_id, start, end, &cancel).await?;
//! ```

pub mod anomaly;
pub mod config;
pub mod error;
pub mod formulas;
pub mod growth;
pub mod reports;
pub mod standards;
pub mod storage;
pub mod timeseries;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export configuration
pub use config::{AnalyticsConfig, ConfigError};

// Re-export errors
pub use error::{AnalyticsError, EntityKind, Result};

// Re-export analytics components
pub use anomaly::AnomalyDetector;
pub use growth::GrowthCurveProjector;
pub use reports::{ReportAggregationService, ReportWindow};
pub use standards::{StandardCurve, COBB_500};
pub use timeseries::TimeSeriesAggregator;

// Re-export storage
pub use storage::{Dataset, MemoryStore, RecordSource, SledStore, StorageError};

// Re-export commonly used types
pub use types::{
    Alert, AlertCategory, AlertSeverity, Batch, BatchId, DateRange, Farm, FarmId, RecordKind,
    RecordRow, RecordScope,
};

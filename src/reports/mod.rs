//! Farm reports over a UTC date window
//!
//! [`ReportAggregationService`] composes the aggregator, growth projector and
//! anomaly detector into the report shapes the front end consumes:
//!
//! - **Financial**: income, expense, balance and an itemised ledger
//! - **General**: consumption, weighing, sanitary and sensor sections plus a
//!   per-batch performance snapshot
//! - **Sector**: one typed row list per concern (consumption, weighing,
//!   sanitary, sensor)
//!
//! ## Contract
//!
//! Every report runs the same guard sequence before doing any work:
//!
//! 1. `start > end` → `InvalidRange` (no I/O)
//! 2. cancelled token → `Cancelled`
//! 3. unknown farm → `NotFound`
//!
//! Bounds are inclusive. Timestamped rows (sensor readings, transactions) must
//! fall inside `[start, end]`; date-only rows are kept when their calendar date
//! lies in `[start.date(), end.date()]`. Cancellation is checked between units
//! of work and raced against every source query; a cancelled report returns
//! `Cancelled`, never a partial result.

mod financial;
mod general;
mod sector;

pub use financial::build_financial_report;
pub use general::compute_performance;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::anomaly::AnomalyDetector;
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::growth::GrowthCurveProjector;
use crate::storage::RecordSource;
use crate::timeseries::{cancellable, TimeSeriesAggregator};
use crate::types::{DateRange, Farm, FarmId};

/// Validated report window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Calendar dates covered, for date-only records
    pub dates: DateRange,
}

impl ReportWindow {
    /// ## Errors
    /// `InvalidRange` when `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            start,
            end,
            dates: DateRange::from_utc(start, end)?,
        })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(AnalyticsError::Cancelled)
    } else {
        Ok(())
    }
}

/// Builds farm reports from a record source
#[derive(Clone)]
pub struct ReportAggregationService {
    aggregator: TimeSeriesAggregator,
    projector: GrowthCurveProjector,
    detector: AnomalyDetector,
}

impl ReportAggregationService {
    /// Wire the analytics components over `source`, tuned by `config`
    pub fn new(source: Arc<dyn RecordSource>, config: AnalyticsConfig) -> Self {
        let projector = GrowthCurveProjector::cobb_500();
        let aggregator = TimeSeriesAggregator::new(source)
            .with_uniformity_tolerance(config.uniformity.tolerance_fraction);
        Self {
            aggregator,
            projector,
            detector: AnomalyDetector::new(config, projector),
        }
    }

    pub const fn aggregator(&self) -> &TimeSeriesAggregator {
        &self.aggregator
    }

    pub const fn projector(&self) -> &GrowthCurveProjector {
        &self.projector
    }

    /// Run the guard sequence shared by every farm report
    async fn open(
        &self,
        farm_id: FarmId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<(Farm, ReportWindow)> {
        let window = ReportWindow::new(start, end)?;
        ensure_active(cancel)?;
        let farm = cancellable(cancel, self.aggregator.source().query_farm(farm_id))
            .await?
            .ok_or(AnalyticsError::farm_not_found(farm_id))?;
        tracing::debug!(
            farm_id,
            start = %window.dates.start,
            end = %window.dates.end,
            "Report window opened"
        );
        Ok((farm, window))
    }
}

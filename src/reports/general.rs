//! General report, batch performance and farm-wide alerts

use chrono::{DateTime, NaiveDate, Utc};
use tokio_util::sync::CancellationToken;

use super::{ensure_active, ReportAggregationService, ReportWindow};
use crate::error::Result;
use crate::formulas;
use crate::growth::GrowthCurveProjector;
use crate::timeseries::{self, cancellable};
use crate::types::{
    AirQualityReading, Alert, AlertSeverity, Batch, BatchId, BatchPerformance, DailyFeedRecord,
    DailyWaterRecord, FarmId, GeneralReport, RecordScope, SanitaryEvent, WeeklyWeighingRecord,
};

fn age_u32(batch: &Batch, date: NaiveDate) -> u32 {
    u32::try_from(batch.age_on(date).max(0)).unwrap_or(u32::MAX)
}

/// Lifetime performance snapshot of a batch.
///
/// Age is taken from the latest weighing (falling back to the latest feed
/// record). Weight gain for FCR is the live flock mass now minus the placed
/// mass at the curve's day-0 weight.
pub fn compute_performance(
    batch: &Batch,
    feed: &[DailyFeedRecord],
    weighings: &[WeeklyWeighingRecord],
    projector: &GrowthCurveProjector,
    uniformity_tolerance: f64,
) -> BatchPerformance {
    let summary = timeseries::summarize_weighings(weighings, uniformity_tolerance);
    let total_feed_kg: f64 = feed.iter().map(|f| f.quantity_kg).sum();
    let age_days = summary
        .latest_age_days
        .or_else(|| feed.last().map(|f| age_u32(batch, f.date)))
        .unwrap_or(0);

    let latest_kg = summary.latest_mean_weight_g.map(|g| g / 1000.0);
    let placement_kg = projector.curve().first().map_or(0.0, |p| p.weight_g / 1000.0);
    let feed_conversion_ratio = latest_kg.map_or(0.0, |kg| {
        let gain_kg =
            f64::from(batch.current_count) * kg - f64::from(batch.initial_count) * placement_kg;
        formulas::feed_conversion_ratio(total_feed_kg, gain_kg)
    });
    let viability_percent = formulas::viability(batch.initial_count, batch.current_count);

    BatchPerformance {
        batch_id: batch.id,
        code: batch.code.clone(),
        age_days,
        initial_count: batch.initial_count,
        current_count: batch.current_count,
        viability_percent,
        cumulative_mortality_percent: formulas::cumulative_mortality(
            batch.initial_count,
            batch.current_count,
        ),
        total_feed_kg,
        latest_weight_g: summary.latest_mean_weight_g,
        standard_weight_g: projector.standard_at(age_days),
        daily_gain_g: summary.average_daily_gain_g,
        feed_conversion_ratio,
        density_kg_m2: formulas::current_density(
            batch.current_count,
            latest_kg.unwrap_or(0.0),
            batch.area_m2,
        ),
        uniformity_percent: summary.latest_uniformity_percent,
        production_efficiency_factor: formulas::production_efficiency_factor(
            viability_percent,
            latest_kg.unwrap_or(0.0),
            age_days,
            feed_conversion_ratio,
        ),
    }
}

impl ReportAggregationService {
    /// Performance snapshot for one batch over its whole history
    pub async fn batch_performance(
        &self,
        batch_id: BatchId,
        cancel: &CancellationToken,
    ) -> Result<BatchPerformance> {
        let batch = self.aggregator.batch(batch_id, cancel).await?;
        self.performance_of(&batch, cancel).await
    }

    async fn performance_of(
        &self,
        batch: &Batch,
        cancel: &CancellationToken,
    ) -> Result<BatchPerformance> {
        let scope = RecordScope::Batch(batch.id);
        let feed: Vec<DailyFeedRecord> = self.aggregator.fetch(scope, None, cancel).await?;
        let weighings: Vec<WeeklyWeighingRecord> =
            self.aggregator.fetch(scope, None, cancel).await?;
        Ok(compute_performance(
            batch,
            &feed,
            &weighings,
            &self.projector,
            self.aggregator.uniformity_tolerance(),
        ))
    }

    /// Alerts of every batch on the farm, ordered by category then time
    pub async fn farm_alerts(
        &self,
        farm_id: FarmId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Alert>> {
        let (_, window) = self.open(farm_id, start, end, cancel).await?;
        let batches = cancellable(cancel, self.aggregator.source().farm_batches(farm_id)).await?;
        self.alerts_for(&batches, &window, cancel).await
    }

    async fn alerts_for(
        &self,
        batches: &[Batch],
        window: &ReportWindow,
        cancel: &CancellationToken,
    ) -> Result<Vec<Alert>> {
        let mut alerts = Vec::new();
        for batch in batches {
            ensure_active(cancel)?;
            let found = self
                .detector
                .scan_batch_between(&self.aggregator, batch.id, window.start, window.end, cancel)
                .await?;
            alerts.extend(found);
        }
        alerts.sort_by_key(|a| (a.category, a.observed_at));
        Ok(alerts)
    }

    /// Consumption, weighing, sanitary and sensor sections for the window,
    /// plus a performance snapshot and alert tally per batch
    pub async fn general_report(
        &self,
        farm_id: FarmId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<GeneralReport> {
        let (farm, window) = self.open(farm_id, start, end, cancel).await?;
        let batches = cancellable(cancel, self.aggregator.source().farm_batches(farm_id)).await?;
        let scope = RecordScope::Farm(farm_id);
        let dates = Some(window.dates);

        let feed: Vec<DailyFeedRecord> = self.aggregator.fetch(scope, dates, cancel).await?;
        let water: Vec<DailyWaterRecord> = self.aggregator.fetch(scope, dates, cancel).await?;
        let consumption =
            timeseries::consumption_totals(&timeseries::daily_consumption(&feed, &water));
        ensure_active(cancel)?;

        let weighings: Vec<WeeklyWeighingRecord> =
            self.aggregator.fetch(scope, dates, cancel).await?;
        let weighing = timeseries::summarize_weighings_by_batch(
            &weighings,
            self.aggregator.uniformity_tolerance(),
        );
        ensure_active(cancel)?;

        let events: Vec<SanitaryEvent> = self.aggregator.fetch(scope, dates, cancel).await?;
        let sanitary = timeseries::summarize_sanitary(&events);
        ensure_active(cancel)?;

        let mut readings: Vec<AirQualityReading> =
            self.aggregator.fetch(scope, dates, cancel).await?;
        readings.retain(|r| window.contains(r.timestamp));
        let sensor = timeseries::summarize_air_quality(&readings);

        let mut performance = Vec::with_capacity(batches.len());
        for batch in &batches {
            ensure_active(cancel)?;
            performance.push(self.performance_of(batch, cancel).await?);
        }

        let alerts = self.alerts_for(&batches, &window, cancel).await?;
        ensure_active(cancel)?;

        tracing::debug!(
            farm_id,
            batches = batches.len(),
            alerts = alerts.len(),
            "General report built"
        );

        Ok(GeneralReport {
            farm_id,
            farm_name: farm.name,
            start: window.start,
            end: window.end,
            batch_count: batches.len(),
            consumption,
            weighing,
            sanitary,
            sensor,
            batches: performance,
            alert_count: alerts.len(),
            critical_alert_count: alerts
                .iter()
                .filter(|a| a.severity == AlertSeverity::Critical)
                .count(),
        })
    }
}

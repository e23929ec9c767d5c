//! Time-series rollups over raw batch records
//!
//! Turns per-day feed, water, mortality, weighing, sanitary and sensor rows
//! into date-bounded summaries for one batch. The aggregation steps are plain
//! functions over record slices; [`TimeSeriesAggregator`] only adds the
//! fetching (through a [`RecordSource`]) and cancellation around them.
//!
//! ## Policies
//!
//! - Per-bird consumption is population weighted: Σ quantity / Σ live birds per day.
//! - Records sharing a date: quantities are summed, the live count of the last
//!   record of that date wins.
//! - Missing days are skipped, never interpolated.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{AnalyticsError, Result};
use crate::formulas;
use crate::storage::{RecordSource, StorageError};
use crate::types::{
    AirQualityReading, AirQualitySummary, Batch, BatchId, BatchWeighingSummary, CauseCount,
    ConsumptionSummary, ConsumptionTotals, DailyConsumption, DailyFeedRecord, DailyWaterRecord,
    DateRange, MortalityRecord, MortalitySummary, ParameterStats, RecordScope, SanitaryEvent,
    SanitaryEventType, SanitarySummary, TypedRecord, WeeklyMortality, WeeklyWeighingRecord,
    WeighingSummary,
};

/// Await a storage call unless `cancel` fires first.
///
/// Cancellation is checked before the call is polled, so an already-cancelled
/// token never reaches the source.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, StorageError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AnalyticsError::Cancelled),
        res = fut => res.map_err(AnalyticsError::from),
    }
}

/// Fetches raw records for a batch and rolls them up
#[derive(Clone)]
pub struct TimeSeriesAggregator {
    source: Arc<dyn RecordSource>,
    uniformity_tolerance: f64,
}

impl TimeSeriesAggregator {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            uniformity_tolerance: formulas::DEFAULT_UNIFORMITY_TOLERANCE,
        }
    }

    /// Use a non-default uniformity band (fraction of the mean)
    #[must_use]
    pub const fn with_uniformity_tolerance(mut self, tolerance_fraction: f64) -> Self {
        self.uniformity_tolerance = tolerance_fraction;
        self
    }

    pub fn source(&self) -> &Arc<dyn RecordSource> {
        &self.source
    }

    pub const fn uniformity_tolerance(&self) -> f64 {
        self.uniformity_tolerance
    }

    /// Look up a batch, mapping a missing one to `NotFound`
    pub async fn batch(&self, batch_id: BatchId, cancel: &CancellationToken) -> Result<Batch> {
        cancellable(cancel, self.source.query_batch(batch_id))
            .await?
            .ok_or(AnalyticsError::batch_not_found(batch_id))
    }

    /// Typed rows of one record kind, date ascending
    pub async fn fetch<T: TypedRecord>(
        &self,
        scope: RecordScope,
        range: Option<DateRange>,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        let rows = cancellable(cancel, self.source.query_records(T::KIND, scope, range)).await?;
        tracing::debug!(
            kind = %T::KIND,
            ?scope,
            rows = rows.len(),
            source = self.source.source_name(),
            "Fetched records"
        );
        Ok(rows.into_iter().filter_map(T::from_row).collect())
    }

    /// Feed and water per day plus population-weighted totals.
    ///
    /// `window = None` covers the batch's whole lifetime.
    pub async fn consumption(
        &self,
        batch_id: BatchId,
        window: Option<DateRange>,
        cancel: &CancellationToken,
    ) -> Result<ConsumptionSummary> {
        self.batch(batch_id, cancel).await?;
        let scope = RecordScope::Batch(batch_id);
        let feed: Vec<DailyFeedRecord> = self.fetch(scope, window, cancel).await?;
        let water: Vec<DailyWaterRecord> = self.fetch(scope, window, cancel).await?;

        let daily = daily_consumption(&feed, &water);
        Ok(ConsumptionSummary {
            batch_id,
            window,
            totals: consumption_totals(&daily),
            daily,
        })
    }

    /// Weekly and cumulative mortality over the batch's whole history.
    ///
    /// Always reads every mortality record: the live count at the start of a
    /// week depends on all earlier deaths.
    pub async fn weekly_mortality(
        &self,
        batch_id: BatchId,
        cancel: &CancellationToken,
    ) -> Result<MortalitySummary> {
        let batch = self.batch(batch_id, cancel).await?;
        let records: Vec<MortalityRecord> =
            self.fetch(RecordScope::Batch(batch_id), None, cancel).await?;
        Ok(mortality_summary(&batch, &records))
    }

    pub async fn weighing_summary(
        &self,
        batch_id: BatchId,
        window: Option<DateRange>,
        cancel: &CancellationToken,
    ) -> Result<WeighingSummary> {
        self.batch(batch_id, cancel).await?;
        let weighings: Vec<WeeklyWeighingRecord> =
            self.fetch(RecordScope::Batch(batch_id), window, cancel).await?;
        Ok(summarize_weighings(&weighings, self.uniformity_tolerance))
    }

    pub async fn sanitary_summary(
        &self,
        batch_id: BatchId,
        window: Option<DateRange>,
        cancel: &CancellationToken,
    ) -> Result<SanitarySummary> {
        self.batch(batch_id, cancel).await?;
        let events: Vec<SanitaryEvent> =
            self.fetch(RecordScope::Batch(batch_id), window, cancel).await?;
        Ok(summarize_sanitary(&events))
    }

    pub async fn air_quality_summary(
        &self,
        batch_id: BatchId,
        window: Option<DateRange>,
        cancel: &CancellationToken,
    ) -> Result<AirQualitySummary> {
        self.batch(batch_id, cancel).await?;
        let readings: Vec<AirQualityReading> =
            self.fetch(RecordScope::Batch(batch_id), window, cancel).await?;
        Ok(summarize_air_quality(&readings))
    }
}

// ============================================================================
// Consumption
// ============================================================================

/// Merge feed and water rows into one entry per (batch, date).
///
/// Input rows must be in source order (date ascending, insertion order within
/// a date) for the "last live count wins" rule to hold.
pub fn daily_consumption(
    feed: &[DailyFeedRecord],
    water: &[DailyWaterRecord],
) -> Vec<DailyConsumption> {
    let mut days: BTreeMap<(BatchId, chrono::NaiveDate), DailyConsumption> = BTreeMap::new();
    let blank = |batch_id: BatchId, date: chrono::NaiveDate| DailyConsumption {
        batch_id,
        date,
        feed_kg: 0.0,
        feed_live_birds: 0,
        water_l: 0.0,
        water_live_birds: 0,
    };

    for r in feed {
        let day = days
            .entry((r.batch_id, r.date))
            .or_insert_with(|| blank(r.batch_id, r.date));
        day.feed_kg += r.quantity_kg;
        day.feed_live_birds = r.live_birds;
    }
    for r in water {
        let day = days
            .entry((r.batch_id, r.date))
            .or_insert_with(|| blank(r.batch_id, r.date));
        day.water_l += r.quantity_l;
        day.water_live_birds = r.live_birds;
    }

    // Order by date, then batch, for farm-wide listings
    let mut daily: Vec<DailyConsumption> = days.into_values().collect();
    daily.sort_by_key(|d| (d.date, d.batch_id));
    daily
}

/// Population-weighted totals over merged days
pub fn consumption_totals(daily: &[DailyConsumption]) -> ConsumptionTotals {
    let total_feed_kg: f64 = daily.iter().map(|d| d.feed_kg).sum();
    let total_water_l: f64 = daily.iter().map(|d| d.water_l).sum();
    let feed_bird_days: u64 = daily.iter().map(|d| u64::from(d.feed_live_birds)).sum();
    let water_bird_days: u64 = daily.iter().map(|d| u64::from(d.water_live_birds)).sum();

    let per_bird = |total: f64, bird_days: u64| {
        if bird_days == 0 {
            0.0
        } else {
            total / bird_days as f64
        }
    };

    ConsumptionTotals {
        days_recorded: daily.len(),
        total_feed_kg,
        total_water_l,
        feed_bird_days,
        water_bird_days,
        feed_per_bird_kg: per_bird(total_feed_kg, feed_bird_days),
        water_per_bird_l: per_bird(total_water_l, water_bird_days),
        water_to_feed_ratio: if total_feed_kg > 0.0 {
            total_water_l / total_feed_kg
        } else {
            0.0
        },
    }
}

// ============================================================================
// Mortality
// ============================================================================

/// Week of age a day falls into: days 1..=7 are week 1, placement day too
pub const fn week_of_age(age_days: u32) -> u32 {
    if age_days == 0 {
        1
    } else {
        age_days.div_ceil(7)
    }
}

/// Weekly mortality rates from week 1 to the last week with a record.
///
/// The live count at the start of week N is the placement count minus every
/// death recorded before week N. Weeks without records appear with zero deaths.
/// Ages are taken as recorded; record stores reject rows whose age disagrees
/// with their date.
pub fn rollup_weekly_mortality(
    initial_count: u32,
    records: &[MortalityRecord],
) -> Vec<WeeklyMortality> {
    let Some(last_week) = records.iter().map(|r| week_of_age(r.age_days)).max() else {
        return Vec::new();
    };

    let mut deaths_per_week = vec![0u32; last_week as usize];
    for r in records {
        let idx = (week_of_age(r.age_days) - 1) as usize;
        deaths_per_week[idx] = deaths_per_week[idx].saturating_add(r.deaths);
    }

    let mut dead_before = 0u32;
    let mut weeks = Vec::with_capacity(deaths_per_week.len());
    for (i, deaths) in deaths_per_week.into_iter().enumerate() {
        let week = i as u32 + 1;
        let live_at_start = initial_count.saturating_sub(dead_before);
        let rate_percent = if live_at_start == 0 {
            0.0
        } else {
            f64::from(deaths) / f64::from(live_at_start) * 100.0
        };
        weeks.push(WeeklyMortality {
            week,
            first_age_day: if week == 1 {
                0
            } else {
                (week - 1).saturating_mul(7).saturating_add(1)
            },
            last_age_day: week.saturating_mul(7),
            deaths,
            live_at_start,
            rate_percent,
        });
        dead_before = dead_before.saturating_add(deaths);
    }
    weeks
}

/// Full mortality picture for a batch
pub fn mortality_summary(batch: &Batch, records: &[MortalityRecord]) -> MortalitySummary {
    let mut causes: HashMap<&str, u32> = HashMap::new();
    for r in records {
        let cause = if r.cause.trim().is_empty() {
            "unspecified"
        } else {
            r.cause.trim()
        };
        *causes.entry(cause).or_default() += r.deaths;
    }
    let mut by_cause: Vec<CauseCount> = causes
        .into_iter()
        .map(|(cause, deaths)| CauseCount {
            cause: cause.to_string(),
            deaths,
        })
        .collect();
    by_cause.sort_by(|a, b| b.deaths.cmp(&a.deaths).then_with(|| a.cause.cmp(&b.cause)));

    MortalitySummary {
        batch_id: batch.id,
        initial_count: batch.initial_count,
        current_count: batch.current_count,
        recorded_deaths: records.iter().map(|r| r.deaths).sum(),
        cumulative_percent: formulas::cumulative_mortality(
            batch.initial_count,
            batch.current_count,
        ),
        weeks: rollup_weekly_mortality(batch.initial_count, records),
        by_cause,
    }
}

// ============================================================================
// Weighings
// ============================================================================

/// CV of one weighing (%): from individual weights when present, else from
/// the recorded standard deviation
pub fn weighing_cv(w: &WeeklyWeighingRecord) -> f64 {
    if w.sample_weights_g.len() >= 2 {
        return formulas::coefficient_of_variation(&w.sample_weights_g);
    }
    if w.mean_weight_g > 0.0 {
        w.std_dev_g / w.mean_weight_g * 100.0
    } else {
        0.0
    }
}

/// Uniformity of one weighing, only when individual weights were recorded
pub fn weighing_uniformity(w: &WeeklyWeighingRecord, tolerance_fraction: f64) -> Option<f64> {
    if w.sample_weights_g.is_empty() {
        None
    } else {
        Some(formulas::uniformity(&w.sample_weights_g, tolerance_fraction))
    }
}

/// Summary over one batch's date-ordered weighings
pub fn summarize_weighings(
    weighings: &[WeeklyWeighingRecord],
    tolerance_fraction: f64,
) -> WeighingSummary {
    let (Some(first), Some(latest)) = (weighings.first(), weighings.last()) else {
        return WeighingSummary::default();
    };

    let birds_sampled: u64 = weighings.iter().map(|w| u64::from(w.sample_size)).sum();
    let average_weight_g = if birds_sampled > 0 {
        weighings
            .iter()
            .map(|w| w.mean_weight_g * f64::from(w.sample_size))
            .sum::<f64>()
            / birds_sampled as f64
    } else {
        weighings.iter().map(|w| w.mean_weight_g).sum::<f64>() / weighings.len() as f64
    };

    let average_daily_gain_g = if weighings.len() >= 2 {
        formulas::daily_weight_gain(
            latest.mean_weight_g,
            first.mean_weight_g,
            f64::from(latest.age_days) - f64::from(first.age_days),
        )
        .ok()
    } else {
        None
    };

    WeighingSummary {
        weighings: weighings.len(),
        birds_sampled,
        average_weight_g,
        latest_age_days: Some(latest.age_days),
        latest_mean_weight_g: Some(latest.mean_weight_g),
        latest_cv_percent: Some(weighing_cv(latest)),
        latest_uniformity_percent: weighing_uniformity(latest, tolerance_fraction),
        average_daily_gain_g,
    }
}

/// Weighings from several batches, summarized batch by batch.
///
/// Gains and "latest" values only make sense within one flock, so rows are
/// grouped by batch id first. Input order is kept inside each batch.
pub fn summarize_weighings_by_batch(
    weighings: &[WeeklyWeighingRecord],
    tolerance_fraction: f64,
) -> Vec<BatchWeighingSummary> {
    let mut by_batch: BTreeMap<BatchId, Vec<WeeklyWeighingRecord>> = BTreeMap::new();
    for w in weighings {
        by_batch.entry(w.batch_id).or_default().push(w.clone());
    }
    by_batch
        .into_iter()
        .map(|(batch_id, rows)| BatchWeighingSummary {
            batch_id,
            summary: summarize_weighings(&rows, tolerance_fraction),
        })
        .collect()
}

// ============================================================================
// Sanitary & air quality
// ============================================================================

pub fn summarize_sanitary(events: &[SanitaryEvent]) -> SanitarySummary {
    let mut summary = SanitarySummary::default();
    for e in events {
        match e.event_type {
            SanitaryEventType::Vaccination => summary.vaccinations += 1,
            SanitaryEventType::Medication => summary.medications += 1,
        }
        summary.total_cost += e.cost;
        if !summary.products.contains(&e.product) {
            summary.products.push(e.product.clone());
        }
    }
    summary
}

pub fn summarize_air_quality(readings: &[AirQualityReading]) -> AirQualitySummary {
    AirQualitySummary {
        readings: readings.len(),
        temperature_c: ParameterStats::from_values(readings.iter().map(|r| r.temperature_c)),
        humidity_percent: ParameterStats::from_values(readings.iter().map(|r| r.humidity_percent)),
        ammonia_ppm: ParameterStats::from_values(readings.iter().map(|r| r.ammonia_ppm)),
        co2_ppm: ParameterStats::from_values(readings.iter().map(|r| r.co2_ppm)),
        o2_percent: ParameterStats::from_values(readings.iter().map(|r| r.o2_percent)),
    }
}

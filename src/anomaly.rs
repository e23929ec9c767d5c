//! Rule-based anomaly detection against industry thresholds
//!
//! Every rule compares one observation with a configured limit and yields at
//! most one [`Alert`]: past the limit is a warning, past the escalation limit
//! is critical. Rules never look at more than the observation at hand, so the
//! detector is stateless and evaluation is order independent; the output is
//! then sorted by category and time so callers can rely on its order.
//!
//! | Category | Warning | Critical |
//! |---|---|---|
//! | Temperature | outside age band | band ± `temperature_critical_delta_c` |
//! | Humidity | outside band | band ± `humidity_critical_delta_percent` |
//! | Ammonia | > 25 ppm | > 50 ppm |
//! | CO2 | > 2400 ppm | > 5000 ppm |
//! | O2 | < 19.5 % | < 18 % |
//! | Weekly mortality | > age ceiling | > ceiling × multiplier |
//! | Body weight | > 10 % under standard | > 20 % under standard |
//! | Uniformity | < 80 % | < 60 % |

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::growth::GrowthCurveProjector;
use crate::timeseries::{self, TimeSeriesAggregator};
use crate::types::{
    AirQualityReading, Alert, AlertCategory, AlertSeverity, Batch, BatchId, DateRange,
    ExpectedRange, MortalityRecord, RecordScope, WeeklyMortality, WeeklyWeighingRecord,
};

/// Evaluates batch observations against configured thresholds
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: AnalyticsConfig,
    projector: GrowthCurveProjector,
}

/// Severity for a value that must stay at or below `warning`
fn above(value: f64, warning: f64, critical: f64) -> Option<AlertSeverity> {
    if value > critical {
        Some(AlertSeverity::Critical)
    } else if value > warning {
        Some(AlertSeverity::Warning)
    } else {
        None
    }
}

/// Severity for a value that must stay at or above `warning`
fn below(value: f64, warning: f64, critical: f64) -> Option<AlertSeverity> {
    if value < critical {
        Some(AlertSeverity::Critical)
    } else if value < warning {
        Some(AlertSeverity::Warning)
    } else {
        None
    }
}

/// Severity for a value outside `band`, critical beyond `critical_delta`
fn outside(band: ExpectedRange, value: f64, critical_delta: f64) -> Option<AlertSeverity> {
    let excess = band.excess(value);
    if excess > critical_delta {
        Some(AlertSeverity::Critical)
    } else if excess > 0.0 {
        Some(AlertSeverity::Warning)
    } else {
        None
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn age_on(batch: &Batch, date: NaiveDate) -> u32 {
    u32::try_from(batch.age_on(date).max(0)).unwrap_or(u32::MAX)
}

impl AnomalyDetector {
    pub const fn new(config: AnalyticsConfig, projector: GrowthCurveProjector) -> Self {
        Self { config, projector }
    }

    /// All alerts for a batch's observations, sorted by category then time.
    ///
    /// Empty when nothing is out of range.
    pub fn evaluate(
        &self,
        batch: &Batch,
        readings: &[AirQualityReading],
        weeks: &[WeeklyMortality],
        weighings: &[WeeklyWeighingRecord],
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for reading in readings {
            self.check_reading(batch, reading, &mut alerts);
        }
        for week in weeks {
            self.check_week(batch, week, &mut alerts);
        }
        for weighing in weighings {
            self.check_weighing(weighing, &mut alerts);
        }

        // Stable: equal (category, time) keep evaluation order
        alerts.sort_by_key(|a| (a.category, a.observed_at));
        alerts
    }

    fn check_reading(&self, batch: &Batch, r: &AirQualityReading, alerts: &mut Vec<Alert>) {
        let aq = &self.config.air_quality;
        let mut push = |category, severity: Option<AlertSeverity>, observed, expected| {
            if let Some(severity) = severity {
                alerts.push(Alert {
                    severity,
                    category,
                    metric: AlertCategory::metric_name(category).to_string(),
                    observed,
                    expected,
                    batch_id: r.batch_id,
                    observed_at: r.timestamp,
                });
            }
        };

        let age = age_on(batch, r.timestamp.date_naive());
        if let Some(band) = aq.temperature_band_for(age) {
            let expected = ExpectedRange::between(band.min_c, band.max_c);
            push(
                AlertCategory::Temperature,
                outside(expected, r.temperature_c, aq.temperature_critical_delta_c),
                r.temperature_c,
                expected,
            );
        }

        let humidity = ExpectedRange::between(aq.humidity_min_percent, aq.humidity_max_percent);
        push(
            AlertCategory::Humidity,
            outside(humidity, r.humidity_percent, aq.humidity_critical_delta_percent),
            r.humidity_percent,
            humidity,
        );
        push(
            AlertCategory::Ammonia,
            above(r.ammonia_ppm, aq.ammonia_warning_ppm, aq.ammonia_critical_ppm),
            r.ammonia_ppm,
            ExpectedRange::at_most(aq.ammonia_warning_ppm),
        );
        push(
            AlertCategory::CarbonDioxide,
            above(r.co2_ppm, aq.co2_warning_ppm, aq.co2_critical_ppm),
            r.co2_ppm,
            ExpectedRange::at_most(aq.co2_warning_ppm),
        );
        push(
            AlertCategory::Oxygen,
            below(r.o2_percent, aq.o2_warning_percent, aq.o2_critical_percent),
            r.o2_percent,
            ExpectedRange::at_least(aq.o2_warning_percent),
        );
    }

    fn check_week(&self, batch: &Batch, week: &WeeklyMortality, alerts: &mut Vec<Alert>) {
        let Some(ceiling) = self.config.mortality.ceiling_for(week.last_age_day) else {
            return;
        };
        let severity = above(
            week.rate_percent,
            ceiling,
            ceiling * self.config.mortality.critical_multiplier,
        );
        if let Some(severity) = severity {
            let week_end = batch
                .start_date
                .checked_add_days(Days::new(u64::from(week.last_age_day)))
                .unwrap_or(batch.start_date);
            alerts.push(Alert {
                severity,
                category: AlertCategory::Mortality,
                metric: AlertCategory::Mortality.metric_name().to_string(),
                observed: week.rate_percent,
                expected: ExpectedRange::at_most(ceiling),
                batch_id: batch.id,
                observed_at: midnight(week_end),
            });
        }
    }

    fn check_weighing(&self, w: &WeeklyWeighingRecord, alerts: &mut Vec<Alert>) {
        let growth = &self.config.growth;
        let standard = self.projector.standard_at(w.age_days);
        if standard > 0.0 {
            let deficit_percent = (standard - w.mean_weight_g) / standard * 100.0;
            if let Some(severity) = above(
                deficit_percent,
                growth.weight_deficit_warning_percent,
                growth.weight_deficit_critical_percent,
            ) {
                alerts.push(Alert {
                    severity,
                    category: AlertCategory::BodyWeight,
                    metric: AlertCategory::BodyWeight.metric_name().to_string(),
                    observed: w.mean_weight_g,
                    expected: ExpectedRange::at_least(
                        standard * (1.0 - growth.weight_deficit_warning_percent / 100.0),
                    ),
                    batch_id: w.batch_id,
                    observed_at: midnight(w.date),
                });
            }
        }

        let u = &self.config.uniformity;
        if let Some(uniformity) = timeseries::weighing_uniformity(w, u.tolerance_fraction) {
            let severity = below(uniformity, u.min_acceptable_percent, u.critical_percent);
            if let Some(severity) = severity {
                alerts.push(Alert {
                    severity,
                    category: AlertCategory::Uniformity,
                    metric: AlertCategory::Uniformity.metric_name().to_string(),
                    observed: uniformity,
                    expected: ExpectedRange::at_least(u.min_acceptable_percent),
                    batch_id: w.batch_id,
                    observed_at: midnight(w.date),
                });
            }
        }
    }

    /// Fetch a batch's observations and evaluate them.
    ///
    /// Mortality weeks are computed over the whole history and kept when they
    /// overlap `window`.
    pub async fn scan_batch(
        &self,
        aggregator: &TimeSeriesAggregator,
        batch_id: BatchId,
        window: Option<DateRange>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Alert>> {
        self.scan(aggregator, batch_id, window, |_| true, cancel).await
    }

    /// Like [`scan_batch`](Self::scan_batch) over the inclusive instant
    /// window `[start, end]`.
    ///
    /// Readings outside the instants are dropped; weighings and mortality
    /// weeks are kept by calendar date.
    ///
    /// ## Errors
    /// `InvalidRange` when `start > end`.
    pub async fn scan_batch_between(
        &self,
        aggregator: &TimeSeriesAggregator,
        batch_id: BatchId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Alert>> {
        let dates = DateRange::from_utc(start, end)?;
        let within = |r: &AirQualityReading| start <= r.timestamp && r.timestamp <= end;
        self.scan(aggregator, batch_id, Some(dates), within, cancel).await
    }

    async fn scan(
        &self,
        aggregator: &TimeSeriesAggregator,
        batch_id: BatchId,
        window: Option<DateRange>,
        keep_reading: impl Fn(&AirQualityReading) -> bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Alert>> {
        let batch = aggregator.batch(batch_id, cancel).await?;
        let scope = RecordScope::Batch(batch_id);
        let mut readings: Vec<AirQualityReading> = aggregator.fetch(scope, window, cancel).await?;
        readings.retain(|r| keep_reading(r));
        let deaths: Vec<MortalityRecord> = aggregator.fetch(scope, None, cancel).await?;
        let weighings: Vec<WeeklyWeighingRecord> = aggregator.fetch(scope, window, cancel).await?;

        let mut weeks = timeseries::rollup_weekly_mortality(batch.initial_count, &deaths);
        if let Some(window) = window {
            weeks.retain(|w| week_overlaps(&batch, w, window));
        }

        let alerts = self.evaluate(&batch, &readings, &weeks, &weighings);
        tracing::debug!(batch_id, alerts = alerts.len(), "Batch scanned");
        Ok(alerts)
    }
}

fn week_overlaps(batch: &Batch, week: &WeeklyMortality, window: DateRange) -> bool {
    let day = |age: u32| {
        batch
            .start_date
            .checked_add_days(Days::new(u64::from(age)))
            .unwrap_or(NaiveDate::MAX)
    };
    day(week.first_age_day) <= window.end && day(week.last_age_day) >= window.start
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(AnalyticsConfig::default(), GrowthCurveProjector::cobb_500())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, date};
    use std::sync::Arc;

    fn week(week: u32, deaths: u32, live_at_start: u32) -> WeeklyMortality {
        WeeklyMortality {
            week,
            first_age_day: if week == 1 { 0 } else { 7 * (week - 1) + 1 },
            last_age_day: 7 * week,
            deaths,
            live_at_start,
            rate_percent: f64::from(deaths) / f64::from(live_at_start) * 100.0,
        }
    }

    #[test]
    fn test_no_alerts_for_normal_readings() {
        let detector = AnomalyDetector::default();
        let alerts = detector.evaluate(
            &testing::batch(),
            &[testing::reading(2, 8, 31.0, 12.0)],
            &[week(1, 10, 2000)],
            &[testing::weighing(7, 7, 185.0)],
        );
        assert!(alerts.is_empty(), "{alerts:?}");
    }

    #[test]
    fn test_ammonia_escalation() {
        let detector = AnomalyDetector::default();
        let batch = testing::batch();
        let warn = detector.evaluate(&batch, &[testing::reading(2, 8, 31.0, 30.0)], &[], &[]);
        assert_eq!(warn.len(), 1);
        assert_eq!(warn[0].category, AlertCategory::Ammonia);
        assert_eq!(warn[0].severity, AlertSeverity::Warning);
        assert_eq!(warn[0].expected, ExpectedRange::at_most(25.0));

        let crit = detector.evaluate(&batch, &[testing::reading(2, 8, 31.0, 55.0)], &[], &[]);
        assert_eq!(crit[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_temperature_band_follows_age() {
        let detector = AnomalyDetector::default();
        let batch = testing::batch();
        // 31 °C is brooding temperature: fine at day 2, critical at day 40 (band 18–22)
        assert!(detector
            .evaluate(&batch, &[testing::reading(2, 8, 31.0, 10.0)], &[], &[])
            .is_empty());
        let late = detector.evaluate(&batch, &[testing::reading(40, 8, 31.0, 10.0)], &[], &[]);
        assert_eq!(late[0].category, AlertCategory::Temperature);
        assert_eq!(late[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_mortality_ceiling_and_multiplier() {
        let detector = AnomalyDetector::default();
        let batch = testing::batch();
        // week 1 ceiling 1.0 %: 1.5 % warns, 2.5 % is critical
        let alerts = detector.evaluate(&batch, &[], &[week(1, 30, 2000), week(2, 50, 1970)], &[]);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(alerts[0].observed_at.date_naive(), date(2024, 3, 8));
        assert_eq!(alerts[1].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_body_weight_and_uniformity() {
        let detector = AnomalyDetector::default();
        let mut light = testing::weighing(14, 14, 350.0);
        light.sample_weights_g = vec![350.0, 200.0, 500.0, 350.0];
        let alerts = detector.evaluate(&testing::batch(), &[], &[], &[light]);
        assert_eq!(alerts.len(), 2);
        // 350 vs 465 g standard is a 24.7 % deficit
        assert_eq!(alerts[0].category, AlertCategory::BodyWeight);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[1].category, AlertCategory::Uniformity);
        assert_eq!(alerts[1].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_alerts_sorted_by_category_then_time() {
        let detector = AnomalyDetector::default();
        let readings = [
            testing::reading(3, 20, 36.0, 30.0),
            testing::reading(3, 6, 31.0, 60.0),
            testing::reading(2, 12, 36.0, 10.0),
        ];
        let alerts = detector.evaluate(&testing::batch(), &readings, &[], &[]);
        let order: Vec<(AlertCategory, u32)> = alerts
            .iter()
            .map(|a| (a.category, a.observed_at.format("%d%H").to_string().parse().unwrap()))
            .collect();
        assert_eq!(
            order,
            vec![
                (AlertCategory::Temperature, 312),
                (AlertCategory::Temperature, 420),
                (AlertCategory::Ammonia, 406),
                (AlertCategory::Ammonia, 420),
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_batch_on_fixture() {
        let aggregator = TimeSeriesAggregator::new(Arc::new(testing::store()));
        let alerts = AnomalyDetector::default()
            .scan_batch(&aggregator, 10, None, &CancellationToken::new())
            .await
            .unwrap();
        let categories: Vec<AlertCategory> = alerts.iter().map(|a| a.category).collect();
        assert_eq!(
            categories,
            vec![
                AlertCategory::Temperature,
                AlertCategory::Ammonia,
                AlertCategory::Mortality,
                AlertCategory::Mortality,
                AlertCategory::BodyWeight,
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_between_drops_readings_after_end() {
        let aggregator = TimeSeriesAggregator::new(Arc::new(testing::store()));
        let start = date(2024, 3, 1).and_time(NaiveTime::MIN).and_utc();
        let noon = date(2024, 3, 3).and_hms_opt(12, 0, 0).map(|t| t.and_utc()).unwrap();
        let alerts = AnomalyDetector::default()
            .scan_batch_between(&aggregator, 10, start, noon, &CancellationToken::new())
            .await
            .unwrap();
        // The 20:00 reading is out; week 1 mortality overlaps the dates
        let categories: Vec<AlertCategory> = alerts.iter().map(|a| a.category).collect();
        assert_eq!(categories, vec![AlertCategory::Mortality]);

        let err = AnomalyDetector::default()
            .scan_batch_between(&aggregator, 10, noon, start, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::AnalyticsError::InvalidRange { .. }));
    }
}

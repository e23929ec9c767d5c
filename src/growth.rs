//! Growth curve comparison and slaughter projections
//!
//! Observed weighings are laid against a reference [`StandardCurve`]; ages
//! between table entries are linearly interpolated, ages outside the table are
//! clamped to its first/last entry. Projections extrapolate linearly from the
//! latest two weighings.

use chrono::{Days, NaiveDate};
use tokio_util::sync::CancellationToken;

use crate::error::{AnalyticsError, Result};
use crate::formulas;
use crate::standards::{StandardCurve, COBB_500};
use crate::timeseries::TimeSeriesAggregator;
use crate::types::{
    Batch, BatchId, CurvePoint, RecordScope, SlaughterDateProjection, WeeklyWeighingRecord,
    WeightProjection,
};

/// Weighings needed to derive a growth rate
const MIN_WEIGHINGS_FOR_PROJECTION: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct GrowthCurveProjector {
    curve: StandardCurve,
}

impl Default for GrowthCurveProjector {
    fn default() -> Self {
        Self::cobb_500()
    }
}

impl GrowthCurveProjector {
    pub const fn new(curve: StandardCurve) -> Self {
        Self { curve }
    }

    pub const fn cobb_500() -> Self {
        Self::new(COBB_500)
    }

    pub const fn curve(&self) -> &StandardCurve {
        &self.curve
    }

    /// Expected weight (g) at `age_days`.
    ///
    /// Table ages return the table value exactly; other ages interpolate
    /// between the bracketing entries and clamp outside the table.
    pub fn standard_at(&self, age_days: u32) -> f64 {
        let points = self.curve.points;
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return 0.0;
        };
        if age_days <= first.age_days {
            return first.weight_g;
        }
        if age_days >= last.age_days {
            return last.weight_g;
        }

        match points.binary_search_by_key(&age_days, |p| p.age_days) {
            Ok(i) => points[i].weight_g,
            Err(i) => {
                // first.age < age < last.age, so 1 <= i < len
                let lo = &points[i - 1];
                let hi = &points[i];
                let t = f64::from(age_days - lo.age_days) / f64::from(hi.age_days - lo.age_days);
                lo.weight_g + (hi.weight_g - lo.weight_g) * t
            }
        }
    }

    /// One point per weighing, ordered by age
    pub fn observed_vs_standard(&self, weighings: &[WeeklyWeighingRecord]) -> Vec<CurvePoint> {
        let mut points: Vec<CurvePoint> = weighings
            .iter()
            .map(|w| {
                let standard = self.standard_at(w.age_days);
                CurvePoint {
                    age_days: w.age_days,
                    observed_weight_g: w.mean_weight_g,
                    standard_weight_g: standard,
                    deviation_percent: if standard > 0.0 {
                        (w.mean_weight_g - standard) / standard * 100.0
                    } else {
                        0.0
                    },
                }
            })
            .collect();
        points.sort_by_key(|p| p.age_days);
        points
    }

    /// Expected mean weight on `target_date`, extrapolated from the latest two
    /// weighings.
    ///
    /// ## Errors
    /// - `InsufficientData` with fewer than two weighings
    /// - `InvalidArgument` if `target_date` precedes the latest weighing, or
    ///   the latest two weighings share a date
    pub fn project_weight(
        &self,
        batch: &Batch,
        weighings: &[WeeklyWeighingRecord],
        target_date: NaiveDate,
    ) -> Result<WeightProjection> {
        let (previous, latest) = latest_two(batch.id, weighings)?;
        if target_date < latest.date {
            return Err(AnalyticsError::invalid_argument(
                "target_date",
                format!(
                    "{target_date} is before the latest weighing on {}",
                    latest.date
                ),
            ));
        }

        let daily_gain_g = gain_between(previous, latest)?;
        let days_ahead = (target_date - latest.date).num_days() as f64;
        let target_age_days = age_u32(batch.age_on(target_date));

        Ok(WeightProjection {
            batch_id: batch.id,
            last_weighing_date: latest.date,
            last_weight_g: latest.mean_weight_g,
            daily_gain_g,
            target_date,
            target_age_days,
            projected_weight_g: latest.mean_weight_g + daily_gain_g * days_ahead,
            standard_weight_g: self.standard_at(target_age_days),
        })
    }

    /// Date on which the batch reaches `target_weight_g` at its current rate.
    ///
    /// Partial days round up. A target already reached projects to the latest
    /// weighing date.
    ///
    /// ## Errors
    /// - `InsufficientData` with fewer than two weighings
    /// - `InvalidArgument` for a non-positive target, or a flock that is not
    ///   gaining weight
    pub fn project_slaughter_date(
        &self,
        batch: &Batch,
        weighings: &[WeeklyWeighingRecord],
        target_weight_g: f64,
    ) -> Result<SlaughterDateProjection> {
        let (previous, latest) = latest_two(batch.id, weighings)?;
        if !(target_weight_g > 0.0) || !target_weight_g.is_finite() {
            return Err(AnalyticsError::invalid_argument(
                "target_weight_g",
                format!("must be a positive weight, got {target_weight_g}"),
            ));
        }

        let daily_gain_g = gain_between(previous, latest)?;
        let remaining_g = target_weight_g - latest.mean_weight_g;

        let days_needed = if remaining_g <= 0.0 {
            0
        } else if daily_gain_g <= 0.0 {
            return Err(AnalyticsError::invalid_argument(
                "daily_gain_g",
                format!("flock is not gaining weight ({daily_gain_g:.1} g/day)"),
            ));
        } else {
            (remaining_g / daily_gain_g).ceil() as u64
        };

        let projected_date = latest.date.checked_add_days(Days::new(days_needed)).ok_or_else(|| {
            AnalyticsError::invalid_argument(
                "target_weight_g",
                format!("{target_weight_g} g is not reachable within the calendar"),
            )
        })?;

        Ok(SlaughterDateProjection {
            batch_id: batch.id,
            target_weight_g,
            daily_gain_g,
            projected_age_days: age_u32(batch.age_on(projected_date)),
            projected_date,
        })
    }

    // ========================================================================
    // Fetching variants
    // ========================================================================

    async fn batch_weighings(
        aggregator: &TimeSeriesAggregator,
        batch_id: BatchId,
        cancel: &CancellationToken,
    ) -> Result<(Batch, Vec<WeeklyWeighingRecord>)> {
        let batch = aggregator.batch(batch_id, cancel).await?;
        let weighings: Vec<WeeklyWeighingRecord> = aggregator
            .fetch(RecordScope::Batch(batch_id), None, cancel)
            .await?;
        Ok((batch, weighings))
    }

    pub async fn batch_curve(
        &self,
        aggregator: &TimeSeriesAggregator,
        batch_id: BatchId,
        cancel: &CancellationToken,
    ) -> Result<Vec<CurvePoint>> {
        let (_, weighings) = Self::batch_weighings(aggregator, batch_id, cancel).await?;
        Ok(self.observed_vs_standard(&weighings))
    }

    pub async fn project_batch_weight(
        &self,
        aggregator: &TimeSeriesAggregator,
        batch_id: BatchId,
        target_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<WeightProjection> {
        let (batch, weighings) = Self::batch_weighings(aggregator, batch_id, cancel).await?;
        self.project_weight(&batch, &weighings, target_date)
    }

    pub async fn project_batch_slaughter_date(
        &self,
        aggregator: &TimeSeriesAggregator,
        batch_id: BatchId,
        target_weight_g: f64,
        cancel: &CancellationToken,
    ) -> Result<SlaughterDateProjection> {
        let (batch, weighings) = Self::batch_weighings(aggregator, batch_id, cancel).await?;
        self.project_slaughter_date(&batch, &weighings, target_weight_g)
    }
}

/// Latest two weighings by date (ties keep input order)
fn latest_two(
    batch_id: BatchId,
    weighings: &[WeeklyWeighingRecord],
) -> Result<(&WeeklyWeighingRecord, &WeeklyWeighingRecord)> {
    let mut ordered: Vec<&WeeklyWeighingRecord> = weighings.iter().collect();
    ordered.sort_by_key(|w| w.date);
    match ordered.as_slice() {
        [.., previous, latest] => Ok((*previous, *latest)),
        _ => Err(AnalyticsError::InsufficientData {
            batch_id,
            required: MIN_WEIGHINGS_FOR_PROJECTION,
            available: ordered.len(),
        }),
    }
}

fn gain_between(previous: &WeeklyWeighingRecord, latest: &WeeklyWeighingRecord) -> Result<f64> {
    formulas::daily_weight_gain(
        latest.mean_weight_g,
        previous.mean_weight_g,
        (latest.date - previous.date).num_days() as f64,
    )
}

fn age_u32(age_days: i64) -> u32 {
    u32::try_from(age_days.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, date};
    use std::sync::Arc;

    fn history() -> Vec<WeeklyWeighingRecord> {
        vec![testing::weighing(7, 7, 180.0), testing::weighing(14, 14, 410.0)]
    }

    #[test]
    fn test_exact_table_age_returns_table_value() {
        let p = GrowthCurveProjector::cobb_500();
        for point in COBB_500.points {
            assert_eq!(p.standard_at(point.age_days), point.weight_g);
        }
    }

    #[test]
    fn test_interpolation_is_linear_and_idempotent() {
        let p = GrowthCurveProjector::cobb_500();
        // 185 + (465 − 185) × 3/7
        let expected = 185.0 + 280.0 * 3.0 / 7.0;
        assert!((p.standard_at(10) - expected).abs() < 1e-9);
        assert_eq!(p.standard_at(10), p.standard_at(10));
    }

    #[test]
    fn test_out_of_table_ages_clamp() {
        let p = GrowthCurveProjector::cobb_500();
        assert_eq!(p.standard_at(70), 4_051.0);
        assert_eq!(p.standard_at(0), 42.0);
    }

    #[test]
    fn test_observed_vs_standard_orders_by_age() {
        let p = GrowthCurveProjector::cobb_500();
        let mut weighings = history();
        weighings.reverse();
        let curve = p.observed_vs_standard(&weighings);
        assert_eq!(curve[0].age_days, 7);
        assert_eq!(curve[0].standard_weight_g, 185.0);
        assert!((curve[0].deviation_percent - (180.0 - 185.0) / 185.0 * 100.0).abs() < 1e-9);
        assert_eq!(curve[1].age_days, 14);
    }

    #[test]
    fn test_project_weight_from_last_two_weighings() {
        // 180 g at day 7, 410 g at day 14 → 640 g at day 21
        let p = GrowthCurveProjector::cobb_500();
        let projection = p
            .project_weight(&testing::batch(), &history(), date(2024, 3, 22))
            .unwrap();
        assert!((projection.projected_weight_g - 640.0).abs() < 1e-9);
        assert_eq!(projection.target_age_days, 21);
        assert_eq!(projection.standard_weight_g, 943.0);
    }

    #[test]
    fn test_projection_needs_two_weighings() {
        let p = GrowthCurveProjector::cobb_500();
        let err = p
            .project_weight(&testing::batch(), &history()[..1], date(2024, 3, 22))
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::InsufficientData { batch_id: 10, required: 2, available: 1 }
        ));
        let err = p.project_slaughter_date(&testing::batch(), &[], 2500.0).unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData { available: 0, .. }));
    }

    #[test]
    fn test_project_weight_rejects_past_target() {
        let p = GrowthCurveProjector::cobb_500();
        let err = p
            .project_weight(&testing::batch(), &history(), date(2024, 3, 10))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument { field: "target_date", .. }));
    }

    #[test]
    fn test_slaughter_date_rounds_days_up() {
        let p = GrowthCurveProjector::cobb_500();
        // (2000 − 410) / (230/7) = 48.39 → 49 days after 2024-03-15
        let projection = p
            .project_slaughter_date(&testing::batch(), &history(), 2000.0)
            .unwrap();
        assert_eq!(projection.projected_date, date(2024, 5, 3));
        assert_eq!(projection.projected_age_days, 63);
    }

    #[test]
    fn test_slaughter_target_already_reached() {
        let p = GrowthCurveProjector::cobb_500();
        let projection = p
            .project_slaughter_date(&testing::batch(), &history(), 300.0)
            .unwrap();
        assert_eq!(projection.projected_date, date(2024, 3, 15));
        assert_eq!(projection.projected_age_days, 14);
    }

    #[test]
    fn test_slaughter_date_rejects_weight_loss() {
        let p = GrowthCurveProjector::cobb_500();
        let losing = vec![testing::weighing(7, 7, 410.0), testing::weighing(14, 14, 400.0)];
        let err = p
            .project_slaughter_date(&testing::batch(), &losing, 2000.0)
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument { field: "daily_gain_g", .. }));
    }

    #[tokio::test]
    async fn test_project_batch_weight_fetches_history() {
        let aggregator = TimeSeriesAggregator::new(Arc::new(testing::store()));
        let projection = GrowthCurveProjector::cobb_500()
            .project_batch_weight(&aggregator, 10, date(2024, 3, 22), &CancellationToken::new())
            .await
            .unwrap();
        assert!((projection.projected_weight_g - 640.0).abs() < 1e-9);
    }
}

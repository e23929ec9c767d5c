//! Zootechnical performance formulas
//!
//! Pure, stateless functions over aggregate inputs. Every function is total:
//! a zero or negative denominator yields the documented sentinel (0.0) instead
//! of NaN/∞. The single exception is [`daily_weight_gain`], whose elapsed-days
//! argument is a caller error when non-positive.

use statrs::statistics::Statistics;

use crate::error::{AnalyticsError, Result};

/// Default uniformity band: ±10% of the sample mean
pub const DEFAULT_UNIFORMITY_TOLERANCE: f64 = 0.10;

/// Feed conversion ratio: kg of feed per kg of live weight gained.
///
/// Returns 0.0 when `total_weight_gain_kg <= 0` (no gain yet, or bad data).
pub fn feed_conversion_ratio(total_feed_kg: f64, total_weight_gain_kg: f64) -> f64 {
    if total_weight_gain_kg <= 0.0 || !total_weight_gain_kg.is_finite() {
        return 0.0;
    }
    let fcr = total_feed_kg / total_weight_gain_kg;
    if fcr.is_finite() && fcr > 0.0 {
        fcr
    } else {
        0.0
    }
}

/// Average daily gain between two weighings, in the unit of the weights.
///
/// ## Errors
/// `InvalidArgument` when `days_elapsed <= 0`.
pub fn daily_weight_gain(
    current_weight: f64,
    previous_weight: f64,
    days_elapsed: f64,
) -> Result<f64> {
    if !(days_elapsed > 0.0) {
        return Err(AnalyticsError::invalid_argument(
            "days_elapsed",
            format!("must be > 0, got {days_elapsed}"),
        ));
    }
    Ok((current_weight - previous_weight) / days_elapsed)
}

/// Viability: share of placed birds still alive (%), clamped to [0, 100].
pub fn viability(initial_count: u32, current_count: u32) -> f64 {
    if initial_count == 0 {
        return 0.0;
    }
    (f64::from(current_count) / f64::from(initial_count) * 100.0).clamp(0.0, 100.0)
}

/// Cumulative mortality since placement (%): (initial − current) / initial × 100.
pub fn cumulative_mortality(initial_count: u32, current_count: u32) -> f64 {
    if initial_count == 0 {
        return 0.0;
    }
    let deaths = initial_count.saturating_sub(current_count);
    f64::from(deaths) / f64::from(initial_count) * 100.0
}

/// Uniformity: share of sampled birds within ±`tolerance_fraction` of the
/// sample mean (%). Returns 0.0 for an empty sample.
pub fn uniformity(sample_weights: &[f64], tolerance_fraction: f64) -> f64 {
    if sample_weights.is_empty() {
        return 0.0;
    }
    let mean = sample_weights.mean();
    if !mean.is_finite() {
        return 0.0;
    }
    let band = mean * tolerance_fraction.abs();
    let within = sample_weights
        .iter()
        .filter(|w| (**w - mean).abs() <= band)
        .count();
    within as f64 / sample_weights.len() as f64 * 100.0
}

/// Stocking density (kg/m²). Returns 0.0 when `area_m2 <= 0`.
pub fn current_density(current_count: u32, avg_weight_kg: f64, area_m2: f64) -> f64 {
    if area_m2 <= 0.0 || !area_m2.is_finite() {
        return 0.0;
    }
    f64::from(current_count) * avg_weight_kg / area_m2
}

/// Coefficient of variation of a weight sample (%), using the sample
/// standard deviation. Returns 0.0 with fewer than two samples or a zero mean.
pub fn coefficient_of_variation(sample_weights: &[f64]) -> f64 {
    if sample_weights.len() < 2 {
        return 0.0;
    }
    let mean = sample_weights.mean();
    if mean.abs() < f64::EPSILON || !mean.is_finite() {
        return 0.0;
    }
    let cv = sample_weights.std_dev() / mean * 100.0;
    if cv.is_finite() {
        cv
    } else {
        0.0
    }
}

/// European Production Efficiency Factor:
/// viability(%) × live weight(kg) × 100 / (age(days) × FCR).
///
/// ## Expected Values
/// - Below 300: poor
/// - 350–400: good commercial flock
/// - Above 400: excellent
///
/// Returns 0.0 when age or FCR is zero.
pub fn production_efficiency_factor(
    viability_percent: f64,
    avg_weight_kg: f64,
    age_days: u32,
    fcr: f64,
) -> f64 {
    if age_days == 0 || fcr <= 0.0 {
        return 0.0;
    }
    viability_percent * avg_weight_kg * 100.0 / (f64::from(age_days) * fcr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fcr_guards_zero_gain() {
        assert_eq!(feed_conversion_ratio(0.0, 10.0), 0.0);
        assert_eq!(feed_conversion_ratio(100.0, 0.0), 0.0);
        assert_eq!(feed_conversion_ratio(100.0, -5.0), 0.0);
        assert!((feed_conversion_ratio(4_480.0, 2_800.0) - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_daily_weight_gain() {
        assert_eq!(daily_weight_gain(410.0, 180.0, 7.0).unwrap(), 230.0 / 7.0);
        assert!(matches!(
            daily_weight_gain(410.0, 180.0, 0.0),
            Err(AnalyticsError::InvalidArgument { field: "days_elapsed", .. })
        ));
        assert!(daily_weight_gain(410.0, 180.0, -1.0).is_err());
        assert!(daily_weight_gain(410.0, 180.0, f64::NAN).is_err());
    }

    #[test]
    fn test_viability_is_clamped() {
        assert_eq!(viability(2000, 1880), 94.0);
        assert_eq!(viability(0, 10), 0.0);
        assert_eq!(viability(100, 150), 100.0);
        assert_eq!(viability(100, 0), 0.0);
    }

    #[test]
    fn test_cumulative_mortality_after_120_deaths() {
        assert!((cumulative_mortality(2000, 1880) - 6.0).abs() < 1e-12);
        assert_eq!(cumulative_mortality(0, 0), 0.0);
        assert_eq!(cumulative_mortality(100, 120), 0.0);
    }

    #[test]
    fn test_uniformity() {
        // mean = 1000, band = 900..=1100
        let weights = [900.0, 950.0, 1000.0, 1050.0, 1100.0, 700.0, 1300.0, 1000.0];
        assert_eq!(uniformity(&weights, DEFAULT_UNIFORMITY_TOLERANCE), 75.0);
        assert_eq!(uniformity(&[], DEFAULT_UNIFORMITY_TOLERANCE), 0.0);
        assert_eq!(uniformity(&[500.0; 10], DEFAULT_UNIFORMITY_TOLERANCE), 100.0);
    }

    #[test]
    fn test_density() {
        assert!((current_density(1880, 2.5, 120.0) - 39.166_666).abs() < 1e-3);
        assert_eq!(current_density(1880, 2.5, 0.0), 0.0);
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(&[1000.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[1000.0, 1000.0, 1000.0]), 0.0);
        let cv = coefficient_of_variation(&[900.0, 1000.0, 1100.0]);
        assert!((cv - 10.0).abs() < 1e-9, "got {cv}");
    }

    #[test]
    fn test_epef() {
        // 96% viability, 2.8 kg at 42 days, FCR 1.65 → ~388
        let epef = production_efficiency_factor(96.0, 2.8, 42, 1.65);
        assert!((epef - 387.878).abs() < 0.01, "got {epef}");
        assert_eq!(production_efficiency_factor(96.0, 2.8, 0, 1.65), 0.0);
        assert_eq!(production_efficiency_factor(96.0, 2.8, 42, 0.0), 0.0);
    }
}

//! Industry-standard default thresholds.
//!
//! Every `Default` impl in the config layer reads from here, so a deployment
//! with no `poultry_config.toml` behaves exactly as these constants describe.

// ============================================================================
// Air Quality
// ============================================================================

/// Ammonia exposure limit (ppm)
pub const AMMONIA_WARNING_PPM: f64 = 25.0;

/// Ammonia level causing keratoconjunctivitis and growth loss (ppm)
pub const AMMONIA_CRITICAL_PPM: f64 = 50.0;

/// Carbon dioxide limit (ppm)
pub const CO2_WARNING_PPM: f64 = 2_400.0;

pub const CO2_CRITICAL_PPM: f64 = 5_000.0;

/// Oxygen floor (%)
pub const O2_WARNING_PERCENT: f64 = 19.5;

pub const O2_CRITICAL_PERCENT: f64 = 18.0;

pub const HUMIDITY_MIN_PERCENT: f64 = 50.0;

pub const HUMIDITY_MAX_PERCENT: f64 = 70.0;

/// Humidity this far outside the band escalates to critical (% points)
pub const HUMIDITY_CRITICAL_DELTA_PERCENT: f64 = 10.0;

/// Temperature this far outside the age band escalates to critical (°C)
pub const TEMPERATURE_CRITICAL_DELTA_C: f64 = 3.0;

/// Target house temperature by age: (last age day, min °C, max °C).
///
/// Brooding starts at 30–33 °C and drops roughly 3 °C per week to a
/// finishing range of 18–22 °C.
pub const TEMPERATURE_SCHEDULE: [(u32, f64, f64); 6] = [
    (7, 29.0, 33.0),
    (14, 26.0, 30.0),
    (21, 23.0, 27.0),
    (28, 21.0, 25.0),
    (35, 19.0, 23.0),
    (u32::MAX, 18.0, 22.0),
];

// ============================================================================
// Mortality
// ============================================================================

/// Weekly mortality ceilings by age: (last age day, max weekly %).
///
/// First-week losses above 1% point at chick quality or brooding problems.
pub const WEEKLY_MORTALITY_CEILINGS: [(u32, f64); 4] = [
    (7, 1.0),
    (21, 0.5),
    (35, 0.7),
    (u32::MAX, 1.0),
];

/// Weekly mortality above ceiling × this factor is critical
pub const MORTALITY_CRITICAL_MULTIPLIER: f64 = 2.0;

// ============================================================================
// Growth & Uniformity
// ============================================================================

/// Mean weight below standard by this much raises a warning (%)
pub const WEIGHT_DEFICIT_WARNING_PERCENT: f64 = 10.0;

pub const WEIGHT_DEFICIT_CRITICAL_PERCENT: f64 = 20.0;

/// Uniformity band: ±10% of the sample mean
pub const UNIFORMITY_TOLERANCE_FRACTION: f64 = 0.10;

/// Flocks under 80% uniformity warrant attention
pub const UNIFORMITY_MIN_PERCENT: f64 = 80.0;

pub const UNIFORMITY_CRITICAL_PERCENT: f64 = 60.0;

// ============================================================================
// Config loading
// ============================================================================

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "POULTRY_CONFIG";

/// Config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "poultry_config.toml";

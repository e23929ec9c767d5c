//! Analytics Configuration - alert thresholds as operator-tunable TOML values
//!
//! Each struct implements `Default` with the industry-standard values from
//! [`super::defaults`], so behavior is unchanged when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an analytics deployment.
///
/// Load with `AnalyticsConfig::load()` which searches:
/// 1. `$POULTRY_CONFIG` env var
/// 2. `./poultry_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsConfig {
    /// Deployment identification
    #[serde(default)]
    pub farm: FarmInfo,

    /// House environment thresholds
    #[serde(default)]
    pub air_quality: AirQualityConfig,

    /// Weekly mortality ceilings
    #[serde(default)]
    pub mortality: MortalityConfig,

    /// Body-weight deviation thresholds
    #[serde(default)]
    pub growth: GrowthConfig,

    /// Flock uniformity thresholds
    #[serde(default)]
    pub uniformity: UniformityConfig,
}

impl AnalyticsConfig {
    /// Load configuration using the standard search order:
    /// 1. `$POULTRY_CONFIG` environment variable
    /// 2. `./poultry_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(
                            path = %p.display(),
                            farm = %config.farm.name,
                            "Loaded analytics config from POULTRY_CONFIG"
                        );
                        return config;
                    }
                    Err(e) => {
                        warn!(
                            path = %p.display(),
                            error = %e,
                            "Failed to load config from POULTRY_CONFIG, falling back"
                        );
                    }
                }
            } else {
                warn!(path = %path, "POULTRY_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(
                        farm = %config.farm.name,
                        "Loaded analytics config from ./poultry_config.toml"
                    );
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./poultry_config.toml, using defaults");
                }
            }
        }

        info!("No poultry_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys are logged, not rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in &super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Analytics config saved");
        Ok(())
    }

    /// Validate all thresholds for internal consistency.
    ///
    /// Rules:
    /// - Critical thresholds must be at least as severe as warning thresholds
    /// - Age brackets must be non-empty and strictly increasing
    /// - Bands must have min < max
    /// - All values must be finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.air_quality;
        let mut errors: Vec<String> = Vec::new();

        // Upper limits: critical >= warning
        Self::check_escalation(
            a.ammonia_warning_ppm,
            a.ammonia_critical_ppm,
            "air_quality.ammonia",
            &mut errors,
        );
        Self::check_escalation(
            a.co2_warning_ppm,
            a.co2_critical_ppm,
            "air_quality.co2",
            &mut errors,
        );

        // Lower limit: critical floor must sit below the warning floor
        Self::check_escalation(
            a.o2_critical_percent,
            a.o2_warning_percent,
            "air_quality.o2 (critical floor below warning floor)",
            &mut errors,
        );

        if a.humidity_min_percent >= a.humidity_max_percent {
            errors.push(format!(
                "air_quality.humidity_min_percent ({:.1}) must be < humidity_max_percent ({:.1})",
                a.humidity_min_percent, a.humidity_max_percent
            ));
        }
        if a.humidity_critical_delta_percent < 0.0 {
            errors.push("air_quality.humidity_critical_delta_percent must be >= 0".to_string());
        }
        if a.temperature_critical_delta_c < 0.0 {
            errors.push("air_quality.temperature_critical_delta_c must be >= 0".to_string());
        }

        if a.temperature_bands.is_empty() {
            errors.push("air_quality.temperature_bands must not be empty".to_string());
        }
        for pair in a.temperature_bands.windows(2) {
            if pair[1].max_age_days <= pair[0].max_age_days {
                errors.push(format!(
                    "air_quality.temperature_bands must have increasing max_age_days ({} then {})",
                    pair[0].max_age_days, pair[1].max_age_days
                ));
            }
        }
        for band in &a.temperature_bands {
            if band.min_c >= band.max_c {
                errors.push(format!(
                    "air_quality.temperature_bands[max_age_days={}]: \
                     min_c ({:.1}) must be < max_c ({:.1})",
                    band.max_age_days, band.min_c, band.max_c
                ));
            }
        }

        let m = &self.mortality;
        if m.weekly_ceilings.is_empty() {
            errors.push("mortality.weekly_ceilings must not be empty".to_string());
        }
        for pair in m.weekly_ceilings.windows(2) {
            if pair[1].max_age_days <= pair[0].max_age_days {
                errors.push(format!(
                    "mortality.weekly_ceilings must have increasing max_age_days ({} then {})",
                    pair[0].max_age_days, pair[1].max_age_days
                ));
            }
        }
        for ceiling in &m.weekly_ceilings {
            if ceiling.max_weekly_percent <= 0.0 {
                errors.push(format!(
                    "mortality.weekly_ceilings[max_age_days={}]: max_weekly_percent must be > 0",
                    ceiling.max_age_days
                ));
            }
        }
        if m.critical_multiplier < 1.0 {
            errors.push(format!(
                "mortality.critical_multiplier ({:.2}) must be >= 1.0",
                m.critical_multiplier
            ));
        }

        Self::check_escalation(
            self.growth.weight_deficit_warning_percent,
            self.growth.weight_deficit_critical_percent,
            "growth.weight_deficit",
            &mut errors,
        );

        let u = &self.uniformity;
        if !(u.tolerance_fraction > 0.0 && u.tolerance_fraction < 1.0) {
            errors.push(format!(
                "uniformity.tolerance_fraction ({:.3}) must be in (0, 1)",
                u.tolerance_fraction
            ));
        }
        Self::check_escalation(
            u.critical_percent,
            u.min_acceptable_percent,
            "uniformity (critical floor below acceptable floor)",
            &mut errors,
        );

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        // Reject NaN/Inf in any value (sweep all f64 fields via serialization)
        if let Ok(ref s) = toml::to_string(self) {
            if ["= nan", "= -nan", "= inf", "= -inf"].iter().any(|p| s.contains(p)) {
                errors.push(
                    "Config contains NaN or Inf values, all thresholds must be finite numbers"
                        .to_string(),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_escalation(lower: f64, upper: f64, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass, catch them explicitly
        if !lower.is_finite() || !upper.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got {lower} and {upper})"
            ));
            return;
        }
        if upper < lower {
            errors.push(format!("{name}: {upper:.3} must be >= {lower:.3}"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Farm Info
// ============================================================================

/// Identification metadata, appears in logs only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmInfo {
    #[serde(default = "default_farm_name")]
    pub name: String,
}

fn default_farm_name() -> String {
    "Unnamed Farm".to_string()
}

impl Default for FarmInfo {
    fn default() -> Self {
        Self {
            name: default_farm_name(),
        }
    }
}

// ============================================================================
// Air Quality
// ============================================================================

/// Accepted house temperature up to and including `max_age_days`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TemperatureBand {
    pub max_age_days: u32,
    pub min_c: f64,
    pub max_c: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AirQualityConfig {
    /// Age-ordered temperature bands; ages past the last band use the last band
    pub temperature_bands: Vec<TemperatureBand>,
    pub temperature_critical_delta_c: f64,
    pub humidity_min_percent: f64,
    pub humidity_max_percent: f64,
    pub humidity_critical_delta_percent: f64,
    pub ammonia_warning_ppm: f64,
    pub ammonia_critical_ppm: f64,
    pub co2_warning_ppm: f64,
    pub co2_critical_ppm: f64,
    pub o2_warning_percent: f64,
    pub o2_critical_percent: f64,
}

impl Default for AirQualityConfig {
    fn default() -> Self {
        Self {
            temperature_bands: defaults::TEMPERATURE_SCHEDULE
                .iter()
                .map(|&(max_age_days, min_c, max_c)| TemperatureBand {
                    max_age_days,
                    min_c,
                    max_c,
                })
                .collect(),
            temperature_critical_delta_c: defaults::TEMPERATURE_CRITICAL_DELTA_C,
            humidity_min_percent: defaults::HUMIDITY_MIN_PERCENT,
            humidity_max_percent: defaults::HUMIDITY_MAX_PERCENT,
            humidity_critical_delta_percent: defaults::HUMIDITY_CRITICAL_DELTA_PERCENT,
            ammonia_warning_ppm: defaults::AMMONIA_WARNING_PPM,
            ammonia_critical_ppm: defaults::AMMONIA_CRITICAL_PPM,
            co2_warning_ppm: defaults::CO2_WARNING_PPM,
            co2_critical_ppm: defaults::CO2_CRITICAL_PPM,
            o2_warning_percent: defaults::O2_WARNING_PERCENT,
            o2_critical_percent: defaults::O2_CRITICAL_PERCENT,
        }
    }
}

impl AirQualityConfig {
    /// Temperature band applying at `age_days`
    pub fn temperature_band_for(&self, age_days: u32) -> Option<&TemperatureBand> {
        self.temperature_bands
            .iter()
            .find(|b| age_days <= b.max_age_days)
            .or_else(|| self.temperature_bands.last())
    }
}

// ============================================================================
// Mortality
// ============================================================================

/// Weekly mortality ceiling for weeks ending on or before `max_age_days`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MortalityCeiling {
    pub max_age_days: u32,
    pub max_weekly_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MortalityConfig {
    pub weekly_ceilings: Vec<MortalityCeiling>,
    pub critical_multiplier: f64,
}

impl Default for MortalityConfig {
    fn default() -> Self {
        Self {
            weekly_ceilings: defaults::WEEKLY_MORTALITY_CEILINGS
                .iter()
                .map(|&(max_age_days, max_weekly_percent)| MortalityCeiling {
                    max_age_days,
                    max_weekly_percent,
                })
                .collect(),
            critical_multiplier: defaults::MORTALITY_CRITICAL_MULTIPLIER,
        }
    }
}

impl MortalityConfig {
    /// Ceiling (%) for a week whose last day of age is `last_age_day`
    pub fn ceiling_for(&self, last_age_day: u32) -> Option<f64> {
        self.weekly_ceilings
            .iter()
            .find(|c| last_age_day <= c.max_age_days)
            .or_else(|| self.weekly_ceilings.last())
            .map(|c| c.max_weekly_percent)
    }
}

// ============================================================================
// Growth & Uniformity
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrowthConfig {
    pub weight_deficit_warning_percent: f64,
    pub weight_deficit_critical_percent: f64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            weight_deficit_warning_percent: defaults::WEIGHT_DEFICIT_WARNING_PERCENT,
            weight_deficit_critical_percent: defaults::WEIGHT_DEFICIT_CRITICAL_PERCENT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UniformityConfig {
    pub tolerance_fraction: f64,
    pub min_acceptable_percent: f64,
    pub critical_percent: f64,
}

impl Default for UniformityConfig {
    fn default() -> Self {
        Self {
            tolerance_fraction: defaults::UNIFORMITY_TOLERANCE_FRACTION,
            min_acceptable_percent: defaults::UNIFORMITY_MIN_PERCENT,
            critical_percent: defaults::UNIFORMITY_CRITICAL_PERCENT,
        }
    }
}

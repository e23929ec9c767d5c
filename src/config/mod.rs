//! Analytics Configuration Module
//!
//! Alert thresholds loaded from TOML, replacing hardcoded industry limits
//! with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `POULTRY_CONFIG` environment variable (path to TOML file)
//! 2. `poultry_config.toml` in the current working directory
//! 3. Built-in defaults ([`defaults`])
//!
//! ## Usage
//!
//! The loaded config is handed to the components that need it:
//!
//! ```ignore
//! let config = AnalyticsConfig::load();
//! let detector = AnomalyDetector::new(config.clone(), GrowthCurveProjector::cobb_500());
//! ```

mod analytics_config;
pub mod defaults;
pub mod validation;

pub use analytics_config::*;

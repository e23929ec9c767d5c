//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `AnalyticsConfig`.
///
/// Maintained by hand to match the struct hierarchy in analytics_config.rs.
/// Array-of-table entries share their array's path.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [farm]
        "farm",
        "farm.name",
        // [air_quality]
        "air_quality",
        "air_quality.temperature_bands",
        "air_quality.temperature_bands.max_age_days",
        "air_quality.temperature_bands.min_c",
        "air_quality.temperature_bands.max_c",
        "air_quality.temperature_critical_delta_c",
        "air_quality.humidity_min_percent",
        "air_quality.humidity_max_percent",
        "air_quality.humidity_critical_delta_percent",
        "air_quality.ammonia_warning_ppm",
        "air_quality.ammonia_critical_ppm",
        "air_quality.co2_warning_ppm",
        "air_quality.co2_critical_ppm",
        "air_quality.o2_warning_percent",
        "air_quality.o2_critical_percent",
        // [mortality]
        "mortality",
        "mortality.weekly_ceilings",
        "mortality.weekly_ceilings.max_age_days",
        "mortality.weekly_ceilings.max_weekly_percent",
        "mortality.critical_multiplier",
        // [growth]
        "growth",
        "growth.weight_deficit_warning_percent",
        "growth.weight_deficit_critical_percent",
        // [uniformity]
        "uniformity",
        "uniformity.tolerance_fraction",
        "uniformity.min_acceptable_percent",
        "uniformity.critical_percent",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`. Tables inside arrays are walked under the array's
/// own path.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            match v {
                toml::Value::Table(_) => keys.extend(walk_toml_keys(v, &path)),
                toml::Value::Array(items) => {
                    for item in items.iter().filter(|i| i.is_table()) {
                        for nested in walk_toml_keys(item, &path) {
                            if !keys.contains(&nested) {
                                keys.push(nested);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, dist)| *dist <= 3)
        // Tie-break on the key itself so the result does not depend on hash order
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed `AnalyticsConfig`.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::AnalyticsConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let a = &config.air_quality;

    // Concentrations and percentages cannot be negative
    for (name, value) in [
        ("air_quality.ammonia_warning_ppm", a.ammonia_warning_ppm),
        ("air_quality.co2_warning_ppm", a.co2_warning_ppm),
        ("air_quality.o2_critical_percent", a.o2_critical_percent),
        ("air_quality.humidity_min_percent", a.humidity_min_percent),
    ] {
        if value < 0.0 {
            errors.push(format!("{name} = {value:.1} cannot be negative"));
        }
    }

    // Percentages above 100 are impossible
    for (name, value) in [
        ("air_quality.humidity_max_percent", a.humidity_max_percent),
        ("air_quality.o2_warning_percent", a.o2_warning_percent),
        ("uniformity.min_acceptable_percent", config.uniformity.min_acceptable_percent),
        (
            "growth.weight_deficit_critical_percent",
            config.growth.weight_deficit_critical_percent,
        ),
    ] {
        if value > 100.0 {
            errors.push(format!("{name} = {value:.1} exceeds 100%"));
        }
    }

    // Poultry houses run between roughly 10 and 40 °C
    for band in &a.temperature_bands {
        if band.min_c < 10.0 || band.max_c > 40.0 {
            warnings.push(ValidationWarning {
                field: "air_quality.temperature_bands".to_string(),
                message: format!(
                    "temperature band up to day {} ({:.1}-{:.1} °C) is outside typical \
                     range (10-40 °C)",
                    band.max_age_days, band.min_c, band.max_c
                ),
                suggestion: None,
            });
        }
    }

    // Atmospheric O2 is ~20.9%; a warning floor above that always fires
    if a.o2_warning_percent > 20.9 {
        warnings.push(ValidationWarning {
            field: "air_quality.o2_warning_percent".to_string(),
            message: format!(
                "o2_warning_percent = {:.1} is above atmospheric oxygen (20.9%)",
                a.o2_warning_percent
            ),
            suggestion: None,
        });
    }

    for ceiling in &config.mortality.weekly_ceilings {
        if ceiling.max_weekly_percent > 10.0 {
            warnings.push(ValidationWarning {
                field: "mortality.weekly_ceilings".to_string(),
                message: format!(
                    "weekly mortality ceiling up to day {} = {:.1}% is unusually high",
                    ceiling.max_age_days, ceiling.max_weekly_percent
                ),
                suggestion: None,
            });
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("amonia", "ammonia"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [air_quality]
            ammonia_warning_ppm = 25.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"air_quality".to_string()));
        assert!(keys.contains(&"air_quality.ammonia_warning_ppm".to_string()));
    }

    #[test]
    fn test_walk_toml_keys_array_of_tables() {
        let toml: toml::Value = r#"
            [[mortality.weekly_ceilings]]
            max_age_days = 7
            max_weekly_percent = 1.0

            [[mortality.weekly_ceilings]]
            max_age_days = 14
            max_weekly_percent = 0.5
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"mortality.weekly_ceilings".to_string()));
        assert!(keys.contains(&"mortality.weekly_ceilings.max_weekly_percent".to_string()));
        assert_eq!(
            keys.iter()
                .filter(|k| *k == "mortality.weekly_ceilings.max_age_days")
                .count(),
            1
        );
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[air_quality]
amonia_warning_ppm = 20.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("amonia_warning_ppm"));
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("air_quality.ammonia_warning_ppm")
        );
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_physical_range_defaults_clean() {
        let config = crate::config::AnalyticsConfig::default();
        let (errors, warnings) = validate_physical_ranges(&config);
        assert!(errors.is_empty(), "Defaults should produce no errors: {errors:?}");
        assert!(warnings.is_empty(), "Defaults should produce no warnings: {warnings:?}");
    }

    #[test]
    fn test_physical_range_negative_ammonia() {
        let mut config = crate::config::AnalyticsConfig::default();
        config.air_quality.ammonia_warning_ppm = -1.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("ammonia_warning_ppm")));
    }

    #[test]
    fn test_physical_range_hot_brooding_band_warns() {
        let mut config = crate::config::AnalyticsConfig::default();
        config.air_quality.temperature_bands[0].max_c = 45.0;
        let (_, warnings) = validate_physical_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "air_quality.temperature_bands"));
    }
}

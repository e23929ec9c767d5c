//! Industry reference curves
//!
//! Static performance objectives by age, used as the "standard" column in
//! growth comparisons and projections. Values are the published Cobb 500
//! as-hatched broiler objectives at weekly ages.

use serde::Serialize;

/// Expected performance at one age
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct StandardPoint {
    pub age_days: u32,
    /// Expected mean live weight (g)
    pub weight_g: f64,
    /// Expected cumulative feed intake per bird (g)
    pub cumulative_feed_g: f64,
    /// Expected cumulative mortality (%)
    pub cumulative_mortality_percent: f64,
}

/// A reference growth table, ordered by strictly increasing age
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StandardCurve {
    pub name: &'static str,
    pub points: &'static [StandardPoint],
}

impl StandardCurve {
    pub fn first(&self) -> Option<&StandardPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&StandardPoint> {
        self.points.last()
    }

    /// Exact table entry for `age_days`, if the table has one
    pub fn exact(&self, age_days: u32) -> Option<&StandardPoint> {
        self.points
            .binary_search_by_key(&age_days, |p| p.age_days)
            .ok()
            .and_then(|i| self.points.get(i))
    }
}

const fn point(
    age_days: u32,
    weight_g: f64,
    cumulative_feed_g: f64,
    mortality: f64,
) -> StandardPoint {
    StandardPoint {
        age_days,
        weight_g,
        cumulative_feed_g,
        cumulative_mortality_percent: mortality,
    }
}

/// Cobb 500 broiler performance objectives (as-hatched)
pub const COBB_500: StandardCurve = StandardCurve {
    name: "Cobb 500",
    points: &[
        point(0, 42.0, 0.0, 0.0),
        point(7, 185.0, 167.0, 1.0),
        point(14, 465.0, 529.0, 1.5),
        point(21, 943.0, 1_163.0, 2.0),
        point(28, 1_524.0, 2_058.0, 2.5),
        point(35, 2_191.0, 3_180.0, 3.0),
        point(42, 2_857.0, 4_478.0, 3.6),
        point(49, 3_486.0, 5_903.0, 4.2),
        point(56, 4_051.0, 7_393.0, 4.8),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cobb_table_is_strictly_increasing() {
        for pair in COBB_500.points.windows(2) {
            assert!(pair[0].age_days < pair[1].age_days);
            assert!(pair[0].weight_g < pair[1].weight_g);
            assert!(pair[0].cumulative_feed_g < pair[1].cumulative_feed_g);
        }
    }

    #[test]
    fn test_exact_lookup() {
        assert_eq!(COBB_500.exact(42).map(|p| p.weight_g), Some(2_857.0));
        assert!(COBB_500.exact(40).is_none());
        assert_eq!(COBB_500.first().map(|p| p.age_days), Some(0));
    }
}

//! Early-warning zones
//!
//! Zone boundaries are the 50th, 75th, and 90th percentiles of the cohort's
//! instability index. They are cohort-relative: the same instability value can
//! land in different zones against different cohorts. Boundaries are
//! inclusive on the lower side, so a value equal to a cut-point takes the
//! less severe zone.

use crate::baseline::quantile_sorted;
use crate::types::Zone;
use serde::{Deserialize, Serialize};

pub const STABLE_QUANTILE: f64 = 0.50;
pub const FRAGILE_QUANTILE: f64 = 0.75;
pub const UNSTABLE_QUANTILE: f64 = 0.90;

/// Cohort cut-points on the instability index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneThresholds {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl ZoneThresholds {
    /// Compute cut-points from every instability value in the cohort.
    /// Returns `None` for an empty cohort.
    pub fn from_instability(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            p50: quantile_sorted(&sorted, STABLE_QUANTILE),
            p75: quantile_sorted(&sorted, FRAGILE_QUANTILE),
            p90: quantile_sorted(&sorted, UNSTABLE_QUANTILE),
        })
    }

    /// Classify one instability value against these cut-points
    pub fn classify(&self, instability: f64) -> Zone {
        if instability <= self.p50 {
            Zone::Stable
        } else if instability <= self.p75 {
            Zone::Fragile
        } else if instability <= self.p90 {
            Zone::Unstable
        } else {
            Zone::Critical
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 0.1).collect()
    }

    #[test]
    fn test_thresholds_for_ten_steps() {
        let t = ZoneThresholds::from_instability(&ladder(10)).unwrap();
        assert!((t.p50 - 0.45).abs() < 1e-12);
        assert!((t.p75 - 0.675).abs() < 1e-12);
        assert!((t.p90 - 0.81).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_is_inclusive_on_lower_side() {
        let t = ZoneThresholds::from_instability(&ladder(10)).unwrap();
        assert_eq!(t.classify(t.p50), Zone::Stable);
        assert_eq!(t.classify(t.p75), Zone::Fragile);
        assert_eq!(t.classify(t.p90), Zone::Unstable);

        let zones: Vec<Zone> = ladder(10).iter().map(|v| t.classify(*v)).collect();
        assert_eq!(
            zones,
            vec![
                Zone::Stable,
                Zone::Stable,
                Zone::Stable,
                Zone::Stable,
                Zone::Stable,
                Zone::Fragile,
                Zone::Fragile,
                Zone::Unstable,
                Zone::Unstable,
                Zone::Critical,
            ]
        );
    }

    #[test]
    fn test_record_exactly_at_median_is_stable() {
        // Eleven records put an actual record on the 50th percentile
        let values = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
        let t = ZoneThresholds::from_instability(&values).unwrap();
        assert_eq!(t.p50, 0.5);
        assert_eq!(t.classify(0.5), Zone::Stable);
        assert_eq!(t.classify(0.6), Zone::Fragile);
    }

    #[test]
    fn test_uniform_cohort_is_all_stable() {
        let t = ZoneThresholds::from_instability(&[0.3; 5]).unwrap();
        assert_eq!(t.classify(0.3), Zone::Stable);
    }

    #[test]
    fn test_empty_cohort_has_no_thresholds() {
        assert_eq!(ZoneThresholds::from_instability(&[]), None);
    }
}

//! Cohort baselines
//!
//! This module computes the cohort-relative statistics the engine is built on:
//! median, median absolute deviation, mean, sample standard deviation, and
//! linearly interpolated quantiles. Baselines make every score relative to
//! the cohort it was computed against.

use crate::types::Signal;
use serde::{Deserialize, Serialize};

/// Rescales MAD to be comparable with a standard deviation under normality
pub const MAD_SCALE: f64 = 1.4826;

/// Median of a slice of values; `None` when empty
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Arithmetic mean; `None` when empty
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (divisor n - 1); `None` with fewer than two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Quantile with linear interpolation between order statistics at
/// position `q * (n - 1)`; `None` when empty
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(quantile_sorted(&sorted, q))
}

/// Quantile over values already sorted ascending (must be non-empty)
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Location and spread of one cohort column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnBaseline {
    pub median: Option<f64>,
    /// Median absolute deviation from the median
    pub mad: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    /// Number of present values
    pub count: usize,
}

impl ColumnBaseline {
    /// Compute baselines over the present values of a column
    pub fn from_column(column: &[Signal]) -> Self {
        let present: Vec<f64> = column.iter().filter_map(|s| s.value()).collect();
        let median = median(&present);
        let mad = median.and_then(|m| {
            let deviations: Vec<f64> = present.iter().map(|v| (v - m).abs()).collect();
            self::median(&deviations)
        });

        Self {
            median,
            mad,
            mean: mean(&present),
            std: sample_std(&present),
            count: present.len(),
        }
    }

    /// Robust standard score for each record of the column.
    ///
    /// Uses `(v - median) / (1.4826 * MAD)`. When MAD is zero or undefined,
    /// falls back to `(v - mean) / std`; when std is also zero or undefined,
    /// every record scores exactly 0. Missing inputs stay missing.
    pub fn robust_scores(&self, column: &[Signal]) -> Vec<Signal> {
        match (self.median, self.mad) {
            (Some(med), Some(mad)) if mad > 0.0 => column
                .iter()
                .map(|s| s.map(|v| (v - med) / (MAD_SCALE * mad)))
                .collect(),
            _ => match (self.mean, self.std) {
                (Some(mean), Some(std)) if std > 0.0 => {
                    column.iter().map(|s| s.map(|v| (v - mean) / std)).collect()
                }
                _ => vec![Signal::Present(0.0); column.len()],
            },
        }
    }
}

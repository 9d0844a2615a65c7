//! Signal normalization
//!
//! This module turns raw cohort columns into comparable scales.
//! - Raw text coerced to numbers (unparseable cells become missing)
//! - Min-max normalization to 0-1 over the whole cohort
//! - Degenerate columns collapse to the neutral midpoint

use crate::types::{Scales, Signal, StudentRecord};
use tracing::warn;

/// Scale assigned to every record when a column carries no information
pub const NEUTRAL_MIDPOINT: f64 = 0.5;

/// Coerce a raw cell to a signal. Anything that does not parse as a finite
/// number is missing; this never fails the record.
pub fn coerce_numeric(raw: &str) -> Signal {
    raw.trim()
        .parse::<f64>()
        .map_or(Signal::Missing, Signal::from_f64)
}

/// Min-max normalize one column.
///
/// Columns with at most one distinct present value (including all-missing
/// columns) map every record to [`NEUTRAL_MIDPOINT`]. Otherwise missing
/// inputs stay missing and present values map to `(v - min) / (max - min)`,
/// clamped to [0, 1].
pub fn min_max(column: &[Signal]) -> Vec<Signal> {
    let present: Vec<f64> = column.iter().filter_map(|s| s.value()).collect();

    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    // One distinct value means max == min, so the range check covers both cases
    if present.is_empty() || max - min == 0.0 {
        return vec![Signal::Present(NEUTRAL_MIDPOINT); column.len()];
    }

    let range = max - min;
    column
        .iter()
        .map(|s| s.map(|v| ((v - min) / range).clamp(0.0, 1.0)))
        .collect()
}

/// Normalizer for the three scored signals of a cohort
pub struct Normalizer;

impl Normalizer {
    /// Normalize hours, attendance, and assignments across the cohort.
    /// Test score is never scored and is left out.
    pub fn normalize(records: &[StudentRecord]) -> Vec<Scales> {
        let hours = normalize_column(records, "hours_studied", |r| r.hours_studied);
        let attendance = normalize_column(records, "attendance_percent", |r| r.attendance_percent);
        let assignments =
            normalize_column(records, "assignments_completed", |r| r.assignments_completed);

        hours
            .into_iter()
            .zip(attendance)
            .zip(assignments)
            .map(|((hours, attendance), assignments)| Scales {
                hours,
                attendance,
                assignments,
            })
            .collect()
    }
}

fn normalize_column(
    records: &[StudentRecord],
    name: &str,
    pick: impl Fn(&StudentRecord) -> Signal,
) -> Vec<Signal> {
    let column: Vec<Signal> = records.iter().map(pick).collect();
    let scaled = min_max(&column);

    if records.len() > 1 && scaled.iter().all(|s| *s == Signal::Present(NEUTRAL_MIDPOINT)) {
        warn!(column = name, "column has no spread, using neutral midpoint");
    }

    scaled
}

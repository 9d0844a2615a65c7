//! Counterfactual evaluation
//!
//! Applies a what-if adjustment to one student's raw signals and re-scores the
//! whole cohort, so cohort-relative statistics (min/max, median/MAD,
//! percentiles) reflect the adjustment. The original scored cohort is never
//! touched; every evaluation works on its own copy.

use crate::error::InstabilityError;
use crate::pipeline::score_cohort;
use crate::types::{Pressures, ScoredCohort, ScoredRecord, Signal, StudentRecord, Zone};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Signed deltas for the three actionable raw signals.
///
/// Deltas are not validated: raw values may go negative or past natural bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Intervention {
    pub hours_delta: f64,
    pub attendance_delta: f64,
    pub assignments_delta: f64,
}

impl Intervention {
    pub fn new(hours_delta: f64, attendance_delta: f64, assignments_delta: f64) -> Self {
        Self {
            hours_delta,
            attendance_delta,
            assignments_delta,
        }
    }

    /// Apply the deltas to a copy of the record. Missing signals stay missing.
    pub fn apply(&self, record: &StudentRecord) -> StudentRecord {
        let shift = |signal: Signal, delta: f64| signal.map(|v| v + delta);

        StudentRecord {
            hours_studied: shift(record.hours_studied, self.hours_delta),
            attendance_percent: shift(record.attendance_percent, self.attendance_delta),
            assignments_completed: shift(record.assignments_completed, self.assignments_delta),
            ..record.clone()
        }
    }
}

/// Before/after values of one pressure component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureChange {
    pub pressure: String,
    pub before: f64,
    pub after: f64,
}

impl PressureChange {
    pub fn delta(&self) -> f64 {
        self.after - self.before
    }
}

/// Outcome of a counterfactual evaluation for the target student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualOutcome {
    pub intervention: Intervention,
    pub before: ScoredRecord,
    pub after: ScoredRecord,
    /// The full re-scored cohort
    #[serde(skip)]
    pub cohort: Option<ScoredCohort>,
}

impl CounterfactualOutcome {
    /// Signed instability change; negative means the intervention helps
    pub fn instability_delta(&self) -> f64 {
        self.after.instability_index - self.before.instability_index
    }

    pub fn zone_change(&self) -> (Zone, Zone) {
        (self.before.zone, self.after.zone)
    }

    pub fn pressure_changes(&self) -> Vec<PressureChange> {
        pressure_changes(&self.before.pressures, &self.after.pressures)
    }
}

fn pressure_changes(before: &Pressures, after: &Pressures) -> Vec<PressureChange> {
    before
        .labelled()
        .into_iter()
        .zip(after.labelled())
        .map(|((name, before), (_, after))| PressureChange {
            pressure: name.to_string(),
            before,
            after,
        })
        .collect()
}

/// Re-score the cohort with one record adjusted by `intervention`.
///
/// This is a full recompute over the mutated copy, not an incremental patch.
pub fn evaluate_counterfactual(
    cohort: &ScoredCohort,
    index: usize,
    intervention: Intervention,
) -> Result<CounterfactualOutcome, InstabilityError> {
    let before = cohort
        .get(index)
        .cloned()
        .ok_or(InstabilityError::IndexOutOfRange {
            index,
            len: cohort.len(),
        })?;

    let mut raw = cohort.raw_records();
    raw[index] = intervention.apply(&raw[index]);

    let rescored = score_cohort(&raw)?;
    let after = rescored
        .get(index)
        .cloned()
        .ok_or(InstabilityError::IndexOutOfRange {
            index,
            len: rescored.len(),
        })?;

    debug!(
        index,
        before = before.instability_index,
        after = after.instability_index,
        "counterfactual evaluated"
    );

    Ok(CounterfactualOutcome {
        intervention,
        before,
        after,
        cohort: Some(rescored),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::median;
    use pretty_assertions::assert_eq;

    fn cohort_of(n: usize) -> Vec<StudentRecord> {
        (0..n)
            .map(|i| {
                let f = i as f64;
                StudentRecord::new(
                    2.0 + (f * 7.0) % 11.0,
                    40.0 + (f * 13.0) % 55.0,
                    1.0 + (f * 3.0) % 9.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_apply_shifts_present_signals_only() {
        let mut record = StudentRecord::new(5.0, 80.0, 6.0);
        record.assignments_completed = Signal::Missing;

        let shifted = Intervention::new(1.5, 30.0, 2.0).apply(&record);
        assert_eq!(shifted.hours_studied, Signal::Present(6.5));
        // No clamping on raw inputs
        assert_eq!(shifted.attendance_percent, Signal::Present(110.0));
        assert_eq!(shifted.assignments_completed, Signal::Missing);
    }

    #[test]
    fn test_zero_delta_is_a_no_op() {
        let cohort = score_cohort(&cohort_of(40)).unwrap();
        let outcome = evaluate_counterfactual(&cohort, 17, Intervention::default()).unwrap();

        assert!(outcome.instability_delta().abs() < 1e-6);
        assert_eq!(outcome.before.zone, outcome.after.zone);
        assert_eq!(outcome.cohort.as_ref(), Some(&cohort));
    }

    #[test]
    fn test_original_cohort_is_untouched() {
        let cohort = score_cohort(&cohort_of(12)).unwrap();
        let snapshot = cohort.clone();
        evaluate_counterfactual(&cohort, 3, Intervention::new(-4.0, -20.0, -3.0)).unwrap();
        assert_eq!(cohort, snapshot);
    }

    #[test]
    fn test_cohort_statistics_follow_the_adjustment() {
        let cohort = score_cohort(&cohort_of(40)).unwrap();
        let snapshot = cohort.clone();

        // Record 0 studies the fewest hours; push it far past the cohort max
        let outcome =
            evaluate_counterfactual(&cohort, 0, Intervention::new(100.0, 0.0, 0.0)).unwrap();
        let rescored = outcome.cohort.as_ref().unwrap();

        // Min-max range is recomputed, so an untouched record's scale shrinks
        assert!((cohort.records[1].scales.hours.fill(f64::NAN) - 0.7).abs() < 1e-12);
        assert!((rescored.records[1].scales.hours.fill(f64::NAN) - 0.07).abs() < 1e-12);
        assert_eq!(rescored.records[1].record, cohort.records[1].record);

        // Percentile cut-points are recomputed over the adjusted cohort
        assert_ne!(rescored.thresholds, cohort.thresholds);
        assert!(rescored.thresholds.p50 > cohort.thresholds.p50);

        assert_eq!(cohort, snapshot);
    }

    #[test]
    fn test_raising_low_attendance_does_not_raise_instability() {
        let raw = cohort_of(30);
        let cohort = score_cohort(&raw).unwrap();

        let attendance: Vec<f64> = raw
            .iter()
            .filter_map(|r| r.attendance_percent.value())
            .collect();
        let med = median(&attendance).unwrap();
        let index = raw
            .iter()
            .position(|r| r.attendance_percent.fill(f64::INFINITY) < med)
            .unwrap();

        let outcome =
            evaluate_counterfactual(&cohort, index, Intervention::new(0.0, 30.0, 0.0)).unwrap();
        assert!(outcome.instability_delta() <= 0.0);
        assert!(outcome.after.buffer_strength >= outcome.before.buffer_strength);
        assert_eq!(
            outcome.after.pressures.cognitive_load,
            outcome.before.pressures.cognitive_load
        );
    }

    #[test]
    fn test_pressure_changes_are_labelled() {
        let cohort = score_cohort(&cohort_of(10)).unwrap();
        let outcome =
            evaluate_counterfactual(&cohort, 0, Intervention::new(0.0, 0.0, 5.0)).unwrap();
        let changes = outcome.pressure_changes();

        let names: Vec<&str> = changes.iter().map(|c| c.pressure.as_str()).collect();
        assert_eq!(names, vec!["Cognitive Load", "Attendance", "Engagement"]);
        assert!(changes[2].delta() >= 0.0);
    }

    #[test]
    fn test_out_of_range_index() {
        let cohort = score_cohort(&cohort_of(3)).unwrap();
        let err = evaluate_counterfactual(&cohort, 3, Intervention::default()).unwrap_err();
        assert!(matches!(
            err,
            InstabilityError::IndexOutOfRange { index: 3, len: 3 }
        ));
    }
}

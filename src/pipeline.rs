//! Pipeline orchestration
//!
//! This module provides the whole-cohort scoring engine. Several statistics are
//! cohort-relative (min/max, median/MAD, quantiles), so records are never
//! scored in isolation: the engine takes the full cohort and returns the full
//! scored cohort.

use crate::baseline::ColumnBaseline;
use crate::error::InstabilityError;
use crate::features::FeatureDeriver;
use crate::normalizer::Normalizer;
use crate::types::{ScoredCohort, ScoredRecord, Signal, StudentRecord};
use crate::zones::ZoneThresholds;
use tracing::debug;

/// Score a cohort.
///
/// Pipeline stages:
/// 1. Normalizer - Min-max scales for hours, attendance, assignments
/// 2. ColumnBaseline - Robust standard score for hours studied
/// 3. FeatureDeriver - Pressures, buffer strength, instability index
/// 4. ZoneThresholds - Cohort percentiles and zone labels
///
/// Pure function of the raw signals: the same cohort always produces
/// bit-identical output.
pub fn score_cohort(records: &[StudentRecord]) -> Result<ScoredCohort, InstabilityError> {
    if records.is_empty() {
        return Err(InstabilityError::EmptyCohort);
    }

    // Stage 1: Normalize scales
    let scales = Normalizer::normalize(records);

    // Stage 2: Robust hours score against the cohort baseline
    let hours: Vec<Signal> = records.iter().map(|r| r.hours_studied).collect();
    let hours_baseline = ColumnBaseline::from_column(&hours);
    let hours_robust = hours_baseline.robust_scores(&hours);
    debug!(
        cohort = records.len(),
        median = ?hours_baseline.median,
        mad = ?hours_baseline.mad,
        "hours baseline computed"
    );

    // Stage 3: Derive per-record features
    let features: Vec<_> = scales
        .iter()
        .zip(&hours_robust)
        .map(|(s, z)| FeatureDeriver::derive(s, *z))
        .collect();

    // Stage 4: Zone against cohort percentiles
    let instability: Vec<f64> = features.iter().map(|f| f.instability_index).collect();
    let thresholds =
        ZoneThresholds::from_instability(&instability).ok_or(InstabilityError::EmptyCohort)?;
    debug!(
        p50 = thresholds.p50,
        p75 = thresholds.p75,
        p90 = thresholds.p90,
        "zone thresholds computed"
    );

    let scored = records
        .iter()
        .zip(scales)
        .zip(features)
        .enumerate()
        .map(|(position, ((record, scales), features))| ScoredRecord {
            position,
            record: record.clone(),
            scales,
            pressures: features.pressures,
            buffer_strength: features.buffer_strength,
            instability_index: features.instability_index,
            zone: thresholds.classify(features.instability_index),
        })
        .collect();

    Ok(ScoredCohort {
        records: scored,
        thresholds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Pressures, Zone};
    use pretty_assertions::assert_eq;

    fn three_students() -> Vec<StudentRecord> {
        vec![
            StudentRecord::new(10.0, 90.0, 9.0),
            StudentRecord::new(5.0, 50.0, 5.0),
            StudentRecord::new(0.0, 10.0, 1.0),
        ]
    }

    fn sample_std3(a: f64, b: f64, c: f64) -> f64 {
        let m = (a + b + c) / 3.0;
        (((a - m).powi(2) + (b - m).powi(2) + (c - m).powi(2)) / 2.0).sqrt()
    }

    #[test]
    fn test_empty_cohort_is_an_error() {
        assert!(matches!(score_cohort(&[]), Err(InstabilityError::EmptyCohort)));
    }

    #[test]
    fn test_three_student_scenario() {
        let cohort = score_cohort(&three_students()).unwrap();

        let attendance: Vec<Signal> = cohort.iter().map(|r| r.scales.attendance).collect();
        assert_eq!(
            attendance,
            vec![Signal::Present(1.0), Signal::Present(0.5), Signal::Present(0.0)]
        );

        // Attendance 90 is the cohort max: no pressure. Attendance 10 is the min: full pressure.
        assert_eq!(cohort.records[0].pressures.attendance, 0.0);
        assert_eq!(cohort.records[2].pressures.attendance, -1.0);

        // Hours: median 5, MAD 5, so the extremes sit at +/- 1 / 1.4826
        let load = -(1.0f64 / 1.4826 / 2.0).tanh();
        assert!((cohort.records[0].pressures.cognitive_load - load).abs() < 1e-12);
        assert_eq!(cohort.records[1].pressures.cognitive_load, 0.0);

        let expected_first = 0.55 * (-load / 3.0) + 0.20 * sample_std3(load, 0.0, 0.0);
        assert!((cohort.records[0].instability_index - expected_first).abs() < 1e-12);

        let expected_middle = 0.55 / 3.0 + 0.20 * sample_std3(0.0, -0.5, -0.5) + 0.25 * 0.5;
        assert!((cohort.records[1].instability_index - expected_middle).abs() < 1e-12);

        let expected_last =
            0.55 * ((-load + 2.0) / 3.0) + 0.20 * sample_std3(load, -1.0, -1.0) + 0.25;
        assert!((cohort.records[2].instability_index - expected_last).abs() < 1e-12);

        let zones: Vec<Zone> = cohort.iter().map(|r| r.zone).collect();
        assert_eq!(zones, vec![Zone::Stable, Zone::Stable, Zone::Critical]);
    }

    #[test]
    fn test_constant_attendance_column() {
        let records = vec![
            StudentRecord::new(2.0, 75.0, 3.0),
            StudentRecord::new(6.0, 75.0, 8.0),
            StudentRecord::new(9.0, 75.0, 5.0),
        ];
        let cohort = score_cohort(&records).unwrap();
        for r in cohort.iter() {
            assert_eq!(r.scales.attendance, Signal::Present(0.5));
            assert_eq!(r.pressures.attendance, -0.5);
        }
    }

    #[test]
    fn test_single_record_cohort() {
        let cohort = score_cohort(&[StudentRecord::new(4.0, 80.0, 7.0)]).unwrap();
        let r = &cohort.records[0];
        assert_eq!(r.scales.hours, Signal::Present(0.5));
        assert_eq!(
            r.pressures,
            Pressures {
                cognitive_load: 0.0,
                attendance: -0.5,
                engagement: -0.5,
            }
        );
        assert_eq!(r.zone, Zone::Stable);
    }

    #[test]
    fn test_missing_signals_do_not_poison_cohort() {
        let mut records = three_students();
        records[1].hours_studied = Signal::Missing;
        records[1].attendance_percent = Signal::Missing;

        let cohort = score_cohort(&records).unwrap();
        let r = &cohort.records[1];
        assert_eq!(r.scales.attendance, Signal::Missing);
        assert_eq!(r.pressures.cognitive_load, 0.0);
        assert_eq!(r.pressures.attendance, 0.0);
        assert!(r.instability_index.is_finite());
        assert!(cohort.iter().all(|r| r.instability_index.is_finite()));
    }

    #[test]
    fn test_deterministic() {
        let a = score_cohort(&three_students()).unwrap();
        let b = score_cohort(&three_students()).unwrap();
        assert_eq!(a, b);
    }
}

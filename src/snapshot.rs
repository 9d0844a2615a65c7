//! Persisted enriched snapshot
//!
//! The scored cohort is cached on disk as a columnar JSON document: one array
//! per column plus provenance metadata. The cache is keyed by existence only.
//! If the snapshot file is present it is reused as-is; deleting it is the only
//! way to force a recompute.

use crate::config::Settings;
use crate::error::InstabilityError;
use crate::pipeline::score_cohort;
use crate::source::load_raw;
use crate::types::{
    Pressures, Scales, ScoredCohort, ScoredRecord, Signal, StudentId, StudentRecord, Zone,
};
use crate::zones::ZoneThresholds;
use crate::ENGINE_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Snapshot provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub snapshot_id: Uuid,
    pub engine_version: String,
    pub computed_at_utc: DateTime<Utc>,
    pub rows: usize,
}

/// Column-oriented representation of a scored cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub thresholds: ZoneThresholds,
    pub student_id: Vec<Option<StudentId>>,
    pub gender: Vec<Option<String>>,
    pub hours_studied: Vec<Signal>,
    pub attendance_percent: Vec<Signal>,
    pub assignments_completed: Vec<Signal>,
    pub test_score: Vec<Signal>,
    pub hours_norm: Vec<Signal>,
    pub attendance_norm: Vec<Signal>,
    pub assignments_norm: Vec<Signal>,
    pub pressure_cognitive_load: Vec<f64>,
    pub pressure_attendance: Vec<f64>,
    pub pressure_engagement: Vec<f64>,
    pub buffer_strength: Vec<f64>,
    pub instability_index: Vec<f64>,
    pub early_warning_zone: Vec<Zone>,
}

impl Snapshot {
    /// Split a scored cohort into columns
    pub fn from_cohort(cohort: &ScoredCohort) -> Self {
        Self {
            meta: SnapshotMeta {
                snapshot_id: Uuid::new_v4(),
                engine_version: ENGINE_VERSION.to_string(),
                computed_at_utc: Utc::now(),
                rows: cohort.len(),
            },
            thresholds: cohort.thresholds,
            student_id: column(cohort, |r| r.record.student_id.clone()),
            gender: column(cohort, |r| r.record.gender.clone()),
            hours_studied: column(cohort, |r| r.record.hours_studied),
            attendance_percent: column(cohort, |r| r.record.attendance_percent),
            assignments_completed: column(cohort, |r| r.record.assignments_completed),
            test_score: column(cohort, |r| r.record.test_score),
            hours_norm: column(cohort, |r| r.scales.hours),
            attendance_norm: column(cohort, |r| r.scales.attendance),
            assignments_norm: column(cohort, |r| r.scales.assignments),
            pressure_cognitive_load: column(cohort, |r| r.pressures.cognitive_load),
            pressure_attendance: column(cohort, |r| r.pressures.attendance),
            pressure_engagement: column(cohort, |r| r.pressures.engagement),
            buffer_strength: column(cohort, |r| r.buffer_strength),
            instability_index: column(cohort, |r| r.instability_index),
            early_warning_zone: column(cohort, |r| r.zone),
        }
    }

    /// Reassemble the scored cohort, checking that every column has `rows` entries
    pub fn into_cohort(self) -> Result<ScoredCohort, InstabilityError> {
        let rows = self.meta.rows;
        let lengths = [
            ("student_id", self.student_id.len()),
            ("gender", self.gender.len()),
            ("hours_studied", self.hours_studied.len()),
            ("attendance_percent", self.attendance_percent.len()),
            ("assignments_completed", self.assignments_completed.len()),
            ("test_score", self.test_score.len()),
            ("hours_norm", self.hours_norm.len()),
            ("attendance_norm", self.attendance_norm.len()),
            ("assignments_norm", self.assignments_norm.len()),
            ("pressure_cognitive_load", self.pressure_cognitive_load.len()),
            ("pressure_attendance", self.pressure_attendance.len()),
            ("pressure_engagement", self.pressure_engagement.len()),
            ("buffer_strength", self.buffer_strength.len()),
            ("instability_index", self.instability_index.len()),
            ("early_warning_zone", self.early_warning_zone.len()),
        ];
        if let Some((name, len)) = lengths.iter().find(|(_, len)| *len != rows) {
            return Err(InstabilityError::SnapshotCorrupt(format!(
                "column {name} has {len} rows, expected {rows}"
            )));
        }

        let records = (0..rows)
            .map(|i| ScoredRecord {
                position: i,
                record: StudentRecord {
                    student_id: self.student_id[i].clone(),
                    gender: self.gender[i].clone(),
                    hours_studied: self.hours_studied[i],
                    attendance_percent: self.attendance_percent[i],
                    assignments_completed: self.assignments_completed[i],
                    test_score: self.test_score[i],
                },
                scales: Scales {
                    hours: self.hours_norm[i],
                    attendance: self.attendance_norm[i],
                    assignments: self.assignments_norm[i],
                },
                pressures: Pressures {
                    cognitive_load: self.pressure_cognitive_load[i],
                    attendance: self.pressure_attendance[i],
                    engagement: self.pressure_engagement[i],
                },
                buffer_strength: self.buffer_strength[i],
                instability_index: self.instability_index[i],
                zone: self.early_warning_zone[i],
            })
            .collect();

        Ok(ScoredCohort {
            records,
            thresholds: self.thresholds,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn column<T>(cohort: &ScoredCohort, pick: impl Fn(&ScoredRecord) -> T) -> Vec<T> {
    cohort.iter().map(pick).collect()
}

/// Read-through cache of the scored cohort
pub struct SnapshotStore {
    raw_source: PathBuf,
    snapshot_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(settings: &Settings) -> Self {
        Self {
            raw_source: settings.raw_source.clone(),
            snapshot_path: settings.snapshot_path(),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Return the cached cohort if a snapshot exists, otherwise load the raw
    /// source, score it, and persist the snapshot
    pub fn load_processed(&self) -> Result<ScoredCohort, InstabilityError> {
        if self.snapshot_path.exists() {
            let json = fs::read_to_string(&self.snapshot_path)?;
            let snapshot = Snapshot::from_json(&json)?;
            info!(
                path = %self.snapshot_path.display(),
                snapshot_id = %snapshot.meta.snapshot_id,
                "reusing cached snapshot"
            );
            return snapshot.into_cohort();
        }

        let raw = load_raw(&self.raw_source)?;
        let cohort = score_cohort(&raw)?;
        self.save(&cohort)?;
        Ok(cohort)
    }

    /// Persist a scored cohort, replacing any existing snapshot
    pub fn save(&self, cohort: &ScoredCohort) -> Result<(), InstabilityError> {
        if let Some(parent) = self.snapshot_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let snapshot = Snapshot::from_cohort(cohort);
        fs::write(&self.snapshot_path, snapshot.to_json()?)?;
        info!(
            path = %self.snapshot_path.display(),
            rows = snapshot.meta.rows,
            "snapshot computed and saved"
        );
        Ok(())
    }

    /// Delete the snapshot so the next load recomputes. Returns whether a file was removed.
    pub fn invalidate(&self) -> Result<bool, InstabilityError> {
        if self.snapshot_path.exists() {
            fs::remove_file(&self.snapshot_path)?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RAW: &str = "\
student_id,gender,hours_studied,attendance_percent,assignments_completed,test_score
1,Female,10,90,9,88
2,Male,5,50,5,
3,Other,0,10,1,40
";

    fn settings_with_raw(dir: &Path) -> Settings {
        let settings = Settings::with_base_dir(dir);
        fs::create_dir_all(settings.raw_source.parent().unwrap()).unwrap();
        fs::write(&settings.raw_source, RAW).unwrap();
        settings
    }

    #[test]
    fn test_columnar_round_trip() {
        let raw = crate::source::read_records(RAW.as_bytes()).unwrap();
        let cohort = score_cohort(&raw).unwrap();
        let json = Snapshot::from_cohort(&cohort).to_json().unwrap();
        let restored = Snapshot::from_json(&json).unwrap().into_cohort().unwrap();
        assert_eq!(restored, cohort);
    }

    #[test]
    fn test_mismatched_columns_are_rejected() {
        let raw = crate::source::read_records(RAW.as_bytes()).unwrap();
        let mut snapshot = Snapshot::from_cohort(&score_cohort(&raw).unwrap());
        snapshot.buffer_strength.pop();
        assert!(matches!(
            snapshot.into_cohort(),
            Err(InstabilityError::SnapshotCorrupt(_))
        ));
    }

    #[test]
    fn test_store_reuses_existing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with_raw(dir.path());
        let store = SnapshotStore::new(&settings);

        let first = store.load_processed().unwrap();
        assert!(store.snapshot_path().exists());

        // Changing the raw source has no effect while the snapshot exists
        fs::write(&settings.raw_source, "student_id,hours_studied\n9,1\n").unwrap();
        let second = store.load_processed().unwrap();
        assert_eq!(second, first);

        assert!(store.invalidate().unwrap());
        let third = store.load_processed().unwrap();
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn test_store_without_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(&Settings::with_base_dir(dir.path()));
        assert!(matches!(
            store.load_processed(),
            Err(InstabilityError::SourceNotFound(_))
        ));
        assert!(!store.snapshot_path().exists());
    }
}

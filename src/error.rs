//! Error types for the instability engine and its collaborators

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, scoring, or querying a cohort
#[derive(Debug, Error)]
pub enum InstabilityError {
    #[error("Raw dataset not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Index out of range: {index} (cohort has {len} records)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No student_id matched: {0}")]
    IdNotFound(String),

    #[error("Provide an index or a student id")]
    InvalidSelector,

    #[error("Cohort is empty")]
    EmptyCohort,

    #[error("Snapshot is corrupt: {0}")]
    SnapshotCorrupt(String),

    #[error("Delimited text error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

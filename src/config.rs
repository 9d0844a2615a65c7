//! Filesystem layout for the raw source, the cached snapshot, and reports

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the project base directory
pub const BASE_DIR_ENV: &str = "INSTABILITY_BASE_DIR";

/// Snapshot file name inside the processed directory
pub const SNAPSHOT_FILE: &str = "academic_instability.snapshot.json";

/// Default export file name inside the reports directory
pub const EXPORT_FILE: &str = "instability_snapshot.csv";

/// Resolved locations used by the engine's collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub base_dir: PathBuf,
    /// Raw delimited-text cohort
    pub raw_source: PathBuf,
    /// Directory holding the cached snapshot
    pub processed_dir: PathBuf,
    /// Directory for exported reports
    pub reports_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_base_dir(".")
    }
}

impl Settings {
    /// Standard layout under `base`:
    /// `data/raw/student_performance_analysis.csv`, `data/processed/`, `reports/metrics/`
    pub fn with_base_dir(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            base_dir: base.to_path_buf(),
            raw_source: base
                .join("data")
                .join("raw")
                .join("student_performance_analysis.csv"),
            processed_dir: base.join("data").join("processed"),
            reports_dir: base.join("reports").join("metrics"),
        }
    }

    /// Layout rooted at `$INSTABILITY_BASE_DIR`, or the current directory
    pub fn from_env() -> Self {
        match std::env::var_os(BASE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::with_base_dir(PathBuf::from(dir)),
            _ => Self::default(),
        }
    }

    /// Replace the raw source path, keeping the rest of the layout
    pub fn with_raw_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw_source = path.into();
        self
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.processed_dir.join(SNAPSHOT_FILE)
    }

    pub fn default_export_path(&self) -> PathBuf {
        self.reports_dir.join(EXPORT_FILE)
    }
}

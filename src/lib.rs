//! Academic Instability - Interpretable early-warning scoring for student cohorts
//!
//! The engine turns a cohort of raw behavioral signals (study hours,
//! attendance, assignment completion) into an instability index through a
//! deterministic whole-cohort pipeline: numeric coercion → min-max
//! normalization → robust standardization → pressures and buffer → instability
//! index → cohort-relative zones.
//!
//! ## Modules
//!
//! - **Engine**: `normalizer`, `baseline`, `features`, `zones`, `pipeline`
//! - **Counterfactuals**: re-score a cohort with one student's signals adjusted
//! - **Collaborators**: CSV source and export, columnar snapshot cache, cohort queries
//!
//! Zones are not absolute thresholds. They are percentiles of the cohort the
//! index was computed against.

pub mod baseline;
pub mod cohort;
pub mod config;
pub mod counterfactual;
pub mod error;
pub mod features;
pub mod normalizer;
pub mod pipeline;
pub mod snapshot;
pub mod source;
pub mod types;
pub mod zones;

pub use cohort::{filter_by_zone, select_record, zone_summary, ZoneStats};
pub use config::Settings;
pub use counterfactual::{evaluate_counterfactual, CounterfactualOutcome, Intervention};
pub use error::InstabilityError;
pub use pipeline::score_cohort;
pub use snapshot::{Snapshot, SnapshotStore};
pub use types::{
    Pressures, Scales, ScoredCohort, ScoredRecord, Signal, StudentId, StudentRecord, Zone,
};
pub use zones::ZoneThresholds;

/// Engine version recorded in every snapshot
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for snapshots and CLI reports
pub const PRODUCER_NAME: &str = "academic-instability";

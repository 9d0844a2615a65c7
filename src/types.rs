//! Core types for the instability engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: raw student records, normalized scales, pressure components, and the
//! scored cohort.

use crate::zones::ZoneThresholds;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw or derived numeric value that may be missing.
///
/// Missing values never silently propagate as NaN. Every stage that aggregates
/// signals states its own fill policy through [`Signal::fill`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Signal {
    Present(f64),
    #[default]
    Missing,
}

impl Signal {
    /// Build a signal from a float, treating non-finite values as missing
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Signal::Present(value)
        } else {
            Signal::Missing
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Signal::Present(v) => Some(v),
            Signal::Missing => None,
        }
    }

    pub fn is_present(self) -> bool {
        matches!(self, Signal::Present(_))
    }

    /// Value, or `fallback` when missing
    pub fn fill(self, fallback: f64) -> f64 {
        self.value().unwrap_or(fallback)
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Signal::Present(v) => Signal::from_f64(f(v)),
            Signal::Missing => Signal::Missing,
        }
    }
}

impl From<Option<f64>> for Signal {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Signal::Missing, Signal::from_f64)
    }
}

impl From<Signal> for Option<f64> {
    fn from(signal: Signal) -> Self {
        signal.value()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Present(v) => write!(f, "{v}"),
            Signal::Missing => f.write_str("missing"),
        }
    }
}

/// Student identifier as it appears in the source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StudentId {
    Int(i64),
    Text(String),
}

impl StudentId {
    /// Parse a raw identifier cell; blank cells have no identifier
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.parse::<i64>() {
            Ok(n) => StudentId::Int(n),
            Err(_) => StudentId::Text(trimmed.to_string()),
        })
    }

    /// Whether a user-supplied lookup key refers to this identifier
    pub fn matches(&self, key: &str) -> bool {
        let key = key.trim();
        match self {
            StudentId::Int(n) => key.parse::<i64>().map_or(false, |k| k == *n),
            StudentId::Text(s) => s == key,
        }
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentId::Int(n) => write!(f, "{n}"),
            StudentId::Text(s) => f.write_str(s),
        }
    }
}

/// One row of the raw cohort
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: Option<StudentId>,
    /// Free text, trimmed of surrounding whitespace
    pub gender: Option<String>,
    pub hours_studied: Signal,
    pub attendance_percent: Signal,
    pub assignments_completed: Signal,
    /// Display only, never an engine input
    pub test_score: Signal,
}

impl StudentRecord {
    /// Record with the three actionable signals present
    pub fn new(hours_studied: f64, attendance_percent: f64, assignments_completed: f64) -> Self {
        Self {
            hours_studied: Signal::from_f64(hours_studied),
            attendance_percent: Signal::from_f64(attendance_percent),
            assignments_completed: Signal::from_f64(assignments_completed),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: StudentId) -> Self {
        self.student_id = Some(id);
        self
    }
}

/// Min-max normalized scales (0-1)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scales {
    pub hours: Signal,
    pub attendance: Signal,
    pub assignments: Signal,
}

/// Destabilizing pressure components, each in [-1, 0]
///
/// Zero means no pressure; more negative means more pressure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pressures {
    pub cognitive_load: f64,
    pub attendance: f64,
    pub engagement: f64,
}

impl Pressures {
    pub fn as_array(&self) -> [f64; 3] {
        [self.cognitive_load, self.attendance, self.engagement]
    }

    /// Labelled components in display order
    pub fn labelled(&self) -> [(&'static str, f64); 3] {
        [
            ("Cognitive Load", self.cognitive_load),
            ("Attendance", self.attendance),
            ("Engagement", self.engagement),
        ]
    }
}

/// Early-warning zone, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Stable,
    Fragile,
    Unstable,
    Critical,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Stable, Zone::Fragile, Zone::Unstable, Zone::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Stable => "Stable",
            Zone::Fragile => "Fragile",
            Zone::Unstable => "Unstable",
            Zone::Critical => "Critical",
        }
    }

    /// Case-insensitive parse of a zone label
    pub fn parse(raw: &str) -> Option<Self> {
        Zone::ALL
            .into_iter()
            .find(|z| z.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A student record with every derived field populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// Position in the cohort
    pub position: usize,
    pub record: StudentRecord,
    pub scales: Scales,
    pub pressures: Pressures,
    /// Protective capacity (0-1)
    pub buffer_strength: f64,
    /// Composite instability (0-1.5)
    pub instability_index: f64,
    pub zone: Zone,
}

impl ScoredRecord {
    /// Student id, falling back to the positional index
    pub fn display_id(&self) -> String {
        match &self.record.student_id {
            Some(id) => id.to_string(),
            None => self.position.to_string(),
        }
    }

    /// Selection label: `[i] Student <id> | <gender> | <zone>`
    pub fn label(&self) -> String {
        format!(
            "[{}] Student {} | {} | {}",
            self.position,
            self.display_id(),
            self.record.gender.as_deref().unwrap_or(""),
            self.zone
        )
    }
}

/// A fully scored cohort together with the zone thresholds it was classified against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCohort {
    pub records: Vec<ScoredRecord>,
    pub thresholds: ZoneThresholds,
}

impl ScoredCohort {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ScoredRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredRecord> {
        self.records.iter()
    }

    /// Raw records in cohort order, for re-scoring
    pub fn raw_records(&self) -> Vec<StudentRecord> {
        self.records.iter().map(|r| r.record.clone()).collect()
    }
}

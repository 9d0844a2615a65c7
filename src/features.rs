//! Feature derivation
//!
//! This module derives the per-record composite features from normalized
//! scales and robust scores:
//! - Pressure components (cognitive load, attendance, engagement)
//! - Buffer strength
//! - Instability index

use crate::baseline::sample_std;
use crate::types::{Pressures, Scales, Signal};

/// Buffer weight on attendance
pub const BUFFER_ATTENDANCE_WEIGHT: f64 = 0.55;
/// Buffer weight on assignment completion
pub const BUFFER_ASSIGNMENTS_WEIGHT: f64 = 0.45;

/// Instability weight on mean pressure magnitude
pub const MAGNITUDE_WEIGHT: f64 = 0.55;
/// Instability weight on imbalance between pressures
pub const IMBALANCE_WEIGHT: f64 = 0.20;
/// Instability weight on weak buffers
pub const WEAK_BUFFER_WEIGHT: f64 = 0.25;

/// Upper bound of the instability index
pub const INSTABILITY_MAX: f64 = 1.5;

/// Per-record features before cohort zoning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordFeatures {
    pub pressures: Pressures,
    pub buffer_strength: f64,
    pub instability_index: f64,
}

/// Feature deriver for computing pressures, buffer, and instability
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Derive features for one record from its scales and robust hours score
    pub fn derive(scales: &Scales, hours_robust: Signal) -> RecordFeatures {
        let pressures = compute_pressures(scales, hours_robust);
        let buffer_strength = compute_buffer_strength(scales);
        let instability_index = compute_instability(&pressures, buffer_strength);

        RecordFeatures {
            pressures,
            buffer_strength,
            instability_index,
        }
    }
}

/// U-shaped load pressure: deviation from typical study time in either
/// direction pushes toward -1. Missing scores carry no pressure.
pub fn cognitive_load_pressure(robust_score: Signal) -> f64 {
    robust_score
        .map(|z| -(z.abs() / 2.0).tanh())
        .fill(0.0)
        .clamp(-1.0, 0.0)
        + 0.0
}

/// Shortfall pressure for a normalized scale: `-clamp(1 - scale, 0, 1)`.
/// Missing scales carry no pressure.
pub fn shortfall_pressure(scale: Signal) -> f64 {
    scale.map(|s| -(1.0 - s).clamp(0.0, 1.0)).fill(0.0) + 0.0
}

fn compute_pressures(scales: &Scales, hours_robust: Signal) -> Pressures {
    Pressures {
        cognitive_load: cognitive_load_pressure(hours_robust),
        attendance: shortfall_pressure(scales.attendance),
        engagement: shortfall_pressure(scales.assignments),
    }
}

/// Weighted protective capacity. Missing scales contribute nothing.
fn compute_buffer_strength(scales: &Scales) -> f64 {
    (BUFFER_ATTENDANCE_WEIGHT * scales.attendance.fill(0.0)
        + BUFFER_ASSIGNMENTS_WEIGHT * scales.assignments.fill(0.0))
    .clamp(0.0, 1.0)
}

/// Spread between the pressure components (sample standard deviation)
pub fn pressure_imbalance(pressures: &Pressures) -> f64 {
    sample_std(&pressures.as_array())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Combine pressure magnitude, imbalance, and weak buffers into the index
pub fn compute_instability(pressures: &Pressures, buffer_strength: f64) -> f64 {
    let components = pressures.as_array();
    let neg_mag = -components.iter().sum::<f64>() / components.len() as f64;
    let imbalance = pressure_imbalance(pressures);
    let weak_buffer = (1.0 - buffer_strength).clamp(0.0, 1.0);

    (MAGNITUDE_WEIGHT * neg_mag + IMBALANCE_WEIGHT * imbalance + WEAK_BUFFER_WEIGHT * weak_buffer)
        .clamp(0.0, INSTABILITY_MAX)
}

//! Cohort queries
//!
//! Record lookup, zone filtering, and the cohort-level zone summary used by
//! the command surface.

use crate::baseline::mean;
use crate::error::InstabilityError;
use crate::types::{ScoredCohort, ScoredRecord, Zone};
use serde::{Deserialize, Serialize};

/// Look up one record. An identifier takes precedence over an index.
///
/// When no record carries a student id the identifier column is treated as
/// absent: the index is used if given, otherwise the identifier is matched
/// against the positional id that [`ScoredRecord::display_id`] shows.
/// Distinct errors for "no such index" and "no such id"; neither selector
/// given is [`InstabilityError::InvalidSelector`].
pub fn select_record<'a>(
    cohort: &'a ScoredCohort,
    index: Option<usize>,
    id: Option<&str>,
) -> Result<&'a ScoredRecord, InstabilityError> {
    let has_ids = cohort.iter().any(|r| r.record.student_id.is_some());

    match (id, index) {
        (Some(key), _) if has_ids => cohort
            .iter()
            .find(|r| r.record.student_id.as_ref().is_some_and(|sid| sid.matches(key)))
            .ok_or_else(|| InstabilityError::IdNotFound(key.to_string())),
        (_, Some(index)) => cohort.get(index).ok_or(InstabilityError::IndexOutOfRange {
            index,
            len: cohort.len(),
        }),
        (Some(key), None) => cohort
            .iter()
            .find(|r| r.display_id() == key.trim())
            .ok_or_else(|| InstabilityError::IdNotFound(key.to_string())),
        (None, None) => Err(InstabilityError::InvalidSelector),
    }
}

/// Records in any of the given zones; an empty filter keeps everything
pub fn filter_by_zone<'a>(cohort: &'a ScoredCohort, zones: &[Zone]) -> Vec<&'a ScoredRecord> {
    cohort
        .iter()
        .filter(|r| zones.is_empty() || zones.contains(&r.zone))
        .collect()
}

/// Aggregate view of one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneStats {
    pub zone: Zone,
    pub count: usize,
    pub mean_buffer_strength: Option<f64>,
    pub mean_instability: Option<f64>,
}

/// Zone counts and means, in severity order, for every zone
pub fn zone_summary(cohort: &ScoredCohort) -> Vec<ZoneStats> {
    Zone::ALL
        .into_iter()
        .map(|zone| {
            let members: Vec<&ScoredRecord> = cohort.iter().filter(|r| r.zone == zone).collect();
            let buffers: Vec<f64> = members.iter().map(|r| r.buffer_strength).collect();
            let instability: Vec<f64> = members.iter().map(|r| r.instability_index).collect();

            ZoneStats {
                zone,
                count: members.len(),
                mean_buffer_strength: mean(&buffers),
                mean_instability: mean(&instability),
            }
        })
        .collect()
}

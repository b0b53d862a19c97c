// src/dedup.rs
//
// Merges manual assignment candidates before they are persisted, so the
// backing store never accumulates fragmentary records for what is
// conceptually one continuous assignment.

use std::collections::HashMap;

use crate::timegrid::{format_minutes, parse_time_to_minutes};

/// A manual assignment about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManualCandidate {
    pub employee_id: i64,
    pub shift_id: i64,
    pub role: String,
    pub start_time: String,
    pub end_time: String,
}

/// Groups candidates by (employee, shift, role) and merges overlapping or
/// contiguous ranges into the widest covering range; non-adjacent ranges
/// stay separate. Candidates whose times do not parse, or whose range is
/// empty, are dropped.
///
/// Deterministic: the same candidate set in any input order produces the
/// same merged set in the same order (groups sort by key, ranges by
/// start).
pub fn dedup_manual_candidates(candidates: &[ManualCandidate]) -> Vec<ManualCandidate> {
    let mut groups: HashMap<(i64, i64, String), Vec<(u16, u16)>> = HashMap::new();

    for candidate in candidates {
        let (Some(start), Some(end)) = (
            parse_time_to_minutes(&candidate.start_time),
            parse_time_to_minutes(&candidate.end_time),
        ) else {
            continue;
        };
        if end <= start {
            continue;
        }
        groups
            .entry((
                candidate.employee_id,
                candidate.shift_id,
                candidate.role.clone(),
            ))
            .or_default()
            .push((start, end));
    }

    let mut keys: Vec<(i64, i64, String)> = groups.keys().cloned().collect();
    keys.sort();

    let mut merged = Vec::new();
    for key in keys {
        let mut ranges = groups.remove(&key).unwrap_or_default();
        ranges.sort();

        let mut covering: Vec<(u16, u16)> = Vec::new();
        for (start, end) in ranges {
            match covering.last_mut() {
                // Contiguous counts as overlapping: 9:00-9:30 + 9:30-10:00
                // is one continuous assignment.
                Some((_, current_end)) if start <= *current_end => {
                    *current_end = (*current_end).max(end);
                }
                _ => covering.push((start, end)),
            }
        }

        let (employee_id, shift_id, role) = key;
        for (start, end) in covering {
            merged.push(ManualCandidate {
                employee_id,
                shift_id,
                role: role.clone(),
                start_time: format_minutes(start),
                end_time: format_minutes(end),
            });
        }
    }
    merged
}

// src/projection.rs
//
// Places one day's assignments onto the time grid. Pure: dangling
// references render as fallbacks, malformed ranges are skipped, and the
// result is rebuilt from scratch on every call.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

use crate::fitness::{score_to_tone, FitnessScorer, Tone};
use crate::indicators::Demand;
use crate::roster_client::{ShiftRecord, WeekBundle};
use crate::timegrid::{generate_time_slots, parse_time_to_minutes, GridConfig, SlotStaff, TimeSlot};

/// Effective time range of an assignment in minutes: the manual sub-range
/// when one is present and parses, otherwise the parent shift's full
/// range. `None` when nothing usable parses.
fn effective_range(
    shift: &ShiftRecord,
    start_time: Option<&str>,
    end_time: Option<&str>,
    is_manual: bool,
) -> Option<(u16, u16)> {
    if is_manual {
        if let (Some(start), Some(end)) = (
            start_time.and_then(parse_time_to_minutes),
            end_time.and_then(parse_time_to_minutes),
        ) {
            return Some((start, end));
        }
    }
    let start = parse_time_to_minutes(&shift.start)?;
    let end = parse_time_to_minutes(&shift.end)?;
    Some((start, end))
}

/// Builds the rendered slot list for one day.
///
/// Each assignment whose parent shift falls on `date` is attached to
/// every slot whose start time lies inside its effective range. Unknown
/// employee ids render as "#<employeeId>" rather than failing; a slot's
/// mismatch count is the number of alert-tone staff it holds.
pub fn build_day_slots(
    date: NaiveDate,
    bundle: &WeekBundle,
    day_demand: Option<Demand>,
    scorer: &dyn FitnessScorer,
    grid: &GridConfig,
) -> Vec<TimeSlot> {
    let shift_by_id: HashMap<i64, &ShiftRecord> =
        bundle.shifts.iter().map(|s| (s.shift_id, s)).collect();
    let employee_by_id: HashMap<i64, _> = bundle
        .employees
        .iter()
        .map(|e| (e.employee_id, e))
        .collect();

    let day_shifts: Vec<ShiftRecord> = bundle
        .shifts
        .iter()
        .filter(|s| s.date == date)
        .cloned()
        .collect();
    let mut slots = generate_time_slots(&day_shifts, grid);
    for slot in &mut slots {
        slot.demand = day_demand;
    }

    for assignment in &bundle.assignments {
        let Some(shift) = shift_by_id.get(&assignment.shift_id) else {
            debug!(
                shift_id = assignment.shift_id,
                "skipping assignment with unknown shift"
            );
            continue;
        };
        if shift.date != date {
            continue;
        }
        let Some((start, end)) = effective_range(
            shift,
            assignment.start_time.as_deref(),
            assignment.end_time.as_deref(),
            assignment.is_manual,
        ) else {
            debug!(id = %assignment.id, "skipping assignment with unparseable range");
            continue;
        };

        let employee = employee_by_id.get(&assignment.employee_id);
        let name = match employee {
            Some(e) => e.display_name(),
            None => format!("#{}", assignment.employee_id),
        };
        let score = employee.map(|e| scorer.score(e, day_demand)).unwrap_or(0.0);
        let tone = score_to_tone(score);

        for slot in &mut slots {
            let Some(slot_start) = parse_time_to_minutes(&slot.start_time) else {
                continue;
            };
            if slot_start >= start && slot_start < end {
                slot.assigned_staff.push(SlotStaff {
                    employee_id: assignment.employee_id,
                    shift_id: assignment.shift_id,
                    name: name.clone(),
                    role: assignment.role.clone(),
                    tone,
                });
            }
        }
    }

    for slot in &mut slots {
        slot.mismatches = slot
            .assigned_staff
            .iter()
            .filter(|s| s.tone == Tone::Alert)
            .count() as u32;
    }
    slots
}

/// Aggregate ok/alert indicator for one slot: the majority tone among its
/// assigned staff. A tie or an empty slot reads as alert so understaffing
/// is always visible.
pub fn slot_tone(slot: &TimeSlot) -> Tone {
    let mut good = 0u32;
    let mut warn = 0u32;
    let mut alert = 0u32;
    for staff in &slot.assigned_staff {
        match staff.tone {
            Tone::Good => good += 1,
            Tone::Warn => warn += 1,
            Tone::Alert => alert += 1,
        }
    }
    let top = good.max(warn).max(alert);
    if top == 0 {
        return Tone::Alert;
    }
    let leaders = [(Tone::Good, good), (Tone::Warn, warn), (Tone::Alert, alert)]
        .into_iter()
        .filter(|(_, count)| *count == top)
        .collect::<Vec<_>>();
    match leaders.as_slice() {
        [(tone, _)] => *tone,
        _ => Tone::Alert,
    }
}

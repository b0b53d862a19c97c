// src/reconcile.rs
//
// The day-mode state machine and the convert-to-manual protocol. A day's
// assignments are either all machine-generated or all hand-placed; the
// moment a single slot on an auto day is edited, the whole day flips to
// manual via snapshot, clear and sequential replay.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::dedup::{dedup_manual_candidates, ManualCandidate};
use crate::roster_client::{
    AssignmentRecord, ManualAssignmentPayload, RosterError, SchedulerApi, WeekBundle,
};
use crate::timegrid::{parse_time_to_minutes, TimeSlot};

/// Scheduling provenance of one day's assignment set.
///
/// `Manual` is absorbing: the only way back to `Auto` is a full re-run of
/// the external scheduler, which is an explicit user action, not a
/// reconciler transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayMode {
    Unscheduled,
    Auto,
    Manual,
}

/// Classifies a day from its assignment records. A mixed set (possible
/// after a partial replay failure) classifies as `Auto` so the next edit
/// re-runs the conversion protocol and restores the invariant.
pub fn day_mode<'a, I>(assignments: I) -> DayMode
where
    I: IntoIterator<Item = &'a AssignmentRecord>,
{
    let mut saw_any = false;
    for assignment in assignments {
        if !assignment.is_manual {
            return DayMode::Auto;
        }
        saw_any = true;
    }
    if saw_any {
        DayMode::Manual
    } else {
        DayMode::Unscheduled
    }
}

/// The assignments whose parent shift falls on `date`. Records referencing
/// unknown shifts are ignored.
pub fn assignments_for_day<'a>(
    bundle: &'a WeekBundle,
    date: NaiveDate,
) -> Vec<&'a AssignmentRecord> {
    let shift_dates: HashMap<i64, NaiveDate> = bundle
        .shifts
        .iter()
        .map(|s| (s.shift_id, s.date))
        .collect();
    bundle
        .assignments
        .iter()
        .filter(|a| shift_dates.get(&a.shift_id) == Some(&date))
        .collect()
}

/// A single-slot staffing edit requested by the user.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotEdit {
    Add {
        shift_id: i64,
        employee_id: i64,
        role: String,
        start_time: String,
        end_time: String,
    },
    Remove {
        shift_id: i64,
        employee_id: i64,
        start_time: String,
        end_time: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Direct create on a manual or unscheduled day.
    Created { assignment_id: String },
    /// Direct delete(s) on a manual day.
    Deleted { count: usize },
    /// An auto day was converted: cleared and replayed as manual records.
    ConvertedToManual { cleared: u64, restored: usize },
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("scheduling service call failed")]
    Api(#[from] RosterError),

    #[error("edited slot range '{start_time}' - '{end_time}' does not parse")]
    InvalidSlotRange {
        start_time: String,
        end_time: String,
    },

    #[error("no manual assignment matches the edited slot")]
    NoMatchingAssignment,

    /// The day was cleared but only a prefix of the replay was recreated.
    /// There is no rollback; the caller must refetch to surface the true
    /// state.
    #[error("replay failed after clearing day: restored {created} of {total} entries")]
    ReplayFailed {
        created: usize,
        total: usize,
        #[source]
        source: RosterError,
    },
}

/// Executes single-slot edits against the external store, enforcing the
/// day-mode invariant. One reconciliation per day at a time is a caller
/// convention; edits to different days touch disjoint records and are
/// safe to interleave.
pub struct DayModeReconciler<A: SchedulerApi> {
    api: Arc<A>,
}

impl<A: SchedulerApi> DayModeReconciler<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Applies one slot edit. `rendered` must be the currently displayed
    /// slot list for the day (it already reflects any in-flight local
    /// edit); on an auto day it becomes the replay snapshot.
    pub async fn edit_slot(
        &self,
        week: &str,
        date: NaiveDate,
        bundle: &WeekBundle,
        rendered: &[TimeSlot],
        edit: SlotEdit,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let day_assignments = assignments_for_day(bundle, date);
        let mode = day_mode(day_assignments.iter().copied());
        info!(week, %date, ?mode, "applying slot edit");

        match mode {
            DayMode::Unscheduled | DayMode::Manual => {
                self.apply_direct(week, &day_assignments, edit).await
            }
            DayMode::Auto => self.convert_day_to_manual(week, date, rendered, edit).await,
        }
    }

    /// On a manual or unscheduled day an edit is a plain create or delete
    /// with no day-wide side effects.
    async fn apply_direct(
        &self,
        week: &str,
        day_assignments: &[&AssignmentRecord],
        edit: SlotEdit,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match edit {
            SlotEdit::Add {
                shift_id,
                employee_id,
                role,
                start_time,
                end_time,
            } => {
                let payload = ManualAssignmentPayload {
                    week: week.to_string(),
                    shift_id,
                    employee_id,
                    role,
                    start_time: Some(start_time),
                    end_time: Some(end_time),
                };
                let assignment_id = self.api.create_manual_assignment(&payload).await?;
                Ok(ReconcileOutcome::Created { assignment_id })
            }
            SlotEdit::Remove {
                shift_id,
                employee_id,
                start_time,
                end_time,
            } => {
                let (slot_start, slot_end) = parse_slot_range(&start_time, &end_time)?;
                let matching: Vec<&&AssignmentRecord> = day_assignments
                    .iter()
                    .filter(|a| {
                        a.is_manual
                            && a.shift_id == shift_id
                            && a.employee_id == employee_id
                            && covers_slot(a, slot_start, slot_end)
                    })
                    .collect();
                if matching.is_empty() {
                    return Err(ReconcileError::NoMatchingAssignment);
                }
                for assignment in &matching {
                    self.api
                        .delete_manual_assignment(week, &assignment.id)
                        .await?;
                }
                Ok(ReconcileOutcome::Deleted {
                    count: matching.len(),
                })
            }
        }
    }

    /// The snapshot, clear, replay-minus-one protocol.
    ///
    /// Remote calls run strictly sequentially so the replay order is
    /// deterministic and a partial failure leaves a predictable prefix of
    /// restored assignments. There is no rollback; see `ReplayFailed`.
    async fn convert_day_to_manual(
        &self,
        week: &str,
        date: NaiveDate,
        rendered: &[TimeSlot],
        edit: SlotEdit,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        // 1. Snapshot every rendered slot's staff.
        let mut candidates: Vec<ManualCandidate> = Vec::new();
        for slot in rendered {
            for staff in &slot.assigned_staff {
                candidates.push(ManualCandidate {
                    employee_id: staff.employee_id,
                    shift_id: staff.shift_id,
                    role: staff.role.clone(),
                    start_time: slot.start_time.clone(),
                    end_time: slot.end_time.clone(),
                });
            }
        }

        // 2. Apply the edit: drop the removed entry, or append the added
        //    one directly rather than via snapshot replay.
        match &edit {
            SlotEdit::Remove {
                shift_id,
                employee_id,
                start_time,
                end_time,
            } => {
                let (slot_start, slot_end) = parse_slot_range(start_time, end_time)?;
                candidates.retain(|c| {
                    let inside = parse_time_to_minutes(&c.start_time)
                        .map(|s| s >= slot_start && s < slot_end)
                        .unwrap_or(false);
                    !(c.employee_id == *employee_id && c.shift_id == *shift_id && inside)
                });
            }
            SlotEdit::Add {
                shift_id,
                employee_id,
                role,
                start_time,
                end_time,
            } => {
                candidates.push(ManualCandidate {
                    employee_id: *employee_id,
                    shift_id: *shift_id,
                    role: role.clone(),
                    start_time: start_time.clone(),
                    end_time: end_time.clone(),
                });
            }
        }

        // 3. Merge per-slot fragments before touching the store.
        let replay = dedup_manual_candidates(&candidates);

        // 4. Bulk clear, then sequential replay.
        let cleared = self.api.clear_day(week, date).await?;
        info!(week, %date, cleared, replay = replay.len(), "day cleared, replaying as manual");

        for (index, candidate) in replay.iter().enumerate() {
            let payload = ManualAssignmentPayload {
                week: week.to_string(),
                shift_id: candidate.shift_id,
                employee_id: candidate.employee_id,
                role: candidate.role.clone(),
                start_time: Some(candidate.start_time.clone()),
                end_time: Some(candidate.end_time.clone()),
            };
            if let Err(source) = self.api.create_manual_assignment(&payload).await {
                error!(
                    week, %date,
                    created = index,
                    total = replay.len(),
                    "replay create failed, day left partially restored"
                );
                return Err(ReconcileError::ReplayFailed {
                    created: index,
                    total: replay.len(),
                    source,
                });
            }
        }

        Ok(ReconcileOutcome::ConvertedToManual {
            cleared,
            restored: replay.len(),
        })
    }
}

fn parse_slot_range(start_time: &str, end_time: &str) -> Result<(u16, u16), ReconcileError> {
    match (
        parse_time_to_minutes(start_time),
        parse_time_to_minutes(end_time),
    ) {
        (Some(start), Some(end)) if end > start => Ok((start, end)),
        _ => Err(ReconcileError::InvalidSlotRange {
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
        }),
    }
}

/// Whether a manual record's range covers the edited slot. A manual
/// record without an explicit range spans its whole shift and therefore
/// covers any slot inside it.
fn covers_slot(assignment: &AssignmentRecord, slot_start: u16, slot_end: u16) -> bool {
    match (
        assignment.start_time.as_deref().and_then(parse_time_to_minutes),
        assignment.end_time.as_deref().and_then(parse_time_to_minutes),
    ) {
        (Some(start), Some(end)) => start <= slot_start && end >= slot_end,
        _ => {
            warn!(id = %assignment.id, "manual assignment without explicit range, treating as full-shift");
            true
        }
    }
}

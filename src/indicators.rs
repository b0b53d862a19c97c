// src/indicators.rs
//
// Week aggregation: turns the raw shift/assignment/employee bundle into
// one indicator record per day. Pure and total; malformed or dangling
// records are skipped, never fatal.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::fitness::{score_to_tone, FitnessScorer, Tone};
use crate::roster_client::{AssignmentRecord, EmployeeRecord, ShiftRecord};
use crate::timegrid::parse_time_to_minutes;

// Canonical scheduler role codes that map onto a single-product demand.
pub const ROLE_BARISTA: &str = "BARISTA";
pub const ROLE_SANDWICH: &str = "SANDWICH";

/// Dominant product category a day's shifts are weighted toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Demand {
    Coffee,
    Sandwich,
    Mixed,
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Demand::Coffee => "Coffee",
            Demand::Sandwich => "Sandwich",
            Demand::Mixed => "Mixed",
        };
        f.write_str(label)
    }
}

/// Expected customer volume level for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Traffic {
    Low,
    Medium,
    High,
}

impl fmt::Display for Traffic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Traffic::Low => "low",
            Traffic::Medium => "medium",
            Traffic::High => "high",
        };
        f.write_str(label)
    }
}

/// Derived per-day health record. Recomputed on every fetch; never
/// persisted by this engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayIndicator {
    pub date: NaiveDate,
    pub demand: Demand,
    pub traffic: Traffic,
    pub mismatches: u32,
}

fn shift_minutes(shift: &ShiftRecord) -> u32 {
    match (
        parse_time_to_minutes(&shift.start),
        parse_time_to_minutes(&shift.end),
    ) {
        (Some(start), Some(end)) if end > start => (end - start) as u32,
        _ => 0,
    }
}

#[derive(Default)]
struct DayAccum {
    minutes: u32,
    role_minutes: HashMap<String, u32>,
    traffic_hint: Option<Traffic>,
}

fn classify_demand(role_minutes: &HashMap<String, u32>) -> Demand {
    let Some(top) = role_minutes.values().copied().max() else {
        return Demand::Mixed;
    };
    let leaders: Vec<&str> = role_minutes
        .iter()
        .filter(|(_, m)| **m == top)
        .map(|(role, _)| role.as_str())
        .collect();
    // A tie between roles is a mixed day by definition.
    match leaders.as_slice() {
        [ROLE_BARISTA] => Demand::Coffee,
        [ROLE_SANDWICH] => Demand::Sandwich,
        _ => Demand::Mixed,
    }
}

fn bucket_traffic(minutes: u32, min_minutes: u32, max_minutes: u32) -> Traffic {
    if max_minutes == min_minutes {
        return Traffic::Low;
    }
    let span = (max_minutes - min_minutes) as f64;
    let q1 = min_minutes as f64 + span / 3.0;
    let q2 = min_minutes as f64 + 2.0 * span / 3.0;
    let m = minutes as f64;
    if m < q1 {
        Traffic::Low
    } else if m < q2 {
        Traffic::Medium
    } else {
        Traffic::High
    }
}

/// Builds one `DayIndicator` per day that has at least one shift.
///
/// Traffic comes from the first explicit per-shift hint seen for the day,
/// falling back to equal-width tertile bucketing over the week's per-day
/// minute totals (all days equal buckets to low). Demand is the role with
/// the most scheduled minutes; mismatches count unique shifts carrying at
/// least one alert-tone assignment, so a short-staffed shift is penalised
/// once no matter how many poor fits it holds.
pub fn build_week_indicators(
    shifts: &[ShiftRecord],
    assignments: &[AssignmentRecord],
    employees: &[EmployeeRecord],
    scorer: &dyn FitnessScorer,
) -> HashMap<NaiveDate, DayIndicator> {
    let mut by_day: HashMap<NaiveDate, DayAccum> = HashMap::new();

    for shift in shifts {
        let minutes = shift_minutes(shift);
        let accum = by_day.entry(shift.date).or_default();
        accum.minutes += minutes;
        *accum
            .role_minutes
            .entry(shift.role.to_uppercase())
            .or_insert(0) += minutes;
        if accum.traffic_hint.is_none() {
            accum.traffic_hint = shift.expected_traffic;
        }
    }

    let demand_by_day: HashMap<NaiveDate, Demand> = by_day
        .iter()
        .map(|(date, accum)| (*date, classify_demand(&accum.role_minutes)))
        .collect();

    // Unique shifts with at least one alert-tone assignment. Dangling
    // shift or employee references are expected mid-fetch and skipped.
    let shift_by_id: HashMap<i64, &ShiftRecord> =
        shifts.iter().map(|s| (s.shift_id, s)).collect();
    let employee_by_id: HashMap<i64, &EmployeeRecord> =
        employees.iter().map(|e| (e.employee_id, e)).collect();

    let mut alert_shifts: HashSet<i64> = HashSet::new();
    for assignment in assignments {
        let Some(shift) = shift_by_id.get(&assignment.shift_id) else {
            debug!(
                shift_id = assignment.shift_id,
                "skipping assignment with unknown shift"
            );
            continue;
        };
        let Some(employee) = employee_by_id.get(&assignment.employee_id) else {
            debug!(
                employee_id = assignment.employee_id,
                "skipping assignment with unknown employee"
            );
            continue;
        };
        let demand = demand_by_day.get(&shift.date).copied();
        let score = scorer.score(employee, demand);
        if score_to_tone(score) == Tone::Alert {
            alert_shifts.insert(assignment.shift_id);
        }
    }

    let mut mismatches_by_day: HashMap<NaiveDate, u32> = HashMap::new();
    for shift_id in &alert_shifts {
        if let Some(shift) = shift_by_id.get(shift_id) {
            *mismatches_by_day.entry(shift.date).or_insert(0) += 1;
        }
    }

    let min_minutes = by_day.values().map(|a| a.minutes).min().unwrap_or(0);
    let max_minutes = by_day.values().map(|a| a.minutes).max().unwrap_or(0);

    by_day
        .into_iter()
        .map(|(date, accum)| {
            let traffic = accum
                .traffic_hint
                .unwrap_or_else(|| bucket_traffic(accum.minutes, min_minutes, max_minutes));
            let indicator = DayIndicator {
                date,
                demand: demand_by_day.get(&date).copied().unwrap_or(Demand::Mixed),
                traffic,
                mismatches: mismatches_by_day.get(&date).copied().unwrap_or(0),
            };
            (date, indicator)
        })
        .collect()
}

/// Week-scoped cache of first-seen demand and traffic labels.
///
/// The caller owns one of these per roster view and routes every fresh
/// aggregation through `apply`: mismatch counts always track the latest
/// bundle, while the demand and traffic a day first showed stay put
/// across refetches. Switching to another week clears the cache.
#[derive(Debug, Default)]
pub struct IndicatorCache {
    week: Option<String>,
    first_seen: HashMap<NaiveDate, (Demand, Traffic)>,
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(
        &mut self,
        week: &str,
        fresh: HashMap<NaiveDate, DayIndicator>,
    ) -> HashMap<NaiveDate, DayIndicator> {
        if self.week.as_deref() != Some(week) {
            debug!(week, "indicator cache reset for new week");
            self.week = Some(week.to_string());
            self.first_seen.clear();
        }
        fresh
            .into_iter()
            .map(|(date, mut indicator)| {
                let (demand, traffic) = *self
                    .first_seen
                    .entry(date)
                    .or_insert((indicator.demand, indicator.traffic));
                indicator.demand = demand;
                indicator.traffic = traffic;
                (date, indicator)
            })
            .collect()
    }
}

// src/timegrid.rs
//
// The shared time-of-day parser and the fixed-granularity slot grid a day
// is divided into. Every range comparison in the engine goes through
// `parse_time_to_minutes`; time strings are never compared lexically.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::fitness::Tone;
use crate::indicators::Demand;
use crate::roster_client::ShiftRecord;

/// Grid granularity in minutes.
pub const SLOT_MINUTES: u16 = 30;

// Accepts "7:00 am", "7:00am", "12:30 PM" and 24-hour "07:00".
static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2}):(\d{2})\s*(am|pm)?$").expect("time regex is valid")
});

/// Converts a time-of-day string to minutes since midnight.
///
/// Handles the service's 12-hour "H:MM am/pm" spelling (with or without a
/// space) and the 24-hour "HH:MM" spelling used on shift records.
/// Malformed input degrades to `None`; this never panics.
pub fn parse_time_to_minutes(time: &str) -> Option<u16> {
    let caps = TIME_RE.captures(time.trim())?;
    let mut hours: u16 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u16 = caps.get(2)?.as_str().parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(period) => {
            if hours < 1 || hours > 12 {
                return None;
            }
            if period == "pm" && hours != 12 {
                hours += 12;
            }
            if period == "am" && hours == 12 {
                hours = 0;
            }
        }
        None => {
            if hours >= 24 {
                return None;
            }
        }
    }
    Some(hours * 60 + minutes)
}

/// Renders minutes since midnight in the 12-hour "H:MM am" spelling the
/// service expects on manual assignment ranges.
pub fn format_minutes(minutes: u16) -> String {
    let total = minutes % (24 * 60);
    let hours24 = total / 60;
    let mins = total % 60;
    let period = if hours24 >= 12 { "pm" } else { "am" };
    let hours12 = match hours24 % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hours12, mins, period)
}

fn slot_id(start_minutes: u16) -> String {
    format!("{}-{}", start_minutes / 60, start_minutes % 60)
}

/// One staff entry rendered into a slot. Ids are kept alongside the
/// display name so the reconciliation protocol can replay the rendered
/// view without a reverse lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStaff {
    pub employee_id: i64,
    pub shift_id: i64,
    pub name: String,
    pub role: String,
    pub tone: Tone,
}

/// A 30-minute cell of the day grid. Rebuilt from scratch on every
/// projection; the id is derived from the start time alone so two
/// generations for the same day always produce matching ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: String,
    pub start_time: String,
    pub end_time: String,
    pub assigned_staff: Vec<SlotStaff>,
    pub demand: Option<Demand>,
    pub mismatches: u32,
}

/// Grid window used when a day has no shifts to derive a range from.
#[derive(Debug, Clone, Copy)]
pub struct GridConfig {
    pub default_start_minutes: u16,
    pub default_end_minutes: u16,
}

impl Default for GridConfig {
    fn default() -> Self {
        // 07:00 - 15:00
        Self {
            default_start_minutes: 7 * 60,
            default_end_minutes: 15 * 60,
        }
    }
}

fn floor_to_slot(minutes: u16) -> u16 {
    minutes - minutes % SLOT_MINUTES
}

fn ceil_to_slot(minutes: u16) -> u16 {
    match minutes % SLOT_MINUTES {
        0 => minutes,
        rem => minutes + (SLOT_MINUTES - rem),
    }
}

/// Builds the ordered sequence of empty 30-minute slots covering a day's
/// shifts, or the configured default window when no shift range can be
/// derived. Shifts whose times do not parse are ignored.
pub fn generate_time_slots(shifts: &[ShiftRecord], config: &GridConfig) -> Vec<TimeSlot> {
    let mut range: Option<(u16, u16)> = None;
    for shift in shifts {
        let (Some(start), Some(end)) = (
            parse_time_to_minutes(&shift.start),
            parse_time_to_minutes(&shift.end),
        ) else {
            continue;
        };
        if end <= start {
            continue;
        }
        range = Some(match range {
            Some((lo, hi)) => (lo.min(start), hi.max(end)),
            None => (start, end),
        });
    }

    let (start, end) = match range {
        Some((lo, hi)) => (floor_to_slot(lo), ceil_to_slot(hi)),
        None => (config.default_start_minutes, config.default_end_minutes),
    };
    if end <= start {
        return Vec::new();
    }

    let mut slots = Vec::with_capacity(((end - start) / SLOT_MINUTES) as usize);
    let mut cursor = start;
    while cursor < end {
        let next = cursor + SLOT_MINUTES;
        slots.push(TimeSlot {
            id: slot_id(cursor),
            start_time: format_minutes(cursor),
            end_time: format_minutes(next),
            assigned_staff: Vec::new(),
            demand: None,
            mismatches: 0,
        });
        cursor = next;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(shift_id: i64, start: &str, end: &str) -> ShiftRecord {
        ShiftRecord {
            shift_id,
            role: "BARISTA".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2025, 8, 4).unwrap(),
            start: start.to_string(),
            end: end.to_string(),
            expected_traffic: None,
            customer_count: None,
            sales_volume: None,
        }
    }

    #[test]
    fn parses_both_time_spellings() {
        assert_eq!(parse_time_to_minutes("7:00 am"), Some(420));
        assert_eq!(parse_time_to_minutes("7:00am"), Some(420));
        assert_eq!(parse_time_to_minutes("12:30 PM"), Some(750));
        assert_eq!(parse_time_to_minutes("12:00 am"), Some(0));
        assert_eq!(parse_time_to_minutes("07:00"), Some(420));
        assert_eq!(parse_time_to_minutes("23:45"), Some(1425));
    }

    #[test]
    fn malformed_times_parse_to_none() {
        assert_eq!(parse_time_to_minutes(""), None);
        assert_eq!(parse_time_to_minutes("25:00"), None);
        assert_eq!(parse_time_to_minutes("9:75 am"), None);
        assert_eq!(parse_time_to_minutes("13:00 pm"), None);
        assert_eq!(parse_time_to_minutes("soonish"), None);
    }

    #[test]
    fn formats_twelve_hour_spelling() {
        assert_eq!(format_minutes(420), "7:00 am");
        assert_eq!(format_minutes(750), "12:30 pm");
        assert_eq!(format_minutes(0), "12:00 am");
        assert_eq!(format_minutes(870), "2:30 pm");
    }

    #[test]
    fn grid_covers_shift_range_rounded_to_slot_boundaries() {
        let shifts = vec![shift(1, "07:15", "14:40")];
        let slots = generate_time_slots(&shifts, &GridConfig::default());
        // floor(07:15) = 07:00, ceil(14:40) = 15:00 => 16 half-hour slots
        assert_eq!(slots.len(), 16);
        assert_eq!(slots[0].start_time, "7:00 am");
        assert_eq!(slots[15].start_time, "2:30 pm");
        assert_eq!(slots[15].end_time, "3:00 pm");
        // contiguous, no gaps
        for pair in slots.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
    }

    #[test]
    fn empty_input_falls_back_to_default_window() {
        let slots = generate_time_slots(&[], &GridConfig::default());
        assert_eq!(slots.len(), 16);
        assert_eq!(slots[0].start_time, "7:00 am");
        assert_eq!(slots[15].end_time, "3:00 pm");
    }

    #[test]
    fn slot_ids_are_stable_across_generations() {
        let shifts = vec![shift(1, "09:00", "17:00")];
        let first = generate_time_slots(&shifts, &GridConfig::default());
        let wider = vec![shift(1, "09:00", "17:00"), shift(2, "08:00", "10:00")];
        let second = generate_time_slots(&wider, &GridConfig::default());
        let nine_am_first = first.iter().find(|s| s.start_time == "9:00 am").unwrap();
        let nine_am_second = second.iter().find(|s| s.start_time == "9:00 am").unwrap();
        assert_eq!(nine_am_first.id, nine_am_second.id);
    }

    #[test]
    fn unparseable_shift_times_are_ignored() {
        let shifts = vec![shift(1, "bogus", "17:00"), shift(2, "10:00", "11:00")];
        let slots = generate_time_slots(&shifts, &GridConfig::default());
        assert_eq!(slots[0].start_time, "10:00 am");
        assert_eq!(slots.last().unwrap().end_time, "11:00 am");
    }
}

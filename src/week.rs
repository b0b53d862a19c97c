// src/week.rs
//
// Week identity and day-key helpers. Week ids are ISO-like "YYYY-Www" and
// day keys are local calendar dates; all derivation goes through chrono's
// local calendar fields so a shift near midnight never lands on the wrong
// day key.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Formats the ISO week id ("2025-W32") for a local calendar date.
pub fn week_id(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{:04}-W{:02}", iso.year(), iso.week())
}

/// Parses a "YYYY-Www" week id into the Monday of that week.
/// Returns `None` for malformed ids or out-of-range weeks.
pub fn parse_week_id(week: &str) -> Option<NaiveDate> {
    let (year_part, week_part) = week.split_once("-W")?;
    let year: i32 = year_part.parse().ok()?;
    let week_num: u32 = week_part.parse().ok()?;
    NaiveDate::from_isoywd_opt(year, week_num, Weekday::Mon)
}

/// The seven dates of a week, Monday first.
pub fn week_dates(week: &str) -> Option<Vec<NaiveDate>> {
    let monday = parse_week_id(week)?;
    Some((0..7).map(|i| monday + Duration::days(i)).collect())
}

/// Renders the "YYYY-MM-DD" day key used on the wire.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a "YYYY-MM-DD" day key; `None` when malformed.
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

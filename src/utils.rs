use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use chrono::{Datelike, Days, NaiveDate};

use crate::types::WeekStart;

/// Calendar day key format (`YYYY-MM-DD`).
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

static WARNED_MESSAGES: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

pub fn warn_once(message: impl Into<String>) {
    let message = message.into();
    let cache = WARNED_MESSAGES.get_or_init(|| Mutex::new(HashSet::new()));

    if let Ok(mut warned) = cache.lock()
        && warned.insert(message.clone())
    {
        tracing::warn!("{message}");
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn parse_day_key(date_key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_key, DAY_KEY_FORMAT).ok()
}

pub fn format_day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// The first day of the week containing `date`.
pub fn start_of_week(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let offset = (date.weekday().num_days_from_monday() + 7
        - week_start.weekday().num_days_from_monday())
        % 7;
    date.checked_sub_days(Days::new(offset as u64))
        .unwrap_or(NaiveDate::MIN)
}

/// Week bucket label `"<weekNumber>-<year>"`.
///
/// The week number is `ceil((day_of_year0 + weekday(Jan 1) + 1) / 7)` with
/// weekdays counted from Sunday. This is not ISO-8601: weeks are Sunday-based
/// and restart at every January 1st, so the last days of December and the
/// first days of January never share a label even inside one calendar week.
pub fn week_bucket_key(date: NaiveDate) -> Option<String> {
    let jan_first = date.with_ordinal0(0)?;
    let offset = jan_first.weekday().num_days_from_sunday();
    let week = (date.ordinal0() + offset + 1).div_ceil(7);
    Some(format!("{week}-{}", date.year()))
}

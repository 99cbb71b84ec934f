//! Time-of-day helpers for work patterns.
//!
//! Work blocks and meetings carry local "HH:MM" strings. Records written by
//! older clients are not always well formed, so the scheduler uses the total
//! variants here, which fall back to 00:00 instead of failing. Use
//! `try_parse_time` when the caller wants to know about the bad value.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Minutes in one day.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Cap on any duration or wait the scheduler works with, about ten years.
pub const MAX_ITEM_MINUTES: i64 = 3660 * MINUTES_PER_DAY;

/// Why a time-of-day string could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("time {0:?} is not in HH:MM form")]
    Malformed(String),
    #[error("time {0:?} is out of range")]
    OutOfRange(String),
}

/// Parse "HH:MM" (or "H:MM") into minutes after midnight.
///
/// "24:00" is accepted as end of day.
pub fn try_parse_time(value: &str) -> Result<i64, TimeParseError> {
    let trimmed = value.trim();
    let (hours, minutes) = trimmed
        .split_once(':')
        .ok_or_else(|| TimeParseError::Malformed(value.to_string()))?;

    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return Err(TimeParseError::Malformed(value.to_string()));
    }

    let hours: i64 = hours
        .parse()
        .map_err(|_| TimeParseError::Malformed(value.to_string()))?;
    let minutes: i64 = minutes
        .parse()
        .map_err(|_| TimeParseError::Malformed(value.to_string()))?;

    if minutes >= 60 || hours > 24 || (hours == 24 && minutes != 0) {
        return Err(TimeParseError::OutOfRange(value.to_string()));
    }

    Ok(hours * 60 + minutes)
}

/// Parse "HH:MM" into minutes after midnight, treating anything unreadable as 00:00.
pub fn parse_time_to_minutes(value: &str) -> i64 {
    try_parse_time(value).unwrap_or(0)
}

/// Minutes from `start` to `end`.
///
/// An end before the start means the interval crosses midnight
/// (e.g. a 22:00-06:00 sleep block is 480 minutes).
pub fn duration_between(start: &str, end: &str) -> i64 {
    duration_between_minutes(parse_time_to_minutes(start), parse_time_to_minutes(end))
}

/// Same as `duration_between`, on already-parsed minute offsets.
pub fn duration_between_minutes(start: i64, end: i64) -> i64 {
    if end >= start {
        end - start
    } else {
        end + MINUTES_PER_DAY - start
    }
}

/// Human readable duration: "45m", "2h", "1h 30m".
pub fn format_duration(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let total = minutes.abs();
    let hours = total / 60;
    let mins = total % 60;
    match (hours, mins) {
        (0, m) => format!("{sign}{m}m"),
        (h, 0) => format!("{sign}{h}h"),
        (h, m) => format!("{sign}{h}h {m}m"),
    }
}

/// Format minutes after midnight as "HH:MM" (wrapping past 24h).
pub fn minutes_to_time_string(minutes: i64) -> String {
    let wrapped = minutes.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
}

/// The instant `minutes` after midnight on `date`. Values past 24h roll into later days.
pub fn at_minutes(date: NaiveDate, minutes: i64) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::minutes(minutes)
}

/// `instant` shifted by `minutes`, saturating at the ends of the calendar.
pub fn add_minutes(instant: NaiveDateTime, minutes: i64) -> NaiveDateTime {
    Duration::try_minutes(minutes)
        .and_then(|delta| instant.checked_add_signed(delta))
        .unwrap_or(if minutes < 0 {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        })
}

/// Minutes after midnight of the instant's own date.
pub fn minute_of_day(instant: NaiveDateTime) -> i64 {
    (instant - instant.date().and_time(NaiveTime::MIN)).num_minutes()
}

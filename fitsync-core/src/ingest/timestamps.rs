//! Parsing of the tracker's date and time strings.
//!
//! The exports mix several shapes:
//!
//! | Source | Example |
//! |--------|---------|
//! | day fields | `2021-05-10` |
//! | intraday times | `06:11:35` |
//! | activity start times | `07:30` |
//! | sleep intervals | `2021-05-09T23:41:30.000` |
//! | TCX times | `2019-07-16T06:11:35.000+05:30`, `...-08:00`, `...Z` |
//!
//! All of them become naive local timestamps. Zone offsets are stripped,
//! not applied.

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| Error::timestamp(value))
}

/// Parse `HH:MM:SS` or `HH:MM`.
pub fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| Error::timestamp(value))
}

/// Combine a day and a wall-clock time string.
pub fn combine(date: NaiveDate, time: &str) -> Result<NaiveDateTime> {
    Ok(date.and_time(parse_time(time)?))
}

/// Remove a trailing `Z` or `+HH:MM` / `-HH:MM` suffix.
///
/// Only the time portion is searched, so the dashes of the date are never
/// mistaken for an offset.
pub fn strip_zone_offset(value: &str) -> &str {
    let value = value.trim();
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    let Some(t) = value.find('T') else {
        return value;
    };
    match value[t..].rfind(['+', '-']) {
        Some(offset) => &value[..t + offset],
        None => value,
    }
}

/// Parse an ISO-8601 local date-time, with or without fractional seconds
/// and zone suffix.
pub fn parse_local_datetime(value: &str) -> Result<NaiveDateTime> {
    let local = strip_zone_offset(value);
    NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M"))
        .map_err(|_| Error::timestamp(value))
}

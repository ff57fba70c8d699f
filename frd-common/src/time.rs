//! Timestamp utilities
//!
//! Providers disagree on timestamp shapes. The primary provider sends naive
//! `YYYY-MM-DD HH:MM:SS` strings (interpreted as UTC), the alternate channel
//! sends Unix seconds, and inbound query bounds arrive as plain dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Parse a provider timestamp
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and a bare
/// `YYYY-MM-DD` (midnight). Returns `None` for anything else.
pub fn parse_provider_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(start_of_day)
}

/// Convert Unix seconds to a UTC timestamp
pub fn from_unix_seconds(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
}

/// First instant of the given day
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

/// Last representable millisecond of the given day
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default();
    Utc.from_utc_datetime(&date.and_time(last))
}

/// Parse an inclusive lower date bound (`YYYY-MM-DD` or a full timestamp)
pub fn parse_start_bound(value: &str) -> Option<DateTime<Utc>> {
    parse_provider_timestamp(value)
}

/// Parse an inclusive upper date bound
///
/// A plain date is extended to the end of that day so the whole day is
/// included. Full timestamps are taken as given.
pub fn parse_end_bound(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(end_of_day(date));
    }
    parse_provider_timestamp(value)
}

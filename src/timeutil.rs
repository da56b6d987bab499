//! Wall-clock helpers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Current UTC time in whole seconds since the epoch.
pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

/// Parse a timestamp as found in status feeds and forecast APIs.
///
/// Accepts RFC 3339 (`2024-05-01T12:00:00Z`), naive ISO date-times and
/// dates (taken as UTC) and RFC 2822 (`Wed, 01 May 2024 12:00:00 GMT`).
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(v, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc2822(v)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp as a local `HH:MM:SS` clock reading.
pub fn local_clock(ts: i64) -> String {
    match Utc.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.with_timezone(&chrono::Local).format("%H:%M:%S").to_string(),
        None => "—".to_string(),
    }
}

/// Format a timestamp as an ISO date (UTC).
pub fn iso_date(ts: i64) -> String {
    match Utc.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => "—".to_string(),
    }
}

//! Date helpers shared by the aggregator and the write paths.

use chrono::NaiveDate;

/// Calendar day of an ISO timestamp, taken literally from its `YYYY-MM-DD`
/// prefix. No timezone conversion; anything unparseable yields `None`.
pub fn intake_day(status_at: Option<&str>) -> Option<NaiveDate> {
    let prefix = status_at?.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Normalize a user-supplied intake time to `YYYY-MM-DDTHH:MM:SS`.
///
/// Accepts:
/// - YYYY-MM-DD -> YYYY-MM-DDT00:00:00
/// - RFC3339 datetime -> local wall time, offset dropped
/// - Naive datetime YYYY-MM-DDTHH:MM[:SS]
pub fn normalize_timestamp(s: &str) -> Option<String> {
    let s = s.trim();
    if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
        return Some(format!("{}T00:00:00", s));
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }
    None
}

/// Strict `YYYY-MM-DD` parsing for window bounds.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

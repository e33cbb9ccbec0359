//! Date/time helpers for board timestamps.
//!
//! Timestamps are stored as UTC text in SQLite format (`YYYY-MM-DD HH:MM:SS`).

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// SQLite `datetime('now')` format.
pub const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a stored timestamp (SQLite or RFC3339) as UTC.
pub fn parse_db_datetime(datetime_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(datetime_str) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(datetime_str, DB_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render a UTC instant in the stored text format.
pub fn to_db_format(dt: &DateTime<Utc>) -> String {
    dt.format(DB_FORMAT).to_string()
}

/// The instant `minutes` from now, in stored text format.
pub fn minutes_from_now(minutes: i64) -> String {
    to_db_format(&(Utc::now() + Duration::minutes(minutes)))
}

/// Format a stored timestamp in the given timezone.
///
/// Returns the input unchanged if either the timezone or the timestamp
/// cannot be parsed.
pub fn format_datetime(datetime_str: &str, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return datetime_str.to_string(),
    };

    match parse_db_datetime(datetime_str) {
        Some(utc) => utc.with_timezone(&tz).format(format).to_string(),
        None => datetime_str.to_string(),
    }
}

/// Format a stored timestamp with the board's default layout.
pub fn format_datetime_default(datetime_str: &str, timezone: &str) -> String {
    format_datetime(datetime_str, timezone, "%Y-%m-%d %H:%M")
}

/// Convert a stored timestamp to RFC3339 (`2024-01-15T10:30:00Z`).
pub fn to_rfc3339(datetime_str: &str) -> String {
    format!("{}Z", datetime_str.replace(' ', "T"))
}

/// Describe how long ago `datetime_str` was, relative to `now`.
///
/// Produces "just now", "5m ago", "3h ago" or "2d ago". Timestamps in the
/// future and unparseable input read as "just now".
pub fn humanize_since(datetime_str: &str, now: DateTime<Utc>) -> String {
    let Some(then) = parse_db_datetime(datetime_str) else {
        return "just now".to_string();
    };

    let elapsed = now.signed_duration_since(then);
    if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}d ago", elapsed.num_days())
    }
}

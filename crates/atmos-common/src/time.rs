//! Timestamp parsing and formatting for run configuration and tables.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Timestamp layout used in the `time_iso` table column.
pub const TABLE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse an ISO 8601 timestamp as UTC.
///
/// Accepts, in order:
/// - RFC 3339 with offset: "2025-08-17T00:00:00Z", "2025-08-17T02:00:00+02:00"
/// - Naive datetime (assumed UTC): "2025-08-17T00:00:00"
/// - Date only (midnight UTC): "2025-08-17"
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, TABLE_TIME_FORMAT) {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    // Fractional seconds without offset
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Format a timestamp for the `time_iso` table column (second resolution).
pub fn format_table_time(dt: &DateTime<Utc>) -> String {
    dt.format(TABLE_TIME_FORMAT).to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}

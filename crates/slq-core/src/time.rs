//! Time parsing and formatting for completion-log timestamps.

use chrono::NaiveDateTime;
use std::time::Duration;

/// Parse a completion-log timestamp (YYYY-MM-DDTHH:MM:SS).
///
/// Returns None for empty strings or placeholder values like "N/A",
/// "Unknown", "None".
pub fn parse_log_timestamp(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() || s == "N/A" || s == "Unknown" || s == "None" {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()
}

/// Elapsed wall time between two log timestamps.
///
/// Returns None if either timestamp is unparseable or the end precedes
/// the start.
pub fn elapsed_between(start: &str, end: &str) -> Option<Duration> {
    let start = parse_log_timestamp(start)?;
    let end = parse_log_timestamp(end)?;
    (end - start).to_std().ok()
}

/// Format seconds as days plus wall clock (e.g. "0d 01:30:00").
pub fn format_days_hms(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{}d {:02}:{:02}:{:02}", days, hours, mins, secs)
}

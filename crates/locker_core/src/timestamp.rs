//! Timestamp formatting and parsing.
//!
//! Timestamps are always written in one canonical form: RFC 3339 in UTC with
//! a `T` separator, microsecond precision and a `Z` suffix. Reading is more
//! lenient, since rows written by older tooling use the space-separated form
//! that SQLite's `CURRENT_TIMESTAMP` produces.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Formats a timestamp in the canonical wire and storage form.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp.
///
/// Accepts RFC 3339 with either separator and any offset, and naive
/// date-times (interpreted as UTC).
pub fn parse_timestamp(raw: &str) -> CoreResult<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    // RFC 3339 allows a space separator but chrono's parser does not.
    if let Some(normalized) = replace_separator(s) {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&normalized) {
            return Ok(ts.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(CoreError::InvalidTimestamp(raw.to_string()))
}

fn replace_separator(s: &str) -> Option<String> {
    if s.len() > 10 && s.as_bytes()[10] == b' ' {
        let mut out = String::with_capacity(s.len());
        out.push_str(&s[..10]);
        out.push('T');
        out.push_str(&s[11..]);
        Some(out)
    } else {
        None
    }
}

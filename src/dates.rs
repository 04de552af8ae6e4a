//! Date parsing for tool arguments.
//!
//! Due and start dates are floating wall-clock values: the native store keeps
//! them as calendar components (year..second) without a time zone. Inputs
//! with an explicit offset are converted to local wall-clock time first.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

use crate::error::{RemindersError, Result};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601-ish date/time argument into local wall-clock time.
///
/// Accepts RFC 3339 (`2024-01-01T10:00:00Z`, `...+02:00`), naive date-times
/// with or without seconds, and bare dates (midnight).
pub fn parse_local_datetime(field: &str, input: &str) -> Result<NaiveDateTime> {
    let s = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Local).naive_local());
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(dt) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(dt);
    }

    Err(RemindersError::InvalidInput(format!(
        "{field} must be an ISO-8601 date or date-time (e.g. 2024-01-01T10:00), got {input:?}"
    )))
}

/// Parse an optional argument, passing `None` through.
pub fn parse_optional(field: &str, input: Option<&str>) -> Result<Option<NaiveDateTime>> {
    input.map(|s| parse_local_datetime(field, s)).transpose()
}

/// Seconds since the Unix epoch for a local wall-clock time.
///
/// Ambiguous times (DST fold) resolve to the earlier instant; times inside a
/// DST gap fall back to interpreting the value as UTC.
pub fn local_timestamp(dt: NaiveDateTime) -> f64 {
    let instant = match Local.from_local_datetime(&dt) {
        chrono::LocalResult::Single(t) | chrono::LocalResult::Ambiguous(t, _) => t.timestamp(),
        chrono::LocalResult::None => dt.and_utc().timestamp(),
    };
    instant as f64
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_minute_precision() {
        let dt = parse_local_datetime("due_date", "2024-01-01T10:00").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 1));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (10, 0, 0));
    }

    #[test]
    fn parses_seconds() {
        let dt = parse_local_datetime("due_date", "2024-03-05T08:30:15").unwrap();
        assert_eq!(dt.second(), 15);
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let dt = parse_local_datetime("due_date", "2024-12-24").unwrap();
        assert_eq!((dt.hour(), dt.minute()), (0, 0));
    }

    #[test]
    fn parses_space_separator() {
        assert!(parse_local_datetime("due_date", "2024-12-24 18:00").is_ok());
    }

    #[test]
    fn rfc3339_is_converted_to_local() {
        let dt = parse_local_datetime("due_date", "2024-06-01T12:00:00Z").unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        assert_eq!(dt, expected);
    }

    #[test]
    fn rejects_garbage_with_field_name() {
        let err = parse_local_datetime("start_date", "tomorrow").unwrap_err();
        assert!(err.to_string().contains("start_date"));
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn optional_passes_none() {
        assert_eq!(parse_optional("due_before", None).unwrap(), None);
    }
}

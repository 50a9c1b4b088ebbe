//! Strict parsing of the `T` field emitted by network nodes.
//!
//! Nodes log `YYYY-MM-DDTHH:MM:SS.fffZ` with 1..=9 fractional digits
//! (millisecond and microsecond precision both occur in practice).
//! The `T` separator and the trailing `Z` are structural: a value without
//! them is rejected rather than guessed at. All instants are UTC.
//!
//! Fractional seconds are never truncated or rounded.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};

/// A `T` value that does not follow the node log timestamp format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampError {
    pub raw: String,
    pub reason: &'static str,
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid log timestamp '{}': {}", self.raw, self.reason)
    }
}

impl std::error::Error for TimestampError {}

fn reject(raw: &str, reason: &'static str) -> TimestampError {
    TimestampError {
        raw: raw.to_string(),
        reason,
    }
}

/// Parse a node log timestamp into a UTC instant.
pub fn parse_log_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let body = raw
        .strip_suffix('Z')
        .ok_or_else(|| reject(raw, "missing trailing 'Z'"))?;

    let (base, frac) = body
        .split_once('.')
        .ok_or_else(|| reject(raw, "missing fractional seconds"))?;

    // Shape check before chrono: chrono is lenient about field widths.
    let shape_ok = base.len() == 19
        && base.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            10 => b == b'T',
            13 | 16 => b == b':',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(reject(raw, "expected YYYY-MM-DDTHH:MM:SS"));
    }

    if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(reject(raw, "fractional seconds must be 1 to 9 digits"));
    }

    let naive = NaiveDateTime::parse_from_str(base, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| reject(raw, "date/time out of range"))?;
    // chrono folds second 60 into the nanosecond field; overwriting it below
    // would shift the instant back by one second.
    if naive.nanosecond() >= 1_000_000_000 {
        return Err(reject(raw, "leap second not supported"));
    }

    // Right-pad to nanoseconds: ".5" is 500ms, ".000123" is 123us.
    let nanos: u32 = format!("{frac:0<9}")
        .parse()
        .map_err(|_| reject(raw, "fractional seconds must be 1 to 9 digits"))?;

    let naive = naive
        .with_nanosecond(nanos)
        .ok_or_else(|| reject(raw, "fractional seconds out of range"))?;

    Ok(Utc.from_utc_datetime(&naive))
}

/// Render an instant in the node log format with microsecond precision.
pub fn format_log_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn parses_microsecond_precision() {
        let ts = parse_log_timestamp("2024-01-01T10:00:02.500000Z").unwrap();
        assert_eq!(ts.timestamp(), 1_704_103_202);
        assert_eq!(ts.timestamp_subsec_micros(), 500_000);
    }

    #[test]
    fn parses_millisecond_precision_without_truncation() {
        let a = parse_log_timestamp("2024-01-01T00:00:00.001Z").unwrap();
        let b = parse_log_timestamp("2024-01-01T00:00:00.000999Z").unwrap();
        assert!(b < a);
        assert_eq!(a - b, Duration::microseconds(1));
    }

    #[test]
    fn nanosecond_digits_are_kept() {
        let ts = parse_log_timestamp("2024-01-01T00:00:00.123456789Z").unwrap();
        assert_eq!(ts.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn round_trip_recovers_second_and_microsecond() {
        let raw = "2023-07-14T23:59:59.654321Z";
        let ts = parse_log_timestamp(raw).unwrap();
        assert_eq!(format_log_timestamp(&ts), raw);
        assert_eq!(ts.second(), 59);
        assert_eq!(ts.timestamp_subsec_micros(), 654_321);
    }

    #[test]
    fn rejects_missing_zone_marker() {
        let err = parse_log_timestamp("2024-01-01T00:00:00.000000").unwrap_err();
        assert_eq!(err.reason, "missing trailing 'Z'");
    }

    #[test]
    fn rejects_space_separator() {
        assert!(parse_log_timestamp("2024-01-01 00:00:00.000000Z").is_err());
    }

    #[test]
    fn rejects_missing_fraction() {
        assert!(parse_log_timestamp("2024-01-01T00:00:00Z").is_err());
        assert!(parse_log_timestamp("2024-01-01T00:00:00.Z").is_err());
    }

    #[test]
    fn rejects_overlong_fraction_instead_of_truncating() {
        assert!(parse_log_timestamp("2024-01-01T00:00:00.1234567890Z").is_err());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        assert!(parse_log_timestamp("2024-13-01T00:00:00.000Z").is_err());
        assert!(parse_log_timestamp("2024-02-30T00:00:00.000Z").is_err());
        assert!(parse_log_timestamp("2024-01-01T24:00:00.000Z").is_err());
    }

    #[test]
    fn rejects_leap_second() {
        let err = parse_log_timestamp("2016-12-31T23:59:60.500000Z").unwrap_err();
        assert_eq!(err.reason, "leap second not supported");
        assert!(parse_log_timestamp("2024-01-01T00:00:61.000Z").is_err());
    }

    #[test]
    fn error_names_offending_input() {
        let err = parse_log_timestamp("yesterday").unwrap_err();
        assert!(err.to_string().contains("'yesterday'"));
    }
}

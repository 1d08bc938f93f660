//! Time text parsing and formatting
//!
//! Free-form duration text (`"1h 5m 3s"`, `"90"`) and absolute times of day
//! (`"8.30"`, `"08:30:00"`) in, canonical display text out.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{NaiveTime, Timelike};
use regex::Regex;

use crate::error::{CuetimeError, Result};

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)\s*h)?\s*(?:(\d+)\s*m)?\s*(?:(\d+)\s*s?)?$")
        .expect("duration pattern is valid")
});

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,;\-]").expect("separator pattern is valid"));

/// Parse a duration like `"1h 20m 5s"`, `"20m"`, `"45"` or `"2 h 3"`.
///
/// Parts are optional but must appear in h, m, s order. A trailing number
/// without a unit counts as seconds.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || CuetimeError::InvalidDuration {
        input: input.to_string(),
    };

    let cleaned = input.trim().to_lowercase();
    if cleaned.is_empty() {
        return Err(invalid());
    }

    let caps = DURATION_RE.captures(&cleaned).ok_or_else(invalid)?;

    let mut total: u64 = 0;
    for (group, unit) in [(1, 3600u64), (2, 60), (3, 1)] {
        if let Some(m) = caps.get(group) {
            let value: u64 = m.as_str().parse().map_err(|_| invalid())?;
            total = value
                .checked_mul(unit)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(invalid)?;
        }
    }

    Ok(Duration::from_secs(total))
}

/// Canonical duration text: `"1 h 5 m 3 s"`, zero parts omitted, `"0 s"` for zero.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        return "0 s".to_string();
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{} h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{} m", minutes));
    }
    if seconds > 0 {
        parts.push(format!("{} s", seconds));
    }

    parts.join(" ")
}

/// Parse a time of day in `hh:mm:ss`, `h:mm:ss`, `hh:mm`, `h:mm`, `hh` or `h` form.
///
/// `.`, `,`, `;` and `-` are accepted as separators. Missing minutes and
/// seconds default to zero.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime> {
    let invalid = || CuetimeError::InvalidTimeOfDay {
        input: input.to_string(),
    };

    let normalized = SEPARATOR_RE.replace_all(input.trim(), ":");
    let fields: Vec<&str> = normalized.split(':').collect();

    let widths: Vec<usize> = fields.iter().map(|f| f.len()).collect();
    let shape_ok = matches!(
        widths.as_slice(),
        [2, 2, 2] | [1, 2, 2] | [2, 2] | [1, 2] | [2] | [1]
    );
    if !shape_ok || !fields.iter().all(|f| f.bytes().all(|b| b.is_ascii_digit())) {
        return Err(invalid());
    }

    let field = |i: usize| -> u32 { fields.get(i).and_then(|f| f.parse().ok()).unwrap_or(0) };

    NaiveTime::from_hms_opt(field(0), field(1), field(2)).ok_or_else(invalid)
}

/// Canonical time of day text, always `hh:mm:ss`.
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Offset from local midnight for a time of day.
pub fn time_of_day_offset(time: NaiveTime) -> Duration {
    Duration::from_secs(time.num_seconds_from_midnight() as u64)
        + Duration::from_nanos(time.nanosecond() as u64)
}

/// `hh:mm:ss` for an offset; hours keep counting past 24.
pub fn format_clock(offset: Duration) -> String {
    let secs = offset.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("5s", 5 ; "seconds with unit")]
    #[test_case("45", 45 ; "bare number is seconds")]
    #[test_case("2m", 120 ; "minutes only")]
    #[test_case("1h", 3600 ; "hours only")]
    #[test_case("1h 5m 3s", 3903 ; "all parts")]
    #[test_case("  1 H 2 M  ", 3720 ; "whitespace and case")]
    #[test_case("1h5", 3605 ; "hours then bare seconds")]
    #[test_case("10m30", 630 ; "minutes then bare seconds")]
    #[test_case("0", 0 ; "zero")]
    fn test_parse_duration(input: &str, expected_secs: u64) {
        assert_eq!(
            parse_duration(input).unwrap(),
            Duration::from_secs(expected_secs)
        );
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "blank")]
    #[test_case("5s 1h" ; "wrong order")]
    #[test_case("abc" ; "letters")]
    #[test_case("1.5h" ; "fraction")]
    #[test_case("-3" ; "negative")]
    #[test_case("99999999999999999999h" ; "overflow")]
    fn test_parse_duration_rejects(input: &str) {
        let err = parse_duration(input).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DURATION");
    }

    #[test_case(0, "0 s")]
    #[test_case(5, "5 s")]
    #[test_case(60, "1 m")]
    #[test_case(3903, "1 h 5 m 3 s")]
    #[test_case(3603, "1 h 3 s")]
    #[test_case(90000, "25 h")]
    fn test_format_duration(secs: u64, expected: &str) {
        assert_eq!(format_duration(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn test_format_duration_ignores_subseconds() {
        assert_eq!(format_duration(Duration::from_millis(400)), "0 s");
        assert_eq!(format_duration(Duration::from_millis(2400)), "2 s");
    }

    #[test_case("08:30:15", "08:30:15" ; "full")]
    #[test_case("8:30:15", "08:30:15" ; "short hour")]
    #[test_case("08:30", "08:30:00" ; "hours minutes")]
    #[test_case("8:30", "08:30:00" ; "short hours minutes")]
    #[test_case("08", "08:00:00" ; "hours only")]
    #[test_case("8", "08:00:00" ; "single digit")]
    #[test_case("8.30", "08:30:00" ; "dot separator")]
    #[test_case("8,30;15", "08:30:15" ; "mixed separators")]
    #[test_case("23-59-59", "23:59:59" ; "dash separator")]
    #[test_case(" 9:05 ", "09:05:00" ; "surrounding whitespace")]
    fn test_parse_time_of_day(input: &str, expected: &str) {
        let time = parse_time_of_day(input).unwrap();
        assert_eq!(format_time_of_day(time), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("25:00" ; "hour out of range")]
    #[test_case("12:60" ; "minute out of range")]
    #[test_case("123" ; "three digits")]
    #[test_case("1:2" ; "single digit minutes")]
    #[test_case("ab:cd" ; "letters")]
    #[test_case("12:00:00:00" ; "too many fields")]
    fn test_parse_time_of_day_rejects(input: &str) {
        let err = parse_time_of_day(input).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TIME_OF_DAY");
    }

    #[test]
    fn test_time_of_day_offset() {
        let time = NaiveTime::from_hms_opt(8, 0, 10).unwrap();
        assert_eq!(time_of_day_offset(time), Duration::from_secs(8 * 3600 + 10));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::from_secs(5)), "00:00:05");
        assert_eq!(format_clock(Duration::from_secs(9 * 3600 + 65)), "09:01:05");
        assert_eq!(format_clock(Duration::from_secs(26 * 3600)), "26:00:00");
    }
}

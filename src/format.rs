use chrono::{Local, TimeZone};
use std::fmt::Display;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Zero-padded `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Renders an epoch-millisecond timestamp in the local timezone.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    format_timestamp_in(timestamp_ms, &Local)
}

pub fn format_timestamp_in<Tz>(timestamp_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match tz.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
        None => timestamp_ms.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(3661), "01:01:01");
        assert_eq!(format_duration(16 * 3600), "16:00:00");
    }

    #[test]
    fn hours_are_unbounded() {
        assert_eq!(format_duration(100 * 3600 + 5), "100:00:05");
    }

    #[test]
    fn formats_timestamps_in_utc() {
        assert_eq!(
            format_timestamp_in(1_700_000_000_000, &Utc),
            "2023-11-14 22:13:20"
        );
    }
}

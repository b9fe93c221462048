//! Time handling and the date/time naming convention of data trees.
//!
//! Data files live under `<root>/YYYYMMDD/HHMMSS.<ext>`. Fixed-width,
//! zero-padded names sort lexicographically in chronological order, so
//! directory listings only need a string sort.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Earliest year accepted in a day directory name.
const MIN_PLAUSIBLE_YEAR: i32 = 1970;

/// Parse a day directory name (`YYYYMMDD`).
///
/// Returns `None` unless the name is exactly eight ASCII digits forming a
/// real calendar date.
pub fn parse_day_dir(name: &str) -> Option<NaiveDate> {
    if name.len() != 8 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = name[0..4].parse().ok()?;
    let month: u32 = name[4..6].parse().ok()?;
    let day: u32 = name[6..8].parse().ok()?;
    if year < MIN_PLAUSIBLE_YEAR {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a time file name (`HHMMSS.<ext>`).
///
/// The first six characters must be digits forming a valid time of day,
/// followed by a `.` and a non-empty extension. When `extension` is given
/// the file's extension must match it exactly.
pub fn parse_time_file(name: &str, extension: Option<&str>) -> Option<NaiveTime> {
    let bytes = name.as_bytes();
    if bytes.len() < 8 || !bytes[..6].iter().all(|b| b.is_ascii_digit()) || bytes[6] != b'.' {
        return None;
    }
    let ext = &name[7..];
    if ext.is_empty() {
        return None;
    }
    if let Some(wanted) = extension {
        if ext != wanted {
            return None;
        }
    }
    let hour: u32 = name[0..2].parse().ok()?;
    let minute: u32 = name[2..4].parse().ok()?;
    let second: u32 = name[4..6].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Day directory name for a date.
pub fn day_dir_name(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Time file name for a time of day.
pub fn time_file_name(time: NaiveTime, extension: &str) -> String {
    format!("{}.{}", time.format("%H%M%S"), extension)
}

/// Combine a day directory and a time file into a UTC data time.
pub fn data_time(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(time))
}

/// Convert epoch seconds from the wire into a UTC time.
pub fn from_epoch(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// An asymmetric time search window around a centre time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub center: DateTime<Utc>,
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(center: DateTime<Utc>, min: DateTime<Utc>, max: DateTime<Utc>) -> Self {
        Self { center, min, max }
    }

    /// Build a window from a centre and the margins on either side.
    pub fn from_margins(center: DateTime<Utc>, before: Duration, after: Duration) -> Self {
        Self {
            center,
            min: center - before,
            max: center + after,
        }
    }

    /// Build a window from wire epoch seconds.
    pub fn from_epoch(center: i64, min: i64, max: i64) -> Option<Self> {
        Some(Self::new(from_epoch(center)?, from_epoch(min)?, from_epoch(max)?))
    }

    /// Time before and after the centre covered by this window.
    pub fn margins(&self) -> (Duration, Duration) {
        (self.center - self.min, self.max - self.center)
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.min && dt <= &self.max
    }

    /// Every calendar day touched by the window, in order.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        if !self.is_valid() {
            return days;
        }
        let last = self.max.date_naive();
        let mut day = self.min.date_naive();
        while day <= last {
            days.push(day);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day_dir() {
        assert_eq!(
            parse_day_dir("20240115"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert!(parse_day_dir("20240230").is_none());
        assert!(parse_day_dir("20241301").is_none());
        assert!(parse_day_dir("2024011").is_none());
        assert!(parse_day_dir("202401150").is_none());
        assert!(parse_day_dir("2024o115").is_none());
        assert!(parse_day_dir("19000101").is_none());
    }

    #[test]
    fn test_parse_time_file() {
        assert_eq!(
            parse_time_file("123456.gvol", None),
            NaiveTime::from_hms_opt(12, 34, 56)
        );
        assert!(parse_time_file("123456.gvol", Some("gvol")).is_some());
        assert!(parse_time_file("123456.mdv", Some("gvol")).is_none());
        assert!(parse_time_file("123456.gvol.tmp", Some("gvol")).is_none());
        assert!(parse_time_file("246000.gvol", None).is_none());
        assert!(parse_time_file("126000.gvol", None).is_none());
        assert!(parse_time_file("123456", None).is_none());
        assert!(parse_time_file("123456.", None).is_none());
        assert!(parse_time_file("12345a.gvol", None).is_none());
    }

    #[test]
    fn test_names_round_trip() {
        let date = NaiveDate::from_ymd_opt(2023, 7, 4).unwrap();
        let time = NaiveTime::from_hms_opt(6, 5, 0).unwrap();
        assert_eq!(day_dir_name(date), "20230704");
        assert_eq!(time_file_name(time, "gvol"), "060500.gvol");
        assert_eq!(
            data_time(date, time).to_rfc3339(),
            "2023-07-04T06:05:00+00:00"
        );
    }

    #[test]
    fn test_window_days_span_midnight() {
        let center = Utc.with_ymd_and_hms(2024, 1, 15, 23, 50, 0).unwrap();
        let window =
            TimeWindow::from_margins(center, Duration::minutes(30), Duration::minutes(30));
        let days = window.days();
        assert_eq!(days.len(), 2);
        assert_eq!(day_dir_name(days[0]), "20240115");
        assert_eq!(day_dir_name(days[1]), "20240116");

        let (before, after) = window.margins();
        assert_eq!(before, Duration::minutes(30));
        assert_eq!(after, Duration::minutes(30));
    }

    #[test]
    fn test_inverted_window_has_no_days() {
        let window = TimeWindow::from_epoch(100, 200, 50).unwrap();
        assert!(!window.is_valid());
        assert!(window.days().is_empty());
    }
}

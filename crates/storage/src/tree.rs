//! Listing of date-named directories and time-named files.
//!
//! Entries whose names do not follow the convention are skipped.
//! Unreadable directories yield empty listings.

use std::fs;
use std::path::{Path, PathBuf};

use cdata_common::time::{data_time, parse_day_dir, parse_time_file};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::debug;

/// A valid time-named file inside a day directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFile {
    pub time: DateTime<Utc>,
    pub path: PathBuf,
}

/// Day directories under `root`, oldest first.
pub fn day_dirs(root: &Path) -> Vec<(NaiveDate, PathBuf)> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(error = %e, path = ?root, "Skipping unreadable data root");
            return Vec::new();
        }
    };

    let mut days: Vec<(NaiveDate, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if !path.is_dir() {
                return None;
            }
            let date = parse_day_dir(entry.file_name().to_str()?)?;
            Some((date, path))
        })
        .collect();
    days.sort();
    days
}

/// Valid time files in one day directory, earliest first.
pub fn time_files(day_dir: &Path, date: NaiveDate, extension: Option<&str>) -> Vec<TimeFile> {
    let entries = match fs::read_dir(day_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(error = %e, path = ?day_dir, "Skipping unreadable day directory");
            return Vec::new();
        }
    };

    let mut files: Vec<TimeFile> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if !path.is_file() {
                return None;
            }
            let time: NaiveTime = parse_time_file(entry.file_name().to_str()?, extension)?;
            Some(TimeFile {
                time: data_time(date, time),
                path,
            })
        })
        .collect();
    files.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.path.cmp(&b.path)));
    files
}

/// Data time encoded in a `.../YYYYMMDD/HHMMSS.<ext>` path, if any.
pub fn time_from_path(path: &Path) -> Option<DateTime<Utc>> {
    let name = path.file_name()?.to_str()?;
    let day = path.parent()?.file_name()?.to_str()?;
    Some(data_time(parse_day_dir(day)?, parse_time_file(name, None)?))
}

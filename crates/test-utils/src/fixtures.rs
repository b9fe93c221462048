//! Common test fixtures for cdata tests.
//!
//! This module provides fixed reference times and a builder for
//! `<root>/YYYYMMDD/HHMMSS.<ext>` data trees.

use std::fs;
use std::path::{Path, PathBuf};

use cdata_common::time::{day_dir_name, time_file_name};
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

/// Common time values for testing.
pub mod time {
    /// A fixed reference time for tests (2024-01-15T12:00:00Z)
    pub const REFERENCE_TIME: &str = "2024-01-15T12:00:00Z";
}

/// The reference time as a `DateTime`.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
        .single()
        .expect("valid reference time")
}

/// A temporary data tree that is removed when dropped.
pub struct DataTree {
    dir: TempDir,
}

impl DataTree {
    pub fn new() -> Self {
        Self {
            dir: crate::temp_test_dir_with_prefix("cdata_tree"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path a file for `time` would have, creating its day directory.
    pub fn file_path(&self, time: DateTime<Utc>, extension: &str) -> PathBuf {
        let day = self.root().join(day_dir_name(time.date_naive()));
        fs::create_dir_all(&day).expect("create day directory");
        day.join(time_file_name(time.time(), extension))
    }

    /// Write a data file named after `time`.
    pub fn add_file(&self, time: DateTime<Utc>, extension: &str, contents: &[u8]) -> PathBuf {
        let path = self.file_path(time, extension);
        fs::write(&path, contents).expect("write data file");
        path
    }

    /// Write an arbitrary file relative to the root.
    pub fn add_raw(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, contents).expect("write raw file");
        path
    }

    /// Create an empty directory relative to the root.
    pub fn add_dir(&self, relative: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(&path).expect("create directory");
        path
    }
}

impl Default for DataTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_reference_time_matches_constant() {
        assert_eq!(reference_time().to_rfc3339(), "2024-01-15T12:00:00+00:00");
        assert_eq!(
            reference_time(),
            time::REFERENCE_TIME.parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_data_tree_layout() {
        let tree = DataTree::new();
        let path = tree.add_file(reference_time() + Duration::seconds(5), "gvol", b"abc");
        assert!(path.ends_with("20240115/120005.gvol"));
        assert_eq!(fs::read(&path).unwrap(), b"abc");

        let raw = tree.add_raw("20240115/junk.txt", b"x");
        assert!(raw.exists());
        assert!(tree.add_dir("20240116").is_dir());
    }
}

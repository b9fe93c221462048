//! Earliest and latest data times discoverable under a set of roots.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tree::{day_dirs, time_files};

/// Time span of the data found by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

impl CoverageReport {
    pub fn has_data(&self) -> bool {
        self.earliest.is_some() && self.latest.is_some()
    }

    fn merge(&mut self, earliest: DateTime<Utc>, latest: DateTime<Utc>) {
        self.earliest = Some(self.earliest.map_or(earliest, |e| e.min(earliest)));
        self.latest = Some(self.latest.map_or(latest, |l| l.max(latest)));
    }
}

/// Scan every root for its first and last valid data file.
///
/// Day directories are probed from each end until one actually holds a
/// valid file, so empty days at either end are passed over. Read-only;
/// unreadable or empty roots contribute nothing.
pub fn scan_coverage(roots: &[PathBuf], extension: Option<&str>) -> CoverageReport {
    let mut report = CoverageReport::default();
    for root in roots {
        let days = day_dirs(root);
        let first = days
            .iter()
            .find_map(|(date, dir)| time_files(dir, *date, extension).into_iter().next());
        let last = days
            .iter()
            .rev()
            .find_map(|(date, dir)| time_files(dir, *date, extension).pop());
        if let (Some(first), Some(last)) = (first, last) {
            report.merge(first.time, last.time);
        }
    }
    report
}

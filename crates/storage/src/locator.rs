//! Resolution of requests to data files.
//!
//! Three modes:
//! - **Static**: a fixed configured file, regardless of the request
//! - **Latest**: the newest file across every root (or a configured
//!   "current" file)
//! - **Nearest**: the file closest to a centre time inside a window
//!
//! In replay deployments, requests for the newest data are answered from
//! a clock shifted back by the replay offset instead.

use std::path::PathBuf;

use cdata_common::TimeWindow;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::tree::{day_dirs, time_files, time_from_path, TimeFile};
use crate::window::CoverageWindow;

/// Locator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorConfig {
    /// Data roots, each holding `YYYYMMDD/HHMMSS.<ext>` trees
    pub roots: Vec<PathBuf>,
    /// Always serve this file
    pub static_path: Option<PathBuf>,
    /// Serve this file for latest-data requests instead of scanning
    pub current_path: Option<PathBuf>,
    /// Only files with this extension are considered
    pub file_extension: Option<String>,
    /// Replay clock offset behind wall-clock time
    pub replay_offset: Option<Duration>,
    /// Search margin used before any windowed lookup was remembered
    pub default_search_margin: Duration,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            static_path: None,
            current_path: None,
            file_extension: None,
            replay_offset: None,
            default_search_margin: Duration::minutes(30),
        }
    }
}

/// What a request asks the locator for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateRequest {
    Latest,
    Nearest(TimeWindow),
}

/// A resolved data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLocation {
    pub path: PathBuf,
    /// Data time encoded in the path, when it follows the naming convention
    pub time: Option<DateTime<Utc>>,
}

impl From<TimeFile> for DataLocation {
    fn from(file: TimeFile) -> Self {
        Self {
            path: file.path,
            time: Some(file.time),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataLocator {
    config: LocatorConfig,
}

impl DataLocator {
    pub fn new(config: LocatorConfig) -> StorageResult<Self> {
        if config.static_path.is_none() && config.current_path.is_none() && config.roots.is_empty() {
            return Err(StorageError::NoRoots);
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    fn extension(&self) -> Option<&str> {
        self.config.file_extension.as_deref()
    }

    fn replay_offset(&self) -> Option<Duration> {
        self.config.replay_offset.filter(|d| *d != Duration::zero())
    }

    /// Resolve a request to a file.
    ///
    /// Windowed lookups made on the client's behalf are remembered in
    /// `state`; replay lookups reuse the remembered margins.
    pub fn locate(
        &self,
        request: &LocateRequest,
        state: &mut CoverageWindow,
        now: DateTime<Utc>,
    ) -> Option<DataLocation> {
        if let Some(path) = &self.config.static_path {
            return Some(DataLocation {
                path: path.clone(),
                time: time_from_path(path),
            });
        }

        match request {
            LocateRequest::Latest => match self.replay_offset() {
                Some(offset) => {
                    let window =
                        state.window_around(now - offset, self.config.default_search_margin);
                    debug!(center = %window.center, "Replay lookup");
                    self.nearest(&window)
                }
                None => self.latest(),
            },
            LocateRequest::Nearest(window) => {
                state.remember(window);
                self.nearest(window)
            }
        }
    }

    /// The newest valid file across all roots.
    pub fn latest(&self) -> Option<DataLocation> {
        if let Some(path) = &self.config.current_path {
            return Some(DataLocation {
                path: path.clone(),
                time: time_from_path(path),
            });
        }

        let mut best: Option<TimeFile> = None;
        for root in &self.config.roots {
            let newest = day_dirs(root)
                .into_iter()
                .rev()
                .find_map(|(date, dir)| time_files(&dir, date, self.extension()).pop());
            if let Some(file) = newest {
                if best.as_ref().map_or(true, |b| file.time > b.time) {
                    best = Some(file);
                }
            }
        }
        best.map(DataLocation::from)
    }

    /// The valid file closest to the window's centre, inside the window.
    /// Ties go to the earlier file.
    pub fn nearest(&self, window: &TimeWindow) -> Option<DataLocation> {
        if !window.is_valid() {
            return None;
        }
        let days = window.days();
        let mut best: Option<(Duration, TimeFile)> = None;
        for root in &self.config.roots {
            for (date, dir) in day_dirs(root) {
                if !days.contains(&date) {
                    continue;
                }
                for file in time_files(&dir, date, self.extension()) {
                    if !window.contains(&file.time) {
                        continue;
                    }
                    let distance = if file.time >= window.center {
                        file.time - window.center
                    } else {
                        window.center - file.time
                    };
                    let better = match &best {
                        None => true,
                        Some((d, b)) => distance < *d || (distance == *d && file.time < b.time),
                    };
                    if better {
                        best = Some((distance, file));
                    }
                }
            }
        }
        best.map(|(_, file)| DataLocation::from(file))
    }
}

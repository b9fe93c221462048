//! Server context shared by every connection.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use grid_processor::{GvolSource, VolumeSource};
use storage::{CoverageWindow, DataLocator};

use crate::config::ServerConfig;

/// Shared server context, handed to every request handler.
pub struct ServerContext {
    pub config: ServerConfig,
    pub locator: DataLocator,
    pub source: Arc<dyn VolumeSource>,
    /// Remembered search margins and the last data time served
    pub window: Mutex<CoverageWindow>,
    pub stats: RequestStats,
}

impl ServerContext {
    /// Build a context reading `.gvol` volumes.
    pub fn new(config: ServerConfig) -> Result<Self> {
        Self::with_source(config, Arc::new(GvolSource))
    }

    pub fn with_source(config: ServerConfig, source: Arc<dyn VolumeSource>) -> Result<Self> {
        let locator =
            DataLocator::new(config.locator_config()).context("Failed to create data locator")?;
        Ok(Self {
            config,
            locator,
            source,
            window: Mutex::new(CoverageWindow::new()),
            stats: RequestStats::default(),
        })
    }
}

/// Cumulative request statistics reported to the service registry.
#[derive(Debug, Default)]
pub struct RequestStats {
    count: AtomicU64,
    /// Epoch seconds of the latest request; 0 before the first one
    last_request: AtomicI64,
}

impl RequestStats {
    pub fn record(&self, at: DateTime<Utc>) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.last_request.fetch_max(at.timestamp(), Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<DateTime<Utc>> {
        match self.last_request.load(Ordering::Relaxed) {
            0 => None,
            secs => cdata_common::time::from_epoch(secs),
        }
    }
}

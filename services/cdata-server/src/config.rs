//! Server configuration.
//!
//! Loaded from a YAML file whose sections all default, then adjusted by
//! environment overrides and command-line flags before validation.

use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use grid_processor::ExtractOptions;
use storage::LocatorConfig;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listener: ListenerConfig,
    pub data: DataConfig,
    pub extract: ExtractConfig,
    pub service: ServiceConfig,
    pub discovery: DiscoveryConfig,
    pub metrics: MetricsConfig,
}

/// Where and how connections are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address
    pub bind: String,
    /// TCP port (0 picks an ephemeral port)
    pub port: u16,
    /// Longest wait for a connection before a heartbeat is sent (seconds)
    pub accept_timeout_secs: u64,
    /// Bound on writing the reply (seconds)
    pub io_timeout_secs: u64,
    /// Connections served concurrently; 1 serves strictly one at a time
    pub max_workers: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 65000,
            accept_timeout_secs: 10,
            io_timeout_secs: 30,
            max_workers: 1,
        }
    }
}

/// Data store layout and time search behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Roots holding `YYYYMMDD/HHMMSS.<ext>` trees
    pub roots: Vec<PathBuf>,
    /// Serve this one file for every request
    pub static_path: Option<PathBuf>,
    /// Serve this file for latest-data requests
    pub current_path: Option<PathBuf>,
    /// Only files with this extension are considered
    pub file_extension: Option<String>,
    /// Whether a realtime feed is writing into the roots
    pub realtime: bool,
    /// Replay clock offset behind wall-clock time (seconds)
    pub replay_offset_secs: Option<i64>,
    /// Time search margin used until a client supplies one (seconds)
    pub default_search_margin_secs: i64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            static_path: None,
            current_path: None,
            file_extension: Some(grid_processor::volume::GVOL_EXTENSION.to_string()),
            realtime: true,
            replay_offset_secs: None,
            default_search_margin_secs: 1800,
        }
    }
}

/// Payload and metadata encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Run-length code payloads when that makes them smaller
    pub compress: bool,
    /// Longest run one RLE triple may carry (1..=255)
    pub max_run: u32,
    /// Divisor for lat/lon spacing and bounds in grid info
    pub highres_divisor: i32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            compress: false,
            max_run: 255,
            highres_divisor: cdata_protocol::HIGHRES_DIVISOR,
        }
    }
}

/// Identity advertised to the service registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service_type: String,
    pub subtype: String,
    pub instance: String,
    /// Host name advertised to clients; the local host name when unset
    pub host: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_type: "cdata".to_string(),
            subtype: "gvol".to_string(),
            instance: "default".to_string(),
            host: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Directory receiving one JSON record per service; disabled when unset
    pub registry_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus scrape address, e.g. `0.0.0.0:9100`; disabled when unset
    pub listen: Option<String>,
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path.as_ref()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `CDATA_PORT` and `CDATA_DATA_ROOTS` from the environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup.
    ///
    /// `CDATA_DATA_ROOTS` is a comma-separated list that replaces the
    /// configured roots.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("CDATA_PORT") {
            self.listener.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid CDATA_PORT '{}'", port))?;
        }
        if let Some(roots) = lookup("CDATA_DATA_ROOTS") {
            self.data.roots = roots
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
        }
        Ok(())
    }

    /// Check the configuration before anything is started.
    pub fn validate(&self) -> Result<()> {
        let data = &self.data;
        if data.static_path.is_none() && data.current_path.is_none() && data.roots.is_empty() {
            bail!("No data source configured: set data.roots, data.static_path or data.current_path");
        }
        if data.roots.iter().any(|r| r.as_os_str().is_empty()) {
            bail!("Empty path in data.roots");
        }
        if data.default_search_margin_secs < 0 {
            bail!(
                "data.default_search_margin_secs must not be negative, got {}",
                data.default_search_margin_secs
            );
        }
        if self.listener.max_workers == 0 {
            bail!("listener.max_workers must be at least 1");
        }
        if self.listener.accept_timeout_secs == 0 || self.listener.io_timeout_secs == 0 {
            bail!("listener timeouts must be at least one second");
        }
        if !(1..=255).contains(&self.extract.max_run) {
            bail!("extract.max_run must be within 1..=255, got {}", self.extract.max_run);
        }
        if self.extract.highres_divisor <= 0 {
            bail!(
                "extract.highres_divisor must be positive, got {}",
                self.extract.highres_divisor
            );
        }
        if let Some(listen) = &self.metrics.listen {
            let addr: SocketAddr = listen
                .parse()
                .with_context(|| format!("Invalid metrics.listen address '{}'", listen))?;
            if self.listener.port != 0 && addr.port() == self.listener.port {
                bail!("metrics.listen port {} collides with the data port", addr.port());
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listener.bind, self.listener.port)
    }

    pub fn accept_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.listener.accept_timeout_secs)
    }

    pub fn io_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.listener.io_timeout_secs)
    }

    pub fn locator_config(&self) -> LocatorConfig {
        LocatorConfig {
            roots: self.data.roots.clone(),
            static_path: self.data.static_path.clone(),
            current_path: self.data.current_path.clone(),
            file_extension: self.data.file_extension.clone(),
            replay_offset: self.data.replay_offset_secs.map(Duration::seconds),
            default_search_margin: Duration::seconds(self.data.default_search_margin_secs),
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            compress: self.extract.compress,
            max_run: self.extract.max_run.clamp(1, 255) as u8,
        }
    }
}

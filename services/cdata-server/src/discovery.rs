//! Service registration, heartbeats and data-coverage reporting.
//!
//! The server registers its identity once and heartbeats whenever the
//! listener is idle; until registration succeeds each heartbeat retries
//! it first. Each heartbeat carries a freshly computed status: the span of
//! data on disk, the time of the latest request and the request count.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use storage::{scan_coverage, CoverageReport};

use crate::config::ServerConfig;
use crate::metrics;
use crate::state::ServerContext;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize service record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Status refresh failed: {0}")]
    Refresh(String),
}

/// Identity advertised to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service_type: String,
    pub subtype: String,
    pub instance: String,
    pub host: String,
    /// First configured data root
    pub data_root: Option<PathBuf>,
    pub port: u16,
    /// Whether "new data" requests are answered from a realtime feed
    pub realtime: bool,
}

impl ServiceInfo {
    pub fn from_config(config: &ServerConfig, port: u16) -> Self {
        let host = config
            .service
            .host
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .unwrap_or_else(|| "localhost".to_string());
        Self {
            service_type: config.service.service_type.clone(),
            subtype: config.service.subtype.clone(),
            instance: config.service.instance.clone(),
            host,
            data_root: config.data.roots.first().cloned(),
            port,
            realtime: config.data.realtime,
        }
    }

    /// `<type>.<subtype>.<instance>`
    pub fn key(&self) -> String {
        format!("{}.{}.{}", self.service_type, self.subtype, self.instance)
    }
}

/// Status reported with every heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(flatten)]
    pub coverage: CoverageReport,
    pub last_request: Option<DateTime<Utc>>,
    pub request_count: u64,
}

/// Registration transport.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn register(&self, info: &ServiceInfo) -> Result<(), DiscoveryError>;

    async fn heartbeat(&self, info: &ServiceInfo, status: &ServiceStatus) -> Result<(), DiscoveryError>;
}

/// Registry that accepts everything and records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRegistry;

#[async_trait]
impl ServiceRegistry for NoopRegistry {
    async fn register(&self, _info: &ServiceInfo) -> Result<(), DiscoveryError> {
        Ok(())
    }

    async fn heartbeat(&self, _info: &ServiceInfo, _status: &ServiceStatus) -> Result<(), DiscoveryError> {
        Ok(())
    }
}

/// One JSON record per service in a shared directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    #[serde(flatten)]
    pub info: ServiceInfo,
    pub status: Option<ServiceStatus>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registry writing `<type>.<subtype>.<instance>.json` records.
///
/// Records are replaced atomically so readers never see a partial file.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    dir: PathBuf,
    registered_at: Arc<std::sync::Mutex<Option<DateTime<Utc>>>>,
}

impl DirectoryRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            registered_at: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    pub fn record_path(&self, info: &ServiceInfo) -> PathBuf {
        self.dir.join(format!("{}.json", info.key()))
    }

    fn registered_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.registered_at.lock() {
            Ok(mut at) => *at.get_or_insert(now),
            Err(_) => now,
        }
    }

    async fn write_record(&self, record: &ServiceRecord) -> Result<(), DiscoveryError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.record_path(&record.info);
        let tmp = self.dir.join(format!(".{}.json.tmp", record.info.key()));
        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = ?path, "Wrote service record");
        Ok(())
    }
}

#[async_trait]
impl ServiceRegistry for DirectoryRegistry {
    async fn register(&self, info: &ServiceInfo) -> Result<(), DiscoveryError> {
        let now = Utc::now();
        let record = ServiceRecord {
            info: info.clone(),
            status: None,
            registered_at: self.registered_at(now),
            updated_at: now,
        };
        self.write_record(&record).await
    }

    async fn heartbeat(&self, info: &ServiceInfo, status: &ServiceStatus) -> Result<(), DiscoveryError> {
        let now = Utc::now();
        let record = ServiceRecord {
            info: info.clone(),
            status: Some(status.clone()),
            registered_at: self.registered_at(now),
            updated_at: now,
        };
        self.write_record(&record).await
    }
}

/// Read a record written by [`DirectoryRegistry`].
pub fn read_record(path: &Path) -> Result<ServiceRecord, DiscoveryError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Callback producing the status sent with a heartbeat.
pub type StatusRefresh = Arc<dyn Fn() -> ServiceStatus + Send + Sync>;

/// Status refresh over the server's data roots and request statistics.
pub fn coverage_refresh(ctx: Arc<ServerContext>) -> StatusRefresh {
    Arc::new(move || {
        let config = ctx.locator.config();
        ServiceStatus {
            coverage: scan_coverage(&config.roots, config.file_extension.as_deref()),
            last_request: ctx.stats.last_request(),
            request_count: ctx.stats.count(),
        }
    })
}

/// Registration state and heartbeat driver for one service.
pub struct Discovery {
    registry: Arc<dyn ServiceRegistry>,
    info: ServiceInfo,
    refresh: StatusRefresh,
    registered: bool,
    ticks: u64,
}

impl Discovery {
    pub fn new(registry: Arc<dyn ServiceRegistry>, info: ServiceInfo, refresh: StatusRefresh) -> Self {
        Self {
            registry,
            info,
            refresh,
            registered: false,
            ticks: 0,
        }
    }

    pub fn info(&self) -> &ServiceInfo {
        &self.info
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Liveness ticks sent so far, successful or not.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Try to register; failures are logged and retried on the next heartbeat.
    pub async fn register(&mut self) -> bool {
        match self.registry.register(&self.info).await {
            Ok(()) => {
                info!(service = %self.info.key(), port = self.info.port, "Registered service");
                self.registered = true;
            }
            Err(e) => {
                warn!(error = %e, service = %self.info.key(), "Service registration failed");
            }
        }
        self.registered
    }

    /// Compute the current status on the blocking pool.
    pub async fn status(&self) -> Result<ServiceStatus, DiscoveryError> {
        let refresh = self.refresh.clone();
        tokio::task::spawn_blocking(move || refresh())
            .await
            .map_err(|e| DiscoveryError::Refresh(e.to_string()))
    }

    /// Send a liveness heartbeat. Registration is retried first while it
    /// has not succeeded, but the heartbeat goes out either way.
    pub async fn heartbeat(&mut self) {
        self.ticks += 1;
        metrics::record_heartbeat();
        if !self.registered {
            self.register().await;
        }
        let status = match self.status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Failed to refresh service status");
                return;
            }
        };
        match self.registry.heartbeat(&self.info, &status).await {
            Ok(()) => debug!(
                tick = self.ticks,
                registered = self.registered,
                earliest = ?status.coverage.earliest,
                latest = ?status.coverage.latest,
                requests = status.request_count,
                "Heartbeat sent"
            ),
            Err(e) => warn!(error = %e, service = %self.info.key(), "Heartbeat failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_utils::{reference_time, temp_test_dir, DataTree};

    fn info() -> ServiceInfo {
        ServiceInfo {
            service_type: "cdata".to_string(),
            subtype: "gvol".to_string(),
            instance: "radar".to_string(),
            host: "test-host".to_string(),
            data_root: Some(PathBuf::from("/data/radar")),
            port: 65000,
            realtime: true,
        }
    }

    /// Fails the first `failures` registrations, counts heartbeats.
    #[derive(Default)]
    struct FlakyRegistry {
        failures: AtomicUsize,
        registrations: AtomicUsize,
        heartbeats: AtomicUsize,
    }

    #[async_trait]
    impl ServiceRegistry for FlakyRegistry {
        async fn register(&self, _info: &ServiceInfo) -> Result<(), DiscoveryError> {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(DiscoveryError::Refresh("registry down".to_string()));
            }
            Ok(())
        }

        async fn heartbeat(&self, _info: &ServiceInfo, _status: &ServiceStatus) -> Result<(), DiscoveryError> {
            self.heartbeats.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fixed_status() -> StatusRefresh {
        Arc::new(|| ServiceStatus {
            request_count: 7,
            ..Default::default()
        })
    }

    #[test]
    fn test_record_key() {
        assert_eq!(info().key(), "cdata.gvol.radar");
    }

    #[test]
    fn test_info_from_config() {
        let mut config = ServerConfig::default();
        config.data.roots = vec![PathBuf::from("/a"), PathBuf::from("/b")];
        config.service.host = Some("cdata-1".to_string());
        let info = ServiceInfo::from_config(&config, 15000);
        assert_eq!(info.host, "cdata-1");
        assert_eq!(info.data_root, Some(PathBuf::from("/a")));
        assert_eq!(info.port, 15000);
        assert!(info.realtime);
    }

    #[test]
    fn test_directory_registry_writes_records() {
        let dir = temp_test_dir();
        let registry = DirectoryRegistry::new(dir.path().join("registry"));
        let info = info();

        tokio_test::block_on(async {
            tokio_test::assert_ok!(registry.register(&info).await);
            let record = read_record(&registry.record_path(&info)).unwrap();
            assert_eq!(record.info, info);
            assert!(record.status.is_none());

            let status = ServiceStatus {
                coverage: CoverageReport {
                    earliest: Some(reference_time()),
                    latest: Some(reference_time()),
                },
                last_request: None,
                request_count: 3,
            };
            tokio_test::assert_ok!(registry.heartbeat(&info, &status).await);
            let updated = read_record(&registry.record_path(&info)).unwrap();
            assert_eq!(updated.status, Some(status));
            assert_eq!(updated.registered_at, record.registered_at);
        });

        let names: Vec<_> = std::fs::read_dir(dir.path().join("registry"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cdata.gvol.radar.json".to_string()]);
    }

    #[tokio::test]
    async fn test_registration_is_retried_on_heartbeat() {
        let registry = Arc::new(FlakyRegistry {
            failures: AtomicUsize::new(1),
            ..Default::default()
        });
        let mut discovery = Discovery::new(registry.clone(), info(), fixed_status());

        assert!(!discovery.register().await);
        discovery.heartbeat().await;
        assert!(discovery.is_registered());
        assert_eq!(registry.registrations.load(Ordering::SeqCst), 2);
        assert_eq!(registry.heartbeats.load(Ordering::SeqCst), 1);

        discovery.heartbeat().await;
        assert_eq!(registry.registrations.load(Ordering::SeqCst), 2);
        assert_eq!(registry.heartbeats.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_heartbeat_sent_while_registration_fails() {
        let registry = Arc::new(FlakyRegistry {
            failures: AtomicUsize::new(3),
            ..Default::default()
        });
        let mut discovery = Discovery::new(registry.clone(), info(), fixed_status());

        discovery.heartbeat().await;
        discovery.heartbeat().await;
        assert!(!discovery.is_registered());
        assert_eq!(discovery.ticks(), 2);
        assert_eq!(registry.registrations.load(Ordering::SeqCst), 2);
        assert_eq!(registry.heartbeats.load(Ordering::SeqCst), 2);

        discovery.heartbeat().await;
        discovery.heartbeat().await;
        assert!(discovery.is_registered());
        assert_eq!(discovery.ticks(), 4);
        assert_eq!(registry.registrations.load(Ordering::SeqCst), 4);
        assert_eq!(registry.heartbeats.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_coverage_refresh_reports_tree_and_requests() {
        let tree = DataTree::new();
        tree.add_file(reference_time(), "gvol", b"x");
        tree.add_file(reference_time() + chrono::Duration::days(1), "gvol", b"x");
        tree.add_raw("20240117/notes.txt", b"x");

        let mut config = ServerConfig::default();
        config.data.roots = vec![tree.root().to_path_buf()];
        let ctx = Arc::new(ServerContext::new(config).unwrap());
        ctx.stats.record(reference_time());

        let discovery = Discovery::new(
            Arc::new(NoopRegistry),
            info(),
            coverage_refresh(ctx.clone()),
        );
        let status = discovery.status().await.unwrap();
        assert_eq!(status.coverage.earliest, Some(reference_time()));
        assert_eq!(
            status.coverage.latest,
            Some(reference_time() + chrono::Duration::days(1))
        );
        assert_eq!(status.last_request, Some(reference_time()));
        assert_eq!(status.request_count, 1);
    }

    #[tokio::test]
    async fn test_coverage_of_empty_tree() {
        let tree = DataTree::new();
        let mut config = ServerConfig::default();
        config.data.roots = vec![tree.root().to_path_buf()];
        let ctx = Arc::new(ServerContext::new(config).unwrap());

        let status = (coverage_refresh(ctx))();
        assert!(!status.coverage.has_data());
        assert_eq!(status.request_count, 0);
    }
}

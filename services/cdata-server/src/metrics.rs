//! Request metrics.
//!
//! Counters and histograms go through the `metrics` facade; they are only
//! exported when a Prometheus listener is configured.

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

pub const REQUESTS_TOTAL: &str = "cdata_requests_total";
pub const REQUEST_FAILURES_TOTAL: &str = "cdata_request_failures_total";
pub const BYTES_SENT_TOTAL: &str = "cdata_bytes_sent_total";
pub const REQUEST_DURATION_SECONDS: &str = "cdata_request_duration_seconds";
pub const HEARTBEATS_TOTAL: &str = "cdata_heartbeats_total";

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a tokio runtime.
pub fn install_exporter(listen: &str) -> Result<()> {
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("Invalid metrics listen address '{}'", listen))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!(address = %addr, "Prometheus metrics exporter initialized");
    Ok(())
}

/// Count one request by the slice it asked for.
pub fn record_request(slice: &'static str) {
    counter!(REQUESTS_TOTAL, "slice" => slice).increment(1);
}

pub fn record_failure(reason: &'static str) {
    counter!(REQUEST_FAILURES_TOTAL, "reason" => reason).increment(1);
}

pub fn record_bytes_sent(bytes: usize) {
    counter!(BYTES_SENT_TOTAL).increment(bytes as u64);
}

pub fn record_duration(elapsed: Duration) {
    histogram!(REQUEST_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

pub fn record_heartbeat() {
    counter!(HEARTBEATS_TOTAL).increment(1);
}

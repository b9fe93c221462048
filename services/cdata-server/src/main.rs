//! cdata grid-data server.
//!
//! Serves planes, composites and vertical sections of gridded volumes
//! over the cdata binary protocol.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cdata_server::{metrics, serve, DirectoryRegistry, NoopRegistry, ServerConfig, ServerContext, ServiceRegistry};

#[derive(Parser, Debug)]
#[command(name = "cdata-server")]
#[command(about = "Grid-data server for cdata clients")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "CDATA_CONFIG")]
    config: Option<PathBuf>,

    /// Port override
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "CDATA_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(port) = args.port {
        config.listener.port = port;
    }
    config.validate().context("Invalid configuration")?;
    info!(
        roots = ?config.data.roots,
        static_path = ?config.data.static_path,
        realtime = config.data.realtime,
        "Loaded configuration"
    );

    if let Some(listen) = &config.metrics.listen {
        metrics::install_exporter(listen)?;
    }

    let registry: Arc<dyn ServiceRegistry> = match &config.discovery.registry_dir {
        Some(dir) => {
            info!(dir = ?dir, "Registering in service directory");
            Arc::new(DirectoryRegistry::new(dir.clone()))
        }
        None => Arc::new(NoopRegistry),
    };

    let ctx = Arc::new(ServerContext::new(config)?);
    serve(ctx, registry).await
}

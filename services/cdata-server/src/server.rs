//! Connection listener and dispatcher.
//!
//! One request per connection: read the fixed request record, answer it
//! on the blocking pool, write the reply and close. Connections are
//! served by their own tasks, at most `max_workers` at a time. While no
//! client connects, the accept timeout drives service heartbeats.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use cdata_protocol::{ClientRequest, ProtocolError};

use crate::discovery::{coverage_refresh, Discovery, ServiceInfo, ServiceRegistry};
use crate::metrics;
use crate::processor::process_request;
use crate::state::ServerContext;

/// Errors that end a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed request: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Timed out writing the reply")]
    WriteTimeout,

    #[error("Request worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub struct CdataServer {
    ctx: Arc<ServerContext>,
    listener: TcpListener,
    discovery: Discovery,
    workers: Arc<Semaphore>,
}

impl CdataServer {
    /// Bind the configured address. Failing to bind is fatal to the caller.
    pub async fn bind(ctx: Arc<ServerContext>, registry: Arc<dyn ServiceRegistry>) -> Result<Self> {
        let addr = ctx.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let port = listener.local_addr()?.port();
        let info = ServiceInfo::from_config(&ctx.config, port);
        let discovery = Discovery::new(registry, info, coverage_refresh(ctx.clone()));
        let workers = Arc::new(Semaphore::new(ctx.config.listener.max_workers.max(1)));

        Ok(Self {
            ctx,
            listener,
            discovery,
            workers,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    pub async fn run(mut self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(
            address = %addr,
            max_workers = self.ctx.config.listener.max_workers,
            "Listening"
        );
        self.discovery.register().await;

        let accept_timeout = self.ctx.config.accept_timeout();
        loop {
            let (stream, peer) = match timeout(accept_timeout, self.listener.accept()).await {
                Err(_) => {
                    self.discovery.heartbeat().await;
                    continue;
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "Accept failed");
                    continue;
                }
                Ok(Ok(accepted)) => accepted,
            };

            let permit = self
                .workers
                .clone()
                .acquire_owned()
                .await
                .context("Worker pool closed")?;
            let ctx = self.ctx.clone();
            let span = info_span!("connection", id = %Uuid::new_v4(), peer = %peer);
            tokio::spawn(
                async move {
                    let _permit = permit;
                    match handle_connection(ctx, stream).await {
                        Ok(sent) => debug!(bytes = sent, "Connection closed"),
                        Err(e) => warn!(error = %e, "Connection failed"),
                    }
                }
                .instrument(span),
            );
        }
    }
}

/// Serve one connection: read a request, answer it, close.
///
/// The request read has no timeout; a client that connects and never
/// sends holds its worker permit until it disconnects.
pub async fn handle_connection(ctx: Arc<ServerContext>, mut stream: TcpStream) -> Result<usize, ConnectionError> {
    let started = Instant::now();

    let mut header = [0u8; ClientRequest::WIRE_SIZE];
    stream.read_exact(&mut header).await?;
    let request = ClientRequest::decode(&header)?;
    debug!(
        command = request.primary_com.bits(),
        slice = request.second_com,
        field = request.data_field,
        "Received request"
    );

    let worker_ctx = ctx.clone();
    let bundle =
        tokio::task::spawn_blocking(move || process_request(&worker_ctx, &request, Utc::now())).await?;
    let bytes = bundle.encode();

    let io_timeout = ctx.config.io_timeout();
    match timeout(io_timeout, stream.write_all(&bytes)).await {
        Ok(result) => result?,
        Err(_) => return Err(ConnectionError::WriteTimeout),
    }
    if let Ok(Err(e)) = timeout(io_timeout, stream.shutdown()).await {
        debug!(error = %e, "Shutdown after reply failed");
    }

    metrics::record_bytes_sent(bytes.len());
    metrics::record_duration(started.elapsed());
    info!(
        status = bundle.reply.status.bits(),
        n_points = bundle.reply.n_points,
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request served"
    );
    Ok(bytes.len())
}

/// Bind and serve until the process is stopped.
pub async fn serve(ctx: Arc<ServerContext>, registry: Arc<dyn ServiceRegistry>) -> Result<()> {
    let server = CdataServer::bind(ctx, registry).await?;
    if let Err(e) = server.run().await {
        error!(error = %e, "Server stopped");
        return Err(e);
    }
    Ok(())
}

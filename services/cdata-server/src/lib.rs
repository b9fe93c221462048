//! Cartesian grid-data server.
//!
//! Answers cdata binary requests for horizontal planes, composites and
//! vertical sections of gridded volumes stored in date/time-named trees.
//!
//! # Architecture
//!
//! ```text
//! TcpListener ──accept──► handle_connection (one task, one permit)
//!                              │ read ClientRequest
//!                              ▼
//!                        process_request (blocking pool)
//!                              │ DataLocator → VolumeSource → extract
//!                              ▼
//!                        ReplyBundle::encode → reply, info, heights, payload
//!
//! accept timeout ──► Discovery::heartbeat → ServiceRegistry
//! ```

pub mod config;
pub mod discovery;
pub mod metrics;
pub mod processor;
pub mod reply;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use discovery::{DirectoryRegistry, Discovery, NoopRegistry, ServiceInfo, ServiceRegistry, ServiceStatus};
pub use processor::process_request;
pub use reply::ReplyBundle;
pub use server::{handle_connection, serve, CdataServer, ConnectionError};
pub use state::{RequestStats, ServerContext};

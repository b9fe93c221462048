//! Data-tree access for cdata services.
//!
//! Provides:
//! - Time-indexed file discovery over `<root>/YYYYMMDD/HHMMSS.<ext>` trees
//! - The process-wide remembered search window
//! - Read-only coverage scans for service registration

pub mod coverage;
pub mod error;
pub mod locator;
pub mod tree;
pub mod window;

pub use coverage::{scan_coverage, CoverageReport};
pub use error::{StorageError, StorageResult};
pub use locator::{DataLocation, DataLocator, LocateRequest, LocatorConfig};
pub use window::CoverageWindow;

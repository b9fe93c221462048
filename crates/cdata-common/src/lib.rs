//! Common types and utilities shared across the cdata crates.

pub mod error;
pub mod grid;
pub mod time;

pub use error::{CdataError, CdataResult};
pub use grid::{GridGeometry, ProjectionKind};
pub use time::TimeWindow;

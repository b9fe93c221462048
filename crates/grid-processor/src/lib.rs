//! Slice extraction for gridded volumes.
//!
//! This crate turns an opened volume and a requested slice into the byte
//! payload a cdata client receives:
//!
//! - **Volume access**: the [`VolumeSource`]/[`VolumeHandle`] traits and
//!   the `.gvol` adapter
//! - **Extraction**: plane, composite and vertical-section slicing over
//!   bounds-checked plane views
//! - **Geometry helpers**: segment clipping and digital line traversal
//! - **Compression**: run-length coding of the payload
//!
//! # Architecture
//!
//! ```text
//! VolumeSource::open(path)
//!      │
//!      ▼
//! VolumeHandle::read_plane | read_composite | read_volume
//!      │
//!      ▼
//! VolumeData (owned, handle dropped)
//!      │
//!      ▼
//! extract(volume, slice, transform, options)
//!      │
//!      ├─► plane/composite: clamp box, copy rows
//!      ├─► vertical: clip segment, grid_line, sample each plane
//!      └─► optional rle_encode
//! ```

pub mod clip;
pub mod error;
pub mod extract;
pub mod rle;
pub mod traverse;
pub mod view;
pub mod volume;

pub use clip::clip_line;
pub use error::{GridProcessorError, Result};
pub use extract::{extract, ExtractOptions, Extraction, IndexBounds, Slice};
pub use rle::{rle_decode, rle_encode};
pub use traverse::grid_line;
pub use view::PlaneView;
pub use volume::{
    Encoding, FieldGeometry, GvolHeader, GvolSource, PlaneData, SourceLocation, VolumeData,
    VolumeHandle, VolumeSource, VolumeTimes,
};

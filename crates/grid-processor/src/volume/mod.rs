//! Gridded-volume access.
//!
//! A [`VolumeSource`] opens a file into a [`VolumeHandle`]; each request
//! performs exactly one read on the handle and gets back an owned
//! [`VolumeData`] that outlives the handle. Sample bytes are opaque.

mod gvol;

pub use gvol::{encode_gvol, write_gvol, GvolHandle, GvolHeader, GvolSource, GVOL_EXTENSION, GVOL_MAGIC};

use std::path::Path;

use cdata_common::GridGeometry;
use chrono::{DateTime, Utc};
use projection::VerticalLevels;
use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};
use crate::view::PlaneView;

/// Sample encoding requested from the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// One unsigned byte per sample.
    #[default]
    Int8,
}

/// Time stamps of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeTimes {
    pub begin: DateTime<Utc>,
    pub centroid: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub expire: DateTime<Utc>,
}

impl VolumeTimes {
    /// All four times at one instant.
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            begin: time,
            centroid: time,
            end: time,
            expire: time,
        }
    }
}

/// Location of the instrument or model that produced the volume.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub lat: f64,
    pub lon: f64,
    /// Altitude (km)
    pub alt: f64,
}

/// Geometry and encoding of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    pub name: String,
    pub units: String,
    pub grid: GridGeometry,
    /// Physical value = byte * scale + bias
    pub scale: f64,
    pub bias: f64,
    pub bad_value: u8,
    pub missing_value: u8,
    /// Per-level heights (km); empty when levels are evenly spaced.
    #[serde(default)]
    pub levels: Vec<f64>,
}

impl FieldGeometry {
    pub fn new(name: impl Into<String>, units: impl Into<String>, grid: GridGeometry) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            grid,
            scale: 1.0,
            bias: 0.0,
            bad_value: 255,
            missing_value: 255,
            levels: Vec::new(),
        }
    }

    pub fn vertical_levels(&self) -> VerticalLevels {
        VerticalLevels::resolve(&self.levels, self.grid.min_z, self.grid.dz, self.grid.nz)
    }

    pub fn has_level_table(&self) -> bool {
        !self.levels.is_empty() && self.levels.len() == self.grid.nz
    }

    /// Whether a byte carries no measurement.
    pub fn is_invalid(&self, value: u8) -> bool {
        value == self.bad_value || value == self.missing_value
    }
}

/// One plane read from a field, tagged with its level index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneData {
    pub index: usize,
    pub bytes: Vec<u8>,
}

/// Everything a request needs from a volume, copied out of the handle.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeData {
    pub times: VolumeTimes,
    pub field_count: usize,
    pub vlevel_included: bool,
    pub source_name: String,
    pub source: SourceLocation,
    pub field_index: usize,
    pub field: FieldGeometry,
    pub planes: Vec<PlaneData>,
}

impl VolumeData {
    pub fn grid(&self) -> &GridGeometry {
        &self.field.grid
    }

    /// Bounds-checked view of a plane read from this volume.
    pub fn view<'a>(&self, plane: &'a PlaneData) -> Result<PlaneView<'a>> {
        PlaneView::new(&plane.bytes, self.field.grid.nx, self.field.grid.ny)
    }

    /// The plane with a given level index, if it was read.
    pub fn plane(&self, index: usize) -> Option<&PlaneData> {
        self.planes.iter().find(|p| p.index == index)
    }

    pub fn first_plane(&self) -> Result<&PlaneData> {
        self.planes
            .first()
            .ok_or_else(|| GridProcessorError::read_failed("no planes were read"))
    }
}

/// Opens volume files.
pub trait VolumeSource: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn VolumeHandle>>;
}

/// An open volume. Dropping the handle closes it.
pub trait VolumeHandle: Send {
    fn path(&self) -> &Path;

    fn field_count(&self) -> usize;

    /// Read the plane of `field` whose level is nearest `height_km`.
    fn read_plane(&mut self, field: usize, height_km: f64, encoding: Encoding) -> Result<VolumeData>;

    /// Read a single plane summarizing every level of `field`.
    fn read_composite(&mut self, field: usize, encoding: Encoding) -> Result<VolumeData>;

    /// Read every plane of `field`.
    fn read_volume(&mut self, field: usize, encoding: Encoding) -> Result<VolumeData>;
}

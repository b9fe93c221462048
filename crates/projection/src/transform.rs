//! Mapping between physical horizontal coordinates and grid indices.
//!
//! A request's coordinates are relative to the client's origin. The
//! origin delta shifts them into the grid's own frame before they are
//! divided by the spacing, and shifts back when indices are reported.

use cdata_common::{GridGeometry, ProjectionKind};

use crate::error::{ProjectionError, ProjectionResult};
use crate::flat::FlatEarth;

/// A grid index clamped into its axis, remembering whether it had to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridIndex {
    pub index: usize,
    pub out_of_range: bool,
}

/// One horizontal axis of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTransform {
    /// Coordinate of the first cell centre
    pub min: f64,
    pub spacing: f64,
    pub len: usize,
    /// Client origin offset along this axis, in grid units
    pub delta: f64,
}

impl AxisTransform {
    pub fn new(axis: char, min: f64, spacing: f64, len: usize, delta: f64) -> ProjectionResult<Self> {
        if len == 0 {
            return Err(ProjectionError::EmptyAxis { axis });
        }
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(ProjectionError::InvalidSpacing { axis, spacing });
        }
        Ok(Self {
            min,
            spacing,
            len,
            delta,
        })
    }

    /// Unclamped, rounded index for a coordinate.
    pub fn raw_index(&self, value: f64) -> i64 {
        let raw = ((value + self.delta - self.min) / self.spacing).round();
        if raw.is_nan() {
            return i64::MIN;
        }
        raw.clamp(i64::MIN as f64, i64::MAX as f64) as i64
    }

    /// Clamp an already-computed index into the axis.
    pub fn clamp(&self, raw: i64) -> GridIndex {
        let last = (self.len - 1) as i64;
        let index = raw.clamp(0, last);
        GridIndex {
            index: index as usize,
            out_of_range: index != raw,
        }
    }

    /// Physical coordinate to index, clamped into `[0, len-1]`.
    pub fn to_index(&self, value: f64) -> GridIndex {
        self.clamp(self.raw_index(value))
    }

    /// Index to physical coordinate of the cell centre.
    pub fn to_coord(&self, index: usize) -> f64 {
        self.min + index as f64 * self.spacing - self.delta
    }
}

/// Horizontal transform for one request against one grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordTransform {
    pub x: AxisTransform,
    pub y: AxisTransform,
}

impl CoordTransform {
    /// Build the transform, computing the origin delta once.
    ///
    /// `client_origin` is the client's (lat, lon) in degrees; `None` means
    /// the client uses the grid's own origin.
    pub fn new(grid: &GridGeometry, client_origin: Option<(f64, f64)>) -> ProjectionResult<Self> {
        let (delta_x, delta_y) = origin_delta(grid, client_origin);
        Ok(Self {
            x: AxisTransform::new('x', grid.min_x, grid.dx, grid.nx, delta_x)?,
            y: AxisTransform::new('y', grid.min_y, grid.dy, grid.ny, delta_y)?,
        })
    }

    pub fn km_to_grid(&self, x: f64, y: f64) -> (GridIndex, GridIndex) {
        (self.x.to_index(x), self.y.to_index(y))
    }

    pub fn grid_to_km(&self, ix: usize, iy: usize) -> (f64, f64) {
        (self.x.to_coord(ix), self.y.to_coord(iy))
    }
}

/// Offset of the client's origin in the grid's frame.
///
/// Lat/lon grids subtract degrees directly. Every other grid projects the
/// client origin onto the flat-earth plane around the grid origin.
pub fn origin_delta(grid: &GridGeometry, client_origin: Option<(f64, f64)>) -> (f64, f64) {
    let Some((lat, lon)) = client_origin else {
        return (0.0, 0.0);
    };
    match grid.projection {
        ProjectionKind::LatLon => (lon - grid.origin_lon, lat - grid.origin_lat),
        _ => FlatEarth::new(grid.origin_lat, grid.origin_lon).latlon_to_xy(lat, lon),
    }
}

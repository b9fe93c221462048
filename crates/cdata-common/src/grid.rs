//! Grid geometry for Cartesian and lat/lon gridded volumes.

use serde::{Deserialize, Serialize};

/// Projection of a gridded volume.
///
/// Wire codes follow the classic PJG numbering used by cdata clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    /// Regular lat/lon grid; x is longitude, y is latitude (degrees).
    LatLon,
    /// Flat-earth Cartesian grid in km relative to the origin.
    Flat,
    /// Any other projection, carried through opaquely.
    Other(i32),
}

impl ProjectionKind {
    pub const LATLON_CODE: i32 = 0;
    pub const FLAT_CODE: i32 = 8;

    /// Wire code for this projection.
    pub fn code(&self) -> i32 {
        match self {
            ProjectionKind::LatLon => Self::LATLON_CODE,
            ProjectionKind::Flat => Self::FLAT_CODE,
            ProjectionKind::Other(code) => *code,
        }
    }

    /// Parse a wire code.
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::LATLON_CODE => ProjectionKind::LatLon,
            Self::FLAT_CODE => ProjectionKind::Flat,
            other => ProjectionKind::Other(other),
        }
    }

    pub fn is_latlon(&self) -> bool {
        matches!(self, ProjectionKind::LatLon)
    }
}

impl Default for ProjectionKind {
    fn default() -> Self {
        ProjectionKind::Flat
    }
}

/// Geometry of one field of a gridded volume.
///
/// `min_x`, `min_y` and `min_z` are the coordinates of the centre of the
/// first cell along each axis. Samples are stored plane-major, then
/// row-major (`z * ny * nx + y * nx + x`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Number of points in X direction
    pub nx: usize,
    /// Number of points in Y direction
    pub ny: usize,
    /// Number of vertical levels
    pub nz: usize,
    /// Grid spacing in X (km, or degrees for lat/lon grids)
    pub dx: f64,
    /// Grid spacing in Y
    pub dy: f64,
    /// Nominal vertical spacing (km)
    pub dz: f64,
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    #[serde(default)]
    pub projection: ProjectionKind,
    /// Projection origin latitude (degrees)
    #[serde(default)]
    pub origin_lat: f64,
    /// Projection origin longitude (degrees)
    #[serde(default)]
    pub origin_lon: f64,
}

impl GridGeometry {
    /// Create a flat-projection geometry with the origin at (0, 0).
    pub fn flat(nx: usize, ny: usize, nz: usize, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            nx,
            ny,
            nz,
            dx,
            dy,
            dz,
            min_x: 0.0,
            min_y: 0.0,
            min_z: 0.0,
            projection: ProjectionKind::Flat,
            origin_lat: 0.0,
            origin_lon: 0.0,
        }
    }

    /// Coordinate of the last cell centre in X.
    pub fn max_x(&self) -> f64 {
        self.min_x + self.nx.saturating_sub(1) as f64 * self.dx
    }

    /// Coordinate of the last cell centre in Y.
    pub fn max_y(&self) -> f64 {
        self.min_y + self.ny.saturating_sub(1) as f64 * self.dy
    }

    /// Nominal height of the top level.
    pub fn max_z(&self) -> f64 {
        self.min_z + self.nz.saturating_sub(1) as f64 * self.dz
    }

    /// Number of samples in one horizontal plane.
    pub fn plane_len(&self) -> usize {
        self.nx * self.ny
    }

    /// Total number of samples in the volume.
    pub fn len(&self) -> usize {
        self.plane_len() * self.nz
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0 || self.nz == 0
    }

    /// Get the 1D index within a plane for a 2D grid position.
    pub fn flat_index(&self, x: usize, y: usize) -> usize {
        y * self.nx + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_grid_extent() {
        let grid = GridGeometry::flat(10, 20, 3, 1.0, 0.5, 0.25);
        assert_eq!(grid.max_x(), 9.0);
        assert_eq!(grid.max_y(), 9.5);
        assert_eq!(grid.max_z(), 0.5);
        assert_eq!(grid.plane_len(), 200);
        assert_eq!(grid.len(), 600);
        assert!(!grid.is_empty());
    }

    #[test]
    fn test_projection_codes() {
        assert_eq!(ProjectionKind::from_code(0), ProjectionKind::LatLon);
        assert_eq!(ProjectionKind::from_code(8), ProjectionKind::Flat);
        assert_eq!(ProjectionKind::from_code(3), ProjectionKind::Other(3));
        assert_eq!(ProjectionKind::Other(3).code(), 3);
    }

    #[test]
    fn test_flat_index_is_row_major() {
        let grid = GridGeometry::flat(4, 3, 1, 1.0, 1.0, 1.0);
        assert_eq!(grid.flat_index(0, 0), 0);
        assert_eq!(grid.flat_index(3, 0), 3);
        assert_eq!(grid.flat_index(0, 1), 4);
        assert_eq!(grid.flat_index(3, 2), 11);
    }
}

//! Slice extraction from volume data.
//!
//! Horizontal planes and composites clamp the requested box into the grid
//! and copy it row by row. Vertical sections clip the requested segment
//! to the grid, walk its digital line and sample every plane in the
//! z range along it.

use projection::CoordTransform;
use tracing::debug;

use crate::clip::clip_line;
use crate::error::{GridProcessorError, Result};
use crate::rle::rle_encode;
use crate::traverse::grid_line;
use crate::volume::VolumeData;

/// The slice a request asks for, in the client's physical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slice {
    Plane { x: (f64, f64), y: (f64, f64) },
    Composite { x: (f64, f64), y: (f64, f64) },
    Vertical {
        start: (f64, f64),
        end: (f64, f64),
        z: (f64, f64),
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Run-length code the payload when that makes it smaller.
    pub compress: bool,
    pub max_run: u8,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            compress: false,
            max_run: 255,
        }
    }
}

/// Served grid-index bounds, each within `[0, dim-1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexBounds {
    pub x1: usize,
    pub x2: usize,
    pub y1: usize,
    pub y2: usize,
    pub z1: usize,
    pub z2: usize,
}

/// The result of one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub bounds: IndexBounds,
    /// Payload width: columns for planes, path length for sections.
    pub nx: usize,
    /// Payload height: rows for planes, z planes for sections.
    pub ny: usize,
    pub nz: usize,
    pub payload: Vec<u8>,
    /// Sample count before compression.
    pub data_length: usize,
    pub compressed: bool,
    /// Some requested coordinate fell outside the grid and was clamped.
    pub out_of_range: bool,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Extract `slice` from `volume`.
///
/// Planes and composites use the single plane the reader returned;
/// vertical sections need every plane in the resolved z range.
pub fn extract(
    volume: &VolumeData,
    slice: &Slice,
    transform: &CoordTransform,
    options: &ExtractOptions,
) -> Result<Extraction> {
    let mut extraction = match *slice {
        Slice::Plane { x, y } => {
            let plane = volume.first_plane()?;
            extract_rect(volume, plane.index, x, y, transform, (plane.index, plane.index))?
        }
        Slice::Composite { x, y } => {
            let plane = volume.first_plane()?;
            let top = volume.grid().nz.saturating_sub(1);
            extract_rect(volume, plane.index, x, y, transform, (0, top))?
        }
        Slice::Vertical { start, end, z } => extract_section(volume, start, end, z, transform)?,
    };

    extraction.data_length = extraction.payload.len();
    if options.compress && !extraction.payload.is_empty() {
        if let Some(coded) = rle_encode(&extraction.payload, options.max_run) {
            debug!(
                full = extraction.payload.len(),
                coded = coded.len(),
                "Compressed payload"
            );
            extraction.payload = coded;
            extraction.compressed = true;
        }
    }
    Ok(extraction)
}

fn extract_rect(
    volume: &VolumeData,
    plane_index: usize,
    x: (f64, f64),
    y: (f64, f64),
    transform: &CoordTransform,
    z: (usize, usize),
) -> Result<Extraction> {
    let plane = volume
        .plane(plane_index)
        .ok_or_else(|| GridProcessorError::read_failed(format!("plane {} not read", plane_index)))?;
    let view = volume.view(plane)?;

    let x1 = transform.x.to_index(x.0.min(x.1));
    let x2 = transform.x.to_index(x.0.max(x.1));
    let y1 = transform.y.to_index(y.0.min(y.1));
    let y2 = transform.y.to_index(y.0.max(y.1));

    let mut payload = Vec::new();
    view.copy_rect((x1.index, x2.index), (y1.index, y2.index), &mut payload)?;

    Ok(Extraction {
        bounds: IndexBounds {
            x1: x1.index,
            x2: x2.index,
            y1: y1.index,
            y2: y2.index,
            z1: z.0,
            z2: z.1,
        },
        nx: x2.index - x1.index + 1,
        ny: y2.index - y1.index + 1,
        nz: 1,
        data_length: payload.len(),
        payload,
        compressed: false,
        out_of_range: x1.out_of_range || x2.out_of_range || y1.out_of_range || y2.out_of_range,
    })
}

fn extract_section(
    volume: &VolumeData,
    start: (f64, f64),
    end: (f64, f64),
    z: (f64, f64),
    transform: &CoordTransform,
) -> Result<Extraction> {
    let grid = volume.grid();
    let raw_start = (transform.x.raw_index(start.0), transform.y.raw_index(start.1));
    let raw_end = (transform.x.raw_index(end.0), transform.y.raw_index(end.1));
    let (z1, z2) = volume.field.vertical_levels().range(z.0, z.1);
    let Some((p0, p1)) = clip_line(raw_start, raw_end, grid.nx, grid.ny) else {
        debug!(?raw_start, ?raw_end, "Section misses the grid");
        return Ok(Extraction {
            bounds: IndexBounds {
                z1,
                z2,
                ..IndexBounds::default()
            },
            nx: 0,
            ny: 0,
            nz: 0,
            payload: Vec::new(),
            data_length: 0,
            compressed: false,
            out_of_range: true,
        });
    };
    let out_of_range = raw_start != (p0.0 as i64, p0.1 as i64) || raw_end != (p1.0 as i64, p1.1 as i64);

    let path = grid_line(p0, p1);

    let mut payload = Vec::with_capacity(path.len() * (z2 - z1 + 1));
    for level in z1..=z2 {
        let plane = volume
            .plane(level)
            .ok_or_else(|| GridProcessorError::read_failed(format!("plane {} not read", level)))?;
        volume.view(plane)?.sample_path(&path, &mut payload)?;
    }

    Ok(Extraction {
        bounds: IndexBounds {
            x1: p0.0,
            x2: p1.0,
            y1: p0.1,
            y2: p1.1,
            z1,
            z2,
        },
        nx: path.len(),
        ny: z2 - z1 + 1,
        nz: z2 - z1 + 1,
        data_length: payload.len(),
        payload,
        compressed: false,
        out_of_range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rle::rle_decode;
    use crate::volume::{FieldGeometry, PlaneData, SourceLocation, VolumeTimes};
    use cdata_common::GridGeometry;
    use chrono::{TimeZone, Utc};

    fn volume(nx: usize, ny: usize, planes: Vec<Vec<u8>>) -> VolumeData {
        let grid = GridGeometry::flat(nx, ny, planes.len(), 1.0, 1.0, 1.0);
        VolumeData {
            times: VolumeTimes::at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            field_count: 1,
            vlevel_included: false,
            source_name: "test".to_string(),
            source: SourceLocation::default(),
            field_index: 0,
            field: FieldGeometry::new("DBZ", "dBZ", grid),
            planes: planes
                .into_iter()
                .enumerate()
                .map(|(index, bytes)| PlaneData { index, bytes })
                .collect(),
        }
    }

    fn ramp_volume() -> VolumeData {
        volume(10, 10, vec![(0..100u8).collect()])
    }

    fn transform(volume: &VolumeData) -> CoordTransform {
        CoordTransform::new(volume.grid(), None).unwrap()
    }

    #[test]
    fn test_full_plane() {
        let vol = ramp_volume();
        let slice = Slice::Plane { x: (0.0, 9.0), y: (0.0, 9.0) };
        let out = extract(&vol, &slice, &transform(&vol), &ExtractOptions::default()).unwrap();
        assert_eq!((out.nx, out.ny), (10, 10));
        assert_eq!(out.payload, (0..100u8).collect::<Vec<_>>());
        assert!(!out.out_of_range);
    }

    #[test]
    fn test_plane_is_clamped() {
        let vol = ramp_volume();
        let slice = Slice::Plane { x: (7.0, 40.0), y: (-3.0, 1.0) };
        let out = extract(&vol, &slice, &transform(&vol), &ExtractOptions::default()).unwrap();
        assert_eq!(
            out.bounds,
            IndexBounds { x1: 7, x2: 9, y1: 0, y2: 1, z1: 0, z2: 0 }
        );
        assert_eq!(out.payload, vec![7, 8, 9, 17, 18, 19]);
        assert!(out.out_of_range);
    }

    #[test]
    fn test_plane_is_idempotent() {
        let vol = ramp_volume();
        let slice = Slice::Plane { x: (2.0, 6.0), y: (3.0, 5.0) };
        let t = transform(&vol);
        let a = extract(&vol, &slice, &t, &ExtractOptions::default()).unwrap();
        let b = extract(&vol, &slice, &t, &ExtractOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_composite_reports_full_z_extent() {
        let mut vol = volume(2, 2, vec![vec![1, 2, 3, 4]]);
        vol.field.grid.nz = 5;
        let slice = Slice::Composite { x: (0.0, 1.0), y: (0.0, 1.0) };
        let out = extract(&vol, &slice, &transform(&vol), &ExtractOptions::default()).unwrap();
        assert_eq!((out.bounds.z1, out.bounds.z2), (0, 4));
        assert_eq!(out.payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_diagonal_section() {
        let vol = ramp_volume();
        let slice = Slice::Vertical {
            start: (0.0, 0.0),
            end: (9.0, 9.0),
            z: (0.0, 0.0),
        };
        let out = extract(&vol, &slice, &transform(&vol), &ExtractOptions::default()).unwrap();
        assert_eq!(out.payload, vec![0, 11, 22, 33, 44, 55, 66, 77, 88, 99]);
        assert_eq!((out.nx, out.ny), (10, 1));
    }

    #[test]
    fn test_section_off_grid_is_empty() {
        let vol = ramp_volume();
        let slice = Slice::Vertical {
            start: (20.0, 1.0),
            end: (20.0, 5.0),
            z: (0.0, 0.0),
        };
        let out = extract(&vol, &slice, &transform(&vol), &ExtractOptions::default()).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.nx, 0);
        assert_eq!(out.data_length, 0);
        assert!(out.out_of_range);

        let slice = Slice::Vertical {
            start: (-4.0, -30.0),
            end: (-4.0, 30.0),
            z: (0.0, 0.0),
        };
        let options = ExtractOptions { compress: true, max_run: 255 };
        let out = extract(&vol, &slice, &transform(&vol), &options).unwrap();
        assert!(out.is_empty());
        assert!(!out.compressed);
    }

    #[test]
    fn test_section_spans_z_planes() {
        let planes = vec![vec![1u8; 16], vec![2u8; 16], vec![3u8; 16]];
        let vol = volume(4, 4, planes);
        let slice = Slice::Vertical {
            start: (-10.0, 1.0),
            end: (10.0, 1.0),
            z: (0.9, 2.0),
        };
        let out = extract(&vol, &slice, &transform(&vol), &ExtractOptions::default()).unwrap();
        assert_eq!((out.bounds.x1, out.bounds.x2), (0, 3));
        assert_eq!((out.bounds.z1, out.bounds.z2), (1, 2));
        assert_eq!(out.nx, 4);
        assert_eq!(out.ny, 2);
        assert_eq!(out.payload, vec![2, 2, 2, 2, 3, 3, 3, 3]);
        assert!(out.out_of_range);
    }

    #[test]
    fn test_compression_applies_when_smaller() {
        let vol = volume(20, 20, vec![vec![4u8; 400]]);
        let slice = Slice::Plane { x: (0.0, 19.0), y: (0.0, 19.0) };
        let options = ExtractOptions { compress: true, max_run: 255 };
        let out = extract(&vol, &slice, &transform(&vol), &options).unwrap();
        assert!(out.compressed);
        assert_eq!(out.data_length, 400);
        assert!(out.payload.len() < 400);
        assert_eq!(rle_decode(&out.payload).unwrap(), vec![4u8; 400]);

        let vol = ramp_volume();
        let slice = Slice::Plane { x: (0.0, 9.0), y: (0.0, 9.0) };
        let out = extract(&vol, &slice, &transform(&vol), &options).unwrap();
        assert!(!out.compressed);
        assert_eq!(out.payload.len(), 100);
    }

    #[test]
    fn test_missing_plane_is_an_error() {
        let mut vol = volume(2, 2, vec![vec![0; 4], vec![1; 4]]);
        vol.planes.truncate(1);
        let slice = Slice::Vertical {
            start: (0.0, 0.0),
            end: (1.0, 1.0),
            z: (0.0, 1.0),
        };
        assert!(extract(&vol, &slice, &transform(&vol), &ExtractOptions::default()).is_err());
    }
}

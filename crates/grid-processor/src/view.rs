//! Bounds-checked views over row-major plane buffers.

use crate::error::{GridProcessorError, Result};

/// A borrowed `nx` by `ny` plane stored row-major (`y * nx + x`).
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    data: &'a [u8],
    nx: usize,
    ny: usize,
}

impl<'a> PlaneView<'a> {
    /// Wrap a buffer, checking that it holds the whole plane.
    pub fn new(data: &'a [u8], nx: usize, ny: usize) -> Result<Self> {
        if data.len() < nx * ny {
            return Err(GridProcessorError::out_of_bounds(
                format!("{}x{} plane", nx, ny),
                format!("buffer of {} bytes", data.len()),
            ));
        }
        Ok(Self { data, nx, ny })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.nx || y >= self.ny {
            return None;
        }
        self.data.get(y * self.nx + x).copied()
    }

    /// Cells `x1..=x2` of row `y`.
    pub fn row(&self, y: usize, x1: usize, x2: usize) -> Result<&'a [u8]> {
        if y >= self.ny || x1 > x2 || x2 >= self.nx {
            return Err(GridProcessorError::out_of_bounds(
                format!("row {} cols {}..={}", y, x1, x2),
                format!("{}x{}", self.nx, self.ny),
            ));
        }
        let start = y * self.nx;
        Ok(&self.data[start + x1..=start + x2])
    }

    /// Append the rectangle `x1..=x2` by `y1..=y2` to `out`, row by row.
    pub fn copy_rect(&self, x: (usize, usize), y: (usize, usize), out: &mut Vec<u8>) -> Result<()> {
        if y.0 > y.1 {
            return Err(GridProcessorError::out_of_bounds(
                format!("rows {}..={}", y.0, y.1),
                format!("{}x{}", self.nx, self.ny),
            ));
        }
        out.reserve((x.1.saturating_sub(x.0) + 1) * (y.1 - y.0 + 1));
        for row in y.0..=y.1 {
            out.extend_from_slice(self.row(row, x.0, x.1)?);
        }
        Ok(())
    }

    /// Samples along a path of cells, in path order.
    pub fn sample_path(&self, path: &[(usize, usize)], out: &mut Vec<u8>) -> Result<()> {
        out.reserve(path.len());
        for &(x, y) in path {
            let value = self.get(x, y).ok_or_else(|| {
                GridProcessorError::out_of_bounds(
                    format!("cell ({}, {})", x, y),
                    format!("{}x{}", self.nx, self.ny),
                )
            })?;
            out.push(value);
        }
        Ok(())
    }
}

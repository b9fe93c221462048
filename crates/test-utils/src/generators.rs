//! Test data generators for synthetic byte volumes.
//!
//! These generators create predictable, verifiable sample patterns
//! that can be used across the test suite.

/// Creates a plane whose bytes count up in row-major order.
///
/// Cell `(x, y)` holds `(y * nx + x) % 256`, so a 10x10 plane holds
/// 0..99 and a diagonal reads 0, 11, 22, ...
///
/// # Example
///
/// ```
/// use test_utils::create_ramp_plane;
///
/// let plane = create_ramp_plane(10, 10);
/// assert_eq!(plane.len(), 100);
/// assert_eq!(plane[11], 11);
/// ```
pub fn create_ramp_plane(nx: usize, ny: usize) -> Vec<u8> {
    (0..nx * ny).map(|i| (i % 256) as u8).collect()
}

/// Creates a plane filled with one value.
pub fn create_constant_plane(nx: usize, ny: usize, value: u8) -> Vec<u8> {
    vec![value; nx * ny]
}

/// Creates a volume, plane-major then row-major, from a per-cell function.
///
/// # Arguments
///
/// * `nx`, `ny`, `nz` - Volume dimensions
/// * `value` - Called with `(x, y, z)` for every cell
pub fn create_volume<F>(nx: usize, ny: usize, nz: usize, value: F) -> Vec<u8>
where
    F: Fn(usize, usize, usize) -> u8,
{
    let mut data = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                data.push(value(x, y, z));
            }
        }
    }
    data
}

/// Creates a volume where every cell of level `z` holds `z * 10 + 1`.
///
/// Handy for checking which levels a read returned.
pub fn create_layered_volume(nx: usize, ny: usize, nz: usize) -> Vec<u8> {
    create_volume(nx, ny, nz, |_, _, z| (z * 10 + 1) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_plane() {
        let plane = create_ramp_plane(10, 10);
        assert_eq!(plane[0], 0);
        assert_eq!(plane[99], 99);
        assert_eq!(create_ramp_plane(20, 20)[256], 0);
    }

    #[test]
    fn test_layered_volume() {
        let volume = create_layered_volume(2, 3, 4);
        assert_eq!(volume.len(), 24);
        assert_eq!(volume[0], 1);
        assert_eq!(volume[6], 11);
        assert_eq!(volume[23], 31);
    }

    #[test]
    fn test_volume_order_is_plane_major() {
        let volume = create_volume(3, 2, 2, |x, y, z| (z * 100 + y * 10 + x) as u8);
        assert_eq!(volume[..6], [0, 1, 2, 10, 11, 12]);
        assert_eq!(volume[6], 100);
    }
}

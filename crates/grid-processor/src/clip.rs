//! Clipping of a line segment to a grid rectangle.

/// Clip a segment between two index-space points into
/// `[0, nx-1] x [0, ny-1]`, keeping its direction.
///
/// Axis-aligned segments are clipped per axis; if such a segment lies
/// entirely outside on the perpendicular axis it misses the grid and
/// `None` is returned. Other segments are clipped along their slope, and
/// a final clamp keeps segments that miss the rectangle inside it.
pub fn clip_line(
    start: (i64, i64),
    end: (i64, i64),
    nx: usize,
    ny: usize,
) -> Option<((usize, usize), (usize, usize))> {
    if nx == 0 || ny == 0 {
        return None;
    }
    let max_x = (nx - 1) as i64;
    let max_y = (ny - 1) as i64;
    let in_x = |x: i64| (0..=max_x).contains(&x);
    let in_y = |y: i64| (0..=max_y).contains(&y);
    let to_cell = |x: i64, y: i64| (x.clamp(0, max_x) as usize, y.clamp(0, max_y) as usize);

    if start.0 == end.0 {
        if !in_x(start.0) {
            return None;
        }
        return Some((to_cell(start.0, start.1), to_cell(end.0, end.1)));
    }
    if start.1 == end.1 {
        if !in_y(start.1) {
            return None;
        }
        return Some((to_cell(start.0, start.1), to_cell(end.0, end.1)));
    }

    let slope = (end.1 - start.1) as f64 / (end.0 - start.0) as f64;
    let intercept = start.1 as f64 - slope * start.0 as f64;
    let (max_xf, max_yf) = (max_x as f64, max_y as f64);

    let clip_point = |(x, y): (i64, i64)| {
        let (mut x, mut y) = (x as f64, y as f64);
        if x < 0.0 || x > max_xf {
            x = x.clamp(0.0, max_xf);
            y = slope * x + intercept;
        }
        if y < 0.0 || y > max_yf {
            y = y.clamp(0.0, max_yf);
            x = (y - intercept) / slope;
        }
        let x = (x.round() as i64).clamp(0, max_x);
        let y = (y.round() as i64).clamp(0, max_y);
        (x as usize, y as usize)
    };

    Some((clip_point(start), clip_point(end)))
}

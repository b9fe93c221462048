//! Digital line traversal across grid cells.

/// Every cell on the digital line from `start` to `end`, inclusive, in
/// order. The path has `1 + max(|dx|, |dy|)` cells.
///
/// Uses an integer error accumulator: the major axis advances every step
/// and the minor axis advances whenever the accumulated error turns
/// positive.
pub fn grid_line(start: (usize, usize), end: (usize, usize)) -> Vec<(usize, usize)> {
    let (x0, y0) = (start.0 as i64, start.1 as i64);
    let (x1, y1) = (end.0 as i64, end.1 as i64);
    let (dx, dy) = (x1 - x0, y1 - y0);
    let (step_x, step_y) = (dx.signum(), dy.signum());
    let x_major = dx.abs() >= dy.abs();
    let (d_major, d_minor) = if x_major {
        (dx.abs(), dy.abs())
    } else {
        (dy.abs(), dx.abs())
    };

    let mut cells = Vec::with_capacity(d_major as usize + 1);
    let (mut x, mut y) = (x0, y0);
    cells.push((x as usize, y as usize));

    let mut err = 2 * d_minor - d_major;
    for _ in 0..d_major {
        if err > 0 {
            if x_major {
                y += step_y;
            } else {
                x += step_x;
            }
            err -= 2 * d_major;
        }
        err += 2 * d_minor;
        if x_major {
            x += step_x;
        } else {
            y += step_y;
        }
        cells.push((x as usize, y as usize));
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cell() {
        assert_eq!(grid_line((4, 4), (4, 4)), vec![(4, 4)]);
    }

    #[test]
    fn test_diagonal() {
        let cells = grid_line((0, 0), (9, 9));
        assert_eq!(cells.len(), 10);
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(*cell, (i, i));
        }
    }

    #[test]
    fn test_shallow_line() {
        assert_eq!(
            grid_line((0, 0), (4, 1)),
            vec![(0, 0), (1, 0), (2, 0), (3, 1), (4, 1)]
        );
    }

    #[test]
    fn test_steep_reversed_line() {
        let cells = grid_line((3, 8), (1, 0));
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0], (3, 8));
        assert_eq!(*cells.last().unwrap(), (1, 0));
        for pair in cells.windows(2) {
            assert_eq!(pair[0].1 - pair[1].1, 1);
            assert!(pair[0].0 - pair[1].0 <= 1);
        }
    }

    #[test]
    fn test_path_length_and_endpoints() {
        for &(start, end) in &[((0, 5), (7, 2)), ((6, 0), (0, 6)), ((2, 2), (2, 9))] {
            let cells = grid_line(start, end);
            let dx = (end.0 as i64 - start.0 as i64).abs();
            let dy = (end.1 as i64 - start.1 as i64).abs();
            assert_eq!(cells.len() as i64, 1 + dx.max(dy));
            assert_eq!(cells[0], start);
            assert_eq!(*cells.last().unwrap(), end);
        }
    }
}

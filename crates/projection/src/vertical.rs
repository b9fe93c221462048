//! Vertical level lookup.

/// Physical heights (km) of a volume's vertical levels.
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalLevels {
    heights: Vec<f64>,
    /// Nominal spacing, used to synthesize boundaries for a single level
    nominal_dz: f64,
}

impl VerticalLevels {
    /// Levels from an explicit table.
    pub fn from_table(heights: Vec<f64>, nominal_dz: f64) -> Self {
        Self {
            heights,
            nominal_dz,
        }
    }

    /// Evenly spaced levels starting at `min_z`.
    pub fn uniform(min_z: f64, dz: f64, nz: usize) -> Self {
        Self {
            heights: (0..nz).map(|i| min_z + i as f64 * dz).collect(),
            nominal_dz: dz,
        }
    }

    /// Use the table when it covers every level, uniform spacing otherwise.
    pub fn resolve(table: &[f64], min_z: f64, dz: f64, nz: usize) -> Self {
        if table.len() == nz && nz > 0 {
            Self::from_table(table.to_vec(), dz)
        } else {
            Self::uniform(min_z, dz, nz)
        }
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Index of the level closest to `z`; ties go to the lower level.
    /// Always within `[0, len-1]` (0 for an empty table).
    pub fn nearest(&self, z: f64) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, h) in self.heights.iter().enumerate() {
            let dist = (h - z).abs();
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }
        best
    }

    /// Level indices for a z window, in ascending order.
    pub fn range(&self, z_min: f64, z_max: f64) -> (usize, usize) {
        let a = self.nearest(z_min);
        let b = self.nearest(z_max);
        (a.min(b), a.max(b))
    }

    /// `(lower, mid, upper)` boundaries of every level.
    ///
    /// Interior boundaries sit halfway between neighbours. The outer
    /// boundary of the first and last level mirrors its inner gap; a lone
    /// level spans half the nominal spacing either side.
    pub fn boundaries(&self) -> Vec<(f64, f64, f64)> {
        let h = &self.heights;
        let n = h.len();
        if n == 1 {
            let half = self.nominal_dz / 2.0;
            return vec![(h[0] - half, h[0], h[0] + half)];
        }
        (0..n)
            .map(|i| {
                let lower = if i > 0 {
                    (h[i - 1] + h[i]) / 2.0
                } else {
                    h[0] - (h[1] - h[0]) / 2.0
                };
                let upper = if i + 1 < n {
                    (h[i] + h[i + 1]) / 2.0
                } else {
                    h[i] + (h[i] - h[i - 1]) / 2.0
                };
                (lower, h[i], upper)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_nearest_level_from_table() {
        let levels = VerticalLevels::from_table(vec![0.5, 1.0, 2.0, 4.0], 0.5);
        assert_eq!(levels.nearest(-3.0), 0);
        assert_eq!(levels.nearest(1.4), 1);
        assert_eq!(levels.nearest(1.5), 1);
        assert_eq!(levels.nearest(3.1), 3);
        assert_eq!(levels.nearest(99.0), 3);
        assert_eq!(levels.range(3.9, 0.6), (0, 3));
    }

    #[test]
    fn test_resolve_falls_back_to_uniform() {
        let levels = VerticalLevels::resolve(&[1.0, 2.0], 0.0, 0.5, 3);
        assert_eq!(levels.heights(), &[0.0, 0.5, 1.0]);
        let levels = VerticalLevels::resolve(&[1.0, 2.0, 5.0], 0.0, 0.5, 3);
        assert_eq!(levels.heights(), &[1.0, 2.0, 5.0]);
    }

    #[test]
    fn test_boundaries_reflect_at_edges() {
        let levels = VerticalLevels::from_table(vec![1.0, 2.0, 4.0], 1.0);
        let b = levels.boundaries();
        assert_eq!(b.len(), 3);
        assert_approx_eq!(b[0].0, 0.5, 1e-12);
        assert_approx_eq!(b[0].2, 1.5, 1e-12);
        assert_approx_eq!(b[1].0, 1.5, 1e-12);
        assert_approx_eq!(b[1].2, 3.0, 1e-12);
        assert_approx_eq!(b[2].0, 3.0, 1e-12);
        assert_approx_eq!(b[2].1, 4.0, 1e-12);
        assert_approx_eq!(b[2].2, 5.0, 1e-12);
    }

    #[test]
    fn test_single_level_uses_nominal_spacing() {
        let levels = VerticalLevels::uniform(2.0, 0.5, 1);
        assert_eq!(levels.boundaries(), vec![(1.75, 2.0, 2.25)]);
    }

    #[test]
    fn test_empty_levels() {
        let levels = VerticalLevels::uniform(0.0, 1.0, 0);
        assert!(levels.is_empty());
        assert_eq!(levels.nearest(3.0), 0);
        assert!(levels.boundaries().is_empty());
    }
}

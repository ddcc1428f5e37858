//! Thinned copies of the exemplar for wide-tolerance lookups.
//!
//! Level `k` keeps one edge point per `2^k x 2^k` block. A lookup at
//! tolerance `t` cannot tell apart points closer than about `t / 2`, so the
//! searches count the coarsest level whose spacing stays within that.

use crate::kernel::ProjectedExemplar;

/// Fewest points a thinned level may keep.
pub const MIN_POINTS: usize = 32;

/// Exemplar point sets at doubling spacings.
#[derive(Clone, Debug)]
pub struct ExemplarPyramid {
    levels: Vec<ProjectedExemplar>,
}

impl ExemplarPyramid {
    /// Builds levels until thinning would drop below [`MIN_POINTS`].
    pub fn new(base: ProjectedExemplar) -> Self {
        let extent = base.width().max(base.height());
        let mut levels = vec![base];
        let mut spacing = 2usize;
        while spacing <= extent {
            let next = levels[0].thinned(spacing);
            if next.len() < MIN_POINTS || next.len() == levels[levels.len() - 1].len() {
                break;
            }
            levels.push(next);
            spacing *= 2;
        }
        Self { levels }
    }

    /// Full-resolution exemplar.
    pub fn base(&self) -> &ProjectedExemplar {
        &self.levels[0]
    }

    /// Number of levels, including the base.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Coarsest level usable at `tolerance`, with its point spacing.
    pub fn for_tolerance(&self, tolerance: u8) -> (&ProjectedExemplar, usize) {
        let limit = (tolerance as usize / 2).max(1);
        let mut level = 0usize;
        while level + 1 < self.levels.len() && (1usize << (level + 1)) <= limit {
            level += 1;
        }
        (&self.levels[level], 1usize << level)
    }
}

#[cfg(test)]
mod tests {
    use super::{ExemplarPyramid, MIN_POINTS};
    use crate::image::EdgeMap;
    use crate::kernel::ProjectedExemplar;

    fn outline(size: usize) -> EdgeMap {
        let mut points = Vec::new();
        for i in 0..size {
            points.extend([(i, 0), (i, size - 1), (0, i), (size - 1, i)]);
        }
        EdgeMap::from_points(size, size, points).unwrap()
    }

    #[test]
    fn levels_thin_out_and_respect_floor() {
        let base = ProjectedExemplar::new(&outline(100)).unwrap();
        let pyramid = ExemplarPyramid::new(base);
        assert!(pyramid.num_levels() > 1);
        assert_eq!(pyramid.base().len(), 396);
        let (coarse, spacing) = pyramid.for_tolerance(u8::MAX);
        assert!(coarse.len() >= MIN_POINTS);
        assert!(spacing > 1);
        assert!(coarse.len() < pyramid.base().len());
    }

    #[test]
    fn narrow_tolerance_uses_every_point() {
        let base = ProjectedExemplar::new(&outline(100)).unwrap();
        let pyramid = ExemplarPyramid::new(base);
        for tolerance in [0u8, 1, 2, 3] {
            let (level, spacing) = pyramid.for_tolerance(tolerance);
            assert_eq!(spacing, 1);
            assert_eq!(level.len(), 396);
        }
        assert_eq!(pyramid.for_tolerance(4).1, 2);
    }

    #[test]
    fn small_exemplar_keeps_only_the_base() {
        let base = ProjectedExemplar::new(&outline(6)).unwrap();
        let pyramid = ExemplarPyramid::new(base);
        assert_eq!(pyramid.num_levels(), 1);
        assert_eq!(pyramid.for_tolerance(40).1, 1);
    }
}

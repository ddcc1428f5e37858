//! Edge-counting primitive.
//!
//! Every exemplar edge point is pushed through one candidate pose and looked
//! up in the search map. The pose convention is fixed for the whole crate:
//!
//! ```text
//! q = origin + S·c + R(θ)·S·(p − c)
//! ```
//!
//! where `p` is the exemplar point, `c` the exemplar centre, `S = diag(sx, sy)`
//! and `R(θ) = [[cos θ, −sin θ], [sin θ, cos θ]]` in image coordinates
//! (x right, y down). Scaling happens first, rotation is about the scaled
//! centre, and `origin` is the top-left corner of the unrotated scaled box.
//!
//! A projected point counts as matched when its rounded position lies within
//! a Chebyshev distance `tolerance` of a search edge. Tolerance 1 is the
//! eight-neighbour rule; the searches widen it while a single sample stands
//! in for a whole region of poses.

mod pyramid;

pub use pyramid::{ExemplarPyramid, MIN_POINTS};

use crate::image::EdgeMap;
use crate::space::Transform;
use crate::util::math::{safe_ratio, sin_cos_deg};
use crate::util::{EdgeMatchError, EdgeMatchResult};

/// Largest tolerance the distance field resolves.
pub const MAX_TOLERANCE: u8 = u8::MAX - 1;

const FAR: u8 = u8::MAX;

/// Result of projecting the exemplar through one pose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeCount {
    /// Number of exemplar edge points projected.
    pub total: usize,
    /// Number of projected points that landed near a search edge.
    pub matched: usize,
}

impl EdgeCount {
    /// `matched / total`, or 0 when nothing was projected.
    pub fn ratio(&self) -> f32 {
        safe_ratio(self.matched, self.total)
    }
}

/// Distinct scene pixels touched by one pose.
///
/// Several exemplar points collapse onto one pixel when the pose shrinks the
/// exemplar, so `projected` falls with scale while `EdgeCount::total` does
/// not.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Support {
    /// Distinct rounded positions the exemplar was projected to.
    pub projected: usize,
    /// How many of those positions lie near a search edge.
    pub matched: usize,
}

/// Search map prepared for tolerance lookups.
///
/// Stores the Chebyshev distance from every pixel to its nearest search
/// edge, saturating at 255, plus the fraction of the map lying within each
/// distance. That fraction is the chance that a random point is matched.
pub struct SearchField {
    distance: Vec<u8>,
    width: usize,
    height: usize,
    coverage: Vec<f32>,
}

impl SearchField {
    /// Prepares a search map with a two-pass chessboard distance transform.
    pub fn new(search: &EdgeMap) -> Self {
        let width = search.width();
        let height = search.height();
        let mut distance: Vec<u8> = search
            .as_slice()
            .iter()
            .map(|&v| if v != 0 { 0 } else { FAR })
            .collect();

        for y in 0..height {
            for x in 0..width {
                let idx = y * width + x;
                let mut d = distance[idx];
                if d == 0 {
                    continue;
                }
                if x > 0 {
                    d = d.min(distance[idx - 1].saturating_add(1));
                }
                if y > 0 {
                    let up = idx - width;
                    d = d.min(distance[up].saturating_add(1));
                    if x > 0 {
                        d = d.min(distance[up - 1].saturating_add(1));
                    }
                    if x + 1 < width {
                        d = d.min(distance[up + 1].saturating_add(1));
                    }
                }
                distance[idx] = d;
            }
        }
        for y in (0..height).rev() {
            for x in (0..width).rev() {
                let idx = y * width + x;
                let mut d = distance[idx];
                if d == 0 {
                    continue;
                }
                if x + 1 < width {
                    d = d.min(distance[idx + 1].saturating_add(1));
                }
                if y + 1 < height {
                    let down = idx + width;
                    d = d.min(distance[down].saturating_add(1));
                    if x + 1 < width {
                        d = d.min(distance[down + 1].saturating_add(1));
                    }
                    if x > 0 {
                        d = d.min(distance[down - 1].saturating_add(1));
                    }
                }
                distance[idx] = d;
            }
        }

        let mut hist = [0usize; 256];
        for &d in &distance {
            hist[d as usize] += 1;
        }
        let pixels = distance.len();
        let mut seen = 0usize;
        let coverage = hist
            .iter()
            .map(|&count| {
                seen += count;
                safe_ratio(seen, pixels)
            })
            .collect();

        Self {
            distance,
            width,
            height,
            coverage,
        }
    }

    /// Width of the underlying search map.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the underlying search map.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance from `(x, y)` to the nearest search edge, saturating at 255.
    pub fn distance_at(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.distance[y * self.width + x])
    }

    /// Fraction of the map within `tolerance` of a search edge.
    pub fn chance(&self, tolerance: u8) -> f32 {
        self.coverage[tolerance as usize]
    }

    /// Widest tolerance, at least 1, whose chance stays at or below
    /// `max_chance`.
    pub fn widest_tolerance(&self, max_chance: f32) -> u8 {
        (1..=MAX_TOLERANCE)
            .take_while(|&t| self.chance(t) <= max_chance)
            .last()
            .unwrap_or(1)
    }

    #[inline]
    fn hit(&self, x: f32, y: f32, tolerance: u8) -> bool {
        let x = x.round();
        let y = y.round();
        if !(x >= 0.0 && y >= 0.0) {
            return false;
        }
        self.hit_cell(x as usize, y as usize, tolerance)
    }

    #[inline]
    fn hit_cell(&self, x: usize, y: usize, tolerance: u8) -> bool {
        x < self.width && y < self.height && self.distance[y * self.width + x] <= tolerance
    }
}

/// Exemplar edge points stored relative to the exemplar centre.
#[derive(Clone, Debug)]
pub struct ProjectedExemplar {
    offsets: Vec<(f32, f32)>,
    cx: f32,
    cy: f32,
    width: usize,
    height: usize,
    half_x: f32,
    half_y: f32,
}

impl ProjectedExemplar {
    /// Extracts centred edge offsets from an exemplar map.
    pub fn new(exemplar: &EdgeMap) -> EdgeMatchResult<Self> {
        if exemplar.edge_count() == 0 {
            return Err(EdgeMatchError::DegenerateExemplar {
                reason: "no edge pixels",
            });
        }
        let cx = (exemplar.width() as f32 - 1.0) * 0.5;
        let cy = (exemplar.height() as f32 - 1.0) * 0.5;
        let offsets = exemplar
            .edge_points()
            .map(|(x, y)| (x as f32 - cx, y as f32 - cy))
            .collect();
        Ok(Self::from_offsets(
            offsets,
            cx,
            cy,
            exemplar.width(),
            exemplar.height(),
        ))
    }

    fn from_offsets(
        offsets: Vec<(f32, f32)>,
        cx: f32,
        cy: f32,
        width: usize,
        height: usize,
    ) -> Self {
        let half_x = offsets.iter().fold(0.0f32, |m, &(dx, _)| m.max(dx.abs()));
        let half_y = offsets.iter().fold(0.0f32, |m, &(_, dy)| m.max(dy.abs()));
        Self {
            offsets,
            cx,
            cy,
            width,
            height,
            half_x,
            half_y,
        }
    }

    /// Number of exemplar edge points.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns true if there are no edge points.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Exemplar width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Exemplar height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Offset from the top-left origin to the exemplar centre at `(sx, sy)`.
    pub fn centre_offset(&self, sx: f32, sy: f32) -> (f32, f32) {
        (sx * self.cx, sy * self.cy)
    }

    /// Largest distance any edge point can move when the scale changes by
    /// `(dsx, dsy)` with the centre held fixed.
    pub fn scale_reach(&self, dsx: f32, dsy: f32) -> f32 {
        (dsx * self.half_x).hypot(dsy * self.half_y)
    }

    /// Largest distance of a scaled edge point from the exemplar centre.
    pub fn radius(&self, sx: f32, sy: f32) -> f32 {
        self.scale_reach(sx, sy)
    }

    /// Keeps the first edge point of every `spacing x spacing` block.
    ///
    /// Points are visited in row-major order, so the result is deterministic.
    pub fn thinned(&self, spacing: usize) -> ProjectedExemplar {
        let spacing = spacing.max(1);
        let blocks_x = self.width.div_ceil(spacing);
        let blocks_y = self.height.div_ceil(spacing);
        let mut taken = vec![false; blocks_x * blocks_y];
        let mut offsets = Vec::new();
        for &(dx, dy) in &self.offsets {
            let bx = (dx + self.cx).round() as usize / spacing;
            let by = (dy + self.cy).round() as usize / spacing;
            let slot = &mut taken[by * blocks_x + bx];
            if !*slot {
                *slot = true;
                offsets.push((dx, dy));
            }
        }
        Self::from_offsets(offsets, self.cx, self.cy, self.width, self.height)
    }

    /// Counts matched edges for `t` placed at `origin` with the
    /// eight-neighbour rule.
    pub fn count(&self, field: &SearchField, t: &Transform, origin: (f32, f32)) -> EdgeCount {
        let trig = sin_cos_deg(t.angle_deg as f32);
        self.count_with_trig(field, t.sx, t.sy, trig, origin)
    }

    /// Variant of [`count`](Self::count) taking precomputed `(sin, cos)`.
    pub fn count_with_trig(
        &self,
        field: &SearchField,
        sx: f32,
        sy: f32,
        trig: (f32, f32),
        origin: (f32, f32),
    ) -> EdgeCount {
        self.count_within(field, sx, sy, trig, origin, 1)
    }

    /// Counts points landing within `tolerance` of a search edge.
    pub fn count_within(
        &self,
        field: &SearchField,
        sx: f32,
        sy: f32,
        trig: (f32, f32),
        origin: (f32, f32),
        tolerance: u8,
    ) -> EdgeCount {
        let total = self.offsets.len();
        if sx <= 0.0 || sy <= 0.0 {
            return EdgeCount { total, matched: 0 };
        }
        let matched = self
            .project(sx, sy, trig, origin)
            .filter(|&(x, y)| field.hit(x, y, tolerance))
            .count();
        EdgeCount { total, matched }
    }

    /// Distinct projected pixels and how many of them are matched.
    pub fn support_within(
        &self,
        field: &SearchField,
        sx: f32,
        sy: f32,
        trig: (f32, f32),
        origin: (f32, f32),
        tolerance: u8,
    ) -> Support {
        if sx <= 0.0 || sy <= 0.0 {
            return Support::default();
        }
        let mut cells: Vec<(i64, i64)> = self
            .project(sx, sy, trig, origin)
            .map(|(x, y)| (x.round() as i64, y.round() as i64))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        let matched = cells
            .iter()
            .filter(|&&(x, y)| {
                x >= 0 && y >= 0 && field.hit_cell(x as usize, y as usize, tolerance)
            })
            .count();
        Support {
            projected: cells.len(),
            matched,
        }
    }

    fn project(
        &self,
        sx: f32,
        sy: f32,
        (sin, cos): (f32, f32),
        origin: (f32, f32),
    ) -> impl Iterator<Item = (f32, f32)> + '_ {
        let base_x = origin.0 + sx * self.cx;
        let base_y = origin.1 + sy * self.cy;
        self.offsets.iter().map(move |&(dx, dy)| {
            let ux = sx * dx;
            let uy = sy * dy;
            (base_x + cos * ux - sin * uy, base_y + sin * ux + cos * uy)
        })
    }

    /// Forward-projects the exemplar into a new `width x height` map.
    ///
    /// Useful for synthesising scenes with a known pose. Magnification leaves
    /// gaps between projected points.
    pub fn render(
        &self,
        t: &Transform,
        origin: (f32, f32),
        width: usize,
        height: usize,
    ) -> EdgeMatchResult<EdgeMap> {
        let mut out = EdgeMap::new(width, height)?;
        let trig = sin_cos_deg(t.angle_deg as f32);
        for (x, y) in self.project(t.sx, t.sy, trig, origin) {
            let x = x.round();
            let y = y.round();
            if x >= 0.0 && y >= 0.0 {
                out.set(x as usize, y as usize, true);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{ProjectedExemplar, SearchField};
    use crate::image::EdgeMap;
    use crate::space::Transform;

    fn outline(size: usize) -> EdgeMap {
        let mut points = Vec::new();
        for i in 0..size {
            points.extend([(i, 0), (i, size - 1), (0, i), (size - 1, i)]);
        }
        EdgeMap::from_points(size, size, points).unwrap()
    }

    #[test]
    fn identity_pose_matches_every_edge() {
        let map = outline(12);
        let exemplar = ProjectedExemplar::new(&map).unwrap();
        let field = SearchField::new(&map);
        let count = exemplar.count(&field, &Transform::IDENTITY, (0.0, 0.0));
        assert_eq!(count.total, map.edge_count());
        assert_eq!(count.matched, count.total);
        assert!((count.ratio() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn one_pixel_shift_is_tolerated_but_three_is_not() {
        let map = outline(12);
        let exemplar = ProjectedExemplar::new(&map).unwrap();
        let scene = EdgeMap::from_points(
            20,
            20,
            map.edge_points().map(|(x, y)| (x + 4, y + 4)),
        )
        .unwrap();
        let field = SearchField::new(&scene);
        let near = exemplar.count(&field, &Transform::IDENTITY, (3.0, 5.0));
        assert_eq!(near.matched, near.total);
        let far = exemplar.count(&field, &Transform::IDENTITY, (1.0, 1.0));
        assert!(far.ratio() < 0.5);

        let (sin, cos) = (0.0, 1.0);
        let wide = exemplar.count_within(&field, 1.0, 1.0, (sin, cos), (1.0, 1.0), 3);
        assert_eq!(wide.matched, wide.total);
    }

    #[test]
    fn distance_field_is_chessboard() {
        let scene = EdgeMap::from_points(9, 9, [(4, 4)]).unwrap();
        let field = SearchField::new(&scene);
        assert_eq!(field.distance_at(4, 4), Some(0));
        assert_eq!(field.distance_at(5, 5), Some(1));
        assert_eq!(field.distance_at(7, 2), Some(3));
        assert_eq!(field.distance_at(0, 0), Some(4));
        assert_eq!(field.distance_at(9, 0), None);
    }

    #[test]
    fn chance_grows_with_tolerance() {
        let scene = EdgeMap::from_points(9, 9, [(4, 4)]).unwrap();
        let field = SearchField::new(&scene);
        assert!((field.chance(0) - 1.0 / 81.0).abs() < 1e-6);
        assert!((field.chance(1) - 9.0 / 81.0).abs() < 1e-6);
        assert!((field.chance(4) - 1.0).abs() < 1e-6);
        assert_eq!(field.widest_tolerance(0.5), 2);
        assert_eq!(field.widest_tolerance(0.0), 1);

        let empty = SearchField::new(&EdgeMap::new(5, 5).unwrap());
        assert_eq!(empty.chance(10), 0.0);
    }

    #[test]
    fn shrunken_pose_touches_fewer_distinct_pixels() {
        let map = outline(40);
        let exemplar = ProjectedExemplar::new(&map).unwrap();
        let field = SearchField::new(&map);
        let trig = (0.0, 1.0);
        let full = exemplar.support_within(&field, 1.0, 1.0, trig, (0.0, 0.0), 1);
        assert_eq!(full.projected, map.edge_count());
        assert_eq!(full.matched, full.projected);

        let tiny = exemplar.support_within(&field, 0.1, 0.1, trig, (0.0, 0.0), 1);
        assert!(tiny.projected <= 20, "projected {}", tiny.projected);
        let tiny_count = exemplar.count_within(&field, 0.1, 0.1, trig, (0.0, 0.0), 1);
        assert_eq!(tiny_count.total, map.edge_count());
    }

    #[test]
    fn thinning_keeps_one_point_per_block() {
        let map = outline(16);
        let exemplar = ProjectedExemplar::new(&map).unwrap();
        let thin = exemplar.thinned(4);
        // Border blocks of a 4x4 block grid.
        assert_eq!(thin.len(), 12);
        assert_eq!(thin.width(), 16);
        assert_eq!(exemplar.thinned(1).len(), exemplar.len());
    }

    #[test]
    fn render_then_count_recovers_pose() {
        let map = outline(9);
        let exemplar = ProjectedExemplar::new(&map).unwrap();
        let t = Transform {
            sx: 1.0,
            sy: 1.0,
            angle_deg: 90,
        };
        let scene = exemplar.render(&t, (5.0, 6.0), 24, 24).unwrap();
        let field = SearchField::new(&scene);
        let count = exemplar.count(&field, &t, (5.0, 6.0));
        assert_eq!(count.matched, count.total);
    }

    #[test]
    fn edgeless_exemplar_is_rejected() {
        let map = EdgeMap::new(4, 4).unwrap();
        assert!(ProjectedExemplar::new(&map).is_err());
    }
}

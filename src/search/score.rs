//! Scoring poses at a matching tolerance.
//!
//! Raw hit ratios grow with the tolerance even for random placements, so
//! every score is corrected for the chance that a random point lands within
//! the tolerance of a scene edge: `(ratio − chance) / (1 − chance)`.

use crate::candidate::{Candidate, GridIndex};
use crate::search::region::Region;
use crate::search::SearchContext;

impl SearchContext<'_> {
    /// Region covering every scale cell (`x` = column, `y` = row).
    pub(crate) fn full_grid(&self) -> Region {
        let (rows, cols, _) = self.space.extents();
        Region::new(0, 0, cols, rows)
    }

    /// Scale cells within `radius` of `index`, clipped to the grid.
    pub(crate) fn scale_window(&self, index: GridIndex, radius: usize) -> Region {
        let (rows, cols, _) = self.space.extents();
        let x0 = index.col.saturating_sub(radius);
        let y0 = index.row.saturating_sub(radius);
        let x1 = index.col.saturating_add(radius + 1).min(cols);
        let y1 = index.row.saturating_add(radius + 1).min(rows);
        Region::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// Tolerance absorbing `slack` pixels of placement error, and whether the
    /// cap left it whole.
    pub(crate) fn tolerance_for(&self, slack: f32) -> (u8, bool) {
        let wanted = 1.0 + slack.max(0.0).ceil();
        if wanted <= self.max_tolerance as f32 {
            (wanted as u8, true)
        } else {
            (self.max_tolerance, false)
        }
    }

    /// Placement error hidden by a quadrant's centre cell: the largest scale
    /// change inside the quadrant plus half a pixel of origin rounding.
    pub(crate) fn scale_slack(&self, quad: Region) -> f32 {
        let (col, row) = quad.center();
        let step = self.space.config().scale_step;
        let dcols = (col - quad.x).max(quad.x + quad.w - 1 - col);
        let drows = (row - quad.y).max(quad.y + quad.h - 1 - row);
        self.pyramid
            .base()
            .scale_reach(dcols as f32 * step, drows as f32 * step)
            + 0.5
    }

    /// Geometric mean of the scaled exemplar box meets the minimum extent.
    pub(crate) fn large_enough(&self, sx: f32, sy: f32) -> bool {
        let base = self.pyramid.base();
        (sx * base.width() as f32 * sy * base.height() as f32).sqrt() >= self.min_extent
    }

    fn corrected(&self, ratio: f32, tolerance: u8) -> f32 {
        let chance = self.field.chance(tolerance);
        if chance >= 1.0 {
            return 0.0;
        }
        ((ratio - chance) / (1.0 - chance)).clamp(0.0, 1.0)
    }

    /// Integer origin that puts the exemplar centre at `centre`.
    pub(crate) fn origin_for(&self, centre: (f32, f32), sx: f32, sy: f32) -> (i64, i64) {
        let (ox, oy) = self.pyramid.base().centre_offset(sx, sy);
        ((centre.0 - ox).round() as i64, (centre.1 - oy).round() as i64)
    }

    /// Exemplar centre of a pose placed at `origin`.
    pub(crate) fn centre_of(&self, origin: (i64, i64), sx: f32, sy: f32) -> (f32, f32) {
        let (ox, oy) = self.pyramid.base().centre_offset(sx, sy);
        (origin.0 as f32 + ox, origin.1 as f32 + oy)
    }

    /// Scores grid entry `index` at `origin`; `None` below the minimum
    /// extent or outside the grid.
    pub(crate) fn score_at(
        &self,
        index: GridIndex,
        origin: (i64, i64),
        tolerance: u8,
    ) -> Option<Candidate> {
        let t = self.space.get(index.row, index.col, index.depth)?;
        if !self.large_enough(t.sx, t.sy) {
            return None;
        }
        let (exemplar, _) = self.pyramid.for_tolerance(tolerance);
        let count = exemplar.count_within(
            self.field,
            t.sx,
            t.sy,
            self.space.angles().sin_cos_at(index.depth),
            (origin.0 as f32, origin.1 as f32),
            tolerance,
        );
        Some(Candidate {
            score: self.corrected(count.ratio(), tolerance),
            transform: t,
            origin,
            index,
            tolerance,
            exact: 0.0,
        })
    }

    /// Share of all exemplar points landing exactly on a scene edge.
    pub(crate) fn exact_ratio(&self, cand: &Candidate) -> f32 {
        let t = cand.transform;
        self.pyramid
            .base()
            .count_within(
                self.field,
                t.sx,
                t.sy,
                self.space.angles().sin_cos_at(cand.index.depth),
                (cand.origin.0 as f32, cand.origin.1 as f32),
                0,
            )
            .ratio()
    }

    /// Scores the rotations of scale cell `(row, col)` with the exemplar
    /// centred at `centre` and keeps the best one.
    ///
    /// Wide tolerances skip rotations whose displacement the tolerance
    /// already absorbs. Ties keep the lowest depth, so symmetric shapes
    /// report the smallest angle.
    pub(crate) fn best_rotation(
        &self,
        row: usize,
        col: usize,
        centre: (f32, f32),
        tolerance: u8,
    ) -> Candidate {
        let Ok((sx, sy)) = self.space.scale_at(row, col) else {
            return Candidate::none();
        };
        if !self.large_enough(sx, sy) {
            return Candidate::none();
        }
        let origin = self.origin_for(centre, sx, sy);
        let depths = self.space.angles().len();
        let mut best = Candidate::none();
        for depth in (0..depths).step_by(self.depth_stride(sx, sy, tolerance)) {
            if let Some(cand) = self.score_at(GridIndex { row, col, depth }, origin, tolerance) {
                best = best.max(cand);
            }
        }
        best
    }

    fn depth_stride(&self, sx: f32, sy: f32, tolerance: u8) -> usize {
        let angles = self.space.angles();
        let per_depth = self.pyramid.base().radius(sx, sy) * (angles.step_deg() as f32).to_radians();
        if !(per_depth > 0.0) {
            return 1;
        }
        let stride = ((tolerance as f32 - 1.0) * 0.5 / per_depth).floor().max(1.0) as usize;
        stride.clamp(1, (angles.len() / 4).max(1))
    }

    /// Checks `cand` against the bound at `level`.
    ///
    /// The observed count is the number of distinct pixels the pose confirms
    /// minus those a random placement of the same footprint would confirm.
    pub(crate) fn passes_bound(&self, cand: &Candidate, level: usize) -> bool {
        let (exemplar, spacing) = self.pyramid.for_tolerance(cand.tolerance);
        let t = cand.transform;
        let support = exemplar.support_within(
            self.field,
            t.sx,
            t.sy,
            self.space.angles().sin_cos_at(cand.index.depth),
            (cand.origin.0 as f32, cand.origin.1 as f32),
            cand.tolerance,
        );
        let chance = self.field.chance(cand.tolerance);
        let observed = if chance >= 1.0 {
            0.0
        } else {
            ((support.matched as f32 - chance * support.projected as f32) / (1.0 - chance)).max(0.0)
        };
        self.bounds
            .accepts_support(observed, t.sx, t.sy, exemplar.len(), spacing, level)
    }

    /// Passes the bound and, with the window's slack added, could still beat
    /// `best`.
    pub(crate) fn should_descend(&self, cand: &Candidate, level: usize, best: f32) -> bool {
        cand.is_some()
            && cand.score + self.bounds.window(level) > best
            && self.passes_bound(cand, level)
    }
}

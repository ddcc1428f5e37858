//! Bound-checking policy used to prune both searches.
//!
//! A pose seen at a quadrant centre stands in for its whole quadrant. The
//! observed count is the number of distinct scene pixels the pose confirms,
//! corrected for the hits a random placement would collect. The expected
//! count is what a genuine instance at that scale can confirm: the exemplar
//! edge count times the scale factor, capped at the edge count, since a
//! shrunken exemplar collapses several points onto one pixel and an enlarged
//! one cannot touch more pixels than it has points.
//!
//! A branch survives when the observed count lies within
//! `expected · window(level)` of the expectation, with
//!
//! ```text
//! window(level) = FLOOR + SPAN · width · DECAY^level
//! ```
//!
//! The width factor sets how permissive the shallow levels are, and the
//! window narrows towards `FLOOR` with every subdivision.

/// Asymptotic relative half-width of the window.
pub const FLOOR: f32 = 0.35;
/// Multiplier turning the width factor into the level-0 excess over `FLOOR`.
pub const SPAN: f32 = 2.5;
/// Per-level shrink of the excess over `FLOOR`.
pub const DECAY: f32 = 0.7;
/// Largest width factor that keeps `window(0)` below 1.
pub const MAX_WIDTH: f32 = 0.25;

/// Pruning policy for one search call.
#[derive(Clone, Copy, Debug)]
pub struct BoundPolicy {
    exemplar_edges: usize,
    width: f32,
}

impl BoundPolicy {
    /// Creates a policy; `width` is clamped to `[0, MAX_WIDTH]`.
    pub fn new(exemplar_edges: usize, width: f32) -> Self {
        let width = if width.is_finite() {
            width.clamp(0.0, MAX_WIDTH)
        } else {
            0.0
        };
        Self {
            exemplar_edges,
            width,
        }
    }

    /// Width factor of this policy.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Relative half-width of the acceptance window at `level`.
    pub fn window(&self, level: usize) -> f32 {
        let level = i32::try_from(level).unwrap_or(i32::MAX);
        FLOOR + SPAN * self.width * DECAY.powi(level)
    }

    /// Distinct pixels a genuine instance at `(sx, sy)` confirms.
    pub fn expected_edges(&self, sx: f32, sy: f32) -> f32 {
        self.expected_support(sx, sy, self.exemplar_edges, 1)
    }

    /// Expectation for a point set of `points` thinned to one point per
    /// `spacing x spacing` block; such points stay distinct while
    /// `scale · spacing >= 1`.
    pub fn expected_support(&self, sx: f32, sy: f32, points: usize, spacing: usize) -> f32 {
        let factor = scale_factor(sx, sy) * spacing.max(1) as f32;
        points as f32 * factor.min(1.0)
    }

    /// Returns true if `observed` confirmed pixels at `(sx, sy)` keep the
    /// branch alive at `level`.
    pub fn accepts(&self, observed: f32, sx: f32, sy: f32, level: usize) -> bool {
        self.accepts_support(observed, sx, sy, self.exemplar_edges, 1, level)
    }

    /// [`accepts`](Self::accepts) for a thinned point set.
    pub fn accepts_support(
        &self,
        observed: f32,
        sx: f32,
        sy: f32,
        points: usize,
        spacing: usize,
        level: usize,
    ) -> bool {
        if !observed.is_finite() || self.exemplar_edges == 0 {
            return false;
        }
        let expected = self.expected_support(sx, sy, points, spacing);
        if !expected.is_finite() || expected <= 0.0 {
            return false;
        }
        (observed - expected).abs() <= expected * self.window(level)
    }
}

/// `sx` for uniform scaling, otherwise the Euclidean norm of `(sx, sy)`.
pub fn scale_factor(sx: f32, sy: f32) -> f32 {
    if (sx - sy).abs() <= f32::EPSILON * sx.abs().max(1.0) {
        sx
    } else {
        sx.hypot(sy)
    }
}

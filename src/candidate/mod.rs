//! Best-match bookkeeping for the recursive searches.
//!
//! The searches thread a `Candidate` through their return values instead of
//! sharing a mutable table; the caller always owns the winner. The coarse
//! searches hand a short, suppressed list of candidates to refinement.

pub(crate) mod nms;

use crate::space::Transform;
use std::cmp::Ordering;

/// Position of a transform in the `(row, col, depth)` grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct GridIndex {
    /// Row, walking `sy`.
    pub row: usize,
    /// Column, walking `sx`.
    pub col: usize,
    /// Depth, walking the rotation angle.
    pub depth: usize,
}

/// Best pose seen so far, with its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Matched-edge ratio above chance, in `[0, 1]`.
    pub score: f32,
    /// Winning transform.
    pub transform: Transform,
    /// Top-left of the scaled exemplar box in scene pixels.
    pub origin: (i64, i64),
    /// Grid position of `transform`.
    pub index: GridIndex,
    /// Matching tolerance the score was measured at.
    pub tolerance: u8,
    /// Share of points landing exactly on an edge; only set by the last
    /// refinement stage, where it breaks score ties.
    pub exact: f32,
}

impl Candidate {
    /// Placeholder that any evaluated pose improves on.
    pub(crate) fn none() -> Self {
        Self {
            score: f32::NEG_INFINITY,
            transform: Transform::IDENTITY,
            origin: (0, 0),
            index: GridIndex::default(),
            tolerance: u8::MAX,
            exact: 0.0,
        }
    }

    /// True once a real pose has been recorded.
    pub fn is_some(&self) -> bool {
        self.score.is_finite()
    }

    /// Keeps the better of `self` and `other`; ties keep `self`.
    pub(crate) fn max(self, other: Candidate) -> Candidate {
        if cmp_quality(&other, &self) == Ordering::Greater {
            other
        } else {
            self
        }
    }
}

/// Higher score, then more exact hits, then the tighter tolerance.
pub(crate) fn cmp_quality(a: &Candidate, b: &Candidate) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.exact.total_cmp(&b.exact))
        .then_with(|| b.tolerance.cmp(&a.tolerance))
}

#[cfg(test)]
mod tests {
    use super::Candidate;

    fn at(score: f32, x: i64) -> Candidate {
        Candidate {
            score,
            origin: (x, 0),
            tolerance: 1,
            ..Candidate::none()
        }
    }

    #[test]
    fn max_prefers_higher_score_and_keeps_first_on_tie() {
        let a = at(0.5, 1);
        let b = at(0.5, 2);
        assert_eq!(a.max(b).origin, (1, 0));
        assert_eq!(a.max(at(0.6, 3)).origin, (3, 0));
        assert!(Candidate::none().max(a).is_some());
        assert!(!Candidate::none().is_some());
    }

    #[test]
    fn ties_prefer_exact_hits_then_tighter_tolerance() {
        let loose = Candidate {
            tolerance: 9,
            ..at(0.8, 1)
        };
        let tight = at(0.8, 2);
        assert_eq!(loose.max(tight).origin, (2, 0));
        let exact = Candidate {
            exact: 0.9,
            tolerance: 9,
            ..at(0.8, 3)
        };
        assert_eq!(tight.max(exact).origin, (3, 0));
    }
}

//! Ordering and suppression of coarse candidates before refinement.

use crate::candidate::{cmp_quality, Candidate};
use std::cmp::Ordering;

/// Best first; equal candidates fall back to position and grid index so the
/// order never depends on how the list was produced.
fn cmp_desc(a: &Candidate, b: &Candidate) -> Ordering {
    cmp_quality(b, a)
        .then_with(|| a.origin.1.cmp(&b.origin.1))
        .then_with(|| a.origin.0.cmp(&b.origin.0))
        .then_with(|| a.index.cmp(&b.index))
}

/// Keeps candidates farther than `radius` (Chebyshev, on origins) from every
/// better kept candidate.
pub(crate) fn suppress(candidates: &mut [Candidate], radius: usize) -> Vec<Candidate> {
    candidates.sort_by(cmp_desc);
    let radius = i64::try_from(radius).unwrap_or(i64::MAX);
    let mut kept: Vec<Candidate> = Vec::new();
    'outer: for cand in candidates.iter().copied() {
        for other in &kept {
            let dx = (cand.origin.0 - other.origin.0).abs();
            let dy = (cand.origin.1 - other.origin.1).abs();
            if dx.max(dy) <= radius {
                continue 'outer;
            }
        }
        kept.push(cand);
    }
    kept
}

/// The `width` best evaluated candidates after suppression.
pub(crate) fn select_beam(mut candidates: Vec<Candidate>, width: usize, radius: usize) -> Vec<Candidate> {
    candidates.retain(Candidate::is_some);
    let mut beam = suppress(&mut candidates, radius);
    beam.truncate(width);
    beam
}

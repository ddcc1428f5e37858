//! Coarse-to-fine refinement of beam candidates.
//!
//! A coarse candidate was scored at a tolerance wide enough to hide its
//! placement error. Each stage halves the tolerance and searches the
//! neighbourhood that error spans: first translation around the current
//! origin, then the scale and rotation cells around the current grid index
//! with the exemplar centre held fixed. The stages end at tolerance 1, where
//! the exact-hit ratio is recorded to break score ties.

use crate::candidate::{Candidate, GridIndex};
use crate::search::SearchContext;
use crate::trace::trace_debug;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Alternations of translation and transform steps per stage.
const MAX_ROUNDS: usize = 4;
const MAX_SCALE_RADIUS: usize = 4;
const MAX_DEPTH_RADIUS: usize = 6;

/// Refines every beam candidate and keeps the best; ties keep beam order.
pub(crate) fn refine_beam(ctx: &SearchContext<'_>, beam: &[Candidate], parallel: bool) -> Candidate {
    let refined: Vec<Candidate> = if parallel {
        refine_parallel(ctx, beam)
    } else {
        beam.iter().map(|&c| refine(ctx, c)).collect()
    };
    refined
        .into_iter()
        .fold(Candidate::none(), |best, c| best.max(c))
}

#[cfg(feature = "rayon")]
fn refine_parallel(ctx: &SearchContext<'_>, beam: &[Candidate]) -> Vec<Candidate> {
    beam.par_iter().map(|&c| refine(ctx, c)).collect()
}

#[cfg(not(feature = "rayon"))]
fn refine_parallel(ctx: &SearchContext<'_>, beam: &[Candidate]) -> Vec<Candidate> {
    beam.iter().map(|&c| refine(ctx, c)).collect()
}

/// Walks `start` down to tolerance 1.
pub(crate) fn refine(ctx: &SearchContext<'_>, start: Candidate) -> Candidate {
    if !start.is_some() {
        return start;
    }
    let mut current = start;
    let mut previous = start.tolerance.clamp(1, ctx.max_tolerance.max(1));
    loop {
        let tolerance = (previous / 2).max(1);
        let Some(rescored) = evaluate(ctx, current.index, current.origin, tolerance) else {
            return current;
        };
        current = rescored;
        for _ in 0..MAX_ROUNDS {
            let moved = best_origin(ctx, current, previous, tolerance);
            let next = best_transform(ctx, moved, previous, tolerance);
            if next.origin == current.origin && next.index == current.index {
                break;
            }
            current = next;
        }
        trace_debug!(
            "refine_stage",
            tolerance = tolerance,
            score = current.score,
            x = current.origin.0,
            y = current.origin.1
        );
        if tolerance == 1 {
            return current;
        }
        previous = tolerance;
    }
}

fn evaluate(
    ctx: &SearchContext<'_>,
    index: GridIndex,
    origin: (i64, i64),
    tolerance: u8,
) -> Option<Candidate> {
    let mut cand = ctx.score_at(index, origin, tolerance)?;
    if tolerance == 1 {
        cand.exact = ctx.exact_ratio(&cand);
    }
    Some(cand)
}

/// Best origin within `radius` pixels of `current`, sampled every
/// `tolerance / 2` pixels.
fn best_origin(ctx: &SearchContext<'_>, current: Candidate, radius: u8, tolerance: u8) -> Candidate {
    let step = usize::from((tolerance / 2).max(1));
    let reach = i64::from(radius);
    let mut best = current;
    for dy in (-reach..=reach).step_by(step) {
        for dx in (-reach..=reach).step_by(step) {
            if dx == 0 && dy == 0 {
                continue;
            }
            let origin = (current.origin.0 + dx, current.origin.1 + dy);
            if let Some(cand) = evaluate(ctx, current.index, origin, tolerance) {
                best = best.max(cand);
            }
        }
    }
    best
}

/// Best scale and rotation cell near `current` whose displacement stays
/// within `radius` pixels, keeping the exemplar centre in place.
fn best_transform(ctx: &SearchContext<'_>, current: Candidate, radius: u8, tolerance: u8) -> Candidate {
    let base = ctx.pyramid.base();
    let angles = ctx.space.angles();
    let depths = angles.len();
    let t = current.transform;
    let centre = ctx.centre_of(current.origin, t.sx, t.sy);

    let step = ctx.space.config().scale_step;
    let scale_radius = cells_within(radius, base.scale_reach(step, step)).min(MAX_SCALE_RADIUS);
    let per_depth = base.radius(t.sx, t.sy) * (angles.step_deg() as f32).to_radians();
    let depth_radius = cells_within(radius, per_depth)
        .min(MAX_DEPTH_RADIUS)
        .min(depths / 2);
    let wraps = angles.max_deg() == 360 && depths as u64 * u64::from(angles.step_deg()) == 360;

    let window = ctx.scale_window(current.index, scale_radius);
    let mut best = current;
    for row in window.y..window.y + window.h {
        for col in window.x..window.x + window.w {
            let Ok((sx, sy)) = ctx.space.scale_at(row, col) else {
                continue;
            };
            let origin = ctx.origin_for(centre, sx, sy);
            for depth in depth_neighbours(current.index.depth, depth_radius, depths, wraps) {
                let index = GridIndex { row, col, depth };
                if index == current.index && origin == current.origin {
                    continue;
                }
                if let Some(cand) = evaluate(ctx, index, origin, tolerance) {
                    best = best.max(cand);
                }
            }
        }
    }
    best
}

/// Grid cells a displacement of `radius` pixels spans at `per_cell` pixels
/// per cell; at least one.
fn cells_within(radius: u8, per_cell: f32) -> usize {
    if !(per_cell > 0.0) {
        return 1;
    }
    ((f32::from(radius) / per_cell).ceil() as usize).max(1)
}

/// Depths within `radius` of `depth`, nearest-negative first.
fn depth_neighbours(depth: usize, radius: usize, depths: usize, wraps: bool) -> Vec<usize> {
    let mut out = Vec::with_capacity(2 * radius + 1);
    let (depth, radius, len) = (depth as i64, radius as i64, depths as i64);
    for offset in -radius..=radius {
        let d = depth + offset;
        let d = if wraps {
            d.rem_euclid(len)
        } else if (0..len).contains(&d) {
            d
        } else {
            continue;
        };
        let d = d as usize;
        if !out.contains(&d) {
            out.push(d);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{cells_within, depth_neighbours};

    #[test]
    fn depth_neighbours_wrap_on_a_full_circle() {
        assert_eq!(depth_neighbours(0, 2, 72, true), vec![70, 71, 0, 1, 2]);
        assert_eq!(depth_neighbours(0, 2, 72, false), vec![0, 1, 2]);
        assert_eq!(depth_neighbours(1, 3, 3, true), vec![1, 2, 0]);
    }

    #[test]
    fn cells_within_rounds_up_and_keeps_one() {
        assert_eq!(cells_within(6, 2.5), 3);
        assert_eq!(cells_within(1, 10.0), 1);
        assert_eq!(cells_within(4, 0.0), 1);
    }
}

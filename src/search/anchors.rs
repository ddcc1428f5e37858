//! Coarse anchor sweep, used for edge-sparse scenes.
//!
//! The scene is tiled by `stride x stride` cells and every cell centre is an
//! anchor for the exemplar centre. Each anchor runs an independent scale
//! search whose tolerance covers any placement inside its cell, so the
//! sweep parallelises cleanly. Results come back in lattice order, which
//! makes the parallel and sequential sweeps return the same candidates.

use crate::candidate::Candidate;
use crate::search::transform::search_transforms;
use crate::search::SearchContext;
use crate::trace::trace_span;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Cell centres of the anchor lattice, row by row.
pub(crate) fn anchor_lattice(width: usize, height: usize, stride: usize) -> Vec<(f32, f32)> {
    let stride = stride.max(1);
    let offset = (stride as f32 - 1.0) * 0.5;
    let mut anchors = Vec::new();
    for y in (0..height).step_by(stride) {
        for x in (0..width).step_by(stride) {
            anchors.push((x as f32 + offset, y as f32 + offset));
        }
    }
    anchors
}

fn search_anchor(ctx: &SearchContext<'_>, centre: (f32, f32), slack: f32) -> Candidate {
    search_transforms(ctx, centre, slack, ctx.full_grid(), Candidate::none(), 0)
}

/// Best pose of every anchor, in lattice order.
pub(crate) fn sweep_anchors(ctx: &SearchContext<'_>, stride: usize, parallel: bool) -> Vec<Candidate> {
    let anchors = anchor_lattice(ctx.field.width(), ctx.field.height(), stride);
    // Farthest pixel of a cell from its centre.
    let slack = stride.max(1) as f32 * 0.5;
    let _span = trace_span!("anchor_sweep", anchors = anchors.len(), parallel = parallel).entered();

    if parallel {
        sweep_parallel(ctx, &anchors, slack)
    } else {
        anchors.iter().map(|&a| search_anchor(ctx, a, slack)).collect()
    }
}

#[cfg(feature = "rayon")]
fn sweep_parallel(ctx: &SearchContext<'_>, anchors: &[(f32, f32)], slack: f32) -> Vec<Candidate> {
    anchors
        .par_iter()
        .map(|&a| search_anchor(ctx, a, slack))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn sweep_parallel(ctx: &SearchContext<'_>, anchors: &[(f32, f32)], slack: f32) -> Vec<Candidate> {
    anchors.iter().map(|&a| search_anchor(ctx, a, slack)).collect()
}

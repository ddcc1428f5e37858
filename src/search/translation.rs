//! Divide-and-conquer over translation, used for edge-dense scenes.
//!
//! The scene is bisected into quadrants and the centre of each quadrant
//! stands in for every placement inside it: the scale search there runs at
//! a tolerance wide enough to reach the quadrant's corners. The root scans
//! the whole scale grid; below it, a quadrant only scans the scale cells
//! around its parent's winner, since a quadrant's winner moves in scale by
//! little more than its parent's tolerance allows. Every node's winner is
//! kept for refinement.

use crate::candidate::Candidate;
use crate::search::region::Region;
use crate::search::transform::search_transforms;
use crate::search::SearchContext;
use crate::trace::trace_debug;

/// Scale cells scanned around a parent's winner.
const LOCAL_SCALE_RADIUS: usize = 2;

/// Winners of every translation node the search visited.
pub(crate) fn search_translation(ctx: &SearchContext<'_>, whole: Region) -> Vec<Candidate> {
    let mut found = Vec::new();
    if whole.is_empty() {
        return found;
    }
    let root = scan_centre(ctx, whole, ctx.full_grid());
    if root.is_some() {
        found.push(root);
    }
    descend(ctx, whole, root, root, 0, &mut found);
    found
}

fn scan_centre(ctx: &SearchContext<'_>, region: Region, scales: Region) -> Candidate {
    let (x, y) = region.center();
    let slack = region.w.max(region.h) as f32 * 0.5;
    search_transforms(
        ctx,
        (x as f32, y as f32),
        slack,
        scales,
        Candidate::none(),
        0,
    )
}

fn descend(
    ctx: &SearchContext<'_>,
    region: Region,
    parent: Candidate,
    best: Candidate,
    level: usize,
    found: &mut Vec<Candidate>,
) -> Candidate {
    if level >= ctx.max_depth || region.is_unit() {
        return best;
    }
    let scales = if parent.is_some() {
        ctx.scale_window(parent.index, LOCAL_SCALE_RADIUS)
    } else {
        ctx.full_grid()
    };

    let mut best = best;
    let mut scored = Vec::with_capacity(4);
    for quad in region.quadrants() {
        let local = scan_centre(ctx, quad, scales);
        if local.is_some() {
            found.push(local);
        }
        best = best.max(local);
        scored.push((quad, local));
    }

    for (quad, local) in scored {
        if quad.is_unit() {
            continue;
        }
        if ctx.should_descend(&local, level, best.score) {
            trace_debug!(
                "translation_descend",
                level = level,
                x = quad.x,
                y = quad.y,
                tolerance = local.tolerance,
                score = local.score
            );
            best = descend(ctx, quad, local, best, level + 1, found);
        }
    }
    best
}

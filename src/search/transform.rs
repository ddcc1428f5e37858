//! Divide-and-conquer over the scale grid around a fixed exemplar centre.
//!
//! Each call splits a rectangle of scale cells into quadrants and scores the
//! centre cell of every quadrant at its best rotation. The tolerance of that
//! score covers the placement error the caller hands down plus the error the
//! centre cell hides for the rest of its quadrant. Quadrants recurse when the
//! tolerance had to be capped, or when their centre passes the bound check.

use crate::candidate::Candidate;
use crate::search::region::Region;
use crate::search::SearchContext;
use crate::trace::trace_debug;

/// Searches the scale cells in `region` with the exemplar centred at
/// `centre`; `slack` is the placement error in pixels the caller tolerates.
///
/// Returns the better of `best` and everything found below this call.
pub(crate) fn search_transforms(
    ctx: &SearchContext<'_>,
    centre: (f32, f32),
    slack: f32,
    region: Region,
    best: Candidate,
    level: usize,
) -> Candidate {
    if level > ctx.max_depth || region.is_empty() {
        return best;
    }

    let mut best = best;
    let mut scored = Vec::with_capacity(4);
    for quad in region.quadrants() {
        let (col, row) = quad.center();
        let (tolerance, covered) = ctx.tolerance_for(slack + ctx.scale_slack(quad));
        let cell = ctx.best_rotation(row, col, centre, tolerance);
        best = best.max(cell);
        scored.push((quad, cell, covered));
    }

    for (quad, cell, covered) in scored {
        if quad.is_unit() {
            continue;
        }
        // A capped tolerance or a centre below the minimum extent says
        // nothing about the rest of the quadrant.
        if !covered || !cell.is_some() || ctx.should_descend(&cell, level, best.score) {
            trace_debug!(
                "scale_descend",
                level = level,
                row = quad.y,
                col = quad.x,
                covered = covered,
                score = cell.score
            );
            best = search_transforms(ctx, centre, slack, quad, best, level + 1);
        }
    }
    best
}

//! Building blocks for custom search pipelines.
//!
//! Most users only need [`Matcher`](crate::Matcher); these types expose the
//! edge-counting primitives, the rotation axis and the pruning policy.

pub use crate::kernel::{
    EdgeCount, ExemplarPyramid, ProjectedExemplar, SearchField, Support, MAX_TOLERANCE,
};
pub use crate::search::bounds::{scale_factor, BoundPolicy};
pub use crate::space::AngleGrid;

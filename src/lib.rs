//! EdgeMatch locates a scaled and rotated exemplar shape in a binary edge map.
//!
//! The exemplar's candidate transforms are discretised once into a
//! [`TransformSpace`]; a [`Matcher`] then runs a divide-and-conquer search
//! over translation and over that space, pruned by expected edge-count
//! bounds, refines the best candidates coarse-to-fine, and reports whether
//! the exemplar is present and at what pose.
//! Parallel anchor sweeps are available behind the `rayon` feature, and
//! image loading, edge extraction and overlays behind `image-io`.

mod candidate;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod search;
pub mod space;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use crate::image::io;

pub use candidate::{Candidate, GridIndex};
pub use crate::image::{CropRect, EdgeMap, EdgeStats};
pub use search::{Match, MatchConfig, Matcher, Pose, SearchStats, Strategy, StrategyMode};
pub use space::{dimension_size, SpaceConfig, Transform, TransformSpace};
pub use util::{EdgeMatchError, EdgeMatchResult};

//! Hierarchical matcher: decides whether the exemplar appears in a scene.
//!
//! A `Matcher` owns the exemplar edge map, its statistics and a shared,
//! read-only `TransformSpace`. Each call to [`Matcher::match_edges`] picks a
//! strategy from the scene's edge density:
//!
//! - dense scenes run a divide-and-conquer over translation, with a scale
//!   search at every quadrant centre;
//! - sparse scenes sweep a coarse anchor lattice and run the scale search at
//!   every anchor.
//!
//! Both coarse searches score at a tolerance that covers the placement error
//! of their sampling and prune with the same [`BoundPolicy`]. The best few
//! distinct candidates then go through coarse-to-fine refinement down to the
//! eight-neighbour rule. The winning pose is returned by value and no state
//! survives between calls.

pub(crate) mod anchors;
pub mod bounds;
pub(crate) mod refine;
pub(crate) mod region;
pub(crate) mod score;
pub(crate) mod transform;
pub(crate) mod translation;

pub use bounds::BoundPolicy;

use crate::candidate::nms;
use crate::image::{EdgeMap, EdgeStats};
use crate::kernel::{ExemplarPyramid, ProjectedExemplar, SearchField};
use crate::space::{SpaceConfig, Transform, TransformSpace};
use crate::trace::{trace_event, trace_span};
use crate::util::{EdgeMatchError, EdgeMatchResult};
use region::Region;
use std::sync::Arc;

/// How the matcher chooses its outer search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyMode {
    /// Pick from the scene's edge density.
    Auto,
    /// Always run the translation divide-and-conquer.
    TranslationFirst,
    /// Always run the anchor sweep with a scale search per anchor.
    ScaleFirst,
}

/// Outer search actually used for a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    TranslationFirst,
    ScaleFirst,
}

/// Matcher configuration.
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// A match is declared when the best score exceeds this value.
    pub accept_threshold: f32,
    /// Scenes with edge density above this are treated as dense.
    pub dense_edge_ratio: f32,
    /// Bound width factor for dense scenes, within `[0, 0.25]`.
    pub dense_bound_width: f32,
    /// Bound width factor for sparse scenes, within `[0, 0.25]`.
    pub sparse_bound_width: f32,
    /// Spacing in pixels of the anchor lattice for sparse scenes.
    pub anchor_stride: usize,
    /// Distinct coarse candidates carried into refinement.
    pub beam_width: usize,
    /// Smallest geometric-mean side, in pixels, of a pose worth scoring.
    /// Capped at the scene's own geometric-mean side.
    pub min_extent: f32,
    /// Widest coarse tolerance, as the largest share of scene pixels it may
    /// put within reach of an edge.
    pub max_chance: f32,
    /// Recursion limit for both searches.
    pub max_depth: usize,
    /// Outer search selection.
    pub strategy: StrategyMode,
    /// Sweep anchors in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.70,
            dense_edge_ratio: 0.06,
            dense_bound_width: 0.20,
            sparse_bound_width: 0.15,
            anchor_stride: 8,
            beam_width: 8,
            min_extent: 24.0,
            max_chance: 0.75,
            max_depth: 32,
            strategy: StrategyMode::Auto,
            parallel: false,
        }
    }
}

impl MatchConfig {
    fn validate(&self) -> EdgeMatchResult<()> {
        if !self.accept_threshold.is_finite() || !(0.0..=1.0).contains(&self.accept_threshold) {
            return Err(EdgeMatchError::InvalidConfig {
                reason: "accept_threshold must be within [0, 1]",
            });
        }
        if !self.dense_edge_ratio.is_finite() || self.dense_edge_ratio < 0.0 {
            return Err(EdgeMatchError::InvalidConfig {
                reason: "dense_edge_ratio must be finite and >= 0",
            });
        }
        for width in [self.dense_bound_width, self.sparse_bound_width] {
            if !width.is_finite() || !(0.0..=bounds::MAX_WIDTH).contains(&width) {
                return Err(EdgeMatchError::InvalidConfig {
                    reason: "bound widths must be within [0, 0.25]",
                });
            }
        }
        if self.anchor_stride == 0 {
            return Err(EdgeMatchError::InvalidConfig {
                reason: "anchor_stride must be > 0",
            });
        }
        if self.beam_width == 0 {
            return Err(EdgeMatchError::InvalidConfig {
                reason: "beam_width must be > 0",
            });
        }
        if !self.min_extent.is_finite() || self.min_extent < 0.0 {
            return Err(EdgeMatchError::InvalidConfig {
                reason: "min_extent must be finite and >= 0",
            });
        }
        if !(self.max_chance > 0.0 && self.max_chance < 1.0) {
            return Err(EdgeMatchError::InvalidConfig {
                reason: "max_chance must be within (0, 1)",
            });
        }
        Ok(())
    }
}

/// Winning placement of the exemplar in the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Column of the top-left corner of the scaled exemplar box.
    pub x: i64,
    /// Row of the top-left corner of the scaled exemplar box.
    pub y: i64,
    /// Scale and rotation.
    pub transform: Transform,
    /// Width of the scaled exemplar box in pixels.
    pub width: f32,
    /// Height of the scaled exemplar box in pixels.
    pub height: f32,
}

/// Statistics gathered for one match call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchStats {
    /// Exemplar edge and pixel counts.
    pub exemplar: EdgeStats,
    /// Scene edge and pixel counts.
    pub search: EdgeStats,
    /// Scene edge density.
    pub edge_ratio: f32,
    /// True when the scene counted as edge-dense.
    pub dense: bool,
    /// Outer search used, `None` when the scene had no edges.
    pub strategy: Option<Strategy>,
    /// Widest tolerance the coarse search scored at.
    pub max_tolerance: u8,
    /// Coarse candidates carried into refinement.
    pub refined: usize,
}

/// Outcome of a match call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    /// Whether the score exceeded the acceptance threshold.
    pub matched: bool,
    /// Best matched-edge ratio above chance, in `[0, 1]`.
    pub score: f32,
    /// Best pose, if any pose was evaluated.
    pub pose: Option<Pose>,
    /// Statistics for the call.
    pub stats: SearchStats,
}

impl Match {
    /// Bounding rectangle `(x, y, width, height)` of the winning pose, in
    /// scene pixels, for drawing an overlay.
    pub fn overlay_rect(&self) -> Option<(i64, i64, u32, u32)> {
        self.pose.map(|pose| {
            (
                pose.x,
                pose.y,
                pose.width.round().max(1.0) as u32,
                pose.height.round().max(1.0) as u32,
            )
        })
    }
}

/// Borrowed state shared by the recursive searches.
pub(crate) struct SearchContext<'a> {
    pub(crate) pyramid: &'a ExemplarPyramid,
    pub(crate) space: &'a TransformSpace,
    pub(crate) field: &'a SearchField,
    pub(crate) bounds: BoundPolicy,
    pub(crate) max_depth: usize,
    /// Cap on coarse tolerances.
    pub(crate) max_tolerance: u8,
    /// Effective minimum pose extent.
    pub(crate) min_extent: f32,
}

/// Exemplar matcher with a hierarchical pose search.
pub struct Matcher {
    exemplar: EdgeMap,
    pyramid: ExemplarPyramid,
    stats: EdgeStats,
    space: Option<Arc<TransformSpace>>,
    cfg: MatchConfig,
}

impl Matcher {
    /// Creates a matcher for an exemplar edge map.
    ///
    /// The transformation space is not built here; call
    /// [`build_space`](Self::build_space) or [`with_space`](Self::with_space)
    /// before matching.
    pub fn new(exemplar: EdgeMap) -> EdgeMatchResult<Self> {
        let pyramid = ExemplarPyramid::new(ProjectedExemplar::new(&exemplar)?);
        let stats = exemplar.stats();
        Ok(Self {
            exemplar,
            pyramid,
            stats,
            space: None,
            cfg: MatchConfig::default(),
        })
    }

    /// Overrides the match configuration.
    pub fn with_config(mut self, cfg: MatchConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Uses an already built, possibly shared, transformation space.
    pub fn with_space(mut self, space: Arc<TransformSpace>) -> Self {
        self.space = Some(space);
        self
    }

    /// Builds the transformation space for this exemplar.
    pub fn build_space(&mut self, cfg: SpaceConfig) -> EdgeMatchResult<()> {
        let space = TransformSpace::build(self.exemplar.width(), self.exemplar.height(), cfg)?;
        self.space = Some(Arc::new(space));
        Ok(())
    }

    /// Returns the transformation space, if built.
    pub fn space(&self) -> Option<&Arc<TransformSpace>> {
        self.space.as_ref()
    }

    /// Returns the exemplar edge map.
    pub fn exemplar(&self) -> &EdgeMap {
        &self.exemplar
    }

    /// Returns exemplar edge and pixel counts.
    pub fn exemplar_stats(&self) -> EdgeStats {
        self.stats
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Searches `search` for the exemplar.
    pub fn match_edges(&self, search: &EdgeMap) -> EdgeMatchResult<Match> {
        self.cfg.validate()?;
        let space = self
            .space
            .as_deref()
            .ok_or(EdgeMatchError::InvalidConfig {
                reason: "transformation space not built",
            })?;

        let search_stats = search.stats();
        let edge_ratio = search_stats.ratio();
        let dense = edge_ratio > self.cfg.dense_edge_ratio;
        let _span = trace_span!(
            "match",
            width = search.width(),
            height = search.height(),
            edges = search_stats.edges
        )
        .entered();

        if search_stats.edges == 0 {
            let stats = SearchStats {
                exemplar: self.stats,
                search: search_stats,
                edge_ratio,
                dense,
                strategy: None,
                max_tolerance: 0,
                refined: 0,
            };
            trace_event!("match_decision", score = 0.0f32, matched = false);
            return Ok(Match {
                matched: false,
                score: 0.0,
                pose: None,
                stats,
            });
        }

        let strategy = match self.cfg.strategy {
            StrategyMode::TranslationFirst => Strategy::TranslationFirst,
            StrategyMode::ScaleFirst => Strategy::ScaleFirst,
            StrategyMode::Auto if dense => Strategy::TranslationFirst,
            StrategyMode::Auto => Strategy::ScaleFirst,
        };
        trace_event!(
            "search_stats",
            edges = search_stats.edges,
            pixels = search_stats.pixels,
            edge_ratio = edge_ratio,
            dense = dense,
            translation_first = strategy == Strategy::TranslationFirst
        );

        let width = if dense {
            self.cfg.dense_bound_width
        } else {
            self.cfg.sparse_bound_width
        };
        let field = SearchField::new(search);
        let scene_extent = ((search.width() * search.height()) as f32).sqrt();
        let ctx = SearchContext {
            pyramid: &self.pyramid,
            space,
            field: &field,
            bounds: BoundPolicy::new(self.stats.edges, width),
            max_depth: self.cfg.max_depth,
            max_tolerance: field.widest_tolerance(self.cfg.max_chance),
            min_extent: self.cfg.min_extent.min(scene_extent),
        };

        let coarse = match strategy {
            Strategy::TranslationFirst => {
                let _span = trace_span!("translation_search").entered();
                let whole = Region::new(0, 0, search.width(), search.height());
                translation::search_translation(&ctx, whole)
            }
            Strategy::ScaleFirst => {
                anchors::sweep_anchors(&ctx, self.cfg.anchor_stride, self.cfg.parallel)
            }
        };
        let beam = nms::select_beam(coarse, self.cfg.beam_width, self.cfg.anchor_stride);
        let best = {
            let _span = trace_span!("refine", beam = beam.len(), tolerance = ctx.max_tolerance)
                .entered();
            refine::refine_beam(&ctx, &beam, self.cfg.parallel)
        };

        let score = if best.is_some() {
            best.score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let matched = score > self.cfg.accept_threshold;
        let pose = best.is_some().then(|| Pose {
            x: best.origin.0,
            y: best.origin.1,
            transform: best.transform,
            width: self.exemplar.width() as f32 * best.transform.sx,
            height: self.exemplar.height() as f32 * best.transform.sy,
        });
        trace_event!(
            "match_decision",
            score = score,
            matched = matched,
            exemplar_edges = self.stats.edges
        );

        Ok(Match {
            matched,
            score,
            pose,
            stats: SearchStats {
                exemplar: self.stats,
                search: search_stats,
                edge_ratio,
                dense,
                strategy: Some(strategy),
                max_tolerance: ctx.max_tolerance,
                refined: beam.len(),
            },
        })
    }
}

use edgematch::lowlevel::ProjectedExemplar;
use edgematch::{
    EdgeMap, EdgeMatchError, MatchConfig, Matcher, SpaceConfig, Strategy, StrategyMode, Transform,
    TransformSpace,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Coarse grid that keeps debug-mode tests fast: scales 0.25..=2.0, four
/// rotations.
fn coarse_space() -> SpaceConfig {
    SpaceConfig {
        scale_floor: 0.25,
        scale_step: 0.25,
        rotation_step_deg: 90,
        ..SpaceConfig::default()
    }
}

fn square_outline(size: usize, offset: usize) -> Vec<(usize, usize)> {
    let mut points = Vec::with_capacity(4 * size);
    let last = size - 1;
    for i in 0..size {
        points.push((offset + i, offset));
        points.push((offset + i, offset + last));
        points.push((offset, offset + i));
        points.push((offset + last, offset + i));
    }
    points
}

/// Asymmetric "L" inside a 41x41 canvas, centred so quarter turns stay inside.
fn l_shape() -> EdgeMap {
    let mut points = Vec::new();
    for y in 5..=35 {
        points.push((10, y));
    }
    for x in 10..=30 {
        points.push((x, 35));
    }
    EdgeMap::from_points(41, 41, points).unwrap()
}

fn angle_diff_deg(a: u32, b: u32) -> u32 {
    let diff = (a as i64 - b as i64).rem_euclid(360) as u32;
    diff.min(360 - diff)
}

fn matcher_for(exemplar: EdgeMap, space: SpaceConfig, cfg: MatchConfig) -> Matcher {
    let mut matcher = Matcher::new(exemplar).unwrap().with_config(cfg);
    matcher.build_space(space).unwrap();
    matcher
}

#[test]
fn identical_scene_matches_at_identity() {
    let exemplar = EdgeMap::from_points(100, 100, square_outline(100, 0)).unwrap();
    let matcher = matcher_for(
        exemplar.clone(),
        coarse_space(),
        MatchConfig {
            anchor_stride: 10,
            ..MatchConfig::default()
        },
    );

    let result = matcher.match_edges(&exemplar).unwrap();
    assert!(result.matched);
    assert!(result.score >= 0.70, "score {}", result.score);
    assert_eq!(result.stats.strategy, Some(Strategy::ScaleFirst));
    assert!(!result.stats.dense);
    assert_eq!(result.stats.exemplar.edges, 396);
    assert_eq!(result.stats.search.pixels, 10_000);

    let pose = result.pose.unwrap();
    assert!((pose.transform.sx - 1.0).abs() < 0.01);
    assert!((pose.transform.sy - 1.0).abs() < 0.01);
    assert_eq!(pose.transform.angle_deg, 0);
    assert_eq!((pose.x, pose.y), (0, 0));
}

#[test]
fn edgeless_scene_never_matches() {
    let exemplar = EdgeMap::from_points(20, 20, square_outline(20, 0)).unwrap();
    let matcher = matcher_for(exemplar, coarse_space(), MatchConfig::default());

    let empty = EdgeMap::new(64, 48).unwrap();
    let result = matcher.match_edges(&empty).unwrap();
    assert!(!result.matched);
    assert_eq!(result.score, 0.0);
    assert!(result.pose.is_none());
    assert!(result.stats.strategy.is_none());
    assert!(result.overlay_rect().is_none());
}

#[test]
fn scaled_and_translated_square_is_found() {
    let exemplar = EdgeMap::from_points(100, 100, square_outline(100, 0)).unwrap();
    let scene = EdgeMap::from_points(400, 400, square_outline(150, 50)).unwrap();
    let matcher = matcher_for(
        exemplar,
        coarse_space(),
        MatchConfig {
            anchor_stride: 32,
            ..MatchConfig::default()
        },
    );

    let result = matcher.match_edges(&scene).unwrap();
    assert!(result.matched, "score {}", result.score);
    let pose = result.pose.unwrap();
    assert!((pose.transform.sx - 1.5).abs() < 0.01, "sx {}", pose.transform.sx);
    assert!((pose.transform.sy - 1.5).abs() < 0.01, "sy {}", pose.transform.sy);
    assert!((pose.x - 50).abs() <= 1 && (pose.y - 50).abs() <= 1);
    assert_eq!(result.overlay_rect(), Some((50, 50, 150, 150)));
}

#[test]
fn quarter_turn_is_recovered_within_one_step() {
    let exemplar = l_shape();
    // Quarter turn about the canvas centre (20, 20): (x, y) -> (40 - y, x).
    let scene = EdgeMap::from_points(41, 41, exemplar.edge_points().map(|(x, y)| (40 - y, x)))
        .unwrap();
    let space = SpaceConfig {
        rotation_step_deg: 30,
        ..coarse_space()
    };
    let matcher = matcher_for(
        exemplar,
        space,
        MatchConfig {
            anchor_stride: 10,
            ..MatchConfig::default()
        },
    );

    let result = matcher.match_edges(&scene).unwrap();
    assert!(result.matched, "score {}", result.score);
    let angle = result.pose.unwrap().transform.angle_deg;
    assert!(angle_diff_deg(angle, 90) <= 30, "angle {angle}");
}

#[test]
fn oblique_rotation_is_recovered_within_one_step() {
    let exemplar = l_shape();
    let applied = Transform {
        sx: 1.0,
        sy: 1.0,
        angle_deg: 60,
    };
    let scene = ProjectedExemplar::new(&exemplar)
        .unwrap()
        .render(&applied, (0.0, 0.0), 41, 41)
        .unwrap();
    let space = SpaceConfig {
        rotation_step_deg: 30,
        ..coarse_space()
    };
    let matcher = matcher_for(
        exemplar,
        space,
        MatchConfig {
            anchor_stride: 10,
            ..MatchConfig::default()
        },
    );

    let result = matcher.match_edges(&scene).unwrap();
    assert!(result.matched, "score {}", result.score);
    let angle = result.pose.unwrap().transform.angle_deg;
    assert!(angle_diff_deg(angle, 60) <= 30, "angle {angle}");
}

#[test]
fn repeated_calls_are_idempotent() {
    let exemplar = l_shape();
    let scene = EdgeMap::from_points(41, 41, exemplar.edge_points().map(|(x, y)| (40 - y, x)))
        .unwrap();
    let matcher = matcher_for(
        exemplar,
        coarse_space(),
        MatchConfig {
            anchor_stride: 10,
            ..MatchConfig::default()
        },
    );

    let first = matcher.match_edges(&scene).unwrap();
    let second = matcher.match_edges(&scene).unwrap();
    assert_eq!(first, second);
}

#[test]
fn dense_scene_uses_translation_search() {
    let exemplar = EdgeMap::from_points(12, 12, square_outline(12, 0)).unwrap();
    let matcher = matcher_for(exemplar.clone(), coarse_space(), MatchConfig::default());

    let result = matcher.match_edges(&exemplar).unwrap();
    assert!(result.stats.dense);
    assert_eq!(result.stats.strategy, Some(Strategy::TranslationFirst));
    assert!(result.matched, "score {}", result.score);
    let pose = result.pose.unwrap();
    assert!((pose.transform.sx - 1.0).abs() < 0.01);
    assert!((pose.transform.sy - 1.0).abs() < 0.01);
    assert!(pose.x.abs() <= 1 && pose.y.abs() <= 1);
}

#[test]
fn strategy_can_be_forced() {
    let exemplar = EdgeMap::from_points(12, 12, square_outline(12, 0)).unwrap();
    let matcher = matcher_for(
        exemplar.clone(),
        coarse_space(),
        MatchConfig {
            strategy: StrategyMode::ScaleFirst,
            anchor_stride: 4,
            ..MatchConfig::default()
        },
    );

    let result = matcher.match_edges(&exemplar).unwrap();
    assert!(result.stats.dense);
    assert_eq!(result.stats.strategy, Some(Strategy::ScaleFirst));
    assert!(result.matched);
    assert!((result.score - 1.0).abs() < 1e-6);
}

#[test]
fn random_clutter_is_rejected() {
    let exemplar = EdgeMap::from_points(100, 100, square_outline(100, 0)).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let mut scene = EdgeMap::new(200, 200).unwrap();
    for _ in 0..400 {
        let x = rng.random_range(0..200);
        let y = rng.random_range(0..200);
        scene.set(x, y, true);
    }
    let matcher = matcher_for(
        exemplar,
        coarse_space(),
        MatchConfig {
            anchor_stride: 20,
            ..MatchConfig::default()
        },
    );

    let result = matcher.match_edges(&scene).unwrap();
    assert!(!result.matched, "score {}", result.score);
    assert!(result.score < 0.70);
    assert!(result.pose.is_some());
}

#[test]
fn matching_requires_a_built_space() {
    let exemplar = EdgeMap::from_points(12, 12, square_outline(12, 0)).unwrap();
    let matcher = Matcher::new(exemplar.clone()).unwrap();
    let err = matcher.match_edges(&exemplar).err().unwrap();
    assert_eq!(
        err,
        EdgeMatchError::InvalidConfig {
            reason: "transformation space not built",
        }
    );
}

#[test]
fn edgeless_exemplar_is_rejected() {
    let err = Matcher::new(EdgeMap::new(8, 8).unwrap()).err().unwrap();
    assert_eq!(
        err,
        EdgeMatchError::DegenerateExemplar {
            reason: "no edge pixels",
        }
    );
}

#[test]
fn invalid_match_config_is_rejected() {
    let exemplar = EdgeMap::from_points(12, 12, square_outline(12, 0)).unwrap();
    let invalid = [
        MatchConfig {
            anchor_stride: 0,
            ..MatchConfig::default()
        },
        MatchConfig {
            beam_width: 0,
            ..MatchConfig::default()
        },
        MatchConfig {
            dense_bound_width: 0.3,
            ..MatchConfig::default()
        },
        MatchConfig {
            max_chance: 1.0,
            ..MatchConfig::default()
        },
        MatchConfig {
            min_extent: f32::NAN,
            ..MatchConfig::default()
        },
    ];
    for cfg in invalid {
        let matcher = matcher_for(exemplar.clone(), coarse_space(), cfg);
        let err = matcher.match_edges(&exemplar).err().unwrap();
        assert!(matches!(err, EdgeMatchError::InvalidConfig { .. }));
    }
}

#[test]
fn one_space_can_serve_several_matchers() {
    let space = Arc::new(TransformSpace::build(41, 41, coarse_space()).unwrap());
    let square = EdgeMap::from_points(41, 41, square_outline(41, 0)).unwrap();
    let l = l_shape();

    // The square fills its canvas, which makes it edge-dense; force the
    // anchor sweep so both matchers run the same search.
    let cfg = MatchConfig {
        anchor_stride: 10,
        strategy: StrategyMode::ScaleFirst,
        ..MatchConfig::default()
    };
    let square_matcher = Matcher::new(square.clone())
        .unwrap()
        .with_config(cfg.clone())
        .with_space(Arc::clone(&space));
    let l_matcher = Matcher::new(l.clone())
        .unwrap()
        .with_config(cfg)
        .with_space(Arc::clone(&space));

    assert!(square_matcher.match_edges(&square).unwrap().matched);
    assert!(l_matcher.match_edges(&l).unwrap().matched);
    assert!(Arc::ptr_eq(square_matcher.space().unwrap(), &space));
}

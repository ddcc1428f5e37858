use criterion::{criterion_group, criterion_main, Criterion};
use edgematch::lowlevel::{ProjectedExemplar, SearchField};
use edgematch::{EdgeMap, MatchConfig, Matcher, SpaceConfig, Transform, TransformSpace};
use std::hint::black_box;

fn square_outline(size: usize, offset: usize) -> Vec<(usize, usize)> {
    let last = size - 1;
    (0..size)
        .flat_map(|i| {
            [
                (offset + i, offset),
                (offset + i, offset + last),
                (offset, offset + i),
                (offset + last, offset + i),
            ]
        })
        .collect()
}

fn bench_space(c: &mut Criterion) {
    c.bench_function("build_space_default_100x100", |b| {
        b.iter(|| TransformSpace::build(black_box(100), black_box(100), SpaceConfig::default()))
    });
}

fn bench_count(c: &mut Criterion) {
    let exemplar = EdgeMap::from_points(100, 100, square_outline(100, 0)).unwrap();
    let scene = EdgeMap::from_points(400, 400, square_outline(150, 50)).unwrap();
    let projected = ProjectedExemplar::new(&exemplar).unwrap();
    let field = SearchField::new(&scene);
    let t = Transform {
        sx: 1.5,
        sy: 1.5,
        angle_deg: 0,
    };
    c.bench_function("count_square_396_edges", |b| {
        b.iter(|| projected.count(&field, black_box(&t), (50.0, 50.0)))
    });
}

fn bench_match(c: &mut Criterion) {
    let exemplar = EdgeMap::from_points(100, 100, square_outline(100, 0)).unwrap();
    let scene = EdgeMap::from_points(400, 400, square_outline(150, 50)).unwrap();
    let mut matcher = Matcher::new(exemplar).unwrap().with_config(MatchConfig {
        anchor_stride: 25,
        ..MatchConfig::default()
    });
    matcher
        .build_space(SpaceConfig {
            scale_floor: 0.1,
            scale_step: 0.1,
            rotation_step_deg: 30,
            ..SpaceConfig::default()
        })
        .unwrap();

    let mut group = c.benchmark_group("match");
    group.sample_size(10);
    group.bench_function("square_400x400_sequential", |b| {
        b.iter(|| matcher.match_edges(black_box(&scene)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_space, bench_count, bench_match);
criterion_main!(benches);

use edgematch::lowlevel::BoundPolicy;

#[test]
fn window_starts_below_one_and_strictly_narrows() {
    for width in [0.15f32, 0.20] {
        let policy = BoundPolicy::new(200, width);
        assert!(policy.window(0) < 1.0, "width {width}");
        for level in 0..20 {
            assert!(
                policy.window(level + 1) < policy.window(level),
                "width {width} level {level}"
            );
        }
    }
}

#[test]
fn dense_window_is_wider_than_sparse() {
    let dense = BoundPolicy::new(150, 0.20);
    let sparse = BoundPolicy::new(150, 0.15);
    for level in 0..10 {
        assert!(dense.window(level) > sparse.window(level), "level {level}");
    }
    // Expected 150; window(2) is 0.595 dense and 0.534 sparse.
    assert!(dense.accepts(65.0, 1.0, 1.0, 2));
    assert!(!sparse.accepts(65.0, 1.0, 1.0, 2));
}

#[test]
fn acceptance_depends_on_scale() {
    let policy = BoundPolicy::new(200, 0.20);
    assert!((policy.expected_edges(0.5, 0.5) - 100.0).abs() < 1e-4);
    assert!(policy.accepts(100.0, 0.5, 0.5, 5));
    assert!(!policy.accepts(100.0, 1.0, 1.0, 5));
}

#[test]
fn collapsed_pose_is_rejected() {
    let policy = BoundPolicy::new(200, 0.20);
    for level in 0..32 {
        assert!(!policy.accepts(200.0, 0.1, 0.1, level), "level {level}");
    }
}

#[test]
fn clutter_without_support_is_rejected() {
    let policy = BoundPolicy::new(200, 0.25);
    for level in 0..32 {
        assert!(!policy.accepts(0.0, 1.0, 1.0, level));
    }
}

#[test]
fn observed_equal_to_expected_is_always_accepted() {
    let policy = BoundPolicy::new(80, 0.20);
    for level in 0..32 {
        for scale in [0.3f32, 0.75, 1.0, 1.5] {
            let expected = policy.expected_edges(scale, scale);
            assert!(policy.accepts(expected, scale, scale, level));
        }
    }
    assert!((policy.expected_edges(1.5, 1.5) - 80.0).abs() < 1e-4);
}

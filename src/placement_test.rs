use super::*;
use crate::state::test_helpers::dummy_item;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Overlap test for two padded items written against the rectangle's own
/// axes, independent of `geometry::intersects`.
fn items_overlap(a: &CanvasItem, b: &CanvasItem) -> bool {
    fn half_extents(item: &CanvasItem) -> (f64, f64) {
        #[allow(clippy::cast_precision_loss)]
        let w = item.text.chars().count() as f64 * f64::from(item.font_size) * 0.6;
        (w / 2.0 + COLLISION_PADDING, f64::from(item.font_size) / 2.0 + COLLISION_PADDING)
    }
    fn axes(item: &CanvasItem) -> [(f64, f64); 2] {
        let (s, c) = item.rotation.to_radians().sin_cos();
        [(c, s), (-s, c)]
    }
    fn reach(item: &CanvasItem, axis: (f64, f64)) -> f64 {
        let (hw, hh) = half_extents(item);
        let [u, v] = axes(item);
        hw * (u.0 * axis.0 + u.1 * axis.1).abs() + hh * (v.0 * axis.0 + v.1 * axis.1).abs()
    }

    let d = (b.x - a.x, b.y - a.y);
    axes(a).into_iter().chain(axes(b)).all(|axis| {
        let gap = (d.0 * axis.0 + d.1 * axis.1).abs();
        gap <= reach(a, axis) + reach(b, axis)
    })
}

fn radius(item: &CanvasItem) -> f64 {
    item.x.hypot(item.y)
}

// =============================================================================
// Annulus
// =============================================================================

#[test]
fn annulus_for_empty_wall_is_a_disc() {
    assert_eq!(sampling_annulus(0, 0), (0.0, 500.0));
    assert_eq!(sampling_annulus(0, 100), (0.0, 500.0));
}

#[test]
fn annulus_grows_with_population() {
    assert_eq!(sampling_annulus(50, 0), (500.0, 1000.0));
    assert_eq!(sampling_annulus(10, 0), (100.0, 600.0));
}

#[test]
fn annulus_expands_after_grace_period() {
    assert_eq!(sampling_annulus(0, 101), (5.0, 505.0));
    assert_eq!(sampling_annulus(0, 300), (1000.0, 1500.0));
    assert_eq!(sampling_annulus(50, 200), (1000.0, 1500.0));
}

#[test]
fn ring_radius_endpoints() {
    assert!((ring_radius(0.0, 500.0, 1000.0) - 500.0).abs() < 1e-9);
    assert!((ring_radius(1.0, 500.0, 1000.0) - 1000.0).abs() < 1e-9);
    assert!(ring_radius(0.0, 0.0, 500.0).abs() < 1e-9);
}

#[test]
fn ring_radius_is_area_uniform() {
    // Area-uniform over a disc of radius R puts a quarter of the samples
    // inside R/2; radius-uniform would put half there.
    let mut rng = StdRng::seed_from_u64(7);
    let n = 20_000;
    let inside = (0..n)
        .map(|_| ring_radius(rng.random::<f64>(), 0.0, 500.0))
        .filter(|r| *r < 250.0)
        .count();
    #[allow(clippy::cast_precision_loss)]
    let fraction = inside as f64 / f64::from(n);
    assert!((0.22..0.28).contains(&fraction), "fraction inside half radius was {fraction}");
}

// =============================================================================
// Placement
// =============================================================================

#[test]
fn first_item_lands_within_initial_disc() {
    let engine = PlacementEngine::default();
    let mut rng = StdRng::seed_from_u64(1);
    let item = engine.place(&mut rng, "HELLO", &[], 42).unwrap();

    assert_eq!(item.text, "HELLO");
    assert_eq!(item.timestamp, 42);
    assert!(item.x * item.x + item.y * item.y <= 500.0 * 500.0);
    assert!((MIN_ROTATION..=MAX_ROTATION).contains(&item.rotation));
    assert!((MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&item.font_size));
    assert!(PALETTE.contains(&item.color.as_str()));
}

#[test]
fn fifty_item_wall_samples_from_outer_ring_first() {
    // Items far away so the first attempt always succeeds.
    let existing: Vec<CanvasItem> = (0..50)
        .map(|i| dummy_item("x", 100_000.0 + f64::from(i) * 1000.0, 0.0))
        .collect();
    let engine = PlacementEngine::new(1);
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let item = engine.place(&mut rng, "hi", &existing, 0).unwrap();
        let r = radius(&item);
        assert!((500.0 - 1e-9..=1000.0 + 1e-9).contains(&r), "radius {r} outside ring");
    }
}

#[test]
fn placed_item_avoids_existing_item() {
    let existing = vec![dummy_item("a fairly long snippet of text", 0.0, 0.0)];
    let engine = PlacementEngine::default();
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let item = engine.place(&mut rng, "neighbour", &existing, 0).unwrap();
        assert!(!items_overlap(&item, &existing[0]));
    }
}

#[test]
fn default_engine_uses_configured_budget() {
    let config = crate::config::Config::default();
    assert_eq!(PlacementEngine::default().max_attempts, config.placement_max_attempts);
}

#[test]
fn zero_budget_is_congested() {
    let engine = PlacementEngine::new(0);
    let mut rng = StdRng::seed_from_u64(0);
    let err = engine.place(&mut rng, "HELLO", &[], 0).unwrap_err();
    assert!(matches!(err, PlacementError::Congested { attempts: 0 }));
}

#[test]
fn blocked_ring_exhausts_budget() {
    // One enormous item covers the whole ring for every attempt in the budget.
    let mut wall = dummy_item(&"x".repeat(67), 0.0, 0.0);
    wall.font_size = 10_000;
    let engine = PlacementEngine::new(100);
    let mut rng = StdRng::seed_from_u64(3);
    let err = engine.place(&mut rng, "HELLO", &[wall], 0).unwrap_err();
    assert!(matches!(err, PlacementError::Congested { attempts: 100 }));
}

#[test]
fn congested_error_is_retryable() {
    use crate::frame::ErrorCode;
    let err = PlacementError::Congested { attempts: 5000 };
    assert_eq!(err.error_code(), "E_CONGESTED");
    assert!(err.retryable());
}

#[test]
fn independent_overlap_check_agrees_on_simple_cases() {
    let a = dummy_item("abc", 0.0, 0.0);
    let near = dummy_item("abc", 10.0, 0.0);
    let far = dummy_item("abc", 1000.0, 0.0);
    assert!(items_overlap(&a, &near));
    assert!(!items_overlap(&a, &far));
    assert!(geometry::intersects(&geometry::item_corners(&a), &geometry::item_corners(&near)));
    assert!(!geometry::intersects(&geometry::item_corners(&a), &geometry::item_corners(&far)));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn accepted_items_never_overlap(
        seed in any::<u64>(),
        texts in prop::collection::vec("[A-Za-z ]{1,67}", 1..25),
    ) {
        let engine = PlacementEngine::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut wall: Vec<CanvasItem> = Vec::new();
        for text in &texts {
            if let Ok(item) = engine.place(&mut rng, text, &wall, 0) {
                wall.push(item);
            }
        }
        for (i, a) in wall.iter().enumerate() {
            for b in &wall[i + 1..] {
                prop_assert!(!items_overlap(a, b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn placed_attributes_stay_in_range(seed in any::<u64>(), text in "[a-z]{1,67}") {
        let mut rng = StdRng::seed_from_u64(seed);
        let item = PlacementEngine::default().place(&mut rng, &text, &[], 0).unwrap();
        prop_assert!((MIN_ROTATION..=MAX_ROTATION).contains(&item.rotation));
        prop_assert!((MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&item.font_size));
        prop_assert!(PALETTE.contains(&item.color.as_str()));
        prop_assert!(radius(&item) <= 500.0 + 1e-9);
    }
}

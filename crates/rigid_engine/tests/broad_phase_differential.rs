//! Sweep-and-prune against the quadratic reference on random scenes

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rigid_engine::foundation::math::{Quat, Vec3};
use rigid_engine::physics::broad_phase::brute_force_pairs;
use rigid_engine::physics::{Body, BoxShape, BroadPhase, CollisionPair, Shape};

fn random_vec(rng: &mut StdRng, extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

fn random_scene(rng: &mut StdRng, count: usize) -> Vec<Body> {
    let sphere = Arc::new(Shape::sphere(0.5));
    let slab = Arc::new(Shape::Box(BoxShape::new(Vec3::new(1.5, 0.5, 0.25))));

    (0..count)
        .map(|_| {
            let shape = if rng.gen_bool(0.5) { sphere.clone() } else { slab.clone() };
            let orientation = Quat::from_scaled_axis(random_vec(rng, 3.0));
            let body = Body::new(shape)
                .with_position(random_vec(rng, 15.0))
                .with_orientation(orientation)
                .with_linear_velocity(random_vec(rng, 60.0));

            // About a fifth of the bodies are static
            if rng.gen_bool(0.2) {
                body
            } else {
                body.with_inv_mass(rng.gen_range(0.1..2.0))
            }
        })
        .collect()
}

fn sorted(mut pairs: Vec<CollisionPair>) -> Vec<CollisionPair> {
    pairs.sort();
    pairs
}

#[test]
fn test_sweep_matches_brute_force_on_random_scenes() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut broad_phase = BroadPhase::new();

    for round in 0..50 {
        let count = rng.gen_range(2..80);
        let bodies = random_scene(&mut rng, count);
        let dt = rng.gen_range(0.001..0.05);

        let swept = sorted(broad_phase.find_pairs(&bodies, dt).to_vec());
        let expected = sorted(brute_force_pairs(&bodies, dt));
        assert_eq!(swept, expected, "round {round} with {count} bodies");
    }
}

#[test]
fn test_sweep_reports_each_pair_once() {
    let mut rng = StdRng::seed_from_u64(7);
    let bodies = random_scene(&mut rng, 120);

    let mut broad_phase = BroadPhase::with_capacity(bodies.len());
    let pairs = broad_phase.find_pairs(&bodies, 1.0 / 60.0).to_vec();

    let mut unique = sorted(pairs.clone());
    unique.dedup();
    assert_eq!(unique.len(), pairs.len());

    for pair in &pairs {
        assert!(pair.a < pair.b);
        assert!(!(bodies[pair.a].is_static() && bodies[pair.b].is_static()));
    }
}

#[test]
fn test_static_pile_yields_no_pairs() {
    let mut rng = StdRng::seed_from_u64(42);
    let bodies: Vec<Body> = random_scene(&mut rng, 40)
        .into_iter()
        .map(|body| body.with_inv_mass(0.0))
        .collect();

    let mut broad_phase = BroadPhase::new();
    assert!(broad_phase.find_pairs(&bodies, 1.0 / 60.0).is_empty());
    assert!(broad_phase.pairs().is_empty());
}

//! Invariant tests for impulse_physics
//!
//! Collision detection and broadphase properties that must hold for any
//! input, checked on hand-built and seeded random configurations.

use std::collections::HashSet;
use std::sync::Arc;

use impulse_math::{Transform, AABB};
use impulse_memory::{Arena, FrameStorage};
use impulse_physics::broadphase::{create_broadphase, BroadphaseProxy, CollisionPair};
use impulse_physics::narrowphase::check_collision;
use impulse_physics::prelude::*;
use impulse_physics::shape::WorldShape;
use impulse_structures::SlotKey;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn at(shape: &CollisionShape, position: Vec3, rotation: Quat) -> WorldShape<'_> {
    WorldShape::new(shape, &Transform::new(position, rotation))
}

fn all_broadphases() -> [BroadphaseKind; 3] {
    [
        BroadphaseKind::BruteForce,
        BroadphaseKind::octree(),
        BroadphaseKind::SortAndSweep,
    ]
}

/// INVARIANT: Axis-aligned boxes report the true minimum translation distance
#[test]
fn invariant_sat_matches_hand_computed_boxes() {
    init_logging();
    let unit = CollisionShape::cuboid(Vec3::ONE).unwrap();
    let a = at(&unit, Vec3::ZERO, Quat::IDENTITY);

    // x overlap 0.5, y overlap 1.5: the shallower axis wins
    let b = at(&unit, Vec3::new(1.5, 0.5, 0.0), Quat::IDENTITY);
    let hit = check_collision(&a, &b).expect("overlapping boxes");
    assert!((hit.penetration + 0.5).abs() < 1e-4, "penetration {}", hit.penetration);
    assert!((hit.normal - Vec3::X).length() < 1e-4, "normal {:?}", hit.normal);

    // Separated along x
    let far = at(&unit, Vec3::new(2.1, 0.0, 0.0), Quat::IDENTITY);
    assert!(check_collision(&a, &far).is_none());

    // A box turned 45 degrees about z, one corner 0.1 into the top face
    let sqrt2 = std::f32::consts::SQRT_2;
    let tilted = at(
        &unit,
        Vec3::new(0.0, 1.0 + sqrt2 - 0.1, 0.0),
        Quat::from_rotation_z(std::f32::consts::FRAC_PI_4),
    );
    let hit = check_collision(&a, &tilted).expect("corner contact");
    assert!((hit.penetration + 0.1).abs() < 1e-3, "penetration {}", hit.penetration);
    assert!((hit.normal - Vec3::Y).length() < 1e-3, "normal {:?}", hit.normal);
}

/// INVARIANT: Two boxes stacked face to face collide with zero depth
#[test]
fn invariant_two_box_stack_touches() {
    let unit = CollisionShape::cuboid(Vec3::ONE).unwrap();
    let lower = at(&unit, Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY);
    let upper = at(&unit, Vec3::new(0.0, 3.0, 0.0), Quat::IDENTITY);

    let hit = check_collision(&lower, &upper).expect("touching faces collide");
    assert!(hit.penetration.abs() < 1e-4);
    assert!(hit.normal.y.abs() > 0.999, "normal {:?}", hit.normal);
}

/// INVARIANT: Swapping the pair negates the normal and keeps everything else
#[test]
fn invariant_collision_is_symmetric() {
    let mut rng = StdRng::seed_from_u64(0x5a7);
    let shapes = [
        CollisionShape::sphere(0.8).unwrap(),
        CollisionShape::cuboid(Vec3::new(0.6, 0.9, 0.7)).unwrap(),
        CollisionShape::pyramid(Vec3::new(0.8, 0.8, 0.8)).unwrap(),
        CollisionShape::capsule(0.7, 0.4).unwrap(),
    ];

    let mut collisions = 0;
    for _ in 0..400 {
        let sa = &shapes[rng.gen_range(0..shapes.len())];
        let sb = &shapes[rng.gen_range(0..shapes.len())];
        let pose = |rng: &mut StdRng| {
            let position = Vec3::new(
                rng.gen_range(-1.2..1.2),
                rng.gen_range(-1.2..1.2),
                rng.gen_range(-1.2..1.2),
            );
            let rotation = Quat::from_euler(
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
            );
            (position, rotation)
        };
        let (pa, ra) = pose(&mut rng);
        let (pb, rb) = pose(&mut rng);
        let a = at(sa, pa, ra);
        let b = at(sb, pb, rb);

        match (check_collision(&a, &b), check_collision(&b, &a)) {
            (None, None) => {}
            (Some(ab), Some(ba)) => {
                collisions += 1;
                assert_eq!(ab.normal, -ba.normal);
                assert_eq!(ab.penetration, ba.penetration);
                assert_eq!(ab.point, ba.point);
                assert!(ab.penetration <= 0.0);
            }
            (ab, ba) => panic!("asymmetric result: {:?} vs {:?}", ab, ba),
        }
    }
    assert!(collisions > 0);
}

fn random_proxies(rng: &mut StdRng, count: u32) -> Vec<BroadphaseProxy> {
    (0..count)
        .map(|i| {
            let center = Vec3::new(
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
            );
            let half = Vec3::new(
                rng.gen_range(0.2..2.5),
                rng.gen_range(0.2..2.5),
                rng.gen_range(0.2..2.5),
            );
            BroadphaseProxy {
                handle: BodyHandle::from_raw(SlotKey::new(i, 0)),
                aabb: AABB::from_center_half_extents(center, half),
                is_static: rng.gen_bool(0.3),
                at_rest: false,
                groups: CollisionGroups::ALL,
            }
        })
        .collect()
}

/// INVARIANT: Every broadphase finds all overlapping pairs exactly once
#[test]
fn invariant_broadphase_is_sound() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(42);
    let proxies = random_proxies(&mut rng, 300);

    let mut expected = HashSet::new();
    for (i, a) in proxies.iter().enumerate() {
        for b in &proxies[i + 1..] {
            if !(a.is_static && b.is_static) && a.aabb.intersects(&b.aabb) {
                expected.insert(CollisionPair::new(a.handle, b.handle).key());
            }
        }
    }
    assert!(!expected.is_empty());

    let config = PhysicsConfig::default();
    for kind in all_broadphases() {
        let mut broadphase = create_broadphase(kind, &config);
        let mut pairs = Arena::new(config.max_pairs);
        broadphase.find_potential_collision_pairs(&proxies, &mut pairs);

        let mut seen = HashSet::new();
        for pair in pairs.iter() {
            assert!(pair.a.index() < pair.b.index(), "{:?}: pair not canonical", kind);
            assert!(seen.insert(pair.key()), "{:?}: duplicate pair {:?}", kind, pair);
        }
        let missed: Vec<_> = expected.difference(&seen).collect();
        assert!(missed.is_empty(), "{:?} missed {} pairs", kind, missed.len());

        pairs.reset();
        assert!(pairs.is_empty());
    }
}

/// INVARIANT: Two static bodies are never paired
#[test]
fn invariant_static_pairs_are_pruned() {
    let config = PhysicsConfig::default();
    let proxies: Vec<_> = (0..6)
        .map(|i| BroadphaseProxy {
            handle: BodyHandle::from_raw(SlotKey::new(i, 0)),
            aabb: AABB::from_center_half_extents(Vec3::new(i as f32 * 0.1, 0.0, 0.0), Vec3::ONE),
            is_static: true,
            at_rest: false,
            groups: CollisionGroups::ALL,
        })
        .collect();

    for kind in all_broadphases() {
        let mut broadphase = create_broadphase(kind, &config);
        let mut pairs = Arena::new(64);
        broadphase.find_potential_collision_pairs(&proxies, &mut pairs);
        assert!(pairs.is_empty(), "{:?} paired static bodies", kind);
    }
}

fn colliding_pairs(kind: BroadphaseKind, seed: u64) -> HashSet<(u32, u32)> {
    let config = PhysicsConfig::default()
        .with_broadphase(kind)
        .with_gravity(0.0, 0.0, 0.0);
    let mut world = PhysicsWorld::new(config).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let ball = Arc::new(CollisionShape::sphere(0.75).unwrap());
    let crate_box = Arc::new(CollisionShape::cuboid(Vec3::new(0.6, 0.6, 0.6)).unwrap());

    for _ in 0..200 {
        let shape = if rng.gen_bool(0.5) { ball.clone() } else { crate_box.clone() };
        let desc = if rng.gen_bool(0.2) {
            RigidBodyDesc::fixed(shape)
        } else {
            RigidBodyDesc::dynamic(shape)
        };
        world
            .create_body(desc.with_position(
                rng.gen_range(-8.0..8.0),
                rng.gen_range(-8.0..8.0),
                rng.gen_range(-8.0..8.0),
            ))
            .unwrap();
    }

    world.step(world.config().timestep);
    world
        .collision_events()
        .iter()
        .filter(|e| !e.is_stopped())
        .map(|e| (e.body_a.index(), e.body_b.index()))
        .collect()
}

/// INVARIANT: Broadphase choice never changes which pairs collide
#[test]
fn invariant_broadphases_agree_after_narrowphase() {
    init_logging();
    for seed in [1, 7, 1234] {
        let reference = colliding_pairs(BroadphaseKind::BruteForce, seed);
        assert!(!reference.is_empty());
        assert_eq!(colliding_pairs(BroadphaseKind::octree(), seed), reference);
        assert_eq!(colliding_pairs(BroadphaseKind::SortAndSweep, seed), reference);
    }
}

/// INVARIANT: Accumulated normal impulses never pull bodies together
#[test]
fn invariant_normal_impulse_is_non_positive() {
    init_logging();
    let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
    let ground = Arc::new(CollisionShape::cuboid(Vec3::new(10.0, 1.0, 10.0)).unwrap());
    world
        .create_body(RigidBodyDesc::fixed(ground).with_position(0.0, -1.0, 0.0))
        .unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    let ball = Arc::new(CollisionShape::sphere(0.5).unwrap());
    let block = Arc::new(CollisionShape::cuboid(Vec3::new(0.5, 0.5, 0.5)).unwrap());
    for i in 0..12 {
        let shape = if i % 2 == 0 { ball.clone() } else { block.clone() };
        world
            .create_body(
                RigidBodyDesc::dynamic(shape)
                    .with_position(rng.gen_range(-2.0..2.0), 0.6 + i as f32 * 1.1, rng.gen_range(-2.0..2.0))
                    .with_linear_velocity(rng.gen_range(-1.0..1.0), 0.0, rng.gen_range(-1.0..1.0)),
            )
            .unwrap();
    }

    let dt = world.config().timestep;
    let mut checked = 0;
    for _ in 0..240 {
        world.step(dt);
        for manifold in world.last_manifolds() {
            for contact in manifold.contacts.iter() {
                assert!(contact.sum_impulse_normal <= 0.0);
                assert!(contact.penetration <= 0.0);
                checked += 1;
            }
        }
    }
    assert!(checked > 0);
}

//! Multi-threaded steps repeat exactly for a fixed thread count.

use nalgebra::{Point3, Vector3};
use rigid_dynamics::PhysicsManager;
use rigid_types::PoolConfig;

use crate::common::{ball, config, cube, floor, gravity, run};

fn scene(threads: usize) -> PhysicsManager {
    let config = config(gravity()).with_pools(PoolConfig::default().with_threads(threads));
    let mut world = PhysicsManager::new(config).expect("valid config");
    world.add_body(floor()).expect("floor");
    for i in 0..4 {
        for j in 0..4 {
            let x = f64::from(i) * 1.5;
            let y = f64::from(j) * 1.5;
            let mut body = if (i + j) % 2 == 0 {
                ball(0.4, Point3::new(x, y, 1.0 + 0.3 * f64::from(j)))
            } else {
                cube(0.8, Point3::new(x, y, 1.5 + 0.2 * f64::from(i)))
            };
            body.set_angular_velocity(Vector3::new(0.3, -0.2, 0.1) * f64::from(i + j));
            world.add_body(body).expect("body");
        }
    }
    world
}

fn snapshot(world: &PhysicsManager) -> Vec<(Point3<f64>, Vector3<f64>)> {
    world
        .bodies()
        .iter()
        .map(|b| (b.position(), b.linear_velocity()))
        .collect()
}

#[test]
fn repeated_runs_match_with_four_threads() {
    let mut first = scene(4);
    let mut second = scene(4);
    run(&mut first, 120);
    run(&mut second, 120);

    let (a, b) = (snapshot(&first), snapshot(&second));
    assert_eq!(a.len(), b.len());
    for (i, ((pa, va), (pb, vb))) in a.iter().zip(&b).enumerate() {
        assert!((pa - pb).norm() < 1e-9, "body {i} position differs: {pa} vs {pb}");
        assert!((va - vb).norm() < 1e-9, "body {i} velocity differs: {va} vs {vb}");
    }
}

#[test]
fn threaded_and_single_threaded_scenes_settle_alike() {
    let mut threaded = scene(4);
    let mut single = scene(1);
    run(&mut threaded, 240);
    run(&mut single, 240);
    for (t, s) in threaded.bodies().iter().zip(single.bodies().iter()) {
        if t.is_movable() {
            assert!(t.position().z > 0.0 && s.position().z > 0.0, "nothing falls through the floor");
        }
    }
    assert_eq!(threaded.contact_count() > 0, single.contact_count() > 0);
}

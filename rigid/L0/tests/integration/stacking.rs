//! Boxes settling on a floor.

use nalgebra::{Point3, Vector3};
use rigid_dynamics::{BodyState, PhysicsManager};
use rigid_types::BodyId;

use crate::common::{config, cube, floor, gravity, run, world, DT};

// Deepest contact reported for `id`.
fn deepest(world: &PhysicsManager, id: BodyId) -> f64 {
    world
        .contacts_of(id)
        .flat_map(|c| c.points())
        .map(|p| p.depth())
        .fold(0.0, f64::max)
}

#[test]
fn dropped_box_comes_to_rest_on_floor() {
    let mut world = world(config(gravity()).with_deactivation_time(1e6));
    world.add_body(floor()).expect("floor");
    let id = world.add_body(cube(1.0, Point3::new(0.0, 0.0, 2.0))).expect("box");

    run(&mut world, 300);
    let body = world.body(id).expect("managed");
    assert!(
        (body.position().z - 0.5).abs() < 0.005,
        "box should rest on its face, z = {}",
        body.position().z
    );
    assert!(
        body.linear_velocity().norm() < 1e-3,
        "box should be still, v = {}",
        body.linear_velocity().norm()
    );
    assert!(
        body.angular_velocity().norm() < 1e-3,
        "box should not spin, w = {}",
        body.angular_velocity().norm()
    );
    assert!(body.orientation().angle() < 0.05, "box should not tip over");

    let depth = deepest(&world, id);
    let tolerance = world.config().linear_error_tolerance;
    assert!(
        depth <= tolerance + 5e-4,
        "resting penetration {depth} should stay near the error tolerance {tolerance}"
    );
}

#[test]
fn resting_box_falls_asleep() {
    let mut world = world(config(gravity()).with_deactivation_time(0.5));
    world.add_body(floor()).expect("floor");
    let id = world.add_body(cube(1.0, Point3::new(0.0, 0.0, 0.6))).expect("box");

    run(&mut world, 600);
    let body = world.body(id).expect("managed");
    assert_eq!(body.state(), BodyState::Inactive);

    // Asleep bodies stay where they are.
    let z = body.position().z;
    run(&mut world, 60);
    let after = world.body(id).expect("managed").position().z;
    assert!((after - z).abs() < 1e-12, "sleeping box moved from {z} to {after}");
}

fn tower(count: u32, warm_start: bool) -> (PhysicsManager, Vec<BodyId>) {
    let config = config(gravity())
        .with_iterations(4, 2)
        .with_warm_start(warm_start)
        .with_deactivation_time(1e6);
    let mut world = world(config);
    world.add_body(floor()).expect("floor");
    let ids = (0..count)
        .map(|i| {
            let z = 0.5 + f64::from(i) * 1.0;
            world.add_body(cube(1.0, Point3::new(0.0, 0.0, z))).expect("box")
        })
        .collect();
    (world, ids)
}

// First step at which every box is still and no contact sinks past twice
// the error tolerance, within `limit` steps.
fn steps_to_settle(warm_start: bool, limit: usize) -> Option<usize> {
    let (mut world, ids) = tower(4, warm_start);
    let tolerance = world.config().linear_error_tolerance;
    (1..=limit).find(|_| {
        world.integrate(DT).expect("step");
        let speed = ids
            .iter()
            .filter_map(|&id| world.body(id))
            .map(|b| b.linear_velocity().norm())
            .fold(0.0, f64::max);
        let depth = ids.iter().map(|&id| deepest(&world, id)).fold(0.0, f64::max);
        speed < 1e-3 && depth <= 2.0 * tolerance
    })
}

#[test]
fn tower_of_boxes_stands() {
    let (mut world, ids) = tower(3, true);
    run(&mut world, 300);
    let top = world.body(ids[2]).expect("managed");
    assert!(
        top.position().z > 2.3 && top.position().z < 2.6,
        "top box should stay on the stack, z = {}",
        top.position().z
    );
    let drift = Vector3::new(top.position().x, top.position().y, 0.0).norm();
    assert!(drift < 0.1, "top box slid {drift}");
}

#[test]
fn warm_starting_settles_a_stack_sooner() {
    let limit = 600;
    let warm = steps_to_settle(true, limit).expect("warm started stack should settle");
    let cold = steps_to_settle(false, limit).unwrap_or(limit + 1);
    assert!(warm < cold, "warm started stack settled at step {warm}, cold at {cold}");
}

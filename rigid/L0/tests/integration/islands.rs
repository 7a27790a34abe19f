//! Island partitioning of the body graph.

use nalgebra::{Point3, Vector3};
use rigid_dynamics::PointConstraint;

use crate::common::{ball, config, floor, gravity, run, world};

#[test]
fn unconnected_bodies_form_separate_islands() {
    let mut world = world(config(Vector3::zeros()));
    let a = world.add_body(ball(0.25, Point3::origin())).expect("a");
    let b = world.add_body(ball(0.25, Point3::new(5.0, 0.0, 0.0))).expect("b");
    run(&mut world, 1);
    assert_eq!(world.island_count(), 2);
    assert!(!world.same_island(a, b));
}

#[test]
fn constraint_chain_shares_one_island() {
    let mut world = world(config(Vector3::zeros()));
    let a = ball(0.25, Point3::origin());
    let b = ball(0.25, Point3::new(1.0, 0.0, 0.0));
    let c = ball(0.25, Point3::new(2.0, 0.0, 0.0));
    let ab = PointConstraint::new(&a, &b, Point3::new(0.5, 0.0, 0.0));
    let bc = PointConstraint::new(&b, &c, Point3::new(1.5, 0.0, 0.0));
    let (a, b, c) = (
        world.add_body(a).expect("a"),
        world.add_body(b).expect("b"),
        world.add_body(c).expect("c"),
    );
    let loner = world.add_body(ball(0.25, Point3::new(0.0, 5.0, 0.0))).expect("loner");
    world.add_constraint(ab).expect("ab");
    world.add_constraint(bc).expect("bc");

    run(&mut world, 1);
    assert_eq!(world.island_count(), 2);
    assert!(world.same_island(a, c));
    assert!(world.same_island(b, c));
    assert!(!world.same_island(a, loner));
}

#[test]
fn shared_floor_does_not_join_islands() {
    let mut world = world(config(gravity()));
    world.add_body(floor()).expect("floor");
    let a = world.add_body(ball(0.5, Point3::new(0.0, 0.0, 0.49))).expect("a");
    let b = world.add_body(ball(0.5, Point3::new(3.0, 0.0, 0.49))).expect("b");

    run(&mut world, 2);
    assert!(world.contact_count() >= 2, "both balls should touch the floor");
    assert_eq!(world.island_count(), 2, "the floor never joins islands");
    assert!(!world.same_island(a, b));
}

#[test]
fn touching_bodies_merge_islands() {
    let mut world = world(config(Vector3::zeros()));
    let a = world.add_body(ball(0.5, Point3::origin())).expect("a");
    let b = world.add_body(ball(0.5, Point3::new(0.95, 0.0, 0.0))).expect("b");
    run(&mut world, 1);
    assert_eq!(world.island_count(), 1);
    assert!(world.same_island(a, b));
    assert_eq!(world.contacts_of(a).count(), 1);
}

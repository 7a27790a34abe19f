//! Joints and grabs driving bodies through the full step.

use nalgebra::{Point3, Vector3};
use rigid_collision::{BodySkin, Part};
use rigid_dynamics::{GrabConstraint, RevoluteJoint, RigidBody};
use rigid_types::Material;

use crate::common::{ball, config, gravity, run, world, DT};

#[test]
fn revolute_pendulum_keeps_its_anchor() {
    let mut world = world(config(gravity()));
    let pivot = Point3::new(0.0, 0.0, 5.0);
    let mount = RigidBody::immovable(BodySkin::new(Part::sphere(Point3::origin(), 0.1), Material::default()))
        .at(pivot);
    let bob = ball(0.25, Point3::new(1.0, 0.0, 5.0));
    let local_anchor = bob.world_inverse().transform_point(&pivot);
    let joint = RevoluteJoint::new(&mount, &bob, pivot, Vector3::y()).expect("joint");
    world.add_body(mount).expect("mount");
    let bob = world.add_body(bob).expect("bob");
    world.add_constraint(joint).expect("joint");

    let mut lowest = f64::INFINITY;
    for step in 0..180 {
        world.integrate(DT).expect("step");
        let body = world.body(bob).expect("managed");
        let gap = (body.world().transform_point(&local_anchor) - pivot).norm();
        assert!(gap < 0.01, "anchor drifted {gap} at step {step}");
        // Swings in the xz plane only.
        assert!(body.position().y.abs() < 1e-6);
        lowest = lowest.min(body.position().z);
    }
    assert!(lowest < 4.5, "pendulum should swing down, lowest z = {lowest}");
}

#[test]
fn grab_pulls_body_point_to_target() {
    let mut world = world(config(Vector3::zeros()));
    let body = ball(0.5, Point3::origin());
    let target = Point3::new(2.0, 1.0, 0.0);
    let grab = GrabConstraint::with_body_point(&body, target, Point3::origin());
    let id = world.add_body(body).expect("ball");
    world.add_constraint(grab).expect("grab");

    run(&mut world, 120);
    let reached = world.body(id).expect("managed").position();
    assert!(
        (reached - target).norm() < 0.05,
        "ball should be pulled to {target}, got {reached}"
    );
}

#[test]
fn removed_grab_releases_body() {
    let mut world = world(config(Vector3::zeros()));
    let body = ball(0.5, Point3::origin());
    let grab = GrabConstraint::with_body_point(&body, Point3::new(5.0, 0.0, 0.0), Point3::origin());
    let id = world.add_body(body).expect("ball");
    let grab = world.add_constraint(grab).expect("grab");
    run(&mut world, 5);
    world.remove_constraint(grab).expect("managed grab");
    assert!(world.body(id).expect("managed").constraints().is_empty());

    // Coasts on, slowed by damping only.
    let before = world.body(id).expect("managed").linear_velocity().x;
    run(&mut world, 5);
    let after = world.body(id).expect("managed").linear_velocity().x;
    assert!(before > 0.0);
    assert!(after <= before && after > 0.9 * before, "before {before}, after {after}");
}

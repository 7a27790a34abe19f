//! Collision and separation callbacks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nalgebra::{Point3, Vector3};
use rigid_types::BodyId;

use crate::common::{ball, config, floor, gravity, run, world};

#[test]
fn suppressing_callback_lets_body_pass_through() {
    let mut world = world(config(gravity()));
    let floor_id = world.add_body(floor()).expect("floor");
    let mut body = ball(0.5, Point3::new(0.0, 0.0, 1.0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    body.set_on_collision(move |_, other| {
        log.lock().expect("lock").push(other);
        true
    });
    let id = world.add_body(body).expect("ball");

    run(&mut world, 120);
    let z = world.body(id).expect("managed").position().z;
    assert!(z < -1.0, "suppressed ball should fall through the floor, z = {z}");
    assert_eq!(*seen.lock().expect("lock"), vec![floor_id], "callback fires once per touch");
}

#[test]
fn non_suppressing_callback_keeps_response() {
    let mut world = world(config(gravity()));
    world.add_body(floor()).expect("floor");
    let mut body = ball(0.5, Point3::new(0.0, 0.0, 0.5));
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    body.set_on_collision(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        false
    });
    let id = world.add_body(body).expect("ball");

    run(&mut world, 120);
    let z = world.body(id).expect("managed").position().z;
    assert!(z > 0.4, "ball should rest on the floor, z = {z}");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn collision_and_separation_fire_once_each() {
    let mut world = world(config(Vector3::zeros()));
    let anchor = world.add_body(ball(0.5, Point3::origin())).expect("anchor");

    let collisions = Arc::new(AtomicUsize::new(0));
    let separations = Arc::new(Mutex::new(Vec::<(BodyId, BodyId)>::new()));
    let mut mover = ball(0.5, Point3::new(0.95, 0.0, 0.0));
    mover.set_linear_velocity(Vector3::new(2.0, 0.0, 0.0));
    let c = Arc::clone(&collisions);
    mover.set_on_collision(move |_, _| {
        c.fetch_add(1, Ordering::SeqCst);
        false
    });
    let s = Arc::clone(&separations);
    mover.set_on_separation(move |me, other| s.lock().expect("lock").push((me, other)));
    let mover = world.add_body(mover).expect("mover");

    run(&mut world, 60);
    assert_eq!(collisions.load(Ordering::SeqCst), 1, "one collision for one touch");
    assert_eq!(
        *separations.lock().expect("lock"),
        vec![(mover, anchor)],
        "one separation, reported from the mover's side"
    );
    assert!(!world.body(mover).expect("managed").is_touching(anchor));
}

#[test]
fn either_side_can_suppress() {
    let mut world = world(config(Vector3::zeros()));
    let mut a = ball(0.5, Point3::origin());
    a.set_on_collision(|_, _| true);
    let a = world.add_body(a).expect("a");
    let mut b = ball(0.5, Point3::new(0.9, 0.0, 0.0));
    b.set_linear_velocity(Vector3::new(-1.0, 0.0, 0.0));
    let b = world.add_body(b).expect("b");

    run(&mut world, 1);
    assert!(world.body(a).expect("managed").is_touching(b));
    assert!(world.contacts_of(a).all(|c| c.is_suppressed()));
    // No response: b keeps its approach speed apart from damping.
    let vx = world.body(b).expect("managed").linear_velocity().x;
    assert!(vx < -0.9, "suppressed pair should not push apart, vx = {vx}");
}

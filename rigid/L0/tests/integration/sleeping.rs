//! Deactivation of still bodies and waking on contact.

use nalgebra::{Point3, Vector3};
use rigid_dynamics::BodyState;

use crate::common::{ball, config, floor, gravity, run, world, DT};

#[test]
fn still_body_sleeps_after_deactivation_time() {
    let mut world = world(config(Vector3::zeros()).with_deactivation_time(0.5));
    let id = world.add_body(ball(0.5, Point3::origin())).expect("ball");

    // 0.25 s of stillness is not enough.
    run(&mut world, 15);
    assert!(world.body(id).expect("managed").is_active());

    run(&mut world, 45);
    assert_eq!(world.body(id).expect("managed").state(), BodyState::Inactive);
}

#[test]
fn moving_body_stays_awake() {
    let mut world = world(config(Vector3::zeros()).with_deactivation_time(0.5));
    let mut body = ball(0.5, Point3::origin());
    body.set_linear_velocity(Vector3::new(5.0, 0.0, 0.0));
    let id = world.add_body(body).expect("ball");

    run(&mut world, 20);
    assert!(world.body(id).expect("managed").is_active());
}

#[test]
fn contact_with_active_body_wakes_sleeper_in_same_step() {
    let mut world = world(config(gravity()).with_deactivation_time(0.25));
    world.add_body(floor()).expect("floor");
    let sleeper = world.add_body(ball(0.5, Point3::new(0.0, 0.0, 0.5))).expect("sleeper");
    run(&mut world, 240);
    assert_eq!(
        world.body(sleeper).expect("managed").state(),
        BodyState::Inactive,
        "resting ball should be asleep before the hit"
    );

    let mut striker = ball(0.5, Point3::new(-3.0, 0.0, 0.5));
    striker.set_linear_velocity(Vector3::new(10.0, 0.0, 0.0));
    let striker = world.add_body(striker).expect("striker");

    let mut woke = false;
    for _ in 0..60 {
        world.integrate(DT).expect("step");
        let body = world.body(sleeper).expect("managed");
        if body.is_touching(striker) {
            assert!(body.is_active(), "a touched sleeper must wake within the step");
            woke = true;
            break;
        }
    }
    assert!(woke, "the striker never reached the sleeper");
}

#[test]
fn host_can_wake_a_sleeper() {
    let mut world = world(config(Vector3::zeros()).with_deactivation_time(0.1));
    let id = world.add_body(ball(0.5, Point3::origin())).expect("ball");
    run(&mut world, 30);
    assert!(!world.body(id).expect("managed").is_active());

    let body = world.body_mut(id).expect("managed");
    body.set_active(true);
    body.set_linear_velocity(Vector3::new(1.0, 0.0, 0.0));
    run(&mut world, 10);
    let body = world.body(id).expect("managed");
    assert!(body.is_active());
    assert!(body.position().x > 0.05, "woken ball should move, x = {}", body.position().x);
}

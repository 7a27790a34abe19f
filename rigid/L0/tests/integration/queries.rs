//! Ray queries and body removal against a live world.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use rigid_types::Segment;

use crate::common::{ball, config, cube, run, world};

#[test]
fn segment_hits_nearest_body() {
    let mut world = world(config(Vector3::zeros()));
    let near = world.add_body(ball(0.5, Point3::new(3.0, 0.0, 0.0))).expect("near");
    world.add_body(cube(1.0, Point3::new(6.0, 0.0, 0.0))).expect("far");
    run(&mut world, 1);

    let segment = Segment::new(Point3::origin(), Point3::new(10.0, 0.0, 0.0));
    let hit = world.intersect(&segment).expect("hit");
    assert_eq!(hit.owner, near);
    assert_relative_eq!(hit.point, Point3::new(2.5, 0.0, 0.0), epsilon = 1e-9);
    assert_relative_eq!(hit.scalar, 0.25, epsilon = 1e-9);

    let miss = Segment::new(Point3::new(0.0, 5.0, 0.0), Point3::new(10.0, 5.0, 0.0));
    assert!(world.intersect(&miss).is_none());
}

#[test]
fn removed_body_is_no_longer_hit_or_simulated() {
    let mut world = world(config(Vector3::zeros()));
    let near = world.add_body(ball(0.5, Point3::new(3.0, 0.0, 0.0))).expect("near");
    let far = world.add_body(cube(1.0, Point3::new(6.0, 0.0, 0.0))).expect("far");
    run(&mut world, 1);

    let removed = world.remove_body(near).expect("managed");
    assert_eq!(removed.id(), near);
    assert!(world.body(near).is_none());
    run(&mut world, 1);

    let segment = Segment::new(Point3::origin(), Point3::new(10.0, 0.0, 0.0));
    let hit = world.intersect(&segment).expect("hit");
    assert_eq!(hit.owner, far);
    assert_relative_eq!(hit.point.x, 5.5, epsilon = 1e-9);

    // Back in, at the same place.
    assert_eq!(world.add_body(removed).expect("re-add"), near);
    run(&mut world, 1);
    assert_eq!(world.intersect(&segment).map(|h| h.owner), Some(near));
}

//! Sphere against plane.

use nalgebra::{Point3, Vector3};

use rigid_types::EPSILON;

use super::ContactSink;
use crate::part::{PlanePart, SpherePart};

fn touches(a: &SpherePart, b: &PlanePart, center: &Point3<f64>) -> bool {
    let plane = b.world();
    plane.normal.dot(&center.coords) - plane.normal.dot(&plane.p.coords) - a.world().radius
        < EPSILON
}

// The point on the sphere is always taken at its current position; the
// plane point follows the tested position.
fn write(a: &SpherePart, b: &PlanePart, tested: &Point3<f64>, sink: &mut dyn ContactSink) {
    let plane = b.world();
    let sphere = a.world();
    let pb = plane.closest_point_to(tested);
    let pa = sphere.center - plane.normal * sphere.radius;
    sink.write_point(&pa, &pb, &plane.normal);
}

pub(super) fn overlap(a: &SpherePart, b: &PlanePart, sink: &mut dyn ContactSink) -> bool {
    let center = a.world().center;
    if !touches(a, b, &center) {
        return false;
    }
    write(a, b, &center, sink);
    true
}

pub(super) fn swept(
    a: &SpherePart,
    b: &PlanePart,
    delta: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    if overlap(a, b, sink) {
        return true;
    }
    let moved = a.world().center + delta;
    if !touches(a, b, &moved) {
        return false;
    }
    write(a, b, &moved, sink);
    true
}

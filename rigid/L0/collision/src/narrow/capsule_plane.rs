//! Capsule against plane.

use nalgebra::Vector3;

use rigid_types::EPSILON;

use super::ContactSink;
use crate::part::{CapsulePart, PlanePart};

pub(super) fn overlap(a: &CapsulePart, b: &PlanePart, sink: &mut dyn ContactSink) -> bool {
    test(a, b, 0.0, sink)
}

// Each end cap is tested as if already moved as far toward the plane as the
// step allows.
pub(super) fn swept(
    a: &CapsulePart,
    b: &PlanePart,
    delta: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    let dx = b.world().normal.dot(delta).min(0.0);
    test(a, b, dx, sink)
}

fn test(a: &CapsulePart, b: &PlanePart, dx: f64, sink: &mut dyn ContactSink) -> bool {
    let (capsule, plane) = (a.world(), b.world());
    let n = plane.normal;
    let bx = n.dot(&plane.p.coords);
    let mut hit = false;
    for end in [capsule.p1, capsule.p2] {
        if n.dot(&end.coords) - bx - capsule.radius + dx < EPSILON {
            let pa = end - n * capsule.radius;
            let pb = plane.closest_point_to(&pa);
            sink.write_point(&pa, &pb, &n);
            hit = true;
        }
    }
    hit
}

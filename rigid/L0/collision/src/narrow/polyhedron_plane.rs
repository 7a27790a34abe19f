//! Polyhedron against plane.

use nalgebra::Vector3;

use rigid_types::EPSILON;

use super::ContactSink;
use crate::part::PlanePart;
use crate::polyhedron::PolyhedronPart;

pub(super) fn overlap(a: &PolyhedronPart, b: &PlanePart, sink: &mut dyn ContactSink) -> bool {
    test(a, b, 0.0, sink)
}

pub(super) fn swept(
    a: &PolyhedronPart,
    b: &PlanePart,
    delta: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    let dx = b.world().normal.dot(delta).min(0.0);
    test(a, b, -dx, sink)
}

// Only the faces around the deepest vertex can touch; their vertices below
// the plane (raised by `offset`) become contacts.
fn test(a: &PolyhedronPart, b: &PlanePart, offset: f64, sink: &mut dyn ContactSink) -> bool {
    let plane = b.world();
    let n = plane.normal;
    let deepest = a.extreme_vertex(&-n).index;
    let bx = n.dot(&(plane.p + n * offset).coords);

    let mut hit = false;
    for v in a.faces_around(deepest) {
        let pa = a.world(v);
        if n.dot(&pa.coords) - bx < EPSILON {
            sink.write_point(&pa, &plane.closest_point_to(&pa), &n);
            hit = true;
        }
    }
    hit
}

//! Capsule against triangle mesh.

use nalgebra::{Point3, Vector3};

use rigid_types::{AlignedBox, Segment, Transform, Triangle, EPSILON};

use super::{normalize_or, stepped, ContactSink};
use crate::mesh::{MeshPart, TriangleScratch};
use crate::part::CapsulePart;

pub(super) fn overlap(
    a: &CapsulePart,
    b: &MeshPart,
    scratch: &mut TriangleScratch,
    sink: &mut dyn ContactSink,
) -> bool {
    overlap_at(a, b, &Vector3::zeros(), scratch, sink)
}

pub(super) fn swept(
    a: &CapsulePart,
    b: &MeshPart,
    delta: &Vector3<f64>,
    scratch: &mut TriangleScratch,
    sink: &mut dyn ContactSink,
) -> bool {
    stepped(delta, a.world().radius, |offset| overlap_at(a, b, offset, scratch, sink))
}

// Separation direction for a contact off the triangle interior, turned to
// the front side when the capsule point lies behind the triangle.
fn edge_normal(tri: &Triangle, pa: &Point3<f64>, pb: &Point3<f64>) -> Vector3<f64> {
    let mut n = pa - pb;
    let d = n.dot(&tri.normal);
    if d <= -EPSILON {
        n += tri.normal * (-2.0 * d);
    }
    normalize_or(&n, tri.normal)
}

struct Emitter<'a> {
    to_world: &'a Transform,
    radius: f64,
    offset: &'a Vector3<f64>,
}

impl Emitter<'_> {
    // Map a body-space contact to world space and move `pa` from the axis to
    // the capsule surface at its undisplaced position.
    fn write(
        &self,
        sink: &mut dyn ContactSink,
        pa: &Point3<f64>,
        pb: &Point3<f64>,
        n: &Vector3<f64>,
    ) {
        let n = self.to_world.rotate(n);
        let pa = self.to_world.transform_point(pa) - n * self.radius - self.offset;
        sink.write_point(&pa, &self.to_world.transform_point(pb), &n);
    }
}

fn overlap_at(
    a: &CapsulePart,
    b: &MeshPart,
    offset: &Vector3<f64>,
    scratch: &mut TriangleScratch,
    sink: &mut dyn ContactSink,
) -> bool {
    let capsule = a.world();
    let to_body = b.transform_inverse();
    let axis = Segment::new(
        to_body.transform_point(&(capsule.p1 + offset)),
        to_body.transform_point(&(capsule.p2 + offset)),
    );
    let r = capsule.radius * to_body.scale();
    let r2 = r * r;
    let mut query = AlignedBox::fit2(&axis.p1, &axis.p2);
    query.min -= Vector3::repeat(r);
    query.max += Vector3::repeat(r);

    let emit = Emitter {
        to_world: b.transform(),
        radius: capsule.radius,
        offset,
    };
    let mut hit = false;
    b.process_triangles(&query, scratch, |triangles| {
        for tri in triangles {
            let mut count = 0;
            for pa in [axis.p1, axis.p2] {
                let (pb, interior) = tri.closest_point_to(&pa);
                if (pa - pb).norm_squared() - r2 >= EPSILON {
                    continue;
                }
                let n = if interior {
                    tri.normal
                } else {
                    edge_normal(tri, &pa, &pb)
                };
                emit.write(sink, &pa, &pb, &n);
                count += 1;
            }
            hit |= count > 0;
            if count > 1 {
                continue;
            }

            // The axis itself may cross close to an edge or the face.
            let closest = tri.closest_point_to_segment(&axis);
            let (pa, pb) = (closest.segment_point, closest.triangle_point);
            if closest.scalar < EPSILON
                || closest.scalar > 1.0 - EPSILON
                || (pa - pb).norm_squared() - r2 >= EPSILON
            {
                continue;
            }
            let n = if closest.is_interior {
                tri.normal
            } else {
                edge_normal(tri, &pa, &pb)
            };
            emit.write(sink, &pa, &pb, &n);
            hit = true;
        }
    });
    hit
}

//! Sphere against convex polyhedron.

use nalgebra::{Point3, Vector3};

use rigid_types::{Plane, Segment, EPSILON};

use super::{normalize_or, ContactSink};
use crate::part::SpherePart;
use crate::polyhedron::PolyhedronPart;

pub(super) fn overlap(a: &SpherePart, b: &PolyhedronPart, sink: &mut dyn ContactSink) -> bool {
    let sphere = a.world();
    let (c, r) = (sphere.center, sphere.radius);

    // Face of least penetration; any face the sphere is fully outside of
    // separates the shapes.
    let mut best: Option<(usize, f64)> = None;
    for i in 0..b.face_count() {
        let n = b.face_normal(i);
        let depth = n.dot(&b.world(b.face(i)[0]).coords) + r - n.dot(&c.coords);
        if depth < 0.0 {
            return false;
        }
        if best.map_or(true, |(_, d)| depth < d) {
            best = Some((i, depth));
        }
    }
    let Some((face, _)) = best else {
        return false;
    };

    let mut normal = b.face_normal(face);
    let mut pb = b.face_plane(face).closest_point_to(&c);
    if !b.is_point_on_face(face, &pb, true) {
        let mut nearest: Option<(f64, Point3<f64>)> = None;
        for edge in b.face_edges(face) {
            let (_, q) = edge.closest_point_to(&c);
            let dist = (c - q).norm_squared();
            if dist - r * r < EPSILON && nearest.map_or(true, |(d, _)| dist < d) {
                nearest = Some((dist, q));
            }
        }
        let Some((_, q)) = nearest else {
            return false;
        };
        pb = q;
        normal = normalize_or(&(c - q), normal);
    }

    sink.write_point(&(c - normal * r), &pb, &normal);
    true
}

// Per face the sphere moves toward: the path against the face plane pushed
// out by the radius, then against the face edges inflated by the radius.
pub(super) fn swept(
    a: &SpherePart,
    b: &PolyhedronPart,
    delta: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    let sphere = a.world();
    let (c, r) = (sphere.center, sphere.radius);
    let r2 = r * r;
    let path = Segment::new(c, c + delta);

    let mut scalar = f64::INFINITY;
    let mut normal = Vector3::zeros();
    let mut pb = Point3::origin();

    for i in 0..b.face_count() {
        let n = b.face_normal(i);
        let p = b.world(b.face(i)[0]);
        if n.dot(delta) > 0.0 || n.dot(&c.coords) < n.dot(&p.coords) {
            continue;
        }

        let raised = Plane::new(p + n * r, n);
        if let Some((_, crossing)) = raised.intersect_segment(&path) {
            if b.is_point_on_face(i, &crossing, true) {
                let on_face = Plane::new(p, n).closest_point_to(&crossing);
                sink.write_point(&(c - n * r), &on_face, &n);
                return true;
            }
        }

        for edge in b.face_edges(i) {
            let closest = Segment::closest_points(&path, &edge);
            if closest.distance_squared() - r2 >= EPSILON {
                continue;
            }
            if (scalar - closest.scalar_a).abs() < EPSILON {
                normal += n;
            } else if closest.scalar_a < scalar {
                normal = n;
                pb = closest.point_b;
                scalar = closest.scalar_a;
            }
        }
    }

    if !(0.0..=1.0).contains(&scalar) {
        return false;
    }
    let normal = normalize_or(&normal, Vector3::z());
    sink.write_point(&(c - normal * r), &pb, &normal);
    true
}

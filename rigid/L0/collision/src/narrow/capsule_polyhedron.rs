//! Capsule against convex polyhedron.

use nalgebra::{Point3, Vector3};

use rigid_types::{Segment, EPSILON};

use super::{normalize_or, stepped, ContactSink};
use crate::part::CapsulePart;
use crate::polyhedron::PolyhedronPart;

type PointPair = (Point3<f64>, Point3<f64>);

pub(super) fn overlap(a: &CapsulePart, b: &PolyhedronPart, sink: &mut dyn ContactSink) -> bool {
    overlap_at(a, b, &Vector3::zeros(), sink)
}

pub(super) fn swept(
    a: &CapsulePart,
    b: &PolyhedronPart,
    delta: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    stepped(delta, a.world().radius, |offset| overlap_at(a, b, offset, sink))
}

// Remembers the last edge that produced a point so a point at a shared
// vertex is not taken twice from adjacent edges.
#[derive(Default)]
struct EdgeChain {
    last: Option<(usize, f64)>,
}

impl EdgeChain {
    // The closing edge meets the first edge at the same vertex.
    fn closes_loop(&self, edge: usize, edge_count: usize, sb: f64) -> bool {
        edge == edge_count - 1 && sb >= 1.0 && matches!(self.last, Some((0, _)))
    }

    fn continues(&self, edge: usize) -> bool {
        matches!(self.last, Some((prev, sb)) if prev + 1 == edge && sb >= 1.0)
    }

    fn record(&mut self, edge: usize, sb: f64) {
        self.last = Some((edge, sb));
    }
}

fn overlap_at(
    a: &CapsulePart,
    b: &PolyhedronPart,
    offset: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    let capsule = a.world();
    let r = capsule.radius;
    let r2 = r * r;
    let axis = Segment::new(capsule.p1 + offset, capsule.p2 + offset);

    let mut best: Option<(usize, f64)> = None;
    for i in 0..b.face_count() {
        let n = b.face_normal(i);
        let bx = n.dot(&b.world(b.face(i)[0]).coords) + r;
        let depth = (bx - n.dot(&axis.p1.coords)).max(bx - n.dot(&axis.p2.coords));
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

    let plane = b.face_plane(face);
    let mut normal = plane.normal;
    let bx = normal.dot(&plane.p.coords) + r;
    let edge_count = b.face(face).len();

    // Axis endpoints resting on the face.
    let mut first: Option<PointPair> = None;
    let mut second: Option<PointPair> = None;
    for p in [axis.p1, axis.p2] {
        let q = plane.closest_point_to(&p);
        if normal.dot(&p.coords) - bx < EPSILON && b.is_point_on_face(face, &q, true) {
            if first.is_none() {
                first = Some((p, q));
            } else {
                second = Some((p, q));
            }
        }
    }

    match (first.is_some(), second.is_some()) {
        (true, false) => {
            // One end is on the face; the other support point is where the
            // axis passes over a face edge.
            let mut chain = EdgeChain::default();
            for (i, edge) in b.face_edges(face).enumerate() {
                let c = Segment::closest_points(&axis, &edge);
                if c.distance_squared() - r2 >= EPSILON
                    || c.scalar_a < EPSILON
                    || c.scalar_a >= 1.0 - EPSILON
                {
                    continue;
                }
                if chain.closes_loop(i, edge_count, c.scalar_b) {
                    continue;
                }
                if second.is_none() || chain.continues(i) {
                    second = Some((c.point_a, c.point_b));
                }
                chain.record(i, c.scalar_b);
            }
        }
        (false, _) => {
            // Neither end is over the face, so the axis can only touch its
            // edges.
            let mut chain = EdgeChain::default();
            for (i, edge) in b.face_edges(face).enumerate() {
                let c = Segment::closest_points(&axis, &edge);
                if c.distance_squared() - r2 >= EPSILON || c.scalar_b <= EPSILON {
                    continue;
                }
                if chain.closes_loop(i, edge_count, c.scalar_b) {
                    continue;
                }
                if first.is_none() || chain.continues(i) {
                    first = Some((c.point_a, c.point_b));
                } else if second.is_none() {
                    second = Some((c.point_a, c.point_b));
                }
                chain.record(i, c.scalar_b);
            }

            // A single edge crossing pushes along the edge separation rather
            // than the face normal.
            if let (Some((pa, pb)), None) = (first, second) {
                normal = normalize_or(&(pa - pb), normal);
            }
        }
        (true, true) => {}
    }

    let mut hit = false;
    for (pa, pb) in [first, second].into_iter().flatten() {
        sink.write_point(&(pa - normal * r - offset), &pb, &normal);
        hit = true;
    }
    hit
}

//! Separating-axis tests between a polyhedron and a convex hull.
//!
//! The hull is either another polyhedron or a single mesh triangle. Candidate
//! axes are the face normals of both shapes and the cross products of every
//! pair of edge directions. The axis of least penetration wins, its extreme
//! features are classified as vertex, edge or face, and the feature pair
//! decides how contact points are clipped.

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use rigid_types::{Feature, FeatureKind, Plane, Segment, Triangle, EPSILON};

use super::ContactSink;
use crate::polyhedron::PolyhedronPart;

pub(super) type FacePoints = SmallVec<[Point3<f64>; 8]>;

/// World-space view of a convex shape for the separating-axis test.
pub(super) trait Hull {
    fn center(&self) -> Point3<f64>;
    fn face_count(&self) -> usize;
    fn face_normal(&self, index: usize) -> Vector3<f64>;
    fn face_point(&self, index: usize) -> Point3<f64>;
    fn face_points(&self, index: usize) -> FacePoints;
    fn face_contains(&self, index: usize, p: &Point3<f64>) -> bool;
    fn edge_vector_count(&self) -> usize;
    fn edge_vector(&self, index: usize) -> Vector3<f64>;
    fn vertex(&self, index: usize) -> Point3<f64>;
    fn edge_segment(&self, index: usize) -> Segment;
    fn extreme_vertex(&self, d: &Vector3<f64>) -> Feature;
    fn extreme_feature_at_depth(&self, d: &Vector3<f64>, depth: f64) -> Feature;

    /// Whether the hull is a single flat face with no thickness.
    fn is_flat(&self) -> bool {
        false
    }
}

impl Hull for PolyhedronPart {
    fn center(&self) -> Point3<f64> {
        PolyhedronPart::center(self)
    }

    fn face_count(&self) -> usize {
        PolyhedronPart::face_count(self)
    }

    fn face_normal(&self, index: usize) -> Vector3<f64> {
        PolyhedronPart::face_normal(self, index)
    }

    fn face_point(&self, index: usize) -> Point3<f64> {
        self.world(self.face(index)[0])
    }

    fn face_points(&self, index: usize) -> FacePoints {
        self.face(index).iter().map(|&v| self.world(v)).collect()
    }

    fn face_contains(&self, index: usize, p: &Point3<f64>) -> bool {
        self.is_point_on_face(index, p, true)
    }

    fn edge_vector_count(&self) -> usize {
        PolyhedronPart::edge_vector_count(self)
    }

    fn edge_vector(&self, index: usize) -> Vector3<f64> {
        PolyhedronPart::edge_vector(self, index)
    }

    fn vertex(&self, index: usize) -> Point3<f64> {
        self.world(index)
    }

    fn edge_segment(&self, index: usize) -> Segment {
        PolyhedronPart::edge_segment(self, index)
    }

    fn extreme_vertex(&self, d: &Vector3<f64>) -> Feature {
        PolyhedronPart::extreme_vertex(self, d)
    }

    fn extreme_feature_at_depth(&self, d: &Vector3<f64>, depth: f64) -> Feature {
        PolyhedronPart::extreme_feature_at_depth(self, d, depth)
    }
}

impl Hull for Triangle {
    fn center(&self) -> Point3<f64> {
        Triangle::center(self)
    }

    fn face_count(&self) -> usize {
        1
    }

    fn face_normal(&self, _index: usize) -> Vector3<f64> {
        self.normal
    }

    fn face_point(&self, _index: usize) -> Point3<f64> {
        self.v1
    }

    fn face_points(&self, _index: usize) -> FacePoints {
        SmallVec::from_slice(&[self.v1, self.v2, self.v3])
    }

    fn face_contains(&self, _index: usize, p: &Point3<f64>) -> bool {
        self.contains(p)
    }

    fn edge_vector_count(&self) -> usize {
        3
    }

    fn edge_vector(&self, index: usize) -> Vector3<f64> {
        Triangle::edge_vector(self, index)
    }

    fn vertex(&self, index: usize) -> Point3<f64> {
        Triangle::vertex(self, index)
    }

    fn edge_segment(&self, index: usize) -> Segment {
        self.edge(index)
    }

    fn extreme_vertex(&self, d: &Vector3<f64>) -> Feature {
        Triangle::extreme_vertex(self, d)
    }

    fn extreme_feature_at_depth(&self, d: &Vector3<f64>, depth: f64) -> Feature {
        Triangle::extreme_feature_at_depth(self, d, depth)
    }

    fn is_flat(&self) -> bool {
        true
    }
}

/// A candidate separating axis with the extreme features of both shapes.
///
/// `normal` points from the hull toward the polyhedron. Feature projections
/// are along `normal`, so `depth = feature_b.x - feature_a.x`.
#[derive(Debug, Clone, Copy)]
pub(super) struct Axis {
    pub feature_a: Feature,
    pub feature_b: Feature,
    pub normal: Vector3<f64>,
    pub depth: f64,
}

impl Axis {
    fn unset() -> Self {
        Self {
            feature_a: Feature::none(0.0),
            feature_b: Feature::none(0.0),
            normal: Vector3::zeros(),
            depth: f64::INFINITY,
        }
    }

    fn along<A: Hull, B: Hull>(a: &A, b: &B, normal: Vector3<f64>) -> Self {
        let mut feature_a = a.extreme_vertex(&-normal);
        feature_a.x = -feature_a.x;
        let feature_b = b.extreme_vertex(&normal);
        Self {
            feature_a,
            feature_b,
            normal,
            depth: feature_b.x - feature_a.x,
        }
    }
}

/// Order in which face axes are tried. Ties keep the earlier axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FaceOrder {
    PolyhedronFirst,
    HullFirst,
}

fn polyhedron_face_axis<B: Hull>(a: &PolyhedronPart, b: &B, index: usize) -> Axis {
    let normal = -Hull::face_normal(a, index);
    let feature_a = Feature::new(
        FeatureKind::Face,
        index,
        normal.dot(&Hull::face_point(a, index).coords),
    );
    let feature_b = b.extreme_vertex(&normal);
    Axis {
        feature_a,
        feature_b,
        normal,
        depth: feature_b.x - feature_a.x,
    }
}

fn hull_face_axis<B: Hull>(a: &PolyhedronPart, b: &B, index: usize) -> Axis {
    let normal = b.face_normal(index);
    let feature_b = Feature::new(FeatureKind::Face, index, normal.dot(&b.face_point(index).coords));
    let mut feature_a = Hull::extreme_vertex(a, &-normal);
    feature_a.x = -feature_a.x;
    Axis {
        feature_a,
        feature_b,
        normal,
        depth: feature_b.x - feature_a.x,
    }
}

fn face_axis<B: Hull>(a: &PolyhedronPart, b: &B, order: FaceOrder, k: usize) -> Axis {
    let first = match order {
        FaceOrder::PolyhedronFirst => Hull::face_count(a),
        FaceOrder::HullFirst => b.face_count(),
    };
    match (order, k < first) {
        (FaceOrder::PolyhedronFirst, true) => polyhedron_face_axis(a, b, k),
        (FaceOrder::PolyhedronFirst, false) => hull_face_axis(a, b, k - first),
        (FaceOrder::HullFirst, true) => hull_face_axis(a, b, k),
        (FaceOrder::HullFirst, false) => polyhedron_face_axis(a, b, k - first),
    }
}

// Cross product of two edge directions, oriented from the hull toward the
// polyhedron. None when the edges are parallel.
fn edge_normal(
    ea: &Vector3<f64>,
    eb: &Vector3<f64>,
    center_a: &Point3<f64>,
    center_b: &Point3<f64>,
) -> Option<Vector3<f64>> {
    let n = ea.cross(eb);
    if n.norm_squared() < EPSILON {
        return None;
    }
    let n = n.normalize();
    Some(if n.dot(&center_a.coords) < n.dot(&center_b.coords) {
        -n
    } else {
        n
    })
}

fn is_duplicate(normal: &Vector3<f64>, current: &Axis) -> bool {
    (1.0 - normal.dot(&current.normal)).abs() < EPSILON
}

// An axis lying in the plane of a flat hull can separate, but never becomes
// the contact normal: contacts with a surface push out along its normal.
fn in_surface<B: Hull>(b: &B, normal: &Vector3<f64>) -> bool {
    b.is_flat() && b.face_normal(0).dot(normal).abs() < EPSILON
}

// Grow vertex features into the edge or face that reaches the contact depth.
fn promote<B: Hull>(a: &PolyhedronPart, b: &B, mut axis: Axis, dx: f64) -> Axis {
    if axis.feature_a.kind == FeatureKind::Vertex {
        let mut f = Hull::extreme_feature_at_depth(a, &-axis.normal, dx - axis.feature_b.x);
        f.x = -f.x;
        axis.feature_a = f;
    }
    if axis.feature_b.kind == FeatureKind::Vertex {
        axis.feature_b = b.extreme_feature_at_depth(&axis.normal, dx + axis.feature_a.x);
    }
    axis
}

/// Static test. Returns the axis of least penetration, or `None` when some
/// axis separates the shapes.
pub(super) fn overlap_axis<B: Hull>(a: &PolyhedronPart, b: &B, order: FaceOrder) -> Option<Axis> {
    let mut best = Axis::unset();

    for k in 0..Hull::face_count(a) + b.face_count() {
        let axis = face_axis(a, b, order, k);
        if axis.depth <= -EPSILON {
            return None;
        }
        if axis.depth < best.depth {
            best = axis;
        }
    }

    let (center_a, center_b) = (Hull::center(a), b.center());
    for i in 0..Hull::edge_vector_count(a) {
        let ea = Hull::edge_vector(a, i);
        for j in 0..b.edge_vector_count() {
            let Some(normal) = edge_normal(&ea, &b.edge_vector(j), &center_a, &center_b) else {
                continue;
            };
            if is_duplicate(&normal, &best) {
                continue;
            }
            let axis = Axis::along(a, b, normal);
            if axis.depth <= -EPSILON {
                return None;
            }
            if best.depth - axis.depth >= EPSILON && !in_surface(b, &normal) {
                best = axis;
            }
        }
    }

    Some(promote(a, b, best, 0.0))
}

struct Sweep {
    best: Axis,
    time: f64,
    last: f64,
    tolerance: f64,
}

impl Sweep {
    // Fold one axis into the entry/exit window. False once the axis proves
    // the shapes stay apart for the whole step.
    fn consider(&mut self, axis: Axis, delta: &Vector3<f64>, can_win: bool) -> bool {
        let dx = delta.dot(&axis.normal);
        let t = axis.depth / dx;
        if axis.depth >= -self.tolerance {
            if can_win && self.time <= 0.0 && axis.depth < self.best.depth {
                self.best = axis;
                self.time = 0.0;
            }
            if dx > 0.0 && t < self.last {
                self.last = t;
            }
        } else {
            if dx >= 0.0 || t > 1.0 {
                return false;
            }
            if t > self.time {
                self.best = axis;
                self.time = t;
            }
        }
        true
    }
}

/// Swept test where the polyhedron moves by `delta` relative to the hull.
///
/// Tracks the latest entry time and the earliest exit time over all axes;
/// the shapes touch within the step only if entry precedes exit. Axes count
/// as touching down to `-tolerance`.
pub(super) fn swept_axis<B: Hull>(
    a: &PolyhedronPart,
    b: &B,
    delta: &Vector3<f64>,
    order: FaceOrder,
    tolerance: f64,
) -> Option<Axis> {
    let mut sweep = Sweep {
        best: Axis::unset(),
        time: 0.0,
        last: f64::INFINITY,
        tolerance,
    };

    for k in 0..Hull::face_count(a) + b.face_count() {
        if !sweep.consider(face_axis(a, b, order, k), delta, true) {
            return None;
        }
    }

    let (center_a, center_b) = (Hull::center(a), b.center());
    for i in 0..Hull::edge_vector_count(a) {
        let ea = Hull::edge_vector(a, i);
        for j in 0..b.edge_vector_count() {
            let Some(normal) = edge_normal(&ea, &b.edge_vector(j), &center_a, &center_b) else {
                continue;
            };
            if is_duplicate(&normal, &sweep.best) {
                continue;
            }
            if !sweep.consider(Axis::along(a, b, normal), delta, !in_surface(b, &normal)) {
                return None;
            }
        }
    }

    if sweep.time >= sweep.last || sweep.best.depth.is_infinite() {
        return None;
    }
    // Features are grown at the time of impact.
    let dx = if sweep.time <= 0.0 {
        0.0
    } else {
        sweep.best.normal.dot(delta) * sweep.time
    };
    Some(promote(a, b, sweep.best, dx))
}

fn face_plane<H: Hull>(hull: &H, face: usize) -> Plane {
    Plane::new(hull.face_point(face), hull.face_normal(face))
}

// Boundary edges of a face, each from the previous vertex to the current.
fn face_edges<H: Hull>(hull: &H, face: usize) -> SmallVec<[Segment; 8]> {
    let points = hull.face_points(face);
    (0..points.len())
        .map(|i| {
            let prev = if i == 0 { points.len() - 1 } else { i - 1 };
            Segment::new(points[prev], points[i])
        })
        .collect()
}

fn is_interior(s: f64) -> bool {
    s > 0.0 && s < 1.0
}

/// Write the contact points for the classified feature pair of `axis`.
/// Returns the number of points written.
pub(super) fn write_contacts<B: Hull>(
    a: &PolyhedronPart,
    b: &B,
    axis: &Axis,
    sink: &mut dyn ContactSink,
) -> usize {
    use FeatureKind::{Edge, Face, Vertex};

    let n = &axis.normal;
    let (fa, fb) = (axis.feature_a, axis.feature_b);
    match (fa.kind, fb.kind) {
        (Vertex, Vertex) => {
            sink.write_point(&Hull::vertex(a, fa.index), &b.vertex(fb.index), n);
            1
        }
        (Edge, Vertex) => {
            let pb = b.vertex(fb.index);
            let (_, pa) = Hull::edge_segment(a, fa.index).closest_point_to(&pb);
            sink.write_point(&pa, &pb, n);
            1
        }
        (Face, Vertex) => {
            let pb = b.vertex(fb.index);
            let pa = face_plane(a, fa.index).closest_point_to(&pb);
            sink.write_point(&pa, &pb, n);
            1
        }
        (Vertex, Edge) => {
            let pa = Hull::vertex(a, fa.index);
            let (_, pb) = b.edge_segment(fb.index).closest_point_to(&pa);
            sink.write_point(&pa, &pb, n);
            1
        }
        (Edge, Edge) => {
            let c = Segment::closest_points(&Hull::edge_segment(a, fa.index), &b.edge_segment(fb.index));
            sink.write_point(&c.point_a, &c.point_b, n);
            1
        }
        (Face, Edge) => face_edge(a, fa.index, &b.edge_segment(fb.index), n, true, sink),
        (Vertex, Face) => {
            let pa = Hull::vertex(a, fa.index);
            let pb = face_plane(b, fb.index).closest_point_to(&pa);
            sink.write_point(&pa, &pb, n);
            1
        }
        (Edge, Face) => face_edge(b, fb.index, &Hull::edge_segment(a, fa.index), n, false, sink),
        (Face, Face) => face_face(a, fa.index, b, fb.index, n, sink),
        _ => 0,
    }
}

// An edge against a face: edge endpoints that project onto the face, then
// crossings of the edge with the face boundary, two points at most.
fn face_edge<H: Hull>(
    hull: &H,
    face: usize,
    edge: &Segment,
    normal: &Vector3<f64>,
    face_on_a: bool,
    sink: &mut dyn ContactSink,
) -> usize {
    let mut write = |on_face: &Point3<f64>, on_edge: &Point3<f64>| {
        if face_on_a {
            sink.write_point(on_face, on_edge, normal);
        } else {
            sink.write_point(on_edge, on_face, normal);
        }
    };

    let plane = face_plane(hull, face);
    let mut count = 0;
    for p in [edge.p1, edge.p2] {
        let q = plane.closest_point_to(&p);
        if hull.face_contains(face, &q) {
            write(&q, &p);
            count += 1;
        }
    }
    for boundary in face_edges(hull, face) {
        if count >= 2 {
            break;
        }
        let c = Segment::closest_points(&boundary, edge);
        if is_interior(c.scalar_a) && is_interior(c.scalar_b) {
            write(&c.point_a, &c.point_b);
            count += 1;
        }
    }
    count
}

// Two faces: vertices of each inside the other, plus boundary crossings.
// Parallel boundaries are covered by the vertices, and a point already
// written is not written again.
fn face_face<B: Hull>(
    a: &PolyhedronPart,
    face_a: usize,
    b: &B,
    face_b: usize,
    normal: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> usize {
    let mut written: SmallVec<[Point3<f64>; 16]> = SmallVec::new();
    let mut write = |pa: &Point3<f64>, pb: &Point3<f64>| {
        if written.iter().any(|p| (p - pa).norm_squared() < EPSILON) {
            return;
        }
        sink.write_point(pa, pb, normal);
        written.push(*pa);
    };

    let plane_b = face_plane(b, face_b);
    for pa in Hull::face_points(a, face_a) {
        let pb = plane_b.closest_point_to(&pa);
        if b.face_contains(face_b, &pb) {
            write(&pa, &pb);
        }
    }

    let plane_a = face_plane(a, face_a);
    for pb in b.face_points(face_b) {
        let pa = plane_a.closest_point_to(&pb);
        if Hull::face_contains(a, face_a, &pa) {
            write(&pa, &pb);
        }
    }

    let edges_b = face_edges(b, face_b);
    for ea in face_edges(a, face_a) {
        for eb in &edges_b {
            if ea.delta().cross(&eb.delta()).norm_squared() < EPSILON {
                continue;
            }
            let c = Segment::closest_points(&ea, eb);
            if is_interior(c.scalar_a) && is_interior(c.scalar_b) {
                write(&c.point_a, &c.point_b);
            }
        }
    }
    written.len()
}

//! Narrow-phase contact generation.
//!
//! Every registered pair of [`ShapeKind`]s has a static overlap test and a
//! swept test. Pairs are looked up in canonical order (the lower kind first);
//! a reversed pair runs the canonical test with the parts swapped and a sink
//! adapter that swaps the points back and flips the normal, so callers always
//! see points on `a`, points on `b` and a normal from `b` toward `a`.
//!
//! Pairs without a test (plane-plane, mesh-mesh, mesh-plane) report no
//! contact.

use nalgebra::{Point3, Vector3};
use tracing::debug;

use rigid_types::{Triangle, EPSILON};

use crate::mesh::TriangleScratch;
use crate::part::{Part, ShapeKind};

mod capsule_capsule;
mod capsule_mesh;
mod capsule_plane;
mod capsule_polyhedron;
mod polyhedron_mesh;
mod polyhedron_plane;
mod polyhedron_polyhedron;
mod sat;
mod sphere_capsule;
mod sphere_mesh;
mod sphere_plane;
mod sphere_polyhedron;
mod sphere_sphere;

/// Upper bound on sub-steps of a stepped sweep.
pub const MAX_SUB_STEPS: usize = 64;

/// Receiver of generated contact points.
pub trait ContactSink {
    /// Record one contact. `point_a` lies on the first part, `point_b` on the
    /// second, and `normal` is a unit vector pointing from `b` toward `a`.
    fn write_point(&mut self, point_a: &Point3<f64>, point_b: &Point3<f64>, normal: &Vector3<f64>);
}

/// A contact point as produced by the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratedPoint {
    /// Point on the first part.
    pub point_a: Point3<f64>,
    /// Point on the second part.
    pub point_b: Point3<f64>,
    /// Unit normal from the second part toward the first.
    pub normal: Vector3<f64>,
}

impl GeneratedPoint {
    /// Penetration depth along the normal; positive when overlapping.
    #[must_use]
    pub fn depth(&self) -> f64 {
        (self.point_b - self.point_a).dot(&self.normal)
    }
}

impl ContactSink for Vec<GeneratedPoint> {
    fn write_point(&mut self, point_a: &Point3<f64>, point_b: &Point3<f64>, normal: &Vector3<f64>) {
        self.push(GeneratedPoint {
            point_a: *point_a,
            point_b: *point_b,
            normal: *normal,
        });
    }
}

struct Swapped<'a>(&'a mut dyn ContactSink);

impl ContactSink for Swapped<'_> {
    fn write_point(&mut self, point_a: &Point3<f64>, point_b: &Point3<f64>, normal: &Vector3<f64>) {
        self.0.write_point(point_b, point_a, &-normal);
    }
}

/// Narrow-phase test runner.
///
/// Holds the triangle scratch used by mesh tests, so each worker should own
/// its own instance.
#[derive(Debug, Default)]
pub struct NarrowPhase {
    scratch: TriangleScratch,
}

impl NarrowPhase {
    /// Create a runner with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a test is registered for the two kinds, in either order.
    #[must_use]
    pub fn has_test(a: ShapeKind, b: ShapeKind) -> bool {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        !matches!(
            (lo, hi),
            (ShapeKind::Plane, ShapeKind::Plane)
                | (ShapeKind::Mesh, ShapeKind::Mesh)
                | (ShapeKind::Mesh, ShapeKind::Plane)
        )
    }

    /// Static overlap test. Returns whether any contact was written.
    pub fn overlap_test(&mut self, a: &Part, b: &Part, sink: &mut dyn ContactSink) -> bool {
        if a.kind() <= b.kind() {
            self.dispatch(a, b, None, sink)
        } else {
            self.dispatch(b, a, None, &mut Swapped(sink))
        }
    }

    /// Swept test where `a` moves by `delta` relative to `b` over the step.
    /// Returns whether any contact was written.
    pub fn swept_test(
        &mut self,
        a: &Part,
        b: &Part,
        delta: &Vector3<f64>,
        sink: &mut dyn ContactSink,
    ) -> bool {
        if a.kind() <= b.kind() {
            self.dispatch(a, b, Some(delta), sink)
        } else {
            let reversed = -delta;
            self.dispatch(b, a, Some(&reversed), &mut Swapped(sink))
        }
    }

    fn dispatch(
        &mut self,
        a: &Part,
        b: &Part,
        delta: Option<&Vector3<f64>>,
        sink: &mut dyn ContactSink,
    ) -> bool {
        let scratch = &mut self.scratch;
        match (a, b, delta) {
            (Part::Sphere(a), Part::Sphere(b), None) => sphere_sphere::overlap(a, b, sink),
            (Part::Sphere(a), Part::Sphere(b), Some(d)) => sphere_sphere::swept(a, b, d, sink),
            (Part::Sphere(a), Part::Capsule(b), None) => sphere_capsule::overlap(a, b, sink),
            (Part::Sphere(a), Part::Capsule(b), Some(d)) => sphere_capsule::swept(a, b, d, sink),
            (Part::Sphere(a), Part::Polyhedron(b), None) => sphere_polyhedron::overlap(a, b, sink),
            (Part::Sphere(a), Part::Polyhedron(b), Some(d)) => {
                sphere_polyhedron::swept(a, b, d, sink)
            }
            (Part::Sphere(a), Part::Mesh(b), None) => sphere_mesh::overlap(a, b, scratch, sink),
            (Part::Sphere(a), Part::Mesh(b), Some(d)) => {
                sphere_mesh::swept(a, b, d, scratch, sink)
            }
            (Part::Sphere(a), Part::Plane(b), None) => sphere_plane::overlap(a, b, sink),
            (Part::Sphere(a), Part::Plane(b), Some(d)) => sphere_plane::swept(a, b, d, sink),
            (Part::Capsule(a), Part::Capsule(b), None) => capsule_capsule::overlap(a, b, sink),
            (Part::Capsule(a), Part::Capsule(b), Some(d)) => capsule_capsule::swept(a, b, d, sink),
            (Part::Capsule(a), Part::Polyhedron(b), None) => {
                capsule_polyhedron::overlap(a, b, sink)
            }
            (Part::Capsule(a), Part::Polyhedron(b), Some(d)) => {
                capsule_polyhedron::swept(a, b, d, sink)
            }
            (Part::Capsule(a), Part::Mesh(b), None) => capsule_mesh::overlap(a, b, scratch, sink),
            (Part::Capsule(a), Part::Mesh(b), Some(d)) => {
                capsule_mesh::swept(a, b, d, scratch, sink)
            }
            (Part::Capsule(a), Part::Plane(b), None) => capsule_plane::overlap(a, b, sink),
            (Part::Capsule(a), Part::Plane(b), Some(d)) => capsule_plane::swept(a, b, d, sink),
            (Part::Polyhedron(a), Part::Polyhedron(b), None) => {
                polyhedron_polyhedron::overlap(a, b, sink)
            }
            (Part::Polyhedron(a), Part::Polyhedron(b), Some(d)) => {
                polyhedron_polyhedron::swept(a, b, d, sink)
            }
            (Part::Polyhedron(a), Part::Mesh(b), None) => {
                polyhedron_mesh::overlap(a, b, scratch, sink)
            }
            (Part::Polyhedron(a), Part::Mesh(b), Some(d)) => {
                polyhedron_mesh::swept(a, b, d, scratch, sink)
            }
            (Part::Polyhedron(a), Part::Plane(b), None) => polyhedron_plane::overlap(a, b, sink),
            (Part::Polyhedron(a), Part::Plane(b), Some(d)) => {
                polyhedron_plane::swept(a, b, d, sink)
            }
            _ => {
                debug!(a = ?a.kind(), b = ?b.kind(), "no narrow-phase test for shape pair");
                false
            }
        }
    }
}

/// Number of sub-steps for a stepped sweep of a shape with `radius` moving
/// by `delta`.
pub(crate) fn sub_steps(delta: &Vector3<f64>, radius: f64) -> usize {
    let steps = (delta.norm() / radius * 0.9).floor();
    if steps.is_finite() && steps >= 1.0 {
        (steps as usize).min(MAX_SUB_STEPS)
    } else {
        1
    }
}

/// Run `test` at evenly spaced offsets along `delta`, from zero to the full
/// displacement, stopping at the first offset that reports contact.
pub(crate) fn stepped<F>(delta: &Vector3<f64>, radius: f64, mut test: F) -> bool
where
    F: FnMut(&Vector3<f64>) -> bool,
{
    let steps = sub_steps(delta, radius);
    let step = delta / steps as f64;
    (0..=steps).any(|i| test(&(step * i as f64)))
}

/// Unit vector along `v`, or `fallback` when `v` is too short to normalize.
pub(crate) fn normalize_or(v: &Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    if v.norm_squared() < EPSILON {
        fallback
    } else {
        v.normalize()
    }
}

/// Tracks the mesh triangle a shape is least deep behind.
///
/// A shape that is behind every triangle near it has sunk through the
/// surface; the mesh tests then push it out along the nearest triangle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NearestBehind {
    depth: f64,
    triangle: Option<Triangle>,
}

impl NearestBehind {
    pub(crate) fn new() -> Self {
        Self {
            depth: f64::MAX,
            triangle: None,
        }
    }

    /// Record `tri` against the shape centre. Returns whether the centre is
    /// behind the triangle, in which case the triangle should be skipped.
    pub(crate) fn track(&mut self, tri: &Triangle, center: &Point3<f64>) -> bool {
        let d = tri.normal.dot(&tri.v1.coords) - tri.normal.dot(&center.coords);
        if d > 0.0 && d < self.depth {
            self.triangle = Some(*tri);
        }
        self.depth = self.depth.min(d);
        d > 0.0
    }

    /// The nearest triangle when the shape was behind all of them.
    pub(crate) fn embedded(&self) -> Option<Triangle> {
        if self.depth > 0.0 && self.depth < f64::MAX {
            self.triangle
        } else {
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    use rigid_types::Transform;

    use crate::mesh::{CompiledMesh, MeshPart};
    use crate::polyhedron::{CompiledPolyhedron, PolyhedronPart};

    /// Axis-aligned box part of the given half size centred at `position`.
    pub(crate) fn cube(half: f64, position: Point3<f64>) -> Part {
        let compiled = CompiledPolyhedron::cuboid(Vector3::repeat(half * 2.0)).unwrap();
        let mut part = Part::from(PolyhedronPart::new(Arc::new(compiled)));
        part.apply_transform(&Transform::from_position(position));
        part
    }

    /// Flat square mesh on z = 0 spanning `-half..half` in x and y with unit
    /// quads, facing +z, placed by `transform`.
    pub(crate) fn ground(half: usize, transform: &Transform) -> Part {
        let n = half * 2;
        let mut vertices = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(i as f64 - half as f64, j as f64 - half as f64, 0.0));
            }
        }
        let row = n + 1;
        let mut indices = Vec::new();
        for j in 0..n {
            for i in 0..n {
                let a = j * row + i;
                indices.extend_from_slice(&[a, a + 1, a + row + 1, a, a + row + 1, a + row]);
            }
        }
        let compiled = CompiledMesh::new(vertices, &indices).unwrap();
        let mut part = Part::from(MeshPart::new(Arc::new(compiled)));
        part.apply_transform(transform);
        part
    }

    pub(crate) fn run(a: &Part, b: &Part) -> Vec<GeneratedPoint> {
        let mut points = Vec::new();
        NarrowPhase::new().overlap_test(a, b, &mut points);
        points
    }

    pub(crate) fn run_swept(a: &Part, b: &Part, delta: Vector3<f64>) -> Vec<GeneratedPoint> {
        let mut points = Vec::new();
        NarrowPhase::new().swept_test(a, b, &delta, &mut points);
        points
    }

    #[test]
    fn test_sub_steps() {
        assert_eq!(sub_steps(&Vector3::new(0.1, 0.0, 0.0), 1.0), 1);
        assert_eq!(sub_steps(&Vector3::new(10.0, 0.0, 0.0), 1.0), 9);
        assert_eq!(sub_steps(&Vector3::new(1e6, 0.0, 0.0), 1.0), MAX_SUB_STEPS);
        assert_eq!(sub_steps(&Vector3::new(1.0, 0.0, 0.0), 0.0), 1);
    }

    #[test]
    fn test_stepped_offsets() {
        let mut seen = Vec::new();
        stepped(&Vector3::new(4.0, 0.0, 0.0), 1.0, |o| {
            seen.push(o.x);
            false
        });
        assert_eq!(seen.len(), 4);
        assert_relative_eq!(seen[3], 4.0);

        let mut calls = 0;
        assert!(stepped(&Vector3::new(4.0, 0.0, 0.0), 1.0, |o| {
            calls += 1;
            o.x > 1.0
        }));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_reversed_pair_is_mirrored() {
        let sphere = Part::sphere(Point3::new(0.0, 0.0, 0.9), 1.0);
        let plane = Part::plane(Point3::origin(), Vector3::z());

        let forward = run(&sphere, &plane);
        let reversed = run(&plane, &sphere);
        assert_eq!(forward.len(), 1);
        assert_eq!(reversed.len(), 1);
        assert_relative_eq!(forward[0].point_a, reversed[0].point_b);
        assert_relative_eq!(forward[0].point_b, reversed[0].point_a);
        assert_relative_eq!(forward[0].normal, -reversed[0].normal);
    }

    #[test]
    fn test_reversed_swept_pair_negates_delta() {
        let sphere = Part::sphere(Point3::new(0.0, 0.0, 3.0), 1.0);
        let plane = Part::plane(Point3::origin(), Vector3::z());
        // The plane rising toward the sphere is the sphere falling onto it.
        let points = run_swept(&plane, &sphere, Vector3::new(0.0, 0.0, 2.5));
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].normal, -Vector3::z());
    }

    #[test]
    fn test_unregistered_pairs() {
        let plane = Part::plane(Point3::origin(), Vector3::z());
        assert!(run(&plane, &plane).is_empty());
        assert!(!NarrowPhase::has_test(ShapeKind::Mesh, ShapeKind::Plane));
        assert!(!NarrowPhase::has_test(ShapeKind::Plane, ShapeKind::Mesh));
        assert!(NarrowPhase::has_test(ShapeKind::Plane, ShapeKind::Sphere));
    }

    #[test]
    fn test_nearest_behind() {
        let up = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let higher = Triangle::new(
            Point3::new(0.0, 0.0, 0.5),
            Point3::new(1.0, 0.0, 0.5),
            Point3::new(0.0, 1.0, 0.5),
        );

        let mut nearest = NearestBehind::new();
        assert!(nearest.track(&higher, &Point3::new(0.0, 0.0, -0.2)));
        assert!(nearest.track(&up, &Point3::new(0.0, 0.0, -0.2)));
        assert_relative_eq!(nearest.embedded().unwrap().v1, up.v1);

        // Being in front of any triangle means the shape is not embedded.
        assert!(!nearest.track(&up, &Point3::new(0.0, 0.0, 1.0)));
        assert!(nearest.embedded().is_none());
        assert!(NearestBehind::new().embedded().is_none());
    }

    #[test]
    fn test_depth() {
        let p = GeneratedPoint {
            point_a: Point3::new(0.0, 0.0, -0.1),
            point_b: Point3::origin(),
            normal: Vector3::z(),
        };
        assert_relative_eq!(p.depth(), 0.1);
    }
}

//! Convex polyhedron against triangle mesh.
//!
//! Each nearby triangle is moved to world space and run through the
//! separating-axis test as a one-faced hull. Triangles the polyhedron centre
//! is behind are skipped; if that is all of them the polyhedron is pushed out
//! along the nearest one.

use nalgebra::Vector3;

use rigid_types::{AlignedBox, Triangle};

use super::sat::{self, Axis, FaceOrder};
use super::{ContactSink, NearestBehind};
use crate::mesh::{MeshPart, TriangleScratch};
use crate::polyhedron::PolyhedronPart;

pub(super) fn overlap(
    a: &PolyhedronPart,
    b: &MeshPart,
    scratch: &mut TriangleScratch,
    sink: &mut dyn ContactSink,
) -> bool {
    let query = a.bounding_box().transform(b.transform_inverse());
    let (hit, nearest) = walk(a, b, &query, scratch, |tri| {
        sat::overlap_axis(a, tri, FaceOrder::HullFirst)
            .is_some_and(|axis| sat::write_contacts(a, tri, &outward(axis, tri), sink) > 0)
    });

    match nearest.embedded() {
        Some(tri) => {
            sink.write_point(&a.center(), &tri.center(), &tri.normal);
            true
        }
        None => hit,
    }
}

pub(super) fn swept(
    a: &PolyhedronPart,
    b: &MeshPart,
    delta: &Vector3<f64>,
    scratch: &mut TriangleScratch,
    sink: &mut dyn ContactSink,
) -> bool {
    let mut reach = a.bounding_box();
    reach.sweep(delta);
    let query = reach.transform(b.transform_inverse());
    let (hit, _) = walk(a, b, &query, scratch, |tri| {
        sat::swept_axis(a, tri, delta, FaceOrder::HullFirst, 0.0)
            .is_some_and(|axis| sat::write_contacts(a, tri, &outward(axis, tri), sink) > 0)
    });
    hit
}

// Visit the world-space triangles in `query` that the polyhedron is in front
// of.
fn walk<F>(
    a: &PolyhedronPart,
    b: &MeshPart,
    query: &AlignedBox,
    scratch: &mut TriangleScratch,
    mut test: F,
) -> (bool, NearestBehind)
where
    F: FnMut(&Triangle) -> bool,
{
    let to_world = b.transform();
    let center = a.center();
    let mut nearest = NearestBehind::new();
    let mut hit = false;
    b.process_triangles(query, scratch, |triangles| {
        for tri in triangles {
            let tri = tri.transform(to_world);
            if nearest.track(&tri, &center) {
                continue;
            }
            hit |= test(&tri);
        }
    });
    (hit, nearest)
}

// A mesh has no inside, so the contact normal must not point through the
// triangle's back face.
fn outward(mut axis: Axis, tri: &Triangle) -> Axis {
    let d = tri.normal.dot(&axis.normal);
    if d < 0.0 {
        axis.normal += tri.normal * (-2.0 * d);
    }
    axis
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::narrow::tests::{cube, ground, run, run_swept};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, UnitQuaternion};
    use rigid_types::Transform;

    #[test]
    fn test_box_resting_on_mesh() {
        let floor = ground(3, &Transform::identity());
        let points = run(&cube(0.5, Point3::new(0.25, 0.25, 0.45)), &floor);
        assert!(!points.is_empty());
        for p in &points {
            assert_relative_eq!(p.normal, Vector3::z(), epsilon = 1e-9);
            assert_relative_eq!(p.depth(), 0.05, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_box_above_mesh() {
        let floor = ground(3, &Transform::identity());
        assert!(run(&cube(0.5, Point3::new(0.25, 0.25, 0.6)), &floor).is_empty());
    }

    #[test]
    fn test_sunken_box_is_pushed_out() {
        let floor = ground(3, &Transform::identity());
        let points = run(&cube(0.5, Point3::new(0.25, 0.25, -0.2)), &floor);
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].normal, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(points[0].point_a, Point3::new(0.25, 0.25, -0.2));
    }

    #[test]
    fn test_swept_box_lands_on_mesh() {
        let floor = ground(3, &Transform::identity());
        let a = cube(0.5, Point3::new(0.25, 0.25, 4.0));
        let points = run_swept(&a, &floor, Vector3::new(0.0, 0.0, -6.0));
        assert!(!points.is_empty());
        for p in &points {
            assert_relative_eq!(p.normal, Vector3::z(), epsilon = 1e-9);
        }
        assert!(run_swept(&a, &floor, Vector3::new(0.0, 0.0, 6.0)).is_empty());
    }

    #[test]
    fn test_outward_flips_back_facing_normal() {
        let tri = Triangle::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let part = cube(0.5, Point3::new(0.2, 0.2, 0.45));
        let crate::part::Part::Polyhedron(a) = &part else {
            unreachable!()
        };
        let mut axis = sat::overlap_axis(a, &tri, FaceOrder::HullFirst).unwrap();
        axis.normal = -Vector3::z();
        assert_relative_eq!(outward(axis, &tri).normal, Vector3::z());
    }

    #[test]
    fn test_turned_box_on_triangle_keeps_surface_normal() {
        let tri = Triangle::new(
            Point3::new(-2.0, -2.0, 0.0),
            Point3::new(2.0, -2.0, 0.0),
            Point3::new(-2.0, 2.0, 0.0),
        );
        let mut part = cube(0.25, Point3::origin());
        part.apply_transform(&Transform::from_position_orientation(
            Point3::new(-0.5, -0.5, 0.2),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5),
        ));
        let crate::part::Part::Polyhedron(a) = &part else {
            unreachable!()
        };
        let axis = sat::overlap_axis(a, &tri, FaceOrder::HullFirst).unwrap();
        assert_relative_eq!(axis.normal, Vector3::z(), epsilon = 1e-9);
        assert_relative_eq!(axis.depth, 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_in_plane_axis_still_separates() {
        // Beside the hypotenuse: only the edge axis across it separates.
        let tri = Triangle::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let part = cube(0.1, Point3::new(0.75, 0.75, 0.0));
        let crate::part::Part::Polyhedron(a) = &part else {
            unreachable!()
        };
        assert!(sat::overlap_axis(a, &tri, FaceOrder::HullFirst).is_none());
    }
}

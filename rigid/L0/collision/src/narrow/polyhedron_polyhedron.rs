//! Convex polyhedron against convex polyhedron.

use nalgebra::Vector3;

use rigid_types::EPSILON;

use super::sat::{self, FaceOrder};
use super::ContactSink;
use crate::polyhedron::PolyhedronPart;

pub(super) fn overlap(a: &PolyhedronPart, b: &PolyhedronPart, sink: &mut dyn ContactSink) -> bool {
    sat::overlap_axis(a, b, FaceOrder::PolyhedronFirst)
        .is_some_and(|axis| sat::write_contacts(a, b, &axis, sink) > 0)
}

pub(super) fn swept(
    a: &PolyhedronPart,
    b: &PolyhedronPart,
    delta: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    sat::swept_axis(a, b, delta, FaceOrder::PolyhedronFirst, EPSILON)
        .is_some_and(|axis| sat::write_contacts(a, b, &axis, sink) > 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::narrow::tests::{cube, run, run_swept};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, UnitQuaternion};
    use rigid_types::Transform;

    #[test]
    fn test_separated_boxes() {
        assert!(run(&cube(0.5, Point3::new(1.1, 0.0, 0.0)), &cube(0.5, Point3::origin())).is_empty());
    }

    #[test]
    fn test_stacked_boxes_face_contact() {
        let points = run(&cube(0.5, Point3::new(0.0, 0.0, 0.95)), &cube(0.5, Point3::origin()));
        assert!(points.len() >= 4);
        for p in &points {
            assert_relative_eq!(p.normal, Vector3::z(), epsilon = 1e-9);
            assert_relative_eq!(p.depth(), 0.05, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rotated_box_on_edge() {
        let mut top = cube(0.5, Point3::origin());
        let half_diagonal = 0.5 * std::f64::consts::SQRT_2;
        top.apply_transform(&Transform::from_position_orientation(
            Point3::new(0.0, 0.0, 0.5 + half_diagonal - 0.02),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::FRAC_PI_4),
        ));
        let points = run(&top, &cube(0.5, Point3::origin()));
        assert!(!points.is_empty());
        for p in &points {
            assert_relative_eq!(p.normal, Vector3::z(), epsilon = 1e-9);
            assert_relative_eq!(p.depth(), 0.02, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_swept_box_hits_box() {
        let a = cube(0.5, Point3::new(0.0, 0.0, 5.0));
        let b = cube(0.5, Point3::origin());
        let points = run_swept(&a, &b, Vector3::new(0.0, 0.0, -10.0));
        assert!(!points.is_empty());
        for p in &points {
            assert_relative_eq!(p.normal, Vector3::z(), epsilon = 1e-9);
        }
        assert!(run_swept(&a, &b, Vector3::new(0.0, 0.0, 10.0)).is_empty());
    }

    #[test]
    fn test_swept_box_passing_beside() {
        let a = cube(0.5, Point3::new(3.0, 0.0, 5.0));
        let b = cube(0.5, Point3::origin());
        assert!(run_swept(&a, &b, Vector3::new(0.0, 0.0, -10.0)).is_empty());
    }

    #[test]
    fn test_swept_matches_overlap_when_already_touching() {
        let a = cube(0.5, Point3::new(0.0, 0.0, 0.95));
        let b = cube(0.5, Point3::origin());
        let swept = run_swept(&a, &b, Vector3::new(0.0, 0.0, -0.01));
        assert!(!swept.is_empty());
        assert_relative_eq!(swept[0].depth(), 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_face_contact_points_are_distinct() {
        for offset in [Point3::new(0.0, 0.0, 0.95), Point3::new(0.3, 0.2, 0.95)] {
            let points = run(&cube(0.5, offset), &cube(0.5, Point3::origin()));
            assert!(!points.is_empty());
            for (i, p) in points.iter().enumerate() {
                for q in &points[i + 1..] {
                    assert!(
                        (p.point_a - q.point_a).norm() > 1e-4,
                        "duplicate contact at {} for offset {offset}",
                        p.point_a
                    );
                }
            }
        }
    }
}

//! Narrow-phase contact generation between primitive parts.

use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use rigid_collision::{CompiledPolyhedron, GeneratedPoint, NarrowPhase, Part, PolyhedronPart};
use rigid_types::Transform;

fn unit_box(center: Point3<f64>) -> Part {
    let compiled = CompiledPolyhedron::cuboid(Vector3::repeat(1.0)).expect("cuboid");
    let mut part = Part::from(PolyhedronPart::new(Arc::new(compiled)));
    part.apply_transform(&Transform::from_position(center));
    part
}

#[test]
fn spheres_touch_iff_closer_than_radius_sum() {
    let mut narrow = NarrowPhase::new();
    let a = Part::sphere(Point3::origin(), 1.0);
    for (x, expected) in [(1.2, true), (1.49, true), (1.51, false), (3.0, false)] {
        let b = Part::sphere(Point3::new(x, 0.0, 0.0), 0.5);
        let mut points: Vec<GeneratedPoint> = Vec::new();
        let hit = narrow.overlap_test(&a, &b, &mut points);
        assert_eq!(hit, expected, "sphere at x={x}");
        assert_eq!(points.is_empty(), !expected, "points at x={x}");
    }
}

#[test]
fn sphere_contact_geometry() {
    let mut narrow = NarrowPhase::new();
    let a = Part::sphere(Point3::new(0.0, 0.0, 1.0), 1.0);
    let b = Part::sphere(Point3::origin(), 0.5);
    let mut points = Vec::new();
    assert!(narrow.overlap_test(&a, &b, &mut points));
    assert_eq!(points.len(), 1);

    let p = points[0];
    assert_relative_eq!(p.normal.norm(), 1.0, epsilon = 1e-12);
    // Normal points from b toward a.
    assert_relative_eq!(p.normal, Vector3::z(), epsilon = 1e-12);
    assert_relative_eq!(p.point_a, Point3::origin(), epsilon = 1e-12);
    assert_relative_eq!(p.point_b, Point3::new(0.0, 0.0, 0.5), epsilon = 1e-12);
    assert_relative_eq!(p.depth(), 0.5, epsilon = 1e-12);
}

#[test]
fn separated_boxes_produce_nothing() {
    let mut narrow = NarrowPhase::new();
    let a = unit_box(Point3::origin());
    let b = unit_box(Point3::new(1.5, 0.2, 0.0));
    let mut points = Vec::new();
    assert!(!narrow.overlap_test(&a, &b, &mut points));
    assert!(points.is_empty());
}

#[test]
fn overlapping_boxes_report_penetration_depth() {
    let mut narrow = NarrowPhase::new();
    let a = unit_box(Point3::origin());
    let b = unit_box(Point3::new(0.9, 0.0, 0.0));
    let mut points = Vec::new();
    assert!(narrow.overlap_test(&a, &b, &mut points));
    assert!(!points.is_empty());
    for p in &points {
        assert_relative_eq!(p.normal, -Vector3::x(), epsilon = 1e-9);
        assert!(
            (p.depth() - 0.1).abs() < 1e-6,
            "expected depth 0.1, got {}",
            p.depth()
        );
    }
}

#[test]
fn box_rests_on_plane_with_face_contact() {
    let mut narrow = NarrowPhase::new();
    let cube = unit_box(Point3::new(0.0, 0.0, 0.45));
    let floor = Part::plane(Point3::origin(), Vector3::z());
    let mut points = Vec::new();
    assert!(narrow.overlap_test(&cube, &floor, &mut points));
    assert_eq!(points.len(), 4, "one point per bottom corner");
    for p in &points {
        assert_relative_eq!(p.normal, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(p.depth(), 0.05, epsilon = 1e-9);
    }
}

#[test]
fn swept_sphere_catches_a_tunnelling_pass() {
    let mut narrow = NarrowPhase::new();
    let a = Part::sphere(Point3::new(-3.0, 0.0, 0.0), 0.1);
    let b = Part::sphere(Point3::origin(), 0.1);
    let mut points = Vec::new();
    assert!(!narrow.overlap_test(&a, &b, &mut points));

    // Passes straight through b within one step.
    let hit = narrow.swept_test(&a, &b, &Vector3::new(6.0, 0.0, 0.0), &mut points);
    assert!(hit, "a sweep across b must report contact");
    assert_eq!(points.len(), 1);
    assert_relative_eq!(points[0].normal.norm(), 1.0, epsilon = 1e-12);
}

//! Capsule against capsule.

use nalgebra::{Point3, Vector3};

use rigid_types::{Segment, EPSILON};

use super::{normalize_or, stepped, ContactSink};
use crate::part::CapsulePart;

pub(super) fn overlap(a: &CapsulePart, b: &CapsulePart, sink: &mut dyn ContactSink) -> bool {
    overlap_at(a, b, &Vector3::zeros(), sink)
}

pub(super) fn swept(
    a: &CapsulePart,
    b: &CapsulePart,
    delta: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    stepped(delta, a.world().radius, |offset| overlap_at(a, b, offset, sink))
}

// Test with `a` displaced by `offset`. Points on `a` are reported at its
// undisplaced position.
fn overlap_at(
    a: &CapsulePart,
    b: &CapsulePart,
    offset: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    let (ca, cb) = (a.world(), b.world());
    let sa = Segment::new(ca.p1 + offset, ca.p2 + offset);
    let sb = cb.segment();
    let r = ca.radius + cb.radius;
    let r2 = r * r;

    let closest = Segment::closest_points(&sa, &sb);
    if closest.distance_squared() - r2 >= EPSILON {
        return false;
    }
    let n = normalize_or(&(closest.point_a - closest.point_b), Vector3::z());
    let mut write = |pa: &Point3<f64>, pb: &Point3<f64>| {
        sink.write_point(&(pa - n * ca.radius - offset), &(pb + n * cb.radius), &n);
    };
    write(&closest.point_a, &closest.point_b);

    // When the closest point sits at an end of either axis the capsules are
    // close to parallel; the far endpoint gives a second support point.
    let second = if closest.scalar_a <= 0.0 || closest.scalar_a >= 1.0 {
        let far = if closest.scalar_a <= 0.0 { sa.p2 } else { sa.p1 };
        Some((far, sb.closest_point_to(&far).1))
    } else if closest.scalar_b <= 0.0 || closest.scalar_b >= 1.0 {
        let far = if closest.scalar_b <= 0.0 { sb.p2 } else { sb.p1 };
        Some((sa.closest_point_to(&far).1, far))
    } else {
        None
    };
    if let Some((pa, pb)) = second {
        if (pa - pb).norm_squared() - r2 < EPSILON {
            write(&pa, &pb);
        }
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::narrow::tests::{run, run_swept};
    use crate::part::Part;
    use approx::assert_relative_eq;

    #[test]
    fn test_crossed_capsules() {
        let a = Part::capsule(Point3::new(0.0, -1.0, 0.8), Point3::new(0.0, 1.0, 0.8), 0.5);
        let b = Part::capsule(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), 0.5);
        let points = run(&a, &b);
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].normal, Vector3::z());
        assert_relative_eq!(points[0].point_a, Point3::new(0.0, 0.0, 0.3));
        assert_relative_eq!(points[0].point_b, Point3::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn test_near_parallel_capsules_get_two_points() {
        let a = Part::capsule(Point3::new(1.0, 0.6, 0.0), Point3::new(3.0, 0.7, 0.0), 0.5);
        let b = Part::capsule(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0), 0.5);
        let points = run(&a, &b);
        assert_eq!(points.len(), 2);
        for p in &points {
            assert_relative_eq!(p.normal, points[0].normal);
            assert!(p.depth() > 0.0);
        }
        assert_relative_eq!(points[1].point_b.x, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_separated() {
        let a = Part::capsule(Point3::new(0.0, 0.0, 2.0), Point3::new(1.0, 0.0, 2.0), 0.5);
        let b = Part::capsule(Point3::origin(), Point3::new(1.0, 0.0, 0.0), 0.5);
        assert!(run(&a, &b).is_empty());
    }

    #[test]
    fn test_swept_substeps_find_contact() {
        let a = Part::capsule(Point3::new(0.0, -1.0, 4.0), Point3::new(0.0, 1.0, 4.0), 0.5);
        let b = Part::capsule(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), 0.5);
        let points = run_swept(&a, &b, Vector3::new(0.0, 0.0, -8.0));
        assert!(!points.is_empty());
        // Reported at the undisplaced position of `a`.
        assert!(points[0].point_a.z > 1.0);
        assert_relative_eq!(points[0].normal, Vector3::z(), epsilon = 1e-9);
    }
}

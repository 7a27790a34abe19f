//! Sphere against capsule.

use nalgebra::Vector3;

use rigid_types::{Capsule, Segment, EPSILON};

use super::{normalize_or, ContactSink};
use crate::part::{CapsulePart, SpherePart};

pub(super) fn overlap(a: &SpherePart, b: &CapsulePart, sink: &mut dyn ContactSink) -> bool {
    let (sphere, capsule) = (a.world(), b.world());
    let (_, q) = capsule.segment().closest_point_to(&sphere.center);
    let d = sphere.center - q;
    let r = sphere.radius + capsule.radius;
    if d.norm_squared() - r * r >= EPSILON {
        return false;
    }
    let n = normalize_or(&d, Vector3::z());
    sink.write_point(&(sphere.center - n * sphere.radius), &(q + n * capsule.radius), &n);
    true
}

// The sphere's path against the capsule inflated by the sphere radius.
pub(super) fn swept(
    a: &SpherePart,
    b: &CapsulePart,
    delta: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    if overlap(a, b, sink) {
        return true;
    }
    let (sphere, capsule) = (a.world(), b.world());
    let inflated = Capsule::new(capsule.p1, capsule.p2, capsule.radius + sphere.radius);
    let path = Segment::new(sphere.center, sphere.center + delta);
    let Some((_, hit)) = inflated.intersect_segment(&path) else {
        return false;
    };

    let (_, q) = capsule.segment().closest_point_to(&hit);
    let n = normalize_or(&(hit - q), Vector3::z());
    sink.write_point(&(sphere.center - n * sphere.radius), &(q + n * capsule.radius), &n);
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::narrow::tests::{run, run_swept};
    use crate::part::Part;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn rod() -> Part {
        Part::capsule(Point3::new(-2.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0), 0.5)
    }

    #[test]
    fn test_sphere_on_capsule_side() {
        let sphere = Part::sphere(Point3::new(1.0, 1.2, 0.0), 1.0);
        let points = run(&sphere, &rod());
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].normal, Vector3::y());
        assert_relative_eq!(points[0].point_b, Point3::new(1.0, 0.5, 0.0));
        assert_relative_eq!(points[0].depth(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_past_cap() {
        let sphere = Part::sphere(Point3::new(3.0, 0.0, 0.0), 0.6);
        let points = run(&sphere, &rod());
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].normal, Vector3::x());

        let far = Part::sphere(Point3::new(3.5, 0.0, 0.0), 0.6);
        assert!(run(&far, &rod()).is_empty());
    }

    #[test]
    fn test_reversed_order() {
        let sphere = Part::sphere(Point3::new(1.0, 1.2, 0.0), 1.0);
        let points = run(&rod(), &sphere);
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].normal, -Vector3::y());
        assert_relative_eq!(points[0].point_a, Point3::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn test_swept_onto_capsule() {
        let sphere = Part::sphere(Point3::new(0.0, 5.0, 0.0), 0.5);
        let points = run_swept(&sphere, &rod(), Vector3::new(0.0, -10.0, 0.0));
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].normal, Vector3::y(), epsilon = 1e-9);
        assert_relative_eq!(points[0].point_b, Point3::new(0.0, 0.5, 0.0), epsilon = 1e-9);
    }
}

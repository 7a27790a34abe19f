//! Sphere against triangle mesh.
//!
//! Triangles are tested in mesh body space; results are mapped back to
//! world space before they reach the sink.

use nalgebra::Vector3;

use rigid_types::{AlignedBox, Segment, EPSILON};

use super::{normalize_or, ContactSink, NearestBehind};
use crate::mesh::{MeshPart, TriangleScratch};
use crate::part::SpherePart;

pub(super) fn overlap(
    a: &SpherePart,
    b: &MeshPart,
    scratch: &mut TriangleScratch,
    sink: &mut dyn ContactSink,
) -> bool {
    let sphere = a.world();
    let (to_world, to_body) = (b.transform(), b.transform_inverse());
    let center = to_body.transform_point(&sphere.center);
    let r = sphere.radius * to_body.scale();
    let r2 = r * r;
    let query = AlignedBox::from_center(center, Vector3::repeat(r));

    let mut nearest = NearestBehind::new();
    let mut hit = false;
    b.process_triangles(&query, scratch, |triangles| {
        for tri in triangles {
            if nearest.track(tri, &center) {
                continue;
            }
            let (pb, interior) = tri.closest_point_to(&center);
            let d = center - pb;
            if d.norm_squared() - r2 >= EPSILON {
                continue;
            }
            let n = if interior {
                tri.normal
            } else {
                normalize_or(&d, tri.normal)
            };
            let n = to_world.rotate(&n);
            sink.write_point(
                &(sphere.center - n * sphere.radius),
                &to_world.transform_point(&pb),
                &n,
            );
            hit = true;
        }
    });

    if let Some(tri) = nearest.embedded() {
        let tri = tri.transform(to_world);
        sink.write_point(&sphere.center, &tri.center(), &tri.normal);
        hit = true;
    }
    hit
}

pub(super) fn swept(
    a: &SpherePart,
    b: &MeshPart,
    delta: &Vector3<f64>,
    scratch: &mut TriangleScratch,
    sink: &mut dyn ContactSink,
) -> bool {
    let sphere = a.world();
    let (to_world, to_body) = (b.transform(), b.transform_inverse());
    let start = to_body.transform_point(&sphere.center);
    let path = Segment::new(start, start + to_body.transform_vector(delta));
    let r = sphere.radius * to_body.scale();
    let r2 = r * r;
    let mut query = AlignedBox::fit2(&path.p1, &path.p2);
    query.min -= Vector3::repeat(r);
    query.max += Vector3::repeat(r);

    let mut hit = false;
    b.process_triangles(&query, scratch, |triangles| {
        for tri in triangles {
            if tri.normal.dot(&tri.v1.coords) - tri.normal.dot(&path.p1.coords) > 0.0 {
                continue;
            }
            let closest = tri.closest_point_to_segment(&path);
            if (closest.segment_point - closest.triangle_point).norm_squared() - r2 >= EPSILON {
                continue;
            }
            let n = to_world.rotate(&tri.normal);
            sink.write_point(
                &(sphere.center - n * sphere.radius),
                &to_world.transform_point(&closest.triangle_point),
                &n,
            );
            hit = true;
        }
    });
    hit
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::narrow::tests::{ground, run, run_swept};
    use crate::part::Part;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, UnitQuaternion};
    use rigid_types::Transform;

    #[test]
    fn test_sphere_resting_on_mesh() {
        let floor = ground(2, &Transform::identity());
        let points = run(&Part::sphere(Point3::new(0.3, 0.6, 0.4), 0.5), &floor);
        assert!(!points.is_empty());
        for p in &points {
            assert!(p.normal.z > 0.0);
            assert_relative_eq!(p.point_b.z, 0.0, epsilon = 1e-12);
        }
        assert!(points
            .iter()
            .any(|p| (p.normal - Vector3::z()).norm() < 1e-9 && (p.depth() - 0.1).abs() < 1e-9));
    }

    #[test]
    fn test_sphere_above_mesh() {
        let floor = ground(2, &Transform::identity());
        assert!(run(&Part::sphere(Point3::new(0.3, 0.6, 0.6), 0.5), &floor).is_empty());
    }

    #[test]
    fn test_sunken_sphere_is_pushed_out() {
        let floor = ground(2, &Transform::identity());
        let points = run(&Part::sphere(Point3::new(0.3, 0.6, -0.3), 0.5), &floor);
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].normal, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(points[0].point_a, Point3::new(0.3, 0.6, -0.3));
    }

    #[test]
    fn test_rotated_mesh() {
        // Turning the floor about y makes it face +x.
        let wall = ground(
            2,
            &Transform::from_position_orientation(
                Point3::origin(),
                UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2),
            ),
        );
        let points = run(&Part::sphere(Point3::new(0.4, 0.3, 0.6), 0.5), &wall);
        assert!(points
            .iter()
            .any(|p| (p.normal - Vector3::x()).norm() < 1e-9 && (p.depth() - 0.1).abs() < 1e-9));
    }

    #[test]
    fn test_swept_through_mesh() {
        let floor = ground(2, &Transform::identity());
        let sphere = Part::sphere(Point3::new(0.3, 0.6, 3.0), 0.5);
        let points = run_swept(&sphere, &floor, Vector3::new(0.0, 0.0, -5.0));
        assert!(!points.is_empty());
        for p in &points {
            assert_relative_eq!(p.normal, Vector3::z(), epsilon = 1e-12);
            assert_relative_eq!(p.point_a, Point3::new(0.3, 0.6, 2.5), epsilon = 1e-12);
        }
        assert!(run_swept(&sphere, &floor, Vector3::new(0.0, 0.0, 5.0)).is_empty());
    }
}

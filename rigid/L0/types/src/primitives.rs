//! Planes, spheres and capsules.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::{self, EPSILON};
use crate::{Line, Segment, Transform};

/// An infinite plane through `p` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plane {
    /// A point on the plane.
    pub p: Point3<f64>,
    /// Unit normal; the plane's "front" side.
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Create a plane from a point and a normal.
    #[must_use]
    pub const fn new(p: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { p, normal }
    }

    /// Plane through three counter-clockwise points.
    #[must_use]
    pub fn from_points(p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> Self {
        let normal = math::normalize_or_zero(&(p2 - p1).cross(&(p3 - p1)));
        Self::new(*p1, normal)
    }

    /// Signed distance from the plane to `p`, positive on the normal side.
    #[must_use]
    pub fn distance_to(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&(p - self.p))
    }

    /// Orthogonal projection of `p` onto the plane.
    #[must_use]
    pub fn closest_point_to(&self, p: &Point3<f64>) -> Point3<f64> {
        p - self.normal * self.distance_to(p)
    }

    /// Intersection with an infinite line, unless the line is parallel.
    #[must_use]
    pub fn intersect_line(&self, line: &Line) -> Option<Point3<f64>> {
        let e = self.normal.dot(&line.direction);
        if e.abs() < EPSILON {
            return None;
        }
        let t = self.normal.dot(&(self.p - line.p)) / e;
        Some(line.p + line.direction * t)
    }

    /// Intersection with a segment as `(scalar, point)`.
    #[must_use]
    pub fn intersect_segment(&self, segment: &Segment) -> Option<(f64, Point3<f64>)> {
        let diff = segment.delta();
        let e = self.normal.dot(&diff);
        if e.abs() <= EPSILON {
            return None;
        }
        let scalar = self.normal.dot(&(self.p - segment.p1)) / e;
        (0.0..=1.0)
            .contains(&scalar)
            .then(|| (scalar, segment.p1 + diff * scalar))
    }

    /// The plane mapped through `transform`.
    #[must_use]
    pub fn transform(&self, transform: &Transform) -> Self {
        Self::new(
            transform.transform_point(&self.p),
            transform.rotate(&self.normal),
        )
    }
}

/// A sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sphere {
    /// Center point.
    pub center: Point3<f64>,
    /// Radius.
    pub radius: f64,
}

impl Sphere {
    /// Create a sphere.
    #[must_use]
    pub const fn new(center: Point3<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Whether `p` is inside or on the sphere.
    #[must_use]
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (p - self.center).norm_squared() <= self.radius * self.radius
    }

    /// First point where `segment` enters the sphere, as `(scalar, point)`.
    /// A segment starting inside reports scalar 0.
    #[must_use]
    pub fn intersect_segment(&self, segment: &Segment) -> Option<(f64, Point3<f64>)> {
        let s = self.center - segment.p1;
        let d = segment.delta();
        let l2s = s.norm_squared();
        let r2 = self.radius * self.radius;
        if l2s <= r2 {
            return Some((0.0, segment.p1));
        }
        let dd = d.norm_squared();
        if dd < f64::MIN_POSITIVE {
            return None;
        }
        let tc = s.dot(&d) / dd;
        let l2h = (r2 - l2s) / dd + tc * tc;
        if l2h < 0.0 {
            return None;
        }
        let scalar = tc - l2h.sqrt();
        (0.0..=1.0)
            .contains(&scalar)
            .then(|| (scalar, segment.p1 + d * scalar))
    }

    /// Approximate minimal bounding sphere by iteratively re-weighting points
    /// by their distance from the weighted centroid.
    #[must_use]
    pub fn fit(points: &[Point3<f64>]) -> Self {
        match points {
            [] => return Self::new(Point3::origin(), 0.0),
            [p] => return Self::new(*p, 0.0),
            _ => {}
        }

        let mut weights = vec![1.0 / points.len() as f64; points.len()];
        let mut sphere = Self::new(Point3::origin(), 0.0);
        for _ in 0..256 {
            sphere.center = Point3::from(
                points
                    .iter()
                    .zip(&weights)
                    .fold(Vector3::zeros(), |acc, (p, w)| acc + p.coords * *w),
            );
            sphere.radius = 0.0;
            let mut sum_weighted_radius_sq = 0.0;
            let mut sum_weighted_radius = 0.0;
            for (p, w) in points.iter().zip(weights.iter_mut()) {
                let radius_sq = (p - sphere.center).norm_squared();
                sum_weighted_radius_sq += radius_sq * *w;
                let radius = radius_sq.sqrt();
                sphere.radius = sphere.radius.max(radius);
                *w *= radius;
                sum_weighted_radius += *w;
            }
            if sphere.radius - sum_weighted_radius_sq.sqrt() < sphere.radius * EPSILON
                || sum_weighted_radius < f64::MIN_POSITIVE
            {
                break;
            }
            for w in &mut weights {
                *w /= sum_weighted_radius;
            }
        }
        sphere
    }
}

/// A capsule: all points within `radius` of the segment `p1`-`p2`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Capsule {
    /// First end of the core segment.
    pub p1: Point3<f64>,
    /// Second end of the core segment.
    pub p2: Point3<f64>,
    /// Radius around the core segment.
    pub radius: f64,
}

impl Capsule {
    /// Create a capsule.
    #[must_use]
    pub const fn new(p1: Point3<f64>, p2: Point3<f64>, radius: f64) -> Self {
        Self { p1, p2, radius }
    }

    /// Core segment of the capsule.
    #[must_use]
    pub fn segment(&self) -> Segment {
        Segment::new(self.p1, self.p2)
    }

    /// First point where `segment` enters the capsule, as `(scalar, point)`.
    ///
    /// Tests the cylindrical body first and falls back to the two end caps.
    #[must_use]
    pub fn intersect_segment(&self, segment: &Segment) -> Option<(f64, Point3<f64>)> {
        let d = self.p2 - self.p1;
        let m = segment.p1 - self.p1;
        let n = segment.delta();
        let md = d.dot(&m);
        let nd = d.dot(&n);
        let dd = d.dot(&d);

        let outside_p1 = md < 0.0 && md + nd < 0.0;
        let outside_p2 = md > dd && md + nd > dd;
        if !outside_p1 && !outside_p2 {
            let nn = n.dot(&n);
            let mn = m.dot(&n);
            let a = dd * nn - nd * nd;
            let k = m.dot(&m) - self.radius * self.radius;
            let c = dd * k - md * md;
            if a.abs() >= EPSILON {
                let b = dd * mn - nd * md;
                let discr = b * b - a * c;
                if discr >= 0.0 {
                    let t = (-b - discr.sqrt()) / a;
                    let along = md + t * nd;
                    if (0.0..=1.0).contains(&t) && along >= 0.0 && along <= dd {
                        return Some((t, segment.p1 + n * t));
                    }
                }
            }
        }

        let caps = [
            Sphere::new(self.p1, self.radius).intersect_segment(segment),
            Sphere::new(self.p2, self.radius).intersect_segment(segment),
        ];
        caps.into_iter()
            .flatten()
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    /// Capsule along the axis of greatest spread that encloses all points.
    #[must_use]
    pub fn fit(points: &[Point3<f64>]) -> Self {
        let axis = math::max_spread_axis(points);
        if axis.norm_squared() < EPSILON {
            return Self::new(Point3::origin(), Point3::origin(), 0.0);
        }
        let (Some(p2), Some(p1)) = (
            math::extreme_point(points, &axis),
            math::extreme_point(points, &-axis),
        ) else {
            return Self::new(Point3::origin(), Point3::origin(), 0.0);
        };

        let core = Segment::new(p1, p2);
        let radius = points
            .iter()
            .map(|p| core.distance_squared_to(p))
            .fold(0.0_f64, f64::max)
            .sqrt();

        Self::new(p1 + axis * radius, p2 - axis * radius, radius)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_segment() {
        let plane = Plane::new(Point3::origin(), Vector3::z());
        let s = Segment::new(Point3::new(0.0, 0.0, 2.0), Point3::new(0.0, 0.0, -2.0));
        let (t, p) = plane.intersect_segment(&s).unwrap();
        assert_relative_eq!(t, 0.5);
        assert_relative_eq!(p, Point3::origin());

        let parallel = Segment::new(Point3::new(0.0, 0.0, 1.0), Point3::new(1.0, 0.0, 1.0));
        assert!(plane.intersect_segment(&parallel).is_none());
        let short = Segment::new(Point3::new(0.0, 0.0, 2.0), Point3::new(0.0, 0.0, 1.0));
        assert!(plane.intersect_segment(&short).is_none());

        assert_relative_eq!(
            plane.closest_point_to(&Point3::new(1.0, 2.0, 3.0)),
            Point3::new(1.0, 2.0, 0.0)
        );
        let line = Line::new(Point3::new(1.0, 1.0, 1.0), Vector3::new(0.0, 0.0, 2.0));
        assert_relative_eq!(
            plane.intersect_line(&line).unwrap(),
            Point3::new(1.0, 1.0, 0.0)
        );
    }

    #[test]
    fn test_sphere_segment() {
        let sphere = Sphere::new(Point3::origin(), 1.0);
        let s = Segment::new(Point3::new(-3.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        let (t, p) = sphere.intersect_segment(&s).unwrap();
        assert_relative_eq!(t, 0.5);
        assert_relative_eq!(p, Point3::new(-1.0, 0.0, 0.0));

        let inside = Segment::new(Point3::new(0.5, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0));
        assert_relative_eq!(sphere.intersect_segment(&inside).unwrap().0, 0.0);

        let miss = Segment::new(Point3::new(-3.0, 2.0, 0.0), Point3::new(3.0, 2.0, 0.0));
        assert!(sphere.intersect_segment(&miss).is_none());
    }

    #[test]
    fn test_capsule_segment_body_and_cap() {
        let capsule = Capsule::new(Point3::new(0.0, 0.0, -1.0), Point3::new(0.0, 0.0, 1.0), 0.5);
        let side = Segment::new(Point3::new(-2.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let (t, p) = capsule.intersect_segment(&side).unwrap();
        assert_relative_eq!(t, 0.375, epsilon = 1e-12);
        assert_relative_eq!(p.x, -0.5, epsilon = 1e-12);

        let top = Segment::new(Point3::new(0.0, 0.0, 3.0), Point3::new(0.0, 0.0, 0.0));
        let (_, p) = capsule.intersect_segment(&top).unwrap();
        assert_relative_eq!(p.z, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_fits_enclose_points() {
        let points: Vec<_> = (0..20)
            .map(|i| {
                let a = f64::from(i) * 0.7;
                Point3::new(a.cos(), a.sin(), f64::from(i) * 0.5)
            })
            .collect();
        let sphere = Sphere::fit(&points);
        let capsule = Capsule::fit(&points);
        for p in &points {
            assert!((p - sphere.center).norm() <= sphere.radius + 1e-9);
            assert!(capsule.segment().distance_squared_to(p).sqrt() <= capsule.radius + 1e-9);
        }
    }
}

//! Lines and line segments.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::EPSILON;
use crate::Transform;

/// An infinite line through `p` along `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Line {
    /// A point on the line.
    pub p: Point3<f64>,
    /// Direction of the line (not necessarily unit length).
    pub direction: Vector3<f64>,
}

impl Line {
    /// Create a line.
    #[must_use]
    pub const fn new(p: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self { p, direction }
    }
}

/// Result of a closest-points query between two segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentClosest {
    /// Parameter along the first segment.
    pub scalar_a: f64,
    /// Closest point on the first segment.
    pub point_a: Point3<f64>,
    /// Parameter along the second segment.
    pub scalar_b: f64,
    /// Closest point on the second segment.
    pub point_b: Point3<f64>,
}

impl SegmentClosest {
    /// Squared distance between the two closest points.
    #[must_use]
    pub fn distance_squared(&self) -> f64 {
        (self.point_a - self.point_b).norm_squared()
    }
}

/// A line segment from `p1` to `p2`, parameterized over `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// Start point (parameter 0).
    pub p1: Point3<f64>,
    /// End point (parameter 1).
    pub p2: Point3<f64>,
}

impl Segment {
    /// Create a segment.
    #[must_use]
    pub const fn new(p1: Point3<f64>, p2: Point3<f64>) -> Self {
        Self { p1, p2 }
    }

    /// Vector from `p1` to `p2`.
    #[must_use]
    pub fn delta(&self) -> Vector3<f64> {
        self.p2 - self.p1
    }

    /// Length of the segment.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.delta().norm()
    }

    /// Point at parameter `t`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.p1 + self.delta() * t
    }

    /// Squared distance from `p` to the nearest point of the segment.
    #[must_use]
    pub fn distance_squared_to(&self, p: &Point3<f64>) -> f64 {
        let pq = self.p2 - self.p1;
        let pp = p - self.p1;
        let e = pp.dot(&pq);
        if e <= 0.0 {
            return pp.norm_squared();
        }
        let f = pq.norm_squared();
        if e >= f {
            return (p - self.p2).norm_squared();
        }
        pp.norm_squared() - e * e / f
    }

    /// Closest point of the segment to `p` and its parameter.
    #[must_use]
    pub fn closest_point_to(&self, p: &Point3<f64>) -> (f64, Point3<f64>) {
        let u = self.p2 - self.p1;
        let len2 = u.norm_squared();
        if len2 < f64::MIN_POSITIVE {
            return (0.0, self.p1);
        }
        let scalar = u.dot(&(p - self.p1)) / len2;
        if scalar <= 0.0 {
            (scalar, self.p1)
        } else if scalar >= 1.0 {
            (scalar, self.p2)
        } else {
            (scalar, self.p1 + u * scalar)
        }
    }

    /// The segment mapped through `transform`.
    #[must_use]
    pub fn transform(&self, transform: &Transform) -> Self {
        Self::new(
            transform.transform_point(&self.p1),
            transform.transform_point(&self.p2),
        )
    }

    /// Closest points between two segments.
    ///
    /// Degenerate (point) segments are handled; parallel overlapping segments
    /// report the midpoint of the shared range.
    #[must_use]
    pub fn closest_points(sa: &Self, sb: &Self) -> SegmentClosest {
        let d1 = sa.p2 - sa.p1;
        let d2 = sb.p2 - sb.p1;
        let r = sa.p1 - sb.p1;
        let a = d1.dot(&d1);
        let e = d2.dot(&d2);
        let f = d2.dot(&r);

        let (scalar_a, scalar_b) = if a < EPSILON && e < EPSILON {
            (0.0, 0.0)
        } else if a < EPSILON {
            (0.0, (f / e).clamp(0.0, 1.0))
        } else {
            let c = d1.dot(&r);
            if e < EPSILON {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else {
                let b = d1.dot(&d2);
                let denom = a * e - b * b;
                if denom < EPSILON {
                    let mut a1 = d2.dot(&sa.p1.coords);
                    let mut a2 = d2.dot(&sa.p2.coords);
                    let b1 = d2.dot(&sb.p1.coords);
                    let b2 = d2.dot(&sb.p2.coords);
                    if a1 <= b1 && a2 <= b1 {
                        (if a2 > a1 { 1.0 } else { 0.0 }, 0.0)
                    } else if a1 >= b2 && a2 >= b2 {
                        (if a2 > a1 { 0.0 } else { 1.0 }, 1.0)
                    } else {
                        if a1 > a2 {
                            std::mem::swap(&mut a1, &mut a2);
                        }
                        let mid = (a2.min(b2) + a1.max(b1)) / 2.0;
                        let scalar_b = (mid - b1) / e;
                        let point_b = sb.p1 + d2 * scalar_b;
                        let (scalar_a, point_a) = sa.closest_point_to(&point_b);
                        return SegmentClosest {
                            scalar_a,
                            point_a,
                            scalar_b,
                            point_b,
                        };
                    }
                } else {
                    let sa_t = ((b * f - c * e) / denom).clamp(0.0, 1.0);
                    let sb_t = (b * sa_t + f) / e;
                    if sb_t < 0.0 {
                        ((-c / a).clamp(0.0, 1.0), 0.0)
                    } else if sb_t > 1.0 {
                        (((b - c) / a).clamp(0.0, 1.0), 1.0)
                    } else {
                        (sa_t, sb_t)
                    }
                }
            }
        };

        SegmentClosest {
            scalar_a,
            point_a: sa.p1 + d1 * scalar_a,
            scalar_b,
            point_b: sb.p1 + d2 * scalar_b,
        }
    }

    /// Whether two segments touch; returns both parameters and the point on
    /// the second segment.
    #[must_use]
    pub fn intersect(sa: &Self, sb: &Self) -> Option<(f64, f64, Point3<f64>)> {
        let c = Self::closest_points(sa, sb);
        (c.distance_squared() < EPSILON).then_some((c.scalar_a, c.scalar_b, c.point_b))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn seg(a: [f64; 3], b: [f64; 3]) -> Segment {
        Segment::new(Point3::from(a), Point3::from(b))
    }

    #[test]
    fn test_distance_to_point() {
        let s = seg([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        assert_relative_eq!(s.distance_squared_to(&Point3::new(1.0, 1.0, 0.0)), 1.0);
        assert_relative_eq!(s.distance_squared_to(&Point3::new(-1.0, 0.0, 0.0)), 1.0);
        assert_relative_eq!(s.distance_squared_to(&Point3::new(4.0, 0.0, 0.0)), 4.0);

        let (t, p) = s.closest_point_to(&Point3::new(0.5, 3.0, 0.0));
        assert_relative_eq!(t, 0.25);
        assert_relative_eq!(p, Point3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_crossing_segments() {
        let a = seg([-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let b = seg([0.0, -1.0, 1.0], [0.0, 1.0, 1.0]);
        let c = Segment::closest_points(&a, &b);
        assert_relative_eq!(c.scalar_a, 0.5);
        assert_relative_eq!(c.scalar_b, 0.5);
        assert_relative_eq!(c.distance_squared(), 1.0);
        assert!(Segment::intersect(&a, &b).is_none());

        let b = seg([0.0, -1.0, 0.0], [0.0, 1.0, 0.0]);
        let (sa, sb, p) = Segment::intersect(&a, &b).unwrap();
        assert_relative_eq!(sa, 0.5);
        assert_relative_eq!(sb, 0.5);
        assert_relative_eq!(p, Point3::origin());
    }

    #[test]
    fn test_parallel_overlap_uses_midpoint() {
        let a = seg([0.0, 0.0, 0.0], [4.0, 0.0, 0.0]);
        let b = seg([2.0, 1.0, 0.0], [6.0, 1.0, 0.0]);
        let c = Segment::closest_points(&a, &b);
        assert_relative_eq!(c.point_a, Point3::new(3.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(c.point_b, Point3::new(3.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_segments() {
        let a = seg([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]);
        let b = seg([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        let c = Segment::closest_points(&a, &b);
        assert_relative_eq!(c.point_b, Point3::new(1.0, 0.0, 0.0));
        let c = Segment::closest_points(&b, &a);
        assert_relative_eq!(c.point_a, Point3::new(1.0, 0.0, 0.0));
    }

    proptest! {
        #[test]
        fn closest_points_are_no_farther_than_endpoints(
            a in prop::array::uniform6(-10.0f64..10.0),
            b in prop::array::uniform6(-10.0f64..10.0),
        ) {
            let sa = seg([a[0], a[1], a[2]], [a[3], a[4], a[5]]);
            let sb = seg([b[0], b[1], b[2]], [b[3], b[4], b[5]]);
            let c = Segment::closest_points(&sa, &sb);
            prop_assert!((0.0..=1.0).contains(&c.scalar_a));
            prop_assert!((0.0..=1.0).contains(&c.scalar_b));
            let d = c.distance_squared();
            for p in [sa.p1, sa.p2] {
                prop_assert!(d <= sb.distance_squared_to(&p) + 1e-6 * (1.0 + d));
            }
        }
    }
}

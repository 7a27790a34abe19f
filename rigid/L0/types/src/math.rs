//! Numeric tolerances and small geometric helpers shared by every crate.

use nalgebra::{Matrix3, Point3, Vector3};

/// Tolerance used for geometric comparisons throughout the engine.
pub const EPSILON: f64 = 1e-6;

/// Compare two floats with an absolute and relative tolerance of [`EPSILON`].
///
/// Returns zero when the values are considered equal, a positive value when
/// `a` is greater and a negative value when `b` is greater.
#[must_use]
pub fn float_compare(a: f64, b: f64) -> i32 {
    #[allow(clippy::float_cmp)]
    if a == b {
        return 0;
    }
    let diff = (a - b).abs();
    if diff < EPSILON {
        return 0;
    }
    if b != 0.0 && diff / b.abs() < EPSILON {
        return 0;
    }
    if a > b {
        1
    } else {
        -1
    }
}

/// Whether two floats are equal within [`EPSILON`] (absolute or relative).
#[must_use]
pub fn float_equals(a: f64, b: f64) -> bool {
    float_compare(a, b) == 0
}

/// Signed angle between two unit directions, positive when the rotation from
/// `d1` to `d2` is counter-clockwise about `axis`.
#[must_use]
pub fn signed_angle(d1: &Vector3<f64>, d2: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let sign = d1.cross(d2).dot(axis);
    let angle = d1.dot(d2).clamp(-1.0, 1.0).acos();
    if sign >= 0.0 {
        angle
    } else {
        -angle
    }
}

/// Whether the triangle `p1, p2, p3` winds counter-clockwise when viewed from
/// the side `normal` points to.
#[must_use]
pub fn is_triangle_ccw(
    normal: &Vector3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
) -> bool {
    let c1 = p1 - p2;
    let c2 = p1 - p3;
    normal.dot(&c1.cross(&c2)) >= EPSILON
}

/// Arithmetic mean of a point set. Returns the origin for an empty set.
#[must_use]
pub fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

/// The point furthest along `direction`.
#[must_use]
pub fn extreme_point(points: &[Point3<f64>], direction: &Vector3<f64>) -> Option<Point3<f64>> {
    points
        .iter()
        .map(|p| (direction.dot(&p.coords), *p))
        .fold(None, |best: Option<(f64, Point3<f64>)>, (x, p)| match best {
            Some((bx, _)) if bx >= x => best,
            _ => Some((x, p)),
        })
        .map(|(_, p)| p)
}

/// Covariance matrix of a point set about its centroid.
#[must_use]
pub fn covariance(points: &[Point3<f64>]) -> Matrix3<f64> {
    if points.is_empty() {
        return Matrix3::zeros();
    }
    let center = centroid(points);
    let sum = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p - center;
        acc + d * d.transpose()
    });
    sum / points.len() as f64
}

/// Direction of greatest spread of a point set (dominant eigenvector of the
/// covariance matrix, found by power iteration).
#[must_use]
pub fn max_spread_axis(points: &[Point3<f64>]) -> Vector3<f64> {
    let co = covariance(points);
    let mut axis = Vector3::new(0.5, 0.5, 0.5).normalize();

    for _ in 0..1000 {
        let next = co * axis;
        let Some(next) = next.try_normalize(EPSILON * EPSILON) else {
            // Zero covariance along the seed: all points coincide or are
            // orthogonal to it.
            break;
        };
        let done = (next - axis).abs().max() < EPSILON;
        axis = next;
        if done {
            break;
        }
    }
    axis
}

/// Skew-symmetric matrix such that `skew(a) * b == a.cross(b)`.
#[must_use]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Normalize a vector, returning zero for vectors too short to normalize.
#[must_use]
pub fn normalize_or_zero(v: &Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(f64::MIN_POSITIVE).unwrap_or_else(Vector3::zeros)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_float_equals() {
        assert!(float_equals(1.0, 1.0 + 1e-8));
        assert!(float_equals(1e9, 1e9 + 1.0));
        assert!(!float_equals(1.0, 1.01));
        assert_eq!(float_compare(2.0, 1.0), 1);
        assert_eq!(float_compare(1.0, 2.0), -1);
    }

    #[test]
    fn test_signed_angle() {
        let x = Vector3::x();
        let y = Vector3::y();
        assert_relative_eq!(
            signed_angle(&x, &y, &Vector3::z()),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            signed_angle(&x, &y, &-Vector3::z()),
            -std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_triangle_winding() {
        let p1 = Point3::new(0.0, 0.0, 0.0);
        let p2 = Point3::new(1.0, 0.0, 0.0);
        let p3 = Point3::new(0.0, 1.0, 0.0);
        assert!(is_triangle_ccw(&Vector3::z(), &p1, &p2, &p3));
        assert!(!is_triangle_ccw(&Vector3::z(), &p1, &p3, &p2));
    }

    #[test]
    fn test_max_spread_axis() {
        let points: Vec<_> = (0..10)
            .map(|i| Point3::new(f64::from(i) * 2.0, 0.1 * f64::from(i % 2), 0.0))
            .collect();
        let axis = max_spread_axis(&points);
        assert!(axis.x.abs() > 0.99);
        assert_relative_eq!(centroid(&points).x, 9.0, epsilon = 1e-12);
        let far = extreme_point(&points, &Vector3::x()).unwrap();
        assert_relative_eq!(far.x, 18.0);
    }

    #[test]
    fn test_skew() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(-2.0, 0.5, 4.0);
        assert_relative_eq!(skew(&a) * b, a.cross(&b), epsilon = 1e-12);
    }
}

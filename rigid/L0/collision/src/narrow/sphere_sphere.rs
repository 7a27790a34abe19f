//! Sphere against sphere.

use nalgebra::Vector3;

use rigid_types::EPSILON;

use super::{normalize_or, ContactSink};
use crate::part::SpherePart;

pub(super) fn overlap(a: &SpherePart, b: &SpherePart, sink: &mut dyn ContactSink) -> bool {
    let (sa, sb) = (a.world(), b.world());
    let d = sa.center - sb.center;
    let r = sa.radius + sb.radius;
    if d.norm_squared() - r * r >= EPSILON {
        return false;
    }
    let n = normalize_or(&d, Vector3::z());
    sink.write_point(&(sa.center - n * sa.radius), &(sb.center + n * sb.radius), &n);
    true
}

// Earliest root of |d + t * delta| = ra + rb within the step.
pub(super) fn swept(
    a: &SpherePart,
    b: &SpherePart,
    delta: &Vector3<f64>,
    sink: &mut dyn ContactSink,
) -> bool {
    if overlap(a, b, sink) {
        return true;
    }
    let (sa, sb) = (a.world(), b.world());
    let d = sa.center - sb.center;
    let r = sa.radius + sb.radius;

    let qa = delta.norm_squared();
    let qb = 2.0 * d.dot(delta);
    let qc = d.norm_squared() - r * r;
    if qb >= 0.0 || qa <= f64::EPSILON {
        return false;
    }
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return false;
    }
    let t = (-qb - disc.sqrt()) / (2.0 * qa);
    if !(0.0..=1.0).contains(&t) {
        return false;
    }

    let n = normalize_or(&(d + delta * t), Vector3::z());
    sink.write_point(&(sa.center - n * sa.radius), &(sb.center + n * sb.radius), &n);
    true
}

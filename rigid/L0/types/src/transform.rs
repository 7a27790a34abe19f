//! Scale, position and orientation of a body or part, plus velocity deltas.
//!
//! A [`Transform`] maps body space to world space as `p + R * (s * x)`: uniform
//! scale first, then rotation, then translation. The combined 4x4 matrix is
//! cached and recomputed by every mutator, so it always agrees with the three
//! components.

use nalgebra::{Matrix3, Matrix4, Point3, Unit, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::EPSILON;

/// Uniform scale, translation and rotation with a cached combined matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    scale: f64,
    position: Point3<f64>,
    orientation: UnitQuaternion<f64>,
    combined: Matrix4<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
            combined: Matrix4::identity(),
        }
    }

    /// Create a transform from its components.
    #[must_use]
    pub fn new(scale: f64, position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        // Re-normalize: quaternions accumulated by callers drift.
        let orientation = UnitQuaternion::new_normalize(orientation.into_inner());
        Self {
            scale,
            position,
            orientation,
            combined: Self::combine_matrix(scale, &position, &orientation),
        }
    }

    /// Create an unscaled transform.
    #[must_use]
    pub fn from_position_orientation(
        position: Point3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> Self {
        Self::new(1.0, position, orientation)
    }

    /// Create an unscaled, unrotated transform.
    #[must_use]
    pub fn from_position(position: Point3<f64>) -> Self {
        Self::new(1.0, position, UnitQuaternion::identity())
    }

    /// Uniform scale factor.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Translation component.
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// Rotation component.
    #[must_use]
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation
    }

    /// Cached `translation * rotation * scale` matrix.
    #[must_use]
    pub fn combined(&self) -> &Matrix4<f64> {
        &self.combined
    }

    /// Rotation part as a 3x3 matrix.
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.orientation.to_rotation_matrix().into_inner()
    }

    /// Replace the translation.
    pub fn set_position(&mut self, position: Point3<f64>) {
        self.position = position;
        self.recompute();
    }

    /// Replace the rotation.
    pub fn set_orientation(&mut self, orientation: UnitQuaternion<f64>) {
        self.orientation = UnitQuaternion::new_normalize(orientation.into_inner());
        self.recompute();
    }

    /// Replace the scale.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
        self.recompute();
    }

    /// Advance the transform by `delta` integrated over `scale` seconds.
    ///
    /// The linear part moves the position; the angular part is treated as a
    /// rotation vector and pre-multiplied onto the orientation.
    pub fn apply_delta(&mut self, scale: f64, delta: &TransformDelta) {
        self.position += delta.linear * scale;

        let length = delta.angular.norm() * scale;
        if length >= EPSILON {
            let axis = Unit::new_normalize(delta.angular);
            let rotation = UnitQuaternion::from_axis_angle(&axis, length);
            self.orientation = UnitQuaternion::new_normalize((rotation * self.orientation).into_inner());
        }
        self.recompute();
    }

    /// The transform mapping world space back to this transform's local space.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let scale = 1.0 / self.scale;
        let orientation = self.orientation.inverse();
        let position = Point3::from(-(orientation * self.position.coords) * scale);
        Self {
            scale,
            position,
            orientation,
            combined: Self::combine_matrix(scale, &position, &orientation),
        }
    }

    /// Transform that applies `self` first and then `outer`.
    #[must_use]
    pub fn then(&self, outer: &Self) -> Self {
        let scale = self.scale * outer.scale;
        let orientation = outer.orientation * self.orientation;
        let position = outer.transform_point(&self.position);
        Self::new(scale, position, orientation)
    }

    /// Map a point from local to world space.
    #[must_use]
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.position + self.orientation * (p.coords * self.scale)
    }

    /// Map a direction from local to world space, including scale.
    #[must_use]
    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.orientation * (v * self.scale)
    }

    /// Rotate a direction without scaling it.
    #[must_use]
    pub fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.orientation * v
    }

    /// Whether this is the identity transform.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.combined == Matrix4::identity()
    }

    fn recompute(&mut self) {
        self.combined = Self::combine_matrix(self.scale, &self.position, &self.orientation);
    }

    fn combine_matrix(
        scale: f64,
        position: &Point3<f64>,
        orientation: &UnitQuaternion<f64>,
    ) -> Matrix4<f64> {
        let mut m = orientation.to_homogeneous();
        for c in 0..3 {
            for r in 0..3 {
                m[(r, c)] *= scale;
            }
        }
        m[(0, 3)] = position.x;
        m[(1, 3)] = position.y;
        m[(2, 3)] = position.z;
        m
    }
}

/// A linear and angular pair, used both for velocities and for per-step
/// displacements.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransformDelta {
    /// Linear component.
    pub linear: Vector3<f64>,
    /// Angular component as a rotation vector (axis times magnitude).
    pub angular: Vector3<f64>,
}

impl TransformDelta {
    /// Create a delta from its components.
    #[must_use]
    pub const fn new(linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        Self { linear, angular }
    }

    /// Create a delta from a linear part and an axis-angle rotation.
    #[must_use]
    pub fn from_axis_angle(linear: Vector3<f64>, axis: &Vector3<f64>, angle: f64) -> Self {
        Self {
            linear,
            angular: axis * angle,
        }
    }

    /// The zero delta.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Whether either component is non-negligible.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.linear.norm_squared() >= EPSILON || self.angular.norm_squared() >= EPSILON
    }

    /// Add to both components.
    pub fn add(&mut self, linear: &Vector3<f64>, angular: &Vector3<f64>) {
        self.linear += linear;
        self.angular += angular;
    }

    /// Both components multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            linear: self.linear * factor,
            angular: self.angular * factor,
        }
    }

    /// Reset both components to zero.
    pub fn set_zero(&mut self) {
        self.linear = Vector3::zeros();
        self.angular = Vector3::zeros();
    }

    /// Rescale each component so its length does not exceed the given limit.
    /// Non-finite components are zeroed.
    pub fn clamp(&mut self, max_linear: f64, max_angular: f64) {
        self.linear = clamp_length(self.linear, max_linear);
        self.angular = clamp_length(self.angular, max_angular);
    }
}

fn clamp_length(v: Vector3<f64>, max: f64) -> Vector3<f64> {
    let len2 = v.norm_squared();
    if len2.is_nan() {
        Vector3::zeros()
    } else if len2 > max * max {
        v * (max / len2.sqrt())
    } else {
        v
    }
}

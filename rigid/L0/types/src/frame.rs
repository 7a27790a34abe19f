//! Orthonormal reference frames and axis masks.

use std::f64::consts::FRAC_PI_2;
use std::ops::{BitAnd, BitOr};

use nalgebra::{Matrix3, Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::EPSILON;
use crate::{PhysicsError, Result, Transform};

/// A set of coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Axes(u8);

impl Axes {
    /// No axes.
    pub const NONE: Self = Self(0);
    /// The X axis.
    pub const X: Self = Self(1);
    /// The Y axis.
    pub const Y: Self = Self(2);
    /// The Z axis.
    pub const Z: Self = Self(4);
    /// All three axes.
    pub const ALL: Self = Self(7);

    /// Whether every axis in `other` is part of this set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether axis `index` (0 = X, 1 = Y, 2 = Z) is part of this set.
    #[must_use]
    pub const fn has_index(self, index: usize) -> bool {
        index < 3 && self.0 & (1 << index) != 0
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Axes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for Axes {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// A right-handed orthonormal basis with an origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    /// X axis.
    pub x: Vector3<f64>,
    /// Y axis.
    pub y: Vector3<f64>,
    /// Z axis.
    pub z: Vector3<f64>,
    /// Origin.
    pub origin: Point3<f64>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::identity()
    }
}

impl Frame {
    /// World axes at the world origin.
    #[must_use]
    pub fn identity() -> Self {
        Self::at(Point3::origin())
    }

    /// World axes at `origin`.
    #[must_use]
    pub fn at(origin: Point3<f64>) -> Self {
        Self {
            x: Vector3::x(),
            y: Vector3::y(),
            z: Vector3::z(),
            origin,
        }
    }

    /// Build a frame from axes, at most one of which may be zero; the zero
    /// axis is completed from the other two.
    pub fn new(
        x: Vector3<f64>,
        y: Vector3<f64>,
        z: Vector3<f64>,
        origin: Point3<f64>,
    ) -> Result<Self> {
        let mut frame = Self { x, y, z, origin };
        frame.normalize()?;
        Ok(frame)
    }

    /// Complete a missing axis, normalize, and verify orthogonality.
    pub fn normalize(&mut self) -> Result<()> {
        let zero = Vector3::zeros();
        if self.x == zero {
            self.x = self.y.cross(&self.z);
        } else if self.y == zero {
            self.y = self.z.cross(&self.x);
        } else if self.z == zero {
            self.z = self.x.cross(&self.y);
        }

        for axis in [&mut self.x, &mut self.y, &mut self.z] {
            let len2 = axis.norm_squared();
            if len2 < f64::MIN_POSITIVE {
                return Err(PhysicsError::invalid_geometry("frame axis has zero length"));
            }
            if (len2 - 1.0).abs() >= EPSILON {
                *axis /= len2.sqrt();
            }
        }

        if self.x.dot(&self.y).abs() >= EPSILON
            || self.x.dot(&self.z).abs() >= EPSILON
            || self.y.dot(&self.z).abs() >= EPSILON
        {
            return Err(PhysicsError::invalid_geometry("frame axes are not orthogonal"));
        }
        Ok(())
    }

    /// Axis `index` (0 = X, 1 = Y, 2 = Z).
    #[must_use]
    pub fn axis(&self, index: usize) -> Vector3<f64> {
        match index {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Matrix whose rows are the X, Y and Z axes. Multiplying a world vector
    /// by it expresses the vector in this frame's coordinates.
    #[must_use]
    pub fn to_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_rows(&[
            self.x.transpose(),
            self.y.transpose(),
            self.z.transpose(),
        ])
    }

    /// Euler angles (about X, then Y, then Z) of this frame's rotation.
    #[must_use]
    pub fn euler_angles_xyz(&self) -> Vector3<f64> {
        if self.x.z - 1.0 < EPSILON {
            if self.x.z + 1.0 > -EPSILON {
                Vector3::new(
                    self.y.z.atan2(self.z.z),
                    (-self.x.z).clamp(-1.0, 1.0).asin(),
                    self.x.y.atan2(self.x.x),
                )
            } else {
                Vector3::new(-self.y.x.atan2(self.y.y), -FRAC_PI_2, 0.0)
            }
        } else {
            Vector3::new(self.y.x.atan2(self.y.y), FRAC_PI_2, 0.0)
        }
    }

    /// Frame `b1` expressed relative to `b2`: each axis of `b1` in `b2`'s
    /// coordinates, and the difference of the origins.
    #[must_use]
    pub fn subtract(b1: &Self, b2: &Self) -> Self {
        let m2 = b2.to_matrix();
        Self {
            x: m2 * b1.x,
            y: m2 * b1.y,
            z: m2 * b1.z,
            origin: Point3::from(b1.origin - b2.origin),
        }
    }

    /// The frame mapped through `transform` (axes rotated, origin fully
    /// transformed).
    #[must_use]
    pub fn transform(&self, transform: &Transform) -> Self {
        Self {
            x: transform.rotate(&self.x),
            y: transform.rotate(&self.y),
            z: transform.rotate(&self.z),
            origin: transform.transform_point(&self.origin),
        }
    }
}

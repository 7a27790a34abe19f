//! Mass and inertia of rigid bodies.
//!
//! Every constructor returns properties expressed about the body origin, so
//! properties of several parts of one body can be summed with
//! [`MassProperties::combine`]. Immovable bodies carry infinite mass and
//! inertia with zero inverses; every helper that builds an effective mass
//! treats such a body as contributing nothing.

use std::f64::consts::PI;

use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::{skew, EPSILON};
use crate::{PhysicsError, Result, Transform};

/// Mass, inertia tensor and their inverses.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    mass: f64,
    mass_inverse: f64,
    inertia: Matrix3<f64>,
    inertia_inverse: Matrix3<f64>,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self::immovable()
    }
}

impl MassProperties {
    /// Create mass properties from a mass and an inertia tensor.
    ///
    /// Infinite or non-positive mass yields a zero inverse mass. A tensor that
    /// cannot be inverted yields a zero inverse tensor, so the body never
    /// rotates in response to impulses.
    #[must_use]
    pub fn new(mass: f64, inertia: Matrix3<f64>) -> Self {
        let mass_inverse = if mass.is_finite() && mass > 0.0 {
            1.0 / mass
        } else {
            0.0
        };
        let inertia_inverse = if inertia.iter().all(|v| v.is_finite()) {
            inertia.try_inverse().unwrap_or_else(Matrix3::zeros)
        } else {
            Matrix3::zeros()
        };
        Self {
            mass,
            mass_inverse,
            inertia,
            inertia_inverse,
        }
    }

    /// Properties of a body that never moves.
    #[must_use]
    pub fn immovable() -> Self {
        Self {
            mass: f64::INFINITY,
            mass_inverse: 0.0,
            inertia: Matrix3::from_diagonal_element(f64::INFINITY),
            inertia_inverse: Matrix3::zeros(),
        }
    }

    /// Mass.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Inverse mass (zero for immovable bodies).
    #[must_use]
    pub fn mass_inverse(&self) -> f64 {
        self.mass_inverse
    }

    /// Inertia tensor.
    #[must_use]
    pub fn inertia(&self) -> &Matrix3<f64> {
        &self.inertia
    }

    /// Inverse inertia tensor.
    #[must_use]
    pub fn inertia_inverse(&self) -> &Matrix3<f64> {
        &self.inertia_inverse
    }

    /// Whether the mass is infinite.
    #[must_use]
    pub fn is_immovable(&self) -> bool {
        self.mass == f64::INFINITY
    }

    /// Solid sphere of uniform density.
    #[must_use]
    pub fn from_sphere(density: f64, center: Point3<f64>, radius: f64) -> Self {
        let m = (4.0 / 3.0) * PI * radius.powi(3) * density;
        let i = 0.4 * m * radius * radius;
        let tensor = translate_inertia_tensor(
            &Matrix3::from_diagonal_element(i),
            m,
            &center.coords,
        );
        Self::new(m, tensor)
    }

    /// Solid capsule (cylinder plus two hemispherical caps) of uniform
    /// density. Also returns the center of mass.
    #[must_use]
    pub fn from_capsule(
        density: f64,
        p1: Point3<f64>,
        p2: Point3<f64>,
        radius: f64,
    ) -> (Self, Point3<f64>) {
        let axis = p2 - p1;
        let length = axis.norm();
        let center = nalgebra::center(&p1, &p2);

        let orientation = if length < EPSILON {
            UnitQuaternion::identity()
        } else {
            UnitQuaternion::rotation_between(&Vector3::z(), &axis)
                .unwrap_or_else(UnitQuaternion::identity)
        };

        let r2 = radius * radius;
        let m_cyl = density * PI * r2 * length;
        let m_end = density * (2.0 / 3.0) * PI * r2 * radius;
        let half = 0.5 * length;
        let ixxyy = (1.0 / 12.0) * m_cyl * (3.0 * r2 + length * length)
            + 0.4 * m_end * r2
            + m_end * half * half;
        let izz = 0.5 * m_cyl * r2 + 0.4 * m_end * r2;

        let r = orientation.to_rotation_matrix().into_inner();
        let local = Matrix3::from_diagonal(&Vector3::new(ixxyy, ixxyy, izz));
        let m = m_cyl + 2.0 * m_end;
        let tensor = translate_inertia_tensor(&(r * local * r.transpose()), m, &center.coords);
        (Self::new(m, tensor), center)
    }

    /// Solid box of uniform density centered on the origin.
    #[must_use]
    pub fn from_cuboid(density: f64, dimensions: Vector3<f64>) -> Self {
        let d = dimensions;
        let m = d.x * d.y * d.z * density;
        let f = m / 12.0;
        let tensor = Matrix3::from_diagonal(&Vector3::new(
            f * (d.y * d.y + d.z * d.z),
            f * (d.x * d.x + d.z * d.z),
            f * (d.x * d.x + d.y * d.y),
        ));
        Self::new(m, tensor)
    }

    /// Closed triangle mesh of uniform density, integrated over its surface
    /// (Mirtich). Triangles must wind counter-clockwise seen from outside.
    /// Also returns the center of mass.
    pub fn from_tri_mesh(
        density: f64,
        vertices: &[Point3<f64>],
        indices: &[usize],
    ) -> Result<(Self, Point3<f64>)> {
        if indices.len() % 3 != 0 {
            return Err(PhysicsError::invalid_geometry(
                "triangle index count is not a multiple of three",
            ));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= vertices.len()) {
            return Err(PhysicsError::invalid_geometry(format!(
                "triangle index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }

        // Integrals of 1, x, y, z, x², y², z², xy, yz, zx.
        let mut integral = [0.0_f64; 10];
        for tri in indices.chunks_exact(3) {
            let [p0, p1, p2] = [vertices[tri[0]], vertices[tri[1]], vertices[tri[2]]];
            let d = (p1 - p0).cross(&(p2 - p0));

            let sub = |w0: f64, w1: f64, w2: f64| {
                let t0 = w0 + w1;
                let t1 = w0 * w0;
                let t2 = t1 + w1 * t0;
                let f1 = t0 + w2;
                let f2 = t2 + w2 * f1;
                let f3 = w0 * t1 + w1 * t2 + w2 * f2;
                let g0 = f2 + w0 * (f1 + w0);
                let g1 = f2 + w1 * (f1 + w1);
                let g2 = f2 + w2 * (f1 + w2);
                (f1, f2, f3, [g0, g1, g2])
            };
            let (f1x, f2x, f3x, gx) = sub(p0.x, p1.x, p2.x);
            let (_, f2y, f3y, gy) = sub(p0.y, p1.y, p2.y);
            let (_, f2z, f3z, gz) = sub(p0.z, p1.z, p2.z);

            integral[0] += d.x * f1x;
            integral[1] += d.x * f2x;
            integral[2] += d.y * f2y;
            integral[3] += d.z * f2z;
            integral[4] += d.x * f3x;
            integral[5] += d.y * f3y;
            integral[6] += d.z * f3z;
            integral[7] += d.x * (p0.y * gx[0] + p1.y * gx[1] + p2.y * gx[2]);
            integral[8] += d.y * (p0.z * gy[0] + p1.z * gy[1] + p2.z * gy[2]);
            integral[9] += d.z * (p0.x * gz[0] + p1.x * gz[1] + p2.x * gz[2]);
        }

        let [v, sx, sy, sz, xx, yy, zz, xy, yz, zx] = integral;
        let (v, sx, sy, sz) = (v / 6.0, sx / 24.0, sy / 24.0, sz / 24.0);
        let (xx, yy, zz) = (xx / 60.0, yy / 60.0, zz / 60.0);
        let (xy, yz, zx) = (xy / 120.0, yz / 120.0, zx / 120.0);

        if v.abs() < f64::MIN_POSITIVE {
            return Err(PhysicsError::invalid_geometry("triangle mesh encloses no volume"));
        }
        let c = Point3::new(sx / v, sy / v, sz / v);

        // Inertia about the center of mass.
        let about_center = Matrix3::new(
            yy + zz - v * (c.y * c.y + c.z * c.z),
            -xy + v * c.x * c.y,
            -zx + v * c.z * c.x,
            -xy + v * c.x * c.y,
            xx + zz - v * (c.z * c.z + c.x * c.x),
            -yz + v * c.y * c.z,
            -zx + v * c.z * c.x,
            -yz + v * c.y * c.z,
            xx + yy - v * (c.x * c.x + c.y * c.y),
        ) * density;

        let mass = v * density;
        let tensor = translate_inertia_tensor(&about_center, mass, &c.coords);
        Ok((Self::new(mass, tensor), c))
    }

    /// Sum of several properties expressed about the same origin.
    #[must_use]
    pub fn combine(parts: &[Self]) -> Self {
        if parts.iter().any(Self::is_immovable) {
            return Self::immovable();
        }
        let mass = parts.iter().map(|p| p.mass).sum();
        let inertia = parts.iter().fold(Matrix3::zeros(), |acc, p| acc + p.inertia);
        Self::new(mass, inertia)
    }

    /// The same properties with the tensor rotated into the frame of
    /// `transform` (`R * I * Rᵀ`).
    #[must_use]
    pub fn transform(&self, transform: &Transform) -> Self {
        if self.is_immovable() {
            return *self;
        }
        let r = transform.rotation_matrix();
        let rt = r.transpose();
        Self {
            mass: self.mass,
            mass_inverse: self.mass_inverse,
            inertia: r * self.inertia * rt,
            inertia_inverse: r * self.inertia_inverse * rt,
        }
    }

    /// Inverse effective mass of this body alone along `n`, applied at
    /// `offset` from the center of mass. Zero for immovable bodies.
    #[must_use]
    pub fn inverse_effective_mass(&self, offset: &Vector3<f64>, n: &Vector3<f64>) -> f64 {
        if self.is_immovable() {
            return 0.0;
        }
        let v = (self.inertia_inverse * offset.cross(n)).cross(offset);
        self.mass_inverse + n.dot(&v)
    }

    /// Effective mass of this body alone along `n` at `offset`.
    #[must_use]
    pub fn effective_mass_single(&self, offset: &Vector3<f64>, n: &Vector3<f64>) -> f64 {
        1.0 / self.inverse_effective_mass(offset, n).max(EPSILON)
    }

    /// Effective mass of a pair of bodies along the unit direction `normal`,
    /// bounded above by `1 / EPSILON`.
    #[must_use]
    pub fn effective_mass(
        a: &Self,
        b: &Self,
        offset_a: &Vector3<f64>,
        offset_b: &Vector3<f64>,
        normal: &Vector3<f64>,
    ) -> f64 {
        let k = a.inverse_effective_mass(offset_a, normal) + b.inverse_effective_mass(offset_b, normal);
        1.0 / k.max(EPSILON)
    }

    /// Matrix mapping an impulse at `offset` to the velocity change of that
    /// point. Zero for immovable bodies.
    #[must_use]
    pub fn inverse_mass_matrix(&self, offset: &Vector3<f64>) -> Matrix3<f64> {
        if self.is_immovable() {
            return Matrix3::zeros();
        }
        let c = skew(offset);
        Matrix3::from_diagonal_element(self.mass_inverse) - c * self.inertia_inverse * c
    }

    /// Inverse of the summed point inverse-mass matrices of two bodies.
    /// Returns zero when both bodies are immovable.
    #[must_use]
    pub fn effective_mass_matrix(
        a: &Self,
        b: &Self,
        offset_a: &Vector3<f64>,
        offset_b: &Vector3<f64>,
    ) -> Matrix3<f64> {
        let k = a.inverse_mass_matrix(offset_a) + b.inverse_mass_matrix(offset_b);
        k.try_inverse().unwrap_or_else(Matrix3::zeros)
    }
}

/// Shift an inertia tensor by `offset` using the parallel-axis theorem.
#[must_use]
pub fn translate_inertia_tensor(tensor: &Matrix3<f64>, mass: f64, offset: &Vector3<f64>) -> Matrix3<f64> {
    let (x, y, z) = (offset.x, offset.y, offset.z);
    let m = mass;
    tensor
        + Matrix3::new(
            m * (y * y + z * z),
            -m * x * y,
            -m * x * z,
            -m * y * x,
            m * (z * z + x * x),
            -m * y * z,
            -m * z * x,
            -m * z * y,
            m * (x * x + y * y),
        )
}

//! Six-degree-of-freedom limit constraint.
//!
//! A reference frame is fixed to each body at construction. Every step the
//! constraint measures the first frame relative to the second: the
//! positional offset in the second frame's axes, and the XYZ Euler angles of
//! the relative rotation. Each of the six coordinates can be limited to a
//! range. A range narrower than twice the error tolerance locks the
//! coordinate; otherwise the limit only engages when the coordinate reaches
//! one end, and the solver may push but never pull.
//!
//! Rotation is restricted about the Bullet-style axes derived from the two
//! frames, not about the raw frame axes.

use nalgebra::Vector3;
use tracing::debug;

use rigid_types::math::normalize_or_zero;
use rigid_types::{Axes, BodyId, Frame, MassProperties};

use super::{Constraint, SolverContext};
use crate::body::RigidBody;
use crate::body_set::{BodyMut, BodySet};

/// Limit state of one constrained coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LimitState {
    /// Free within its range.
    #[default]
    Inactive,
    /// Held within a range narrower than the tolerance.
    Locked,
    /// At or below the lower bound; only pushes up.
    Min,
    /// At or above the upper bound; only pushes down.
    Max,
}

impl LimitState {
    fn compute(limited: bool, value: f64, min: f64, max: f64, tolerance: f64) -> Self {
        if !limited {
            Self::Inactive
        } else if (max - min).abs() < tolerance * 2.0 {
            Self::Locked
        } else if value <= min {
            Self::Min
        } else if value >= max {
            Self::Max
        } else {
            Self::Inactive
        }
    }

    // Accumulated impulses may not point out of the feasible half-space.
    fn clamp(self, accumulated: f64) -> f64 {
        match self {
            Self::Min if accumulated < 0.0 => 0.0,
            Self::Max if accumulated > 0.0 => 0.0,
            _ => accumulated,
        }
    }

    fn error(self, value: f64, min: f64, max: f64) -> f64 {
        match self {
            Self::Inactive => 0.0,
            Self::Locked if value < min => min - value,
            Self::Locked if value > max => max - value,
            Self::Locked => 0.0,
            Self::Min => min - value,
            Self::Max => max - value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Vitals {
    basis_b: Frame,
    positions: Vector3<f64>,
    angles: Vector3<f64>,
    axes: [Vector3<f64>; 3],
    inertia: Vector3<f64>,
    mass: Vector3<f64>,
    anchor_a: Vector3<f64>,
    anchor_b: Vector3<f64>,
}

/// Limits the relative position and orientation of two bodies.
#[derive(Debug, Clone)]
pub struct GenericConstraint {
    body_a: BodyId,
    body_b: BodyId,
    body_basis_a: Frame,
    body_basis_b: Frame,
    limited_pos: Axes,
    min_pos: Vector3<f64>,
    max_pos: Vector3<f64>,
    limited_rot: Axes,
    min_angles: Vector3<f64>,
    max_angles: Vector3<f64>,
    state_pos: [LimitState; 3],
    state_rot: [LimitState; 3],
    impulse_pos: Vector3<f64>,
    impulse_rot: Vector3<f64>,
    flash_pos: [Vector3<f64>; 3],
    flash_rot: [Vector3<f64>; 3],
    vitals: Vitals,
    is_collision_enabled: bool,
}

impl GenericConstraint {
    /// Attach `basis` (in world space, at the bodies' current placement) to
    /// both bodies. No coordinate is limited until limits are added.
    #[must_use]
    pub fn new(a: &RigidBody, b: &RigidBody, basis: Frame) -> Self {
        Self {
            body_a: a.id(),
            body_b: b.id(),
            body_basis_a: basis.transform(a.world_inverse()),
            body_basis_b: basis.transform(b.world_inverse()),
            limited_pos: Axes::NONE,
            min_pos: Vector3::zeros(),
            max_pos: Vector3::zeros(),
            limited_rot: Axes::NONE,
            min_angles: Vector3::zeros(),
            max_angles: Vector3::zeros(),
            state_pos: [LimitState::Inactive; 3],
            state_rot: [LimitState::Inactive; 3],
            impulse_pos: Vector3::zeros(),
            impulse_rot: Vector3::zeros(),
            flash_pos: [Vector3::zeros(); 3],
            flash_rot: [Vector3::zeros(); 3],
            vitals: Vitals::default(),
            is_collision_enabled: true,
        }
    }

    /// Limit the position of the first frame's origin, measured along the
    /// second frame's axes.
    #[must_use]
    pub fn with_linear_limits(mut self, axes: Axes, min: Vector3<f64>, max: Vector3<f64>) -> Self {
        self.limited_pos = axes;
        self.min_pos = min;
        self.max_pos = max;
        self
    }

    /// Limit the XYZ Euler angles of the first frame relative to the second.
    #[must_use]
    pub fn with_angular_limits(mut self, axes: Axes, min: Vector3<f64>, max: Vector3<f64>) -> Self {
        self.limited_rot = axes;
        self.min_angles = min;
        self.max_angles = max;
        self
    }

    /// Enable or disable collisions between the two bodies.
    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.is_collision_enabled = enabled;
    }

    /// Current limit states of the linear coordinates.
    #[must_use]
    pub fn linear_states(&self) -> [LimitState; 3] {
        self.state_pos
    }

    /// Current limit states of the angular coordinates.
    #[must_use]
    pub fn angular_states(&self) -> [LimitState; 3] {
        self.state_rot
    }

    /// Relative position measured at the last solver pass.
    #[must_use]
    pub fn positions(&self) -> Vector3<f64> {
        self.vitals.positions
    }

    /// Relative Euler angles measured at the last solver pass.
    #[must_use]
    pub fn angles(&self) -> Vector3<f64> {
        self.vitals.angles
    }

    fn compute_vitals(&mut self, a: &RigidBody, b: &RigidBody) {
        let basis_a = self.body_basis_a.transform(a.world());
        let basis_b = self.body_basis_b.transform(b.world());
        let relative = Frame::subtract(&basis_a, &basis_b);

        let positions = basis_b.to_matrix() * (basis_a.origin - basis_b.origin);
        let angles = relative.euler_angles_xyz();

        let axis_y = basis_b.z.cross(&basis_a.x);
        let axis_x = axis_y.cross(&basis_b.z);
        let axis_z = basis_a.x.cross(&axis_y);
        let axes = [
            normalize_or_zero(&axis_x),
            normalize_or_zero(&axis_y),
            normalize_or_zero(&axis_z),
        ];

        let mut k = nalgebra::Matrix3::zeros();
        if a.is_movable() {
            k += a.mass_world().inertia_inverse();
        }
        if b.is_movable() {
            k += b.mass_world().inertia_inverse();
        }
        let k = k.try_inverse().unwrap_or_else(|| {
            debug!(a = %a.id(), b = %b.id(), "singular angular mass, angular limits inert");
            nalgebra::Matrix3::zeros()
        });
        let inertia = Vector3::from_fn(|i, _| axes[i].dot(&(k * axes[i])));

        let anchor_a = basis_a.origin - a.position();
        let anchor_b = basis_b.origin - b.position();
        let mass = Vector3::from_fn(|i, _| {
            MassProperties::effective_mass(a.mass_world(), b.mass_world(), &anchor_a, &anchor_b, &basis_b.axis(i))
        });

        self.vitals = Vitals {
            basis_b,
            positions,
            angles,
            axes,
            inertia,
            mass,
            anchor_a,
            anchor_b,
        };
    }

    fn apply_linear(&self, a: &mut BodyMut<'_>, b: &mut BodyMut<'_>, impulse: &Vector3<f64>) {
        a.apply_impulse(impulse, &self.vitals.anchor_a);
        b.apply_impulse(&-impulse, &self.vitals.anchor_b);
    }
}

impl Constraint for GenericConstraint {
    fn bodies(&self) -> (BodyId, Option<BodyId>) {
        (self.body_a, Some(self.body_b))
    }

    fn is_collision_enabled(&self) -> bool {
        self.is_collision_enabled
    }

    fn pre_process(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
        let Some((mut a, mut b)) = bodies.pair_mut(self.body_a, self.body_b) else {
            return;
        };
        self.compute_vitals(&a, &b);
        let config = ctx.config;

        let previous = self.state_pos;
        for i in 0..3 {
            self.state_pos[i] = LimitState::compute(
                self.limited_pos.has_index(i),
                self.vitals.positions[i],
                self.min_pos[i],
                self.max_pos[i],
                config.linear_error_tolerance,
            );
            self.state_rot[i] = LimitState::compute(
                self.limited_rot.has_index(i),
                self.vitals.angles[i],
                self.min_angles[i],
                self.max_angles[i],
                config.angular_error_tolerance,
            );
        }

        // Linear impulses carry over while the limit state holds.
        for i in 0..3 {
            if config.is_contact_warm_start_enabled && previous[i] == self.state_pos[i] {
                let impulse = self.vitals.basis_b.axis(i) * self.impulse_pos[i];
                self.apply_linear(&mut a, &mut b, &impulse);
            } else {
                self.impulse_pos[i] = 0.0;
            }
        }

        self.impulse_rot = Vector3::zeros();
        self.flash_pos = [Vector3::zeros(); 3];
        self.flash_rot = [Vector3::zeros(); 3];
    }

    fn process_velocity(&mut self, bodies: &mut BodySet<'_>, _ctx: &SolverContext<'_>) {
        let Some((mut a, mut b)) = bodies.pair_mut(self.body_a, self.body_b) else {
            return;
        };

        let relative = a.velocity_at_point(&self.vitals.anchor_a) - b.velocity_at_point(&self.vitals.anchor_b);
        for i in 0..3 {
            let state = self.state_pos[i];
            if state == LimitState::Inactive {
                continue;
            }
            let axis = self.vitals.basis_b.axis(i);
            let old = self.impulse_pos[i];
            self.impulse_pos[i] = state.clamp(old - axis.dot(&relative) * self.vitals.mass[i]);
            let impulse = axis * (self.impulse_pos[i] - old);
            self.apply_linear(&mut a, &mut b, &impulse);
        }

        let relative = a.angular_velocity() - b.angular_velocity();
        for i in 0..3 {
            let state = self.state_rot[i];
            if state == LimitState::Inactive {
                continue;
            }
            let axis = self.vitals.axes[i];
            let old = self.impulse_rot[i];
            self.impulse_rot[i] = state.clamp(old - axis.dot(&relative) * self.vitals.inertia[i]);
            let impulse = axis * (self.impulse_rot[i] - old);
            a.apply_angular_impulse(&impulse);
            b.apply_angular_impulse(&-impulse);
        }
    }

    fn process_position(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) -> bool {
        let Some((mut a, mut b)) = bodies.pair_mut(self.body_a, self.body_b) else {
            return true;
        };
        self.compute_vitals(&a, &b);
        let config = ctx.config;
        let factor = config.position_correction_factor;
        let mut satisfied = true;

        for i in 0..3 {
            let state = self.state_pos[i];
            let error = state.error(self.vitals.positions[i], self.min_pos[i], self.max_pos[i]);
            if state == LimitState::Inactive || error.abs() <= config.linear_error_tolerance {
                continue;
            }
            satisfied = false;
            let axis = self.vitals.basis_b.axis(i);
            let old = self.flash_pos[i];
            let mut accumulated = old + axis * (error * self.vitals.mass[i] * factor);
            if state.clamp(axis.dot(&accumulated)) == 0.0 && state != LimitState::Locked {
                accumulated = Vector3::zeros();
            }
            self.flash_pos[i] = accumulated;
            let impulse = accumulated - old;
            a.apply_flash_impulse(&impulse, &self.vitals.anchor_a);
            b.apply_flash_impulse(&-impulse, &self.vitals.anchor_b);
        }

        for i in 0..3 {
            let state = self.state_rot[i];
            let error = state.error(self.vitals.angles[i], self.min_angles[i], self.max_angles[i]);
            if state == LimitState::Inactive || error.abs() < config.angular_error_tolerance {
                continue;
            }
            satisfied = false;
            let axis = self.vitals.axes[i];
            let old = self.flash_rot[i];
            let mut accumulated = old + axis * (error * self.vitals.inertia[i] * factor);
            if state.clamp(axis.dot(&accumulated)) == 0.0 && state != LimitState::Locked {
                accumulated = Vector3::zeros();
            }
            self.flash_rot[i] = accumulated;
            let impulse = accumulated - old;
            a.apply_flash_angular_impulse(&impulse);
            b.apply_flash_angular_impulse(&-impulse);
        }
        satisfied
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::constraint::tests::{ball, cube};
    use crate::contact_cache::ContactCache;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, UnitQuaternion};
    use rigid_types::PhysicsConfig;

    #[test]
    fn test_limit_state_selection() {
        let tol = 0.001;
        assert_eq!(LimitState::compute(false, 5.0, 0.0, 1.0, tol), LimitState::Inactive);
        assert_eq!(LimitState::compute(true, 5.0, 0.0, 0.0, tol), LimitState::Locked);
        assert_eq!(LimitState::compute(true, -1.0, 0.0, 1.0, tol), LimitState::Min);
        assert_eq!(LimitState::compute(true, 2.0, 0.0, 1.0, tol), LimitState::Max);
        assert_eq!(LimitState::compute(true, 0.5, 0.0, 1.0, tol), LimitState::Inactive);
    }

    #[test]
    fn test_limit_state_clamp_and_error() {
        assert_relative_eq!(LimitState::Min.clamp(-1.0), 0.0);
        assert_relative_eq!(LimitState::Min.clamp(1.0), 1.0);
        assert_relative_eq!(LimitState::Max.clamp(1.0), 0.0);
        assert_relative_eq!(LimitState::Locked.clamp(-1.0), -1.0);
        assert_relative_eq!(LimitState::Locked.error(0.5, 0.0, 0.0), -0.5);
        assert_relative_eq!(LimitState::Min.error(-0.5, 0.0, 1.0), 0.5);
    }

    #[test]
    fn test_measures_relative_position_in_second_basis() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let mut a = ball(Point3::new(1.0, 0.0, 0.0));
        let mut b = cube(1.0, Point3::origin());
        let mut c = GenericConstraint::new(&a, &b, Frame::at(Point3::new(0.5, 0.0, 0.0)));

        a.set_world(Point3::new(1.0, 0.3, 0.0), UnitQuaternion::identity());
        b.set_world(
            Point3::origin(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2),
        );
        let mut set = BodySet::new();
        set.insert(&mut a);
        set.insert(&mut b);
        c.pre_process(&mut set, &ctx);

        // Frame origin on `a` is at (0.5, 0.3, 0); on `b` it is at (0, 0.5, 0)
        // with the frame's x axis along world y.
        assert_relative_eq!(c.positions(), Vector3::new(-0.2, -0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(c.angles().z, -std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_locked_axes_pull_bodies_together() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let mut a = ball(Point3::new(1.0, 0.0, 0.0));
        let mut b = ball(Point3::origin());
        let mut c = GenericConstraint::new(&a, &b, Frame::at(Point3::new(0.5, 0.0, 0.0)))
            .with_linear_limits(Axes::ALL, Vector3::zeros(), Vector3::zeros());

        a.set_linear_velocity(Vector3::new(2.0, 0.0, 0.0));
        let mut set = BodySet::new();
        set.insert(&mut a);
        set.insert(&mut b);
        c.pre_process(&mut set, &ctx);
        assert_eq!(c.linear_states(), [LimitState::Locked; 3]);
        for _ in 0..config.velocity_iterations {
            c.process_velocity(&mut set, &ctx);
        }
        drop(set);
        assert_relative_eq!(a.linear_velocity().x, b.linear_velocity().x, epsilon = 1e-6);
        assert!(b.linear_velocity().x > 0.9);
    }

    #[test]
    fn test_position_pass_corrects_drift() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let mut a = ball(Point3::new(1.0, 0.0, 0.0));
        let mut b = ball(Point3::origin());
        let mut c = GenericConstraint::new(&a, &b, Frame::at(Point3::new(0.5, 0.0, 0.0)))
            .with_linear_limits(Axes::ALL, Vector3::zeros(), Vector3::zeros());
        a.set_world(Point3::new(1.2, 0.0, 0.0), UnitQuaternion::identity());

        let mut set = BodySet::new();
        set.insert(&mut a);
        set.insert(&mut b);
        c.pre_process(&mut set, &ctx);
        let before = c.positions().x;
        for _ in 0..50 {
            if c.process_position(&mut set, &ctx) {
                break;
            }
        }
        assert!(c.positions().x.abs() < before.abs());
    }

    #[test]
    fn test_point_masses_leave_angular_limits_inert() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let point_mass = MassProperties::new(1.0, nalgebra::Matrix3::zeros());
        let mut a = ball(Point3::new(1.0, 0.0, 0.0));
        let mut b = ball(Point3::origin());
        a.set_mass(point_mass);
        b.set_mass(point_mass);
        let mut c = GenericConstraint::new(&a, &b, Frame::at(Point3::new(0.5, 0.0, 0.0)))
            .with_angular_limits(Axes::ALL, Vector3::zeros(), Vector3::zeros());
        a.set_angular_velocity(Vector3::new(0.0, 0.0, 1.0));

        let mut set = BodySet::new();
        set.insert(&mut a);
        set.insert(&mut b);
        c.pre_process(&mut set, &ctx);
        for _ in 0..config.velocity_iterations {
            c.process_velocity(&mut set, &ctx);
        }
        let _ = c.process_position(&mut set, &ctx);
        drop(set);
        for body in [&a, &b] {
            assert!(body.linear_velocity().iter().all(|v| v.is_finite()));
            assert!(body.angular_velocity().iter().all(|v| v.is_finite()));
        }
        assert_relative_eq!(a.angular_velocity(), Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }
}

//! Rope and rod constraint between two body points.

use nalgebra::{Point3, Vector3};

use rigid_types::{BodyId, MassProperties, EPSILON};

use super::{Constraint, SolverContext};
use crate::body::RigidBody;
use crate::body_set::BodySet;

/// How a [`DistanceConstraint`] acts this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceState {
    /// Within the range; nothing to do.
    #[default]
    Between,
    /// Range narrower than the tolerance; acts as a rigid rod.
    Equal,
    /// At or below the minimum; only pushes apart.
    Min,
    /// At or above the maximum; only pulls together.
    Max,
}

/// Keeps the distance between two body points within a range.
#[derive(Debug, Clone)]
pub struct DistanceConstraint {
    body_a: BodyId,
    body_b: BodyId,
    body_point_a: Point3<f64>,
    body_point_b: Point3<f64>,
    offset_a: Vector3<f64>,
    offset_b: Vector3<f64>,
    normal: Vector3<f64>,
    impulse: Vector3<f64>,
    flash_impulse: Vector3<f64>,
    distance: f64,
    min_distance: f64,
    max_distance: f64,
    mass: f64,
    state: DistanceState,
    is_collision_enabled: bool,
}

impl DistanceConstraint {
    /// Keep the distance between `point_a` on `a` and `point_b` on `b`
    /// (world space, at the bodies' current placement) between `min` and
    /// `max`.
    #[must_use]
    pub fn new(
        a: &RigidBody,
        b: &RigidBody,
        point_a: Point3<f64>,
        point_b: Point3<f64>,
        min_distance: f64,
        max_distance: f64,
    ) -> Self {
        Self {
            body_a: a.id(),
            body_b: b.id(),
            body_point_a: a.world_inverse().transform_point(&point_a),
            body_point_b: b.world_inverse().transform_point(&point_b),
            offset_a: Vector3::zeros(),
            offset_b: Vector3::zeros(),
            normal: Vector3::zeros(),
            impulse: Vector3::zeros(),
            flash_impulse: Vector3::zeros(),
            distance: 0.0,
            min_distance,
            max_distance,
            mass: 0.0,
            state: DistanceState::Between,
            is_collision_enabled: true,
        }
    }

    /// Lower bound.
    #[must_use]
    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    /// Upper bound.
    #[must_use]
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Change the range.
    pub fn set_range(&mut self, min_distance: f64, max_distance: f64) {
        self.min_distance = min_distance;
        self.max_distance = max_distance;
    }

    /// Distance measured at the last solver pass.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// State chosen for the current step.
    #[must_use]
    pub fn state(&self) -> DistanceState {
        self.state
    }

    /// Enable or disable collisions between the two bodies.
    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.is_collision_enabled = enabled;
    }

    // Refresh offsets, normal, distance and effective mass. A zero distance
    // leaves the normal at zero, which turns every impulse off.
    fn measure(&mut self, a: &RigidBody, b: &RigidBody) {
        let wa = a.world().transform_point(&self.body_point_a);
        let wb = b.world().transform_point(&self.body_point_b);
        let gap = wa - wb;
        self.offset_a = wa - a.position();
        self.offset_b = wb - b.position();
        self.distance = gap.norm();
        self.normal = if self.distance < EPSILON {
            Vector3::zeros()
        } else {
            gap / self.distance
        };
        self.mass = MassProperties::effective_mass(a.mass_world(), b.mass_world(), &self.offset_a, &self.offset_b, &self.normal);
    }

    fn is_out_of_range(&self, accumulated: &Vector3<f64>) -> bool {
        let d = accumulated.dot(&self.normal);
        (self.state == DistanceState::Min && d > 0.0) || (self.state == DistanceState::Max && d < 0.0)
    }
}

impl Constraint for DistanceConstraint {
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
        self.measure(&a, &b);

        let previous = self.state;
        self.state = if (self.max_distance - self.min_distance).abs() < 2.0 * ctx.config.linear_error_tolerance {
            DistanceState::Equal
        } else if self.distance <= self.min_distance {
            DistanceState::Min
        } else if self.distance >= self.max_distance {
            DistanceState::Max
        } else {
            DistanceState::Between
        };

        if ctx.config.is_contact_warm_start_enabled && previous == self.state {
            let impulse = self.impulse * ctx.dt;
            b.apply_impulse(&impulse, &self.offset_b);
            a.apply_impulse(&-impulse, &self.offset_a);
        } else {
            self.impulse = Vector3::zeros();
        }
        self.flash_impulse = Vector3::zeros();
    }

    fn process_velocity(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
        if self.state == DistanceState::Between {
            return;
        }
        let Some((mut a, mut b)) = bodies.pair_mut(self.body_a, self.body_b) else {
            return;
        };

        let relative = a.velocity_at_point(&self.offset_a) - b.velocity_at_point(&self.offset_b);
        let impulse = self.normal * (relative.dot(&self.normal) * self.mass * ctx.dt_inv);

        let old = self.impulse;
        self.impulse += impulse;
        if self.is_out_of_range(&self.impulse) {
            self.impulse = Vector3::zeros();
        }
        let impulse = (self.impulse - old) * ctx.dt;
        b.apply_impulse(&impulse, &self.offset_b);
        a.apply_impulse(&-impulse, &self.offset_a);
    }

    fn process_position(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) -> bool {
        if self.state == DistanceState::Between {
            return true;
        }
        let Some((mut a, mut b)) = bodies.pair_mut(self.body_a, self.body_b) else {
            return true;
        };
        self.measure(&a, &b);
        if self.normal == Vector3::zeros() {
            return true;
        }

        let error = match self.state {
            DistanceState::Equal if self.distance > self.max_distance => self.distance - self.max_distance,
            DistanceState::Equal if self.distance < self.min_distance => self.distance - self.min_distance,
            DistanceState::Min => (self.distance - self.min_distance).min(0.0),
            DistanceState::Max => (self.distance - self.max_distance).max(0.0),
            _ => 0.0,
        };
        if error.abs() <= ctx.config.linear_error_tolerance {
            return true;
        }

        let old = self.flash_impulse;
        self.flash_impulse += self.normal * (error * self.mass * ctx.config.position_correction_factor);
        if self.is_out_of_range(&self.flash_impulse) {
            self.flash_impulse = Vector3::zeros();
        }
        let impulse = self.flash_impulse - old;
        b.apply_flash_impulse(&impulse, &self.offset_b);
        a.apply_flash_impulse(&-impulse, &self.offset_a);
        false
    }
}

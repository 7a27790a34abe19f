//! Ball-and-socket constraint.

use nalgebra::{Matrix3, Point3, Vector3};

use rigid_types::{BodyId, MassProperties};

use super::{Constraint, SolverContext};
use crate::body::RigidBody;
use crate::body_set::BodySet;

/// Keeps a point of one body at a point of another.
#[derive(Debug, Clone)]
pub struct PointConstraint {
    body_a: BodyId,
    body_b: BodyId,
    body_point_a: Point3<f64>,
    body_point_b: Point3<f64>,
    offset_a: Vector3<f64>,
    offset_b: Vector3<f64>,
    mass: Matrix3<f64>,
    impulse: Vector3<f64>,
    is_collision_enabled: bool,
}

impl PointConstraint {
    /// Join `a` and `b` at `world_point`, which both bodies are expected to
    /// occupy now.
    #[must_use]
    pub fn new(a: &RigidBody, b: &RigidBody, world_point: Point3<f64>) -> Self {
        Self {
            body_a: a.id(),
            body_b: b.id(),
            body_point_a: a.world_inverse().transform_point(&world_point),
            body_point_b: b.world_inverse().transform_point(&world_point),
            offset_a: Vector3::zeros(),
            offset_b: Vector3::zeros(),
            mass: Matrix3::zeros(),
            impulse: Vector3::zeros(),
            is_collision_enabled: true,
        }
    }

    /// Enable or disable collisions between the two bodies.
    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.is_collision_enabled = enabled;
    }

    /// The joined point on the first body, in world space, as of the last
    /// solver pass.
    #[must_use]
    pub fn anchor_a(&self) -> Vector3<f64> {
        self.offset_a
    }

    // World offsets of both anchors and the gap from the second anchor to the
    // first.
    fn anchors(&self, a: &RigidBody, b: &RigidBody) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let wa = a.world().transform_point(&self.body_point_a);
        let wb = b.world().transform_point(&self.body_point_b);
        (wa - a.position(), wb - b.position(), wa - wb)
    }
}

impl Constraint for PointConstraint {
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
        (self.offset_a, self.offset_b, _) = self.anchors(&a, &b);
        self.mass = MassProperties::effective_mass_matrix(a.mass_world(), b.mass_world(), &self.offset_a, &self.offset_b);

        if ctx.config.is_contact_warm_start_enabled {
            let impulse = self.impulse * ctx.dt;
            b.apply_impulse(&impulse, &self.offset_b);
            a.apply_impulse(&-impulse, &self.offset_a);
        } else {
            self.impulse = Vector3::zeros();
        }
    }

    fn process_velocity(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
        let Some((mut a, mut b)) = bodies.pair_mut(self.body_a, self.body_b) else {
            return;
        };
        let relative = a.velocity_at_point(&self.offset_a) - b.velocity_at_point(&self.offset_b);
        let impulse = self.mass * relative;
        self.impulse += impulse * ctx.dt_inv;

        b.apply_impulse(&impulse, &self.offset_b);
        a.apply_impulse(&-impulse, &self.offset_a);
    }

    fn process_position(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) -> bool {
        let Some((mut a, mut b)) = bodies.pair_mut(self.body_a, self.body_b) else {
            return true;
        };
        let (offset_a, offset_b, gap) = self.anchors(&a, &b);
        self.offset_a = offset_a;
        self.offset_b = offset_b;

        let error = gap.norm();
        if error <= ctx.config.linear_error_tolerance {
            return true;
        }
        let n = gap / error;
        let mass = MassProperties::effective_mass(a.mass_world(), b.mass_world(), &offset_a, &offset_b, &n);
        let impulse = gap * (mass * ctx.config.position_correction_factor);

        b.apply_flash_impulse(&impulse, &offset_b);
        a.apply_flash_impulse(&-impulse, &offset_a);
        false
    }
}

//! Soft spring-like pull of a body point toward a target, for dragging
//! bodies around interactively.

use nalgebra::{Matrix3, Point3, Vector3};

use rigid_types::BodyId;

use super::{Constraint, SolverContext};
use crate::body::RigidBody;
use crate::body_set::BodySet;

/// Default strength of the pull, as the fraction of the gap closed per second.
pub const DEFAULT_GRAB_FACTOR: f64 = 20.0;

/// Pulls a point of a body toward a movable world point.
///
/// The pull is a velocity target proportional to the gap; there is no
/// position pass, so the body lags behind a moving target.
#[derive(Debug, Clone)]
pub struct GrabConstraint {
    body: BodyId,
    body_point: Point3<f64>,
    world_point: Point3<f64>,
    offset: Vector3<f64>,
    target: Vector3<f64>,
    mass: Matrix3<f64>,
    impulse: Vector3<f64>,
    max_force: f64,
    factor: f64,
}

impl GrabConstraint {
    /// Grab `body` at `world_point`.
    #[must_use]
    pub fn new(body: &RigidBody, world_point: Point3<f64>) -> Self {
        Self::with_body_point(body, world_point, body.world_inverse().transform_point(&world_point))
    }

    /// Grab `body` at `body_point` (body space) and pull it toward
    /// `world_point`.
    #[must_use]
    pub fn with_body_point(body: &RigidBody, world_point: Point3<f64>, body_point: Point3<f64>) -> Self {
        Self {
            body: body.id(),
            body_point,
            world_point,
            offset: Vector3::zeros(),
            target: Vector3::zeros(),
            mass: Matrix3::zeros(),
            impulse: Vector3::zeros(),
            max_force: f64::INFINITY,
            factor: DEFAULT_GRAB_FACTOR,
        }
    }

    /// The point the body is pulled toward.
    #[must_use]
    pub fn world_point(&self) -> Point3<f64> {
        self.world_point
    }

    /// Move the target.
    pub fn set_world_point(&mut self, point: Point3<f64>) {
        self.world_point = point;
    }

    /// Upper bound on the accumulated pulling force.
    #[must_use]
    pub fn max_force(&self) -> f64 {
        self.max_force
    }

    /// Set the upper bound on the pulling force.
    pub fn set_max_force(&mut self, max_force: f64) {
        self.max_force = max_force;
    }

    /// Strength of the pull.
    #[must_use]
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Set the strength of the pull.
    pub fn set_factor(&mut self, factor: f64) {
        self.factor = factor;
    }
}

impl Constraint for GrabConstraint {
    fn bodies(&self) -> (BodyId, Option<BodyId>) {
        (self.body, None)
    }

    fn pre_process(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
        let Some(mut a) = bodies.get_mut(self.body) else {
            return;
        };
        let anchor = a.world().transform_point(&self.body_point);
        self.target = (self.world_point - anchor) * self.factor;
        self.offset = anchor - a.position();
        self.mass = a
            .mass_world()
            .inverse_mass_matrix(&self.offset)
            .try_inverse()
            .unwrap_or_else(Matrix3::zeros);

        if ctx.config.is_contact_warm_start_enabled {
            a.apply_impulse(&(self.impulse * ctx.dt), &self.offset);
        } else {
            self.impulse = Vector3::zeros();
        }
    }

    fn process_velocity(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
        let Some(mut a) = bodies.get_mut(self.body) else {
            return;
        };
        let impulse = self.mass * (self.target - a.velocity_at_point(&self.offset));

        let old = self.impulse;
        self.impulse += impulse * ctx.dt_inv;
        let norm = self.impulse.norm();
        if norm > self.max_force {
            self.impulse *= self.max_force / norm;
        }
        a.apply_impulse(&((self.impulse - old) * ctx.dt), &self.offset);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::constraint::tests::ball;
    use crate::contact_cache::ContactCache;
    use approx::assert_relative_eq;
    use rigid_types::PhysicsConfig;

    #[test]
    fn test_pull_velocity_is_proportional_to_gap() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let mut body = ball(Point3::origin());
        let mut grab = GrabConstraint::new(&body, Point3::origin());
        grab.set_world_point(Point3::new(0.1, 0.0, 0.0));

        let mut set = BodySet::new();
        set.insert(&mut body);
        grab.pre_process(&mut set, &ctx);
        grab.process_velocity(&mut set, &ctx);
        drop(set);

        assert_relative_eq!(body.linear_velocity(), Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_max_force_limits_pull() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let dt = 1.0 / 60.0;
        let ctx = SolverContext::new(dt, &config, &cache);

        let mut body = ball(Point3::origin());
        let mass = body.mass().mass();
        let mut grab = GrabConstraint::new(&body, Point3::origin());
        grab.set_world_point(Point3::new(10.0, 0.0, 0.0));
        grab.set_max_force(1.0);
        assert_relative_eq!(grab.max_force(), 1.0);

        let mut set = BodySet::new();
        set.insert(&mut body);
        grab.pre_process(&mut set, &ctx);
        for _ in 0..5 {
            grab.process_velocity(&mut set, &ctx);
        }
        drop(set);

        assert_relative_eq!(body.linear_velocity().x, dt / mass, epsilon = 1e-9);
    }
}

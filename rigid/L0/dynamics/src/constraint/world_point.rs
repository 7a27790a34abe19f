//! Pins a point of a body to a point in space.

use nalgebra::{Matrix3, Point3, Vector3};

use rigid_types::BodyId;

use super::{Constraint, SolverContext};
use crate::body::RigidBody;
use crate::body_set::BodySet;

/// Keeps a body point at a fixed world point.
#[derive(Debug, Clone)]
pub struct WorldPointConstraint {
    body: BodyId,
    body_point: Point3<f64>,
    world_point: Point3<f64>,
    offset: Vector3<f64>,
    mass: Matrix3<f64>,
    impulse: Vector3<f64>,
}

impl WorldPointConstraint {
    /// Pin `body` at `world_point`, which the body is expected to occupy now.
    #[must_use]
    pub fn new(body: &RigidBody, world_point: Point3<f64>) -> Self {
        Self {
            body: body.id(),
            body_point: body.world_inverse().transform_point(&world_point),
            world_point,
            offset: Vector3::zeros(),
            mass: Matrix3::zeros(),
            impulse: Vector3::zeros(),
        }
    }

    /// The world point the body is held at.
    #[must_use]
    pub fn world_point(&self) -> Point3<f64> {
        self.world_point
    }

    /// Move the pin. The body follows over the next steps.
    pub fn set_world_point(&mut self, point: Point3<f64>) {
        self.world_point = point;
    }
}

impl Constraint for WorldPointConstraint {
    fn bodies(&self) -> (BodyId, Option<BodyId>) {
        (self.body, None)
    }

    fn pre_process(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
        let Some(mut a) = bodies.get_mut(self.body) else {
            return;
        };
        self.offset = a.world().transform_point(&self.body_point) - a.position();
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
        let impulse = self.mass * -a.velocity_at_point(&self.offset);
        self.impulse += impulse * ctx.dt_inv;
        a.apply_impulse(&impulse, &self.offset);
    }

    fn process_position(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) -> bool {
        let Some(mut a) = bodies.get_mut(self.body) else {
            return true;
        };
        let anchor = a.world().transform_point(&self.body_point);
        self.offset = anchor - a.position();
        let gap = self.world_point - anchor;

        let error = gap.norm();
        if error <= ctx.config.linear_error_tolerance {
            return true;
        }
        let mass = a.mass_world().effective_mass_single(&self.offset, &(gap / error));
        a.apply_flash_impulse(&(gap * (mass * ctx.config.position_correction_factor)), &self.offset);
        false
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
    fn test_pinned_point_stops_moving() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let mut body = ball(Point3::origin());
        let mut pin = WorldPointConstraint::new(&body, Point3::new(0.0, 0.0, 0.5));
        body.set_velocity(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 2.0));

        let mut set = BodySet::new();
        set.insert(&mut body);
        pin.pre_process(&mut set, &ctx);
        pin.process_velocity(&mut set, &ctx);
        drop(set);

        assert_relative_eq!(body.velocity_at_point(&Vector3::new(0.0, 0.0, 0.5)), Vector3::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn test_moved_pin_drags_body() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let mut body = ball(Point3::origin());
        let mut pin = WorldPointConstraint::new(&body, Point3::origin());
        pin.set_world_point(Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(pin.world_point(), Point3::new(0.0, 1.0, 0.0));

        let mut set = BodySet::new();
        set.insert(&mut body);
        pin.pre_process(&mut set, &ctx);
        for _ in 0..10 {
            pin.process_position(&mut set, &ctx);
        }
        drop(set);
        assert!(body.position().y > 0.5);
    }
}

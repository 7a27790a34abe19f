//! Velocity and position constraints.
//!
//! Every constraint, contacts included, is driven by the island solver in
//! three phases:
//!
//! 1. `pre_process` - once per step: world anchors, effective masses,
//!    target velocities and warm-start impulses.
//! 2. `process_velocity` - once per velocity iteration: measure the
//!    velocity error along each constrained direction, turn it into an
//!    impulse through the effective mass, clamp the accumulated impulse to
//!    the feasible range and apply the change to both bodies.
//! 3. `process_position` - once per position iteration: measure the
//!    positional error and correct part of it with flash impulses. Returns
//!    whether the error is within tolerance.
//!
//! Constraints refer to bodies by [`BodyId`] and reach them through the
//! island's [`BodySet`]. A body missing from the set (removed from the
//! manager, for instance) makes the constraint do nothing.
//!
//! # Sign convention
//!
//! Point and distance constraints apply `+impulse` to the second body and
//! `-impulse` to the first. Contacts and [`GenericConstraint`] limits apply
//! `+impulse` to the first body: contact normals point from the second body
//! toward the first, and limits are measured from the second body's frame.
//!
//! Accumulated impulses of the point, distance and grab constraints are
//! stored per second of simulated time and scaled by the step length when
//! reapplied, so warm starting survives a change of step length.

use rigid_types::{BodyId, PhysicsConfig};

use crate::body_set::BodySet;
use crate::contact_cache::ContactCache;

mod contact;
mod distance;
mod generic;
mod grab;
mod joint;
mod point;
mod world_point;

pub use contact::{ContactConstraint, ContactPoint};
pub use distance::{DistanceConstraint, DistanceState};
pub use generic::{GenericConstraint, LimitState};
pub use grab::{GrabConstraint, DEFAULT_GRAB_FACTOR};
pub use joint::{Joint, RevoluteJoint, UniversalJoint, DEFAULT_UNIVERSAL_RANGE};
pub use point::PointConstraint;
pub use world_point::WorldPointConstraint;

/// Per-step data shared by every constraint of every island.
#[derive(Debug, Clone, Copy)]
pub struct SolverContext<'a> {
    /// Step length in seconds.
    pub dt: f64,
    /// Inverse of `dt`.
    pub dt_inv: f64,
    /// Manager configuration.
    pub config: &'a PhysicsConfig,
    /// Contacts of the previous step, for warm starting.
    pub cache: &'a ContactCache,
}

impl<'a> SolverContext<'a> {
    /// Context for a step of `dt` seconds.
    #[must_use]
    pub fn new(dt: f64, config: &'a PhysicsConfig, cache: &'a ContactCache) -> Self {
        Self {
            dt,
            dt_inv: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            config,
            cache,
        }
    }
}

/// A constraint between one body and the world, or between two bodies.
pub trait Constraint: Send + Sync {
    /// The constrained bodies. Single-body constraints return `None` as the
    /// second body.
    fn bodies(&self) -> (BodyId, Option<BodyId>);

    /// Whether the constrained bodies still collide with each other.
    fn is_collision_enabled(&self) -> bool {
        true
    }

    /// Prepare the step.
    fn pre_process(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>);

    /// One velocity iteration.
    fn process_velocity(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>);

    /// One position iteration. Returns whether the constraint is satisfied.
    fn process_position(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) -> bool {
        let _ = (bodies, ctx);
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use nalgebra::{Point3, Vector3};
    use rigid_collision::{BodySkin, CompiledPolyhedron, Part, PolyhedronPart};
    use rigid_types::{MassProperties, Material};
    use std::sync::Arc;

    use crate::body::RigidBody;

    /// Unit-density ball of radius 0.5.
    pub(crate) fn ball(position: Point3<f64>) -> RigidBody {
        let skin = BodySkin::new(Part::sphere(Point3::origin(), 0.5), Material::default());
        let mut body = RigidBody::new(skin, MassProperties::from_sphere(1.0, Point3::origin(), 0.5));
        body.set_world(position, nalgebra::UnitQuaternion::identity());
        body
    }

    /// Unit-density cube with side `side`.
    pub(crate) fn cube(side: f64, position: Point3<f64>) -> RigidBody {
        let compiled = CompiledPolyhedron::cuboid(Vector3::repeat(side)).unwrap();
        let (mass, _) = compiled.mass_properties(1.0).unwrap();
        let skin = BodySkin::new(Part::from(PolyhedronPart::new(Arc::new(compiled))), Material::default());
        let mut body = RigidBody::new(skin, mass);
        body.set_world(position, nalgebra::UnitQuaternion::identity());
        body
    }

    /// Immovable ground plane at z = 0.
    pub(crate) fn ground() -> RigidBody {
        let skin = BodySkin::new(Part::plane(Point3::origin(), Vector3::z()), Material::default());
        RigidBody::immovable(skin)
    }
}

//! Joints built from simpler constraints.

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use nalgebra::{Point3, Vector3};

use rigid_types::{Axes, BodyId, Frame, Result, EPSILON};

use super::{Constraint, GenericConstraint, PointConstraint, SolverContext};
use crate::body::RigidBody;
use crate::body_set::BodySet;

/// A set of constraints on one pair of bodies, solved together.
///
/// The joined bodies do not collide with each other unless collisions are
/// re-enabled.
pub struct Joint {
    body_a: BodyId,
    body_b: BodyId,
    constraints: Vec<Box<dyn Constraint>>,
    is_collision_enabled: bool,
}

impl fmt::Debug for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Joint")
            .field("body_a", &self.body_a)
            .field("body_b", &self.body_b)
            .field("constraints", &self.constraints.len())
            .field("is_collision_enabled", &self.is_collision_enabled)
            .finish()
    }
}

impl Joint {
    /// An empty joint between `a` and `b`.
    #[must_use]
    pub fn new(a: &RigidBody, b: &RigidBody) -> Self {
        Self {
            body_a: a.id(),
            body_b: b.id(),
            constraints: Vec::new(),
            is_collision_enabled: false,
        }
    }

    /// Add a sub-constraint. It should act on the joint's bodies.
    #[must_use]
    pub fn with<C: Constraint + 'static>(mut self, constraint: C) -> Self {
        self.push(Box::new(constraint));
        self
    }

    /// Add a sub-constraint.
    pub fn push(&mut self, constraint: Box<dyn Constraint>) {
        self.constraints.push(constraint);
    }

    /// The sub-constraints, in solve order.
    #[must_use]
    pub fn constraints(&self) -> &[Box<dyn Constraint>] {
        &self.constraints
    }

    /// Enable or disable collisions between the two bodies.
    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.is_collision_enabled = enabled;
    }
}

impl Constraint for Joint {
    fn bodies(&self) -> (BodyId, Option<BodyId>) {
        (self.body_a, Some(self.body_b))
    }

    fn is_collision_enabled(&self) -> bool {
        self.is_collision_enabled
    }

    fn pre_process(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
        for c in &mut self.constraints {
            c.pre_process(bodies, ctx);
        }
    }

    fn process_velocity(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
        for c in &mut self.constraints {
            c.process_velocity(bodies, ctx);
        }
    }

    fn process_position(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) -> bool {
        // Every sub-constraint gets its pass even after one fails.
        self.constraints
            .iter_mut()
            .fold(true, |satisfied, c| c.process_position(bodies, ctx) & satisfied)
    }
}

// ============================================================================
// Hinge
// ============================================================================

/// A hinge: the bodies share a point and may only rotate relative to each
/// other about one axis, within an angle range.
#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    point: PointConstraint,
    limits: GenericConstraint,
    is_collision_enabled: bool,
}

impl RevoluteJoint {
    /// Hinge `a` and `b` at `world_point` about `axis`, with the default
    /// range of ±π/2.
    pub fn new(a: &RigidBody, b: &RigidBody, world_point: Point3<f64>, axis: Vector3<f64>) -> Result<Self> {
        Self::with_limits(a, b, world_point, axis, -FRAC_PI_2, FRAC_PI_2)
    }

    /// Hinge with the rotation about `axis` limited to `[min_angle,
    /// max_angle]` radians.
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` when `axis` is zero.
    pub fn with_limits(
        a: &RigidBody,
        b: &RigidBody,
        world_point: Point3<f64>,
        axis: Vector3<f64>,
        min_angle: f64,
        max_angle: f64,
    ) -> Result<Self> {
        let n = Vector3::z().cross(&axis);
        let basis = if n.norm_squared() < EPSILON {
            Frame::new(axis, Vector3::zeros(), axis.cross(&Vector3::y()), world_point)?
        } else {
            Frame::new(axis, n, Vector3::zeros(), world_point)?
        };

        let limits = GenericConstraint::new(a, b, basis).with_angular_limits(
            Axes::ALL,
            Vector3::new(min_angle, 0.0, 0.0),
            Vector3::new(max_angle, 0.0, 0.0),
        );
        Ok(Self {
            point: PointConstraint::new(a, b, world_point),
            limits,
            is_collision_enabled: false,
        })
    }

    /// Angle of the hinge measured at the last solver pass.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.limits.angles().x
    }

    /// The angular limit constraint.
    #[must_use]
    pub fn limits(&self) -> &GenericConstraint {
        &self.limits
    }

    /// Enable or disable collisions between the two bodies.
    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.is_collision_enabled = enabled;
    }
}

// ============================================================================
// Universal joint
// ============================================================================

/// A universal joint: the bodies share a point, the first may tilt about
/// `axis_a` and the second about `axis_b`, and twist between them is
/// locked.
#[derive(Debug, Clone)]
pub struct UniversalJoint {
    point: PointConstraint,
    limits: GenericConstraint,
    is_collision_enabled: bool,
}

/// Default tilt range of a [`UniversalJoint`], on either side of zero.
pub const DEFAULT_UNIVERSAL_RANGE: f64 = FRAC_PI_2 - 0.01;

impl UniversalJoint {
    /// Join `a` and `b` at `world_point` with perpendicular tilt axes
    /// `axis_a` and `axis_b`, with the default range.
    pub fn new(
        a: &RigidBody,
        b: &RigidBody,
        world_point: Point3<f64>,
        axis_a: Vector3<f64>,
        axis_b: Vector3<f64>,
    ) -> Result<Self> {
        let r = DEFAULT_UNIVERSAL_RANGE;
        Self::with_limits(a, b, world_point, axis_a, axis_b, (-r, r), (-r, r))
    }

    /// Join with explicit `(min, max)` tilt ranges. Ranges are clamped to
    /// just inside ±π/2 and must contain zero.
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` when the axes are zero or not perpendicular.
    pub fn with_limits(
        a: &RigidBody,
        b: &RigidBody,
        world_point: Point3<f64>,
        axis_a: Vector3<f64>,
        axis_b: Vector3<f64>,
        range_a: (f64, f64),
        range_b: (f64, f64),
    ) -> Result<Self> {
        let low = -FRAC_PI_2 + EPSILON;
        let high = FRAC_PI_2 - EPSILON;
        let (a_min, a_max) = (range_a.0.clamp(low, 0.0), range_a.1.clamp(0.0, high));
        let (b_min, b_max) = (range_b.0.clamp(low, 0.0), range_b.1.clamp(0.0, high));

        let basis = Frame::new(Vector3::zeros(), axis_a, axis_b, world_point)?;
        let limits = GenericConstraint::new(a, b, basis).with_angular_limits(
            Axes::ALL,
            Vector3::new(0.0, a_min, b_min),
            Vector3::new(0.0, a_max, b_max),
        );
        Ok(Self {
            point: PointConstraint::new(a, b, world_point),
            limits,
            is_collision_enabled: false,
        })
    }

    /// The angular limit constraint.
    #[must_use]
    pub fn limits(&self) -> &GenericConstraint {
        &self.limits
    }

    /// Enable or disable collisions between the two bodies.
    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.is_collision_enabled = enabled;
    }
}

macro_rules! point_and_limits {
    ($joint:ty) => {
        impl Constraint for $joint {
            fn bodies(&self) -> (BodyId, Option<BodyId>) {
                self.point.bodies()
            }

            fn is_collision_enabled(&self) -> bool {
                self.is_collision_enabled
            }

            fn pre_process(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
                self.point.pre_process(bodies, ctx);
                self.limits.pre_process(bodies, ctx);
            }

            fn process_velocity(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
                self.point.process_velocity(bodies, ctx);
                self.limits.process_velocity(bodies, ctx);
            }

            fn process_position(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) -> bool {
                let point = self.point.process_position(bodies, ctx);
                self.limits.process_position(bodies, ctx) && point
            }
        }
    };
}

point_and_limits!(RevoluteJoint);
point_and_limits!(UniversalJoint);

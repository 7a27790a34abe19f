//! Groups of bodies, constraints and generators managed as one unit.

use std::fmt;

use rigid_types::{BodyId, ConstraintId, GeneratorId};

use crate::body::RigidBody;
use crate::constraint::Constraint;
use crate::forces::ForceGenerator;

/// A ragdoll, vehicle or any other assembly that is added to and removed
/// from a manager in one go.
#[derive(Default)]
pub struct Contraption {
    /// Member bodies.
    pub bodies: Vec<RigidBody>,
    /// Constraints between the members, or between members and other bodies.
    pub constraints: Vec<Box<dyn Constraint>>,
    /// Generators driving the members.
    pub generators: Vec<Box<dyn ForceGenerator>>,
}

impl fmt::Debug for Contraption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contraption")
            .field("bodies", &self.bodies)
            .field("constraints", &self.constraints.len())
            .field("generators", &self.generators.len())
            .finish()
    }
}

impl Contraption {
    /// An empty contraption.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body.
    #[must_use]
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.bodies.push(body);
        self
    }

    /// Add a constraint.
    #[must_use]
    pub fn with_constraint<C: Constraint + 'static>(mut self, constraint: C) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }

    /// Add a generator.
    #[must_use]
    pub fn with_generator<G: ForceGenerator + 'static>(mut self, generator: G) -> Self {
        self.generators.push(Box::new(generator));
        self
    }

    /// Whether the contraption has no members at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty() && self.constraints.is_empty() && self.generators.is_empty()
    }
}

/// Handles of a contraption's members once added to a manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContraptionIds {
    /// Body ids, in the contraption's order.
    pub bodies: Vec<BodyId>,
    /// Constraint ids, in the contraption's order.
    pub constraints: Vec<ConstraintId>,
    /// Generator ids, in the contraption's order.
    pub generators: Vec<GeneratorId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::constraint::tests::ball;
    use crate::constraint::PointConstraint;
    use crate::forces::GravityForce;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_builder_collects_members() {
        let a = ball(Point3::origin());
        let b = ball(Point3::new(1.0, 0.0, 0.0));
        let joint = PointConstraint::new(&a, &b, Point3::new(0.5, 0.0, 0.0));
        let c = Contraption::new()
            .with_body(a)
            .with_body(b)
            .with_constraint(joint)
            .with_generator(GravityForce::new(Vector3::z()));
        assert_eq!(c.bodies.len(), 2);
        assert_eq!(c.constraints.len(), 1);
        assert_eq!(c.generators.len(), 1);
        assert!(!c.is_empty());
        assert!(Contraption::new().is_empty());
    }
}

//! Force generators.
//!
//! Generators run at the start of every step, before forces are integrated,
//! and add forces and torques to the bodies they act on. Forces on sleeping
//! bodies are dropped, so a generator that should wake its bodies does so
//! itself.

use nalgebra::{Point3, Vector3};

use rigid_types::{BodyId, EPSILON};

use crate::body::RigidBody;
use crate::body_map::BodyMap;

/// Newton's gravitational constant, in SI units.
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674_28e-11;

/// Something that applies forces to bodies once per step.
pub trait ForceGenerator: Send + Sync {
    /// Add this step's forces.
    fn generate(&mut self, bodies: &mut BodyMap);
}

// ============================================================================
// Gravity
// ============================================================================

/// Uniform acceleration of every non-weightless body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GravityForce {
    gravity: Vector3<f64>,
}

impl GravityForce {
    /// Gravity with acceleration `gravity`.
    #[must_use]
    pub fn new(gravity: Vector3<f64>) -> Self {
        Self { gravity }
    }

    /// The acceleration.
    #[must_use]
    pub fn gravity(&self) -> Vector3<f64> {
        self.gravity
    }

    /// Change the acceleration.
    pub fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
    }

    /// Index of the axis gravity mostly acts along, `None` without gravity.
    #[must_use]
    pub fn dominant_axis(&self) -> Option<usize> {
        if self.gravity.norm_squared() < EPSILON {
            return None;
        }
        Some(self.gravity.iamax())
    }
}

impl ForceGenerator for GravityForce {
    fn generate(&mut self, bodies: &mut BodyMap) {
        if self.gravity == Vector3::zeros() {
            return;
        }
        for body in bodies.iter_mut().filter(|b| !b.is_weightless() && b.is_movable()) {
            let force = self.gravity * body.mass().mass();
            body.apply_force(&force);
        }
    }
}

// ============================================================================
// Spring
// ============================================================================

/// Damped spring between points of two bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct SpringForce {
    body_a: BodyId,
    body_b: BodyId,
    point_a: Point3<f64>,
    point_b: Point3<f64>,
    length: f64,
    stiffness: f64,
    damping: f64,
}

impl SpringForce {
    /// Spring from `point_a` on `a` to `point_b` on `b`, both in body space,
    /// with rest length `length`.
    #[must_use]
    pub fn new(
        a: &RigidBody,
        b: &RigidBody,
        point_a: Point3<f64>,
        point_b: Point3<f64>,
        length: f64,
        stiffness: f64,
        damping: f64,
    ) -> Self {
        Self {
            body_a: a.id(),
            body_b: b.id(),
            point_a,
            point_b,
            length,
            stiffness,
            damping,
        }
    }

    /// Rest length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Change the rest length.
    pub fn set_length(&mut self, length: f64) {
        self.length = length;
    }

    /// Spring constant.
    #[must_use]
    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    /// Change the spring constant.
    pub fn set_stiffness(&mut self, stiffness: f64) {
        self.stiffness = stiffness;
    }

    /// Damping constant.
    #[must_use]
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Change the damping constant.
    pub fn set_damping(&mut self, damping: f64) {
        self.damping = damping;
    }

    /// The force the spring pulls the second body with, given the current
    /// placement and velocity of both bodies.
    #[must_use]
    pub fn force(&self, a: &RigidBody, b: &RigidBody) -> Vector3<f64> {
        let (_, _, force) = self.measure(a, b);
        force
    }

    fn measure(&self, a: &RigidBody, b: &RigidBody) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let pa = a.world().transform_point(&self.point_a);
        let pb = b.world().transform_point(&self.point_b);
        let offset_a = pa - a.position();
        let offset_b = pb - b.position();

        let gap = pa - pb;
        let distance = gap.norm();
        if distance < EPSILON {
            return (offset_a, offset_b, Vector3::zeros());
        }
        let n = gap / distance;
        let speed = n.dot(&(a.velocity_at_point(&offset_a) - b.velocity_at_point(&offset_b)));
        let magnitude = (distance - self.length) * self.stiffness + speed * self.damping;
        (offset_a, offset_b, n * magnitude)
    }
}

impl ForceGenerator for SpringForce {
    fn generate(&mut self, bodies: &mut BodyMap) {
        let Some((a, b)) = bodies.pair_mut(self.body_a, self.body_b) else {
            return;
        };
        let (offset_a, offset_b, force) = self.measure(a, b);
        if force.norm_squared() >= EPSILON {
            for body in [&mut *a, &mut *b] {
                if body.is_movable() {
                    body.set_active(true);
                }
            }
        }
        b.apply_force_at(&force, &offset_b);
        a.apply_force_at(&-force, &offset_a);
    }
}

// ============================================================================
// Motor
// ============================================================================

/// Constant torque fixed in a body's frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorForce {
    body: BodyId,
    torque: Vector3<f64>,
    is_enabled: bool,
}

impl MotorForce {
    /// Motor applying `world_torque` to `body` in its current orientation.
    /// The torque turns with the body afterwards.
    #[must_use]
    pub fn new(body: &RigidBody, world_torque: Vector3<f64>) -> Self {
        Self {
            body: body.id(),
            torque: body.orientation().inverse() * world_torque,
            is_enabled: true,
        }
    }

    /// Torque in body space.
    #[must_use]
    pub fn body_torque(&self) -> Vector3<f64> {
        self.torque
    }

    /// Set the torque in body space.
    pub fn set_body_torque(&mut self, torque: Vector3<f64>) {
        self.torque = torque;
    }

    /// Whether the motor runs.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    /// Start or stop the motor.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;
    }
}

impl ForceGenerator for MotorForce {
    fn generate(&mut self, bodies: &mut BodyMap) {
        if !self.is_enabled {
            return;
        }
        if let Some(body) = bodies.get_mut(self.body) {
            let torque = body.orientation() * self.torque;
            body.apply_torque(&torque);
        }
    }
}

// ============================================================================
// Point mass
// ============================================================================

/// Inverse-square attraction toward a heavy point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingularityForce {
    position: Point3<f64>,
    mass: f64,
}

impl SingularityForce {
    /// Attractor of `mass` kilograms at `position`.
    #[must_use]
    pub fn new(position: Point3<f64>, mass: f64) -> Self {
        Self { position, mass }
    }

    /// Position of the attractor.
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// Move the attractor.
    pub fn set_position(&mut self, position: Point3<f64>) {
        self.position = position;
    }

    /// Mass of the attractor.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Change the mass of the attractor.
    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
    }

    /// Attraction on a body of mass `mass` at `at`. Zero at the attractor
    /// itself.
    #[must_use]
    pub fn force_at(&self, at: &Point3<f64>, mass: f64) -> Vector3<f64> {
        let d = self.position - at;
        let r2 = d.norm_squared();
        if r2 < EPSILON {
            return Vector3::zeros();
        }
        d / r2.sqrt() * (GRAVITATIONAL_CONSTANT * self.mass * mass / r2)
    }
}

impl ForceGenerator for SingularityForce {
    fn generate(&mut self, bodies: &mut BodyMap) {
        for body in bodies.iter_mut().filter(|b| !b.is_weightless() && b.is_movable()) {
            let force = self.force_at(&body.position(), body.mass().mass());
            body.apply_force(&force);
        }
    }
}

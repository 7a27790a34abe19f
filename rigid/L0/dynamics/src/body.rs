//! Rigid bodies.
//!
//! A [`RigidBody`] couples a collision [`BodySkin`] with mass properties, a
//! world transform and a velocity. The manager drives it through two
//! integration halves each step:
//!
//! 1. [`RigidBody::integrate_force`] turns accumulated force and torque into a
//!    velocity change and moves the skin to where the body is predicted to be
//!    (or sweeps it, for fast bodies) so the collision phases see it there.
//! 2. [`RigidBody::integrate_velocity`] runs after the solver: it advances the
//!    transform, damps the velocity, updates the inactivity timer and clears
//!    the accumulators.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use smallvec::SmallVec;

use rigid_collision::BodySkin;
use rigid_types::{BodyId, ConstraintId, MassProperties, PhysicsConfig, Transform, TransformDelta};

use crate::collide::ContactHandle;

static NEXT_BODY_ID: AtomicU64 = AtomicU64::new(1);

/// Called when a body starts touching another. Receives the body's own id and
/// the other body's id; returning `true` suppresses the contact response
/// until the two separate.
pub type CollisionCallback = Box<dyn FnMut(BodyId, BodyId) -> bool + Send + Sync>;

/// Called when a touching pair stops producing contacts.
pub type SeparationCallback = Box<dyn FnMut(BodyId, BodyId) + Send + Sync>;

/// Contact-state flags kept per other body.
pub(crate) mod contact_state {
    pub const IN_CONTACT: u8 = 1;
    pub const SUPPRESSED: u8 = 2;
    pub const WAS_IN_CONTACT: u8 = 4;
}

/// Derived simulation state of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyState {
    /// Infinite mass or frozen. Never integrates.
    Immovable,
    /// Integrated and solved every step.
    Active,
    /// Asleep until woken by a contact, a constraint or the host.
    Inactive,
}

/// A simulated rigid body.
pub struct RigidBody {
    id: BodyId,
    skin: BodySkin,
    mass: MassProperties,
    mass_world: MassProperties,
    world: Transform,
    world_inverse: Transform,
    velocity: TransformDelta,
    force: Vector3<f64>,
    torque: Vector3<f64>,
    is_active: bool,
    is_movable: bool,
    is_fast: bool,
    is_weightless: bool,
    inactive_time: f64,
    pub(crate) constraints: SmallVec<[ConstraintId; 4]>,
    pub(crate) contacts: Vec<ContactHandle>,
    pub(crate) contact_states: HashMap<BodyId, u8>,
    on_collision: Option<CollisionCallback>,
    on_separation: Option<SeparationCallback>,
}

impl fmt::Debug for RigidBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigidBody")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("position", &self.world.position())
            .field("velocity", &self.velocity)
            .finish_non_exhaustive()
    }
}

impl RigidBody {
    /// Create a body at the origin. Ids are unique within the process, so
    /// constraints can be built against a body before it is added to a
    /// manager.
    #[must_use]
    pub fn new(skin: BodySkin, mass: MassProperties) -> Self {
        let mut body = Self {
            id: BodyId::new(NEXT_BODY_ID.fetch_add(1, Ordering::Relaxed)),
            skin,
            mass,
            mass_world: mass,
            world: Transform::identity(),
            world_inverse: Transform::identity(),
            velocity: TransformDelta::zero(),
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            is_active: true,
            is_movable: !mass.is_immovable(),
            is_fast: false,
            is_weightless: false,
            inactive_time: 0.0,
            constraints: SmallVec::new(),
            contacts: Vec::new(),
            contact_states: HashMap::new(),
            on_collision: None,
            on_separation: None,
        };
        body.skin.apply_transform(&body.world);
        body.update_world();
        body
    }

    /// Create a body with infinite mass.
    #[must_use]
    pub fn immovable(skin: BodySkin) -> Self {
        Self::new(skin, MassProperties::immovable())
    }

    /// Move the body to `position`.
    #[must_use]
    pub fn at(mut self, position: Point3<f64>) -> Self {
        self.set_world(position, self.world.orientation());
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Identifier of this body.
    #[must_use]
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Collision skin.
    #[must_use]
    pub fn skin(&self) -> &BodySkin {
        &self.skin
    }

    /// Collision skin, mutably. Changes are picked up by the broad phase on
    /// the next step.
    pub fn skin_mut(&mut self) -> &mut BodySkin {
        &mut self.skin
    }

    /// Body-space mass properties.
    #[must_use]
    pub fn mass(&self) -> &MassProperties {
        &self.mass
    }

    /// Mass properties with the inertia tensor in world space.
    #[must_use]
    pub fn mass_world(&self) -> &MassProperties {
        &self.mass_world
    }

    /// Replace the mass properties. The body becomes immovable if the mass is
    /// infinite.
    pub fn set_mass(&mut self, mass: MassProperties) {
        self.mass = mass;
        self.is_movable = !mass.is_immovable();
        self.update_world();
    }

    /// World transform.
    #[must_use]
    pub fn world(&self) -> &Transform {
        &self.world
    }

    /// Inverse of the world transform.
    #[must_use]
    pub fn world_inverse(&self) -> &Transform {
        &self.world_inverse
    }

    /// World position of the body origin.
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.world.position()
    }

    /// World orientation.
    #[must_use]
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.world.orientation()
    }

    /// Linear and angular velocity.
    #[must_use]
    pub fn velocity(&self) -> &TransformDelta {
        &self.velocity
    }

    /// Linear velocity.
    #[must_use]
    pub fn linear_velocity(&self) -> Vector3<f64> {
        self.velocity.linear
    }

    /// Angular velocity.
    #[must_use]
    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.velocity.angular
    }

    /// Accumulated force of the current step.
    #[must_use]
    pub fn force(&self) -> Vector3<f64> {
        self.force
    }

    /// Accumulated torque of the current step.
    #[must_use]
    pub fn torque(&self) -> Vector3<f64> {
        self.torque
    }

    /// Derived simulation state.
    #[must_use]
    pub fn state(&self) -> BodyState {
        if !self.is_movable {
            BodyState::Immovable
        } else if self.is_active {
            BodyState::Active
        } else {
            BodyState::Inactive
        }
    }

    /// Whether the body is movable and awake.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active && self.is_movable
    }

    /// Whether the body responds to forces and impulses at all.
    #[must_use]
    pub fn is_movable(&self) -> bool {
        self.is_movable
    }

    /// Whether the last force integration classified the body as fast, so
    /// its contacts are found with swept tests.
    #[must_use]
    pub fn is_fast(&self) -> bool {
        self.is_fast
    }

    /// Whether gravity skips this body.
    #[must_use]
    pub fn is_weightless(&self) -> bool {
        self.is_weightless
    }

    /// Seconds the body has stayed below the activity thresholds.
    #[must_use]
    pub fn inactive_time(&self) -> f64 {
        self.inactive_time
    }

    /// Whether the body has been slow for at least `deactivation_time`.
    #[must_use]
    pub fn can_deactivate(&self, deactivation_time: f64) -> bool {
        self.inactive_time >= deactivation_time
    }

    /// Constraints attached to this body.
    #[must_use]
    pub fn constraints(&self) -> &[ConstraintId] {
        &self.constraints
    }

    /// Whether the body touched `other` in the last step.
    #[must_use]
    pub fn is_touching(&self, other: BodyId) -> bool {
        self.contact_states
            .get(&other)
            .is_some_and(|&s| s & contact_state::IN_CONTACT != 0)
    }

    // =========================================================================
    // State changes
    // =========================================================================

    /// Place the body. The skin follows immediately.
    pub fn set_world(&mut self, position: Point3<f64>, orientation: UnitQuaternion<f64>) {
        self.set_world_scaled(self.world.scale(), position, orientation);
    }

    /// Place and scale the body.
    pub fn set_world_scaled(&mut self, scale: f64, position: Point3<f64>, orientation: UnitQuaternion<f64>) {
        self.world = Transform::new(scale, position, orientation);
        self.skin.apply_transform(&self.world);
        self.update_world();
    }

    /// Set both velocity components.
    pub fn set_velocity(&mut self, linear: Vector3<f64>, angular: Vector3<f64>) {
        self.velocity = TransformDelta::new(linear, angular);
    }

    /// Set the linear velocity.
    pub fn set_linear_velocity(&mut self, linear: Vector3<f64>) {
        self.velocity.linear = linear;
    }

    /// Set the angular velocity.
    pub fn set_angular_velocity(&mut self, angular: Vector3<f64>) {
        self.velocity.angular = angular;
    }

    /// Wake the body or put it to sleep. Waking restarts the inactivity
    /// timer; sleeping saturates it.
    pub fn set_active(&mut self, active: bool) {
        if active != self.is_active {
            self.inactive_time = if active { 0.0 } else { f64::MAX };
        }
        self.is_active = active;
    }

    /// Exclude the body from gravity.
    pub fn set_weightless(&mut self, weightless: bool) {
        self.is_weightless = weightless;
    }

    /// Stop the body from moving without changing its mass.
    pub fn freeze(&mut self) {
        self.is_movable = false;
    }

    /// Undo [`freeze`](Self::freeze). Bodies with infinite mass stay
    /// immovable.
    pub fn unfreeze(&mut self) {
        self.is_movable = !self.mass.is_immovable();
    }

    /// Freeze or unfreeze the body.
    pub fn set_movable(&mut self, movable: bool) {
        if movable {
            self.unfreeze();
        } else {
            self.freeze();
        }
    }

    /// Install the collision callback.
    pub fn set_on_collision<F>(&mut self, callback: F)
    where
        F: FnMut(BodyId, BodyId) -> bool + Send + Sync + 'static,
    {
        self.on_collision = Some(Box::new(callback));
    }

    /// Install the separation callback.
    pub fn set_on_separation<F>(&mut self, callback: F)
    where
        F: FnMut(BodyId, BodyId) + Send + Sync + 'static,
    {
        self.on_separation = Some(Box::new(callback));
    }

    /// Remove both callbacks.
    pub fn clear_callbacks(&mut self) {
        self.on_collision = None;
        self.on_separation = None;
    }

    pub(crate) fn fire_collision(&mut self, other: BodyId) -> bool {
        let id = self.id;
        self.on_collision.as_mut().is_some_and(|callback| callback(id, other))
    }

    pub(crate) fn fire_separation(&mut self, other: BodyId) {
        let id = self.id;
        if let Some(callback) = self.on_separation.as_mut() {
            callback(id, other);
        }
    }

    // =========================================================================
    // Forces and impulses
    // =========================================================================

    /// Velocity of the world point at `offset` from the body origin.
    #[must_use]
    pub fn velocity_at_point(&self, offset: &Vector3<f64>) -> Vector3<f64> {
        self.velocity.linear + self.velocity.angular.cross(offset)
    }

    /// Apply an impulse at `offset` from the body origin. Ignored unless the
    /// body is active.
    pub fn apply_impulse(&mut self, impulse: &Vector3<f64>, offset: &Vector3<f64>) {
        if !self.is_active() {
            return;
        }
        let v = impulse * self.mass.mass_inverse();
        let w = self.mass_world.inertia_inverse() * offset.cross(impulse);
        self.velocity.add(&v, &w);
    }

    /// Apply an angular impulse. Ignored unless the body is active.
    pub fn apply_angular_impulse(&mut self, impulse: &Vector3<f64>) {
        if !self.is_active() {
            return;
        }
        let w = self.mass_world.inertia_inverse() * impulse;
        self.velocity.add(&Vector3::zeros(), &w);
    }

    /// Move the body directly as if `impulse` acted for one second, without
    /// changing its velocity. Used for position correction.
    pub fn apply_flash_impulse(&mut self, impulse: &Vector3<f64>, offset: &Vector3<f64>) {
        if !self.is_active() {
            return;
        }
        let v = impulse * self.mass.mass_inverse();
        let w = self.mass_world.inertia_inverse() * offset.cross(impulse) * 0.25;
        self.world.apply_delta(1.0, &TransformDelta::new(v, w));
        self.update_world();
    }

    /// Rotate the body directly by an angular flash impulse.
    pub fn apply_flash_angular_impulse(&mut self, impulse: &Vector3<f64>) {
        if !self.is_active() {
            return;
        }
        let w = self.mass_world.inertia_inverse() * impulse;
        self.world.apply_delta(1.0, &TransformDelta::new(Vector3::zeros(), w));
        self.update_world();
    }

    /// Add a force through the center of mass.
    pub fn apply_force(&mut self, force: &Vector3<f64>) {
        if self.is_active() {
            self.force += force;
        }
    }

    /// Add a force acting at `offset` from the body origin.
    pub fn apply_force_at(&mut self, force: &Vector3<f64>, offset: &Vector3<f64>) {
        if self.is_active() {
            self.force += force;
            self.torque += offset.cross(force);
        }
    }

    /// Add a torque.
    pub fn apply_torque(&mut self, torque: &Vector3<f64>) {
        if self.is_active() {
            self.torque += torque;
        }
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vector3::zeros();
        self.torque = Vector3::zeros();
    }

    // =========================================================================
    // Integration
    // =========================================================================

    /// Apply one step of accumulated force and torque to the velocity, then
    /// position the skin for collision detection.
    ///
    /// A body whose displacement this step reaches `sweep_threshold` is
    /// marked fast: its skin stays at the current transform and its bounds are
    /// swept. Otherwise the skin moves to the predicted transform.
    pub fn integrate_force(&mut self, dt: f64, config: &PhysicsConfig) {
        if !self.is_active() {
            return;
        }
        let v = self.force * (dt * self.mass.mass_inverse());
        let w = self.mass_world.inertia_inverse() * (self.torque * dt);
        self.velocity.add(&v, &w);

        let delta = self.velocity.linear * dt;
        self.is_fast = delta.norm_squared() >= config.sweep_threshold_squared();
        if self.is_fast {
            self.skin.apply_transform(&self.world);
            self.skin.apply_sweep(&delta);
        } else {
            let predicted = self.predict(dt, config);
            self.skin.apply_transform(&predicted);
        }
    }

    /// Advance the transform by the solved velocity, damp, and update the
    /// inactivity timer. Force and torque are cleared whether or not the body
    /// moved.
    pub fn integrate_velocity(&mut self, dt: f64, config: &PhysicsConfig) {
        if self.is_active() {
            self.world = self.predict(dt, config);

            let f = 1.0 - (1.0 - config.linear_damping) * dt;
            self.velocity.linear *= f;
            let f = 1.0 - (1.0 - config.angular_damping) * dt;
            self.velocity.angular *= f;

            if self.velocity.linear.norm_squared() > config.active_linear_threshold_squared()
                || self.velocity.angular.norm_squared() > config.active_angular_threshold_squared()
            {
                self.inactive_time = 0.0;
            } else {
                self.inactive_time += dt;
            }
            self.update_world();
        }
        self.clear_forces();
    }

    // Clamps the stored velocity as a side effect.
    fn predict(&mut self, dt: f64, config: &PhysicsConfig) -> Transform {
        self.velocity
            .clamp(config.linear_velocity_limit, config.angular_velocity_limit);
        let mut world = self.world;
        world.apply_delta(dt, &self.velocity);
        world
    }

    fn update_world(&mut self) {
        self.world_inverse = self.world.inverse();
        self.mass_world = self.mass.transform(&self.world);
    }
}

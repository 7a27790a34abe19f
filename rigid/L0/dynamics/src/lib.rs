//! Rigid bodies, constraints and the simulation step.
//!
//! This crate turns the shapes of `rigid-collision` into a simulated world:
//!
//! - [`RigidBody`] - a collision skin with mass, a world transform and a
//!   velocity, integrated in two halves around the solver
//! - [`Constraint`] - the three-phase contract every joint and contact
//!   implements, with [`ContactConstraint`], [`PointConstraint`],
//!   [`GenericConstraint`], [`RevoluteJoint`], [`UniversalJoint`],
//!   [`GrabConstraint`], [`WorldPointConstraint`], [`DistanceConstraint`] and
//!   the aggregate [`Joint`]
//! - [`ForceGenerator`] - gravity, springs, motors and point attractors
//! - [`PhysicsManager`] - owner of everything above, and the step that ties
//!   collision detection, island building and solving together
//!
//! # Solver
//!
//! Sequential impulses with accumulated-impulse clamping. Each step the
//! manager partitions the bodies into islands, groups of movable bodies
//! connected by constraints or contacts, and solves every island as one task
//! on the worker pool. An island runs its velocity iterations, integrates
//! positions and then runs its position iterations, alternating the order
//! of its constraints on every pass. Contacts are warm started from the
//! [`ContactCache`] of the previous step.
//!
//! # Sleeping
//!
//! A body whose speeds stay under the activity thresholds for
//! `deactivation_time` seconds becomes inactive once its whole island can.
//! Inactive bodies skip integration and are woken by contact with an active
//! body, by a force generator or by the host.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use rigid_collision::{BodySkin, Part};
//! use rigid_dynamics::{PhysicsManager, RigidBody};
//! use rigid_types::{MassProperties, Material, PhysicsConfig, PoolConfig};
//!
//! let config = PhysicsConfig::default()
//!     .with_gravity(Vector3::new(0.0, 0.0, -9.81))
//!     .with_pools(PoolConfig::single_threaded());
//! let mut world = PhysicsManager::new(config)?;
//!
//! let floor = BodySkin::new(Part::plane(Point3::origin(), Vector3::z()), Material::default());
//! world.add_body(RigidBody::immovable(floor))?;
//!
//! let skin = BodySkin::new(Part::sphere(Point3::origin(), 0.5), Material::default());
//! let mass = MassProperties::from_sphere(1.0, Point3::origin(), 0.5);
//! let ball = world.add_body(RigidBody::new(skin, mass).at(Point3::new(0.0, 0.0, 2.0)))?;
//!
//! for _ in 0..240 {
//!     world.integrate(1.0 / 60.0)?;
//! }
//! let z = world.body(ball).map_or(0.0, |b| b.position().z);
//! assert!(z > 0.4 && z < 2.0);
//! # Ok::<(), rigid_types::PhysicsError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/rigid-dynamics/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,       // usize to f64 is fine for counts
    clippy::missing_errors_doc,        // Error docs added where non-obvious
    clippy::many_single_char_names,    // Solver math reads best with short names
    clippy::module_name_repetitions,   // ContactConstraint in constraint is clearer
)]

mod body;
mod body_map;
mod body_set;
mod collide;
mod constraint;
mod contact_cache;
mod contraption;
mod forces;
mod island;
mod manager;
mod pool;

pub use body::{BodyState, CollisionCallback, RigidBody, SeparationCallback};
pub use body_map::BodyMap;
pub use body_set::{BodyMut, BodySet};
pub use constraint::{
    Constraint, ContactConstraint, ContactPoint, DistanceConstraint, DistanceState, GenericConstraint,
    GrabConstraint, Joint, LimitState, PointConstraint, RevoluteJoint, SolverContext, UniversalJoint,
    WorldPointConstraint, DEFAULT_GRAB_FACTOR, DEFAULT_UNIVERSAL_RANGE,
};
pub use contact_cache::{CachedContact, CachedPoint, ContactCache};
pub use contraption::{Contraption, ContraptionIds};
pub use forces::{
    ForceGenerator, GravityForce, MotorForce, SingularityForce, SpringForce, GRAVITATIONAL_CONSTANT,
};
pub use manager::PhysicsManager;
pub use pool::{Pool, Recycle, DEFAULT_POOL_GROW_FACTOR};

// Re-export the layers below for convenience
pub use rigid_collision;
pub use rigid_types;

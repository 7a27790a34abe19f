//! Foundational types for the rigid-body engine.
//!
//! This crate holds everything the collision and dynamics layers share:
//!
//! - [`Transform`] and [`TransformDelta`] - scale, position and orientation of
//!   a body, and its velocity
//! - Geometry primitives - [`AlignedBox`], [`Segment`], [`Plane`], [`Sphere`],
//!   [`Capsule`], [`Triangle`] and [`Frame`], with the closest-point and
//!   intersection queries the narrow phase is built from
//! - [`MassProperties`] - mass and inertia of primitive shapes and closed
//!   meshes, and the effective-mass quantities every constraint needs
//! - [`Material`] - elasticity and roughness of a collision part
//! - [`PhysicsConfig`] - every tunable of a simulation step
//! - [`TaskManager`] - batch execution on a fixed worker pool
//! - [`PhysicsError`] - the error type of all rigid crates
//!
//! # Layer 0
//!
//! Like every crate under `rigid/L0`, this one has no engine or renderer
//! dependencies. All scalars are `f64`; vectors, points and quaternions are
//! `nalgebra` types.
//!
//! # Coordinate System
//!
//! Right-handed. Gravity is whatever the host configures; nothing in the
//! engine assumes an up axis.
//!
//! # Example
//!
//! ```
//! use rigid_types::{AlignedBox, Transform};
//! use nalgebra::Point3;
//!
//! let bounds = AlignedBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
//! let moved = bounds.transform(&Transform::from_position(Point3::new(5.0, 0.0, 0.0)));
//! assert_eq!(moved.center(), Point3::new(5.0, 0.0, 0.0));
//! ```

#![doc(html_root_url = "https://docs.rs/rigid-types/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,       // usize to f64 is fine for counts
    clippy::missing_errors_doc,        // Error docs added where non-obvious
    clippy::many_single_char_names,    // Geometry reads best with short names
)]

mod aligned_box;
mod config;
mod error;
mod frame;
mod ids;
mod mass;
mod material;
pub mod math;
mod primitives;
mod segment;
mod task;
mod transform;
mod triangle;

pub use aligned_box::{AlignedBox, BoxIntersection};
pub use config::{PhysicsConfig, PoolConfig};
pub use error::PhysicsError;
pub use frame::{Axes, Frame};
pub use ids::{BodyId, BodyPair, ConstraintId, GeneratorId};
pub use mass::{translate_inertia_tensor, MassProperties};
pub use material::Material;
pub use math::EPSILON;
pub use primitives::{Capsule, Plane, Sphere};
pub use segment::{Line, Segment, SegmentClosest};
pub use task::{Task, TaskManager};
pub use transform::{Transform, TransformDelta};
pub use triangle::{Feature, FeatureKind, SegmentTriangleClosest, Triangle};

/// Result type for physics operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;

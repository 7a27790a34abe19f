//! End-to-end scenarios for the rigid-body engine.
//!
//! Each module drives a `PhysicsManager` (or a narrow-phase test directly)
//! through a small scene and checks an observable outcome:
//! - contact generation for spheres and boxes
//! - mass properties of primitive shapes
//! - boxes settling on a floor, with and without warm starting
//! - island partitioning, sleeping and waking
//! - collision and separation callbacks
//! - joints and grabs
//! - repeatability of multi-threaded steps
//! - segment queries and body removal

pub mod callbacks;
pub mod common;
pub mod contact_generation;
pub mod determinism;
pub mod islands;
pub mod joints;
pub mod mass_properties;
pub mod queries;
pub mod sleeping;
pub mod stacking;

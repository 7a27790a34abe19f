//! Collision shapes and contact generation for the rigid-body engine.
//!
//! A body's collision geometry is a [`Composition`] of [`Part`]s, wrapped in
//! a [`BodySkin`] that assigns each part a [`Material`](rigid_types::Material).
//! Every part keeps its body-space geometry and a world-space cache refreshed
//! by `apply_transform`.
//!
//! Detection runs in two phases:
//!
//! - **Broad phase** - [`SweepAndPrune`] finds pairs of bodies whose world
//!   bounding boxes overlap. It sits behind the [`BroadPhase`] trait.
//! - **Narrow phase** - [`NarrowPhase`] runs the exact test for each pair of
//!   parts and streams contact points into a [`ContactSink`]. Tests are
//!   selected by a `match` over the [`ShapeKind`] pair; reversed pairs reuse
//!   the canonical test with the points swapped and the normal flipped.
//!
//! # Shapes
//!
//! | Part | Geometry |
//! |------|----------|
//! | [`SpherePart`] | centre and radius |
//! | [`CapsulePart`] | segment and radius |
//! | [`PolyhedronPart`] | shared [`CompiledPolyhedron`] with adjacency and unique edge directions |
//! | [`MeshPart`] | shared [`CompiledMesh`] indexed by an octree |
//! | [`PlanePart`] | infinite half-space |
//!
//! Compiled shapes are built once from raw vertex, face and index arrays and
//! shared between parts through `Arc`.
//!
//! # Conventions
//!
//! Contact normals point from the second part toward the first. Swept tests
//! take the first part's displacement relative to the second and report
//! points on the first part at its current position.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use rigid_collision::{GeneratedPoint, NarrowPhase, Part};
//!
//! let ball = Part::sphere(Point3::new(0.0, 0.0, 0.9), 1.0);
//! let floor = Part::plane(Point3::origin(), Vector3::z());
//!
//! let mut points: Vec<GeneratedPoint> = Vec::new();
//! assert!(NarrowPhase::new().overlap_test(&ball, &floor, &mut points));
//! assert!((points[0].depth() - 0.1).abs() < 1e-9);
//! ```

#![doc(html_root_url = "https://docs.rs/rigid-collision/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,       // usize to f64 is fine for counts
    clippy::cast_possible_truncation,  // Octree indices are range-checked at build time
    clippy::cast_sign_loss,            // Step counts are floored non-negative values
    clippy::missing_errors_doc,        // Error docs added where non-obvious
    clippy::many_single_char_names,    // Geometry reads best with short names
)]

mod broad_phase;
mod composition;
mod mesh;
mod narrow;
mod part;
mod polyhedron;

pub use broad_phase::{
    BroadPhase, ProxyId, RayHit, SweepAndPrune, DEFAULT_CAPACITY, DEFAULT_GROW_FACTOR,
};
pub use composition::{BodySkin, Composition};
pub use mesh::{CompiledMesh, MeshPart, TriangleScratch, TRIANGLE_BATCH};
pub use narrow::{ContactSink, GeneratedPoint, NarrowPhase, MAX_SUB_STEPS};
pub use part::{CapsulePart, Part, PlanePart, ShapeKind, SpherePart};
pub use polyhedron::{CompiledPolyhedron, PolyhedronPart};

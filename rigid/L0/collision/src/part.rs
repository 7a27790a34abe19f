//! Collision parts.
//!
//! A [`Part`] is one collision primitive of a body. Every variant keeps its
//! body-space geometry and a world-space copy refreshed by
//! [`Part::apply_transform`]; meshes keep their transform instead and move
//! queries into body space.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rigid_types::{AlignedBox, Capsule, Plane, Segment, Sphere, Transform};

use crate::mesh::MeshPart;
use crate::polyhedron::PolyhedronPart;

/// Kind of a collision part. The order is the canonical order used to look
/// up pair tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShapeKind {
    /// Sphere.
    Sphere,
    /// Capsule.
    Capsule,
    /// Convex polyhedron.
    Polyhedron,
    /// Triangle mesh.
    Mesh,
    /// Infinite plane.
    Plane,
}

/// A sphere part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpherePart {
    body: Sphere,
    world: Sphere,
}

impl SpherePart {
    /// Create a part from a body-space sphere.
    #[must_use]
    pub fn new(sphere: Sphere) -> Self {
        Self {
            body: sphere,
            world: sphere,
        }
    }

    /// World-space sphere.
    #[must_use]
    pub fn world(&self) -> &Sphere {
        &self.world
    }

    fn apply_transform(&mut self, transform: &Transform) {
        self.world.center = transform.transform_point(&self.body.center);
        self.world.radius = self.body.radius * transform.scale();
    }

    fn bounding_box(&self) -> AlignedBox {
        AlignedBox::from_center(self.world.center, Vector3::repeat(self.world.radius))
    }
}

/// A capsule part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsulePart {
    body: Capsule,
    world: Capsule,
}

impl CapsulePart {
    /// Create a part from a body-space capsule.
    #[must_use]
    pub fn new(capsule: Capsule) -> Self {
        Self {
            body: capsule,
            world: capsule,
        }
    }

    /// World-space capsule.
    #[must_use]
    pub fn world(&self) -> &Capsule {
        &self.world
    }

    fn apply_transform(&mut self, transform: &Transform) {
        self.world.p1 = transform.transform_point(&self.body.p1);
        self.world.p2 = transform.transform_point(&self.body.p2);
        self.world.radius = self.body.radius * transform.scale();
    }

    fn bounding_box(&self) -> AlignedBox {
        let mut bounds = AlignedBox::fit2(&self.world.p1, &self.world.p2);
        let r = Vector3::repeat(self.world.radius);
        bounds.min -= r;
        bounds.max += r;
        bounds
    }
}

/// An infinite plane part. The normal points out of the solid side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanePart {
    body: Plane,
    world: Plane,
}

impl PlanePart {
    /// Create a plane through `p` with unit `normal`, in body space.
    #[must_use]
    pub fn new(p: Point3<f64>, normal: Vector3<f64>) -> Self {
        let plane = Plane::new(p, normal);
        Self {
            body: plane,
            world: plane,
        }
    }

    /// World-space plane.
    #[must_use]
    pub fn world(&self) -> &Plane {
        &self.world
    }

    fn apply_transform(&mut self, transform: &Transform) {
        self.world.p = transform.transform_point(&self.body.p);
        self.world.normal = transform.rotate(&self.body.normal);
    }

    // Unbounded, except that a plane facing exactly along an axis bounds the
    // solid half-space on that axis.
    #[allow(clippy::float_cmp)]
    fn bounding_box(&self) -> AlignedBox {
        let mut bounds = AlignedBox::INFINITE;
        let (n, p) = (self.world.normal, self.world.p);
        for axis in 0..3 {
            if n[axis] == 1.0 {
                bounds.max[axis] = p[axis];
            } else if n[axis] == -1.0 {
                bounds.min[axis] = p[axis];
            }
        }
        bounds
    }
}

/// One collision primitive of a body.
#[derive(Debug, Clone)]
pub enum Part {
    /// A sphere.
    Sphere(SpherePart),
    /// A capsule.
    Capsule(CapsulePart),
    /// A convex polyhedron.
    Polyhedron(PolyhedronPart),
    /// A triangle mesh.
    Mesh(MeshPart),
    /// An infinite plane.
    Plane(PlanePart),
}

impl Part {
    /// A sphere part.
    #[must_use]
    pub fn sphere(center: Point3<f64>, radius: f64) -> Self {
        Self::Sphere(SpherePart::new(Sphere::new(center, radius)))
    }

    /// A capsule part.
    #[must_use]
    pub fn capsule(p1: Point3<f64>, p2: Point3<f64>, radius: f64) -> Self {
        Self::Capsule(CapsulePart::new(Capsule::new(p1, p2, radius)))
    }

    /// A plane part.
    #[must_use]
    pub fn plane(p: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self::Plane(PlanePart::new(p, normal))
    }

    /// Kind of this part.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Sphere(_) => ShapeKind::Sphere,
            Self::Capsule(_) => ShapeKind::Capsule,
            Self::Polyhedron(_) => ShapeKind::Polyhedron,
            Self::Mesh(_) => ShapeKind::Mesh,
            Self::Plane(_) => ShapeKind::Plane,
        }
    }

    /// Refresh the world-space cache from the body transform.
    pub fn apply_transform(&mut self, transform: &Transform) {
        match self {
            Self::Sphere(p) => p.apply_transform(transform),
            Self::Capsule(p) => p.apply_transform(transform),
            Self::Polyhedron(p) => p.apply_transform(transform),
            Self::Mesh(p) => p.apply_transform(transform),
            Self::Plane(p) => p.apply_transform(transform),
        }
    }

    /// World bounding box.
    #[must_use]
    pub fn bounding_box(&self) -> AlignedBox {
        match self {
            Self::Sphere(p) => p.bounding_box(),
            Self::Capsule(p) => p.bounding_box(),
            Self::Polyhedron(p) => p.bounding_box(),
            Self::Mesh(p) => p.bounding_box(),
            Self::Plane(p) => p.bounding_box(),
        }
    }

    /// Nearest crossing of a world segment with the part, as
    /// `(scalar, point)`.
    #[must_use]
    pub fn intersect(&self, segment: &Segment) -> Option<(f64, Point3<f64>)> {
        match self {
            Self::Sphere(p) => p.world.intersect_segment(segment),
            Self::Capsule(p) => p.world.intersect_segment(segment),
            Self::Polyhedron(p) => p.intersect(segment),
            Self::Mesh(p) => p.intersect(segment),
            Self::Plane(p) => p.world.intersect_segment(segment),
        }
    }
}

impl From<SpherePart> for Part {
    fn from(p: SpherePart) -> Self {
        Self::Sphere(p)
    }
}

impl From<CapsulePart> for Part {
    fn from(p: CapsulePart) -> Self {
        Self::Capsule(p)
    }
}

impl From<PolyhedronPart> for Part {
    fn from(p: PolyhedronPart) -> Self {
        Self::Polyhedron(p)
    }
}

impl From<MeshPart> for Part {
    fn from(p: MeshPart) -> Self {
        Self::Mesh(p)
    }
}

impl From<PlanePart> for Part {
    fn from(p: PlanePart) -> Self {
        Self::Plane(p)
    }
}

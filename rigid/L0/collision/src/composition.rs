//! Compositions of parts and body skins.

use nalgebra::{Point3, Vector3};

use rigid_types::{AlignedBox, Material, PhysicsError, Result, Segment, Transform};

use crate::broad_phase::ProxyId;
use crate::part::Part;

/// An ordered, non-empty set of parts with a merged world bounding box.
#[derive(Debug, Clone)]
pub struct Composition {
    parts: Vec<Part>,
    bounds: AlignedBox,
    proxy: Option<ProxyId>,
}

impl Composition {
    /// Create a composition from its parts.
    pub fn new(parts: Vec<Part>) -> Result<Self> {
        if parts.is_empty() {
            return Err(PhysicsError::invalid_geometry("composition needs at least one part"));
        }
        let bounds = merged_bounds(&parts);
        Ok(Self {
            parts,
            bounds,
            proxy: None,
        })
    }

    /// Append a part.
    pub fn add(&mut self, part: Part) {
        self.bounds = self.bounds.merge(&part.bounding_box());
        self.parts.push(part);
    }

    /// Remove the part at `index`. The last part cannot be removed.
    pub fn remove(&mut self, index: usize) -> Result<Part> {
        if index >= self.parts.len() {
            return Err(PhysicsError::invalid_operation(format!(
                "part index {index} out of range"
            )));
        }
        if self.parts.len() == 1 {
            return Err(PhysicsError::invalid_operation(
                "cannot remove the only part of a composition",
            ));
        }
        let part = self.parts.remove(index);
        self.bounds = merged_bounds(&self.parts);
        Ok(part)
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Always false; a composition holds at least one part.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Part `index`.
    #[must_use]
    pub fn part(&self, index: usize) -> &Part {
        &self.parts[index]
    }

    /// All parts in order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Merged world bounding box.
    #[must_use]
    pub fn bounding_box(&self) -> AlignedBox {
        self.bounds
    }

    /// Broad-phase proxy, if registered.
    #[must_use]
    pub fn proxy(&self) -> Option<ProxyId> {
        self.proxy
    }

    /// Record the broad-phase proxy.
    pub fn set_proxy(&mut self, proxy: Option<ProxyId>) {
        self.proxy = proxy;
    }

    /// Move every part into world space and rebuild the bounding box.
    pub fn apply_transform(&mut self, transform: &Transform) {
        for part in &mut self.parts {
            part.apply_transform(transform);
        }
        self.bounds = merged_bounds(&self.parts);
    }

    /// Grow the bounding box along a displacement.
    pub fn sweep(&mut self, delta: &Vector3<f64>) {
        self.bounds.sweep(delta);
    }

    /// Nearest crossing of `segment` with any part, as `(scalar, point)`.
    #[must_use]
    pub fn intersect(&self, segment: &Segment) -> Option<(f64, Point3<f64>)> {
        self.parts
            .iter()
            .filter_map(|part| part.intersect(segment))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }
}

fn merged_bounds(parts: &[Part]) -> AlignedBox {
    parts
        .iter()
        .fold(AlignedBox::NULL, |acc, part| acc.merge(&part.bounding_box()))
}

/// The collision skin of a body: a composition with one material per part.
#[derive(Debug, Clone)]
pub struct BodySkin {
    composition: Composition,
    materials: Vec<Material>,
    default_material: Material,
    transform_inverse: Transform,
}

impl BodySkin {
    /// Skin with a single part.
    #[must_use]
    pub fn new(part: Part, material: Material) -> Self {
        Self {
            composition: Composition {
                bounds: part.bounding_box(),
                parts: vec![part],
                proxy: None,
            },
            materials: vec![material],
            default_material: material,
            transform_inverse: Transform::identity(),
        }
    }

    /// Skin from parts that all use `material`.
    pub fn with_parts(parts: Vec<Part>, material: Material) -> Result<Self> {
        let materials = vec![material; parts.len()];
        Ok(Self {
            composition: Composition::new(parts)?,
            materials,
            default_material: material,
            transform_inverse: Transform::identity(),
        })
    }

    /// Append a part with the default material.
    pub fn add(&mut self, part: Part) {
        self.add_with_material(part, self.default_material);
    }

    /// Append a part with its own material.
    pub fn add_with_material(&mut self, part: Part, material: Material) {
        self.composition.add(part);
        self.materials.push(material);
    }

    /// Remove part `index` together with its material.
    pub fn remove(&mut self, index: usize) -> Result<(Part, Material)> {
        let part = self.composition.remove(index)?;
        Ok((part, self.materials.remove(index)))
    }

    /// Material of part `index`.
    #[must_use]
    pub fn material(&self, index: usize) -> Material {
        self.materials[index]
    }

    /// Material for parts added without one.
    #[must_use]
    pub fn default_material(&self) -> Material {
        self.default_material
    }

    /// Change the material used by [`BodySkin::add`].
    pub fn set_default_material(&mut self, material: Material) {
        self.default_material = material;
    }

    /// Change the material of part `index`.
    pub fn set_material(&mut self, index: usize, material: Material) {
        self.materials[index] = material;
    }

    /// The underlying composition.
    #[must_use]
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Mutable access to the composition.
    pub fn composition_mut(&mut self) -> &mut Composition {
        &mut self.composition
    }

    /// Move the skin into world space, remembering the transform so contact
    /// points can be mapped back with [`BodySkin::undo_transform`].
    pub fn apply_transform(&mut self, transform: &Transform) {
        self.composition.apply_transform(transform);
        self.transform_inverse = transform.inverse();
    }

    /// Grow the bounding box along a displacement without moving the parts.
    pub fn apply_sweep(&mut self, delta: &Vector3<f64>) {
        self.composition.sweep(delta);
    }

    /// Map a point from the skin's last transform onto the body's `world`
    /// transform.
    #[must_use]
    pub fn undo_transform(&self, p: &Point3<f64>, world: &Transform) -> Point3<f64> {
        world.transform_point(&self.transform_inverse.transform_point(p))
    }
}

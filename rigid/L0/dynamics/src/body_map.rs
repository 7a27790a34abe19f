//! Storage of the bodies owned by a manager.

use hashbrown::HashMap;

use rigid_types::BodyId;

use crate::body::RigidBody;

/// Dense body arena with id lookup.
///
/// Bodies live contiguously so each step can walk them as a slice; removal
/// swaps the last body into the hole. Slot indices are therefore only stable
/// between removals. Force generators receive the map directly.
#[derive(Debug, Default)]
pub struct BodyMap {
    bodies: Vec<RigidBody>,
    index: HashMap<BodyId, usize>,
}

impl BodyMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the map holds no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Whether `id` is stored.
    #[must_use]
    pub fn contains(&self, id: BodyId) -> bool {
        self.index.contains_key(&id)
    }

    /// Store a body and return its slot. Returns the body back if its id is
    /// already present.
    pub fn insert(&mut self, body: RigidBody) -> Result<usize, RigidBody> {
        if self.index.contains_key(&body.id()) {
            return Err(body);
        }
        let slot = self.bodies.len();
        self.index.insert(body.id(), slot);
        self.bodies.push(body);
        Ok(slot)
    }

    /// Take a body out of the map.
    pub fn remove(&mut self, id: BodyId) -> Option<RigidBody> {
        let slot = self.index.remove(&id)?;
        let body = self.bodies.swap_remove(slot);
        if let Some(moved) = self.bodies.get(slot) {
            self.index.insert(moved.id(), slot);
        }
        Some(body)
    }

    /// Remove every body.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.index.clear();
    }

    /// Slot of `id`.
    #[must_use]
    pub fn slot(&self, id: BodyId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// The body with `id`.
    #[must_use]
    pub fn get(&self, id: BodyId) -> Option<&RigidBody> {
        self.slot(id).map(|i| &self.bodies[i])
    }

    /// The body with `id`, mutably.
    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        let slot = self.slot(id)?;
        self.bodies.get_mut(slot)
    }

    /// Two distinct bodies, mutably.
    pub fn pair_mut(&mut self, a: BodyId, b: BodyId) -> Option<(&mut RigidBody, &mut RigidBody)> {
        let (i, j) = (self.slot(a)?, self.slot(b)?);
        pair_of(&mut self.bodies, i, j)
    }

    /// Bodies as a slice, in slot order.
    #[must_use]
    pub fn as_slice(&self) -> &[RigidBody] {
        &self.bodies
    }

    /// Bodies as a mutable slice, in slot order.
    pub fn as_mut_slice(&mut self) -> &mut [RigidBody] {
        &mut self.bodies
    }

    /// All bodies in slot order.
    pub fn iter(&self) -> std::slice::Iter<'_, RigidBody> {
        self.bodies.iter()
    }

    /// All bodies in slot order, mutably.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, RigidBody> {
        self.bodies.iter_mut()
    }
}

impl<'a> IntoIterator for &'a BodyMap {
    type Item = &'a RigidBody;
    type IntoIter = std::slice::Iter<'a, RigidBody>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut BodyMap {
    type Item = &'a mut RigidBody;
    type IntoIter = std::slice::IterMut<'a, RigidBody>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Two distinct elements of a slice, mutably.
pub(crate) fn pair_of<T>(items: &mut [T], i: usize, j: usize) -> Option<(&mut T, &mut T)> {
    if i == j || i.max(j) >= items.len() {
        return None;
    }
    if i < j {
        let (lo, hi) = items.split_at_mut(j);
        Some((&mut lo[i], &mut hi[0]))
    } else {
        let (lo, hi) = items.split_at_mut(i);
        Some((&mut hi[0], &mut lo[j]))
    }
}

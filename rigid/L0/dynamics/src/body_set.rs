//! The bodies a constraint may touch while an island is solved.

use std::ops::Deref;

use hashbrown::HashMap;
use nalgebra::Vector3;

use rigid_types::BodyId;

use crate::body::RigidBody;
use crate::body_map::pair_of;

/// A body handed to a constraint.
///
/// Movable bodies belong to the island being solved and are borrowed
/// mutably. Immovable bodies may be shared by several islands at once, so
/// they are borrowed immutably; the impulse methods on a fixed body do
/// nothing, matching the behavior of an immovable [`RigidBody`].
#[derive(Debug)]
pub enum BodyMut<'s> {
    /// A body of the island.
    Movable(&'s mut RigidBody),
    /// An immovable body outside any island.
    Fixed(&'s RigidBody),
}

impl Deref for BodyMut<'_> {
    type Target = RigidBody;

    fn deref(&self) -> &RigidBody {
        match self {
            Self::Movable(body) => body,
            Self::Fixed(body) => body,
        }
    }
}

impl BodyMut<'_> {
    /// See [`RigidBody::apply_impulse`].
    pub fn apply_impulse(&mut self, impulse: &Vector3<f64>, offset: &Vector3<f64>) {
        if let Self::Movable(body) = self {
            body.apply_impulse(impulse, offset);
        }
    }

    /// See [`RigidBody::apply_angular_impulse`].
    pub fn apply_angular_impulse(&mut self, impulse: &Vector3<f64>) {
        if let Self::Movable(body) = self {
            body.apply_angular_impulse(impulse);
        }
    }

    /// See [`RigidBody::apply_flash_impulse`].
    pub fn apply_flash_impulse(&mut self, impulse: &Vector3<f64>, offset: &Vector3<f64>) {
        if let Self::Movable(body) = self {
            body.apply_flash_impulse(impulse, offset);
        }
    }

    /// See [`RigidBody::apply_flash_angular_impulse`].
    pub fn apply_flash_angular_impulse(&mut self, impulse: &Vector3<f64>) {
        if let Self::Movable(body) = self {
            body.apply_flash_angular_impulse(impulse);
        }
    }

    /// Wake a movable body.
    pub fn wake(&mut self) {
        if let Self::Movable(body) = self {
            if body.is_movable() {
                body.set_active(true);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Movable(usize),
    Fixed(usize),
}

/// Bodies reachable from one island's constraints, looked up by id.
#[derive(Debug, Default)]
pub struct BodySet<'a> {
    movable: Vec<&'a mut RigidBody>,
    fixed: Vec<&'a RigidBody>,
    lookup: HashMap<BodyId, Slot>,
}

impl<'a> BodySet<'a> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body the set may modify.
    pub fn insert(&mut self, body: &'a mut RigidBody) {
        if self.lookup.contains_key(&body.id()) {
            return;
        }
        self.lookup.insert(body.id(), Slot::Movable(self.movable.len()));
        self.movable.push(body);
    }

    /// Add a body the set may only read.
    pub fn insert_fixed(&mut self, body: &'a RigidBody) {
        if self.lookup.contains_key(&body.id()) {
            return;
        }
        self.lookup.insert(body.id(), Slot::Fixed(self.fixed.len()));
        self.fixed.push(body);
    }

    /// Whether `id` is in the set.
    #[must_use]
    pub fn contains(&self, id: BodyId) -> bool {
        self.lookup.contains_key(&id)
    }

    /// Number of bodies in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// The body with `id`.
    #[must_use]
    pub fn get(&self, id: BodyId) -> Option<&RigidBody> {
        match *self.lookup.get(&id)? {
            Slot::Movable(i) => Some(&*self.movable[i]),
            Slot::Fixed(i) => Some(self.fixed[i]),
        }
    }

    /// The body with `id`, for applying impulses.
    pub fn get_mut(&mut self, id: BodyId) -> Option<BodyMut<'_>> {
        match *self.lookup.get(&id)? {
            Slot::Movable(i) => Some(BodyMut::Movable(&mut *self.movable[i])),
            Slot::Fixed(i) => Some(BodyMut::Fixed(self.fixed[i])),
        }
    }

    /// Two distinct bodies. `None` if either is missing or `a == b`.
    pub fn pair_mut(&mut self, a: BodyId, b: BodyId) -> Option<(BodyMut<'_>, BodyMut<'_>)> {
        if a == b {
            return None;
        }
        let (sa, sb) = (*self.lookup.get(&a)?, *self.lookup.get(&b)?);
        let Self { movable, fixed, .. } = self;
        match (sa, sb) {
            (Slot::Movable(i), Slot::Movable(j)) => {
                let (x, y) = pair_of(movable, i, j)?;
                Some((BodyMut::Movable(&mut **x), BodyMut::Movable(&mut **y)))
            }
            (Slot::Movable(i), Slot::Fixed(j)) => {
                Some((BodyMut::Movable(&mut *movable[i]), BodyMut::Fixed(fixed[j])))
            }
            (Slot::Fixed(i), Slot::Movable(j)) => {
                Some((BodyMut::Fixed(fixed[i]), BodyMut::Movable(&mut *movable[j])))
            }
            (Slot::Fixed(i), Slot::Fixed(j)) => Some((BodyMut::Fixed(fixed[i]), BodyMut::Fixed(fixed[j]))),
        }
    }

    /// The movable bodies, in insertion order.
    pub fn movable(&self) -> impl Iterator<Item = &RigidBody> + use<'_, 'a> {
        self.movable.iter().map(|b| &**b)
    }

    /// The movable bodies, mutably.
    pub fn movable_mut(&mut self) -> impl Iterator<Item = &mut RigidBody> + use<'_, 'a> {
        self.movable.iter_mut().map(|b| &mut **b)
    }
}

//! Contacts of the previous step, kept for warm starting.

use hashbrown::HashMap;
use nalgebra::Vector3;

use rigid_types::{BodyId, BodyPair};

use crate::constraint::ContactConstraint;
use crate::pool::{Pool, Recycle, DEFAULT_POOL_GROW_FACTOR};

/// A solved contact point as remembered for the next step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CachedPoint {
    /// World offset from the first body's origin.
    pub offset_a: Vector3<f64>,
    /// World offset from the second body's origin.
    pub offset_b: Vector3<f64>,
    /// Accumulated normal impulse.
    pub normal_impulse: f64,
    /// Accumulated friction impulse.
    pub tangent_impulse: f64,
}

impl CachedPoint {
    fn swapped(self) -> Self {
        Self {
            offset_a: self.offset_b,
            offset_b: self.offset_a,
            ..self
        }
    }
}

/// The solved points of one body pair.
#[derive(Debug, Clone, Default)]
pub struct CachedContact {
    body_a: Option<BodyId>,
    points: Vec<CachedPoint>,
}

impl Recycle for CachedContact {
    fn recycle(&mut self) {
        self.body_a = None;
        self.points.clear();
    }
}

impl CachedContact {
    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no point is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The points with offsets ordered so that `offset_a` belongs to
    /// `first`.
    pub fn points_for(&self, first: BodyId) -> impl Iterator<Item = CachedPoint> + '_ {
        let swap = self.body_a != Some(first);
        self.points
            .iter()
            .map(move |&p| if swap { p.swapped() } else { p })
    }
}

/// Per body pair cache of solved contacts, rebuilt after every step.
#[derive(Debug, Default)]
pub struct ContactCache {
    pairs: HashMap<BodyPair, usize>,
    pool: Pool<CachedContact>,
}

impl ContactCache {
    /// Create a cache with room for `capacity` pairs.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            pairs: HashMap::with_capacity(capacity),
            pool: Pool::new(capacity, DEFAULT_POOL_GROW_FACTOR),
        }
    }

    /// Number of cached pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Forget every pair.
    pub fn clear(&mut self) {
        self.pairs.clear();
        self.pool.recycle_all();
    }

    /// Remember the points of a solved contact. When a pair has several
    /// contacts (one per part pair), the first one added is kept.
    pub fn add(&mut self, contact: &ContactConstraint) {
        let pair = BodyPair::new(contact.body_a(), contact.body_b());
        if self.pairs.contains_key(&pair) {
            return;
        }
        let slot = self.pool.allocate();
        if let Some(cached) = self.pool.get_mut(slot) {
            cached.body_a = Some(contact.body_a());
            cached.points.extend(contact.points().iter().map(|p| CachedPoint {
                offset_a: p.offset_a(),
                offset_b: p.offset_b(),
                normal_impulse: p.impulse(),
                tangent_impulse: p.tangent_impulse(),
            }));
        }
        self.pairs.insert(pair, slot);
    }

    /// The cached contact of a pair, in either order.
    #[must_use]
    pub fn get(&self, a: BodyId, b: BodyId) -> Option<&CachedContact> {
        let slot = *self.pairs.get(&BodyPair::new(a, b))?;
        self.pool.get(slot)
    }
}

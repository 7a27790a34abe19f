//! Slot arena for objects rebuilt every step.
//!
//! Contacts and islands are allocated and recycled thousands of times per
//! second. A [`Pool`] keeps the objects alive between steps and hands out
//! slot indices; recycling resets the object through [`Recycle`] and pushes
//! its index back onto the free list. Live objects are referenced by index,
//! never by pointer.

use tracing::debug;

/// Growth factor applied when a pool runs out of free slots.
pub const DEFAULT_POOL_GROW_FACTOR: usize = 2;

/// An object that can be returned to a [`Pool`].
pub trait Recycle {
    /// Reset every field the object exposes. Must be idempotent.
    fn recycle(&mut self);
}

/// Slot arena with an index free list.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<T>,
    live: Vec<bool>,
    free: Vec<usize>,
    grow_factor: usize,
}

impl<T: Recycle + Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new(0, DEFAULT_POOL_GROW_FACTOR)
    }
}

impl<T: Recycle + Default> Pool<T> {
    /// Create a pool with `capacity` preallocated slots.
    #[must_use]
    pub fn new(capacity: usize, grow_factor: usize) -> Self {
        let mut pool = Self {
            slots: Vec::new(),
            live: Vec::new(),
            free: Vec::new(),
            grow_factor: grow_factor.max(2),
        };
        pool.reserve(capacity);
        pool
    }

    /// Total number of slots, live or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether no object is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take a free slot, growing the pool if none is left. The object in the
    /// slot is in its recycled state.
    pub fn allocate(&mut self) -> usize {
        if self.free.is_empty() {
            let before = self.slots.len();
            let grown = (before * self.grow_factor).max(4);
            self.reserve(grown - before);
            debug!(before, after = grown, "pool grew");
        }
        // The free list is non-empty after reserve.
        let index = self.free.pop().unwrap_or_default();
        self.live[index] = true;
        index
    }

    /// Return a slot to the pool. Recycling a free or unknown slot does
    /// nothing and returns false.
    pub fn recycle(&mut self, index: usize) -> bool {
        match self.live.get_mut(index) {
            Some(live) if *live => {
                *live = false;
                self.slots[index].recycle();
                self.free.push(index);
                true
            }
            _ => false,
        }
    }

    /// Recycle every live slot.
    pub fn recycle_all(&mut self) {
        for index in 0..self.slots.len() {
            self.recycle(index);
        }
    }

    /// Whether `index` holds a live object.
    #[must_use]
    pub fn is_live(&self, index: usize) -> bool {
        self.live.get(index).copied().unwrap_or(false)
    }

    /// The live object at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if self.is_live(index) {
            self.slots.get(index)
        } else {
            None
        }
    }

    /// The live object at `index`, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if self.is_live(index) {
            self.slots.get_mut(index)
        } else {
            None
        }
    }

    /// Live objects with their slot indices, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .zip(&self.live)
            .enumerate()
            .filter_map(|(i, (slot, &live))| live.then_some((i, slot)))
    }

    /// Live objects with their slot indices, mutably, in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .zip(&self.live)
            .enumerate()
            .filter_map(|(i, (slot, &live))| live.then_some((i, slot)))
    }

    fn reserve(&mut self, additional: usize) {
        let start = self.slots.len();
        self.slots.extend((0..additional).map(|_| T::default()));
        self.live.resize(start + additional, false);
        // Lowest indices are handed out first.
        self.free.extend((start..start + additional).rev());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Scratch {
        values: Vec<u32>,
        tag: Option<u32>,
    }

    impl Recycle for Scratch {
        fn recycle(&mut self) {
            self.values.clear();
            self.tag = None;
        }
    }

    #[test]
    fn test_allocate_hands_out_lowest_first() {
        let mut pool: Pool<Scratch> = Pool::new(3, 2);
        assert_eq!(pool.allocate(), 0);
        assert_eq!(pool.allocate(), 1);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.capacity(), 3);
    }

    #[test]
    fn test_recycle_is_idempotent_and_resets() {
        let mut pool: Pool<Scratch> = Pool::new(2, 2);
        let i = pool.allocate();
        let slot = pool.get_mut(i).unwrap();
        slot.values.push(7);
        slot.tag = Some(3);

        assert!(pool.recycle(i));
        assert!(!pool.recycle(i));
        assert!(!pool.recycle(99));
        assert_eq!(pool.len(), 0);
        assert!(pool.get(i).is_none());

        let j = pool.allocate();
        assert_eq!(i, j);
        let slot = pool.get(j).unwrap();
        assert!(slot.values.is_empty());
        assert!(slot.tag.is_none());
    }

    #[test]
    fn test_grows_by_factor() {
        let mut pool: Pool<Scratch> = Pool::new(4, 3);
        for _ in 0..5 {
            pool.allocate();
        }
        assert_eq!(pool.capacity(), 12);
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut pool: Pool<Scratch> = Pool::new(4, 2);
        for _ in 0..4 {
            pool.allocate();
        }
        pool.recycle(1);
        pool.recycle(2);
        let live: Vec<usize> = pool.iter().map(|(i, _)| i).collect();
        assert_eq!(live, vec![0, 3]);

        pool.recycle_all();
        assert!(pool.is_empty());
        assert_eq!(pool.iter_mut().count(), 0);
    }
}

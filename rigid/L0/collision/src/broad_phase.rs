//! Broad-phase candidate pair search.
//!
//! [`SweepAndPrune`] keeps one list of proxies per axis sorted by the
//! minimum of their bounding boxes. Each step it re-sorts the lists (a full
//! sort after insertions, an insertion sort otherwise since boxes move little
//! between steps) and sweeps them, recording every overlap on that axis in a
//! triangular bit matrix. The three axis sweeps run as one task batch. Pairs
//! whose bit is set in all three matrices are the candidates.

use nalgebra::Point3;
use tracing::debug;

use rigid_types::{AlignedBox, BodyId, Result, Segment, Task, TaskManager};

/// Handle of a box registered with a broad phase.
///
/// Handles are dense indices. Removing one moves the last proxy into the
/// freed slot; [`BroadPhase::remove`] reports whose handle changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(u32);

impl ProxyId {
    /// Slot index of the proxy.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Nearest hit of a segment query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Owner of the box that was hit.
    pub owner: BodyId,
    /// Position along the segment in `[0, 1]`.
    pub scalar: f64,
    /// World-space hit point.
    pub point: Point3<f64>,
}

/// Candidate pair search over bounding boxes.
pub trait BroadPhase: Send {
    /// Register `bounds` for `owner`.
    fn add(&mut self, owner: BodyId, bounds: AlignedBox) -> ProxyId;

    /// Unregister a proxy. Returns the owner whose proxy moved into the
    /// freed handle, if any.
    fn remove(&mut self, proxy: ProxyId) -> Option<BodyId>;

    /// Replace the bounds of a proxy.
    fn update(&mut self, proxy: ProxyId, bounds: AlignedBox);

    /// Remove every proxy.
    fn clear(&mut self);

    /// Number of registered proxies.
    fn len(&self) -> usize;

    /// Whether no proxies are registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every pair of owners whose boxes overlap to `pairs`.
    fn execute(&mut self, tasks: &TaskManager, pairs: &mut Vec<(BodyId, BodyId)>) -> Result<()>;

    /// Nearest hit of `segment`. `test` runs the exact shape test for an
    /// owner whose box the segment crosses.
    fn intersect(
        &self,
        segment: &Segment,
        test: &mut dyn FnMut(BodyId) -> Option<(f64, Point3<f64>)>,
    ) -> Option<RayHit>;
}

const WORD_BITS: usize = u64::BITS as usize;

/// Default number of proxies the bit matrices are sized for.
pub const DEFAULT_CAPACITY: usize = 128;

/// Default factor the matrices grow by when the population outgrows them.
pub const DEFAULT_GROW_FACTOR: usize = 2;

#[derive(Debug, Clone, Copy)]
struct Proxy {
    owner: BodyId,
    bounds: AlignedBox,
}

/// Sweep-and-prune broad phase.
#[derive(Debug, Clone)]
pub struct SweepAndPrune {
    proxies: Vec<Proxy>,
    axes: [Vec<u32>; 3],
    matrices: [Vec<u64>; 3],
    rows: usize,
    columns: usize,
    grow_factor: usize,
    needs_full_sort: bool,
}

impl Default for SweepAndPrune {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, DEFAULT_GROW_FACTOR)
    }
}

impl SweepAndPrune {
    /// Create a broad phase with matrices sized for `capacity` proxies,
    /// growing by `grow_factor` (at least 2) when exceeded.
    #[must_use]
    pub fn with_capacity(capacity: usize, grow_factor: usize) -> Self {
        let mut sap = Self {
            proxies: Vec::new(),
            axes: Default::default(),
            matrices: Default::default(),
            rows: 0,
            columns: 0,
            grow_factor: grow_factor.max(2),
            needs_full_sort: false,
        };
        sap.set_capacity(capacity.max(1));
        sap
    }

    /// Number of proxies the matrices currently hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.rows
    }

    /// Owner of a proxy.
    #[must_use]
    pub fn owner(&self, proxy: ProxyId) -> Option<BodyId> {
        self.proxies.get(proxy.index()).map(|p| p.owner)
    }

    /// Current bounds of a proxy.
    #[must_use]
    pub fn bounds(&self, proxy: ProxyId) -> Option<AlignedBox> {
        self.proxies.get(proxy.index()).map(|p| p.bounds)
    }

    // Rows are rounded up to whole words so every row has the same number of
    // columns.
    fn set_capacity(&mut self, size: usize) {
        self.columns = size.div_ceil(WORD_BITS);
        self.rows = self.columns * WORD_BITS;
        for m in &mut self.matrices {
            *m = vec![0; self.rows * self.columns];
        }
    }

    fn grow(&mut self) {
        let mut rows = self.rows;
        while self.proxies.len() > rows {
            rows *= self.grow_factor;
        }
        if rows != self.rows {
            debug!(from = self.rows, to = rows, "growing broad-phase matrices");
            self.set_capacity(rows);
        }
    }
}

impl BroadPhase for SweepAndPrune {
    fn add(&mut self, owner: BodyId, bounds: AlignedBox) -> ProxyId {
        // u32 handles cover far more proxies than the matrices could hold.
        #[allow(clippy::cast_possible_truncation)]
        let id = self.proxies.len() as u32;
        self.proxies.push(Proxy { owner, bounds });
        for axis in &mut self.axes {
            axis.push(id);
        }
        self.needs_full_sort = true;
        ProxyId(id)
    }

    fn remove(&mut self, proxy: ProxyId) -> Option<BodyId> {
        let index = proxy.index();
        if index >= self.proxies.len() {
            return None;
        }
        self.proxies.swap_remove(index);
        #[allow(clippy::cast_possible_truncation)]
        let last = self.proxies.len() as u32;
        for axis in &mut self.axes {
            axis.retain(|&i| i != proxy.0);
            for i in axis.iter_mut() {
                if *i == last {
                    *i = proxy.0;
                }
            }
        }
        self.proxies.get(index).map(|p| p.owner)
    }

    fn update(&mut self, proxy: ProxyId, bounds: AlignedBox) {
        if let Some(p) = self.proxies.get_mut(proxy.index()) {
            p.bounds = bounds;
        }
    }

    fn clear(&mut self) {
        self.proxies.clear();
        for axis in &mut self.axes {
            axis.clear();
        }
        self.needs_full_sort = false;
    }

    fn len(&self) -> usize {
        self.proxies.len()
    }

    fn execute(&mut self, tasks: &TaskManager, pairs: &mut Vec<(BodyId, BodyId)>) -> Result<()> {
        self.grow();

        let Self {
            proxies,
            axes,
            matrices,
            columns,
            needs_full_sort,
            ..
        } = &mut *self;
        let (proxies, columns, full_sort) = (&*proxies, *columns, *needs_full_sort);
        let batch: Vec<Task<'_>> = axes
            .iter_mut()
            .zip(matrices.iter_mut())
            .enumerate()
            .map(|(axis, (order, matrix))| {
                Box::new(move || {
                    sort_and_sweep(axis, order, matrix, proxies, columns, full_sort);
                    Ok(())
                }) as Task<'_>
            })
            .collect();
        tasks.execute(batch)?;
        *needs_full_sort = false;

        let [mx, my, mz] = &self.matrices;
        for row in 0..self.proxies.len() {
            let start = row * self.columns;
            for word in 0..self.columns {
                let k = start + word;
                let mut block = mx[k] & my[k] & mz[k];
                while block != 0 {
                    let col = word * WORD_BITS + block.trailing_zeros() as usize;
                    pairs.push((self.proxies[row].owner, self.proxies[col].owner));
                    block &= block - 1;
                }
            }
        }
        Ok(())
    }

    fn intersect(
        &self,
        segment: &Segment,
        test: &mut dyn FnMut(BodyId) -> Option<(f64, Point3<f64>)>,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for &i in &self.axes[0] {
            let proxy = &self.proxies[i as usize];
            if proxy.bounds.intersect_segment(segment).is_none() {
                continue;
            }
            if let Some((scalar, point)) = test(proxy.owner) {
                if best.map_or(true, |b| scalar < b.scalar) {
                    best = Some(RayHit {
                        owner: proxy.owner,
                        scalar,
                        point,
                    });
                }
            }
        }
        best
    }
}

fn sort_and_sweep(
    axis: usize,
    order: &mut [u32],
    matrix: &mut [u64],
    proxies: &[Proxy],
    columns: usize,
    full_sort: bool,
) {
    matrix.fill(0);
    let min = |i: u32| proxies[i as usize].bounds.min[axis];

    if full_sort {
        order.sort_by(|&a, &b| min(a).total_cmp(&min(b)));
    } else {
        for i in 1..order.len() {
            let mut j = i;
            while j > 0 && min(order[j - 1]) > min(order[j]) {
                order.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    for (i, &a) in order.iter().enumerate() {
        let max = proxies[a as usize].bounds.max[axis];
        for &b in &order[i + 1..] {
            if max < min(b) {
                break;
            }
            let (row, col) = if a < b { (a, b) } else { (b, a) };
            let (row, col) = (row as usize, col as usize);
            matrix[row * columns + col / WORD_BITS] |= 1u64 << (col % WORD_BITS);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn unit_box(x: f64, y: f64, z: f64) -> AlignedBox {
        AlignedBox::from_center(Point3::new(x, y, z), Vector3::repeat(0.5))
    }

    fn pairs_of(sap: &mut SweepAndPrune) -> Vec<(u64, u64)> {
        let tasks = TaskManager::new(2).unwrap();
        let mut pairs = Vec::new();
        sap.execute(&tasks, &mut pairs).unwrap();
        pairs.into_iter().map(|(a, b)| (a.raw(), b.raw())).collect()
    }

    #[test]
    fn test_overlap_needs_all_three_axes() {
        let mut sap = SweepAndPrune::default();
        sap.add(BodyId::new(1), unit_box(0.0, 0.0, 0.0));
        sap.add(BodyId::new(2), unit_box(0.8, 0.2, -0.3));
        // Overlaps the first on x and y only.
        sap.add(BodyId::new(3), unit_box(0.5, 0.5, 3.0));
        assert_eq!(pairs_of(&mut sap), vec![(1, 2)]);
    }

    #[test]
    fn test_pairs_follow_moves() {
        let mut sap = SweepAndPrune::default();
        let a = sap.add(BodyId::new(1), unit_box(0.0, 0.0, 0.0));
        sap.add(BodyId::new(2), unit_box(5.0, 0.0, 0.0));
        assert!(pairs_of(&mut sap).is_empty());

        // Later steps use the insertion sort.
        sap.update(a, unit_box(4.5, 0.0, 0.0));
        assert_eq!(pairs_of(&mut sap), vec![(1, 2)]);
        sap.update(a, unit_box(9.0, 0.0, 0.0));
        assert!(pairs_of(&mut sap).is_empty());
    }

    #[test]
    fn test_remove_moves_last_proxy() {
        let mut sap = SweepAndPrune::default();
        let a = sap.add(BodyId::new(1), unit_box(0.0, 0.0, 0.0));
        sap.add(BodyId::new(2), unit_box(0.5, 0.0, 0.0));
        sap.add(BodyId::new(3), unit_box(1.0, 0.0, 0.0));

        assert_eq!(sap.remove(a), Some(BodyId::new(3)));
        assert_eq!(sap.owner(a), Some(BodyId::new(3)));
        assert_eq!(sap.len(), 2);
        assert_eq!(pairs_of(&mut sap), vec![(3, 2)]);

        let last = ProxyId(1);
        assert_eq!(sap.remove(last), None);
        assert_eq!(sap.remove(ProxyId(7)), None);
        assert_eq!(sap.len(), 1);
    }

    #[test]
    fn test_grows_past_capacity() {
        let mut sap = SweepAndPrune::with_capacity(4, 2);
        for i in 0..100 {
            sap.add(BodyId::new(i), unit_box(i as f64 * 0.01, 0.0, 0.0));
        }
        let pairs = pairs_of(&mut sap);
        assert!(sap.capacity() >= 100);
        assert_eq!(pairs.len(), 100 * 99 / 2);
        // Ascending row then column.
        assert_eq!(pairs[0], (0, 1));
        assert_eq!(pairs[pairs.len() - 1], (98, 99));
    }

    #[test]
    fn test_unbounded_box_pairs_with_everything() {
        let mut sap = SweepAndPrune::default();
        sap.add(BodyId::new(1), AlignedBox::INFINITE);
        sap.add(BodyId::new(2), unit_box(100.0, -40.0, 7.0));
        sap.add(BodyId::new(3), unit_box(-100.0, 40.0, -7.0));
        assert_eq!(pairs_of(&mut sap), vec![(1, 2), (1, 3)]);
    }

    #[test]
    fn test_serial_and_parallel_agree() {
        let mut boxes = SweepAndPrune::default();
        for i in 0..40 {
            let f = i as f64;
            boxes.add(BodyId::new(i), unit_box((f * 0.7).sin() * 3.0, (f * 1.3).cos() * 3.0, f * 0.05));
        }
        let mut serial = TaskManager::new(1).unwrap();
        serial.set_threading_enabled(false);
        let mut a = Vec::new();
        boxes.clone().execute(&serial, &mut a).unwrap();
        let mut b = Vec::new();
        boxes.execute(&TaskManager::new(4).unwrap(), &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_intersect_keeps_nearest() {
        let mut sap = SweepAndPrune::default();
        sap.add(BodyId::new(1), unit_box(5.0, 0.0, 0.0));
        sap.add(BodyId::new(2), unit_box(2.0, 0.0, 0.0));
        sap.add(BodyId::new(3), unit_box(2.0, 9.0, 0.0));
        let segment = Segment::new(Point3::origin(), Point3::new(10.0, 0.0, 0.0));

        let mut tested = Vec::new();
        let hit = sap
            .intersect(&segment, &mut |owner| {
                tested.push(owner.raw());
                let x = if owner.raw() == 1 { 4.5 } else { 1.5 };
                Some((x / 10.0, Point3::new(x, 0.0, 0.0)))
            })
            .unwrap();
        assert_eq!(hit.owner, BodyId::new(2));
        assert_relative_eq!(hit.scalar, 0.15);
        tested.sort_unstable();
        assert_eq!(tested, vec![1, 2]);
    }
}

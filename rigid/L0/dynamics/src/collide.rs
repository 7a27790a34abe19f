//! Contact generation for broad-phase candidate pairs.
//!
//! The manager owns one [`ContactWorker`] per task-manager thread. Each step
//! the candidate pairs are split into contiguous chunks, one per worker, and
//! every worker runs its chunk through its own narrow phase into its own
//! contact pool. Contacts are addressed across workers by [`ContactHandle`].

use nalgebra::{Point3, Vector3};

use rigid_collision::{ContactSink, NarrowPhase, Part};
use rigid_types::{BodyId, Material};

use crate::body::RigidBody;
use crate::body_map::BodyMap;
use crate::constraint::ContactConstraint;
use crate::pool::{Pool, DEFAULT_POOL_GROW_FACTOR};

/// Address of a contact: the worker that produced it and its pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ContactHandle {
    pub(crate) worker: usize,
    pub(crate) slot: usize,
}

/// Narrow-phase runner with its own contact pool.
#[derive(Debug)]
pub(crate) struct ContactWorker {
    narrow: NarrowPhase,
    pool: Pool<ContactConstraint>,
    items: Vec<usize>,
    max_points: usize,
}

impl ContactWorker {
    pub(crate) fn new(capacity: usize, max_points: usize) -> Self {
        Self {
            narrow: NarrowPhase::new(),
            pool: Pool::new(capacity, DEFAULT_POOL_GROW_FACTOR),
            items: Vec::with_capacity(capacity),
            max_points,
        }
    }

    /// Drop last step's contacts. Contacts between two sleeping bodies that
    /// are both still managed are kept: the broad phase skips such pairs, so
    /// the old contact stands in for them.
    pub(crate) fn clear(&mut self, bodies: &BodyMap) {
        let pool = &mut self.pool;
        self.items.retain(|&slot| {
            let keep = pool.get_mut(slot).is_some_and(|c| {
                c.island = None;
                let a = bodies.get(c.body_a());
                let b = bodies.get(c.body_b());
                matches!((a, b), (Some(a), Some(b)) if !a.is_active() && !b.is_active())
            });
            if !keep {
                pool.recycle(slot);
            }
            keep
        });
    }

    /// Forget every contact.
    pub(crate) fn reset(&mut self) {
        self.items.clear();
        self.pool.recycle_all();
    }

    /// Test every part pair of every body pair in `pairs`.
    pub(crate) fn collide(&mut self, pairs: &[(BodyId, BodyId)], bodies: &BodyMap, dt: f64) {
        for &(a, b) in pairs {
            let (Some(a), Some(b)) = (bodies.get(a), bodies.get(b)) else {
                continue;
            };
            self.collide_bodies(a, b, dt);
        }
    }

    fn collide_bodies(&mut self, a: &RigidBody, b: &RigidBody, dt: f64) {
        let swept = a.is_fast() || b.is_fast();
        let delta = if swept {
            let mut delta = Vector3::zeros();
            if a.is_fast() {
                delta += a.linear_velocity();
            }
            if b.is_fast() {
                delta -= b.linear_velocity();
            }
            Some(delta * dt)
        } else {
            None
        };

        let parts_a = a.skin().composition().parts();
        let parts_b = b.skin().composition().parts();
        for (i, pa) in parts_a.iter().enumerate() {
            for (j, pb) in parts_b.iter().enumerate() {
                if delta.is_none() && !pa.bounding_box().overlaps(&pb.bounding_box()) {
                    continue;
                }
                let mut writer = ContactWriter {
                    pool: &mut self.pool,
                    current: None,
                    body_a: a.id(),
                    body_b: b.id(),
                    material_a: a.skin().material(i),
                    material_b: b.skin().material(j),
                    max_points: self.max_points,
                };
                run_test(&mut self.narrow, pa, pb, delta.as_ref(), &mut writer);

                if let Some(slot) = writer.current {
                    if let Some(contact) = self.pool.get_mut(slot) {
                        contact.finalize(a, b);
                    }
                    self.items.push(slot);
                }
            }
        }
    }

    /// Slots of this step's contacts, in generation order.
    pub(crate) fn items(&self) -> &[usize] {
        &self.items
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&ContactConstraint> {
        self.pool.get(slot)
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut ContactConstraint> {
        self.pool.get_mut(slot)
    }

    /// Every live contact, in pool order.
    pub(crate) fn live_mut(&mut self) -> impl Iterator<Item = &mut ContactConstraint> {
        self.pool.iter_mut().map(|(_, c)| c)
    }
}

fn run_test(narrow: &mut NarrowPhase, a: &Part, b: &Part, delta: Option<&Vector3<f64>>, sink: &mut dyn ContactSink) {
    match delta {
        Some(delta) => narrow.swept_test(a, b, delta, sink),
        None => narrow.overlap_test(a, b, sink),
    };
}

// Allocates the contact of a part pair on its first point.
struct ContactWriter<'p> {
    pool: &'p mut Pool<ContactConstraint>,
    current: Option<usize>,
    body_a: BodyId,
    body_b: BodyId,
    material_a: Material,
    material_b: Material,
    max_points: usize,
}

impl ContactSink for ContactWriter<'_> {
    fn write_point(&mut self, point_a: &Point3<f64>, point_b: &Point3<f64>, normal: &Vector3<f64>) {
        let slot = match self.current {
            Some(slot) => slot,
            None => {
                let slot = self.pool.allocate();
                if let Some(contact) = self.pool.get_mut(slot) {
                    contact.set_parameters(
                        self.body_a,
                        self.body_b,
                        Material::combined_restitution(&self.material_a, &self.material_b),
                        Material::combined_friction(&self.material_a, &self.material_b),
                        self.max_points,
                    );
                }
                self.current = Some(slot);
                slot
            }
        };
        if let Some(contact) = self.pool.get_mut(slot) {
            contact.write_world_point(point_a, point_b, normal);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::constraint::tests::{ball, ground};
    use approx::assert_relative_eq;
    use rigid_types::PhysicsConfig;

    fn prepared(mut body: RigidBody, config: &PhysicsConfig) -> RigidBody {
        body.integrate_force(0.0, config);
        body
    }

    #[test]
    fn test_touching_balls_make_one_contact() {
        let config = PhysicsConfig::default();
        let mut bodies = BodyMap::new();
        let a = prepared(ball(Point3::new(0.0, 0.0, 0.95)), &config);
        let b = prepared(ball(Point3::origin()), &config);
        let (ia, ib) = (a.id(), b.id());
        bodies.insert(a).unwrap();
        bodies.insert(b).unwrap();

        let mut worker = ContactWorker::new(4, 16);
        worker.collide(&[(ia, ib)], &bodies, 1.0 / 60.0);
        assert_eq!(worker.items().len(), 1);

        let contact = worker.get(worker.items()[0]).unwrap();
        assert_eq!(contact.body_a(), ia);
        assert_eq!(contact.body_b(), ib);
        assert_relative_eq!(contact.normal(), Vector3::z(), epsilon = 1e-9);
        assert_eq!(contact.points().len(), 1);
        assert_relative_eq!(contact.points()[0].depth(), 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_separated_bodies_make_no_contact() {
        let config = PhysicsConfig::default();
        let mut bodies = BodyMap::new();
        let a = prepared(ball(Point3::new(0.0, 0.0, 3.0)), &config);
        let b = prepared(ground(), &config);
        let (ia, ib) = (a.id(), b.id());
        bodies.insert(a).unwrap();
        bodies.insert(b).unwrap();

        let mut worker = ContactWorker::new(4, 16);
        worker.collide(&[(ia, ib)], &bodies, 1.0 / 60.0);
        assert!(worker.items().is_empty());
        assert_eq!(worker.pool.len(), 0);
    }

    #[test]
    fn test_clear_keeps_sleeping_pairs() {
        let config = PhysicsConfig::default();
        let mut bodies = BodyMap::new();
        let a = prepared(ball(Point3::new(0.0, 0.0, 0.45)), &config);
        let b = prepared(ground(), &config);
        let (ia, ib) = (a.id(), b.id());
        bodies.insert(a).unwrap();
        bodies.insert(b).unwrap();

        let mut worker = ContactWorker::new(4, 16);
        worker.collide(&[(ia, ib)], &bodies, 1.0 / 60.0);
        assert_eq!(worker.items().len(), 1);

        bodies.get_mut(ia).unwrap().set_active(false);
        worker.clear(&bodies);
        assert_eq!(worker.items().len(), 1);

        bodies.get_mut(ia).unwrap().set_active(true);
        worker.clear(&bodies);
        assert!(worker.items().is_empty());
        assert_eq!(worker.pool.len(), 0);
    }
}

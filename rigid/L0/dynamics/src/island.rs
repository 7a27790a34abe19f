//! Simulation islands.
//!
//! An island is a maximal group of movable bodies connected through
//! constraints and contacts. Immovable bodies never join an island and never
//! connect two islands, so islands share no mutable state and are solved in
//! parallel, one task each.
//!
//! Islands are rebuilt from scratch every step by a flood fill over the body
//! graph. Every movable body belongs to exactly one island, sleeping bodies
//! included; an island whose bodies have all been still for long enough is
//! put to sleep instead of solved.

use hashbrown::HashMap;
use nalgebra::Vector3;
use tracing::trace;

use rigid_types::{BodyId, ConstraintId, EPSILON};

use crate::body::RigidBody;
use crate::body_map::BodyMap;
use crate::body_set::BodySet;
use crate::collide::{ContactHandle, ContactWorker};
use crate::constraint::{Constraint, SolverContext};
use crate::manager::ConstraintEntry;
use crate::pool::{Pool, Recycle, DEFAULT_POOL_GROW_FACTOR};

/// Members of one island, as indices into the manager's storage.
#[derive(Debug, Clone, Default)]
pub(crate) struct Island {
    /// Body slots of the movable members.
    pub(crate) bodies: Vec<usize>,
    /// Body slots of immovable bodies the members touch or are joined to.
    pub(crate) fixed: Vec<usize>,
    /// Constraint entry indices.
    pub(crate) constraints: Vec<usize>,
    /// Contacts.
    pub(crate) contacts: Vec<ContactHandle>,
}

impl Recycle for Island {
    fn recycle(&mut self) {
        self.bodies.clear();
        self.fixed.clear();
        self.constraints.clear();
        self.contacts.clear();
    }
}

/// Pooled islands of the current step.
#[derive(Debug)]
pub(crate) struct Islands {
    pool: Pool<Island>,
    // Pool slot of each island, indexed by island number.
    order: Vec<usize>,
    // Island number of each body slot.
    body_island: Vec<Option<usize>>,
}

impl Islands {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            pool: Pool::new(capacity, DEFAULT_POOL_GROW_FACTOR),
            order: Vec::with_capacity(capacity),
            body_island: Vec::new(),
        }
    }

    /// Number of islands built this step.
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Island number of the body in `slot`.
    pub(crate) fn island_of(&self, slot: usize) -> Option<usize> {
        self.body_island.get(slot).copied().flatten()
    }

    /// Island `number`.
    pub(crate) fn get(&self, number: usize) -> Option<&Island> {
        self.pool.get(*self.order.get(number)?)
    }

    /// Return every island to the pool and clear the constraint marks.
    pub(crate) fn recycle(&mut self, constraints: &mut [ConstraintEntry]) {
        for slot in self.order.drain(..) {
            self.pool.recycle(slot);
        }
        self.body_island.clear();
        for entry in constraints {
            entry.island = None;
        }
    }

    /// Flood-fill the body graph into islands. Contacts must already be
    /// attached to their bodies.
    pub(crate) fn build(
        &mut self,
        bodies: &BodyMap,
        constraints: &mut [ConstraintEntry],
        constraint_index: &HashMap<ConstraintId, usize>,
        workers: &mut [ContactWorker],
    ) {
        let Self {
            pool,
            order,
            body_island,
        } = self;
        let slice = bodies.as_slice();
        body_island.clear();
        body_island.resize(slice.len(), None);

        let mut stack = Vec::new();
        for (start, body) in slice.iter().enumerate() {
            if !body.is_movable() || body_island[start].is_some() {
                continue;
            }
            let number = order.len();
            let slot = pool.allocate();
            order.push(slot);
            let Some(island) = pool.get_mut(slot) else {
                continue;
            };

            body_island[start] = Some(number);
            stack.push(start);
            while let Some(current) = stack.pop() {
                island.bodies.push(current);
                let body = &slice[current];
                let mut reached: Vec<BodyId> = Vec::new();

                for id in body.constraints() {
                    let Some(&index) = constraint_index.get(id) else {
                        continue;
                    };
                    let entry = &mut constraints[index];
                    if entry.island.is_none() {
                        entry.island = Some(number);
                        island.constraints.push(index);
                        let (a, b) = entry.constraint.bodies();
                        reached.push(a);
                        reached.extend(b);
                    }
                }
                for &handle in &body.contacts {
                    let Some(contact) = workers.get_mut(handle.worker).and_then(|w| w.get_mut(handle.slot)) else {
                        continue;
                    };
                    if contact.island.is_none() {
                        contact.island = Some(number);
                        island.contacts.push(handle);
                        reached.push(contact.body_a());
                        reached.push(contact.body_b());
                    }
                }

                for id in reached {
                    let Some(other) = bodies.slot(id) else {
                        continue;
                    };
                    if !slice[other].is_movable() {
                        if !island.fixed.contains(&other) {
                            island.fixed.push(other);
                        }
                    } else if body_island[other].is_none() {
                        body_island[other] = Some(number);
                        stack.push(other);
                    }
                }
            }
        }
        trace!(islands = order.len(), "islands built");
    }

    /// Split the manager's storage into one solver per island.
    pub(crate) fn solvers<'a>(
        &self,
        bodies: &'a mut BodyMap,
        constraints: &'a mut [ConstraintEntry],
        workers: &'a mut [ContactWorker],
    ) -> Vec<IslandSolver<'a>> {
        let mut solvers: Vec<IslandSolver<'a>> = (0..self.order.len()).map(|_| IslandSolver::default()).collect();

        let mut fixed: Vec<Option<&'a RigidBody>> = Vec::with_capacity(bodies.len());
        for (slot, body) in bodies.iter_mut().enumerate() {
            if !body.is_movable() {
                let body: &'a RigidBody = body;
                fixed.push(Some(body));
                continue;
            }
            fixed.push(None);
            if let Some(solver) = self.island_of(slot).and_then(|n| solvers.get_mut(n)) {
                solver.bodies.insert(body);
            }
        }
        for (number, solver) in solvers.iter_mut().enumerate() {
            let Some(island) = self.get(number) else {
                continue;
            };
            for body in island.fixed.iter().filter_map(|&slot| fixed.get(slot).copied().flatten()) {
                solver.bodies.insert_fixed(body);
            }
        }

        for entry in constraints.iter_mut() {
            if let Some(solver) = entry.island.and_then(|n| solvers.get_mut(n)) {
                solver.constraints.push(SolverItem::new(false, entry.constraint.as_mut()));
            }
        }
        for worker in workers.iter_mut() {
            for contact in worker.live_mut() {
                if let Some(solver) = contact.island.and_then(|n| solvers.get_mut(n)) {
                    solver.constraints.push(SolverItem::new(true, contact));
                }
            }
        }
        solvers
    }
}

struct SolverItem<'a> {
    is_contact: bool,
    height: f64,
    constraint: &'a mut dyn Constraint,
}

impl<'a> SolverItem<'a> {
    fn new(is_contact: bool, constraint: &'a mut dyn Constraint) -> Self {
        Self {
            is_contact,
            height: 0.0,
            constraint,
        }
    }
}

/// One island's bodies and constraints, ready to be solved on any thread.
#[derive(Default)]
pub(crate) struct IslandSolver<'a> {
    bodies: BodySet<'a>,
    constraints: Vec<SolverItem<'a>>,
}

impl IslandSolver<'_> {
    /// Run one step: sleep if every body has been still long enough,
    /// otherwise solve velocities, integrate and correct positions.
    pub(crate) fn solve(mut self, ctx: &SolverContext<'_>) {
        let config = ctx.config;
        if self.bodies.movable().all(|b| b.can_deactivate(config.deactivation_time)) {
            for body in self.bodies.movable_mut() {
                body.set_active(false);
            }
            return;
        }

        if config.is_solver_sorting_enabled {
            self.sort(&config.gravity);
        }

        for item in &mut self.constraints {
            let (a, b) = item.constraint.bodies();
            for id in [Some(a), b].into_iter().flatten() {
                if let Some(mut body) = self.bodies.get_mut(id) {
                    body.wake();
                }
            }
            item.constraint.pre_process(&mut self.bodies, ctx);
        }

        for i in 0..config.velocity_iterations {
            self.for_each_alternating(i, |c, bodies| {
                c.process_velocity(bodies, ctx);
                true
            });
        }

        for body in self.bodies.movable_mut() {
            body.integrate_velocity(ctx.dt, config);
        }

        for i in 0..config.position_iterations {
            if self.for_each_alternating(i, |c, bodies| c.process_position(bodies, ctx)) {
                break;
            }
        }
    }

    // Joints first, then contacts, each from the bottom of the stack up.
    fn sort(&mut self, gravity: &Vector3<f64>) {
        let up = if gravity.norm_squared() < EPSILON {
            Vector3::z()
        } else {
            -gravity.normalize()
        };
        for item in &mut self.constraints {
            let (a, b) = item.constraint.bodies();
            item.height = [Some(a), b]
                .into_iter()
                .flatten()
                .filter_map(|id| self.bodies.get(id))
                .map(|body| body.position().coords.dot(&up))
                .reduce(f64::min)
                .unwrap_or(0.0);
        }
        self.constraints
            .sort_by(|x, y| x.is_contact.cmp(&y.is_contact).then(x.height.total_cmp(&y.height)));
    }

    // Visits forward on even passes and backward on odd ones. Returns
    // whether `f` returned true for every constraint.
    fn for_each_alternating<F>(&mut self, pass: usize, mut f: F) -> bool
    where
        F: FnMut(&mut dyn Constraint, &mut BodySet<'_>) -> bool,
    {
        let bodies = &mut self.bodies;
        let mut all = true;
        if pass % 2 == 0 {
            for item in &mut self.constraints {
                all &= f(&mut *item.constraint, bodies);
            }
        } else {
            for item in self.constraints.iter_mut().rev() {
                all &= f(&mut *item.constraint, bodies);
            }
        }
        all
    }
}

//! The physics manager: owner of every body, constraint and generator, and
//! driver of the simulation step.
//!
//! # Step
//!
//! [`PhysicsManager::integrate`] advances the world by one step:
//!
//! 1. Run the force generators, gravity first.
//! 2. Integrate forces into velocities and move every skin to where its body
//!    is predicted to be.
//! 3. Find candidate pairs in the broad phase and generate contacts for them,
//!    one narrow-phase task per worker.
//! 4. Attach contacts to their bodies, wake sleeping bodies touched by active
//!    ones and fire collision and separation callbacks.
//! 5. Partition the bodies into islands and solve each island as one task.
//! 6. Store the contacts for warm starting the next step.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use tracing::{debug, trace};

use rigid_collision::{BroadPhase, RayHit, SweepAndPrune};
use rigid_types::{
    BodyId, ConstraintId, GeneratorId, PhysicsConfig, PhysicsError, PoolConfig, Result, Segment, Task,
    TaskManager,
};

use crate::body::{contact_state, RigidBody};
use crate::body_map::BodyMap;
use crate::collide::{ContactHandle, ContactWorker};
use crate::constraint::{Constraint, ContactConstraint, SolverContext};
use crate::contact_cache::ContactCache;
use crate::contraption::{Contraption, ContraptionIds};
use crate::forces::{ForceGenerator, GravityForce};
use crate::island::Islands;

/// A managed constraint with the island it was assigned to this step.
pub(crate) struct ConstraintEntry {
    pub(crate) id: ConstraintId,
    pub(crate) constraint: Box<dyn Constraint>,
    pub(crate) island: Option<usize>,
}

/// Owns the simulated world and advances it.
///
/// # Example
///
/// ```
/// use rigid_collision::{BodySkin, Part};
/// use rigid_dynamics::{PhysicsManager, RigidBody};
/// use rigid_types::{MassProperties, Material, PhysicsConfig};
/// use nalgebra::{Point3, Vector3};
///
/// let config = PhysicsConfig::default().with_gravity(Vector3::new(0.0, 0.0, -9.81));
/// let mut manager = PhysicsManager::new(config)?;
///
/// let skin = BodySkin::new(Part::sphere(Point3::origin(), 0.5), Material::default());
/// let ball = RigidBody::new(skin, MassProperties::from_sphere(1.0, Point3::origin(), 0.5))
///     .at(Point3::new(0.0, 0.0, 10.0));
/// let id = manager.add_body(ball)?;
///
/// manager.integrate(1.0 / 60.0)?;
/// assert!(manager.body(id).map_or(false, |b| b.linear_velocity().z < 0.0));
/// # Ok::<(), rigid_types::PhysicsError>(())
/// ```
pub struct PhysicsManager {
    config: PhysicsConfig,
    bodies: BodyMap,
    constraints: Vec<ConstraintEntry>,
    constraint_index: HashMap<ConstraintId, usize>,
    next_constraint: u64,
    generators: Vec<(GeneratorId, Box<dyn ForceGenerator>)>,
    next_generator: u64,
    gravity: GravityForce,
    broad_phase: Box<dyn BroadPhase>,
    tasks: TaskManager,
    // Created with the first body; pool sizes are fixed from then on.
    workers: Vec<ContactWorker>,
    islands: Islands,
    cache: ContactCache,
    pairs: Vec<(BodyId, BodyId)>,
    time_step: f64,
}

impl fmt::Debug for PhysicsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsManager")
            .field("bodies", &self.bodies.len())
            .field("constraints", &self.constraints.len())
            .field("generators", &self.generators.len())
            .field("contacts", &self.contact_count())
            .field("islands", &self.islands.len())
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl PhysicsManager {
    /// Create an empty world with a sweep-and-prune broad phase.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the configuration does not validate or the
    /// worker pool cannot be started.
    pub fn new(config: PhysicsConfig) -> Result<Self> {
        config.validate()?;
        let tasks = TaskManager::new(config.pools.thread_count)?;
        Ok(Self {
            gravity: GravityForce::new(config.gravity),
            islands: Islands::new(config.pools.island_pool_capacity),
            cache: ContactCache::new(config.pools.contact_pool_capacity),
            config,
            bodies: BodyMap::new(),
            constraints: Vec::new(),
            constraint_index: HashMap::new(),
            next_constraint: 1,
            generators: Vec::new(),
            next_generator: 1,
            broad_phase: Box::new(SweepAndPrune::default()),
            tasks,
            workers: Vec::new(),
            pairs: Vec::new(),
            time_step: 0.0,
        })
    }

    /// Replace the broad phase. Managed bodies are registered with the new
    /// one.
    pub fn set_broad_phase(&mut self, mut broad_phase: Box<dyn BroadPhase>) {
        for body in self.bodies.iter_mut() {
            let proxy = broad_phase.add(body.id(), body.skin().composition().bounding_box());
            body.skin_mut().composition_mut().set_proxy(Some(proxy));
        }
        self.broad_phase = broad_phase;
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Mutable configuration. Takes effect on the next step. Pool sizes are
    /// changed through [`set_pool_config`](Self::set_pool_config) instead.
    pub fn config_mut(&mut self) -> &mut PhysicsConfig {
        &mut self.config
    }

    /// Resize the contact, island and worker pools.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` once the pools exist, which happens when the first
    /// body is added. `InvalidConfig` for invalid sizes.
    pub fn set_pool_config(&mut self, pools: PoolConfig) -> Result<()> {
        if !self.workers.is_empty() {
            return Err(PhysicsError::invalid_operation(
                "pool sizes can only be changed before the first body is added",
            ));
        }
        pools.validate()?;
        if pools.thread_count != self.tasks.thread_count() {
            let enabled = self.tasks.is_threading_enabled();
            self.tasks = TaskManager::new(pools.thread_count)?;
            self.tasks.set_threading_enabled(enabled);
        }
        self.islands = Islands::new(pools.island_pool_capacity);
        self.cache = ContactCache::new(pools.contact_pool_capacity);
        self.config.pools = pools;
        Ok(())
    }

    /// Run task batches on the calling thread when `false`.
    pub fn set_threading_enabled(&mut self, enabled: bool) {
        self.tasks.set_threading_enabled(enabled);
    }

    /// Length of the last step, after clamping to `max_time_step`.
    #[must_use]
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    fn ensure_pools(&mut self) {
        if self.workers.is_empty() {
            let pools = &self.config.pools;
            self.workers = (0..self.tasks.thread_count())
                .map(|_| ContactWorker::new(pools.contact_pool_capacity, pools.max_points_per_contact))
                .collect();
            debug!(workers = self.workers.len(), "contact pools created");
        }
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    /// Take ownership of a body.
    ///
    /// # Errors
    ///
    /// `AlreadyManaged` when a body with the same id is managed.
    pub fn add_body(&mut self, mut body: RigidBody) -> Result<BodyId> {
        let id = body.id();
        if self.bodies.contains(id) {
            return Err(PhysicsError::already_managed(id.to_string()));
        }
        self.ensure_pools();

        body.contacts.clear();
        body.contact_states.clear();
        let index = &self.constraint_index;
        body.constraints.retain(|c| index.contains_key(c));
        let proxy = self.broad_phase.add(id, body.skin().composition().bounding_box());
        body.skin_mut().composition_mut().set_proxy(Some(proxy));

        self.bodies
            .insert(body)
            .map_err(|body| PhysicsError::already_managed(body.id().to_string()))?;
        Ok(id)
    }

    /// Give a body back. Its constraints stay managed and do nothing until
    /// the body is added again.
    ///
    /// # Errors
    ///
    /// `NotManaged` when no body has this id.
    pub fn remove_body(&mut self, id: BodyId) -> Result<RigidBody> {
        let mut body = self
            .bodies
            .remove(id)
            .ok_or_else(|| PhysicsError::not_managed(id.to_string()))?;

        if let Some(proxy) = body.skin().composition().proxy() {
            if let Some(moved) = self.broad_phase.remove(proxy).and_then(|m| self.bodies.get_mut(m)) {
                moved.skin_mut().composition_mut().set_proxy(Some(proxy));
            }
            body.skin_mut().composition_mut().set_proxy(None);
        }
        body.contacts.clear();
        for other in body.contact_states.drain().map(|(other, _)| other) {
            if let Some(other) = self.bodies.get_mut(other) {
                other.contact_states.remove(&id);
            }
        }
        Ok(body)
    }

    /// The body with `id`.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id)
    }

    /// The body with `id`, mutably.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id)
    }

    /// Every managed body.
    #[must_use]
    pub fn bodies(&self) -> &BodyMap {
        &self.bodies
    }

    // =========================================================================
    // Constraints and generators
    // =========================================================================

    /// Take ownership of a constraint.
    ///
    /// # Errors
    ///
    /// `InvalidBodyId` when a body the constraint acts on is not managed.
    pub fn add_constraint<C: Constraint + 'static>(&mut self, constraint: C) -> Result<ConstraintId> {
        self.add_boxed_constraint(Box::new(constraint))
    }

    /// [`add_constraint`](Self::add_constraint) for an already boxed
    /// constraint.
    pub fn add_boxed_constraint(&mut self, constraint: Box<dyn Constraint>) -> Result<ConstraintId> {
        let (a, b) = constraint.bodies();
        for body in [Some(a), b].into_iter().flatten() {
            if !self.bodies.contains(body) {
                return Err(PhysicsError::InvalidBodyId(body));
            }
        }

        let id = ConstraintId::new(self.next_constraint);
        self.next_constraint += 1;
        for body in [Some(a), b.filter(|&b| b != a)].into_iter().flatten() {
            if let Some(body) = self.bodies.get_mut(body) {
                body.constraints.push(id);
            }
        }
        self.constraint_index.insert(id, self.constraints.len());
        self.constraints.push(ConstraintEntry {
            id,
            constraint,
            island: None,
        });
        Ok(id)
    }

    /// Give a constraint back.
    ///
    /// # Errors
    ///
    /// `InvalidConstraintId` when no constraint has this id.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<Box<dyn Constraint>> {
        let index = self
            .constraint_index
            .remove(&id)
            .ok_or(PhysicsError::InvalidConstraintId(id.raw()))?;
        let entry = self.constraints.swap_remove(index);
        if let Some(moved) = self.constraints.get(index) {
            self.constraint_index.insert(moved.id, index);
        }

        let (a, b) = entry.constraint.bodies();
        for body in [Some(a), b].into_iter().flatten() {
            if let Some(body) = self.bodies.get_mut(body) {
                body.constraints.retain(|c| *c != id);
            }
        }
        Ok(entry.constraint)
    }

    /// The constraint with `id`.
    #[must_use]
    pub fn constraint(&self, id: ConstraintId) -> Option<&dyn Constraint> {
        let index = *self.constraint_index.get(&id)?;
        Some(self.constraints[index].constraint.as_ref())
    }

    /// The constraint with `id`, mutably.
    pub fn constraint_mut(&mut self, id: ConstraintId) -> Option<&mut (dyn Constraint + 'static)> {
        let index = *self.constraint_index.get(&id)?;
        Some(self.constraints[index].constraint.as_mut())
    }

    /// Number of managed constraints, contacts excluded.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Take ownership of a force generator. Generators run in the order they
    /// were added, after gravity.
    pub fn add_generator<G: ForceGenerator + 'static>(&mut self, generator: G) -> GeneratorId {
        self.add_boxed_generator(Box::new(generator))
    }

    /// [`add_generator`](Self::add_generator) for an already boxed generator.
    pub fn add_boxed_generator(&mut self, generator: Box<dyn ForceGenerator>) -> GeneratorId {
        let id = GeneratorId(self.next_generator);
        self.next_generator += 1;
        self.generators.push((id, generator));
        id
    }

    /// Give a generator back.
    ///
    /// # Errors
    ///
    /// `NotManaged` when no generator has this id.
    pub fn remove_generator(&mut self, id: GeneratorId) -> Result<Box<dyn ForceGenerator>> {
        let index = self
            .generators
            .iter()
            .position(|(g, _)| *g == id)
            .ok_or_else(|| PhysicsError::not_managed(id.to_string()))?;
        Ok(self.generators.remove(index).1)
    }

    /// Number of managed generators, gravity excluded.
    #[must_use]
    pub fn generator_count(&self) -> usize {
        self.generators.len()
    }

    // =========================================================================
    // Contraptions
    // =========================================================================

    /// Add every member of a contraption. Nothing is added if any member
    /// would be rejected.
    ///
    /// # Errors
    ///
    /// `AlreadyManaged` when a body is already managed or listed twice,
    /// `InvalidBodyId` when a constraint acts on a body that is neither
    /// managed nor part of the contraption.
    pub fn add_contraption(&mut self, contraption: Contraption) -> Result<ContraptionIds> {
        let mut incoming: Vec<BodyId> = Vec::with_capacity(contraption.bodies.len());
        for body in &contraption.bodies {
            if self.bodies.contains(body.id()) || incoming.contains(&body.id()) {
                return Err(PhysicsError::already_managed(body.id().to_string()));
            }
            incoming.push(body.id());
        }
        for constraint in &contraption.constraints {
            let (a, b) = constraint.bodies();
            for body in [Some(a), b].into_iter().flatten() {
                if !self.bodies.contains(body) && !incoming.contains(&body) {
                    return Err(PhysicsError::InvalidBodyId(body));
                }
            }
        }

        let mut ids = ContraptionIds::default();
        for body in contraption.bodies {
            ids.bodies.push(self.add_body(body)?);
        }
        for constraint in contraption.constraints {
            ids.constraints.push(self.add_boxed_constraint(constraint)?);
        }
        for generator in contraption.generators {
            ids.generators.push(self.add_boxed_generator(generator));
        }
        Ok(ids)
    }

    /// Remove every member of a contraption and return them. Nothing is
    /// removed if any id is unknown.
    ///
    /// # Errors
    ///
    /// `NotManaged` or `InvalidConstraintId` for the first unknown id.
    pub fn remove_contraption(&mut self, ids: &ContraptionIds) -> Result<Contraption> {
        if let Some(id) = ids.bodies.iter().find(|&&id| !self.bodies.contains(id)) {
            return Err(PhysicsError::not_managed(id.to_string()));
        }
        if let Some(id) = ids.constraints.iter().find(|id| !self.constraint_index.contains_key(*id)) {
            return Err(PhysicsError::InvalidConstraintId(id.raw()));
        }
        if let Some(id) = ids.generators.iter().find(|&&id| self.generators.iter().all(|(g, _)| *g != id)) {
            return Err(PhysicsError::not_managed(id.to_string()));
        }

        let mut contraption = Contraption::new();
        for &id in &ids.constraints {
            contraption.constraints.push(self.remove_constraint(id)?);
        }
        for &id in &ids.generators {
            contraption.generators.push(self.remove_generator(id)?);
        }
        for &id in &ids.bodies {
            contraption.bodies.push(self.remove_body(id)?);
        }
        Ok(contraption)
    }

    /// Drop every body, constraint, generator and contact. Gravity stays.
    pub fn clear(&mut self) {
        self.islands.recycle(&mut self.constraints);
        self.bodies.clear();
        self.constraints.clear();
        self.constraint_index.clear();
        self.generators.clear();
        self.broad_phase.clear();
        for worker in &mut self.workers {
            worker.reset();
        }
        self.cache.clear();
        self.pairs.clear();
    }

    // =========================================================================
    // Step
    // =========================================================================

    /// Advance the world by `dt` seconds, clamped to `max_time_step`. A zero
    /// step does nothing.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for a negative or non-finite `dt`. Task failures
    /// from the broad phase, the narrow phase or the island solvers are
    /// returned as `TaskFailures`; the step is then incomplete.
    pub fn integrate(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::invalid_operation(format!(
                "time step must be finite and non-negative, got {dt}"
            )));
        }
        if dt == 0.0 {
            return Ok(());
        }
        let dt = dt.min(self.config.max_time_step);
        self.time_step = dt;
        self.ensure_pools();
        self.islands.recycle(&mut self.constraints);

        // 1. Forces
        self.gravity.set_gravity(self.config.gravity);
        self.gravity.generate(&mut self.bodies);
        for (_, generator) in &mut self.generators {
            generator.generate(&mut self.bodies);
        }

        // 2. Predicted positions
        for body in self.bodies.iter_mut() {
            body.contacts.clear();
            body.integrate_force(dt, &self.config);
            if let Some(proxy) = body.skin().composition().proxy() {
                self.broad_phase.update(proxy, body.skin().composition().bounding_box());
            }
        }

        // 3. Collision detection
        for worker in &mut self.workers {
            worker.clear(&self.bodies);
        }
        self.pairs.clear();
        self.broad_phase.execute(&self.tasks, &mut self.pairs)?;
        let (bodies, constraints, index) = (&self.bodies, &self.constraints, &self.constraint_index);
        self.pairs
            .retain(|&(a, b)| should_collide(bodies, constraints, index, a, b));
        self.generate_contacts(dt)?;

        // 4. Contact bookkeeping
        self.propagate_contacts();
        self.update_contact_states();

        // 5. Islands
        self.islands.build(
            &self.bodies,
            &mut self.constraints,
            &self.constraint_index,
            &mut self.workers,
        );
        self.solve_islands(dt)?;

        // 6. Warm start data
        self.cache.clear();
        if self.config.is_contact_warm_start_enabled {
            for worker in &self.workers {
                for contact in worker.items().iter().filter_map(|&slot| worker.get(slot)) {
                    self.cache.add(contact);
                }
            }
        }
        for body in self.bodies.iter_mut() {
            body.clear_forces();
        }

        trace!(
            bodies = self.bodies.len(),
            contacts = self.contact_count(),
            islands = self.islands.len(),
            dt,
            "step complete"
        );
        Ok(())
    }

    fn generate_contacts(&mut self, dt: f64) -> Result<()> {
        if self.pairs.is_empty() || self.workers.is_empty() {
            return Ok(());
        }
        let chunk = self.pairs.len().div_ceil(self.workers.len());
        let bodies = &self.bodies;
        let tasks: Vec<Task<'_>> = self
            .workers
            .iter_mut()
            .zip(self.pairs.chunks(chunk))
            .map(|(worker, pairs)| {
                Box::new(move || {
                    worker.collide(pairs, bodies, dt);
                    Ok(())
                }) as Task<'_>
            })
            .collect();
        self.tasks.execute(tasks)
    }

    // Links every contact to both bodies, then wakes whatever an active body
    // touches, through constraints and contacts, transitively.
    fn propagate_contacts(&mut self) {
        let mut wake = Vec::new();
        for (w, worker) in self.workers.iter().enumerate() {
            for &slot in worker.items() {
                let Some(contact) = worker.get(slot) else {
                    continue;
                };
                let handle = ContactHandle { worker: w, slot };
                let Some((a, b)) = self.bodies.pair_mut(contact.body_a(), contact.body_b()) else {
                    continue;
                };
                a.contacts.push(handle);
                b.contacts.push(handle);
                if a.is_active() && !b.is_active() && b.is_movable() {
                    wake.push(b.id());
                }
                if b.is_active() && !a.is_active() && a.is_movable() {
                    wake.push(a.id());
                }
            }
        }

        let mut stack = Vec::new();
        for id in wake {
            stack.push(id);
            while let Some(id) = stack.pop() {
                let Some(body) = self.bodies.get_mut(id) else {
                    continue;
                };
                if body.is_active() || !body.is_movable() {
                    continue;
                }
                body.set_active(true);
                for c in &body.constraints {
                    if let Some(entry) = self.constraint_index.get(c).map(|&i| &self.constraints[i]) {
                        let (a, b) = entry.constraint.bodies();
                        stack.push(a);
                        stack.extend(b);
                    }
                }
                for h in &body.contacts {
                    if let Some(contact) = self.workers.get(h.worker).and_then(|w| w.get(h.slot)) {
                        stack.push(contact.body_a());
                        stack.push(contact.body_b());
                    }
                }
            }
        }
    }

    // Fires collision callbacks for pairs that started touching this step and
    // separation callbacks for pairs that stopped. Pairs with no active member
    // are not collided, so their states are carried over untouched.
    fn update_contact_states(&mut self) {
        use contact_state::{IN_CONTACT, SUPPRESSED, WAS_IN_CONTACT};

        let active: HashSet<BodyId> = self.bodies.iter().filter(|b| b.is_active()).map(RigidBody::id).collect();
        for body in self.bodies.iter_mut() {
            let awake = body.is_active();
            for (other, state) in &mut body.contact_states {
                if *state & IN_CONTACT != 0 && (awake || active.contains(other)) {
                    *state = (*state & SUPPRESSED) | WAS_IN_CONTACT;
                }
            }
        }

        for worker in &mut self.workers {
            for k in 0..worker.items().len() {
                let slot = worker.items()[k];
                let Some(contact) = worker.get_mut(slot) else {
                    continue;
                };
                let (ida, idb) = (contact.body_a(), contact.body_b());
                let Some((a, b)) = self.bodies.pair_mut(ida, idb) else {
                    continue;
                };

                let state = a.contact_states.get(&idb).copied().unwrap_or(0);
                let suppressed = if state & (IN_CONTACT | WAS_IN_CONTACT) != 0 {
                    state & SUPPRESSED != 0
                } else {
                    let by_a = a.fire_collision(idb);
                    let by_b = b.fire_collision(ida);
                    by_a || by_b
                };
                let state = IN_CONTACT | if suppressed { SUPPRESSED } else { 0 };
                a.contact_states.insert(idb, state);
                b.contact_states.insert(ida, state);
                contact.set_suppressed(suppressed);
            }
        }

        let mut separated = Vec::new();
        for body in self.bodies.iter_mut() {
            let id = body.id();
            body.contact_states.retain(|&other, state| {
                let touching = *state & IN_CONTACT != 0;
                if !touching {
                    separated.push((id, other));
                }
                touching
            });
        }
        for (id, other) in separated {
            if let Some(body) = self.bodies.get_mut(id) {
                body.fire_separation(other);
            }
        }
    }

    fn solve_islands(&mut self, dt: f64) -> Result<()> {
        let ctx = SolverContext::new(dt, &self.config, &self.cache);
        let solvers = self
            .islands
            .solvers(&mut self.bodies, &mut self.constraints, &mut self.workers);
        let ctx = &ctx;
        let tasks: Vec<Task<'_>> = solvers
            .into_iter()
            .map(|solver| {
                Box::new(move || {
                    solver.solve(ctx);
                    Ok(())
                }) as Task<'_>
            })
            .collect();
        self.tasks.execute(tasks)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Nearest body hit by `segment`.
    #[must_use]
    pub fn intersect(&self, segment: &Segment) -> Option<RayHit> {
        let bodies = &self.bodies;
        self.broad_phase.intersect(segment, &mut |owner| {
            bodies.get(owner)?.skin().composition().intersect(segment)
        })
    }

    /// Number of contacts found by the last step.
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.workers.iter().map(|w| w.items().len()).sum()
    }

    /// Number of islands built by the last step.
    #[must_use]
    pub fn island_count(&self) -> usize {
        self.islands.len()
    }

    /// Contacts of `id` found by the last step.
    pub fn contacts_of(&self, id: BodyId) -> impl Iterator<Item = &ContactConstraint> + '_ {
        self.bodies
            .get(id)
            .map(|body| body.contacts.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|h| self.workers.get(h.worker)?.get(h.slot))
    }

    /// Whether `a` and `b` were put in the same island by the last step.
    #[must_use]
    pub fn same_island(&self, a: BodyId, b: BodyId) -> bool {
        let island = |id| self.bodies.slot(id).and_then(|slot| self.islands.island_of(slot));
        matches!((island(a), island(b)), (Some(x), Some(y)) if x == y)
    }
}

// At least one body awake, and no collision-disabled constraint between them.
fn should_collide(
    bodies: &BodyMap,
    constraints: &[ConstraintEntry],
    index: &HashMap<ConstraintId, usize>,
    a: BodyId,
    b: BodyId,
) -> bool {
    let (Some(body_a), Some(body_b)) = (bodies.get(a), bodies.get(b)) else {
        return false;
    };
    if !body_a.is_active() && !body_b.is_active() {
        return false;
    }
    !body_b.constraints().iter().any(|c| {
        index.get(c).is_some_and(|&i| {
            let constraint = &constraints[i].constraint;
            let (ca, cb) = constraint.bodies();
            !constraint.is_collision_enabled() && (ca == a || cb == Some(a))
        })
    })
}

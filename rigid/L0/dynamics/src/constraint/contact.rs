//! Non-penetration and friction between two touching bodies.

use nalgebra::{Point3, Vector3};
use tracing::warn;

use rigid_types::{BodyId, MassProperties, EPSILON};

use super::{Constraint, SolverContext};
use crate::body::RigidBody;
use crate::body_set::{BodyMut, BodySet};
use crate::pool::Recycle;

/// One point of a [`ContactConstraint`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactPoint {
    offset_a: Vector3<f64>,
    offset_b: Vector3<f64>,
    depth: f64,
    normal_mass: f64,
    target: f64,
    impulse: f64,
    position_impulse: f64,
    tangent: Vector3<f64>,
    tangent_mass: f64,
    tangent_impulse: f64,
}

impl ContactPoint {
    /// World offset of the point on the first body from its origin.
    #[must_use]
    pub fn offset_a(&self) -> Vector3<f64> {
        self.offset_a
    }

    /// World offset of the point on the second body from its origin.
    #[must_use]
    pub fn offset_b(&self) -> Vector3<f64> {
        self.offset_b
    }

    /// Penetration depth when the contact was generated.
    #[must_use]
    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Accumulated normal impulse of the current step.
    #[must_use]
    pub fn impulse(&self) -> f64 {
        self.impulse
    }

    /// Accumulated friction impulse of the current step.
    #[must_use]
    pub fn tangent_impulse(&self) -> f64 {
        self.tangent_impulse
    }
}

/// Contact between one part of each of two bodies.
///
/// Contacts are pooled by the manager and rebuilt every step from the
/// narrow-phase output. The normal points from the second body toward the
/// first.
#[derive(Debug, Clone, Default)]
pub struct ContactConstraint {
    body_a: Option<BodyId>,
    body_b: Option<BodyId>,
    restitution: f64,
    friction: f64,
    max_points: usize,
    normal: Vector3<f64>,
    points: Vec<ContactPoint>,
    averaged: Option<ContactPoint>,
    is_suppressed: bool,
    cap_reported: bool,
    pub(crate) island: Option<usize>,
}

impl Recycle for ContactConstraint {
    fn recycle(&mut self) {
        self.body_a = None;
        self.body_b = None;
        self.restitution = 0.0;
        self.friction = 0.0;
        self.normal = Vector3::zeros();
        self.points.clear();
        self.averaged = None;
        self.is_suppressed = false;
        self.cap_reported = false;
        self.island = None;
    }
}

impl ContactConstraint {
    /// Start a contact between two bodies.
    pub(crate) fn set_parameters(
        &mut self,
        a: BodyId,
        b: BodyId,
        restitution: f64,
        friction: f64,
        max_points: usize,
    ) {
        self.body_a = Some(a);
        self.body_b = Some(b);
        self.restitution = restitution;
        self.friction = friction;
        self.max_points = max_points.max(1);
        self.points.reserve(self.max_points);
    }

    /// First body.
    #[must_use]
    pub fn body_a(&self) -> BodyId {
        self.body_a.unwrap_or_default()
    }

    /// Second body.
    #[must_use]
    pub fn body_b(&self) -> BodyId {
        self.body_b.unwrap_or_default()
    }

    /// The body on the other side from `id`.
    #[must_use]
    pub fn other(&self, id: BodyId) -> BodyId {
        if self.body_a == Some(id) {
            self.body_b()
        } else {
            self.body_a()
        }
    }

    /// Contact normal, from the second body toward the first.
    #[must_use]
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Combined restitution of the two materials.
    #[must_use]
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Combined friction of the two materials.
    #[must_use]
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// The contact points.
    #[must_use]
    pub fn points(&self) -> &[ContactPoint] {
        &self.points
    }

    /// Whether a collision callback vetoed the response.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.is_suppressed
    }

    pub(crate) fn set_suppressed(&mut self, suppressed: bool) {
        self.is_suppressed = suppressed;
    }

    /// Record a narrow-phase point in world space. Points closer than
    /// epsilon to an existing one are dropped. Once the point cap is reached
    /// a new point replaces one of the two closest existing points if that
    /// spreads the set out.
    pub(crate) fn write_world_point(&mut self, pa: &Point3<f64>, pb: &Point3<f64>, n: &Vector3<f64>) {
        self.normal += n;

        let mut nearest = f64::INFINITY;
        for p in &self.points {
            if (p.offset_a - pa.coords).norm_squared() < EPSILON
                || (p.offset_b - pb.coords).norm_squared() < EPSILON
            {
                return;
            }
            nearest = nearest.min((p.offset_a - pa.coords).norm_squared());
        }

        let point = ContactPoint {
            offset_a: pa.coords,
            offset_b: pb.coords,
            ..ContactPoint::default()
        };
        if self.points.len() < self.max_points {
            self.points.push(point);
            return;
        }

        if !self.cap_reported {
            self.cap_reported = true;
            warn!(
                body_a = %self.body_a(),
                body_b = %self.body_b(),
                max_points = self.max_points,
                "contact point cap reached"
            );
        }
        let Some((i, j, closest)) = self.closest_pair() else {
            return;
        };
        if nearest > closest {
            let di = (self.points[i].offset_a - pa.coords).norm_squared();
            let dj = (self.points[j].offset_a - pa.coords).norm_squared();
            self.points[if di <= dj { i } else { j }] = point;
        }
    }

    fn closest_pair(&self) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..self.points.len() {
            for j in i + 1..self.points.len() {
                let d = (self.points[i].offset_a - self.points[j].offset_a).norm_squared();
                if best.map_or(true, |(_, _, b)| d < b) {
                    best = Some((i, j, d));
                }
            }
        }
        best
    }

    /// Turn the recorded world points into offsets from each body's current
    /// origin, undoing the skins' predicted transforms, and measure depths.
    pub(crate) fn finalize(&mut self, a: &RigidBody, b: &RigidBody) {
        let len2 = self.normal.norm_squared();
        if (len2 - 1.0).abs() >= EPSILON && len2 > 0.0 {
            self.normal /= len2.sqrt();
        }
        let n = self.normal;
        for p in &mut self.points {
            let pa = a.skin().undo_transform(&Point3::from(p.offset_a), a.world());
            let pb = b.skin().undo_transform(&Point3::from(p.offset_b), b.world());
            p.depth = n.dot(&pb.coords) - n.dot(&pa.coords);
            p.offset_a = pa - a.position();
            p.offset_b = pb - b.position();
        }
    }

    fn has_averaged_point(&self) -> bool {
        self.points.len() > 2 && self.points.len() < self.max_points
    }

    fn prepare_point(&self, p: &mut ContactPoint, a: &RigidBody, b: &RigidBody, force_mag: f64, ctx: &SolverContext<'_>) {
        let config = ctx.config;
        let n = self.normal;
        let relative = a.velocity_at_point(&p.offset_a) - b.velocity_at_point(&p.offset_b);
        let normal_delta = n.dot(&relative);

        let tangent = relative - n * normal_delta;
        p.tangent = if tangent.norm_squared() >= EPSILON {
            -tangent.normalize()
        } else {
            Vector3::zeros()
        };

        p.normal_mass = MassProperties::effective_mass(a.mass_world(), b.mass_world(), &p.offset_a, &p.offset_b, &n);
        p.tangent_mass = if p.tangent == Vector3::zeros() {
            0.0
        } else {
            MassProperties::effective_mass(a.mass_world(), b.mass_world(), &p.offset_a, &p.offset_b, &p.tangent)
        };

        let tolerance = config.linear_error_tolerance;
        let restitution = (self.restitution * -(normal_delta - force_mag)).max(0.0);
        let penetration = p.depth - tolerance;
        p.target = if restitution < config.minimum_restitution {
            if penetration > 0.0 {
                penetration * config.penetration_bias
            } else {
                let scale = (-0.1 * penetration / tolerance).clamp(EPSILON, 1.0);
                scale * penetration * ctx.dt_inv
            }
        } else {
            (penetration * config.penetration_bias).max(0.0).max(restitution)
        };

        p.impulse = 0.0;
        p.tangent_impulse = 0.0;
        p.position_impulse = 0.0;
    }
}

fn apply_pair(a: &mut BodyMut<'_>, b: &mut BodyMut<'_>, impulse: &Vector3<f64>, p: &ContactPoint) {
    a.apply_impulse(impulse, &p.offset_a);
    b.apply_impulse(&-impulse, &p.offset_b);
}

impl Constraint for ContactConstraint {
    fn bodies(&self) -> (BodyId, Option<BodyId>) {
        (self.body_a(), self.body_b)
    }

    fn pre_process(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) {
        if self.is_suppressed {
            return;
        }
        let (ida, idb) = (self.body_a(), self.body_b());
        let Some((mut a, mut b)) = bodies.pair_mut(ida, idb) else {
            return;
        };

        let cached = ctx
            .cache
            .get(ida, idb)
            .filter(|c| ctx.config.is_contact_warm_start_enabled && c.len() == self.points.len());

        // Velocity the step's forces will add along the normal.
        let mut forced = Vector3::zeros();
        if a.is_movable() {
            forced += a.force() * (ctx.dt * a.mass().mass_inverse());
        }
        if b.is_movable() {
            forced -= b.force() * (ctx.dt * b.mass().mass_inverse());
        }
        let force_mag = self.normal.dot(&forced).min(0.0);

        let mut points = std::mem::take(&mut self.points);
        for p in &mut points {
            self.prepare_point(p, &a, &b, force_mag, ctx);

            if let Some(cached) = cached {
                let mut best = None;
                let mut best_distance = f64::MAX;
                for c in cached.points_for(ida) {
                    let d = (c.offset_a - p.offset_a).norm_squared() + (c.offset_b - p.offset_b).norm_squared();
                    if d < best_distance {
                        best_distance = d;
                        best = Some(c);
                    }
                }
                if let Some(best) = best {
                    p.impulse = best.normal_impulse;
                    let limit = self.friction * p.impulse;
                    p.tangent_impulse = best.tangent_impulse.clamp(-limit, limit);
                    if p.impulse.abs() >= EPSILON {
                        let impulse = self.normal * p.impulse + p.tangent * p.tangent_impulse;
                        apply_pair(&mut a, &mut b, &impulse, p);
                    }
                }
            }
        }
        self.points = points;

        // Extra point at the centre of the patch, used only for position
        // correction.
        self.averaged = None;
        if self.has_averaged_point() {
            let count = self.points.len() as f64;
            let mut ap = ContactPoint {
                depth: f64::MAX,
                ..ContactPoint::default()
            };
            for p in &self.points {
                ap.offset_a += p.offset_a;
                ap.offset_b += p.offset_b;
                ap.depth = ap.depth.min(p.depth);
            }
            ap.offset_a /= count;
            ap.offset_b /= count;
            ap.normal_mass = MassProperties::effective_mass(
                a.mass_world(),
                b.mass_world(),
                &ap.offset_a,
                &ap.offset_b,
                &self.normal,
            );
            self.averaged = Some(ap);
        }
    }

    fn process_velocity(&mut self, bodies: &mut BodySet<'_>, _ctx: &SolverContext<'_>) {
        if self.is_suppressed {
            return;
        }
        let Some((mut a, mut b)) = bodies.pair_mut(self.body_a(), self.body_b()) else {
            return;
        };
        let n = self.normal;

        for p in &mut self.points {
            let relative = a.velocity_at_point(&p.offset_a) - b.velocity_at_point(&p.offset_b);
            let delta = (p.target - n.dot(&relative)) * p.normal_mass;
            if delta.abs() >= EPSILON {
                let old = p.impulse;
                p.impulse = (p.impulse + delta).max(0.0);
                let impulse = n * (p.impulse - old);
                apply_pair(&mut a, &mut b, &impulse, p);
            }

            if p.tangent_mass >= EPSILON {
                let relative = a.velocity_at_point(&p.offset_a) - b.velocity_at_point(&p.offset_b);
                let limit = self.friction * p.impulse;
                let old = p.tangent_impulse;
                p.tangent_impulse = (old - p.tangent.dot(&relative) * p.tangent_mass).clamp(-limit, limit);
                let impulse = p.tangent * (p.tangent_impulse - old);
                apply_pair(&mut a, &mut b, &impulse, p);
            }
        }
    }

    fn process_position(&mut self, bodies: &mut BodySet<'_>, ctx: &SolverContext<'_>) -> bool {
        if self.is_suppressed {
            return true;
        }
        let Some((mut a, mut b)) = bodies.pair_mut(self.body_a(), self.body_b()) else {
            return true;
        };
        let n = self.normal;
        let config = ctx.config;
        let tolerance = config.linear_error_tolerance;

        let mut satisfied = true;
        for p in self.averaged.iter_mut().chain(self.points.iter_mut().rev()) {
            let pa = a.position() + p.offset_a;
            let pb = b.position() + p.offset_b;
            let depth = n.dot(&(pb - pa));

            if depth.abs() > 2.0 * tolerance {
                satisfied = false;
            } else if depth <= tolerance {
                continue;
            }

            let delta = (depth - tolerance).max(0.0) * config.position_correction_factor * p.normal_mass;
            let old = p.position_impulse;
            p.position_impulse = (old + delta).max(0.0);
            let impulse = n * (p.position_impulse - old);
            a.apply_flash_impulse(&impulse, &p.offset_a);
            b.apply_flash_impulse(&-impulse, &p.offset_b);
        }
        satisfied
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::constraint::tests::{ball, ground};
    use crate::contact_cache::ContactCache;
    use approx::assert_relative_eq;
    use rigid_types::PhysicsConfig;

    fn resting_contact(ball: &RigidBody, floor: &RigidBody, depth: f64) -> ContactConstraint {
        let mut c = ContactConstraint::default();
        c.set_parameters(ball.id(), floor.id(), 0.0, 0.5, 4);
        let bottom = ball.position() - Vector3::new(0.0, 0.0, 0.5);
        c.write_world_point(&bottom, &(bottom + Vector3::new(0.0, 0.0, depth)), &Vector3::z());
        c.finalize(ball, floor);
        c
    }

    #[test]
    fn test_duplicate_points_are_dropped() {
        let mut c = ContactConstraint::default();
        c.set_parameters(BodyId::new(1), BodyId::new(2), 0.0, 0.5, 4);
        let p = Point3::new(1.0, 0.0, 0.0);
        c.write_world_point(&p, &p, &Vector3::z());
        c.write_world_point(&p, &p, &Vector3::z());
        assert_eq!(c.points().len(), 1);
    }

    #[test]
    fn test_full_contact_keeps_spread_points() {
        let mut c = ContactConstraint::default();
        c.set_parameters(BodyId::new(1), BodyId::new(2), 0.0, 0.5, 3);
        for x in [0.0, 0.1, 1.0] {
            let p = Point3::new(x, 0.0, 0.0);
            c.write_world_point(&p, &p, &Vector3::z());
        }
        // Far from everything: replaces one of the two clustered points.
        let far = Point3::new(-1.0, 0.0, 0.0);
        c.write_world_point(&far, &far, &Vector3::z());
        assert_eq!(c.points().len(), 3);
        let xs: Vec<f64> = c.points().iter().map(|p| p.offset_a().x).collect();
        assert!(xs.contains(&-1.0));
        assert!(xs.contains(&1.0));

        // Inside the cluster: dropped.
        let near = Point3::new(0.05, 0.0, 0.0);
        c.write_world_point(&near, &near, &Vector3::z());
        assert!(!c.points().iter().any(|p| (p.offset_a().x - 0.05).abs() < 1e-12));
    }

    #[test]
    fn test_finalize_measures_depth_and_offsets() {
        let a = ball(Point3::new(0.0, 0.0, 0.45));
        let floor = ground();
        let c = resting_contact(&a, &floor, 0.05);
        let p = c.points()[0];
        assert_relative_eq!(p.depth(), 0.05, epsilon = 1e-12);
        assert_relative_eq!(p.offset_a(), Vector3::new(0.0, 0.0, -0.5), epsilon = 1e-12);
        assert_relative_eq!(c.normal(), Vector3::z());
    }

    #[test]
    fn test_velocity_pass_stops_approach() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let mut a = ball(Point3::new(0.0, 0.0, 0.5));
        a.set_linear_velocity(Vector3::new(0.0, 0.0, -1.0));
        let floor = ground();
        let mut c = resting_contact(&a, &floor, 0.0);

        let mut set = BodySet::new();
        set.insert(&mut a);
        set.insert_fixed(&floor);
        c.pre_process(&mut set, &ctx);
        for _ in 0..config.velocity_iterations {
            c.process_velocity(&mut set, &ctx);
        }
        assert!(c.points()[0].impulse() > 0.0);
        drop(set);
        assert!(a.linear_velocity().z > -0.01);
    }

    #[test]
    fn test_friction_is_bounded_by_normal_impulse() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let mut a = ball(Point3::new(0.0, 0.0, 0.5));
        a.set_linear_velocity(Vector3::new(5.0, 0.0, -1.0));
        let floor = ground();
        let mut c = resting_contact(&a, &floor, 0.0);

        let mut set = BodySet::new();
        set.insert(&mut a);
        set.insert_fixed(&floor);
        c.pre_process(&mut set, &ctx);
        for _ in 0..config.velocity_iterations {
            c.process_velocity(&mut set, &ctx);
        }
        let p = c.points()[0];
        assert!(p.tangent_impulse().abs() <= c.friction() * p.impulse() + 1e-12);
        assert!(p.tangent_impulse() > 0.0);
    }

    #[test]
    fn test_position_pass_pushes_out() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let mut a = ball(Point3::new(0.0, 0.0, 0.4));
        let floor = ground();
        let mut c = resting_contact(&a, &floor, 0.1);

        let mut set = BodySet::new();
        set.insert(&mut a);
        set.insert_fixed(&floor);
        c.pre_process(&mut set, &ctx);
        assert!(!c.process_position(&mut set, &ctx));
        drop(set);
        assert!(a.position().z > 0.4);
    }

    #[test]
    fn test_suppressed_contact_does_nothing() {
        let config = PhysicsConfig::default();
        let cache = ContactCache::default();
        let ctx = SolverContext::new(1.0 / 60.0, &config, &cache);

        let mut a = ball(Point3::new(0.0, 0.0, 0.4));
        a.set_linear_velocity(Vector3::new(0.0, 0.0, -1.0));
        let floor = ground();
        let mut c = resting_contact(&a, &floor, 0.1);
        c.set_suppressed(true);

        let mut set = BodySet::new();
        set.insert(&mut a);
        set.insert_fixed(&floor);
        c.pre_process(&mut set, &ctx);
        c.process_velocity(&mut set, &ctx);
        assert!(c.process_position(&mut set, &ctx));
        drop(set);
        assert_relative_eq!(a.linear_velocity().z, -1.0);
        assert_relative_eq!(a.position().z, 0.4);
    }
}

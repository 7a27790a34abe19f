//! Scene helpers shared by the scenarios.

use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use rigid_collision::{BodySkin, CompiledPolyhedron, Part, PolyhedronPart};
use rigid_dynamics::{PhysicsManager, RigidBody};
use rigid_types::{MassProperties, Material, PhysicsConfig, PoolConfig};

/// Step length used by every scenario.
pub const DT: f64 = 1.0 / 60.0;

/// Standard gravity along -z.
pub fn gravity() -> Vector3<f64> {
    Vector3::new(0.0, 0.0, -9.81)
}

/// Single-threaded configuration with the given gravity.
pub fn config(gravity: Vector3<f64>) -> PhysicsConfig {
    PhysicsConfig::default()
        .with_gravity(gravity)
        .with_pools(PoolConfig::single_threaded())
}

/// Empty world.
pub fn world(config: PhysicsConfig) -> PhysicsManager {
    PhysicsManager::new(config).expect("valid config")
}

/// Unit-density ball.
pub fn ball(radius: f64, position: Point3<f64>) -> RigidBody {
    let skin = BodySkin::new(Part::sphere(Point3::origin(), radius), Material::default());
    RigidBody::new(skin, MassProperties::from_sphere(1.0, Point3::origin(), radius)).at(position)
}

/// Unit-density cube.
pub fn cube(side: f64, position: Point3<f64>) -> RigidBody {
    let compiled = CompiledPolyhedron::cuboid(Vector3::repeat(side)).expect("cuboid");
    let (mass, _) = compiled.mass_properties(1.0).expect("closed cuboid");
    let skin = BodySkin::new(
        Part::from(PolyhedronPart::new(Arc::new(compiled))),
        Material::new(0.0, 0.5),
    );
    RigidBody::new(skin, mass).at(position)
}

/// Immovable floor at z = 0.
pub fn floor() -> RigidBody {
    let skin = BodySkin::new(Part::plane(Point3::origin(), Vector3::z()), Material::new(0.0, 0.5));
    RigidBody::immovable(skin)
}

/// Run `steps` steps of `DT`.
pub fn run(world: &mut PhysicsManager, steps: usize) {
    for _ in 0..steps {
        world.integrate(DT).expect("step");
    }
}

//! Mass properties of primitive and polyhedral shapes.

use std::f64::consts::PI;

use approx::assert_relative_eq;
use nalgebra::{Matrix3, Point3, Vector3};
use rigid_collision::CompiledPolyhedron;
use rigid_types::MassProperties;

#[test]
fn solid_sphere_matches_closed_form() {
    for radius in [0.25, 1.0, 3.0] {
        let mass = MassProperties::from_sphere(2.0, Point3::origin(), radius);
        let m = 2.0 * 4.0 / 3.0 * PI * radius.powi(3);
        assert_relative_eq!(mass.mass(), m, max_relative = 1e-12);
        assert_relative_eq!(
            *mass.inertia(),
            Matrix3::from_diagonal_element(0.4 * m * radius * radius),
            max_relative = 1e-12
        );
    }
}

#[test]
fn offset_sphere_follows_parallel_axis_theorem() {
    let centered = MassProperties::from_sphere(1.0, Point3::origin(), 0.5);
    let offset = MassProperties::from_sphere(1.0, Point3::new(2.0, 0.0, 0.0), 0.5);
    let m = centered.mass();
    let i = centered.inertia()[(0, 0)];
    assert_relative_eq!(offset.inertia()[(0, 0)], i, epsilon = 1e-12);
    assert_relative_eq!(offset.inertia()[(1, 1)], i + m * 4.0, epsilon = 1e-12);
    assert_relative_eq!(offset.inertia()[(2, 2)], i + m * 4.0, epsilon = 1e-12);
}

#[test]
fn polyhedron_box_agrees_with_analytic_box() {
    let dims = Vector3::new(1.0, 2.0, 3.0);
    let compiled = CompiledPolyhedron::cuboid(dims).expect("cuboid");
    let (integrated, center) = compiled.mass_properties(1.5).expect("closed hull");
    let analytic = MassProperties::from_cuboid(1.5, dims);

    assert_relative_eq!(center, Point3::origin(), epsilon = 1e-9);
    assert_relative_eq!(integrated.mass(), analytic.mass(), max_relative = 1e-9);
    assert_relative_eq!(*integrated.inertia(), *analytic.inertia(), epsilon = 1e-9);
}

#[test]
fn immovable_mass_has_zero_inverse() {
    let mass = MassProperties::immovable();
    assert!(mass.is_immovable());
    assert_relative_eq!(mass.mass_inverse(), 0.0);
    assert_relative_eq!(*mass.inertia_inverse(), Matrix3::zeros());
}

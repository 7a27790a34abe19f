//! Surface materials.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Surface response of a collision part.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Bounciness in `[0, 1]`.
    pub elasticity: f64,
    /// Friction coefficient, non-negative.
    pub roughness: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            elasticity: 0.0,
            roughness: 0.5,
        }
    }
}

impl Material {
    /// Create a material. Elasticity is clamped to `[0, 1]`, roughness to
    /// non-negative values.
    #[must_use]
    pub fn new(elasticity: f64, roughness: f64) -> Self {
        Self {
            elasticity: elasticity.clamp(0.0, 1.0),
            roughness: roughness.max(0.0),
        }
    }

    /// Restitution of a contact between two materials: the smaller
    /// elasticity.
    #[must_use]
    pub fn combined_restitution(a: &Self, b: &Self) -> f64 {
        a.elasticity.min(b.elasticity).clamp(0.0, 1.0)
    }

    /// Friction coefficient of a contact between two materials: the geometric
    /// mean of the roughnesses.
    #[must_use]
    pub fn combined_friction(a: &Self, b: &Self) -> f64 {
        (a.roughness * b.roughness).sqrt()
    }
}

//! Configuration of the physics manager.
//!
//! [`PhysicsConfig`] holds every tunable of the step: time step limit, velocity
//! limits and damping, deactivation thresholds, solver tolerances and iteration
//! counts. [`PoolConfig`] holds the sizes of the object pools, which are fixed
//! once the manager has allocated them.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{PhysicsError, Result};

/// Main configuration for a physics manager.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhysicsConfig {
    /// Largest time step taken by one `integrate` call (seconds). Longer
    /// steps are clamped.
    pub max_time_step: f64,
    /// Gravity applied to every non-weightless body.
    pub gravity: Vector3<f64>,
    /// Maximum linear speed of a body.
    pub linear_velocity_limit: f64,
    /// Maximum angular speed of a body.
    pub angular_velocity_limit: f64,
    /// Fraction of linear velocity kept per second.
    pub linear_damping: f64,
    /// Fraction of angular velocity kept per second.
    pub angular_damping: f64,
    /// Approach speed below which contacts do not bounce.
    pub minimum_restitution: f64,
    /// Time (seconds) a body must stay below the activity thresholds before
    /// its island is put to sleep.
    pub deactivation_time: f64,
    /// Linear speed above which a body counts as active.
    pub active_linear_threshold: f64,
    /// Angular speed above which a body counts as active.
    pub active_angular_threshold: f64,
    /// Positional error constraints accept without correction.
    pub linear_error_tolerance: f64,
    /// Angular error constraints accept without correction.
    pub angular_error_tolerance: f64,
    /// Velocity bias per unit of penetration.
    pub penetration_bias: f64,
    /// Fraction of positional error corrected per position iteration.
    pub position_correction_factor: f64,
    /// Displacement per step above which a body is swept instead of tested
    /// at its end position.
    pub sweep_threshold: f64,
    /// Velocity solver passes per step. Zero disables the velocity solve.
    pub velocity_iterations: usize,
    /// Maximum position correction passes per step.
    pub position_iterations: usize,
    /// Seed contacts with the previous step's impulses.
    pub is_contact_warm_start_enabled: bool,
    /// Sort island constraint lists before solving.
    pub is_solver_sorting_enabled: bool,
    /// Pool sizes.
    pub pools: PoolConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            max_time_step: 1.0 / 60.0,
            gravity: Vector3::zeros(),
            linear_velocity_limit: 50.0,
            angular_velocity_limit: 20.0,
            linear_damping: 0.9,
            angular_damping: 0.25,
            minimum_restitution: 0.5,
            deactivation_time: 1.0,
            active_linear_threshold: 0.25,
            active_angular_threshold: 0.5,
            linear_error_tolerance: 0.001,
            angular_error_tolerance: 0.01,
            penetration_bias: 5.0,
            position_correction_factor: 0.2,
            sweep_threshold: 0.25,
            velocity_iterations: 20,
            position_iterations: 5,
            is_contact_warm_start_enabled: true,
            is_solver_sorting_enabled: true,
            pools: PoolConfig::default(),
        }
    }
}

impl PhysicsConfig {
    /// Configuration for interactive simulation at 60 Hz.
    #[must_use]
    pub fn realtime() -> Self {
        Self::default()
    }

    /// More iterations and tighter tolerances.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            max_time_step: 1.0 / 120.0,
            velocity_iterations: 40,
            position_iterations: 10,
            linear_error_tolerance: 0.0005,
            angular_error_tolerance: 0.005,
            ..Default::default()
        }
    }

    /// Fewer iterations for large scenes.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            velocity_iterations: 8,
            position_iterations: 2,
            linear_error_tolerance: 0.005,
            angular_error_tolerance: 0.02,
            ..Default::default()
        }
    }

    /// Set the gravity vector.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the velocity and position iteration counts.
    #[must_use]
    pub fn with_iterations(mut self, velocity: usize, position: usize) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self
    }

    /// Enable or disable warm starting.
    #[must_use]
    pub fn with_warm_start(mut self, enabled: bool) -> Self {
        self.is_contact_warm_start_enabled = enabled;
        self
    }

    /// Set the deactivation delay.
    #[must_use]
    pub fn with_deactivation_time(mut self, seconds: f64) -> Self {
        self.deactivation_time = seconds;
        self
    }

    /// Set the pool sizes.
    #[must_use]
    pub fn with_pools(mut self, pools: PoolConfig) -> Self {
        self.pools = pools;
        self
    }

    /// Square of [`Self::active_linear_threshold`].
    #[must_use]
    pub fn active_linear_threshold_squared(&self) -> f64 {
        self.active_linear_threshold * self.active_linear_threshold
    }

    /// Square of [`Self::active_angular_threshold`].
    #[must_use]
    pub fn active_angular_threshold_squared(&self) -> f64 {
        self.active_angular_threshold * self.active_angular_threshold
    }

    /// Square of [`Self::sweep_threshold`].
    #[must_use]
    pub fn sweep_threshold_squared(&self) -> f64 {
        self.sweep_threshold * self.sweep_threshold
    }

    /// Square of [`Self::linear_error_tolerance`].
    #[must_use]
    pub fn linear_error_tolerance_squared(&self) -> f64 {
        self.linear_error_tolerance * self.linear_error_tolerance
    }

    /// Square of [`Self::angular_error_tolerance`].
    #[must_use]
    pub fn angular_error_tolerance_squared(&self) -> f64 {
        self.angular_error_tolerance * self.angular_error_tolerance
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.max_time_step.is_finite() || self.max_time_step <= 0.0 {
            return Err(PhysicsError::invalid_config(format!(
                "max_time_step must be positive and finite, got {}",
                self.max_time_step
            )));
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(PhysicsError::invalid_config("gravity must be finite"));
        }
        for (name, value) in [
            ("linear_damping", self.linear_damping),
            ("angular_damping", self.angular_damping),
            ("position_correction_factor", self.position_correction_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PhysicsError::invalid_config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        for (name, value) in [
            ("linear_velocity_limit", self.linear_velocity_limit),
            ("angular_velocity_limit", self.angular_velocity_limit),
            ("minimum_restitution", self.minimum_restitution),
            ("deactivation_time", self.deactivation_time),
            ("active_linear_threshold", self.active_linear_threshold),
            ("active_angular_threshold", self.active_angular_threshold),
            ("linear_error_tolerance", self.linear_error_tolerance),
            ("angular_error_tolerance", self.angular_error_tolerance),
            ("penetration_bias", self.penetration_bias),
            ("sweep_threshold", self.sweep_threshold),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(PhysicsError::invalid_config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        self.pools.validate()
    }
}

/// Sizes of the contact and island pools and of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Maximum contact points kept per body pair.
    pub max_points_per_contact: usize,
    /// Initial number of pooled contact constraints.
    pub contact_pool_capacity: usize,
    /// Initial number of pooled islands.
    pub island_pool_capacity: usize,
    /// Worker threads used by the task manager.
    pub thread_count: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_points_per_contact: 16,
            contact_pool_capacity: 64,
            island_pool_capacity: 16,
            thread_count: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
        }
    }
}

impl PoolConfig {
    /// Pool sizes with a single worker thread.
    #[must_use]
    pub fn single_threaded() -> Self {
        Self {
            thread_count: 1,
            ..Default::default()
        }
    }

    /// Set the worker thread count.
    #[must_use]
    pub const fn with_threads(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    /// Validate the pool sizes.
    pub fn validate(&self) -> Result<()> {
        if self.max_points_per_contact == 0 {
            return Err(PhysicsError::invalid_config("max_points_per_contact must be > 0"));
        }
        if self.contact_pool_capacity == 0 || self.island_pool_capacity == 0 {
            return Err(PhysicsError::invalid_config("pool capacities must be > 0"));
        }
        if self.thread_count == 0 {
            return Err(PhysicsError::invalid_config("thread_count must be > 0"));
        }
        Ok(())
    }
}

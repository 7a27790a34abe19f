//! Error types for physics operations.

use thiserror::Error;

use crate::BodyId;

/// Errors that can occur while configuring or stepping the physics world.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// The object is already owned by a manager, composition or body.
    #[error("{what} is already managed")]
    AlreadyManaged {
        /// What was added twice.
        what: String,
    },

    /// The object is not owned by the manager it was removed from.
    #[error("{what} is not managed")]
    NotManaged {
        /// What was missing.
        what: String,
    },

    /// The operation is not valid in the current state.
    #[error("invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation was rejected.
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Malformed shape or frame input.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry {
        /// Description of the geometry problem.
        reason: String,
    },

    /// Invalid body ID referenced.
    #[error("invalid body ID: {0}")]
    InvalidBodyId(BodyId),

    /// Invalid constraint ID referenced.
    #[error("invalid constraint ID: {0}")]
    InvalidConstraintId(u64),

    /// A scheduled task failed.
    #[error("task {index} failed: {message}")]
    TaskFailed {
        /// Position of the task in its batch.
        index: usize,
        /// Error or panic message.
        message: String,
    },

    /// One or more tasks in a batch failed.
    #[error("{} task(s) failed", .0.len())]
    TaskFailures(Vec<PhysicsError>),
}

impl PhysicsError {
    /// Create an already-managed error.
    #[must_use]
    pub fn already_managed(what: impl Into<String>) -> Self {
        Self::AlreadyManaged { what: what.into() }
    }

    /// Create a not-managed error.
    #[must_use]
    pub fn not_managed(what: impl Into<String>) -> Self {
        Self::NotManaged { what: what.into() }
    }

    /// Create an invalid operation error.
    #[must_use]
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid geometry error.
    #[must_use]
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    /// Check if this error was caused by misuse of the API (invalid operation,
    /// double add or missing object).
    #[must_use]
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            Self::InvalidOperation { .. } | Self::AlreadyManaged { .. } | Self::NotManaged { .. }
        )
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Check if this error came from the task manager.
    #[must_use]
    pub fn is_task_failure(&self) -> bool {
        matches!(self, Self::TaskFailed { .. } | Self::TaskFailures(_))
    }

    /// The individual task errors if this is an aggregate.
    #[must_use]
    pub fn task_errors(&self) -> &[PhysicsError] {
        match self {
            Self::TaskFailures(errors) => errors,
            _ => &[],
        }
    }
}

//! Error types for the physics core

use thiserror::Error;

use crate::body::BodyHandle;
use crate::shape::ShapeKind;

/// Physics core errors
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Rigid body not found (destroyed or never created)
    #[error("Rigid body not found: {0:?}")]
    BodyNotFound(BodyHandle),

    /// A fixed-capacity store is full
    #[error("{what} capacity exceeded (capacity {capacity})")]
    CapacityExceeded {
        what: &'static str,
        capacity: usize,
    },

    /// Invalid configuration
    #[error("Invalid physics configuration: {0}")]
    InvalidConfig(String),

    /// Shape creation failed
    #[error("Failed to create collision shape: {0}")]
    ShapeCreationFailed(String),

    /// No narrowphase routine is registered for this shape pair
    #[error("No collision routine for shape pair {0:?} / {1:?}")]
    UnsupportedShapePair(ShapeKind, ShapeKind),
}

/// Result type for physics operations
pub type Result<T> = std::result::Result<T, PhysicsError>;

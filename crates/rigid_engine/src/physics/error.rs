//! Physics error types

use crate::config::ConfigError;
use crate::physics::BodyHandle;

/// Reasons a point cloud cannot be turned into a convex hull
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HullError {
    /// A solid needs at least four points
    #[error("convex hull needs at least 4 points, got {0}")]
    TooFewPoints(usize),

    /// Every point lies on a single line (or on top of each other)
    #[error("convex hull input is collinear")]
    Collinear,

    /// Every point lies in a single plane
    #[error("convex hull input is coplanar")]
    Coplanar,

    /// Mass sampling found no interior samples
    #[error("convex hull encloses no volume at {0} samples per axis")]
    EmptyVolume(usize),
}

/// Errors raised while building or editing a scene
#[derive(thiserror::Error, Debug)]
pub enum PhysicsError {
    /// Handle does not refer to a body in the scene
    #[error("body handle {0} is out of range")]
    InvalidBody(BodyHandle),

    /// A joint must connect two different bodies
    #[error("joint connects body {0} to itself")]
    SameBody(BodyHandle),

    /// Shape construction failed
    #[error("shape error: {0}")]
    Hull(#[from] HullError),

    /// Configuration could not be loaded or is invalid
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for physics operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;

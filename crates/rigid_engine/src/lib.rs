//! # Rigid Engine
//!
//! A real-time 3D rigid-body physics engine.
//!
//! ## Features
//!
//! - **Shapes**: spheres, boxes and convex hulls of arbitrary point clouds
//! - **Collision**: sweep-and-prune broad phase, GJK/EPA narrow phase with
//!   continuous collision for fast bodies
//! - **Contacts**: persistent four-point manifolds with warm-started friction
//! - **Joints**: distance, hinge, constant velocity, weld and motor joints,
//!   with optional angle limits
//! - **Configuration**: TOML or RON settings through serde
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rigid_engine::prelude::*;
//!
//! fn main() -> Result<(), PhysicsError> {
//!     let config = SimulationConfig::default();
//!     let mut scene = rigid_engine::scenes::sandbox(&config)?;
//!
//!     for _ in 0..60 {
//!         let stats = scene.update(1.0 / 60.0);
//!         log::debug!("{:?}", stats);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod physics;
pub mod scenes;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, PhysicsConfig, SimulationConfig, StepperConfig},
        foundation::{
            math::{Quat, Transform, Vec3},
            time::{FixedTimestep, Stopwatch, Timer},
        },
        physics::{
            Body, BodyHandle, BoxShape, Constraint, ConvexHull, DistanceConstraint, HingeConstraint,
            HingeLimitedConstraint, JointFrame, MotorConstraint, PhysicsError, PhysicsResult, Scene, Shape,
            StepStats,
        },
    };
}

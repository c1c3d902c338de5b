//! Rigid-body dynamics
//!
//! Collision detection runs in two phases: a sweep-and-prune broad phase over
//! swept bounds, then an exact narrow phase (analytic for sphere pairs, GJK
//! and EPA with conservative advancement for everything else). Contacts that
//! touch at the start of a step persist in manifolds and are solved together
//! with the joints; contacts found later in the step are resolved with
//! impulses at their time of impact.

pub mod body;
pub mod bounds;
pub mod broad_phase;
pub mod constraints;
pub mod contact;
pub mod epa;
pub mod error;
pub mod gjk;
pub mod intersections;
pub mod lcp;
pub mod manifold;
pub mod scene;
pub mod shapes;

/// Index of a body in its scene
pub type BodyHandle = usize;

pub use body::Body;
pub use bounds::Bounds;
pub use broad_phase::{BroadPhase, CollisionPair};
pub use constraints::{
    ConstantVelocityConstraint, ConstantVelocityLimitedConstraint, Constraint, ConstraintSolver,
    DistanceConstraint, HingeConstraint, HingeLimitedConstraint, JointFrame, MotorConstraint, MoverConstraint,
    OrientationConstraint, PenetrationConstraint,
};
pub use contact::{resolve_contact, Contact};
pub use error::{HullError, PhysicsError, PhysicsResult};
pub use intersections::{intersect, Proximity, Ray};
pub use manifold::{Manifold, ManifoldCollector};
pub use scene::{Scene, StepStats};
pub use shapes::{BoxShape, ConvexHull, Shape, Sphere};

//! Velocity constraints
//!
//! Contacts and joints share one formulation: each constraint builds a
//! Jacobian `J` (one row per constrained degree of freedom, twelve columns for
//! the linear and angular velocity of both bodies) and solves
//!
//! ```text
//! J W Jᵀ λ = -J q̇ - bias
//! ```
//!
//! for the impulse magnitudes `λ`, where `W` is the block-diagonal inverse
//! mass matrix and `q̇` the stacked body velocities. The impulses `Jᵀ λ` are
//! applied straight back to the bodies.
//!
//! Every constraint goes through three phases per step: `pre_solve` builds the
//! Jacobian and applies last step's impulses (warm starting), `solve` runs
//! once per solver iteration, and `post_solve` sanitizes the cached impulses.

mod constant_velocity;
mod distance;
mod hinge;
mod motor;
mod mover;
mod orientation;
mod penetration;

pub use constant_velocity::{ConstantVelocityConstraint, ConstantVelocityLimitedConstraint};
pub use distance::DistanceConstraint;
pub use hinge::{HingeConstraint, HingeLimitedConstraint};
pub use motor::MotorConstraint;
pub use mover::MoverConstraint;
pub use orientation::OrientationConstraint;
pub use penetration::PenetrationConstraint;

use crate::foundation::math::{utils, Mat3, Quat, SMatrix, SVector, Vec3, Vec4};
use crate::physics::body::{body_pair_mut, Body};
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::lcp;
use crate::physics::BodyHandle;

/// Constraint rows by twelve body velocity components
pub type Jacobian<const R: usize> = SMatrix<f32, R, 12>;

/// Stacked velocities or impulses of a body pair
pub type PairVector = SVector<f32, 12>;

/// Baumgarte factor shared by the joints
pub(crate) const JOINT_BETA: f32 = 0.05;

/// Squared anchor drift tolerated before the distance row corrects it
pub(crate) const DISTANCE_SLOP_SQ: f32 = 0.01;

/// Bound on cached joint impulses carried between steps
pub(crate) const JOINT_CACHE_LIMIT: f32 = 20.0;

/// Angle limit of the limited joints in degrees
pub const JOINT_LIMIT_DEGREES: f32 = 45.0;

/// One step of the per-step constraint protocol
pub trait ConstraintSolver {
    /// Build the Jacobian for this step and apply warm-start impulses
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32);

    /// Run one solver iteration
    fn solve(&mut self, bodies: &mut [Body]);

    /// Sanitize cached impulses after the last iteration
    fn post_solve(&mut self) {}
}

/// Where and how two bodies are attached, captured when the joint is made
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointFrame {
    /// First body
    pub body_a: BodyHandle,
    /// Second body
    pub body_b: BodyHandle,
    /// Anchor in A's center-of-mass frame
    pub anchor_a: Vec3,
    /// Anchor in B's center-of-mass frame
    pub anchor_b: Vec3,
    /// Joint axis in A's frame
    pub axis_a: Vec3,
    /// Relative orientation `qa⁻¹ qb` at creation
    pub q0: Quat,
}

impl JointFrame {
    /// Attach `body_a` and `body_b` at a shared world anchor with a world axis
    pub fn new(
        bodies: &[Body],
        body_a: BodyHandle,
        body_b: BodyHandle,
        world_anchor: Vec3,
        world_axis: Vec3,
    ) -> PhysicsResult<Self> {
        if body_a == body_b {
            return Err(PhysicsError::SameBody(body_a));
        }
        let a = bodies.get(body_a).ok_or(PhysicsError::InvalidBody(body_a))?;
        let b = bodies.get(body_b).ok_or(PhysicsError::InvalidBody(body_b))?;

        let axis = world_axis.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);
        Ok(Self {
            body_a,
            body_b,
            anchor_a: a.world_to_body(&world_anchor),
            anchor_b: b.world_to_body(&world_anchor),
            axis_a: a.orientation.inverse_transform_vector(&axis),
            q0: a.orientation.inverse() * b.orientation,
        })
    }
}

/// World-space quantities every joint needs at the start of a step
pub(crate) struct Anchors {
    /// World anchor on A
    pub a: Vec3,
    /// World anchor on B
    pub b: Vec3,
    /// A's center of mass to its anchor
    pub ra: Vec3,
    /// B's center of mass to its anchor
    pub rb: Vec3,
}

impl Anchors {
    pub fn new(body_a: &Body, body_b: &Body, anchor_a: &Vec3, anchor_b: &Vec3) -> Self {
        let a = body_a.body_to_world(anchor_a);
        let b = body_b.body_to_world(anchor_b);
        Self {
            a,
            b,
            ra: a - body_a.center_of_mass_world(),
            rb: b - body_b.center_of_mass_world(),
        }
    }

    /// Squared anchor separation with the slop removed
    pub fn distance_error(&self) -> f32 {
        ((self.b - self.a).norm_squared() - DISTANCE_SLOP_SQ).max(0.0)
    }
}

/// Write one Jacobian row from its four 3-vector blocks
pub(crate) fn set_row<const R: usize>(
    jacobian: &mut Jacobian<R>,
    row: usize,
    linear_a: &Vec3,
    angular_a: &Vec3,
    linear_b: &Vec3,
    angular_b: &Vec3,
) {
    for (block, values) in [linear_a, angular_a, linear_b, angular_b].into_iter().enumerate() {
        for k in 0..3 {
            jacobian[(row, block * 3 + k)] = values[k];
        }
    }
}

/// Row keeping the two anchors together: `C = |b - a|²`
pub(crate) fn set_distance_row<const R: usize>(jacobian: &mut Jacobian<R>, row: usize, anchors: &Anchors) {
    let ab = (anchors.b - anchors.a) * 2.0;
    set_row(
        jacobian,
        row,
        &-ab,
        &anchors.ra.cross(&-ab),
        &ab,
        &anchors.rb.cross(&ab),
    );
}

/// Relative rotation error `qa⁻¹ qb q0⁻¹`; identity while the joint holds
pub(crate) fn rotation_error(body_a: &Body, body_b: &Body, q0: &Quat) -> Quat {
    body_a.orientation.inverse() * body_b.orientation * q0.inverse()
}

/// Angular blocks of the row constraining `axis · vec(qa⁻¹ qb q0⁻¹)`,
/// with `axis` expressed in A's frame
pub(crate) fn set_quaternion_row<const R: usize>(
    jacobian: &mut Jacobian<R>,
    row: usize,
    body_a: &Body,
    body_b: &Body,
    q0: &Quat,
    axis: &Vec3,
) {
    let m = utils::quat_left(body_a.orientation.inverse().quaternion())
        * utils::quat_right((body_b.orientation * q0.inverse()).quaternion());
    let t = m.transpose() * Vec4::new(0.0, axis.x, axis.y, axis.z);
    let angular_b = Vec3::new(t[1], t[2], t[3]) * 0.5;

    let zero = Vec3::zeros();
    set_row(jacobian, row, &zero, &-angular_b, &zero, &angular_b);
}

/// Signed angle in degrees of the relative rotation about `axis`
pub(crate) fn relative_angle_degrees(error: &Quat, axis: &Vec3) -> f32 {
    let s = error.imag().dot(axis).clamp(-1.0, 1.0);
    (2.0 * s.asin()).to_degrees()
}

/// Baumgarte bias pulling an angle back inside `±JOINT_LIMIT_DEGREES`
pub(crate) fn limit_bias(error: &Quat, axis: &Vec3, angle: f32, dt: f32) -> f32 {
    let edge = (JOINT_LIMIT_DEGREES * 0.5).to_radians().sin();
    let excess = error.imag().dot(axis) - angle.signum() * edge;
    JOINT_BETA / dt * excess
}

/// Keep a limit row's impulse restorative
pub(crate) fn clamp_restorative(lambda: f32, angle: f32) -> f32 {
    if angle > 0.0 {
        lambda.min(0.0)
    } else if angle < 0.0 {
        lambda.max(0.0)
    } else {
        lambda
    }
}

/// Block-diagonal inverse mass matrix of a body pair
pub fn inverse_mass_matrix(body_a: &Body, body_b: &Body) -> SMatrix<f32, 12, 12> {
    let mut w = SMatrix::<f32, 12, 12>::zeros();

    let blocks: [(usize, Mat3); 4] = [
        (0, Mat3::identity() * body_a.inv_mass),
        (3, body_a.inverse_inertia_world()),
        (6, Mat3::identity() * body_b.inv_mass),
        (9, body_b.inverse_inertia_world()),
    ];
    for (offset, block) in blocks {
        w.fixed_view_mut::<3, 3>(offset, offset).copy_from(&block);
    }
    w
}

/// Linear and angular velocities of both bodies stacked
pub fn velocities(body_a: &Body, body_b: &Body) -> PairVector {
    let mut q_dt = PairVector::zeros();
    q_dt.fixed_rows_mut::<3>(0).copy_from(&body_a.linear_velocity);
    q_dt.fixed_rows_mut::<3>(3).copy_from(&body_a.angular_velocity);
    q_dt.fixed_rows_mut::<3>(6).copy_from(&body_b.linear_velocity);
    q_dt.fixed_rows_mut::<3>(9).copy_from(&body_b.angular_velocity);
    q_dt
}

/// Apply stacked linear and angular impulses to both bodies
pub fn apply_impulses(body_a: &mut Body, body_b: &mut Body, impulses: &PairVector) {
    body_a.apply_impulse_linear(&impulses.fixed_rows::<3>(0).into_owned());
    body_a.apply_impulse_angular(&impulses.fixed_rows::<3>(3).into_owned());
    body_b.apply_impulse_linear(&impulses.fixed_rows::<3>(6).into_owned());
    body_b.apply_impulse_angular(&impulses.fixed_rows::<3>(9).into_owned());
}

/// Solve `J W Jᵀ λ = -J q̇ - bias` for one constraint block
pub(crate) fn solve_rows<const R: usize>(
    jacobian: &Jacobian<R>,
    body_a: &Body,
    body_b: &Body,
    bias: &SVector<f32, R>,
) -> SVector<f32, R> {
    let q_dt = velocities(body_a, body_b);
    let j_w_jt = jacobian * inverse_mass_matrix(body_a, body_b) * jacobian.transpose();
    let rhs = -(jacobian * q_dt) - bias;
    lcp::gauss_seidel(&j_w_jt, &rhs)
}

/// Apply `Jᵀ λ`
pub(crate) fn apply_lambda<const R: usize>(
    jacobian: &Jacobian<R>,
    body_a: &mut Body,
    body_b: &mut Body,
    lambda: &SVector<f32, R>,
) {
    let impulses = jacobian.transpose() * lambda;
    apply_impulses(body_a, body_b, &impulses);
}

/// Zero non-finite entries and clamp the rest to `±limit`
pub(crate) fn scrub_cache<const R: usize>(cache: &mut SVector<f32, R>, limit: f32) {
    for value in cache.iter_mut() {
        *value = if value.is_finite() { value.clamp(-limit, limit) } else { 0.0 };
    }
}

/// Borrow the two bodies of a joint, or `None` if the handles are stale
pub(crate) fn joint_bodies<'a>(bodies: &'a mut [Body], frame: &JointFrame) -> Option<(&'a mut Body, &'a mut Body)> {
    body_pair_mut(bodies, frame.body_a, frame.body_b)
}

/// Every constraint the scene can hold
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Non-penetration with friction at one contact point
    Penetration(PenetrationConstraint),
    /// Ball-and-socket point constraint
    Distance(DistanceConstraint),
    /// One rotational degree of freedom
    Hinge(HingeConstraint),
    /// Hinge with a ±45° range
    HingeLimited(HingeLimitedConstraint),
    /// Weld locking relative rotation and position
    Orientation(OrientationConstraint),
    /// Hinge driven at a target speed
    Motor(MotorConstraint),
    /// Kinematic driver oscillating one body
    Mover(MoverConstraint),
    /// Universal-style joint transmitting spin about its axis
    ConstantVelocity(ConstantVelocityConstraint),
    /// Constant velocity joint with ±45° swing limits
    ConstantVelocityLimited(ConstantVelocityLimitedConstraint),
}

impl Constraint {
    /// Bodies this constraint acts on
    pub const fn bodies(&self) -> (BodyHandle, Option<BodyHandle>) {
        match self {
            Self::Penetration(c) => (c.body_a(), Some(c.body_b())),
            Self::Distance(c) => (c.frame.body_a, Some(c.frame.body_b)),
            Self::Hinge(c) => (c.frame.body_a, Some(c.frame.body_b)),
            Self::HingeLimited(c) => (c.frame.body_a, Some(c.frame.body_b)),
            Self::Orientation(c) => (c.frame.body_a, Some(c.frame.body_b)),
            Self::Motor(c) => (c.frame.body_a, Some(c.frame.body_b)),
            Self::Mover(c) => (c.body, None),
            Self::ConstantVelocity(c) => (c.frame.body_a, Some(c.frame.body_b)),
            Self::ConstantVelocityLimited(c) => (c.frame.body_a, Some(c.frame.body_b)),
        }
    }

    fn solver(&mut self) -> &mut dyn ConstraintSolver {
        match self {
            Self::Penetration(c) => c,
            Self::Distance(c) => c,
            Self::Hinge(c) => c,
            Self::HingeLimited(c) => c,
            Self::Orientation(c) => c,
            Self::Motor(c) => c,
            Self::Mover(c) => c,
            Self::ConstantVelocity(c) => c,
            Self::ConstantVelocityLimited(c) => c,
        }
    }
}

impl ConstraintSolver for Constraint {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        self.solver().pre_solve(bodies, dt);
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        self.solver().solve(bodies);
    }

    fn post_solve(&mut self) {
        self.solver().post_solve();
    }
}

macro_rules! impl_from_constraint {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Constraint {
                fn from(constraint: $ty) -> Self {
                    Self::$variant(constraint)
                }
            }
        )*
    };
}

impl_from_constraint! {
    Penetration => PenetrationConstraint,
    Distance => DistanceConstraint,
    Hinge => HingeConstraint,
    HingeLimited => HingeLimitedConstraint,
    Orientation => OrientationConstraint,
    Motor => MotorConstraint,
    Mover => MoverConstraint,
    ConstantVelocity => ConstantVelocityConstraint,
    ConstantVelocityLimited => ConstantVelocityLimitedConstraint,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::shapes::{BoxShape, Shape};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    pub(super) fn create_test_pair() -> Vec<Body> {
        let shape = Arc::new(Shape::Box(BoxShape::new(Vec3::repeat(0.25))));
        vec![
            Body::new(shape.clone()).with_position(Vec3::new(0.0, 0.0, 5.0)),
            Body::new(shape)
                .with_position(Vec3::new(1.0, 0.0, 5.0))
                .with_inv_mass(1.0),
        ]
    }

    #[test]
    fn test_joint_frame_rejects_bad_handles() {
        let bodies = create_test_pair();
        assert!(matches!(
            JointFrame::new(&bodies, 0, 0, Vec3::zeros(), Vec3::z()),
            Err(PhysicsError::SameBody(0))
        ));
        assert!(matches!(
            JointFrame::new(&bodies, 0, 7, Vec3::zeros(), Vec3::z()),
            Err(PhysicsError::InvalidBody(7))
        ));
    }

    #[test]
    fn test_joint_frame_anchors_meet() {
        let mut bodies = create_test_pair();
        bodies[1].orientation = Quat::from_axis_angle(&Vec3::y_axis(), 0.4);
        let anchor = Vec3::new(0.5, 0.0, 5.0);
        let frame = JointFrame::new(&bodies, 0, 1, anchor, Vec3::x()).unwrap();

        assert_relative_eq!(bodies[0].body_to_world(&frame.anchor_a), anchor, epsilon = 1e-5);
        assert_relative_eq!(bodies[1].body_to_world(&frame.anchor_b), anchor, epsilon = 1e-5);
        assert_relative_eq!(rotation_error(&bodies[0], &bodies[1], &frame.q0).angle(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_inverse_mass_matrix_blocks() {
        let bodies = create_test_pair();
        let w = inverse_mass_matrix(&bodies[0], &bodies[1]);

        // Static A contributes nothing
        assert_eq!(w.fixed_view::<6, 6>(0, 0).into_owned(), SMatrix::<f32, 6, 6>::zeros());
        assert_eq!(w[(6, 6)], 1.0);
        assert_relative_eq!(w[(9, 9)], bodies[1].inverse_inertia_world()[(0, 0)]);
    }

    #[test]
    fn test_quaternion_row_measures_relative_spin() {
        let bodies = create_test_pair();
        let frame = JointFrame::new(&bodies, 0, 1, Vec3::new(0.5, 0.0, 5.0), Vec3::z()).unwrap();

        let mut jacobian = Jacobian::<1>::zeros();
        set_quaternion_row(&mut jacobian, 0, &bodies[0], &bodies[1], &frame.q0, &Vec3::z());

        // At the rest pose the row reads half the relative angular velocity
        let mut spinning = bodies[1].clone();
        spinning.angular_velocity = Vec3::new(0.0, 0.0, 2.0);
        let rate = (jacobian * velocities(&bodies[0], &spinning))[0];
        assert_relative_eq!(rate, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_scrub_cache() {
        let mut cache = SVector::<f32, 3>::new(f32::NAN, 50.0, -3.0);
        scrub_cache(&mut cache, JOINT_CACHE_LIMIT);
        assert_eq!(cache, SVector::<f32, 3>::new(0.0, 20.0, -3.0));
    }

    #[test]
    fn test_clamp_restorative() {
        assert_eq!(clamp_restorative(2.0, 50.0), 0.0);
        assert_eq!(clamp_restorative(-2.0, 50.0), -2.0);
        assert_eq!(clamp_restorative(-2.0, -50.0), 0.0);
    }
}

//! Constant velocity joints
//!
//! Two bodies share an anchor and the twist about the joint axis is locked, so
//! spin is passed through while the bodies swing freely relative to each other.

use super::{
    apply_lambda, clamp_restorative, joint_bodies, limit_bias, relative_angle_degrees, rotation_error,
    scrub_cache, set_distance_row, set_quaternion_row, solve_rows, Anchors, ConstraintSolver, Jacobian, JointFrame,
    JOINT_BETA, JOINT_CACHE_LIMIT, JOINT_LIMIT_DEGREES,
};
use crate::foundation::math::{utils, SVector};
use crate::physics::body::Body;

/// Distance row then twist row; returns the distance row's Baumgarte term
fn set_coupling_rows<const R: usize>(
    jacobian: &mut Jacobian<R>,
    frame: &JointFrame,
    body_a: &Body,
    body_b: &Body,
    dt: f32,
) -> f32 {
    let anchors = Anchors::new(body_a, body_b, &frame.anchor_a, &frame.anchor_b);

    *jacobian = Jacobian::zeros();
    set_distance_row(jacobian, 0, &anchors);
    set_quaternion_row(jacobian, 1, body_a, body_b, &frame.q0, &frame.axis_a);

    JOINT_BETA / dt * anchors.distance_error()
}

/// Shared anchor with the twist about the axis locked
#[derive(Debug, Clone)]
pub struct ConstantVelocityConstraint {
    /// Attachment; `axis_a` is the twist axis
    pub frame: JointFrame,
    jacobian: Jacobian<2>,
    cached_lambda: SVector<f32, 2>,
    baumgarte: f32,
}

impl ConstantVelocityConstraint {
    /// Joint over `frame`
    pub fn new(frame: JointFrame) -> Self {
        Self {
            frame,
            jacobian: Jacobian::zeros(),
            cached_lambda: SVector::zeros(),
            baumgarte: 0.0,
        }
    }
}

impl ConstraintSolver for ConstantVelocityConstraint {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        self.baumgarte = set_coupling_rows(&mut self.jacobian, &self.frame, body_a, body_b, dt);
        apply_lambda(&self.jacobian, body_a, body_b, &self.cached_lambda);
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        let bias = SVector::<f32, 2>::new(self.baumgarte, 0.0);
        let lambda = solve_rows(&self.jacobian, body_a, body_b, &bias);
        apply_lambda(&self.jacobian, body_a, body_b, &lambda);
        self.cached_lambda += lambda;
    }

    fn post_solve(&mut self) {
        scrub_cache(&mut self.cached_lambda, JOINT_CACHE_LIMIT);
    }
}

/// Constant velocity joint whose swing stays within `±JOINT_LIMIT_DEGREES`
/// about each perpendicular direction
#[derive(Debug, Clone)]
pub struct ConstantVelocityLimitedConstraint {
    /// Attachment; `axis_a` is the twist axis
    pub frame: JointFrame,
    jacobian: Jacobian<4>,
    cached_lambda: SVector<f32, 4>,
    bias: SVector<f32, 4>,
    /// Swing angles about `u` and `v` in degrees
    angles: [f32; 2],
    violated: [bool; 2],
}

impl ConstantVelocityLimitedConstraint {
    /// Limited joint over `frame`
    pub fn new(frame: JointFrame) -> Self {
        Self {
            frame,
            jacobian: Jacobian::zeros(),
            cached_lambda: SVector::zeros(),
            bias: SVector::zeros(),
            angles: [0.0; 2],
            violated: [false; 2],
        }
    }

    /// Swing angles in degrees about the two directions perpendicular to the axis
    pub const fn swing_angles(&self) -> [f32; 2] {
        self.angles
    }
}

impl ConstraintSolver for ConstantVelocityLimitedConstraint {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        let error = rotation_error(body_a, body_b, &self.frame.q0);
        let (u, v) = utils::orthonormal_basis(&self.frame.axis_a);

        self.bias = SVector::zeros();
        self.bias[0] = set_coupling_rows(&mut self.jacobian, &self.frame, body_a, body_b, dt);

        for (i, axis) in [u, v].iter().enumerate() {
            let angle = relative_angle_degrees(&error, axis);
            self.angles[i] = angle;
            self.violated[i] = angle.abs() > JOINT_LIMIT_DEGREES;

            if self.violated[i] {
                set_quaternion_row(&mut self.jacobian, i + 2, body_a, body_b, &self.frame.q0, axis);
                self.bias[i + 2] = limit_bias(&error, axis, angle, dt);
            }
        }

        apply_lambda(&self.jacobian, body_a, body_b, &self.cached_lambda);
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        let mut lambda = solve_rows(&self.jacobian, body_a, body_b, &self.bias);
        for i in 0..2 {
            if self.violated[i] {
                lambda[i + 2] = clamp_restorative(lambda[i + 2], self.angles[i]);
            }
        }

        apply_lambda(&self.jacobian, body_a, body_b, &lambda);
        self.cached_lambda += lambda;
    }

    fn post_solve(&mut self) {
        for value in self.cached_lambda.iter_mut().skip(1) {
            *value = 0.0;
        }
        scrub_cache(&mut self.cached_lambda, JOINT_CACHE_LIMIT);
    }
}

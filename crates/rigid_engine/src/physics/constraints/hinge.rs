//! Hinge joints built on quaternion rows
//!
//! The anchors are held together by a distance row, and the relative rotation
//! is locked about the two directions perpendicular to the hinge axis. The
//! limited variant adds a fourth row along the axis itself once the hinge
//! swings past its range.

use super::{
    apply_lambda, clamp_restorative, joint_bodies, limit_bias, relative_angle_degrees, rotation_error,
    scrub_cache, set_distance_row, set_quaternion_row, solve_rows, Anchors, ConstraintSolver, Jacobian, JointFrame,
    JOINT_BETA, JOINT_CACHE_LIMIT, JOINT_LIMIT_DEGREES,
};
use crate::foundation::math::{utils, SVector};
use crate::physics::body::Body;

/// Fill the distance row and the two perpendicular rotation rows; returns the
/// Baumgarte term of the distance row
fn set_hinge_rows<const R: usize>(
    jacobian: &mut Jacobian<R>,
    frame: &JointFrame,
    body_a: &Body,
    body_b: &Body,
    dt: f32,
) -> f32 {
    let anchors = Anchors::new(body_a, body_b, &frame.anchor_a, &frame.anchor_b);
    let (u, v) = utils::orthonormal_basis(&frame.axis_a);

    *jacobian = Jacobian::zeros();
    set_distance_row(jacobian, 0, &anchors);
    set_quaternion_row(jacobian, 1, body_a, body_b, &frame.q0, &u);
    set_quaternion_row(jacobian, 2, body_a, body_b, &frame.q0, &v);

    JOINT_BETA / dt * anchors.distance_error()
}

/// Hinge allowing free rotation about one axis
#[derive(Debug, Clone)]
pub struct HingeConstraint {
    /// Attachment; `axis_a` is the hinge axis
    pub frame: JointFrame,
    jacobian: Jacobian<3>,
    cached_lambda: SVector<f32, 3>,
    baumgarte: f32,
}

impl HingeConstraint {
    /// Hinge over `frame`
    pub fn new(frame: JointFrame) -> Self {
        Self {
            frame,
            jacobian: Jacobian::zeros(),
            cached_lambda: SVector::zeros(),
            baumgarte: 0.0,
        }
    }
}

impl ConstraintSolver for HingeConstraint {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        self.baumgarte = set_hinge_rows(&mut self.jacobian, &self.frame, body_a, body_b, dt);
        apply_lambda(&self.jacobian, body_a, body_b, &self.cached_lambda);
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        let bias = SVector::<f32, 3>::new(self.baumgarte, 0.0, 0.0);
        let lambda = solve_rows(&self.jacobian, body_a, body_b, &bias);
        apply_lambda(&self.jacobian, body_a, body_b, &lambda);
        self.cached_lambda += lambda;
    }

    fn post_solve(&mut self) {
        scrub_cache(&mut self.cached_lambda, JOINT_CACHE_LIMIT);
    }
}

/// Hinge whose rotation about the axis stays within `±JOINT_LIMIT_DEGREES`
#[derive(Debug, Clone)]
pub struct HingeLimitedConstraint {
    /// Attachment; `axis_a` is the hinge axis
    pub frame: JointFrame,
    jacobian: Jacobian<4>,
    cached_lambda: SVector<f32, 4>,
    bias: SVector<f32, 4>,
    relative_angle: f32,
    angle_violated: bool,
}

impl HingeLimitedConstraint {
    /// Limited hinge over `frame`
    pub fn new(frame: JointFrame) -> Self {
        Self {
            frame,
            jacobian: Jacobian::zeros(),
            cached_lambda: SVector::zeros(),
            bias: SVector::zeros(),
            relative_angle: 0.0,
            angle_violated: false,
        }
    }

    /// Rotation about the hinge axis measured at the last `pre_solve`, in degrees
    pub const fn relative_angle(&self) -> f32 {
        self.relative_angle
    }

    /// Whether the limit row was active this step
    pub const fn is_angle_violated(&self) -> bool {
        self.angle_violated
    }
}

impl ConstraintSolver for HingeLimitedConstraint {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        let axis = self.frame.axis_a;
        let error = rotation_error(body_a, body_b, &self.frame.q0);
        self.relative_angle = relative_angle_degrees(&error, &axis);
        self.angle_violated = self.relative_angle.abs() > JOINT_LIMIT_DEGREES;

        self.bias = SVector::zeros();
        self.bias[0] = set_hinge_rows(&mut self.jacobian, &self.frame, body_a, body_b, dt);
        if self.angle_violated {
            set_quaternion_row(&mut self.jacobian, 3, body_a, body_b, &self.frame.q0, &axis);
            self.bias[3] = limit_bias(&error, &axis, self.relative_angle, dt);
        }

        apply_lambda(&self.jacobian, body_a, body_b, &self.cached_lambda);
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        let mut lambda = solve_rows(&self.jacobian, body_a, body_b, &self.bias);
        if self.angle_violated {
            lambda[3] = clamp_restorative(lambda[3], self.relative_angle);
        }

        apply_lambda(&self.jacobian, body_a, body_b, &lambda);
        self.cached_lambda += lambda;
    }

    fn post_solve(&mut self) {
        // Only the distance row is warm started
        for value in self.cached_lambda.iter_mut().skip(1) {
            *value = 0.0;
        }
        scrub_cache(&mut self.cached_lambda, JOINT_CACHE_LIMIT);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::create_test_pair;
    use super::*;
    use crate::foundation::math::{Quat, Vec3};
    use approx::assert_relative_eq;

    #[test]
    fn test_hinge_only_allows_spin_about_its_axis() {
        let mut bodies = create_test_pair();
        let anchor = bodies[1].position;
        let frame = JointFrame::new(&bodies, 0, 1, anchor, Vec3::z()).unwrap();
        let mut hinge = HingeConstraint::new(frame);

        bodies[1].angular_velocity = Vec3::new(1.0, -0.5, 2.0);

        hinge.pre_solve(&mut bodies, 1.0 / 60.0);
        for _ in 0..5 {
            hinge.solve(&mut bodies);
        }
        hinge.post_solve();

        let spin = bodies[1].angular_velocity;
        assert_relative_eq!(spin.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(spin.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(spin.z, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_limit_is_inactive_inside_range() {
        let mut bodies = create_test_pair();
        let anchor = bodies[1].position;
        let frame = JointFrame::new(&bodies, 0, 1, anchor, Vec3::y()).unwrap();
        let mut hinge = HingeLimitedConstraint::new(frame);

        bodies[1].orientation = Quat::from_axis_angle(&Vec3::y_axis(), 30f32.to_radians());
        hinge.pre_solve(&mut bodies, 1.0 / 60.0);

        assert_relative_eq!(hinge.relative_angle(), 30.0, epsilon = 1e-3);
        assert!(!hinge.is_angle_violated());
    }

    #[test]
    fn test_limit_pushes_back_past_range() {
        let mut bodies = create_test_pair();
        let anchor = bodies[1].position;
        let frame = JointFrame::new(&bodies, 0, 1, anchor, Vec3::y()).unwrap();
        let mut hinge = HingeLimitedConstraint::new(frame);

        bodies[1].orientation = Quat::from_axis_angle(&Vec3::y_axis(), 60f32.to_radians());
        hinge.pre_solve(&mut bodies, 1.0 / 60.0);
        assert!(hinge.is_angle_violated());

        for _ in 0..5 {
            hinge.solve(&mut bodies);
        }
        hinge.post_solve();

        // Rotating back towards the range, and only the distance row is cached
        assert!(bodies[1].angular_velocity.y < 0.0);
        assert_eq!(hinge.cached_lambda[3], 0.0);
    }

    #[test]
    fn test_limit_never_pulls_further_out() {
        let mut bodies = create_test_pair();
        let anchor = bodies[1].position;
        let frame = JointFrame::new(&bodies, 0, 1, anchor, Vec3::y()).unwrap();
        let mut hinge = HingeLimitedConstraint::new(frame);

        // Past the limit but already swinging back faster than the bias asks
        bodies[1].orientation = Quat::from_axis_angle(&Vec3::y_axis(), 60f32.to_radians());
        bodies[1].angular_velocity = Vec3::new(0.0, -5.0, 0.0);
        hinge.pre_solve(&mut bodies, 1.0 / 60.0);
        hinge.solve(&mut bodies);

        assert_relative_eq!(bodies[1].angular_velocity.y, -5.0, epsilon = 1e-4);
    }
}

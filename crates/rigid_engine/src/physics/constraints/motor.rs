//! Motor: a hinge whose relative spin about the axis is driven to a target

use super::{
    apply_lambda, joint_bodies, rotation_error, set_distance_row, set_quaternion_row, set_row, solve_rows, Anchors,
    ConstraintSolver, Jacobian, JointFrame, JOINT_BETA,
};
use crate::foundation::math::{utils, SVector, Vec3};
use crate::physics::body::Body;

/// Drives body B around the axis at `speed` radians per second relative to A.
///
/// The motor is rebuilt from scratch every step and carries no impulse
/// between steps.
#[derive(Debug, Clone)]
pub struct MotorConstraint {
    /// Attachment; `axis_a` is the drive axis
    pub frame: JointFrame,
    /// Target relative spin of B about the axis
    pub speed: f32,
    jacobian: Jacobian<4>,
    bias: SVector<f32, 4>,
}

impl MotorConstraint {
    /// Motor over `frame` turning at `speed`
    pub fn new(frame: JointFrame, speed: f32) -> Self {
        Self {
            frame,
            speed,
            jacobian: Jacobian::zeros(),
            bias: SVector::zeros(),
        }
    }
}

impl ConstraintSolver for MotorConstraint {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };
        let anchors = Anchors::new(body_a, body_b, &self.frame.anchor_a, &self.frame.anchor_b);
        let error = rotation_error(body_a, body_b, &self.frame.q0);
        let (u, v) = utils::orthonormal_basis(&self.frame.axis_a);
        let axis = body_a.orientation * self.frame.axis_a;

        self.jacobian = Jacobian::zeros();
        set_distance_row(&mut self.jacobian, 0, &anchors);
        set_quaternion_row(&mut self.jacobian, 1, body_a, body_b, &self.frame.q0, &u);
        set_quaternion_row(&mut self.jacobian, 2, body_a, body_b, &self.frame.q0, &v);
        set_row(&mut self.jacobian, 3, &Vec3::zeros(), &-axis, &Vec3::zeros(), &axis);

        let beta = JOINT_BETA / dt;
        self.bias = SVector::<f32, 4>::new(
            beta * (anchors.b - anchors.a).norm_squared(),
            beta * u.dot(&error.imag()),
            beta * v.dot(&error.imag()),
            -self.speed,
        );
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        let lambda = solve_rows(&self.jacobian, body_a, body_b, &self.bias);
        apply_lambda(&self.jacobian, body_a, body_b, &lambda);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::create_test_pair;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_drives_relative_spin() {
        let mut bodies = create_test_pair();
        let anchor = bodies[1].position;
        let frame = JointFrame::new(&bodies, 0, 1, anchor, Vec3::z()).unwrap();
        let mut motor = MotorConstraint::new(frame, 2.0);

        bodies[1].angular_velocity = Vec3::new(0.5, 0.0, 0.0);

        motor.pre_solve(&mut bodies, 1.0 / 60.0);
        for _ in 0..5 {
            motor.solve(&mut bodies);
        }
        motor.post_solve();

        assert_relative_eq!(bodies[1].angular_velocity, Vec3::new(0.0, 0.0, 2.0), epsilon = 1e-4);
    }

    #[test]
    fn test_reversed_speed() {
        let mut bodies = create_test_pair();
        let anchor = bodies[1].position;
        let frame = JointFrame::new(&bodies, 0, 1, anchor, Vec3::z()).unwrap();
        let mut motor = MotorConstraint::new(frame, -1.5);

        motor.pre_solve(&mut bodies, 1.0 / 60.0);
        motor.solve(&mut bodies);

        assert_relative_eq!(bodies[1].angular_velocity.z, -1.5, epsilon = 1e-4);
    }
}

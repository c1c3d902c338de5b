//! Weld joint: anchors together and relative rotation locked on all axes

use super::{
    apply_lambda, joint_bodies, rotation_error, scrub_cache, set_distance_row, set_quaternion_row, solve_rows,
    Anchors, ConstraintSolver, Jacobian, JointFrame, JOINT_BETA, JOINT_CACHE_LIMIT,
};
use crate::foundation::math::{SVector, Vec3};
use crate::physics::body::Body;

/// Holds two bodies at their creation pose relative to each other
#[derive(Debug, Clone)]
pub struct OrientationConstraint {
    /// Attachment; the axis is unused since every direction is locked
    pub frame: JointFrame,
    jacobian: Jacobian<4>,
    cached_lambda: SVector<f32, 4>,
    bias: SVector<f32, 4>,
}

impl OrientationConstraint {
    /// Weld over `frame`
    pub fn new(frame: JointFrame) -> Self {
        Self {
            frame,
            jacobian: Jacobian::zeros(),
            cached_lambda: SVector::zeros(),
            bias: SVector::zeros(),
        }
    }
}

impl ConstraintSolver for OrientationConstraint {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };
        let anchors = Anchors::new(body_a, body_b, &self.frame.anchor_a, &self.frame.anchor_b);
        let error = rotation_error(body_a, body_b, &self.frame.q0);

        self.jacobian = Jacobian::zeros();
        set_distance_row(&mut self.jacobian, 0, &anchors);
        self.bias[0] = JOINT_BETA / dt * anchors.distance_error();

        for (i, axis) in [Vec3::x(), Vec3::y(), Vec3::z()].iter().enumerate() {
            set_quaternion_row(&mut self.jacobian, i + 1, body_a, body_b, &self.frame.q0, axis);
            self.bias[i + 1] = JOINT_BETA / dt * axis.dot(&error.imag());
        }

        apply_lambda(&self.jacobian, body_a, body_b, &self.cached_lambda);
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        let lambda = solve_rows(&self.jacobian, body_a, body_b, &self.bias);
        apply_lambda(&self.jacobian, body_a, body_b, &lambda);
        self.cached_lambda += lambda;
    }

    fn post_solve(&mut self) {
        scrub_cache(&mut self.cached_lambda, JOINT_CACHE_LIMIT);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::create_test_pair;
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    #[test]
    fn test_spin_is_cancelled_at_rest_pose() {
        let mut bodies = create_test_pair();
        let anchor = bodies[1].position;
        let frame = JointFrame::new(&bodies, 0, 1, anchor, Vec3::z()).unwrap();
        let mut weld = OrientationConstraint::new(frame);

        bodies[1].angular_velocity = Vec3::new(1.0, -2.0, 3.0);

        weld.pre_solve(&mut bodies, 1.0 / 60.0);
        for _ in 0..5 {
            weld.solve(&mut bodies);
        }
        weld.post_solve();

        assert_relative_eq!(bodies[1].angular_velocity, Vec3::zeros(), epsilon = 1e-4);
    }

    #[test]
    fn test_twisted_body_is_rotated_back() {
        let mut bodies = create_test_pair();
        let anchor = bodies[1].position;
        let frame = JointFrame::new(&bodies, 0, 1, anchor, Vec3::z()).unwrap();
        let mut weld = OrientationConstraint::new(frame);

        bodies[1].orientation = Quat::from_axis_angle(&Vec3::z_axis(), 20f32.to_radians());

        weld.pre_solve(&mut bodies, 1.0 / 60.0);
        for _ in 0..5 {
            weld.solve(&mut bodies);
        }

        let spin = bodies[1].angular_velocity;
        assert!(spin.z < 0.0);
        assert_relative_eq!(spin.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(spin.y, 0.0, epsilon = 1e-4);
    }
}

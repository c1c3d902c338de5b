//! Ball-and-socket constraint holding two anchors together

use super::{
    apply_lambda, joint_bodies, set_distance_row, solve_rows, scrub_cache, Anchors, ConstraintSolver, Jacobian,
    JointFrame, JOINT_BETA,
};
use crate::foundation::math::SVector;
use crate::physics::body::Body;

/// Bound on the cached impulse of a distance joint
const DISTANCE_CACHE_LIMIT: f32 = 1e5;

/// Keeps the anchors of two bodies coincident; rotation is free
#[derive(Debug, Clone)]
pub struct DistanceConstraint {
    /// Attachment
    pub frame: JointFrame,
    jacobian: Jacobian<1>,
    cached_lambda: SVector<f32, 1>,
    baumgarte: f32,
}

impl DistanceConstraint {
    /// Joint over `frame`
    pub fn new(frame: JointFrame) -> Self {
        Self {
            frame,
            jacobian: Jacobian::zeros(),
            cached_lambda: SVector::zeros(),
            baumgarte: 0.0,
        }
    }

    /// Accumulated impulse carried into the next step
    pub fn cached_lambda(&self) -> f32 {
        self.cached_lambda[0]
    }
}

impl ConstraintSolver for DistanceConstraint {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };
        let anchors = Anchors::new(body_a, body_b, &self.frame.anchor_a, &self.frame.anchor_b);

        self.jacobian = Jacobian::zeros();
        set_distance_row(&mut self.jacobian, 0, &anchors);

        apply_lambda(&self.jacobian, body_a, body_b, &self.cached_lambda);

        self.baumgarte = JOINT_BETA / dt * anchors.distance_error();
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        let Some((body_a, body_b)) = joint_bodies(bodies, &self.frame) else {
            return;
        };

        let bias = SVector::<f32, 1>::new(self.baumgarte);
        let lambda = solve_rows(&self.jacobian, body_a, body_b, &bias);
        apply_lambda(&self.jacobian, body_a, body_b, &lambda);
        self.cached_lambda += lambda;
    }

    fn post_solve(&mut self) {
        scrub_cache(&mut self.cached_lambda, DISTANCE_CACHE_LIMIT);
    }
}

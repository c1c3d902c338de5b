//! Kinematic driver that swings a single body back and forth

use super::ConstraintSolver;
use crate::foundation::math::Vec3;
use crate::physics::body::Body;
use crate::physics::BodyHandle;

/// Angular frequency of the oscillation in radians per second
const MOVER_FREQUENCY: f32 = 0.25;

/// Peak speed of the oscillation
const MOVER_AMPLITUDE: f32 = 4.0;

/// Overwrites one velocity component of a body with `cos(0.25 t) * 4`
#[derive(Debug, Clone)]
pub struct MoverConstraint {
    /// Driven body
    pub body: BodyHandle,
    /// Unit direction of the driven velocity component
    pub axis: Vec3,
    time: f32,
}

impl MoverConstraint {
    /// Mover along the world y axis
    pub fn new(body: BodyHandle) -> Self {
        Self {
            body,
            axis: Vec3::y(),
            time: 0.0,
        }
    }

    /// Drive along `axis` instead
    #[must_use]
    pub fn with_axis(mut self, axis: Vec3) -> Self {
        self.axis = axis.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
        self
    }

    /// Time accumulated so far
    pub const fn time(&self) -> f32 {
        self.time
    }
}

impl ConstraintSolver for MoverConstraint {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        self.time += dt;

        let Some(body) = bodies.get_mut(self.body) else {
            return;
        };
        let target = (self.time * MOVER_FREQUENCY).cos() * MOVER_AMPLITUDE;
        let along = body.linear_velocity.dot(&self.axis);
        body.linear_velocity += self.axis * (target - along);
    }

    fn solve(&mut self, _bodies: &mut [Body]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::shapes::{BoxShape, Shape};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn platform() -> Vec<Body> {
        vec![Body::new(Arc::new(Shape::Box(BoxShape::new(Vec3::new(3.0, 3.0, 0.25)))))
            .with_linear_velocity(Vec3::new(1.0, 7.0, -2.0))]
    }

    #[test]
    fn test_sets_only_the_driven_component() {
        let mut bodies = platform();
        let mut mover = MoverConstraint::new(0);

        mover.pre_solve(&mut bodies, 2.0);

        assert_relative_eq!(mover.time(), 2.0);
        assert_relative_eq!(
            bodies[0].linear_velocity,
            Vec3::new(1.0, 0.5f32.cos() * 4.0, -2.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_custom_axis() {
        let mut bodies = platform();
        let mut mover = MoverConstraint::new(0).with_axis(Vec3::new(0.0, 0.0, 3.0));

        mover.pre_solve(&mut bodies, 0.0);
        assert_relative_eq!(bodies[0].linear_velocity, Vec3::new(1.0, 7.0, 4.0), epsilon = 1e-6);
    }

    #[test]
    fn test_missing_body_still_advances_time() {
        let mut bodies: Vec<Body> = Vec::new();
        let mut mover = MoverConstraint::new(3);
        mover.pre_solve(&mut bodies, 0.5);
        assert_relative_eq!(mover.time(), 0.5);
    }
}

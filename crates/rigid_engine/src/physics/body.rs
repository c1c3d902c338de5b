//! Rigid body state and integration
//!
//! A body's `position` is the world location of its body-frame origin, which
//! is not necessarily its center of mass. Angular motion is always taken
//! about the center of mass.

use std::sync::Arc;

use crate::foundation::math::{Mat3, Quat, Transform, Vec3};
use crate::physics::bounds::Bounds;
use crate::physics::shapes::Shape;

/// Angular speed cap in rad/s, applied after every angular impulse and update
pub const MAX_ANGULAR_SPEED: f32 = 30.0;

/// Rigid body
#[derive(Debug, Clone)]
pub struct Body {
    /// World position of the body origin
    pub position: Vec3,
    /// World orientation
    pub orientation: Quat,
    /// Linear velocity in m/s
    pub linear_velocity: Vec3,
    /// World-space angular velocity in rad/s
    pub angular_velocity: Vec3,
    /// Inverse mass; zero makes the body static
    pub inv_mass: f32,
    /// Coefficient of restitution, multiplied pairwise
    pub elasticity: f32,
    /// Friction coefficient, multiplied pairwise
    pub friction: f32,
    /// Shared collision shape
    pub shape: Arc<Shape>,
}

impl Body {
    /// Create a static body at the origin
    pub fn new(shape: Arc<Shape>) -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            inv_mass: 0.0,
            elasticity: 0.5,
            friction: 0.5,
            shape,
        }
    }

    /// Set position
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set orientation
    #[must_use]
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set linear velocity
    #[must_use]
    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    /// Set angular velocity
    #[must_use]
    pub fn with_angular_velocity(mut self, velocity: Vec3) -> Self {
        self.angular_velocity = velocity;
        self
    }

    /// Set inverse mass (0 = static)
    #[must_use]
    pub fn with_inv_mass(mut self, inv_mass: f32) -> Self {
        self.inv_mass = inv_mass;
        self
    }

    /// Set elasticity
    #[must_use]
    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.elasticity = elasticity;
        self
    }

    /// Set friction
    #[must_use]
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// True for bodies with infinite mass
    pub fn is_static(&self) -> bool {
        self.inv_mass == 0.0
    }

    /// Position and rotation for rendering
    pub const fn transform(&self) -> Transform {
        Transform::from_position_rotation(self.position, self.orientation)
    }

    /// Center of mass in world space
    pub fn center_of_mass_world(&self) -> Vec3 {
        self.position + self.orientation * self.shape.center_of_mass()
    }

    /// Convert a world point into the body's center-of-mass frame
    pub fn world_to_body(&self, world_point: &Vec3) -> Vec3 {
        self.orientation.inverse_transform_vector(&(world_point - self.center_of_mass_world()))
    }

    /// Convert a point in the center-of-mass frame into world space
    pub fn body_to_world(&self, body_point: &Vec3) -> Vec3 {
        self.center_of_mass_world() + self.orientation * body_point
    }

    /// World bounds at the current placement
    pub fn bounds(&self) -> Bounds {
        self.shape.bounds(&self.position, &self.orientation)
    }

    /// Inverse inertia tensor in body space, scaled by inverse mass
    pub fn inverse_inertia_body(&self) -> Mat3 {
        if self.is_static() {
            return Mat3::zeros();
        }
        self.shape
            .inertia_tensor()
            .try_inverse()
            .map_or_else(Mat3::zeros, |inverse| inverse * self.inv_mass)
    }

    /// Inverse inertia tensor in world space, scaled by inverse mass
    pub fn inverse_inertia_world(&self) -> Mat3 {
        let rotation = self.orientation.to_rotation_matrix();
        rotation.matrix() * self.inverse_inertia_body() * rotation.matrix().transpose()
    }

    /// Apply a world-space impulse at a world-space point
    pub fn apply_impulse(&mut self, point: &Vec3, impulse: &Vec3) {
        if self.is_static() {
            return;
        }

        self.apply_impulse_linear(impulse);

        let r = point - self.center_of_mass_world();
        self.apply_impulse_angular(&r.cross(impulse));
    }

    /// Apply a linear impulse through the center of mass
    pub fn apply_impulse_linear(&mut self, impulse: &Vec3) {
        if self.is_static() {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
    }

    /// Apply an angular impulse (change in angular momentum)
    pub fn apply_impulse_angular(&mut self, impulse: &Vec3) {
        if self.is_static() {
            return;
        }

        self.angular_velocity += self.inverse_inertia_world() * impulse;
        self.angular_velocity = clamp_angular_speed(self.angular_velocity);
    }

    /// Advance the body by `dt` seconds with its current velocities
    ///
    /// Steps that would produce a non-finite state leave the body untouched.
    pub fn update(&mut self, dt: f32) {
        let position = self.position + self.linear_velocity * dt;

        // Rotate about the center of mass, then carry the origin along
        let com_to_origin = -(self.orientation * self.shape.center_of_mass());
        let com = position - com_to_origin;

        // Gyroscopic term: alpha = I^-1 (w x I w)
        let mut angular_velocity = self.angular_velocity;
        let rotation = self.orientation.to_rotation_matrix();
        let inertia = rotation.matrix() * self.shape.inertia_tensor() * rotation.matrix().transpose();
        if let Some(inverse) = inertia.try_inverse() {
            let alpha = inverse * angular_velocity.cross(&(inertia * angular_velocity));
            if is_finite(&alpha) {
                angular_velocity += alpha * dt;
            }
        }
        let angular_velocity = clamp_angular_speed(angular_velocity);

        let delta = Quat::from_scaled_axis(angular_velocity * dt);
        let mut orientation = delta * self.orientation;
        orientation.renormalize();
        let position = com + delta * com_to_origin;
        if !is_finite(&position) || !orientation.coords.iter().all(|v| v.is_finite()) {
            return;
        }

        self.angular_velocity = angular_velocity;
        self.orientation = orientation;
        self.position = position;
    }
}

fn is_finite(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

fn clamp_angular_speed(angular_velocity: Vec3) -> Vec3 {
    if angular_velocity.norm_squared() > MAX_ANGULAR_SPEED * MAX_ANGULAR_SPEED {
        angular_velocity.normalize() * MAX_ANGULAR_SPEED
    } else {
        angular_velocity
    }
}

/// Borrow two distinct bodies mutably
pub fn body_pair_mut(bodies: &mut [Body], a: usize, b: usize) -> Option<(&mut Body, &mut Body)> {
    if a == b || a >= bodies.len() || b >= bodies.len() {
        return None;
    }

    if a < b {
        let (head, tail) = bodies.split_at_mut(b);
        Some((&mut head[a], &mut tail[0]))
    } else {
        let (head, tail) = bodies.split_at_mut(a);
        Some((&mut tail[0], &mut head[b]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::shapes::BoxShape;
    use approx::assert_relative_eq;

    fn create_test_body() -> Body {
        Body::new(Arc::new(Shape::Box(BoxShape::new(Vec3::new(1.0, 0.5, 0.25)))))
            .with_position(Vec3::new(0.0, 0.0, 3.0))
            .with_inv_mass(1.0)
    }

    #[test]
    fn test_static_body_ignores_impulses() {
        let mut body = create_test_body().with_inv_mass(0.0);
        body.apply_impulse(&Vec3::new(1.0, 0.0, 3.0), &Vec3::new(0.0, 100.0, 0.0));
        body.apply_impulse_linear(&Vec3::new(5.0, 0.0, 0.0));
        body.apply_impulse_angular(&Vec3::new(0.0, 0.0, 5.0));

        assert_eq!(body.linear_velocity, Vec3::zeros());
        assert_eq!(body.angular_velocity, Vec3::zeros());
    }

    #[test]
    fn test_angular_speed_is_capped() {
        let mut body = create_test_body();
        body.apply_impulse(&Vec3::new(1.0, 0.0, 3.0), &Vec3::new(0.0, 1.0e4, 0.0));

        assert!(body.angular_velocity.norm() <= MAX_ANGULAR_SPEED + 1e-3);
        assert_relative_eq!(body.linear_velocity.y, 1.0e4);
    }

    #[test]
    fn test_orientation_stays_normalized() {
        let mut body = create_test_body().with_angular_velocity(Vec3::new(3.0, -7.0, 11.0));
        for _ in 0..500 {
            body.update(1.0 / 60.0);
        }
        assert_relative_eq!(body.orientation.quaternion().norm(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_spinning_asymmetric_box_stays_bounded() {
        let mut body = create_test_body().with_angular_velocity(Vec3::new(3.0, -7.0, 11.0));
        for step in 0..2000 {
            body.update(1.0 / 60.0);
            assert!(
                body.angular_velocity.norm() <= MAX_ANGULAR_SPEED + 1e-3,
                "step {step}: |w| = {}",
                body.angular_velocity.norm()
            );
            assert!(body.orientation.coords.iter().all(|v| v.is_finite()));
            assert!(body.position.iter().all(|v| v.is_finite()));
        }
        assert_relative_eq!(body.orientation.quaternion().norm(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_non_finite_step_leaves_body_untouched() {
        let mut body = create_test_body().with_angular_velocity(Vec3::new(f32::INFINITY, 0.0, 0.0));
        let before = body.clone();
        body.update(1.0 / 60.0);

        assert_eq!(body.orientation, before.orientation);
        assert_eq!(body.position, before.position);
        assert!(body.orientation.coords.iter().all(|v| v.is_finite()));

        let mut runaway = create_test_body().with_linear_velocity(Vec3::new(f32::NAN, 0.0, 0.0));
        runaway.update(1.0 / 60.0);
        assert_eq!(runaway.position, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn test_world_body_roundtrip() {
        let body = create_test_body()
            .with_orientation(Quat::from_axis_angle(&Vec3::y_axis(), 0.7));
        let point = Vec3::new(0.3, -2.0, 1.5);

        assert_relative_eq!(body.body_to_world(&body.world_to_body(&point)), point, epsilon = 1e-5);
    }

    #[test]
    fn test_inverse_inertia_world_follows_rotation() {
        let body = create_test_body()
            .with_orientation(Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2));
        let world = body.inverse_inertia_world();
        let local = body.inverse_inertia_body();

        // A quarter turn about Z swaps the X and Y principal axes
        assert_relative_eq!(world[(0, 0)], local[(1, 1)], epsilon = 1e-4);
        assert_relative_eq!(world[(1, 1)], local[(0, 0)], epsilon = 1e-4);
    }

    #[test]
    fn test_body_pair_mut() {
        let mut bodies = vec![create_test_body(), create_test_body(), create_test_body()];
        let (a, b) = body_pair_mut(&mut bodies, 2, 0).unwrap();
        a.inv_mass = 2.0;
        b.inv_mass = 3.0;

        assert_eq!(bodies[2].inv_mass, 2.0);
        assert_eq!(bodies[0].inv_mass, 3.0);
        assert!(body_pair_mut(&mut bodies, 1, 1).is_none());
        assert!(body_pair_mut(&mut bodies, 0, 3).is_none());
    }
}

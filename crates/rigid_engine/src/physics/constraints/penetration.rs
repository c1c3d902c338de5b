//! Contact constraint: one non-penetration row plus two friction rows

use super::{apply_lambda, set_row, solve_rows, ConstraintSolver, Jacobian};
use crate::foundation::math::{utils, SVector, Vec3};
use crate::physics::body::{body_pair_mut, Body};
use crate::physics::contact::Contact;
use crate::physics::BodyHandle;

/// Baumgarte factor for penetration recovery
const PENETRATION_BETA: f32 = 0.25;

/// Penetration allowed before the bias pushes back
const PENETRATION_SLOP: f32 = 0.02;

/// Gravity-scale factor in the friction bound
const FRICTION_GRAVITY: f32 = 10.0;

/// Non-penetration with Coulomb-style friction at one contact point
#[derive(Debug, Clone)]
pub struct PenetrationConstraint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    anchor_a: Vec3,
    anchor_b: Vec3,
    /// Contact normal in A's frame, pointing from A to B
    normal: Vec3,
    friction: f32,
    jacobian: Jacobian<3>,
    cached_lambda: SVector<f32, 3>,
    baumgarte: f32,
}

impl PenetrationConstraint {
    /// Constraint for a contact. `body_a` must be the contact's A body.
    pub fn new(contact: &Contact, body_a: &Body) -> Self {
        let normal = body_a
            .orientation
            .inverse_transform_vector(&-contact.normal)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::z);

        Self {
            body_a: contact.body_a,
            body_b: contact.body_b,
            anchor_a: contact.local_on_a,
            anchor_b: contact.local_on_b,
            normal,
            friction: 0.0,
            jacobian: Jacobian::zeros(),
            cached_lambda: SVector::zeros(),
            baumgarte: 0.0,
        }
    }

    /// First body
    pub const fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// Second body
    pub const fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// Normal in A's frame, pointing from A to B
    pub const fn local_normal(&self) -> Vec3 {
        self.normal
    }

    /// Accumulated impulses: normal, then the two friction directions
    pub const fn cached_lambda(&self) -> SVector<f32, 3> {
        self.cached_lambda
    }
}

impl ConstraintSolver for PenetrationConstraint {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        let Some((body_a, body_b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };

        let a = body_a.body_to_world(&self.anchor_a);
        let b = body_b.body_to_world(&self.anchor_b);
        let ra = a - body_a.center_of_mass_world();
        let rb = b - body_b.center_of_mass_world();

        self.friction = body_a.friction * body_b.friction;

        let (u, v) = utils::orthonormal_basis(&self.normal);
        let normal = body_a.orientation * self.normal;
        let u = body_a.orientation * u;
        let v = body_a.orientation * v;

        self.jacobian = Jacobian::zeros();
        set_row(&mut self.jacobian, 0, &-normal, &ra.cross(&-normal), &normal, &rb.cross(&normal));
        if self.friction > 0.0 {
            set_row(&mut self.jacobian, 1, &-u, &ra.cross(&-u), &u, &rb.cross(&u));
            set_row(&mut self.jacobian, 2, &-v, &ra.cross(&-v), &v, &rb.cross(&v));
        }

        // Warm start
        apply_lambda(&self.jacobian, body_a, body_b, &self.cached_lambda);

        let c = ((b - a).dot(&normal) + PENETRATION_SLOP).min(0.0);
        self.baumgarte = PENETRATION_BETA * c / dt;
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        let Some((body_a, body_b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };

        let bias = SVector::<f32, 3>::new(self.baumgarte, 0.0, 0.0);
        let lambda = solve_rows(&self.jacobian, body_a, body_b, &bias);

        // Accumulate, then clamp the totals
        let old_lambda = self.cached_lambda;
        self.cached_lambda += lambda;
        self.cached_lambda[0] = self.cached_lambda[0].max(0.0);

        if self.friction > 0.0 {
            let umg = self.friction * FRICTION_GRAVITY / (body_a.inv_mass + body_b.inv_mass);
            let normal_force = (lambda[0] * self.friction).abs();
            let max_force = umg.max(normal_force);

            self.cached_lambda[1] = self.cached_lambda[1].clamp(-max_force, max_force);
            self.cached_lambda[2] = self.cached_lambda[2].clamp(-max_force, max_force);
        }

        let applied = self.cached_lambda - old_lambda;
        apply_lambda(&self.jacobian, body_a, body_b, &applied);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::shapes::{BoxShape, Shape};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn box_on_ground() -> (Vec<Body>, Contact) {
        let bodies = vec![
            Body::new(Arc::new(Shape::Box(BoxShape::new(Vec3::new(10.0, 10.0, 0.5)))))
                .with_position(Vec3::new(0.0, 0.0, -0.5)),
            Body::new(Arc::new(Shape::Box(BoxShape::new(Vec3::repeat(0.5)))))
                .with_position(Vec3::new(0.0, 0.0, 0.49))
                .with_linear_velocity(Vec3::new(0.0, 0.0, -3.0))
                .with_inv_mass(1.0),
        ];

        let mut contact = Contact::empty(0, 1);
        contact.world_on_a = Vec3::new(0.0, 0.0, 0.0);
        contact.world_on_b = Vec3::new(0.0, 0.0, -0.01);
        // From the box (B) down towards the ground (A)
        contact.normal = Vec3::new(0.0, 0.0, -1.0);
        contact.record_local_points(&bodies[0], &bodies[1]);
        (bodies, contact)
    }

    #[test]
    fn test_normal_is_stored_from_a_to_b() {
        let (bodies, contact) = box_on_ground();
        let constraint = PenetrationConstraint::new(&contact, &bodies[0]);
        assert_relative_eq!(constraint.local_normal(), Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_stops_approach_and_never_pulls() {
        let (mut bodies, contact) = box_on_ground();
        let mut constraint = PenetrationConstraint::new(&contact, &bodies[0]);

        constraint.pre_solve(&mut bodies, 1.0 / 60.0);
        for _ in 0..5 {
            constraint.solve(&mut bodies);
        }
        constraint.post_solve();

        assert!(bodies[1].linear_velocity.z >= -1e-4);
        assert!(constraint.cached_lambda()[0] >= 0.0);
    }

    #[test]
    fn test_separating_body_is_left_alone() {
        let (mut bodies, contact) = box_on_ground();
        bodies[1].linear_velocity = Vec3::new(0.0, 0.0, 2.0);
        let mut constraint = PenetrationConstraint::new(&contact, &bodies[0]);

        constraint.pre_solve(&mut bodies, 1.0 / 60.0);
        constraint.solve(&mut bodies);

        // Within the slop there is no bias, so a separating body keeps its speed
        assert_relative_eq!(bodies[1].linear_velocity.z, 2.0, epsilon = 1e-4);
        assert_eq!(constraint.cached_lambda()[0], 0.0);
    }
}

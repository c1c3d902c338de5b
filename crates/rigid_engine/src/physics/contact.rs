//! Contacts and the discrete impulse response used for ballistic hits

use crate::foundation::math::Vec3;
use crate::physics::body::Body;
use crate::physics::BodyHandle;

/// Point of contact between two bodies found by the narrow phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// First body
    pub body_a: BodyHandle,
    /// Second body
    pub body_b: BodyHandle,
    /// Contact point on A in world space
    pub world_on_a: Vec3,
    /// Contact point on B in world space
    pub world_on_b: Vec3,
    /// Contact point on A in A's center-of-mass frame
    pub local_on_a: Vec3,
    /// Contact point on B in B's center-of-mass frame
    pub local_on_b: Vec3,
    /// World normal pointing from B towards A
    pub normal: Vec3,
    /// Positive gap or negative penetration depth
    pub separation: f32,
    /// Seconds into the step at which the bodies touch
    pub time_of_impact: f32,
}

impl Contact {
    /// Contact between `a` and `b` with every geometric field zeroed
    pub fn empty(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            world_on_a: Vec3::zeros(),
            world_on_b: Vec3::zeros(),
            local_on_a: Vec3::zeros(),
            local_on_b: Vec3::zeros(),
            normal: Vec3::zeros(),
            separation: 0.0,
            time_of_impact: 0.0,
        }
    }

    /// The same contact seen from B's side
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            body_a: self.body_b,
            body_b: self.body_a,
            world_on_a: self.world_on_b,
            world_on_b: self.world_on_a,
            local_on_a: self.local_on_b,
            local_on_b: self.local_on_a,
            normal: -self.normal,
            ..*self
        }
    }

    /// Fill in the body-frame points from the current body placements
    pub fn record_local_points(&mut self, body_a: &Body, body_b: &Body) {
        self.local_on_a = body_a.world_to_body(&self.world_on_a);
        self.local_on_b = body_b.world_to_body(&self.world_on_b);
    }

    /// True for contacts that start touching part way through the step
    pub fn is_ballistic(&self) -> bool {
        self.time_of_impact > 0.0
    }
}

/// Resolve a contact with one restitution impulse, one kinetic friction
/// impulse, and (for contacts already touching at the start of the step) a
/// positional correction split by inverse mass.
pub fn resolve_contact(contact: &Contact, body_a: &mut Body, body_b: &mut Body) {
    let on_a = body_a.body_to_world(&contact.local_on_a);
    let on_b = body_b.body_to_world(&contact.local_on_b);

    let elasticity = body_a.elasticity * body_b.elasticity;
    let inv_mass_a = body_a.inv_mass;
    let inv_mass_b = body_b.inv_mass;
    let inv_mass_sum = inv_mass_a + inv_mass_b;
    if inv_mass_sum == 0.0 {
        return;
    }

    let inv_inertia_a = body_a.inverse_inertia_world();
    let inv_inertia_b = body_b.inverse_inertia_world();

    let n = contact.normal;
    let ra = on_a - body_a.center_of_mass_world();
    let rb = on_b - body_b.center_of_mass_world();

    let angular_a = (inv_inertia_a * ra.cross(&n)).cross(&ra);
    let angular_b = (inv_inertia_b * rb.cross(&n)).cross(&rb);
    let angular_factor = (angular_a + angular_b).dot(&n);

    let vel_a = body_a.linear_velocity + body_a.angular_velocity.cross(&ra);
    let vel_b = body_b.linear_velocity + body_b.angular_velocity.cross(&rb);
    let vab = vel_a - vel_b;

    // Restitution
    let impulse_j = (1.0 + elasticity) * vab.dot(&n) / (inv_mass_sum + angular_factor);
    let impulse = n * impulse_j;
    body_a.apply_impulse(&on_a, &-impulse);
    body_b.apply_impulse(&on_b, &impulse);

    // Kinetic friction along the tangential relative velocity
    let friction = body_a.friction * body_b.friction;
    let vel_tangent = vab - n * n.dot(&vab);
    if let Some(tangent) = vel_tangent.try_normalize(f32::EPSILON) {
        let inertia_a = (inv_inertia_a * ra.cross(&tangent)).cross(&ra);
        let inertia_b = (inv_inertia_b * rb.cross(&tangent)).cross(&rb);
        let inv_inertia = (inertia_a + inertia_b).dot(&tangent);

        let reduced_mass = 1.0 / (inv_mass_sum + inv_inertia);
        let impulse_friction = vel_tangent * reduced_mass * friction;
        body_a.apply_impulse(&on_a, &-impulse_friction);
        body_b.apply_impulse(&on_b, &impulse_friction);
    }

    // Push overlapping bodies apart
    if contact.time_of_impact == 0.0 {
        let ds = on_b - on_a;
        body_a.position += ds * (inv_mass_a / inv_mass_sum);
        body_b.position -= ds * (inv_mass_b / inv_mass_sum);
    }
}

//! Narrow phase
//!
//! Sphere pairs are handled analytically, including an exact time of impact
//! from a swept ray test. Every other pair goes through GJK, with conservative
//! advancement to find the first moment of contact within the step.

use crate::foundation::math::{Quat, Vec3};
use crate::physics::body::Body;
use crate::physics::broad_phase::CollisionPair;
use crate::physics::contact::Contact;
use crate::physics::gjk;

/// Shapes are inflated by this much before polytope expansion
pub const GJK_BIAS: f32 = 0.001;

/// Conservative advancement gives up after this many steps
pub const MAX_ADVANCE_ITERATIONS: usize = 10;

/// Rays shorter than this fall back to an overlap test
const MIN_SWEEP_LENGTH: f32 = 0.001;

/// Slack added to the radius sum of the overlap fallback
const SPHERE_SLOP: f32 = 0.001;

/// A ray for ray casting and swept tests
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray; not necessarily normalized
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and a normalized direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros),
        }
    }

    /// Ray from `start` to `end`; parameter 1 lands on `end`
    pub fn segment(start: Vec3, end: Vec3) -> Self {
        Self { origin: start, direction: end - start }
    }

    /// Get a point along the ray at parameter t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Entry and exit parameters of the ray against a sphere, or `None` if
    /// the line misses it. Either parameter may be negative.
    pub fn intersect_sphere(&self, center: &Vec3, radius: f32) -> Option<(f32, f32)> {
        let m = center - self.origin;
        let a = self.direction.dot(&self.direction);
        let b = m.dot(&self.direction);
        let c = m.dot(&m) - radius * radius;

        let delta = b * b - a * c;
        if delta < 0.0 || a == 0.0 {
            return None;
        }

        let root = delta.sqrt();
        Some(((b - root) / a, (b + root) / a))
    }
}

/// Earliest time within `dt` at which two moving spheres touch, with the
/// touching points on each surface at that time
pub fn sphere_sphere_dynamic(
    radius_a: f32,
    radius_b: f32,
    pos_a: &Vec3,
    pos_b: &Vec3,
    vel_a: &Vec3,
    vel_b: &Vec3,
    dt: f32,
) -> Option<(Vec3, Vec3, f32)> {
    let relative_velocity = vel_a - vel_b;
    let ray = Ray::segment(*pos_a, pos_a + relative_velocity * dt);
    let radius_sum = radius_a + radius_b;

    let (t0, t1) = if ray.direction.norm_squared() < MIN_SWEEP_LENGTH * MIN_SWEEP_LENGTH {
        // Too short to sweep, just check if already overlapping
        let radius = radius_sum + SPHERE_SLOP;
        if (pos_b - pos_a).norm_squared() > radius * radius {
            return None;
        }
        (0.0, 0.0)
    } else {
        ray.intersect_sphere(pos_b, radius_sum)?
    };

    // Parameters are in [0, 1] along the sweep; convert to seconds
    let (t0, t1) = (t0 * dt, t1 * dt);
    if t1 < 0.0 {
        return None;
    }

    let toi = t0.max(0.0);
    if toi > dt {
        return None;
    }

    let new_pos_a = pos_a + vel_a * toi;
    let new_pos_b = pos_b + vel_b * toi;
    let ab = (new_pos_b - new_pos_a).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);

    Some((new_pos_a + ab * radius_a, new_pos_b - ab * radius_b, toi))
}

/// Surface points of two spheres along their line of centres and whether
/// they overlap
pub fn sphere_sphere_static(radius_a: f32, radius_b: f32, pos_a: &Vec3, pos_b: &Vec3) -> (bool, Vec3, Vec3) {
    let ab = pos_b - pos_a;
    let norm = ab.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);

    let on_a = pos_a + norm * radius_a;
    let on_b = pos_b - norm * radius_b;

    let radius_sum = radius_a + radius_b;
    (ab.norm_squared() <= radius_sum * radius_sum, on_a, on_b)
}

/// Outcome of a static (time zero) query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Proximity {
    /// Shapes overlap; the contact carries the deepest points
    Penetrating(Contact),
    /// Shapes are apart; the contact carries the closest points and the gap
    Separated(Contact),
}

impl Proximity {
    /// The contact regardless of outcome
    pub const fn contact(&self) -> &Contact {
        match self {
            Self::Penetrating(contact) | Self::Separated(contact) => contact,
        }
    }
}

/// Test two bodies at their current placement
pub fn intersect_static(pair: CollisionPair, body_a: &Body, body_b: &Body) -> Proximity {
    let mut contact = Contact::empty(pair.a, pair.b);

    if let (Some(radius_a), Some(radius_b)) = (body_a.shape.radius(), body_b.shape.radius()) {
        let (hit, on_a, on_b) = sphere_sphere_static(radius_a, radius_b, &body_a.position, &body_b.position);
        contact.world_on_a = on_a;
        contact.world_on_b = on_b;
        contact.record_local_points(body_a, body_b);
        contact.normal = (body_a.position - body_b.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::z);
        contact.separation = (body_b.position - body_a.position).norm() - (radius_a + radius_b);

        return if hit {
            Proximity::Penetrating(contact)
        } else {
            Proximity::Separated(contact)
        };
    }

    if let Some((mut on_a, mut on_b)) = gjk::penetration(body_a, body_b, GJK_BIAS) {
        let normal = (on_b - on_a).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);
        on_a -= normal * GJK_BIAS;
        on_b += normal * GJK_BIAS;

        contact.normal = normal;
        contact.world_on_a = on_a;
        contact.world_on_b = on_b;
        contact.record_local_points(body_a, body_b);
        contact.separation = -(on_a - on_b).norm();
        return Proximity::Penetrating(contact);
    }

    let (on_a, on_b) = gjk::closest_points(body_a, body_b);
    contact.world_on_a = on_a;
    contact.world_on_b = on_b;
    contact.record_local_points(body_a, body_b);
    contact.normal = (on_a - on_b).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);
    contact.separation = (on_a - on_b).norm();
    Proximity::Separated(contact)
}

/// Kinematic state saved before a query steps a body forward
#[derive(Debug, Clone, Copy)]
struct Placement {
    position: Vec3,
    orientation: Quat,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
}

impl Placement {
    fn capture(body: &Body) -> Self {
        Self {
            position: body.position,
            orientation: body.orientation,
            linear_velocity: body.linear_velocity,
            angular_velocity: body.angular_velocity,
        }
    }

    fn restore(&self, body: &mut Body) {
        body.position = self.position;
        body.orientation = self.orientation;
        body.linear_velocity = self.linear_velocity;
        body.angular_velocity = self.angular_velocity;
    }
}

/// Advance both bodies towards each other until they touch or the step runs
/// out. The bodies are always returned to their starting placement.
pub fn conservative_advance(pair: CollisionPair, body_a: &mut Body, body_b: &mut Body, dt: f32) -> Option<Contact> {
    let start_a = Placement::capture(body_a);
    let start_b = Placement::capture(body_b);
    let mut remaining = dt;
    let mut toi = 0.0;
    let mut iterations = 0;
    let mut result = None;

    while remaining > 0.0 {
        let contact = match intersect_static(pair, body_a, body_b) {
            Proximity::Penetrating(mut contact) => {
                contact.time_of_impact = toi;
                result = Some(contact);
                break;
            }
            Proximity::Separated(contact) => contact,
        };

        iterations += 1;
        if iterations > MAX_ADVANCE_ITERATIONS {
            log::debug!(
                "Conservative advancement gave up on bodies {} and {} at t = {}",
                pair.a,
                pair.b,
                toi
            );
            break;
        }

        let ab = (contact.world_on_b - contact.world_on_a)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::zeros);

        // Closing speed along the separating direction, including rotation
        let relative_velocity = body_a.linear_velocity - body_b.linear_velocity;
        let ortho_speed = relative_velocity.dot(&ab)
            + body_a.shape.fastest_linear_speed(&body_a.angular_velocity, &ab)
            + body_b.shape.fastest_linear_speed(&body_b.angular_velocity, &-ab);
        if ortho_speed <= 0.0 {
            break;
        }

        let time_to_go = contact.separation / ortho_speed;
        if time_to_go > remaining {
            break;
        }

        remaining -= time_to_go;
        toi += time_to_go;
        body_a.update(time_to_go);
        body_b.update(time_to_go);
    }

    start_a.restore(body_a);
    start_b.restore(body_b);
    result
}

/// Find the first contact between two bodies within the next `dt` seconds.
///
/// Returned contacts hold body-frame points recorded at the time of impact;
/// the bodies themselves are left where they were.
pub fn intersect(pair: CollisionPair, body_a: &mut Body, body_b: &mut Body, dt: f32) -> Option<Contact> {
    let (Some(radius_a), Some(radius_b)) = (body_a.shape.radius(), body_b.shape.radius()) else {
        return conservative_advance(pair, body_a, body_b, dt);
    };

    let (on_a, on_b, toi) = sphere_sphere_dynamic(
        radius_a,
        radius_b,
        &body_a.position,
        &body_b.position,
        &body_a.linear_velocity,
        &body_b.linear_velocity,
        dt,
    )?;

    let mut contact = Contact::empty(pair.a, pair.b);
    contact.world_on_a = on_a;
    contact.world_on_b = on_b;
    contact.time_of_impact = toi;

    // Step forward to record body-frame points at the moment of impact
    let start_a = Placement::capture(body_a);
    let start_b = Placement::capture(body_b);
    body_a.update(toi);
    body_b.update(toi);
    contact.record_local_points(body_a, body_b);
    contact.normal = (body_a.position - body_b.position)
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vec3::z);
    start_a.restore(body_a);
    start_b.restore(body_b);

    contact.separation = (body_b.position - body_a.position).norm() - (radius_a + radius_b);
    Some(contact)
}

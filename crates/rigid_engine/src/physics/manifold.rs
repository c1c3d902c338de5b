//! Persistent contact manifolds
//!
//! A manifold keeps up to [`MAX_CONTACTS`] contacts between one body pair
//! across steps so their penetration constraints can be warm started. Points
//! that drift apart or separate are expired at the start of each step.

use crate::physics::body::Body;
use crate::physics::constraints::{ConstraintSolver, PenetrationConstraint};
use crate::physics::contact::Contact;
use crate::physics::BodyHandle;

/// Contacts kept per body pair
pub const MAX_CONTACTS: usize = 4;

/// Distance under which two contacts count as the same point, and the
/// tangential drift after which a contact expires
pub const CONTACT_TOLERANCE: f32 = 0.02;

/// A contact and the constraint solving it
#[derive(Debug, Clone)]
struct ManifoldPoint {
    contact: Contact,
    constraint: PenetrationConstraint,
}

/// Contacts between one pair of bodies
#[derive(Debug, Clone)]
pub struct Manifold {
    body_a: BodyHandle,
    body_b: BodyHandle,
    points: Vec<ManifoldPoint>,
}

impl Manifold {
    /// Empty manifold for an ordered body pair
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            points: Vec::with_capacity(MAX_CONTACTS),
        }
    }

    /// First body; every stored contact uses this as its A side
    pub const fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// Second body
    pub const fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// Whether this manifold is for the pair in either order
    pub const fn involves(&self, a: BodyHandle, b: BodyHandle) -> bool {
        (self.body_a == a && self.body_b == b) || (self.body_a == b && self.body_b == a)
    }

    /// Number of stored contacts
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no contacts remain
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Stored contacts
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.points.iter().map(|point| &point.contact)
    }

    /// Penetration constraints, in the same order as [`Self::contacts`]
    pub fn constraints(&self) -> impl Iterator<Item = &PenetrationConstraint> {
        self.points.iter().map(|point| &point.constraint)
    }

    /// Add a contact unless it duplicates an existing one.
    ///
    /// A full manifold keeps the four points that spread furthest from their
    /// common centroid. Returns whether the contact was stored.
    pub fn add_contact(&mut self, contact: &Contact, bodies: &[Body]) -> bool {
        let (Some(body_a), Some(body_b)) = (bodies.get(self.body_a), bodies.get(self.body_b)) else {
            return false;
        };

        let contact = if contact.body_a == self.body_a {
            *contact
        } else {
            contact.swapped()
        };

        let new_a = body_a.body_to_world(&contact.local_on_a);
        let new_b = body_b.body_to_world(&contact.local_on_b);
        let tolerance_sq = CONTACT_TOLERANCE * CONTACT_TOLERANCE;
        let duplicate = self.points.iter().any(|point| {
            let old_a = body_a.body_to_world(&point.contact.local_on_a);
            let old_b = body_b.body_to_world(&point.contact.local_on_b);
            (new_a - old_a).norm_squared() < tolerance_sq || (new_b - old_b).norm_squared() < tolerance_sq
        });
        if duplicate {
            return false;
        }

        let point = ManifoldPoint {
            constraint: PenetrationConstraint::new(&contact, body_a),
            contact,
        };

        if self.points.len() < MAX_CONTACTS {
            self.points.push(point);
            return true;
        }

        match self.slot_to_replace(&point.contact) {
            Some(slot) => {
                self.points[slot] = point;
                true
            }
            None => false,
        }
    }

    /// Slot whose point lies closest to the centroid of all five candidates,
    /// or `None` when the new point is the closest
    fn slot_to_replace(&self, contact: &Contact) -> Option<usize> {
        let sum = self
            .points
            .iter()
            .fold(contact.local_on_a, |sum, point| sum + point.contact.local_on_a);
        let centroid = sum / (self.points.len() + 1) as f32;

        let mut closest = None;
        let mut min_dist = (centroid - contact.local_on_a).norm_squared();
        for (slot, point) in self.points.iter().enumerate() {
            let dist = (centroid - point.contact.local_on_a).norm_squared();
            if dist < min_dist {
                min_dist = dist;
                closest = Some(slot);
            }
        }
        closest
    }

    /// Drop contacts that slid tangentially or separated along the normal
    pub fn remove_expired_contacts(&mut self, bodies: &[Body]) {
        let (Some(body_a), Some(body_b)) = (bodies.get(self.body_a), bodies.get(self.body_b)) else {
            self.points.clear();
            return;
        };

        let tolerance_sq = CONTACT_TOLERANCE * CONTACT_TOLERANCE;
        self.points.retain(|point| {
            let a = body_a.body_to_world(&point.contact.local_on_a);
            let b = body_b.body_to_world(&point.contact.local_on_b);
            let normal = body_a.orientation * point.constraint.local_normal();

            let ab = b - a;
            let depth = normal.dot(&ab);
            let tangent = ab - normal * depth;
            tangent.norm_squared() < tolerance_sq && depth <= 0.0
        });
    }
}

impl ConstraintSolver for Manifold {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        for point in &mut self.points {
            point.constraint.pre_solve(bodies, dt);
        }
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        for point in &mut self.points {
            point.constraint.solve(bodies);
        }
    }

    fn post_solve(&mut self) {
        for point in &mut self.points {
            point.constraint.post_solve();
        }
    }
}

/// Every live manifold in the scene, at most one per body pair
#[derive(Debug, Clone, Default)]
pub struct ManifoldCollector {
    manifolds: Vec<Manifold>,
}

impl ManifoldCollector {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a contact to its pair's manifold, creating one if needed.
    /// Returns whether the contact was stored.
    pub fn add_contact(&mut self, contact: &Contact, bodies: &[Body]) -> bool {
        if let Some(manifold) = self
            .manifolds
            .iter_mut()
            .find(|m| m.involves(contact.body_a, contact.body_b))
        {
            return manifold.add_contact(contact, bodies);
        }

        let mut manifold = Manifold::new(contact.body_a, contact.body_b);
        if !manifold.add_contact(contact, bodies) {
            return false;
        }
        log::debug!("New manifold for bodies {} and {}", contact.body_a, contact.body_b);
        self.manifolds.push(manifold);
        true
    }

    /// Expire stale contacts and drop manifolds left empty
    pub fn remove_expired(&mut self, bodies: &[Body]) {
        for manifold in &mut self.manifolds {
            manifold.remove_expired_contacts(bodies);
        }

        let before = self.manifolds.len();
        self.manifolds.retain(|m| !m.is_empty());
        let removed = before - self.manifolds.len();
        if removed > 0 {
            log::debug!("Dropped {} empty manifolds", removed);
        }
    }

    /// Drop every manifold
    pub fn clear(&mut self) {
        self.manifolds.clear();
    }

    /// Number of live manifolds
    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    /// True when there are no manifolds
    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    /// Total contacts across all manifolds
    pub fn contact_count(&self) -> usize {
        self.manifolds.iter().map(Manifold::len).sum()
    }

    /// Live manifolds
    pub fn manifolds(&self) -> &[Manifold] {
        &self.manifolds
    }
}

impl ConstraintSolver for ManifoldCollector {
    fn pre_solve(&mut self, bodies: &mut [Body], dt: f32) {
        for manifold in &mut self.manifolds {
            manifold.pre_solve(bodies, dt);
        }
    }

    fn solve(&mut self, bodies: &mut [Body]) {
        for manifold in &mut self.manifolds {
            manifold.solve(bodies);
        }
    }

    fn post_solve(&mut self) {
        for manifold in &mut self.manifolds {
            manifold.post_solve();
        }
    }
}

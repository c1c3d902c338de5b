//! The simulated world and its fixed-step update

use crate::config::SimulationConfig;
use crate::foundation::math::Vec3;
use crate::physics::body::{body_pair_mut, Body};
use crate::physics::broad_phase::BroadPhase;
use crate::physics::constraints::{Constraint, ConstraintSolver, JointFrame};
use crate::physics::contact::{resolve_contact, Contact};
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::intersections;
use crate::physics::manifold::ManifoldCollector;
use crate::physics::BodyHandle;

/// What happened during one call to [`Scene::update`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Candidate pairs reported by the broad phase
    pub candidate_pairs: usize,
    /// Contacts touching at the start of the step that a manifold stored
    pub resting_contacts: usize,
    /// Contacts replayed at their time of impact
    pub ballistic_contacts: usize,
    /// Ballistic contacts lost to a full buffer
    pub dropped_contacts: usize,
    /// Live manifolds after the step
    pub manifolds: usize,
}

/// Bodies, joints and persistent contacts advanced together in fixed steps.
///
/// Bodies are addressed by the [`BodyHandle`] returned from
/// [`Scene::add_body`] and stay at that index until [`Scene::reset`].
#[derive(Debug)]
pub struct Scene {
    config: SimulationConfig,
    bodies: Vec<Body>,
    constraints: Vec<Constraint>,
    manifolds: ManifoldCollector,
    broad_phase: BroadPhase,
    ballistic: Vec<Contact>,
    last_stats: StepStats,
}

impl Scene {
    /// Empty scene using the given settings
    pub fn new(config: &SimulationConfig) -> Self {
        log::info!(
            "Creating scene: gravity {:?}, {} solver iterations, {} body capacity",
            config.gravity.as_slice(),
            config.solver_iterations,
            config.body_capacity
        );

        Self {
            config: config.clone(),
            bodies: Vec::with_capacity(config.body_capacity),
            constraints: Vec::new(),
            manifolds: ManifoldCollector::new(),
            broad_phase: BroadPhase::with_capacity(config.body_capacity),
            ballistic: Vec::with_capacity(config.max_ballistic_contacts),
            last_stats: StepStats::default(),
        }
    }

    /// Settings this scene was built with
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Add a body and return its handle
    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    /// Attachment frame for a new joint between two bodies at their current pose
    pub fn joint_frame(
        &self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        world_anchor: Vec3,
        world_axis: Vec3,
    ) -> PhysicsResult<JointFrame> {
        JointFrame::new(&self.bodies, body_a, body_b, world_anchor, world_axis)
    }

    /// Add a joint or driver. Fails if it refers to a body that does not exist
    /// or connects a body to itself.
    pub fn add_constraint(&mut self, constraint: impl Into<Constraint>) -> PhysicsResult<usize> {
        let constraint = constraint.into();

        let (body_a, body_b) = constraint.bodies();
        self.check_handle(body_a)?;
        if let Some(body_b) = body_b {
            self.check_handle(body_b)?;
            if body_a == body_b {
                return Err(PhysicsError::SameBody(body_a));
            }
        }

        self.constraints.push(constraint);
        Ok(self.constraints.len() - 1)
    }

    fn check_handle(&self, handle: BodyHandle) -> PhysicsResult<()> {
        if handle < self.bodies.len() {
            Ok(())
        } else {
            Err(PhysicsError::InvalidBody(handle))
        }
    }

    /// All bodies in insertion order
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// One body
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// One body, mutably
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    /// Joints and drivers in insertion order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Persistent contacts
    pub const fn manifolds(&self) -> &ManifoldCollector {
        &self.manifolds
    }

    /// Statistics of the most recent step
    pub const fn last_stats(&self) -> StepStats {
        self.last_stats
    }

    /// Remove every body, joint and contact
    pub fn reset(&mut self) {
        log::info!("Resetting scene with {} bodies", self.bodies.len());
        self.bodies.clear();
        self.constraints.clear();
        self.manifolds.clear();
        self.ballistic.clear();
        self.last_stats = StepStats::default();
    }

    /// Advance the world by `dt` seconds
    pub fn update(&mut self, dt: f32) -> StepStats {
        let mut stats = StepStats::default();

        self.manifolds.remove_expired(&self.bodies);

        for body in &mut self.bodies {
            if body.is_static() {
                continue;
            }
            let mass = 1.0 / body.inv_mass;
            body.apply_impulse_linear(&(self.config.gravity * mass * dt));
        }

        // Collect contacts: touching now goes to the manifolds, later ones
        // are replayed in time order after the solve
        self.ballistic.clear();
        let pairs = self.broad_phase.find_pairs(&self.bodies, dt);
        stats.candidate_pairs = pairs.len();

        for &pair in pairs {
            let Some((body_a, body_b)) = body_pair_mut(&mut self.bodies, pair.a, pair.b) else {
                continue;
            };
            if body_a.is_static() && body_b.is_static() {
                continue;
            }

            let Some(contact) = intersections::intersect(pair, body_a, body_b, dt) else {
                continue;
            };

            if contact.is_ballistic() {
                if self.ballistic.len() < self.config.max_ballistic_contacts {
                    self.ballistic.push(contact);
                } else {
                    stats.dropped_contacts += 1;
                }
            } else if self.manifolds.add_contact(&contact, &self.bodies) {
                stats.resting_contacts += 1;
            }
        }

        if stats.dropped_contacts > 0 {
            log::warn!(
                "Ballistic contact buffer full ({}), dropped {} contacts",
                self.config.max_ballistic_contacts,
                stats.dropped_contacts
            );
        }

        self.ballistic
            .sort_by(|lhs, rhs| lhs.time_of_impact.total_cmp(&rhs.time_of_impact));
        stats.ballistic_contacts = self.ballistic.len();

        self.solve_constraints(dt);

        let mut accumulated = 0.0;
        for contact in &self.ballistic {
            let step = contact.time_of_impact - accumulated;
            for body in &mut self.bodies {
                body.update(step);
            }
            if let Some((body_a, body_b)) = body_pair_mut(&mut self.bodies, contact.body_a, contact.body_b) {
                resolve_contact(contact, body_a, body_b);
            }
            accumulated += step;
        }

        let remaining = dt - accumulated;
        if remaining > 0.0 {
            for body in &mut self.bodies {
                body.update(remaining);
            }
        }

        stats.manifolds = self.manifolds.len();
        log::trace!("Step {:?}", stats);
        self.last_stats = stats;
        stats
    }

    /// Joints first, then contacts, for every phase
    fn solve_constraints(&mut self, dt: f32) {
        for constraint in &mut self.constraints {
            constraint.pre_solve(&mut self.bodies, dt);
        }
        self.manifolds.pre_solve(&mut self.bodies, dt);

        for _ in 0..self.config.solver_iterations {
            for constraint in &mut self.constraints {
                constraint.solve(&mut self.bodies);
            }
            self.manifolds.solve(&mut self.bodies);
        }

        for constraint in &mut self.constraints {
            constraint.post_solve();
        }
        self.manifolds.post_solve();
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::constraints::DistanceConstraint;
    use crate::physics::shapes::{BoxShape, Shape};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn small_box() -> Arc<Shape> {
        Arc::new(Shape::Box(BoxShape::new(Vec3::repeat(0.25))))
    }

    #[test]
    fn test_gravity_only_moves_dynamic_bodies() {
        let mut scene = Scene::default();
        let fixed = scene.add_body(Body::new(small_box()).with_position(Vec3::new(0.0, 0.0, 10.0)));
        let falling = scene.add_body(
            Body::new(small_box())
                .with_position(Vec3::new(10.0, 0.0, 10.0))
                .with_inv_mass(2.0),
        );

        let dt = 0.125;
        scene.update(dt);

        assert_eq!(scene.body(fixed).unwrap().position, Vec3::new(0.0, 0.0, 10.0));
        let body = scene.body(falling).unwrap();
        assert_relative_eq!(body.linear_velocity.z, -10.0 * dt, epsilon = 1e-6);
        assert_relative_eq!(body.position.z, 10.0 - 10.0 * dt * dt, epsilon = 1e-5);
    }

    #[test]
    fn test_add_constraint_validates_handles() {
        let mut scene = Scene::default();
        let a = scene.add_body(Body::new(small_box()));
        let b = scene.add_body(Body::new(small_box()).with_position(Vec3::x()).with_inv_mass(1.0));

        let frame = scene.joint_frame(a, b, Vec3::zeros(), Vec3::z()).unwrap();
        assert_eq!(scene.add_constraint(DistanceConstraint::new(frame)).unwrap(), 0);

        let mut stale = frame;
        stale.body_b = 9;
        assert!(matches!(
            scene.add_constraint(DistanceConstraint::new(stale)),
            Err(PhysicsError::InvalidBody(9))
        ));

        let mut looped = frame;
        looped.body_b = a;
        assert!(matches!(
            scene.add_constraint(DistanceConstraint::new(looped)),
            Err(PhysicsError::SameBody(_))
        ));
        assert_eq!(scene.constraints().len(), 1);
    }

    #[test]
    fn test_full_ballistic_buffer_drops_contacts() {
        let config = SimulationConfig::default()
            .with_gravity(Vec3::zeros())
            .with_max_ballistic_contacts(0);
        let mut scene = Scene::new(&config);
        scene.add_body(
            Body::new(Arc::new(Shape::sphere(1.0)))
                .with_position(Vec3::new(-3.0, 0.0, 0.0))
                .with_linear_velocity(Vec3::new(120.0, 0.0, 0.0))
                .with_inv_mass(1.0),
        );
        scene.add_body(Body::new(Arc::new(Shape::sphere(1.0))).with_inv_mass(1.0));

        let stats = scene.update(1.0 / 60.0);
        assert_eq!(stats.ballistic_contacts, 0);
        assert_eq!(stats.dropped_contacts, 1);
    }

    #[test]
    fn test_repeated_contact_is_counted_once() {
        let mut scene = Scene::new(&SimulationConfig::default().with_gravity(Vec3::zeros()));
        scene.add_body(Body::new(Arc::new(Shape::sphere(1.0))).with_inv_mass(1.0));
        scene.add_body(
            Body::new(Arc::new(Shape::sphere(1.0)))
                .with_position(Vec3::new(1.9, 0.0, 0.0))
                .with_inv_mass(1.0),
        );

        let first = scene.update(1.0 / 60.0);
        assert_eq!(first.resting_contacts, 1);

        // Still overlapping: the same contact is found again and rejected
        let second = scene.update(1.0 / 60.0);
        assert_eq!(second.resting_contacts, 0);
        assert_eq!(second.manifolds, 1);
        assert_eq!(scene.manifolds().contact_count(), 1);
    }

    #[test]
    fn test_reset_empties_scene() {
        let mut scene = Scene::default();
        scene.add_body(Body::new(small_box()));
        scene.update(1.0 / 60.0);
        scene.reset();

        assert!(scene.bodies().is_empty());
        assert!(scene.constraints().is_empty());
        assert!(scene.manifolds().is_empty());
        assert_eq!(scene.last_stats(), StepStats::default());
    }
}

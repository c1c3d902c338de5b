//! Sweep-and-prune broad phase
//!
//! Every body's swept world bounds are projected onto a single diagonal axis
//! and the resulting intervals are swept in order. Bodies whose intervals
//! overlap become candidate pairs for the narrow phase.
//!
//! The projection is conservative: two boxes that overlap in 3D always
//! overlap on the axis, but the reverse is not true, so the narrow phase still
//! has to reject most pairs.

use crate::foundation::math::Vec3;
use crate::physics::body::Body;
use crate::physics::BodyHandle;

/// Padding added to every side of the swept bounds
pub const BOUNDS_MARGIN: f32 = 0.01;

/// Unordered pair of bodies that may be touching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    /// Smaller handle
    pub a: BodyHandle,
    /// Larger handle
    pub b: BodyHandle,
}

impl CollisionPair {
    /// Create a new collision pair (always stores the smaller handle first)
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        if a < b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SweepEvent {
    body: BodyHandle,
    value: f32,
    is_min: bool,
}

fn sweep_axis() -> Vec3 {
    Vec3::repeat(1.0).normalize()
}

/// Interval covered by a body on the sweep axis over the next `dt` seconds
pub fn projected_interval(body: &Body, dt: f32) -> (f32, f32) {
    let mut bounds = body.bounds();

    let travel = body.linear_velocity * dt;
    let (lo, hi) = (bounds.min + travel, bounds.max + travel);
    bounds.expand_point(&lo);
    bounds.expand_point(&hi);

    let margin = Vec3::repeat(BOUNDS_MARGIN);
    let (lo, hi) = (bounds.min - margin, bounds.max + margin);
    bounds.expand_point(&lo);
    bounds.expand_point(&hi);

    let axis = sweep_axis();
    (axis.dot(&bounds.min), axis.dot(&bounds.max))
}

/// Reusable sweep state; keeps its buffers between steps
#[derive(Debug, Default)]
pub struct BroadPhase {
    events: Vec<SweepEvent>,
    open: Vec<BodyHandle>,
    pairs: Vec<CollisionPair>,
}

impl BroadPhase {
    /// Create an empty broad phase
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a broad phase with buffers sized for `bodies` bodies
    pub fn with_capacity(bodies: usize) -> Self {
        Self {
            events: Vec::with_capacity(bodies * 2),
            open: Vec::with_capacity(bodies),
            pairs: Vec::with_capacity(bodies),
        }
    }

    /// Candidate pairs found by the last call to [`BroadPhase::find_pairs`]
    pub fn pairs(&self) -> &[CollisionPair] {
        &self.pairs
    }

    /// Sweep all bodies and collect the overlapping pairs. Pairs of two
    /// static bodies are never reported.
    pub fn find_pairs(&mut self, bodies: &[Body], dt: f32) -> &[CollisionPair] {
        self.events.clear();
        self.open.clear();
        self.pairs.clear();

        for (body, state) in bodies.iter().enumerate() {
            let (min, max) = projected_interval(state, dt);
            self.events.push(SweepEvent { body, value: min, is_min: true });
            self.events.push(SweepEvent { body, value: max, is_min: false });
        }

        // Opening events sort ahead of closing ones at equal values, so
        // touching intervals still pair up
        self.events.sort_by(|lhs, rhs| {
            lhs.value
                .total_cmp(&rhs.value)
                .then_with(|| rhs.is_min.cmp(&lhs.is_min))
        });

        for event in &self.events {
            if event.is_min {
                for &other in &self.open {
                    if bodies[other].is_static() && bodies[event.body].is_static() {
                        continue;
                    }
                    self.pairs.push(CollisionPair::new(other, event.body));
                }
                self.open.push(event.body);
            } else if let Some(slot) = self.open.iter().position(|&open| open == event.body) {
                self.open.swap_remove(slot);
            }
        }

        &self.pairs
    }
}

/// O(n²) reference: every non-static pair whose projected intervals overlap
pub fn brute_force_pairs(bodies: &[Body], dt: f32) -> Vec<CollisionPair> {
    let intervals: Vec<(f32, f32)> = bodies.iter().map(|body| projected_interval(body, dt)).collect();

    let mut pairs = Vec::new();
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            if bodies[i].is_static() && bodies[j].is_static() {
                continue;
            }
            let (a, b) = (intervals[i], intervals[j]);
            if a.0 <= b.1 && b.0 <= a.1 {
                pairs.push(CollisionPair::new(i, j));
            }
        }
    }
    pairs
}

//! Collision shapes
//!
//! Shapes are immutable and stored in body space. Everything the narrowphase
//! needs from a shape goes through its support mapping, so adding a shape
//! means adding one match arm per query below.
//!
//! ## Features
//!
//! - **Sphere**: analytic support, used by the exact sphere-sphere sweep
//! - **Box**: eight-corner support set, closed-form inertia
//! - **Convex**: hull built from any point cloud, sampled mass properties

mod box_shape;
mod convex;
mod hull;
mod sphere;

pub use box_shape::BoxShape;
pub use convex::{ConvexHull, DEFAULT_MASS_SAMPLES};
pub use hull::Triangle;
pub use sphere::Sphere;

use crate::foundation::math::{Mat3, Quat, Vec3};
use crate::physics::bounds::Bounds;
use crate::physics::error::HullError;

/// Collision shape in body space
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Sphere centered on the body origin
    Sphere(Sphere),
    /// Box defined by body-space bounds
    Box(BoxShape),
    /// Convex hull of a point cloud
    Convex(ConvexHull),
}

impl Shape {
    /// Sphere of the given radius
    pub const fn sphere(radius: f32) -> Self {
        Self::Sphere(Sphere::new(radius))
    }

    /// Box enclosing the given body-space points
    pub fn box_from_points(points: &[Vec3]) -> Result<Self, HullError> {
        BoxShape::from_points(points).map(Self::Box)
    }

    /// Convex hull of the given body-space points
    pub fn convex(points: &[Vec3]) -> Result<Self, HullError> {
        ConvexHull::new(points).map(Self::Convex)
    }

    /// Sphere radius, if this is a sphere
    pub const fn radius(&self) -> Option<f32> {
        match self {
            Self::Sphere(sphere) => Some(sphere.radius),
            _ => None,
        }
    }

    /// World-space point of the shape furthest along `dir` when placed at
    /// `position` with `orientation`, pushed out along `dir` by `bias`.
    pub fn support(&self, dir: &Vec3, position: &Vec3, orientation: &Quat, bias: f32) -> Vec3 {
        match self {
            Self::Sphere(sphere) => sphere.support(dir, position, bias),
            Self::Box(shape) => support_of_points(shape.corners(), dir, position, orientation, bias),
            Self::Convex(hull) => support_of_points(hull.points(), dir, position, orientation, bias),
        }
    }

    /// Inertia tensor per unit mass about the center of mass
    pub fn inertia_tensor(&self) -> Mat3 {
        match self {
            Self::Sphere(sphere) => sphere.inertia_tensor(),
            Self::Box(shape) => shape.inertia_tensor(),
            Self::Convex(hull) => hull.inertia_tensor(),
        }
    }

    /// Center of mass in body space
    pub fn center_of_mass(&self) -> Vec3 {
        match self {
            Self::Sphere(_) => Vec3::zeros(),
            Self::Box(shape) => shape.center_of_mass(),
            Self::Convex(hull) => hull.center_of_mass(),
        }
    }

    /// Bounds in body space
    pub fn local_bounds(&self) -> Bounds {
        match self {
            Self::Sphere(sphere) => sphere.local_bounds(),
            Self::Box(shape) => shape.local_bounds(),
            Self::Convex(hull) => hull.local_bounds(),
        }
    }

    /// World-space bounds at the given placement
    pub fn bounds(&self, position: &Vec3, orientation: &Quat) -> Bounds {
        match self {
            Self::Sphere(sphere) => {
                let local = sphere.local_bounds();
                Bounds::new(local.min + position, local.max + position)
            }
            Self::Box(shape) => shape.local_bounds().transformed(position, orientation),
            Self::Convex(hull) => hull.local_bounds().transformed(position, orientation),
        }
    }

    /// Largest speed along `dir` that any vertex reaches from spinning at
    /// `angular_velocity` about the center of mass. Zero for spheres.
    pub fn fastest_linear_speed(&self, angular_velocity: &Vec3, dir: &Vec3) -> f32 {
        let (points, center_of_mass) = match self {
            Self::Sphere(_) => return 0.0,
            Self::Box(shape) => (&shape.corners()[..], shape.center_of_mass()),
            Self::Convex(hull) => (hull.points(), hull.center_of_mass()),
        };

        points
            .iter()
            .map(|point| dir.dot(&angular_velocity.cross(&(point - center_of_mass))))
            .fold(0.0, f32::max)
    }
}

fn support_of_points(points: &[Vec3], dir: &Vec3, position: &Vec3, orientation: &Quat, bias: f32) -> Vec3 {
    let mut best = orientation * points[0] + position;
    let mut best_dist = dir.dot(&best);
    for point in &points[1..] {
        let candidate = orientation * point + position;
        let dist = dir.dot(&candidate);
        if dist > best_dist {
            best_dist = dist;
            best = candidate;
        }
    }

    best + dir.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros) * bias
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_support_picks_corner() {
        let shape = Shape::Box(BoxShape::new(Vec3::new(1.0, 2.0, 3.0)));
        let point = shape.support(&Vec3::new(1.0, -1.0, 1.0), &Vec3::zeros(), &Quat::identity(), 0.0);
        assert_eq!(point, Vec3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn test_support_respects_orientation_and_bias() {
        let shape = Shape::Box(BoxShape::new(Vec3::new(2.0, 0.5, 0.5)));
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), PI * 0.5);
        let point = shape.support(&Vec3::y(), &Vec3::new(0.0, 0.0, 1.0), &rotation, 0.1);

        // The long axis now points along Y
        assert_relative_eq!(point.y, 2.1, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_bounds_ignore_rotation() {
        let shape = Shape::sphere(0.5);
        let rotation = Quat::from_axis_angle(&Vec3::x_axis(), 1.0);
        let bounds = shape.bounds(&Vec3::new(1.0, 0.0, 0.0), &rotation);

        assert_eq!(bounds.min, Vec3::new(0.5, -0.5, -0.5));
        assert_eq!(bounds.max, Vec3::new(1.5, 0.5, 0.5));
        assert_eq!(shape.radius(), Some(0.5));
    }

    #[test]
    fn test_fastest_linear_speed() {
        let shape = Shape::Box(BoxShape::new(Vec3::repeat(1.0)));
        let speed = shape.fastest_linear_speed(&Vec3::new(0.0, 0.0, 2.0), &Vec3::x());

        // Corner at (±1, ±1) spinning at 2 rad/s about Z moves at up to 2 m/s along X
        assert_relative_eq!(speed, 2.0, epsilon = 1e-5);
        assert_eq!(Shape::sphere(1.0).fastest_linear_speed(&Vec3::z(), &Vec3::x()), 0.0);
    }
}

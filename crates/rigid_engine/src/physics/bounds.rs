//! Axis-aligned bounding boxes

use crate::foundation::math::{Quat, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    /// Create bounds from min and max corners
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inverted bounds that any expansion will overwrite
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(f32::MIN),
        }
    }

    /// Smallest bounds enclosing every point
    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::empty(), |mut bounds, point| {
            bounds.expand_point(point);
            bounds
        })
    }

    /// Check whether the bounds enclose nothing
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to include a point
    pub fn expand_point(&mut self, point: &Vec3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Check if these bounds overlap another (touching counts)
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Size along each axis
    pub fn widths(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// The eight corner points
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, lo.z),
        ]
    }

    /// World bounds of these local bounds after rotating and translating
    pub fn transformed(&self, position: &Vec3, orientation: &Quat) -> Self {
        let mut bounds = Self::empty();
        for corner in self.corners() {
            bounds.expand_point(&(orientation * corner + position));
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_points_and_widths() {
        let bounds = Bounds::from_points(&[
            Vec3::new(-1.0, 2.0, 0.0),
            Vec3::new(3.0, -2.0, 0.5),
        ]);

        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.widths(), Vec3::new(4.0, 4.0, 0.5));
        assert!(!bounds.is_empty());
        assert!(Bounds::empty().is_empty());
    }

    #[test]
    fn test_intersects_touching() {
        let a = Bounds::new(Vec3::zeros(), Vec3::repeat(1.0));
        let b = Bounds::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let c = Bounds::new(Vec3::new(1.5, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_transformed_rotation_grows_bounds() {
        let local = Bounds::new(Vec3::new(-1.0, -0.25, -0.25), Vec3::new(1.0, 0.25, 0.25));
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), PI * 0.5);
        let world = local.transformed(&Vec3::new(0.0, 0.0, 5.0), &rotation);

        assert_relative_eq!(world.max.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(world.max.x, 0.25, epsilon = 1e-5);
        assert_relative_eq!(world.center().z, 5.0, epsilon = 1e-5);
    }
}

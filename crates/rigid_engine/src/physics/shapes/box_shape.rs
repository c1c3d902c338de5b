//! Oriented box shape
//!
//! A box is stored as its body-space bounds plus the eight corners, which
//! double as the support point set.

use crate::foundation::math::{Mat3, Vec3};
use crate::physics::bounds::Bounds;
use crate::physics::error::HullError;

/// Box defined by body-space bounds (need not be centered on the origin)
#[derive(Debug, Clone, PartialEq)]
pub struct BoxShape {
    bounds: Bounds,
    corners: [Vec3; 8],
}

impl BoxShape {
    /// Box centered on the body origin
    pub fn new(half_extents: Vec3) -> Self {
        Self::from_bounds(Bounds::new(-half_extents, half_extents))
    }

    /// Box enclosing a set of body-space points
    pub fn from_points(points: &[Vec3]) -> Result<Self, HullError> {
        if points.is_empty() {
            return Err(HullError::TooFewPoints(0));
        }
        Ok(Self::from_bounds(Bounds::from_points(points)))
    }

    fn from_bounds(bounds: Bounds) -> Self {
        Self {
            bounds,
            corners: bounds.corners(),
        }
    }

    /// Body-space corner points
    pub const fn corners(&self) -> &[Vec3; 8] {
        &self.corners
    }

    /// Bounds in body space
    pub const fn local_bounds(&self) -> Bounds {
        self.bounds
    }

    /// Center of mass in body space
    pub fn center_of_mass(&self) -> Vec3 {
        self.bounds.center()
    }

    /// Inertia tensor per unit mass about the center of mass
    pub fn inertia_tensor(&self) -> Mat3 {
        let d = self.bounds.widths();
        Mat3::from_diagonal(&Vec3::new(
            (d.y * d.y + d.z * d.z) / 12.0,
            (d.x * d.x + d.z * d.z) / 12.0,
            (d.x * d.x + d.y * d.y) / 12.0,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_points_builds_corners() {
        let shape = BoxShape::from_points(&[
            Vec3::new(-1.0, -2.0, 0.0),
            Vec3::new(1.0, 2.0, 5.0),
        ])
        .unwrap();

        assert_eq!(shape.center_of_mass(), Vec3::new(0.0, 0.0, 2.5));
        assert!(shape.corners().contains(&Vec3::new(1.0, -2.0, 5.0)));
        assert!(BoxShape::from_points(&[]).is_err());
    }

    #[test]
    fn test_unit_cube_inertia() {
        let tensor = BoxShape::new(Vec3::repeat(0.5)).inertia_tensor();
        assert_relative_eq!(tensor, Mat3::identity() / 6.0, epsilon = 1e-6);
    }
}

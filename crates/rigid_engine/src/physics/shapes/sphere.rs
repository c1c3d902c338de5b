//! Sphere shape

use crate::foundation::math::{Mat3, Vec3};
use crate::physics::bounds::Bounds;

/// Solid sphere centered on the body origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Radius in meters
    pub radius: f32,
}

impl Sphere {
    /// Create a sphere with the given radius
    pub const fn new(radius: f32) -> Self {
        Self { radius }
    }

    /// Furthest surface point along `dir`, pushed out by `bias`
    pub fn support(&self, dir: &Vec3, position: &Vec3, bias: f32) -> Vec3 {
        let dir = dir.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
        position + dir * (self.radius + bias)
    }

    /// Inertia tensor per unit mass
    pub fn inertia_tensor(&self) -> Mat3 {
        Mat3::from_diagonal_element(2.0 * self.radius * self.radius / 5.0)
    }

    /// Bounds in body space
    pub fn local_bounds(&self) -> Bounds {
        Bounds::new(Vec3::repeat(-self.radius), Vec3::repeat(self.radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_support_distance_is_radius_plus_bias() {
        let sphere = Sphere::new(1.5);
        let position = Vec3::new(2.0, -1.0, 4.0);

        for dir in [Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.0, -3.0, 0.0), Vec3::new(0.2, 0.1, -0.7)] {
            let point = sphere.support(&dir, &position, 0.25);
            assert_relative_eq!((point - position).norm(), 1.75, epsilon = 1e-5);
            assert!((point - position).dot(&dir) > 0.0);
        }
    }

    #[test]
    fn test_inertia_is_isotropic() {
        let tensor = Sphere::new(1.0).inertia_tensor();
        assert_relative_eq!(tensor, Mat3::identity() * 0.4, epsilon = 1e-6);
    }
}

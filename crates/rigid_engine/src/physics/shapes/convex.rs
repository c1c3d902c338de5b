//! Convex hull shape
//!
//! Mass properties are estimated by sampling a regular grid over the hull's
//! bounds and keeping the samples that fall inside every face.

use super::hull::{self, Triangle};
use crate::foundation::math::{Mat3, Matrix3, Vec3, Vector3};
use crate::physics::bounds::Bounds;
use crate::physics::error::HullError;

/// Grid resolution per axis used by [`ConvexHull::new`]
pub const DEFAULT_MASS_SAMPLES: usize = 100;

/// Convex polyhedron built from an arbitrary point cloud
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    points: Vec<Vec3>,
    triangles: Vec<Triangle>,
    bounds: Bounds,
    center_of_mass: Vec3,
    inertia_tensor: Mat3,
}

impl ConvexHull {
    /// Build the hull of `points` with the default mass sampling resolution
    pub fn new(points: &[Vec3]) -> Result<Self, HullError> {
        Self::with_mass_samples(points, DEFAULT_MASS_SAMPLES)
    }

    /// Build the hull of `points`, sampling `samples³` grid points to
    /// estimate the center of mass and inertia tensor
    pub fn with_mass_samples(points: &[Vec3], samples: usize) -> Result<Self, HullError> {
        let (points, triangles) = hull::build_convex_hull(points)?;
        let bounds = Bounds::from_points(&points);
        let moments = sample_moments(&points, &triangles, &bounds, samples.max(1));
        if moments.count == 0 {
            return Err(HullError::EmptyVolume(samples));
        }
        let (center_of_mass, inertia_tensor) = moments.mass_properties(&bounds.center());

        Ok(Self {
            points,
            triangles,
            bounds,
            center_of_mass,
            inertia_tensor,
        })
    }

    /// Hull vertices in body space
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Outward-wound hull faces indexing [`ConvexHull::points`]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Bounds in body space
    pub const fn local_bounds(&self) -> Bounds {
        self.bounds
    }

    /// Center of mass in body space
    pub const fn center_of_mass(&self) -> Vec3 {
        self.center_of_mass
    }

    /// Inertia tensor per unit mass about the center of mass
    pub const fn inertia_tensor(&self) -> Mat3 {
        self.inertia_tensor
    }

    /// Check whether a body-space point lies inside the hull
    pub fn contains(&self, point: &Vec3) -> bool {
        !hull::is_external(&self.points, &self.triangles, point)
    }
}

/// Running first and second moments of the interior grid samples, taken
/// relative to the bounds center and accumulated in `f64`
#[derive(Debug)]
struct SampleMoments {
    count: usize,
    sum: Vector3<f64>,
    outer: Matrix3<f64>,
}

impl SampleMoments {
    fn new() -> Self {
        Self {
            count: 0,
            sum: Vector3::zeros(),
            outer: Matrix3::zeros(),
        }
    }

    fn add(&mut self, offset: Vector3<f64>) {
        self.count += 1;
        self.sum += offset;
        self.outer += offset * offset.transpose();
    }

    /// Center of mass and inertia tensor per unit mass about it
    fn mass_properties(&self, origin: &Vec3) -> (Vec3, Mat3) {
        let count = self.count as f64;
        let mean = self.sum / count;
        let covariance = self.outer / count - mean * mean.transpose();
        let tensor = Matrix3::identity() * covariance.trace() - covariance;

        (origin + mean.cast::<f32>(), tensor.cast::<f32>())
    }
}

fn sample_moments(points: &[Vec3], triangles: &[Triangle], bounds: &Bounds, samples: usize) -> SampleMoments {
    let step = bounds.widths() / samples as f32;
    let origin = bounds.center();
    let mut moments = SampleMoments::new();

    for i in 0..samples {
        let x = bounds.min.x + step.x * i as f32;
        for j in 0..samples {
            let y = bounds.min.y + step.y * j as f32;
            for k in 0..samples {
                let sample = Vec3::new(x, y, bounds.min.z + step.z * k as f32);
                if !hull::is_external(points, triangles, &sample) {
                    moments.add((sample - origin).cast::<f64>());
                }
            }
        }
    }
    moments
}

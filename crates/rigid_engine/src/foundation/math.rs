//! Math utilities and types
//!
//! Provides the fundamental vector, matrix and quaternion types used by the
//! simulation, plus a few helpers the solver needs on top of `nalgebra`.

pub use nalgebra::{
    Vector3, Vector4,
    Matrix3, Matrix4,
    SMatrix, SVector,
    Quaternion,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Rigid transform (position and rotation) handed to renderers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,
}

impl Transform {
    /// Create a transform with position and rotation
    pub const fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }
}

/// Math utility functions
pub mod utils {
    use super::{Mat4, Quaternion, Vec3};

    /// Builds two unit vectors `(u, v)` that complete `n` to a right-handed
    /// orthonormal basis.
    ///
    /// `n` must be normalized.
    pub fn orthonormal_basis(n: &Vec3) -> (Vec3, Vec3) {
        // Pick a seed axis that is not nearly parallel to n
        let seed = if n.z * n.z > 0.9 * 0.9 {
            Vec3::x()
        } else {
            Vec3::z()
        };

        let u = seed.cross(n).normalize();
        let v = n.cross(&u).normalize();
        let u = v.cross(n).normalize();
        (u, v)
    }

    /// Matrix of left multiplication: `left(q) * p == q * p` with both
    /// quaternions laid out as `(w, x, y, z)`.
    #[rustfmt::skip]
    pub fn quat_left(q: &Quaternion<f32>) -> Mat4 {
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);
        Mat4::new(
            w, -x, -y, -z,
            x,  w, -z,  y,
            y,  z,  w, -x,
            z, -y,  x,  w,
        )
    }

    /// Matrix of right multiplication: `right(q) * p == p * q` with both
    /// quaternions laid out as `(w, x, y, z)`.
    #[rustfmt::skip]
    pub fn quat_right(q: &Quaternion<f32>) -> Mat4 {
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);
        Mat4::new(
            w, -x, -y, -z,
            x,  w,  z, -y,
            y, -z,  w,  x,
            z,  y, -x,  w,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::utils::*;
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn wxyz(q: &Quaternion<f32>) -> Vec4 {
        Vec4::new(q.w, q.i, q.j, q.k)
    }

    #[test]
    fn test_orthonormal_basis_is_orthonormal() {
        for n in [Vec3::x(), Vec3::y(), Vec3::z(), Vec3::new(1.0, -2.0, 0.5).normalize()] {
            let (u, v) = orthonormal_basis(&n);
            assert_relative_eq!(u.norm(), 1.0, epsilon = EPSILON);
            assert_relative_eq!(v.norm(), 1.0, epsilon = EPSILON);
            assert_relative_eq!(u.dot(&n), 0.0, epsilon = EPSILON);
            assert_relative_eq!(v.dot(&n), 0.0, epsilon = EPSILON);
            assert_relative_eq!(u.dot(&v), 0.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_quat_multiplication_matrices() {
        let a = Quaternion::new(0.3, -0.2, 0.9, 0.1);
        let b = Quaternion::new(-0.5, 0.4, 0.25, 0.7);

        let product = wxyz(&(a * b));
        assert_relative_eq!(quat_left(&a) * wxyz(&b), product, epsilon = EPSILON);
        assert_relative_eq!(quat_right(&b) * wxyz(&a), product, epsilon = EPSILON);
    }
}

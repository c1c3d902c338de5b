//! Projected Gauss-Seidel for the small dense systems built by constraints
//!
//! Solves `A x = b` by sweeping the rows `N` times. Callers clamp the
//! result afterwards, which turns the plain iteration into the projected
//! variant used for inequality constraints.

use crate::foundation::math::{SMatrix, SVector};

/// Approximate solution of `a * x = b`, starting from zero.
///
/// Rows whose update is not finite (zero or degenerate diagonal) are skipped.
pub fn gauss_seidel<const N: usize>(a: &SMatrix<f32, N, N>, b: &SVector<f32, N>) -> SVector<f32, N> {
    let mut x = SVector::<f32, N>::zeros();

    for _ in 0..N {
        for i in 0..N {
            let dx = (b[i] - a.row(i).transpose().dot(&x)) / a[(i, i)];
            if dx.is_finite() {
                x[i] += dx;
            }
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_diagonal_system_is_exact() {
        let a = SMatrix::<f32, 3, 3>::from_diagonal(&SVector::<f32, 3>::new(2.0, 4.0, 0.5));
        let b = SVector::<f32, 3>::new(1.0, 2.0, 3.0);
        let x = gauss_seidel(&a, &b);
        assert_relative_eq!(x, SVector::<f32, 3>::new(0.5, 0.5, 6.0), epsilon = 1e-6);
    }

    #[test]
    fn test_diagonally_dominant_system_converges() {
        #[rustfmt::skip]
        let a = SMatrix::<f32, 3, 3>::new(
            10.0, 1.0, 2.0,
            1.0, 8.0, 1.0,
            2.0, 1.0, 9.0,
        );
        let expected = SVector::<f32, 3>::new(1.0, -2.0, 3.0);
        let x = gauss_seidel(&a, &(a * expected));
        assert_relative_eq!(x, expected, epsilon = 1e-2);
    }

    #[test]
    fn test_zero_diagonal_row_is_skipped() {
        let mut a = SMatrix::<f32, 2, 2>::identity();
        a[(1, 1)] = 0.0;
        let x = gauss_seidel(&a, &SVector::<f32, 2>::new(3.0, 5.0));
        assert_eq!(x, SVector::<f32, 2>::new(3.0, 0.0));
    }
}

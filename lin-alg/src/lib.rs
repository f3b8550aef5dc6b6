//! Dense linear-algebra primitives consumed by the echo state network core.
//!
//! The core only relies on two contracts and their failure flags: matrix
//! inversion (`None` on a singular matrix) and eigenvalue computation
//! (`None` when the QR iteration does not converge). No specific internal
//! algorithm is assumed.

use nalgebra::{linalg::Schur, DMatrix};
use num::Complex;

/// Iteration cap for the Schur decomposition. Reservoir matrices are a few
/// hundred nodes at most, this bound is generous for those sizes.
const MAX_SCHUR_ITERATIONS: usize = 10_000;

/// Invert a square matrix. Returns `None` if the matrix is singular.
pub fn invert(matrix: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    assert_eq!(
        matrix.nrows(),
        matrix.ncols(),
        "invert: matrix must be square, got {}x{}",
        matrix.nrows(),
        matrix.ncols()
    );
    matrix.clone().try_inverse()
}

/// Compute all eigenvalues of a square matrix.
/// Returns `None` when the decomposition fails to converge.
pub fn eigenvalues(matrix: &DMatrix<f64>) -> Option<Vec<Complex<f64>>> {
    assert_eq!(
        matrix.nrows(),
        matrix.ncols(),
        "eigenvalues: matrix must be square, got {}x{}",
        matrix.nrows(),
        matrix.ncols()
    );
    let schur = Schur::try_new(matrix.clone(), f64::EPSILON, MAX_SCHUR_ITERATIONS)?;
    Some(schur.complex_eigenvalues().iter().copied().collect())
}

/// The magnitude of the largest-modulus eigenvalue.
/// Returns `None` when the eigenvalue computation does not converge.
pub fn spectral_radius(matrix: &DMatrix<f64>) -> Option<f64> {
    let eigen = eigenvalues(matrix)?;
    Some(eigen.iter().map(|e| (e.re * e.re + e.im * e.im).sqrt()).fold(0.0, f64::max))
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, Dim, Matrix};
    use round::round;

    use super::*;

    #[test]
    fn invert_known_matrix() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let m: DMatrix<f64> = Matrix::from_vec_generic(
            Dim::from_usize(2),
            Dim::from_usize(2),
            vec![4.0, 2.0, 7.0, 6.0],
        );
        let mut inv = invert(&m).expect("matrix is invertible");
        inv.iter_mut().for_each(|v| *v = round(*v, 2));

        let expected: DMatrix<f64> = Matrix::from_vec_generic(
            Dim::from_usize(2),
            Dim::from_usize(2),
            vec![0.6, -0.2, -0.7, 0.4],
        );
        assert_eq!(inv, expected);
    }

    #[test]
    fn invert_singular_matrix() {
        let m: DMatrix<f64> = Matrix::from_vec_generic(
            Dim::from_usize(2),
            Dim::from_usize(2),
            vec![1.0, 2.0, 2.0, 4.0],
        );
        assert!(invert(&m).is_none());
    }

    #[test]
    fn eigenvalues_diagonal() {
        let m = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![2.0, -3.0, 0.5]));
        let eigen = eigenvalues(&m).expect("converges");
        let mut magnitudes: Vec<f64> = eigen.iter().map(|e| e.norm()).collect();
        magnitudes.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for (got, expected) in magnitudes.iter().zip([0.5, 2.0, 3.0]) {
            assert!((got - expected).abs() < 1e-10, "got {}, expected {}", got, expected);
        }
    }

    #[test]
    fn spectral_radius_rotation() {
        // A rotation matrix has complex eigenvalues on the unit circle.
        let angle: f64 = 0.7;
        let m: DMatrix<f64> = Matrix::from_vec_generic(
            Dim::from_usize(2),
            Dim::from_usize(2),
            vec![angle.cos(), angle.sin(), -angle.sin(), angle.cos()],
        );
        let rho = spectral_radius(&m).expect("converges");
        assert!((rho - 1.0).abs() < 1e-10);
    }
}

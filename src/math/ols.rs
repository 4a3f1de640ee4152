//! Least squares solver.
//!
//! The model fit repeatedly solves small penalized regression problems of the form:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2 / σ^2 + Σ λ_j β_j^2
//! ```
//!
//! The penalty is folded into the design by appending one row `sqrt(λ_j) e_j`
//! (with target 0) per coefficient, so a plain least-squares solve is enough.
//!
//! Implementation choices:
//! - SVD keeps the solve robust when the design is tall (more rows than columns)
//!   or nearly collinear (constant regressors, trend columns that coincide).
//!   Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.
//! - The parameter dimension is tiny (a few dozen columns at most), so SVD
//!   performance is not a concern.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `min ||X β - y||^2 + Σ penalty_j β_j^2` by row augmentation.
///
/// `penalty` must have one entry per column of `x`; zero entries leave the
/// coefficient unpenalized.
pub fn solve_penalized(x: &DMatrix<f64>, y: &DVector<f64>, penalty: &[f64]) -> Option<DVector<f64>> {
    let (n, p) = x.shape();
    if penalty.len() != p || y.len() != n {
        return None;
    }

    let mut aug = DMatrix::<f64>::zeros(n + p, p);
    aug.view_mut((0, 0), (n, p)).copy_from(x);
    for (j, &lambda) in penalty.iter().enumerate() {
        aug[(n + j, j)] = lambda.max(0.0).sqrt();
    }

    let mut target = DVector::<f64>::zeros(n + p);
    target.rows_mut(0, n).copy_from(y);

    solve_least_squares(&aug, &target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn zero_penalty_matches_plain_least_squares() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_penalized(&x, &y, &[0.0, 0.0]).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn penalty_shrinks_coefficient_towards_zero() {
        // Single column: closed form β = Σxy / (Σx² + λ).
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let y = DVector::from_row_slice(&[4.0, 4.0]);

        let beta = solve_penalized(&x, &y, &[2.0]).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn penalty_resolves_duplicate_columns() {
        // Two identical columns are not identifiable without a penalty; with
        // equal penalties the solution splits the effect evenly.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        let y = DVector::from_row_slice(&[2.0, 4.0, 6.0]);

        let beta = solve_penalized(&x, &y, &[1e-6, 1e-6]).unwrap();
        assert!((beta[0] - beta[1]).abs() < 1e-6);
        assert!((beta[0] + beta[1] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn mismatched_penalty_length_is_rejected() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let y = DVector::from_row_slice(&[1.0, 1.0]);
        assert!(solve_penalized(&x, &y, &[1.0, 1.0]).is_none());
    }
}

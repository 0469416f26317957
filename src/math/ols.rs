//! Ordinary least squares solver.
//!
//! We solve `minimize ‖y - Xβ‖²` with an SVD so that tall, short, and
//! rank-deficient designs all work. Singular values under the tolerance are
//! treated as zero, which yields the minimum-norm solution (the same answer a
//! LAPACK `lstsq` gives). Lag features are strongly collinear on flat series,
//! so that case is the norm rather than the exception here.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if no tolerance yields a finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() == 0 || x.nrows() != y.len() {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Tolerance is relative to the largest singular value.
    let scale = svd.singular_values.max().max(1.0);
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol * scale) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

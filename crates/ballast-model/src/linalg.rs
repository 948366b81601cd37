//! Dense linear-algebra helpers for small covariance matrices.
//!
//! The engine works with asset universes of a few dozen symbols at most, so
//! the factorization and inversion routines here are plain O(n³) loops with
//! partial pivoting rather than a LAPACK binding. Singular inputs are
//! recovered with diagonal loading, escalating through a short ladder of
//! epsilons before giving up.

use crate::error::{ModelError, Result};
use ndarray::Array2;

/// Diagonal-loading epsilons tried, in order, when a matrix resists
/// factorization or inversion.
const LOADING_LADDER: [f64; 3] = [1e-10, 1e-8, 1e-6];

/// Smallest pivot magnitude accepted during Gauss-Jordan elimination.
const MIN_PIVOT: f64 = 1e-14;

/// Check that a matrix is square, returning its dimension.
pub fn square_dim(m: &Array2<f64>) -> Result<usize> {
    let n = m.nrows();
    if n != m.ncols() {
        return Err(ModelError::DimensionMismatch {
            expected: n,
            actual: m.ncols(),
        });
    }
    Ok(n)
}

/// Check symmetry within an absolute tolerance.
pub fn is_symmetric(m: &Array2<f64>, tolerance: f64) -> bool {
    let n = m.nrows();
    if n != m.ncols() {
        return false;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if (m[[i, j]] - m[[j, i]]).abs() > tolerance {
                return false;
            }
        }
    }
    true
}

/// Return a copy of `m` with `epsilon` added to every diagonal entry.
fn load_diagonal(m: &Array2<f64>, epsilon: f64) -> Array2<f64> {
    let mut loaded = m.clone();
    for i in 0..loaded.nrows() {
        loaded[[i, i]] += epsilon;
    }
    loaded
}

/// Cholesky factorization of a symmetric positive semi-definite matrix.
///
/// Returns the lower-triangular `L` with `L·Lᵀ = m`. Zero pivots are
/// tolerated (within rounding) so a constant-return asset — a zero
/// row/column — factors cleanly instead of forcing regularization; a
/// genuinely negative pivot is [`ModelError::NotPositiveDefinite`].
pub fn cholesky(m: &Array2<f64>) -> Result<Array2<f64>> {
    let n = square_dim(m)?;
    let mut l = Array2::<f64>::zeros((n, n));

    let max_diag = (0..n).fold(0.0f64, |acc, i| acc.max(m[[i, i]].abs()));
    let pivot_tolerance = 1e-12 * max_diag.max(1.0);

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let d = m[[i, i]] - sum;
                if !d.is_finite() || d < -pivot_tolerance {
                    return Err(ModelError::NotPositiveDefinite);
                }
                l[[i, j]] = if d <= pivot_tolerance { 0.0 } else { d.sqrt() };
            } else if l[[j, j]] == 0.0 {
                // Semi-definite branch: the whole pivot column is zero.
                l[[i, j]] = 0.0;
            } else {
                l[[i, j]] = (m[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Ok(l)
}

/// Cholesky factorization with diagonal-loading recovery.
///
/// Tries the strict factorization first; on failure, retries with each
/// epsilon in the loading ladder. Returns the factor together with the
/// epsilon that was needed (`None` when the matrix factored cleanly).
pub fn cholesky_with_loading(m: &Array2<f64>) -> Result<(Array2<f64>, Option<f64>)> {
    match cholesky(m) {
        Ok(l) => Ok((l, None)),
        Err(_) => {
            for &epsilon in &LOADING_LADDER {
                if let Ok(l) = cholesky(&load_diagonal(m, epsilon)) {
                    return Ok((l, Some(epsilon)));
                }
            }
            Err(ModelError::NotPositiveDefinite)
        }
    }
}

/// Invert a square matrix via Gauss-Jordan elimination with partial pivoting.
///
/// Returns [`ModelError::SingularMatrix`] when a pivot falls below the
/// acceptance threshold.
pub fn invert(m: &Array2<f64>) -> Result<Array2<f64>> {
    let n = square_dim(m)?;
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }

    // Augmented matrix [A | I]
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        // Partial pivoting
        let mut max_val = aug[[col, col]].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let val = aug[[row, col]].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < MIN_PIVOT || !max_val.is_finite() {
            return Err(ModelError::SingularMatrix);
        }

        if max_row != col {
            for j in 0..(2 * n) {
                let tmp = aug[[col, j]];
                aug[[col, j]] = aug[[max_row, j]];
                aug[[max_row, j]] = tmp;
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..(2 * n) {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..(2 * n) {
                aug[[row, j]] -= factor * aug[[col, j]];
            }
        }
    }

    let mut inv = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Ok(inv)
}

/// Inversion with diagonal-loading recovery, mirroring
/// [`cholesky_with_loading`].
pub fn invert_with_loading(m: &Array2<f64>) -> Result<(Array2<f64>, Option<f64>)> {
    match invert(m) {
        Ok(inv) => Ok((inv, None)),
        Err(_) => {
            for &epsilon in &LOADING_LADDER {
                if let Ok(inv) = invert(&load_diagonal(m, epsilon)) {
                    return Ok((inv, Some(epsilon)));
                }
            }
            Err(ModelError::SingularMatrix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_cholesky_identity() {
        let l = cholesky(&Array2::eye(3)).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(l[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cholesky_reconstructs() {
        let m = array![[0.04, 0.006], [0.006, 0.09]];
        let l = cholesky(&m).unwrap();
        let reconstructed = l.dot(&l.t());
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(reconstructed[[i, j]], m[[i, j]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let m = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(matches!(cholesky(&m), Err(ModelError::NotPositiveDefinite)));
    }

    #[test]
    fn test_cholesky_zero_variance_asset_factors_cleanly() {
        // Zero-variance asset in the second slot: semi-definite, no loading.
        let m = array![[0.04, 0.0], [0.0, 0.0]];
        let (l, epsilon) = cholesky_with_loading(&m).unwrap();
        assert!(epsilon.is_none());
        assert_abs_diff_eq!(l[[1, 1]], 0.0);
        assert_abs_diff_eq!(l[[0, 0]], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_loading_cannot_fix_indefinite() {
        // Eigenvalue -1 is far beyond the loading ladder: explicit failure,
        // never a fabricated factor.
        let m = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(matches!(
            cholesky_with_loading(&m),
            Err(ModelError::NotPositiveDefinite)
        ));
    }

    #[test]
    fn test_invert_roundtrip() {
        let m = array![[2.0, 1.0], [1.0, 3.0]];
        let inv = invert(&m).unwrap();
        let product = m.dot(&inv);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(product[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_invert_singular() {
        let m = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(invert(&m), Err(ModelError::SingularMatrix)));
    }

    #[test]
    fn test_invert_with_loading_recovers() {
        let m = array![[1.0, 2.0], [2.0, 4.0]];
        let (inv, epsilon) = invert_with_loading(&m).unwrap();
        assert!(epsilon.is_some());
        assert!(inv.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_is_symmetric() {
        assert!(is_symmetric(&array![[1.0, 0.5], [0.5, 1.0]], 1e-12));
        assert!(!is_symmetric(&array![[1.0, 0.5], [0.4, 1.0]], 1e-12));
    }
}

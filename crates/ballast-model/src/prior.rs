//! Implied-equilibrium prior returns via reverse optimization.
//!
//! The prior is the return vector under which the reference portfolio is
//! mean-variance efficient: π = δ · Σ · w_ref. With no market-cap data the
//! reference defaults to equal weight, which the engine uses as its proxy.

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2};

/// Equal reference weights (1/n) for `n` assets.
pub fn equal_weights(n: usize) -> Array1<f64> {
    Array1::from_elem(n, 1.0 / n as f64)
}

/// Reverse-optimize the implied equilibrium return vector.
///
/// # Arguments
/// * `covariance` - Annualized covariance matrix Σ (N × N)
/// * `reference_weights` - Reference portfolio weights w_ref (length N)
/// * `risk_aversion` - Scalar risk-aversion coefficient δ (> 0)
pub fn equilibrium_returns(
    covariance: &Array2<f64>,
    reference_weights: &Array1<f64>,
    risk_aversion: f64,
) -> Result<Array1<f64>> {
    let n = crate::linalg::square_dim(covariance)?;
    if reference_weights.len() != n {
        return Err(ModelError::DimensionMismatch {
            expected: n,
            actual: reference_weights.len(),
        });
    }
    if !(risk_aversion.is_finite() && risk_aversion > 0.0) {
        return Err(ModelError::InvalidParameter(format!(
            "risk aversion must be positive, got {risk_aversion}"
        )));
    }

    Ok(covariance.dot(reference_weights) * risk_aversion)
}

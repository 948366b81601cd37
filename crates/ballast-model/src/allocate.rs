//! Maximum-Sharpe (tangency) allocation on the non-negative simplex.
//!
//! The unconstrained tangency portfolio is w ∝ Σ⁻¹(μ − r_f·1). When that
//! solution carries negative entries, the solver iteratively drops the most
//! negative asset from the active support and re-solves on the remainder — a
//! critical-line-style active-set iteration that terminates in at most N
//! rounds. Weights always come back summing to one (within 1e-6) with no
//! negative or non-finite entries; anything else is an optimization failure,
//! never a silently returned partial result.

use crate::error::{ModelError, Result};
use crate::linalg;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Below this magnitude the tangency denominator 1ᵀΣ⁻¹(μ − r_f) is treated
/// as no signal at all and the reference weights are used instead. This is
/// also the tie-break for numerically equivalent assets, whose symmetric
/// system cancels to exactly this case.
const SIGNAL_TOLERANCE: f64 = 1e-12;

/// Entries more negative than this force an active-set restriction; smaller
/// negatives are clamped to zero.
const NEGATIVE_TOLERANCE: f64 = 1e-10;

/// Configuration for the tangency allocator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Annualized risk-free rate subtracted from expected returns
    /// (default: 0.02).
    pub risk_free_rate: f64,
    /// Bound on active-set iterations before giving up (default: 32).
    pub max_iterations: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            max_iterations: 32,
        }
    }
}

/// Solver for the constrained maximum-Sharpe portfolio.
#[derive(Debug, Default)]
pub struct TangencyAllocator {
    config: AllocatorConfig,
}

impl TangencyAllocator {
    /// Create an allocator with the given configuration.
    pub const fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Solve for the maximum-Sharpe weights on {w ≥ 0, Σw = 1}.
    ///
    /// # Arguments
    /// * `expected_returns` - Posterior expected returns μ (length N)
    /// * `covariance` - Posterior covariance Σ (N × N)
    /// * `reference_weights` - Reference weights used as the degenerate-case
    ///   tie-break (length N, typically equal weight)
    pub fn allocate(
        &self,
        expected_returns: &Array1<f64>,
        covariance: &Array2<f64>,
        reference_weights: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        let n = linalg::square_dim(covariance)?;
        if expected_returns.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                actual: expected_returns.len(),
            });
        }
        if reference_weights.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                actual: reference_weights.len(),
            });
        }
        if n == 0 {
            return Err(ModelError::InvalidParameter(
                "at least one asset is required".to_string(),
            ));
        }
        if expected_returns.iter().any(|v| !v.is_finite())
            || covariance.iter().any(|v| !v.is_finite())
        {
            return Err(ModelError::InvalidParameter(
                "expected returns and covariance must be finite".to_string(),
            ));
        }

        let excess = expected_returns - self.config.risk_free_rate;
        let mut support: Vec<usize> = (0..n).collect();

        for iteration in 0..self.config.max_iterations {
            if support.is_empty() {
                return Err(ModelError::OptimizationFailed { iterations: iteration });
            }

            let k = support.len();
            let sigma_s =
                Array2::from_shape_fn((k, k), |(i, j)| covariance[[support[i], support[j]]]);
            let excess_s = Array1::from_shape_fn(k, |i| excess[support[i]]);

            let (sigma_inv, _) = linalg::invert_with_loading(&sigma_s)
                .map_err(|_| ModelError::OptimizationFailed { iterations: iteration })?;
            let raw = sigma_inv.dot(&excess_s);
            let denom = raw.sum();

            if !denom.is_finite() {
                return Err(ModelError::OptimizationFailed { iterations: iteration });
            }

            // No positive risk-adjusted signal on the support: distribute by
            // the reference weights instead of chasing a degenerate solution.
            if denom <= SIGNAL_TOLERANCE {
                warn!(
                    iteration,
                    denom, "tangency system is degenerate; using reference weights"
                );
                return self.reference_fallback(&support, reference_weights, n);
            }

            let weights_s = raw / denom;

            // Restrict the support and re-solve if a materially negative
            // weight appears.
            let (worst_idx, worst) = weights_s
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(i, &v)| (i, v))
                .unwrap_or((0, 0.0));

            if worst < -NEGATIVE_TOLERANCE {
                debug!(
                    iteration,
                    dropped = support[worst_idx],
                    weight = worst,
                    "dropping negative-weight asset from active set"
                );
                support.remove(worst_idx);
                continue;
            }

            return finalize(&support, &weights_s, n, iteration);
        }

        Err(ModelError::OptimizationFailed {
            iterations: self.config.max_iterations,
        })
    }

    fn reference_fallback(
        &self,
        support: &[usize],
        reference_weights: &Array1<f64>,
        n: usize,
    ) -> Result<Array1<f64>> {
        let total: f64 = support.iter().map(|&i| reference_weights[i]).sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(ModelError::OptimizationFailed { iterations: 0 });
        }
        let mut weights = Array1::<f64>::zeros(n);
        for &i in support {
            weights[i] = reference_weights[i] / total;
        }
        Ok(weights)
    }
}

/// Embed support weights into the full vector, clamping rounding-level
/// negatives and renormalizing to an exact unit sum.
fn finalize(
    support: &[usize],
    weights_s: &Array1<f64>,
    n: usize,
    iteration: usize,
) -> Result<Array1<f64>> {
    let mut weights = Array1::<f64>::zeros(n);
    for (slot, &asset) in support.iter().enumerate() {
        weights[asset] = weights_s[slot].max(0.0);
    }

    let sum = weights.sum();
    if !(sum.is_finite() && sum > 0.0) {
        return Err(ModelError::OptimizationFailed { iterations: iteration });
    }
    weights /= sum;

    if weights.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::OptimizationFailed { iterations: iteration });
    }
    debug_assert!((weights.sum() - 1.0).abs() <= 1e-6);

    Ok(weights)
}

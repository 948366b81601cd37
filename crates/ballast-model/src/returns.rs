//! Log-return moment estimation from aligned close prices.
//!
//! Converts a dates × assets close-price matrix into daily log returns, the
//! per-asset mean return vector, and the sample covariance matrix, each in
//! daily and annualized form. Annualization follows the usual convention:
//! mean × 252, covariance × 252.

use crate::TRADING_DAYS_PER_YEAR;
use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for the returns estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsConfig {
    /// Observations below this count mark the estimate as degraded
    /// (default: 20). Small samples are still estimated — the covariance is
    /// just too noisy to trust, which callers may want to surface.
    pub recommended_observations: usize,
}

impl Default for ReturnsConfig {
    fn default() -> Self {
        Self {
            recommended_observations: 20,
        }
    }
}

/// Estimated return moments for a set of assets.
#[derive(Debug, Clone)]
pub struct ReturnsEstimate {
    /// Mean daily log return per asset.
    pub mean_daily: Array1<f64>,
    /// Daily sample covariance of log returns.
    pub covariance_daily: Array2<f64>,
    /// Annualized mean return per asset (daily × 252).
    pub mean_annual: Array1<f64>,
    /// Annualized covariance (daily × 252).
    pub covariance_annual: Array2<f64>,
    /// Number of return observations the moments were computed from.
    pub observations: usize,
    /// True when the sample was below the recommended observation count.
    pub degraded: bool,
}

impl ReturnsEstimate {
    /// Number of assets covered by the estimate.
    pub fn n_assets(&self) -> usize {
        self.mean_daily.len()
    }
}

/// Estimator turning close prices into return moments.
#[derive(Debug, Default)]
pub struct ReturnsEstimator {
    config: ReturnsConfig,
}

impl ReturnsEstimator {
    /// Create an estimator with the given configuration.
    pub const fn new(config: ReturnsConfig) -> Self {
        Self { config }
    }

    /// Estimate return moments from a dates × assets close-price matrix.
    ///
    /// Rows must be ordered by date and already aligned across assets
    /// (same trading dates). Fewer than two rows is an error; fewer than the
    /// recommended number of return observations produces a degraded (but
    /// valid) estimate.
    pub fn estimate(&self, closes: &Array2<f64>) -> Result<ReturnsEstimate> {
        let (n_dates, n_assets) = closes.dim();

        if n_assets == 0 {
            return Err(ModelError::InvalidParameter(
                "at least one asset is required".to_string(),
            ));
        }
        if n_dates < 2 {
            return Err(ModelError::InsufficientData {
                required: 2,
                actual: n_dates,
            });
        }

        for ((row, asset), &price) in closes.indexed_iter() {
            if !(price.is_finite() && price > 0.0) {
                return Err(ModelError::InvalidPrice {
                    asset,
                    row,
                    value: price,
                });
            }
        }

        let observations = n_dates - 1;
        let mut returns = Array2::<f64>::zeros((observations, n_assets));
        for t in 0..observations {
            for a in 0..n_assets {
                returns[[t, a]] = (closes[[t + 1, a]] / closes[[t, a]]).ln();
            }
        }

        let mut mean_daily = Array1::<f64>::zeros(n_assets);
        for a in 0..n_assets {
            mean_daily[a] = returns.column(a).sum() / observations as f64;
        }

        // Sample covariance (n-1 denominator); a single observation leaves
        // the matrix at zero, which the degraded flag below covers.
        let mut covariance_daily = Array2::<f64>::zeros((n_assets, n_assets));
        if observations > 1 {
            let denom = (observations - 1) as f64;
            for i in 0..n_assets {
                for j in i..n_assets {
                    let mut sum = 0.0;
                    for t in 0..observations {
                        sum += (returns[[t, i]] - mean_daily[i]) * (returns[[t, j]] - mean_daily[j]);
                    }
                    let cov = sum / denom;
                    covariance_daily[[i, j]] = cov;
                    covariance_daily[[j, i]] = cov;
                }
            }
        }

        let degraded = observations < self.config.recommended_observations;
        if degraded {
            warn!(
                observations,
                recommended = self.config.recommended_observations,
                "covariance estimated from a small sample; treat as degraded"
            );
        }

        Ok(ReturnsEstimate {
            mean_annual: &mean_daily * TRADING_DAYS_PER_YEAR,
            covariance_annual: &covariance_daily * TRADING_DAYS_PER_YEAR,
            mean_daily,
            covariance_daily,
            observations,
            degraded,
        })
    }
}

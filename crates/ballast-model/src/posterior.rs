//! Black-Litterman posterior blend of prior returns and investor views.
//!
//! Standard formulation:
//!
//! ```text
//! E[R] = [(τΣ)⁻¹ + PᵀΩ⁻¹P]⁻¹ · [(τΣ)⁻¹·π + PᵀΩ⁻¹·Q]
//! Σ*   = Σ + [(τΣ)⁻¹ + PᵀΩ⁻¹P]⁻¹
//! ```
//!
//! With an empty view set the posterior collapses exactly to the prior —
//! that branch is explicit here, not an emergent numerical coincidence.
//! A singular (τΣ) is recovered with diagonal loading; if inversion still
//! fails the blend downgrades to the unregularized prior and records the
//! degradation instead of failing the request.

use crate::error::{ModelError, Result};
use crate::linalg;
use crate::views::ViewSet;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for the Black-Litterman blend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlackLittermanConfig {
    /// Uncertainty scaling parameter τ applied to the prior covariance
    /// (default: 0.025).
    pub tau: f64,
    /// Risk-aversion coefficient δ used for the equilibrium prior
    /// (default: 2.5).
    pub risk_aversion: f64,
}

impl Default for BlackLittermanConfig {
    fn default() -> Self {
        Self {
            tau: 0.025,
            risk_aversion: 2.5,
        }
    }
}

/// Non-fatal numerical degradation recorded on a result instead of thrown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Degradation {
    /// Diagonal loading of the given epsilon was applied before a
    /// factorization or inversion.
    DiagonalLoading {
        /// Epsilon added to the diagonal.
        epsilon: f64,
    },
    /// The posterior blend was abandoned and the prior used as-is.
    PriorFallback,
}

/// Posterior return and risk estimates.
#[derive(Debug, Clone)]
pub struct Posterior {
    /// Posterior expected returns.
    pub returns: Array1<f64>,
    /// Posterior covariance.
    pub covariance: Array2<f64>,
    /// Degradation applied while blending, if any.
    pub degradation: Option<Degradation>,
}

/// Blender combining the equilibrium prior with investor views.
#[derive(Debug, Default)]
pub struct BlackLittermanBlender {
    config: BlackLittermanConfig,
}

impl BlackLittermanBlender {
    /// Create a blender, validating the configuration.
    pub fn new(config: BlackLittermanConfig) -> Result<Self> {
        if !(config.tau.is_finite() && config.tau > 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "tau must be positive, got {}",
                config.tau
            )));
        }
        if !(config.risk_aversion.is_finite() && config.risk_aversion > 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "risk aversion must be positive, got {}",
                config.risk_aversion
            )));
        }
        Ok(Self { config })
    }

    /// The configuration in use.
    pub const fn config(&self) -> &BlackLittermanConfig {
        &self.config
    }

    /// Blend the prior with the views into the posterior estimate.
    ///
    /// `prior` and `covariance` must share the same asset dimension; the
    /// views are validated against it.
    pub fn blend(
        &self,
        prior: &Array1<f64>,
        covariance: &Array2<f64>,
        views: &ViewSet,
    ) -> Result<Posterior> {
        let n = linalg::square_dim(covariance)?;
        if prior.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                actual: prior.len(),
            });
        }
        views.validate(n)?;

        let tau = self.config.tau;
        let tau_sigma = covariance * tau;

        // No views: the posterior is the prior, exactly. Σ* still carries
        // the estimation-uncertainty term τΣ.
        if views.is_empty() {
            return Ok(Posterior {
                returns: prior.clone(),
                covariance: covariance + &tau_sigma,
                degradation: None,
            });
        }

        let blended = self.blend_views(prior, covariance, &tau_sigma, views);
        match blended {
            Ok(posterior) => Ok(posterior),
            Err(err) => {
                // Never surface a singular-matrix fault: fall back to the
                // prior and record the downgrade on the result.
                warn!(%err, "Black-Litterman blend failed; falling back to prior");
                Ok(Posterior {
                    returns: prior.clone(),
                    covariance: covariance + &tau_sigma,
                    degradation: Some(Degradation::PriorFallback),
                })
            }
        }
    }

    fn blend_views(
        &self,
        prior: &Array1<f64>,
        covariance: &Array2<f64>,
        tau_sigma: &Array2<f64>,
        views: &ViewSet,
    ) -> Result<Posterior> {
        let n = covariance.nrows();
        let p = views.pick_matrix(n);
        let q = views.value_vector();
        let omega = views.omega(tau_sigma);

        let (tau_sigma_inv, loading) = linalg::invert_with_loading(tau_sigma)?;

        // Ω is diagonal by construction; invert entrywise.
        let mut omega_inv = Array2::<f64>::zeros(omega.dim());
        for i in 0..omega.nrows() {
            omega_inv[[i, i]] = 1.0 / omega[[i, i]];
        }

        let pt_omega_inv = p.t().dot(&omega_inv);

        // Precision: (τΣ)⁻¹ + PᵀΩ⁻¹P
        let precision = &tau_sigma_inv + &pt_omega_inv.dot(&p);
        let (precision_inv, precision_loading) = linalg::invert_with_loading(&precision)?;

        // Posterior mean: precision⁻¹ · [(τΣ)⁻¹π + PᵀΩ⁻¹Q]
        let rhs = tau_sigma_inv.dot(prior) + pt_omega_inv.dot(&q);
        let returns = precision_inv.dot(&rhs);

        if returns.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::SingularMatrix);
        }

        let degradation = loading
            .or(precision_loading)
            .map(|epsilon| Degradation::DiagonalLoading { epsilon });
        if let Some(Degradation::DiagonalLoading { epsilon }) = degradation {
            warn!(epsilon, "diagonal loading applied during posterior blend");
        }

        Ok(Posterior {
            returns,
            covariance: covariance + &precision_inv,
            degradation,
        })
    }
}

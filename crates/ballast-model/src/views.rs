//! Investor views for the Black-Litterman blend.
//!
//! A view asserts the expected excess return of a linear combination of
//! assets with a confidence in (0, 1]. The set materializes into the pick
//! matrix P, the view-value vector Q, and the diagonal uncertainty matrix Ω
//! with ω_ii = (1/c − 1) · (P·τΣ·Pᵀ)_ii.

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Floor applied to Ω diagonal entries so a full-confidence view does not
/// produce a singular uncertainty matrix.
const OMEGA_FLOOR: f64 = 1e-12;

/// A single investor view on a combination of assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    /// Pick-vector entries as (asset index, weight in the view portfolio).
    /// An absolute view on one asset is `[(i, 1.0)]`; a relative view
    /// "i outperforms j" is `[(i, 1.0), (j, -1.0)]`.
    pub pick: Vec<(usize, f64)>,
    /// Expected excess return asserted by the view.
    pub value: f64,
    /// Confidence in the view, in (0, 1].
    pub confidence: f64,
}

impl View {
    /// Absolute view: asset `asset` returns `value`.
    pub fn absolute(asset: usize, value: f64, confidence: f64) -> Self {
        Self {
            pick: vec![(asset, 1.0)],
            value,
            confidence,
        }
    }

    /// Relative view: `long` outperforms `short` by `spread`.
    pub fn relative(long: usize, short: usize, spread: f64, confidence: f64) -> Self {
        Self {
            pick: vec![(long, 1.0), (short, -1.0)],
            value: spread,
            confidence,
        }
    }
}

/// An ordered collection of views. Empty by default, in which case the
/// posterior collapses to the prior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewSet {
    views: Vec<View>,
}

impl ViewSet {
    /// Create an empty view set.
    pub const fn empty() -> Self {
        Self { views: Vec::new() }
    }

    /// Create a view set from a list of views.
    pub fn from_views(views: Vec<View>) -> Self {
        Self { views }
    }

    /// Add a view.
    pub fn push(&mut self, view: View) {
        self.views.push(view);
    }

    /// Number of views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// True when no views are held.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// The views in insertion order.
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Validate view indices and confidences against an `n`-asset universe.
    pub fn validate(&self, n_assets: usize) -> Result<()> {
        for (k, view) in self.views.iter().enumerate() {
            if view.pick.is_empty() {
                return Err(ModelError::InvalidParameter(format!(
                    "view {k} has an empty pick vector"
                )));
            }
            for &(asset, _) in &view.pick {
                if asset >= n_assets {
                    return Err(ModelError::DimensionMismatch {
                        expected: n_assets,
                        actual: asset + 1,
                    });
                }
            }
            if !(view.confidence > 0.0 && view.confidence <= 1.0) {
                return Err(ModelError::InvalidParameter(format!(
                    "view {k} confidence must be in (0, 1], got {}",
                    view.confidence
                )));
            }
            if !view.value.is_finite() {
                return Err(ModelError::InvalidParameter(format!(
                    "view {k} value must be finite"
                )));
            }
        }
        Ok(())
    }

    /// Build the K × N pick matrix P.
    pub fn pick_matrix(&self, n_assets: usize) -> Array2<f64> {
        let mut p = Array2::<f64>::zeros((self.views.len(), n_assets));
        for (k, view) in self.views.iter().enumerate() {
            for &(asset, weight) in &view.pick {
                p[[k, asset]] = weight;
            }
        }
        p
    }

    /// Build the K-length view-value vector Q.
    pub fn value_vector(&self) -> Array1<f64> {
        self.views.iter().map(|v| v.value).collect()
    }

    /// Build the K × K diagonal uncertainty matrix Ω from confidences,
    /// scaled by the view variances under τΣ.
    pub fn omega(&self, tau_sigma: &Array2<f64>) -> Array2<f64> {
        let k = self.views.len();
        let p = self.pick_matrix(tau_sigma.nrows());
        let p_ts_pt = p.dot(tau_sigma).dot(&p.t());

        let mut omega = Array2::<f64>::zeros((k, k));
        for (i, view) in self.views.iter().enumerate() {
            let scale = 1.0 / view.confidence - 1.0;
            omega[[i, i]] = (scale * p_ts_pt[[i, i]]).max(OMEGA_FLOOR);
        }
        omega
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_pick_matrix_layout() {
        let views = ViewSet::from_views(vec![
            View::absolute(0, 0.10, 0.8),
            View::relative(0, 1, 0.02, 0.6),
        ]);
        let p = views.pick_matrix(2);

        assert_abs_diff_eq!(p[[0, 0]], 1.0);
        assert_abs_diff_eq!(p[[0, 1]], 0.0);
        assert_abs_diff_eq!(p[[1, 0]], 1.0);
        assert_abs_diff_eq!(p[[1, 1]], -1.0);
        assert_abs_diff_eq!(views.value_vector()[1], 0.02);
    }

    #[test]
    fn test_omega_shrinks_with_confidence() {
        let tau_sigma = array![[0.001, 0.0], [0.0, 0.002]];
        let low = ViewSet::from_views(vec![View::absolute(0, 0.1, 0.2)]);
        let high = ViewSet::from_views(vec![View::absolute(0, 0.1, 0.9)]);

        assert!(low.omega(&tau_sigma)[[0, 0]] > high.omega(&tau_sigma)[[0, 0]]);
    }

    #[test]
    fn test_omega_floor_at_full_confidence() {
        let tau_sigma = array![[0.001]];
        let views = ViewSet::from_views(vec![View::absolute(0, 0.1, 1.0)]);
        assert!(views.omega(&tau_sigma)[[0, 0]] > 0.0);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let views = ViewSet::from_views(vec![View::absolute(3, 0.1, 0.5)]);
        assert!(views.validate(2).is_err());

        let views = ViewSet::from_views(vec![View::absolute(0, 0.1, 0.0)]);
        assert!(views.validate(2).is_err());

        let views = ViewSet::from_views(vec![View::absolute(0, 0.1, 1.5)]);
        assert!(views.validate(2).is_err());
    }

    #[test]
    fn test_empty_set() {
        let views = ViewSet::empty();
        assert!(views.is_empty());
        assert!(views.validate(5).is_ok());
        assert_eq!(views.pick_matrix(5).dim(), (0, 5));
    }
}

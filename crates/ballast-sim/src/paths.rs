//! Correlated geometric-Brownian-motion path simulation.
//!
//! The daily covariance matrix is Cholesky-factored into L; each simulated
//! day draws independent standard normals z and advances every asset by
//!
//! ```text
//! price(t+1) = price(t) · exp(μ_daily − ½σ²_daily + (L·z)_asset)
//! ```
//!
//! Portfolio value at each step is Σ_asset w · (price_t / price_0) · initial.
//! Paths run in fixed-size chunks across rayon workers; each path's RNG is
//! seeded from (request seed, path index) via a SplitMix64 finalizer, and
//! chunk partials are merged sequentially in chunk order, so output is
//! bit-identical for identical inputs and seed regardless of thread count.

use crate::error::{Result, SimError};
use ballast_model::posterior::Degradation;
use ballast_model::{TRADING_DAYS_PER_YEAR, linalg};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Paths simulated per parallel work unit. Fixing this keeps the reduction
/// order independent of the worker count.
const CHUNK_SIZE: usize = 128;

/// Configuration for the path simulator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulation horizon in trading days (default: 252).
    pub horizon_days: usize,
    /// Number of independent paths (default: 2000).
    pub path_count: usize,
    /// Optional random seed; identical seed and inputs reproduce
    /// bit-identical output. `None` draws a fresh seed per simulation.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon_days: 252,
            path_count: 2000,
            seed: None,
        }
    }
}

/// Daily GBM drift/diffusion inputs.
#[derive(Debug, Clone)]
pub struct GbmParams {
    /// Mean daily log return per asset.
    pub mean_daily: Array1<f64>,
    /// Daily covariance of log returns.
    pub covariance_daily: Array2<f64>,
}

impl GbmParams {
    /// Build daily parameters from annualized estimates (÷ 252).
    pub fn from_annual(mean_annual: &Array1<f64>, covariance_annual: &Array2<f64>) -> Self {
        Self {
            mean_daily: mean_annual / TRADING_DAYS_PER_YEAR,
            covariance_daily: covariance_annual / TRADING_DAYS_PER_YEAR,
        }
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.mean_daily.len()
    }
}

/// Simulated portfolio paths, published only after every path completed.
#[derive(Debug, Clone)]
pub struct SimulatedPaths {
    /// Per-step average portfolio value across all paths
    /// (length horizon + 1; index 0 is the initial value).
    pub mean_path: Vec<f64>,
    /// Terminal portfolio value of every path (length path count).
    pub final_values: Vec<f64>,
    /// Regularization applied before factorization, if any.
    pub degradation: Option<Degradation>,
}

/// Correlated multi-asset GBM simulator.
#[derive(Debug)]
pub struct PathSimulator {
    config: SimulationConfig,
}

impl PathSimulator {
    /// Create a simulator, rejecting non-positive horizon or path count.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        if config.horizon_days == 0 {
            return Err(SimError::InvalidParameters(
                "horizon_days must be positive".to_string(),
            ));
        }
        if config.path_count == 0 {
            return Err(SimError::InvalidParameters(
                "path_count must be positive".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// The configuration in use.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate the portfolio under the given weights.
    ///
    /// `weights` must match the asset dimension of `params`; they are taken
    /// as-is (validation of the sum is the caller's contract).
    pub fn simulate_portfolio(
        &self,
        params: &GbmParams,
        weights: &Array1<f64>,
        initial_value: f64,
    ) -> Result<SimulatedPaths> {
        let n_assets = params.n_assets();
        if weights.len() != n_assets {
            return Err(SimError::DimensionMismatch {
                expected: n_assets,
                actual: weights.len(),
            });
        }
        if n_assets == 0 {
            return Err(SimError::InvalidParameters(
                "at least one asset is required".to_string(),
            ));
        }
        if !(initial_value.is_finite() && initial_value > 0.0) {
            return Err(SimError::InvalidParameters(format!(
                "initial_value must be positive, got {initial_value}"
            )));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(SimError::InvalidParameters(
                "weights must be finite".to_string(),
            ));
        }

        let (chol, loading) = linalg::cholesky_with_loading(&params.covariance_daily)
            .map_err(|_| SimError::NotPositiveDefinite)?;
        let degradation = loading.map(|epsilon| {
            warn!(epsilon, "covariance regularized before Cholesky factorization");
            Degradation::DiagonalLoading { epsilon }
        });

        let drift: Array1<f64> = Array1::from_shape_fn(n_assets, |i| {
            params.mean_daily[i] - 0.5 * params.covariance_daily[[i, i]]
        });

        let horizon = self.config.horizon_days;
        let path_count = self.config.path_count;
        let seed = self.config.seed.unwrap_or_else(rand::random);

        let n_chunks = path_count.div_ceil(CHUNK_SIZE);
        let chunks: Vec<ChunkResult> = (0..n_chunks)
            .into_par_iter()
            .map(|chunk| {
                let start = chunk * CHUNK_SIZE;
                let end = (start + CHUNK_SIZE).min(path_count);
                simulate_chunk(
                    seed,
                    start..end,
                    &chol,
                    &drift,
                    weights,
                    initial_value,
                    horizon,
                )
            })
            .collect();

        // Deterministic reduction: chunk partials merged in chunk order.
        let mut sum_path = vec![0.0; horizon + 1];
        let mut final_values = Vec::with_capacity(path_count);
        for chunk in chunks {
            for (acc, v) in sum_path.iter_mut().zip(chunk.sum_path) {
                *acc += v;
            }
            final_values.extend(chunk.final_values);
        }

        let mean_path = sum_path
            .into_iter()
            .map(|v| v / path_count as f64)
            .collect();

        Ok(SimulatedPaths {
            mean_path,
            final_values,
            degradation,
        })
    }

    /// Simulate a single illustrative price path for one asset.
    ///
    /// Used for per-symbol chart data; `stream` distinguishes the RNG stream
    /// (assets of one request pass their index).
    pub fn simulate_asset_path(
        &self,
        mean_daily: f64,
        variance_daily: f64,
        start_price: f64,
        stream: u64,
    ) -> Result<Vec<f64>> {
        if !(start_price.is_finite() && start_price > 0.0) {
            return Err(SimError::InvalidParameters(format!(
                "start_price must be positive, got {start_price}"
            )));
        }
        if variance_daily < 0.0 {
            return Err(SimError::InvalidParameters(format!(
                "variance must be non-negative, got {variance_daily}"
            )));
        }

        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(path_seed(seed, u64::MAX - stream));
        let sigma = variance_daily.sqrt();
        let drift = mean_daily - 0.5 * variance_daily;

        let mut path = Vec::with_capacity(self.config.horizon_days + 1);
        let mut price = start_price;
        path.push(price);
        for _ in 0..self.config.horizon_days {
            let z: f64 = rng.sample(StandardNormal);
            price *= (drift + sigma * z).exp();
            path.push(price);
        }
        Ok(path)
    }
}

/// Partial results of one chunk of paths.
struct ChunkResult {
    sum_path: Vec<f64>,
    final_values: Vec<f64>,
}

fn simulate_chunk(
    seed: u64,
    paths: std::ops::Range<usize>,
    chol: &Array2<f64>,
    drift: &Array1<f64>,
    weights: &Array1<f64>,
    initial_value: f64,
    horizon: usize,
) -> ChunkResult {
    let n_assets = drift.len();
    let mut sum_path = vec![0.0; horizon + 1];
    let mut final_values = Vec::with_capacity(paths.len());

    let mut z = vec![0.0; n_assets];
    let mut ratios = vec![1.0; n_assets];

    for path in paths {
        let mut rng = StdRng::seed_from_u64(path_seed(seed, path as u64));
        ratios.fill(1.0);
        sum_path[0] += initial_value;

        let mut value = initial_value;
        for t in 1..=horizon {
            for slot in z.iter_mut() {
                *slot = rng.sample(StandardNormal);
            }

            value = 0.0;
            for i in 0..n_assets {
                // Correlated shock: (L·z)_i over the lower triangle.
                let mut shock = 0.0;
                for j in 0..=i {
                    shock += chol[[i, j]] * z[j];
                }
                ratios[i] *= (drift[i] + shock).exp();
                value += weights[i] * ratios[i] * initial_value;
            }
            sum_path[t] += value;
        }
        final_values.push(value);
    }

    ChunkResult {
        sum_path,
        final_values,
    }
}

/// SplitMix64 finalizer deriving one stream seed per path from the base
/// seed, so parallel execution order cannot affect the draws.
fn path_seed(base: u64, index: u64) -> u64 {
    let mut z = base ^ index.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn config(horizon: usize, paths: usize, seed: u64) -> SimulationConfig {
        SimulationConfig {
            horizon_days: horizon,
            path_count: paths,
            seed: Some(seed),
        }
    }

    fn two_asset_params() -> GbmParams {
        GbmParams {
            mean_daily: array![0.0004, 0.0002],
            covariance_daily: array![[1.0e-4, 2.0e-5], [2.0e-5, 1.5e-4]],
        }
    }

    #[test]
    fn test_rejects_zero_horizon_and_paths() {
        assert!(PathSimulator::new(config(0, 100, 1)).is_err());
        assert!(PathSimulator::new(config(10, 0, 1)).is_err());
    }

    #[test]
    fn test_mean_path_shape_and_origin() {
        let sim = PathSimulator::new(config(20, 50, 7)).unwrap();
        let weights = array![0.5, 0.5];
        let result = sim
            .simulate_portfolio(&two_asset_params(), &weights, 100_000.0)
            .unwrap();

        assert_eq!(result.mean_path.len(), 21);
        assert_abs_diff_eq!(result.mean_path[0], 100_000.0, epsilon = 1e-9);
        assert_eq!(result.final_values.len(), 50);
        assert!(result.final_values.iter().all(|v| v.is_finite() && *v > 0.0));
    }

    #[test]
    fn test_identical_seed_is_bit_reproducible() {
        let weights = array![0.6, 0.4];
        let run = || {
            PathSimulator::new(config(30, 300, 42))
                .unwrap()
                .simulate_portfolio(&two_asset_params(), &weights, 50_000.0)
                .unwrap()
        };

        let a = run();
        let b = run();
        assert_eq!(a.mean_path, b.mean_path);
        assert_eq!(a.final_values, b.final_values);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let weights = array![0.6, 0.4];
        let run = |seed| {
            PathSimulator::new(config(30, 100, seed))
                .unwrap()
                .simulate_portfolio(&two_asset_params(), &weights, 50_000.0)
                .unwrap()
        };

        assert_ne!(run(1).final_values, run(2).final_values);
    }

    #[test]
    fn test_zero_variance_does_not_crash() {
        let params = GbmParams {
            mean_daily: array![0.0, 0.0],
            covariance_daily: Array2::zeros((2, 2)),
        };
        let weights = array![0.5, 0.5];
        let sim = PathSimulator::new(config(10, 20, 3)).unwrap();
        let result = sim.simulate_portfolio(&params, &weights, 1_000.0).unwrap();

        // Semi-definite factorization needs no regularization and every
        // shock is exactly zero: flat paths.
        assert!(result.degradation.is_none());
        for v in &result.final_values {
            assert_abs_diff_eq!(*v, 1_000.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_weight_dimension_mismatch() {
        let sim = PathSimulator::new(config(10, 10, 1)).unwrap();
        let weights = array![1.0];
        assert!(matches!(
            sim.simulate_portfolio(&two_asset_params(), &weights, 1_000.0),
            Err(SimError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_rejects_bad_initial_value() {
        let sim = PathSimulator::new(config(10, 10, 1)).unwrap();
        let weights = array![0.5, 0.5];
        assert!(
            sim.simulate_portfolio(&two_asset_params(), &weights, 0.0)
                .is_err()
        );
    }

    #[test]
    fn test_asset_path_deterministic_per_stream() {
        let sim = PathSimulator::new(config(15, 10, 99)).unwrap();
        let a = sim.simulate_asset_path(0.0004, 1.0e-4, 150.0, 0).unwrap();
        let b = sim.simulate_asset_path(0.0004, 1.0e-4, 150.0, 0).unwrap();
        let c = sim.simulate_asset_path(0.0004, 1.0e-4, 150.0, 1).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert_abs_diff_eq!(a[0], 150.0);
    }

    #[test]
    fn test_from_annual_scales_by_252() {
        let params = GbmParams::from_annual(
            &array![0.252],
            &Array2::from_elem((1, 1), 0.252),
        );
        assert_abs_diff_eq!(params.mean_daily[0], 0.001, epsilon = 1e-15);
        assert_abs_diff_eq!(params.covariance_daily[[0, 0]], 0.001, epsilon = 1e-15);
    }
}

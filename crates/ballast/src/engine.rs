//! The two-call engine surface: `initialize` and `simulate`.
//!
//! `initialize` runs estimation → prior → Black-Litterman → allocation once
//! per symbol set and returns everything the caller needs to display and to
//! simulate later. `simulate` forecasts an arbitrary weight vector against
//! the posterior moments of a prior `initialize`.
//!
//! The engine holds configuration only. All request state travels through
//! arguments and return values, so one engine instance serves concurrent
//! requests without synchronization, and a failed call leaves nothing
//! partially published — callers drop their derived state on error and show
//! "no data" rather than stale figures.

use crate::config::EngineConfig;
use ballast_data::AlignedPrices;
use ballast_model::posterior::{BlackLittermanBlender, Degradation, Posterior};
use ballast_model::{
    ModelError, ReturnsEstimate, ReturnsEstimator, TangencyAllocator, ViewSet, equal_weights,
    equilibrium_returns,
};
use ballast_sim::paths::{GbmParams, PathSimulator, SimulationConfig};
use ballast_sim::{SimError, TerminalDistribution, compute_stats, terminal_distribution};
use ndarray::{Array1, Array2};
use thiserror::Error;
use tracing::{debug, info};

/// Caller-supplied weights must sum to 1 within this tolerance.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

/// Errors surfaced by the engine. All are terminal for the request — no
/// partial results accompany them.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Estimation or optimization failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Simulation or metric failure.
    #[error(transparent)]
    Simulation(#[from] SimError),

    /// Caller-supplied weights are unusable.
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Posterior estimates and the optimal allocation for one symbol set.
/// Immutable; recompute only when the symbol set changes.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Symbols, in the column order of all vectors/matrices here.
    pub symbols: Vec<String>,
    /// Posterior expected returns, annualized.
    pub posterior_returns: Array1<f64>,
    /// Posterior covariance, annualized.
    pub posterior_covariance: Array2<f64>,
    /// Optimal weights per symbol; sum 1 within 1e-6, all non-negative.
    pub optimal_weights: Vec<(String, f64)>,
    /// Daily mean log returns backing the per-symbol sample paths.
    pub mean_daily: Array1<f64>,
    /// Daily covariance backing the per-symbol sample paths.
    pub covariance_daily: Array2<f64>,
    /// True when the return moments came from a small sample.
    pub degraded_estimate: bool,
    /// Numerical degradation recorded during the blend, if any.
    pub degradation: Option<Degradation>,
}

impl OptimizationResult {
    /// The optimal weights as a vector in symbol order.
    pub fn optimal_weight_vector(&self) -> Array1<f64> {
        self.optimal_weights.iter().map(|(_, w)| *w).collect()
    }
}

/// Everything `initialize` returns for display and later simulation.
#[derive(Debug, Clone)]
pub struct InitializeOutcome {
    /// Resolved symbols, in engine order.
    pub symbols: Vec<String>,
    /// Latest aligned close per symbol.
    pub current_prices: Vec<(String, f64)>,
    /// Posterior estimates and optimal allocation.
    pub optimization: OptimizationResult,
    /// One illustrative simulated price path per symbol.
    pub sample_paths: Vec<(String, Vec<f64>)>,
}

/// A forecast request for one weight vector.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    /// Weight per symbol; must cover exactly the initialized symbols and
    /// sum to 1 within 0.001.
    pub weights: Vec<(String, f64)>,
    /// Starting portfolio value.
    pub initial_value: f64,
    /// Horizon override in trading days (engine config default otherwise).
    pub horizon_days: Option<usize>,
    /// Path-count override (engine config default otherwise).
    pub path_count: Option<usize>,
    /// Seed override; identical seed and inputs reproduce bit-identical
    /// results.
    pub seed: Option<u64>,
}

impl SimulationRequest {
    /// A request with config-default horizon, path count, and seed.
    pub fn new(weights: Vec<(String, f64)>, initial_value: f64) -> Self {
        Self {
            weights,
            initial_value,
            horizon_days: None,
            path_count: None,
            seed: None,
        }
    }
}

/// A completed forecast, published only after every path finished.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Per-step average portfolio value (length horizon + 1).
    pub mean_path: Vec<f64>,
    /// Terminal value of every path.
    pub final_values: Vec<f64>,
    /// Derived portfolio statistics.
    pub stats: ballast_sim::PortfolioStats,
    /// Percentile summary of the terminal distribution.
    pub distribution: TerminalDistribution,
    /// Numerical degradation recorded during factorization, if any.
    pub degradation: Option<Degradation>,
}

/// Stateless portfolio engine.
#[derive(Debug, Clone, Default)]
pub struct PortfolioEngine {
    config: EngineConfig,
}

impl PortfolioEngine {
    /// Create an engine with the given configuration.
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run estimation, prior construction, Black-Litterman blend, and
    /// allocation for an aligned symbol set, with no explicit views.
    pub fn initialize(&self, prices: &AlignedPrices) -> Result<InitializeOutcome> {
        self.initialize_with_views(prices, &ViewSet::empty())
    }

    /// `initialize` with explicit investor views blended into the posterior.
    pub fn initialize_with_views(
        &self,
        prices: &AlignedPrices,
        views: &ViewSet,
    ) -> Result<InitializeOutcome> {
        let symbols = prices.symbols.clone();
        info!(n_symbols = symbols.len(), "initializing portfolio engine");

        let estimate = ReturnsEstimator::new(self.config.returns.clone())
            .estimate(&prices.close)?;
        let optimization = self.optimize(&symbols, &estimate, views)?;

        let current_prices: Vec<(String, f64)> = symbols
            .iter()
            .cloned()
            .zip(prices.latest_closes())
            .collect();

        let sample_paths = self.sample_paths(&optimization, &current_prices)?;

        Ok(InitializeOutcome {
            symbols,
            current_prices,
            optimization,
            sample_paths,
        })
    }

    /// Forecast a weight vector against the posterior of a prior
    /// `initialize`, then reduce the outcome distribution into statistics.
    pub fn simulate(
        &self,
        optimization: &OptimizationResult,
        request: &SimulationRequest,
    ) -> Result<SimulationResult> {
        let weights = self.resolve_weights(optimization, &request.weights)?;

        let sim_config = SimulationConfig {
            horizon_days: request
                .horizon_days
                .unwrap_or(self.config.simulation.horizon_days),
            path_count: request
                .path_count
                .unwrap_or(self.config.simulation.path_count),
            seed: request.seed.or(self.config.simulation.seed),
        };
        let simulator = PathSimulator::new(sim_config)?;

        let params = GbmParams::from_annual(
            &optimization.posterior_returns,
            &optimization.posterior_covariance,
        );
        let paths = simulator.simulate_portfolio(&params, &weights, request.initial_value)?;

        let stats = compute_stats(
            &paths.final_values,
            &paths.mean_path,
            request.initial_value,
            sim_config.horizon_days,
            &self.config.metrics,
        )?;
        let distribution = terminal_distribution(&paths.final_values, request.initial_value)?;

        debug!(
            expected_return = stats.expected_return,
            standard_deviation = stats.standard_deviation,
            "simulation complete"
        );

        Ok(SimulationResult {
            mean_path: paths.mean_path,
            final_values: paths.final_values,
            stats,
            distribution,
            degradation: paths.degradation,
        })
    }

    fn optimize(
        &self,
        symbols: &[String],
        estimate: &ReturnsEstimate,
        views: &ViewSet,
    ) -> Result<OptimizationResult> {
        let n = estimate.n_assets();
        let reference = equal_weights(n);

        let prior = equilibrium_returns(
            &estimate.covariance_annual,
            &reference,
            self.config.black_litterman.risk_aversion,
        )?;

        let blender = BlackLittermanBlender::new(self.config.black_litterman)?;
        let Posterior {
            returns: posterior_returns,
            covariance: posterior_covariance,
            degradation,
        } = blender.blend(&prior, &estimate.covariance_annual, views)?;

        let allocator = TangencyAllocator::new(self.config.allocator);
        let weights = allocator.allocate(&posterior_returns, &posterior_covariance, &reference)?;

        let optimal_weights: Vec<(String, f64)> = symbols
            .iter()
            .cloned()
            .zip(weights.iter().copied())
            .collect();

        Ok(OptimizationResult {
            symbols: symbols.to_vec(),
            posterior_returns,
            posterior_covariance,
            optimal_weights,
            mean_daily: estimate.mean_daily.clone(),
            covariance_daily: estimate.covariance_daily.clone(),
            degraded_estimate: estimate.degraded,
            degradation,
        })
    }

    fn sample_paths(
        &self,
        optimization: &OptimizationResult,
        current_prices: &[(String, f64)],
    ) -> Result<Vec<(String, Vec<f64>)>> {
        let simulator = PathSimulator::new(self.config.simulation)?;
        let mut sample_paths = Vec::with_capacity(current_prices.len());
        for (i, (symbol, price)) in current_prices.iter().enumerate() {
            let path = simulator.simulate_asset_path(
                optimization.mean_daily[i],
                optimization.covariance_daily[[i, i]],
                *price,
                i as u64,
            )?;
            sample_paths.push((symbol.clone(), path));
        }
        Ok(sample_paths)
    }

    /// Map caller weights onto the engine's symbol order and validate the
    /// simplex constraints.
    fn resolve_weights(
        &self,
        optimization: &OptimizationResult,
        weights: &[(String, f64)],
    ) -> Result<Array1<f64>> {
        for (symbol, _) in weights {
            if !optimization.symbols.iter().any(|s| s == symbol) {
                return Err(EngineError::InvalidWeights(format!(
                    "symbol {symbol} was not initialized"
                )));
            }
        }

        let mut resolved = Array1::<f64>::zeros(optimization.symbols.len());
        for (i, symbol) in optimization.symbols.iter().enumerate() {
            let weight = weights
                .iter()
                .find(|(s, _)| s == symbol)
                .map(|(_, w)| *w)
                .ok_or_else(|| {
                    EngineError::InvalidWeights(format!("missing weight for {symbol}"))
                })?;
            if !weight.is_finite() {
                return Err(EngineError::InvalidWeights(format!(
                    "weight for {symbol} is not finite"
                )));
            }
            if weight < 0.0 {
                return Err(EngineError::InvalidWeights(format!(
                    "weight for {symbol} is negative: {weight}"
                )));
            }
            resolved[i] = weight;
        }

        let sum = resolved.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::InvalidWeights(format!(
                "weights sum to {sum}, expected 1.0 ± {WEIGHT_SUM_TOLERANCE}"
            )));
        }

        Ok(resolved)
    }
}

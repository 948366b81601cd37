//! Composed engine configuration.
//!
//! Every tunable the components expose — τ, risk aversion, risk-free rate,
//! horizon, path count, risk thresholds — lives here as configuration rather
//! than a constant buried in the math. The whole struct round-trips through
//! serde so a deployment can pin its parameters in a file.

use ballast_model::allocate::AllocatorConfig;
use ballast_model::posterior::BlackLittermanConfig;
use ballast_model::returns::ReturnsConfig;
use ballast_sim::metrics::MetricsConfig;
use ballast_sim::paths::SimulationConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the portfolio engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Returns-estimation settings.
    pub returns: ReturnsConfig,
    /// Black-Litterman blend settings (τ, risk aversion).
    pub black_litterman: BlackLittermanConfig,
    /// Tangency-allocator settings (risk-free rate, iteration bound).
    pub allocator: AllocatorConfig,
    /// Path-simulation settings (horizon, path count, seed).
    pub simulation: SimulationConfig,
    /// Metric-reduction settings (risk-free rate, category thresholds).
    pub metrics: MetricsConfig,
}

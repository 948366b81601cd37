//! Risk and performance metrics over simulated outcomes.
//!
//! Reduces the terminal-value distribution and the mean path into the stats
//! the rest of the system formats directly: annualized expected return and
//! volatility (fractions, not percentages), Sharpe ratio, maximum drawdown
//! along the mean path, and a categorical risk label.

use crate::error::{Result, SimError};
use ballast_model::TRADING_DAYS_PER_YEAR;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for metric reduction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Annualized risk-free rate used in the Sharpe ratio (default: 0.02).
    pub risk_free_rate: f64,
    /// Annualized volatility below which a portfolio is Conservative
    /// (default: 0.10).
    pub conservative_threshold: f64,
    /// Annualized volatility below which a portfolio is Moderate;
    /// anything at or above is Aggressive (default: 0.20).
    pub moderate_threshold: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            conservative_threshold: 0.10,
            moderate_threshold: 0.20,
        }
    }
}

/// Categorical risk label derived from annualized volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    /// Annualized volatility below the conservative threshold.
    Conservative,
    /// Annualized volatility below the moderate threshold.
    Moderate,
    /// Everything else.
    Aggressive,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "Conservative"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Aggressive => write!(f, "Aggressive"),
        }
    }
}

/// Portfolio statistics derived from a simulation. Never mutated after
/// creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    /// Annualized expected return (fraction).
    pub expected_return: f64,
    /// Annualized standard deviation of terminal returns (fraction).
    pub standard_deviation: f64,
    /// Sharpe ratio; 0 by definition when the standard deviation is 0.
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline along the mean path (fraction of the
    /// running peak).
    pub max_drawdown: f64,
    /// Categorical risk label.
    pub risk_category: RiskCategory,
}

/// Percentile summary of the terminal-value distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalDistribution {
    /// 5th percentile terminal value.
    pub p5: f64,
    /// 25th percentile terminal value.
    pub p25: f64,
    /// Median terminal value.
    pub p50: f64,
    /// 75th percentile terminal value.
    pub p75: f64,
    /// 95th percentile terminal value.
    pub p95: f64,
    /// Share of paths ending below the initial value.
    pub probability_of_loss: f64,
}

/// Reduce simulated outcomes into portfolio statistics.
///
/// # Arguments
/// * `final_values` - Terminal portfolio value per path (non-empty)
/// * `mean_path` - Per-step average portfolio value (first entry = initial)
/// * `initial_value` - Starting portfolio value (> 0)
/// * `horizon_days` - Simulated horizon used for annualization (> 0)
/// * `config` - Risk-free rate and category thresholds
pub fn compute_stats(
    final_values: &[f64],
    mean_path: &[f64],
    initial_value: f64,
    horizon_days: usize,
    config: &MetricsConfig,
) -> Result<PortfolioStats> {
    if final_values.is_empty() {
        return Err(SimError::InvalidParameters(
            "final_values must not be empty".to_string(),
        ));
    }
    if horizon_days == 0 {
        return Err(SimError::InvalidParameters(
            "horizon_days must be positive".to_string(),
        ));
    }
    if !(initial_value.is_finite() && initial_value > 0.0) {
        return Err(SimError::InvalidParameters(format!(
            "initial_value must be positive, got {initial_value}"
        )));
    }

    let n = final_values.len() as f64;
    let years = horizon_days as f64 / TRADING_DAYS_PER_YEAR;

    // Horizon return annualized by dividing out the horizon fraction.
    let mean_final = final_values.iter().sum::<f64>() / n;
    let expected_return = (mean_final / initial_value - 1.0) / years;

    // Sample standard deviation of per-path horizon returns, annualized by
    // √(252 / horizon).
    let horizon_returns: Vec<f64> = final_values
        .iter()
        .map(|v| v / initial_value - 1.0)
        .collect();
    let mean_return = horizon_returns.iter().sum::<f64>() / n;
    let standard_deviation = if final_values.len() > 1 {
        let var = horizon_returns
            .iter()
            .map(|r| (r - mean_return).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        var.sqrt() / years.sqrt()
    } else {
        0.0
    };

    let sharpe_ratio = if standard_deviation == 0.0 {
        0.0
    } else {
        (expected_return - config.risk_free_rate) / standard_deviation
    };

    Ok(PortfolioStats {
        expected_return,
        standard_deviation,
        sharpe_ratio,
        max_drawdown: max_drawdown(mean_path),
        risk_category: categorize(standard_deviation, config),
    })
}

/// Largest peak-to-trough decline along a value path, as a fraction of the
/// running peak. Zero for monotonically increasing (or empty) paths.
pub fn max_drawdown(path: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for &value in path {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    worst
}

/// Percentile summary and probability of loss over terminal values.
/// Returns an error for an empty distribution.
pub fn terminal_distribution(
    final_values: &[f64],
    initial_value: f64,
) -> Result<TerminalDistribution> {
    if final_values.is_empty() {
        return Err(SimError::InvalidParameters(
            "final_values must not be empty".to_string(),
        ));
    }

    let mut sorted = final_values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();

    let percentile = |pct: f64| {
        let idx = ((pct / 100.0) * (n as f64 - 1.0)).round() as usize;
        sorted[idx.min(n - 1)]
    };

    let losses = sorted.iter().filter(|&&v| v < initial_value).count();

    Ok(TerminalDistribution {
        p5: percentile(5.0),
        p25: percentile(25.0),
        p50: percentile(50.0),
        p75: percentile(75.0),
        p95: percentile(95.0),
        probability_of_loss: losses as f64 / n as f64,
    })
}

fn categorize(standard_deviation: f64, config: &MetricsConfig) -> RiskCategory {
    if standard_deviation < config.conservative_threshold {
        RiskCategory::Conservative
    } else if standard_deviation < config.moderate_threshold {
        RiskCategory::Moderate
    } else {
        RiskCategory::Aggressive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    fn default_config() -> MetricsConfig {
        MetricsConfig::default()
    }

    #[test]
    fn test_one_year_horizon_return() {
        // Mean terminal 110k on 100k over 252 days: 10% annualized.
        let finals = vec![105_000.0, 115_000.0];
        let path = vec![100_000.0, 110_000.0];
        let stats = compute_stats(&finals, &path, 100_000.0, 252, &default_config()).unwrap();

        assert_abs_diff_eq!(stats.expected_return, 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_half_year_horizon_annualizes_up() {
        // 5% over 126 days doubles to 10% annualized.
        let finals = vec![105_000.0];
        let path = vec![100_000.0, 105_000.0];
        let stats = compute_stats(&finals, &path, 100_000.0, 126, &default_config()).unwrap();

        assert_abs_diff_eq!(stats.expected_return, 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_distribution_has_zero_sharpe() {
        // All paths identical: σ = 0, Sharpe defined as 0, not NaN.
        let finals = vec![100_000.0; 10];
        let path = vec![100_000.0; 253];
        let stats = compute_stats(&finals, &path, 100_000.0, 252, &default_config()).unwrap();

        assert_eq!(stats.standard_deviation, 0.0);
        assert_eq!(stats.sharpe_ratio, 0.0);
        assert!(stats.expected_return.is_finite());
    }

    #[test]
    fn test_single_path_is_finite() {
        let finals = vec![101_000.0];
        let path = vec![100_000.0, 101_000.0];
        let stats = compute_stats(&finals, &path, 100_000.0, 252, &default_config()).unwrap();

        assert!(stats.expected_return.is_finite());
        assert!(stats.standard_deviation.is_finite());
        assert!(stats.sharpe_ratio.is_finite());
    }

    #[test]
    fn test_max_drawdown_monotone_path_is_zero() {
        let path: Vec<f64> = (0..100).map(|i| 100_000.0 + i as f64).collect();
        assert_eq!(max_drawdown(&path), 0.0);
    }

    #[test]
    fn test_max_drawdown_peak_to_trough() {
        // Peak 120, trough 90 afterwards: drawdown 25%.
        let path = vec![100.0, 120.0, 110.0, 90.0, 115.0];
        assert_abs_diff_eq!(max_drawdown(&path), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_max_drawdown_uses_running_peak() {
        // The later, higher peak does not erase the earlier decline.
        let path = vec![100.0, 80.0, 130.0, 117.0];
        assert_abs_diff_eq!(max_drawdown(&path), 0.20, epsilon = 1e-12);
    }

    #[rstest]
    #[case(0.099_999, RiskCategory::Conservative)]
    #[case(0.10, RiskCategory::Moderate)]
    #[case(0.199_999, RiskCategory::Moderate)]
    #[case(0.20, RiskCategory::Aggressive)]
    #[case(0.35, RiskCategory::Aggressive)]
    fn test_risk_category_boundaries(#[case] sigma: f64, #[case] expected: RiskCategory) {
        assert_eq!(categorize(sigma, &default_config()), expected);
    }

    #[test]
    fn test_terminal_distribution_percentiles() {
        let finals: Vec<f64> = (1..=100).map(|i| i as f64 * 1_000.0).collect();
        let dist = terminal_distribution(&finals, 50_000.0).unwrap();

        // Index round(0.5 · 99) = 50 into the sorted values.
        assert_abs_diff_eq!(dist.p50, 51_000.0, epsilon = 1e-9);
        assert!(dist.p5 < dist.p25 && dist.p25 < dist.p75 && dist.p75 < dist.p95);
        // 49 of 100 paths end below 50k.
        assert_abs_diff_eq!(dist.probability_of_loss, 0.49, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(compute_stats(&[], &[], 100.0, 252, &default_config()).is_err());
        assert!(terminal_distribution(&[], 100.0).is_err());
    }

    #[test]
    fn test_risk_category_display() {
        assert_eq!(RiskCategory::Conservative.to_string(), "Conservative");
        assert_eq!(RiskCategory::Aggressive.to_string(), "Aggressive");
    }
}

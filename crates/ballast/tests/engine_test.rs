//! End-to-end tests of the engine surface: initialize → simulate.

use approx::assert_abs_diff_eq;
use ballast::engine::{EngineError, PortfolioEngine, SimulationRequest};
use ballast::model::views::{View, ViewSet};
use ballast::{EngineConfig, data::AlignedPrices};
use chrono::NaiveDate;
use ndarray::Array2;

/// Build aligned prices from per-symbol daily return sequences, compounding
/// from 100.0.
fn aligned_from_returns(symbols: &[&str], returns: &[Vec<f64>]) -> AlignedPrices {
    let n_dates = returns[0].len() + 1;
    let mut close = Array2::<f64>::zeros((n_dates, symbols.len()));
    for (j, series) in returns.iter().enumerate() {
        let mut price = 100.0;
        close[[0, j]] = price;
        for (t, r) in series.iter().enumerate() {
            price *= 1.0 + r;
            close[[t + 1, j]] = price;
        }
    }

    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let dates = (0..n_dates)
        .map(|i| start + chrono::Days::new(i as u64))
        .collect();

    AlignedPrices {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        dates,
        close,
    }
}

/// Two assets over 60 aligned trading days with a repeating return pattern.
fn sixty_day_universe() -> AlignedPrices {
    let pattern_a = [0.001, -0.001, 0.002];
    let pattern_b = [0.0005, 0.0015, -0.001];
    let a: Vec<f64> = (0..60).map(|i| pattern_a[i % 3]).collect();
    let b: Vec<f64> = (0..60).map(|i| pattern_b[i % 3]).collect();
    aligned_from_returns(&["ALFA", "BRVO"], &[a, b])
}

/// Two assets with enough realized volatility that the equilibrium prior
/// clears the risk-free rate and the tangency solve actually runs.
fn volatile_universe() -> AlignedPrices {
    let pattern_a = [0.02, -0.015, 0.022];
    let pattern_b = [-0.01, 0.018, 0.015];
    let a: Vec<f64> = (0..120).map(|i| pattern_a[i % 3]).collect();
    let b: Vec<f64> = (0..120).map(|i| pattern_b[i % 3]).collect();
    aligned_from_returns(&["ALFA", "BRVO"], &[a, b])
}

fn seeded_engine(seed: u64) -> PortfolioEngine {
    let mut config = EngineConfig::default();
    config.simulation.seed = Some(seed);
    PortfolioEngine::new(config)
}

#[test]
fn test_sixty_day_scenario_optimal_weights() {
    let outcome = seeded_engine(7).initialize(&sixty_day_universe()).unwrap();
    let weights = outcome.optimization.optimal_weight_vector();

    assert_abs_diff_eq!(weights.sum(), 1.0, epsilon = 1e-6);
    assert!(weights.iter().all(|&w| w >= 0.0));
    assert_eq!(outcome.symbols, vec!["ALFA", "BRVO"]);
}

#[test]
fn test_initialize_is_idempotent() {
    let engine = seeded_engine(7);
    let prices = sixty_day_universe();

    let first = engine.initialize(&prices).unwrap();
    let second = engine.initialize(&prices).unwrap();

    assert_eq!(
        first.optimization.posterior_returns,
        second.optimization.posterior_returns
    );
    assert_eq!(
        first.optimization.posterior_covariance,
        second.optimization.posterior_covariance
    );
    assert_eq!(
        first.optimization.optimal_weights,
        second.optimization.optimal_weights
    );
    assert_eq!(first.sample_paths, second.sample_paths);
}

#[test]
fn test_simulate_mean_path_shape_and_origin() {
    let engine = seeded_engine(11);
    let outcome = engine.initialize(&sixty_day_universe()).unwrap();

    let request = SimulationRequest {
        weights: outcome.optimization.optimal_weights.clone(),
        initial_value: 100_000.0,
        horizon_days: Some(252),
        path_count: Some(2000),
        seed: Some(11),
    };
    let result = engine.simulate(&outcome.optimization, &request).unwrap();

    assert_eq!(result.mean_path.len(), 253);
    assert_eq!(result.mean_path[0], 100_000.0);
    assert_eq!(result.final_values.len(), 2000);
}

#[test]
fn test_simulate_is_bit_reproducible_with_seed() {
    let engine = seeded_engine(42);
    let outcome = engine.initialize(&sixty_day_universe()).unwrap();

    let request = SimulationRequest {
        weights: outcome.optimization.optimal_weights.clone(),
        initial_value: 50_000.0,
        horizon_days: Some(60),
        path_count: Some(500),
        seed: Some(99),
    };

    let a = engine.simulate(&outcome.optimization, &request).unwrap();
    let b = engine.simulate(&outcome.optimization, &request).unwrap();

    assert_eq!(a.mean_path, b.mean_path);
    assert_eq!(a.final_values, b.final_values);
    assert_eq!(a.stats, b.stats);
}

#[test]
fn test_stats_are_finite_even_for_one_path() {
    let engine = seeded_engine(3);
    let outcome = engine.initialize(&sixty_day_universe()).unwrap();

    let request = SimulationRequest {
        weights: vec![("ALFA".into(), 0.5), ("BRVO".into(), 0.5)],
        initial_value: 10_000.0,
        horizon_days: Some(40),
        path_count: Some(1),
        seed: Some(5),
    };
    let result = engine.simulate(&outcome.optimization, &request).unwrap();

    assert!(result.stats.expected_return.is_finite());
    assert!(result.stats.standard_deviation.is_finite());
    assert!(result.stats.sharpe_ratio.is_finite());
}

#[test]
fn test_weight_sum_tolerance_edges() {
    let engine = seeded_engine(1);
    let outcome = engine.initialize(&sixty_day_universe()).unwrap();
    let simulate = |w_b: f64| {
        let request = SimulationRequest::new(
            vec![("ALFA".into(), 0.6), ("BRVO".into(), w_b)],
            100_000.0,
        );
        engine.simulate(&outcome.optimization, &request)
    };

    // Sum 1.00099: inside the 0.001 tolerance.
    assert!(simulate(0.40099).is_ok());
    // Sum 1.0011 and 1.005: outside.
    assert!(matches!(
        simulate(0.4011),
        Err(EngineError::InvalidWeights(_))
    ));
    assert!(matches!(
        simulate(0.405),
        Err(EngineError::InvalidWeights(_))
    ));
}

#[test]
fn test_weight_validation_rejects_bad_vectors() {
    let engine = seeded_engine(1);
    let outcome = engine.initialize(&sixty_day_universe()).unwrap();
    let simulate = |weights: Vec<(String, f64)>| {
        engine.simulate(
            &outcome.optimization,
            &SimulationRequest::new(weights, 100_000.0),
        )
    };

    // Negative entry.
    assert!(matches!(
        simulate(vec![("ALFA".into(), 1.2), ("BRVO".into(), -0.2)]),
        Err(EngineError::InvalidWeights(_))
    ));
    // Unknown symbol.
    assert!(matches!(
        simulate(vec![("ALFA".into(), 0.5), ("ZETA".into(), 0.5)]),
        Err(EngineError::InvalidWeights(_))
    ));
    // Missing symbol.
    assert!(matches!(
        simulate(vec![("ALFA".into(), 1.0)]),
        Err(EngineError::InvalidWeights(_))
    ));
}

#[test]
fn test_zero_variance_universe_yields_zero_sharpe() {
    // Constant prices: zero returns, zero covariance.
    let flat = vec![0.0; 30];
    let prices = aligned_from_returns(&["ALFA", "BRVO"], &[flat.clone(), flat]);

    let engine = seeded_engine(2);
    let outcome = engine.initialize(&prices).unwrap();

    // No tangency signal: equal-weight reference fallback.
    let weights = outcome.optimization.optimal_weight_vector();
    assert_abs_diff_eq!(weights[0], 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(weights[1], 0.5, epsilon = 1e-9);

    let request = SimulationRequest::new(outcome.optimization.optimal_weights.clone(), 100_000.0);
    let result = engine.simulate(&outcome.optimization, &request).unwrap();

    assert_eq!(result.stats.standard_deviation, 0.0);
    assert_eq!(result.stats.sharpe_ratio, 0.0);
    assert!(result.final_values.iter().all(|v| v.is_finite()));
}

#[test]
fn test_empty_views_match_plain_initialize() {
    let engine = seeded_engine(4);
    let prices = sixty_day_universe();

    let plain = engine.initialize(&prices).unwrap();
    let with_empty = engine
        .initialize_with_views(&prices, &ViewSet::empty())
        .unwrap();

    assert_eq!(
        plain.optimization.posterior_returns,
        with_empty.optimization.posterior_returns
    );
    assert_eq!(
        plain.optimization.optimal_weights,
        with_empty.optimization.optimal_weights
    );
}

#[test]
fn test_tangency_path_engaged_for_volatile_universe() {
    let engine = seeded_engine(8);
    let outcome = engine.initialize(&volatile_universe()).unwrap();
    let weights = outcome.optimization.optimal_weight_vector();

    assert_abs_diff_eq!(weights.sum(), 1.0, epsilon = 1e-6);
    assert!(weights.iter().all(|&w| w >= 0.0));
    // Distinct return/risk profiles: the solution is not the equal-weight
    // fallback.
    assert!((weights[0] - 0.5).abs() > 1e-6);
}

#[test]
fn test_views_shift_the_allocation() {
    let engine = seeded_engine(4);
    let prices = volatile_universe();

    let plain = engine.initialize(&prices).unwrap();
    let views = ViewSet::from_views(vec![View::absolute(0, 0.25, 0.9)]);
    let opinionated = engine.initialize_with_views(&prices, &views).unwrap();

    // A strong bullish view on asset 0 must move its posterior return and
    // pull allocation toward it.
    assert!(
        opinionated.optimization.posterior_returns[0]
            > plain.optimization.posterior_returns[0]
    );
    assert!(
        opinionated.optimization.optimal_weights[0].1
            >= plain.optimization.optimal_weights[0].1
    );
}

#[test]
fn test_insufficient_data_is_terminal() {
    let prices = AlignedPrices {
        symbols: vec!["ALFA".into()],
        dates: vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()],
        close: Array2::from_elem((1, 1), 100.0),
    };
    let err = seeded_engine(1).initialize(&prices).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Model(ballast::model::ModelError::InsufficientData { .. })
    ));
}

#[test]
fn test_invalid_price_is_terminal() {
    let mut prices = sixty_day_universe();
    prices.close[[5, 1]] = -4.0;

    let err = seeded_engine(1).initialize(&prices).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Model(ballast::model::ModelError::InvalidPrice { asset: 1, row: 5, .. })
    ));
}

#[test]
fn test_sample_paths_one_per_symbol() {
    let engine = seeded_engine(13);
    let outcome = engine.initialize(&sixty_day_universe()).unwrap();

    assert_eq!(outcome.sample_paths.len(), 2);
    for ((symbol, path), (_, price)) in
        outcome.sample_paths.iter().zip(&outcome.current_prices)
    {
        assert_eq!(path.len(), engine.config().simulation.horizon_days + 1);
        assert_abs_diff_eq!(path[0], *price);
        assert!(outcome.symbols.contains(symbol));
    }
}

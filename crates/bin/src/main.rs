//! Ballast CLI binary.
//!
//! Fetches market data, runs the optimization engine, and forecasts
//! portfolios from the command line.

mod integration;

use ballast::engine::{PortfolioEngine, SimulationRequest};
use ballast::EngineConfig;
use ballast_data::YahooQuoteProvider;
use ballast_output::{
    AllocationExport, ExportFormat, Exporter, Placeholder, QuoteExport, ReportBuilder,
    SimulationExport,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use integration::data_pipeline::{fetch_aligned, parse_weight_args};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ballast")]
#[command(about = "Ballast: portfolio optimization and Monte Carlo forecasting", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the optimal allocation for a set of symbols
    Init {
        /// Stock symbols (defaults to the curated universe)
        symbols: Vec<String>,

        /// Historical lookback in days
        #[arg(long, default_value = "365")]
        lookback_days: i64,

        /// Black-Litterman tau
        #[arg(long)]
        tau: Option<f64>,

        /// Risk-aversion coefficient
        #[arg(long)]
        risk_aversion: Option<f64>,

        /// Random seed for the illustrative sample paths
        #[arg(long)]
        seed: Option<u64>,

        /// Output format (text, json, or csv)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Forecast a weighted portfolio forward under uncertainty
    Simulate {
        /// Weights as SYMBOL=FRACTION pairs (e.g. AAPL=0.6 MSFT=0.4)
        weights: Vec<String>,

        /// Starting portfolio value
        #[arg(long, default_value = "100000")]
        initial: f64,

        /// Simulation horizon in trading days
        #[arg(long)]
        horizon: Option<usize>,

        /// Number of Monte Carlo paths
        #[arg(long)]
        paths: Option<usize>,

        /// Random seed for reproducible forecasts
        #[arg(long)]
        seed: Option<u64>,

        /// Historical lookback in days
        #[arg(long, default_value = "365")]
        lookback_days: i64,

        /// Output format (text, json, or csv)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show a snapshot quote with key ratios
    Quote {
        /// Stock symbol
        symbol: String,

        /// Output format (text, json, or csv)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            symbols,
            lookback_days,
            tau,
            risk_aversion,
            seed,
            format,
        } => {
            let symbols = resolve_symbols(symbols);
            let mut config = EngineConfig::default();
            if let Some(tau) = tau {
                config.black_litterman.tau = tau;
            }
            if let Some(delta) = risk_aversion {
                config.black_litterman.risk_aversion = delta;
            }
            if seed.is_some() {
                config.simulation.seed = seed;
            }

            let prices = fetch_with_progress(&symbols, lookback_days).await?;
            let engine = PortfolioEngine::new(config);
            let outcome = engine.initialize(&prices)?;

            let allocations: Vec<AllocationExport> = outcome
                .optimization
                .optimal_weights
                .iter()
                .zip(&outcome.current_prices)
                .enumerate()
                .map(|(i, ((symbol, weight), (_, price)))| AllocationExport {
                    symbol: symbol.clone(),
                    weight: *weight,
                    current_price: *price,
                    posterior_return: outcome.optimization.posterior_returns[i],
                })
                .collect();

            match format.as_str() {
                "json" => {
                    let report = ReportBuilder::new()
                        .symbols(outcome.symbols.clone())
                        .lookback_days(lookback_days)
                        .contents(serde_json::json!({
                            "allocations": serde_json::to_value(&allocations)?,
                            "degraded_estimate": outcome.optimization.degraded_estimate,
                        }))
                        .build();
                    println!("{}", report.to_json()?);
                }
                "csv" => println!(
                    "{}",
                    Exporter::new().export_allocations(&allocations, ExportFormat::Csv)?
                ),
                _ => print_allocations(&allocations, &outcome),
            }
        }

        Commands::Simulate {
            weights,
            initial,
            horizon,
            paths,
            seed,
            lookback_days,
            format,
        } => {
            let weights = parse_weight_args(&weights)?;
            if weights.is_empty() {
                return Err("at least one SYMBOL=FRACTION pair is required".into());
            }
            let symbols: Vec<String> = weights.iter().map(|(s, _)| s.clone()).collect();

            let prices = fetch_with_progress(&symbols, lookback_days).await?;
            let engine = PortfolioEngine::new(EngineConfig::default());
            let outcome = engine.initialize(&prices)?;

            let request = SimulationRequest {
                weights,
                initial_value: initial,
                horizon_days: horizon,
                path_count: paths,
                seed,
            };
            let result = engine.simulate(&outcome.optimization, &request)?;

            let export = SimulationExport {
                expected_return: result.stats.expected_return,
                standard_deviation: result.stats.standard_deviation,
                sharpe_ratio: result.stats.sharpe_ratio,
                max_drawdown: result.stats.max_drawdown,
                risk_category: result.stats.risk_category.to_string(),
                probability_of_loss: result.distribution.probability_of_loss,
                percentiles: [
                    result.distribution.p5,
                    result.distribution.p25,
                    result.distribution.p50,
                    result.distribution.p75,
                    result.distribution.p95,
                ],
                mean_path: result.mean_path.clone(),
            };

            match format.as_str() {
                "json" => println!(
                    "{}",
                    Exporter::new().export_simulation(&export, ExportFormat::PrettyJson)?
                ),
                "csv" => println!(
                    "{}",
                    Exporter::new().export_simulation(&export, ExportFormat::Csv)?
                ),
                _ => print_simulation(&export, initial),
            }
        }

        Commands::Quote { symbol, format } => {
            let provider = YahooQuoteProvider::new();
            let quote = provider.fetch_quote(&symbol).await?;

            let export = QuoteExport {
                symbol: quote.symbol.clone(),
                name: quote.name.clone().unwrap_or_else(|| quote.symbol.clone()),
                price: quote.price,
                change: Placeholder(quote.change),
                changes_percentage: Placeholder(quote.changes_percentage),
                market_cap: Placeholder(quote.ratios.market_cap),
                pe_ratio: Placeholder(quote.ratios.pe_ratio),
                eps: Placeholder(quote.ratios.eps),
                dividend_yield: Placeholder(quote.ratios.dividend_yield.map(|y| y * 100.0)),
                beta: Placeholder(quote.ratios.beta),
                roe: Placeholder(quote.ratios.roe.map(|r| r * 100.0)),
            };

            match format.as_str() {
                "json" => println!(
                    "{}",
                    Exporter::new().export_quotes(
                        std::slice::from_ref(&export),
                        ExportFormat::PrettyJson
                    )?
                ),
                "csv" => println!(
                    "{}",
                    Exporter::new()
                        .export_quotes(std::slice::from_ref(&export), ExportFormat::Csv)?
                ),
                _ => print_quote(&export),
            }
        }
    }

    Ok(())
}

/// Empty symbol list falls back to the curated universe.
fn resolve_symbols(symbols: Vec<String>) -> Vec<String> {
    if symbols.is_empty() {
        ballast::CuratedUniverse::new().symbols()
    } else {
        symbols.into_iter().map(|s| s.to_uppercase()).collect()
    }
}

async fn fetch_with_progress(
    symbols: &[String],
    lookback_days: i64,
) -> Result<ballast_data::AlignedPrices, Box<dyn std::error::Error>> {
    let provider = YahooQuoteProvider::new();
    let pb = ProgressBar::new(symbols.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
            .expect("static template")
            .progress_chars("=> "),
    );

    let prices = fetch_aligned(&provider, symbols, lookback_days, Some(&pb)).await?;
    pb.finish_and_clear();
    Ok(prices)
}

fn print_allocations(
    allocations: &[AllocationExport],
    outcome: &ballast::engine::InitializeOutcome,
) {
    println!("Optimal allocation ({} symbols):", allocations.len());
    for row in allocations {
        println!(
            "  {:<6} {:>7.2}%  price {:>10.2}  posterior return {:>7.2}%",
            row.symbol,
            row.weight * 100.0,
            row.current_price,
            row.posterior_return * 100.0,
        );
    }
    if outcome.optimization.degraded_estimate {
        println!("  note: estimated from a small sample; treat figures as indicative");
    }
    if outcome.optimization.degradation.is_some() {
        println!("  note: numerical regularization was applied during optimization");
    }
}

fn print_simulation(export: &SimulationExport, initial: f64) {
    println!("Forecast over {} steps:", export.mean_path.len() - 1);
    println!("  expected return      {:>8.2}%", export.expected_return * 100.0);
    println!("  volatility           {:>8.2}%", export.standard_deviation * 100.0);
    println!("  Sharpe ratio         {:>8.2}", export.sharpe_ratio);
    println!("  max drawdown         {:>8.2}%", export.max_drawdown * 100.0);
    println!("  risk category        {:>8}", export.risk_category);
    println!(
        "  P(loss)              {:>8.2}%",
        export.probability_of_loss * 100.0
    );
    println!(
        "  terminal p5/p50/p95  {:>10.0} / {:>10.0} / {:>10.0}  (initial {:.0})",
        export.percentiles[0], export.percentiles[2], export.percentiles[4], initial
    );
}

fn print_quote(quote: &QuoteExport) {
    println!("{} ({})", quote.name, quote.symbol);
    println!("  price            {:>12.2}", quote.price);
    println!("  change           {:>12}", quote.change);
    println!("  change %         {:>12}", quote.changes_percentage);
    println!("  market cap       {:>12}", quote.market_cap);
    println!("  P/E              {:>12}", quote.pe_ratio);
    println!("  EPS (fwd)        {:>12}", quote.eps);
    println!("  dividend yield % {:>12}", quote.dividend_yield);
    println!("  beta             {:>12}", quote.beta);
    println!("  ROE %            {:>12}", quote.roe);
}

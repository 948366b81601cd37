//! Data pipeline fetching and aligning price history for the engine.
//!
//! Fetches each requested symbol's history concurrently from Yahoo Finance
//! (retrying once per symbol — provider hiccups are the caller's problem,
//! not the engine's), then intersects trading dates into the aligned close
//! matrix the engine consumes.

use ballast_data::{AlignedPrices, PriceSeries, YahooQuoteProvider, align};
use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::warn;

/// Number of concurrent symbol fetches.
const DEFAULT_CONCURRENCY: usize = 8;

/// Error type for data pipeline operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DataPipelineError {
    /// Data fetch or alignment error.
    #[error("Data error: {0}")]
    Data(#[from] ballast_data::DataError),

    /// A weight argument could not be parsed.
    #[error("Invalid weight argument '{0}': expected SYMBOL=FRACTION")]
    InvalidWeightArg(String),
}

/// Fetch and align history for the requested symbols over a trailing
/// lookback window.
pub(crate) async fn fetch_aligned(
    provider: &YahooQuoteProvider,
    symbols: &[String],
    lookback_days: i64,
    progress: Option<&ProgressBar>,
) -> Result<AlignedPrices, DataPipelineError> {
    let end = Utc::now();
    let start = end - Duration::days(lookback_days);

    if let Some(pb) = progress {
        pb.set_length(symbols.len() as u64);
        pb.set_message(format!(
            "Fetching {} symbols ({} concurrent)...",
            symbols.len(),
            DEFAULT_CONCURRENCY
        ));
    }

    let mut fetched: Vec<PriceSeries> = Vec::with_capacity(symbols.len());
    let mut results = stream::iter(symbols.iter().cloned())
        .map(|symbol| async move {
            match provider.fetch_history(&symbol, start, end).await {
                Ok(series) => Ok(series),
                Err(first_err) => {
                    // Retry once, then give up on the whole request.
                    warn!(%symbol, %first_err, "fetch failed; retrying once");
                    provider.fetch_history(&symbol, start, end).await
                }
            }
        })
        .buffer_unordered(DEFAULT_CONCURRENCY);

    while let Some(result) = results.next().await {
        fetched.push(result?);
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    // buffer_unordered scrambles completion order; restore request order so
    // weights and output columns line up with what the user asked for.
    fetched.sort_by_key(|series| {
        symbols
            .iter()
            .position(|s| s == series.symbol())
            .unwrap_or(usize::MAX)
    });

    Ok(align(&fetched)?)
}

/// Parse `SYMBOL=FRACTION` CLI arguments into weight pairs.
pub(crate) fn parse_weight_args(
    args: &[String],
) -> Result<Vec<(String, f64)>, DataPipelineError> {
    args.iter()
        .map(|arg| {
            let (symbol, weight) = arg
                .split_once('=')
                .ok_or_else(|| DataPipelineError::InvalidWeightArg(arg.clone()))?;
            let weight: f64 = weight
                .parse()
                .map_err(|_| DataPipelineError::InvalidWeightArg(arg.clone()))?;
            Ok((symbol.trim().to_uppercase(), weight))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weight_args() {
        let parsed = parse_weight_args(&[
            "aapl=0.6".to_string(),
            "MSFT=0.4".to_string(),
        ])
        .unwrap();

        assert_eq!(parsed[0], ("AAPL".to_string(), 0.6));
        assert_eq!(parsed[1], ("MSFT".to_string(), 0.4));
    }

    #[test]
    fn test_parse_weight_args_rejects_malformed() {
        assert!(parse_weight_args(&["AAPL".to_string()]).is_err());
        assert!(parse_weight_args(&["AAPL=abc".to_string()]).is_err());
    }
}

//! Snapshot quotes with key ratios.
//!
//! A quote is assembled from two sources: the recent price history (price and
//! day change) and the quoteSummary endpoint (long name and fundamental
//! ratios). Fields the provider does not report stay `None` — downstream
//! serialization decides how to render absence.

use crate::error::{DataError, Result};
use crate::yahoo::history::YahooQuoteProvider;
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const QUOTE_SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const QUOTE_SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData";

/// Fundamental ratios for a symbol. Every field is optional: providers
/// routinely omit them for ETFs, indices, and recent listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyRatios {
    /// Market capitalization.
    pub market_cap: Option<f64>,
    /// Trailing price-to-earnings ratio.
    pub pe_ratio: Option<f64>,
    /// Forward earnings per share.
    pub eps: Option<f64>,
    /// Dividend yield as a fraction (0.01 = 1%).
    pub dividend_yield: Option<f64>,
    /// Beta versus the broad market.
    pub beta: Option<f64>,
    /// Return on equity as a fraction.
    pub roe: Option<f64>,
}

/// Snapshot quote for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol, uppercased.
    pub symbol: String,
    /// Long company name when the provider reports one.
    pub name: Option<String>,
    /// Last close price.
    pub price: f64,
    /// Absolute change versus the previous close.
    pub change: Option<f64>,
    /// Percent change versus the previous close.
    pub changes_percentage: Option<f64>,
    /// Fundamental ratios.
    pub ratios: KeyRatios,
}

impl YahooQuoteProvider {
    /// Fetch a snapshot quote with key ratios.
    ///
    /// A missing price is an error; missing ratios or name degrade to `None`
    /// with a logged warning.
    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = symbol.to_uppercase();
        let end = Utc::now();
        let start = end - ChronoDuration::days(10);

        let series = self.fetch_history(&symbol, start, end).await?;
        let points = series.points();
        let price = series.last_close();
        if !(price.is_finite() && price > 0.0) {
            return Err(DataError::MissingData {
                symbol,
                reason: "no usable last price".to_string(),
            });
        }

        let previous_close = points
            .len()
            .checked_sub(2)
            .map(|i| points[i].adjusted_close)
            .filter(|p| p.is_finite() && *p > 0.0);
        let change = previous_close.map(|prev| price - prev);
        let changes_percentage = previous_close.map(|prev| (price - prev) / prev * 100.0);

        let (name, ratios) = match self.fetch_quote_summary(&symbol).await {
            Ok(summary) => (parse_name(&summary), parse_ratios(&summary)),
            Err(err) => {
                warn!(%symbol, %err, "quoteSummary unavailable; ratios omitted");
                (None, KeyRatios::default())
            }
        };

        Ok(Quote {
            symbol,
            name,
            price,
            change,
            changes_percentage,
            ratios,
        })
    }

    async fn fetch_quote_summary(&self, symbol: &str) -> Result<Value> {
        let url = format!("{QUOTE_SUMMARY_URL}/{symbol}?modules={QUOTE_SUMMARY_MODULES}");
        let response = reqwest::Client::builder()
            .user_agent("ballast/0.1")
            .build()?
            .get(&url)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}

/// Pull the long (or short) company name out of a quoteSummary payload.
pub(crate) fn parse_name(summary: &Value) -> Option<String> {
    let price = summary.pointer("/quoteSummary/result/0/price")?;
    price
        .get("longName")
        .or_else(|| price.get("shortName"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Pull the key ratios out of a quoteSummary payload; anything absent or
/// non-numeric stays `None`.
pub(crate) fn parse_ratios(summary: &Value) -> KeyRatios {
    let raw = |path: &str| summary.pointer(path).and_then(Value::as_f64);
    let result = "/quoteSummary/result/0";

    KeyRatios {
        market_cap: raw(&format!("{result}/summaryDetail/marketCap/raw")),
        pe_ratio: raw(&format!("{result}/summaryDetail/trailingPE/raw")),
        eps: raw(&format!("{result}/defaultKeyStatistics/forwardEps/raw")),
        dividend_yield: raw(&format!("{result}/summaryDetail/dividendYield/raw")),
        beta: raw(&format!("{result}/summaryDetail/beta/raw")),
        roe: raw(&format!("{result}/financialData/returnOnEquity/raw")),
    }
}

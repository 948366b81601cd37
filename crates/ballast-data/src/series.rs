//! Price series types and cross-symbol date alignment.
//!
//! Covariance estimation needs every symbol observed on the same trading
//! dates, so alignment intersects the date sets (inner join) rather than
//! filling gaps. The result is a dates × assets close matrix ready for the
//! engine.

use crate::error::{DataError, Result};
use chrono::{Datelike, NaiveDate};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// A single OHLCV observation. Immutable once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading date.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Intraday high.
    pub high: f64,
    /// Intraday low.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Split/dividend-adjusted close; the engine reads this field.
    pub adjusted_close: f64,
    /// Trading volume.
    pub volume: u64,
}

/// Ordered-by-date price history for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, sorting by date and requiring at least two points
    /// (one return).
    pub fn new(symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Result<Self> {
        let symbol = symbol.into();
        if points.len() < 2 {
            return Err(DataError::MissingData {
                symbol,
                reason: format!("need at least 2 data points, got {}", points.len()),
            });
        }
        points.sort_by_key(|p| p.date);
        Ok(Self { symbol, points })
    }

    /// The symbol this series belongs to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The observations, ordered by date.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: construction requires two points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent adjusted close.
    pub fn last_close(&self) -> f64 {
        self.points[self.points.len() - 1].adjusted_close
    }
}

/// Date-intersected close prices across a set of symbols.
#[derive(Debug, Clone)]
pub struct AlignedPrices {
    /// Symbols, in column order of `close`.
    pub symbols: Vec<String>,
    /// Shared trading dates, in row order of `close`.
    pub dates: Vec<NaiveDate>,
    /// Adjusted close matrix, dates × symbols.
    pub close: Array2<f64>,
}

impl AlignedPrices {
    /// Number of assets (columns).
    pub fn n_assets(&self) -> usize {
        self.symbols.len()
    }

    /// Number of shared trading dates (rows).
    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    /// Latest aligned close per symbol (the last row).
    pub fn latest_closes(&self) -> Vec<f64> {
        let last = self.close.nrows() - 1;
        self.close.row(last).to_vec()
    }
}

/// Intersect trading dates across symbols and assemble the close matrix.
///
/// Symbols missing a date drop that row for everyone (inner join); fewer
/// than two surviving rows is an error since no return can be computed.
pub fn align(series: &[PriceSeries]) -> Result<AlignedPrices> {
    if series.is_empty() {
        return Err(DataError::EmptyUniverse);
    }
    for (i, s) in series.iter().enumerate() {
        if series[..i].iter().any(|other| other.symbol() == s.symbol()) {
            return Err(DataError::InvalidSymbol(format!(
                "duplicate symbol {}",
                s.symbol()
            )));
        }
    }

    // One frame per symbol: integer day key + adjusted close named by symbol.
    let mut frames = series.iter().map(|s| {
        let days: Vec<i32> = s.points().iter().map(|p| p.date.num_days_from_ce()).collect();
        let closes: Vec<f64> = s.points().iter().map(|p| p.adjusted_close).collect();
        DataFrame::new(vec![
            Series::new("date".into(), days).into(),
            Series::new(s.symbol().into(), closes).into(),
        ])
        .map(DataFrame::lazy)
    });

    let first = frames.next().expect("non-empty checked above")?;
    let mut joined = first;
    for frame in frames {
        joined = joined.join(
            frame?,
            [col("date")],
            [col("date")],
            JoinArgs::new(JoinType::Inner),
        );
    }

    let df = joined
        .sort(["date"], SortMultipleOptions::default())
        .collect()?;

    let n_dates = df.height();
    if n_dates < 2 {
        return Err(DataError::InsufficientOverlap {
            required: 2,
            actual: n_dates,
        });
    }

    let day_numbers = df.column("date")?.i32()?;
    let mut dates = Vec::with_capacity(n_dates);
    for i in 0..n_dates {
        let days = day_numbers
            .get(i)
            .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;
        let date = NaiveDate::from_num_days_from_ce_opt(days)
            .ok_or_else(|| DataError::TimeConversion(format!("day number {days}")))?;
        dates.push(date);
    }

    let symbols: Vec<String> = series.iter().map(|s| s.symbol().to_string()).collect();
    let mut close = Array2::<f64>::zeros((n_dates, symbols.len()));
    for (j, symbol) in symbols.iter().enumerate() {
        let column = df.column(symbol.as_str())?.f64()?;
        for i in 0..n_dates {
            close[[i, j]] = column
                .get(i)
                .ok_or_else(|| DataError::Parse(format!("Missing close for {symbol}")))?;
        }
    }

    Ok(AlignedPrices {
        symbols,
        dates,
        close,
    })
}

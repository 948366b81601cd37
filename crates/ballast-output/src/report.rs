//! Report generation for Ballast runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A report from a Ballast engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Symbols the run covered.
    pub symbols: Vec<String>,
    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Lookback period in days used for estimation.
    pub lookback_days: i64,
    /// Report contents (JSON format).
    pub contents: serde_json::Value,
}

impl Report {
    /// Create a new report.
    pub fn new(symbols: Vec<String>, lookback_days: i64, contents: serde_json::Value) -> Self {
        Self {
            symbols,
            timestamp: Utc::now(),
            lookback_days,
            contents,
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    symbols: Vec<String>,
    lookback_days: Option<i64>,
    contents: Option<serde_json::Value>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the symbols.
    pub fn symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    /// Set the lookback period.
    pub const fn lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = Some(days);
        self
    }

    /// Set the report contents.
    pub fn contents(mut self, contents: serde_json::Value) -> Self {
        self.contents = Some(contents);
        self
    }

    /// Build the report.
    pub fn build(self) -> Report {
        Report::new(
            self.symbols,
            self.lookback_days.unwrap_or(365),
            self.contents.unwrap_or(serde_json::Value::Null),
        )
    }
}

//! Export functionality for Ballast results.
//!
//! Provides CSV and JSON export for quotes, allocations, and simulation
//! outcomes. Absent numerics cross this boundary as the `"N/A"` placeholder;
//! upstream they are typed `Option`s.

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer produced invalid UTF-8.
    #[error("Invalid UTF-8 in CSV output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// A possibly-absent numeric that serializes the absent case as `"N/A"`.
///
/// This is the boundary type the UI formats directly: a number when the
/// value exists, the placeholder string when it does not.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct Placeholder(pub Option<f64>);

impl Serialize for Placeholder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str("N/A"),
        }
    }
}

impl From<Option<f64>> for Placeholder {
    fn from(value: Option<f64>) -> Self {
        Self(value)
    }
}

impl From<serde_json::Value> for Placeholder {
    fn from(value: serde_json::Value) -> Self {
        Self(value.as_f64())
    }
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value:.4}"),
            None => write!(f, "N/A"),
        }
    }
}

/// Snapshot quote row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteExport {
    /// Ticker symbol.
    pub symbol: String,
    /// Company name, or the symbol itself when unknown.
    pub name: String,
    /// Last price.
    pub price: f64,
    /// Day change.
    pub change: Placeholder,
    /// Day change in percent.
    pub changes_percentage: Placeholder,
    /// Market capitalization.
    pub market_cap: Placeholder,
    /// Trailing P/E.
    pub pe_ratio: Placeholder,
    /// Forward EPS.
    pub eps: Placeholder,
    /// Dividend yield in percent.
    pub dividend_yield: Placeholder,
    /// Beta.
    pub beta: Placeholder,
    /// Return on equity in percent.
    pub roe: Placeholder,
}

/// One symbol's slice of an allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationExport {
    /// Ticker symbol.
    pub symbol: String,
    /// Optimal weight (fraction of the portfolio).
    pub weight: f64,
    /// Latest price used at initialization.
    pub current_price: f64,
    /// Posterior annualized expected return.
    pub posterior_return: f64,
}

/// A simulation outcome flattened for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationExport {
    /// Annualized expected return (fraction).
    pub expected_return: f64,
    /// Annualized standard deviation (fraction).
    pub standard_deviation: f64,
    /// Sharpe ratio.
    pub sharpe_ratio: f64,
    /// Maximum drawdown along the mean path (fraction).
    pub max_drawdown: f64,
    /// Risk category label.
    pub risk_category: String,
    /// Share of paths ending below the initial value.
    pub probability_of_loss: f64,
    /// Terminal-value percentiles (5/25/50/75/95).
    pub percentiles: [f64; 5],
    /// Per-step average portfolio value.
    pub mean_path: Vec<f64>,
}

impl SimulationExport {
    fn metric_rows(&self) -> Vec<MetricRow> {
        let mut rows = vec![
            MetricRow::new("expected_return", self.expected_return),
            MetricRow::new("standard_deviation", self.standard_deviation),
            MetricRow::new("sharpe_ratio", self.sharpe_ratio),
            MetricRow::new("max_drawdown", self.max_drawdown),
            MetricRow::new("probability_of_loss", self.probability_of_loss),
        ];
        for (label, value) in ["p5", "p25", "p50", "p75", "p95"]
            .iter()
            .zip(self.percentiles)
        {
            rows.push(MetricRow::new(label, value));
        }
        rows
    }
}

/// Flat metric/value row for CSV output.
#[derive(Debug, Clone, Serialize)]
struct MetricRow {
    metric: String,
    value: f64,
}

impl MetricRow {
    fn new(metric: &str, value: f64) -> Self {
        Self {
            metric: metric.to_string(),
            value,
        }
    }
}

/// Exporter writing Ballast results to strings or files.
#[derive(Debug, Default)]
pub struct Exporter;

impl Exporter {
    /// Create a new exporter.
    pub const fn new() -> Self {
        Self
    }

    /// Export quote rows in the given format.
    pub fn export_quotes(
        &self,
        quotes: &[QuoteExport],
        format: ExportFormat,
    ) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(quotes),
            ExportFormat::Json => Ok(serde_json::to_string(quotes)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(quotes)?),
        }
    }

    /// Export allocation rows in the given format.
    pub fn export_allocations(
        &self,
        allocations: &[AllocationExport],
        format: ExportFormat,
    ) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(allocations),
            ExportFormat::Json => Ok(serde_json::to_string(allocations)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(allocations)?),
        }
    }

    /// Export a simulation outcome in the given format. CSV flattens the
    /// statistics to metric/value rows and omits the mean path.
    pub fn export_simulation(
        &self,
        simulation: &SimulationExport,
        format: ExportFormat,
    ) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(&simulation.metric_rows()),
            ExportFormat::Json => Ok(serde_json::to_string(simulation)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(simulation)?),
        }
    }

    /// Write already-rendered content next to the right extension.
    pub fn write_to_path(
        &self,
        content: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), ExportError> {
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn to_csv<T: Serialize>(records: &[T]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quote() -> QuoteExport {
        QuoteExport {
            symbol: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            price: 189.5,
            change: Placeholder(Some(1.2)),
            changes_percentage: Placeholder(Some(0.64)),
            market_cap: Placeholder(Some(2.9e12)),
            pe_ratio: Placeholder(None),
            eps: Placeholder(None),
            dividend_yield: Placeholder(Some(0.55)),
            beta: Placeholder(Some(1.25)),
            roe: Placeholder(None),
        }
    }

    #[test]
    fn test_placeholder_json_rendering() {
        assert_eq!(
            serde_json::to_string(&Placeholder(Some(1.5))).unwrap(),
            "1.5"
        );
        assert_eq!(
            serde_json::to_string(&Placeholder(None)).unwrap(),
            "\"N/A\""
        );
    }

    #[test]
    fn test_placeholder_roundtrip() {
        let json = serde_json::to_string(&Placeholder(None)).unwrap();
        let back: Placeholder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Placeholder(None));

        let back: Placeholder = serde_json::from_str("2.25").unwrap();
        assert_eq!(back, Placeholder(Some(2.25)));
    }

    #[test]
    fn test_quote_csv_contains_placeholder() {
        let csv = Exporter::new()
            .export_quotes(&[sample_quote()], ExportFormat::Csv)
            .unwrap();

        assert!(csv.starts_with("symbol,name,price"));
        assert!(csv.contains("AAPL"));
        assert!(csv.contains("N/A"));
    }

    #[test]
    fn test_quote_json_mixes_numbers_and_placeholder() {
        let json = Exporter::new()
            .export_quotes(&[sample_quote()], ExportFormat::Json)
            .unwrap();

        assert!(json.contains("\"pe_ratio\":\"N/A\""));
        assert!(json.contains("\"beta\":1.25"));
    }

    #[test]
    fn test_simulation_csv_flattens_metrics() {
        let export = SimulationExport {
            expected_return: 0.08,
            standard_deviation: 0.12,
            sharpe_ratio: 0.5,
            max_drawdown: 0.03,
            risk_category: "Moderate".to_string(),
            probability_of_loss: 0.21,
            percentiles: [90_000.0, 95_000.0, 104_000.0, 112_000.0, 125_000.0],
            mean_path: vec![100_000.0, 100_100.0],
        };

        let csv = Exporter::new()
            .export_simulation(&export, ExportFormat::Csv)
            .unwrap();
        assert!(csv.contains("metric,value"));
        assert!(csv.contains("sharpe_ratio,0.5"));
        assert!(csv.contains("p95,125000"));
        // Mean path stays out of the flat CSV.
        assert!(!csv.contains("100100"));
    }

    #[test]
    fn test_allocation_export_json() {
        let rows = vec![AllocationExport {
            symbol: "KO".to_string(),
            weight: 0.4,
            current_price: 61.2,
            posterior_return: 0.05,
        }];
        let json = Exporter::new()
            .export_allocations(&rows, ExportFormat::PrettyJson)
            .unwrap();
        assert!(json.contains("\"symbol\": \"KO\""));
    }

    #[test]
    fn test_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Json.extension(), "json");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }
}

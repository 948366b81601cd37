//! Error types for estimation and optimization.

use thiserror::Error;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur during estimation and optimization.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A price observation was zero, negative, or non-finite.
    #[error("Invalid price for asset {asset} at row {row}: {value}")]
    InvalidPrice {
        /// Column index of the offending asset.
        asset: usize,
        /// Row index of the offending observation.
        row: usize,
        /// The rejected price value.
        value: f64,
    },

    /// Too few aligned observations for estimation.
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations.
        required: usize,
        /// Actual number of observations.
        actual: usize,
    },

    /// Matrix or vector dimensions do not agree.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// A matrix could not be inverted even after regularization.
    #[error("Singular matrix: not invertible after diagonal loading")]
    SingularMatrix,

    /// A matrix could not be Cholesky-factored even after regularization.
    #[error("Matrix is not positive definite after diagonal loading")]
    NotPositiveDefinite,

    /// The weight solver did not converge to a valid allocation.
    #[error("Optimization failed to converge after {iterations} iterations")]
    OptimizationFailed {
        /// Iterations spent before giving up.
        iterations: usize,
    },

    /// Invalid configuration or input parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

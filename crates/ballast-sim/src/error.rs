//! Error types for simulation and metrics.

use ballast_model::ModelError;
use thiserror::Error;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur during simulation and metric reduction.
#[derive(Debug, Error)]
pub enum SimError {
    /// Non-positive horizon or path count, or otherwise unusable request
    /// parameters.
    #[error("Invalid simulation parameters: {0}")]
    InvalidParameters(String),

    /// Matrix or vector dimensions do not agree.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// The covariance matrix could not be factored even after
    /// diagonal-loading regularization.
    #[error("Covariance matrix is not positive semi-definite after regularization")]
    NotPositiveDefinite,

    /// Underlying linear-algebra failure.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

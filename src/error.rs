//! Error types for the anofox-seqcast library.

use thiserror::Error;

/// Result type alias for pipeline and predictor operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while assembling or running a forecasting experiment.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Not enough rows to form a single complete past/future window.
    #[error("insufficient history: need at least {needed} rows, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// A transform was requested for a column that has no fitted scaler.
    #[error("no fitted scaler for column '{0}'")]
    UnfitColumn(String),

    /// A tensor does not have the shape the configuration demands.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: String,
        expected: String,
        got: String,
    },

    /// A column name is not present in the series.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Missing values detected when not allowed.
    #[error("missing values detected in data")]
    MissingValues,

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Computation error (e.g., a diverging fit).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Reading market data failed.
    #[error("io error: {0}")]
    Io(String),

    /// A market data record could not be parsed.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl ForecastError {
    /// Build a [`ForecastError::ShapeMismatch`] from two shapes.
    pub fn shape_mismatch(context: &str, expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            context: context.to_string(),
            expected: format!("{:?}", expected),
            got: format!("{:?}", got),
        }
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

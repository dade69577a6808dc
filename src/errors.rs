//! Centralized error handling for glider_nc
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! separates the structural failures the container format defines
//! (`ShapeMismatch`, `MissingVariable`, `UnitsParse`) from wrapped
//! storage, I/O and serialization failures.

use thiserror::Error;

/// Main error type for glider_nc operations
#[derive(Debug, Error)]
pub enum GliderError {
    /// An observation array disagrees with its governing dimension.
    #[error("Shape mismatch for '{variable}': expected {expected}, got {actual}")]
    ShapeMismatch {
        variable: String,
        expected: usize,
        actual: usize,
    },

    /// A variable required by the reader or projector is absent.
    #[error("Variable '{var}' not found in file")]
    MissingVariable { var: String },

    /// A time variable's units or calendar cannot be interpreted.
    #[error("Cannot interpret time units '{units}': {message}")]
    UnitsParse { units: String, message: String },

    /// Caller input that is structurally invalid for reasons other than shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Callback token rejected by the GeoJSON boundary.
    #[error("Invalid callback token '{0}'")]
    InvalidCallback(String),

    /// Configuration file or override could not be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// NetCDF storage error
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Array shape error while assembling typed reads
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),
}

impl GliderError {
    pub(crate) fn missing(var: impl Into<String>) -> Self {
        GliderError::MissingVariable { var: var.into() }
    }

    pub(crate) fn shape(variable: impl Into<String>, expected: usize, actual: usize) -> Self {
        GliderError::ShapeMismatch {
            variable: variable.into(),
            expected,
            actual,
        }
    }
}

/// Result type alias for glider_nc operations
pub type Result<T> = std::result::Result<T, GliderError>;

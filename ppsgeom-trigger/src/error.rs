//! Error types for ppsgeom-trigger.

use thiserror::Error;

/// Result type alias for trigger configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring the stub algorithm.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration parameter is out of its valid range.
    #[error("invalid {name}: {value} (must be positive and finite)")]
    InvalidParameter { name: &'static str, value: f64 },

    /// The magnetic field could not be evaluated.
    #[error("magnetic field at the origin is not finite: {0}")]
    InvalidField(f64),
}

//! Geometry tree error types.

use thiserror::Error;

/// Result type for geometry tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading descriptions, corrections and configuration.
///
/// Building and mutating a tree never fails; only the file-facing entry
/// points return these.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid geometry description.
    #[error("invalid description: {0}")]
    InvalidDescription(String),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] ppsgeom_core::Error),
}

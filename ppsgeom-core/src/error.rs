//! Error types for ppsgeom-core.

use thiserror::Error;

use crate::detid::SubDetector;

/// Result type alias for ppsgeom operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for ppsgeom operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A detector-id field does not fit in its bit range.
    #[error("{field} = {value} out of range for {subdetector} id (max {max})")]
    FieldOutOfRange {
        subdetector: SubDetector,
        field: &'static str,
        value: u32,
        max: u32,
    },

    /// The raw id does not belong to the forward detector.
    #[error("not a CTPPS detector id: {0:#010x}")]
    NotCtppsId(u32),

    /// Rotation matrix is not orthonormal.
    #[error("rotation matrix is not orthonormal (deviation {0:.3e})")]
    NonOrthonormalRotation(f64),

    /// Orthonormal matrix with a negative determinant.
    #[error("rotation matrix is a reflection (determinant {0:.6})")]
    ReflectionMatrix(f64),
}

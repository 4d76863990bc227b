//! ppsgeom-core: Core types for the very-forward proton spectrometer geometry.
//!
//! This crate provides the foundational pieces shared by the geometry tree
//! and the trigger configuration: detector identifiers, rigid placements and
//! alignment corrections, sensor classification and the pixel sensor topology.
//!

pub mod detid;
pub mod error;
pub mod placement;
pub mod sensor;
pub mod topology;
pub mod units;

pub use detid::{ChainOrder, CopyNumberChain, DetId, DetIdEncoder, PpsDetIdEncoder, SubDetector};
pub use error::{Error, Result};
pub use placement::{AlignmentCorrection, Placement};
pub use sensor::SensorType;
pub use topology::PixelTopology;
pub use units::{DiamondDimensions, LengthUnit, ShapeParameters};

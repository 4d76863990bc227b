//! ppsgeom-trigger: Configuration of the global-geometry trigger stub algorithm.
//!
//! The stub algorithm accepts pairs of hits whose bend is compatible with a
//! track above a transverse-momentum threshold. This crate covers the setup
//! side only: reading the algorithm parameters and deriving, from the
//! magnetic field at the interaction point, the scaling factor the
//! correlation step consumes.

pub mod error;
pub mod field;
pub mod stub;

pub use error::{Error, Result};
pub use field::{MagneticField, UniformField};
pub use stub::{GlobalGeometryStubAlgorithm, StubAlgorithmConfig, StubAlgorithmProducer, C_LIGHT};

//! Global-geometry stub algorithm: configuration and producer.
//!
//! The producer combines the transverse-momentum threshold with the central
//! field into the scaling factor the hit-pair correlation uses:
//!
//! ```text
//! factor = c * B_z(0) / (100 * 2e9 * pT_min)
//! ```
//!
//! with `c` in mm/ns, `B_z` in tesla and `pT_min` in `GeV`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::MagneticField;

/// Speed of light in mm/ns.
pub const C_LIGHT: f64 = 299.792_458;

/// Name the algorithm is registered under.
pub const ALGORITHM_NAME: &str = "globalgeometry";

/// Parameters of the stub algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubAlgorithmConfig {
    /// Minimum transverse momentum accepted, in `GeV`.
    pub min_pt_threshold: f64,
    /// Width of the luminous region, in cm.
    pub ip_width: f64,
}

impl Default for StubAlgorithmConfig {
    fn default() -> Self {
        Self {
            min_pt_threshold: 2.0,
            ip_width: 200.0,
        }
    }
}

// Intermediate struct for the configuration file layout
#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonConfig {
    stub_algorithm: StubAlgorithmConfig,
}

impl StubAlgorithmConfig {
    /// Checks that both parameters are positive and finite.
    ///
    /// # Errors
    /// Returns an error naming the first parameter that is not positive and
    /// finite.
    pub fn validate(&self) -> Result<()> {
        let check = |name: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidParameter { name, value })
            }
        };
        check("min_pt_threshold", self.min_pt_threshold)?;
        check("ip_width", self.ip_width)
    }

    /// Load the `stub_algorithm` section from a JSON file.
    ///
    /// A missing section or field takes the default.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or a parameter
    /// is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let json: JsonConfig = serde_json::from_reader(BufReader::new(file))?;
        json.stub_algorithm.validate()?;
        Ok(json.stub_algorithm)
    }

    /// Load the `stub_algorithm` section from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON cannot be parsed or a parameter is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let json: JsonConfig = serde_json::from_str(json)?;
        json.stub_algorithm.validate()?;
        Ok(json.stub_algorithm)
    }
}

/// Parameters handed to the hit-pair correlation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalGeometryStubAlgorithm {
    compatibility_scaling_factor: f64,
    ip_width: f64,
}

impl GlobalGeometryStubAlgorithm {
    /// Wraps precomputed parameters.
    #[must_use]
    pub fn new(compatibility_scaling_factor: f64, ip_width: f64) -> Self {
        Self {
            compatibility_scaling_factor,
            ip_width,
        }
    }

    /// Registered algorithm name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        ALGORITHM_NAME
    }

    /// Curvature scaling derived from field and momentum threshold.
    #[must_use]
    pub fn compatibility_scaling_factor(&self) -> f64 {
        self.compatibility_scaling_factor
    }

    /// Width of the luminous region, in cm.
    #[must_use]
    pub fn ip_width(&self) -> f64 {
        self.ip_width
    }
}

/// Builds [`GlobalGeometryStubAlgorithm`]s from a validated configuration.
#[derive(Debug, Clone)]
pub struct StubAlgorithmProducer {
    config: StubAlgorithmConfig,
}

impl StubAlgorithmProducer {
    /// Validates `config` and wraps it.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: StubAlgorithmConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &StubAlgorithmConfig {
        &self.config
    }

    /// Evaluates the field at the origin and derives the scaling factor.
    ///
    /// # Errors
    /// Returns an error if the central field is not finite.
    pub fn produce<F: MagneticField + ?Sized>(
        &self,
        field: &F,
    ) -> Result<GlobalGeometryStubAlgorithm> {
        let bz = field.central_bz();
        if !bz.is_finite() {
            return Err(Error::InvalidField(bz));
        }
        let factor = C_LIGHT * bz / (100.0 * 2.0e9 * self.config.min_pt_threshold);
        log::debug!(
            "{ALGORITHM_NAME}: B_z(0) = {bz} T, pT > {} GeV, scaling factor {factor:e}",
            self.config.min_pt_threshold
        );
        Ok(GlobalGeometryStubAlgorithm::new(factor, self.config.ip_width))
    }
}

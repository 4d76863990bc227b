use std::io::Write;

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use ppsgeom_trigger::{MagneticField, StubAlgorithmConfig, StubAlgorithmProducer, UniformField};
use tempfile::NamedTempFile;

/// Solenoid-like field that falls off with radius.
struct FallingField {
    central: f64,
}

impl MagneticField for FallingField {
    fn in_tesla(&self, point: &Point3<f64>) -> Vector3<f64> {
        let r = point.coords.xy().norm();
        Vector3::new(0.0, 0.0, self.central / (1.0 + r))
    }
}

#[test]
fn test_only_central_field_matters() {
    let producer = StubAlgorithmProducer::new(StubAlgorithmConfig::default()).unwrap();
    let uniform = producer.produce(&UniformField::along_z(3.8)).unwrap();
    let falling = producer.produce(&FallingField { central: 3.8 }).unwrap();
    assert_relative_eq!(
        uniform.compatibility_scaling_factor(),
        falling.compatibility_scaling_factor()
    );
}

#[test]
fn test_field_through_trait_object() {
    let field: Box<dyn MagneticField> = Box::new(UniformField::along_z(4.0));
    let producer = StubAlgorithmProducer::new(StubAlgorithmConfig::default()).unwrap();
    let algo = producer.produce(field.as_ref()).unwrap();
    assert!(algo.compatibility_scaling_factor() > 0.0);
}

#[test]
fn test_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "geometry": {{ "description": "ctpps.json" }},
            "stub_algorithm": {{ "min_pt_threshold": 3.0, "ip_width": 150.0 }}
        }}"#
    )
    .unwrap();

    let config = StubAlgorithmConfig::from_file(file.path()).unwrap();
    assert_relative_eq!(config.min_pt_threshold, 3.0);
    assert_relative_eq!(config.ip_width, 150.0);

    let producer = StubAlgorithmProducer::new(config).unwrap();
    assert_relative_eq!(producer.config().ip_width, 150.0);
}

#[test]
fn test_missing_file() {
    assert!(StubAlgorithmConfig::from_file("/nonexistent/config.json").is_err());
}

//! Magnetic field access.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A static magnetic field map.
pub trait MagneticField {
    /// Field vector at a global point (cm), in tesla.
    fn in_tesla(&self, point: &Point3<f64>) -> Vector3<f64>;

    /// Field along z at the nominal interaction point.
    fn central_bz(&self) -> f64 {
        self.in_tesla(&Point3::origin()).z
    }
}

/// Field that is the same everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformField {
    pub field: Vector3<f64>,
}

impl UniformField {
    /// Solenoid field of the given strength along z.
    #[must_use]
    pub fn along_z(tesla: f64) -> Self {
        Self {
            field: Vector3::new(0.0, 0.0, tesla),
        }
    }
}

impl Default for UniformField {
    fn default() -> Self {
        Self::along_z(3.8)
    }
}

impl MagneticField for UniformField {
    fn in_tesla(&self, _point: &Point3<f64>) -> Vector3<f64> {
        self.field
    }
}

impl<F: MagneticField + ?Sized> MagneticField for &F {
    fn in_tesla(&self, point: &Point3<f64>) -> Vector3<f64> {
        (**self).in_tesla(point)
    }
}

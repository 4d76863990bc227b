//! Rigid placements and alignment corrections.
//!
//! A placement is the local-to-global transform of a volume:
//!
//! ```text
//! x_global = rotation * x_local + translation
//! ```
//!
//! Alignment is a pure function of a placement and a correction, so it can be
//! exercised without building a tree.

use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tolerance on `R^T R - 1` when accepting a rotation matrix.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Local-to-global rigid transform. Translation is in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

impl Placement {
    /// Creates a placement.
    #[must_use]
    pub fn new(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Identity placement at the origin.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(Rotation3::identity(), Vector3::zeros())
    }

    /// Pure translation.
    #[must_use]
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self::new(Rotation3::identity(), Vector3::new(x, y, z))
    }

    /// Builds a rotation from row-major matrix entries.
    ///
    /// # Errors
    /// Returns an error if the matrix is not orthonormal or is a reflection.
    pub fn rotation_from_rows(rows: [[f64; 3]; 3]) -> Result<Rotation3<f64>> {
        let m = Matrix3::new(
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        );
        let deviation = (m.transpose() * m - Matrix3::identity()).norm();
        if !deviation.is_finite() || deviation > ORTHONORMAL_TOLERANCE {
            return Err(Error::NonOrthonormalRotation(deviation));
        }
        let determinant = m.determinant();
        if determinant < 0.0 {
            return Err(Error::ReflectionMatrix(determinant));
        }
        Ok(Rotation3::from_matrix_unchecked(m))
    }

    /// Maps a point from local to global coordinates.
    #[must_use]
    pub fn to_global(&self, local: &Point3<f64>) -> Point3<f64> {
        self.rotation * local + self.translation
    }

    /// Maps a point from global to local coordinates.
    #[must_use]
    pub fn to_local(&self, global: &Point3<f64>) -> Point3<f64> {
        self.rotation.inverse() * (global - self.translation)
    }

    /// Returns this placement with `correction` applied.
    ///
    /// The correction rotation is applied on the global side and its shift is
    /// added to the translation.
    #[must_use]
    pub fn aligned(&self, correction: &AlignmentCorrection) -> Self {
        Self {
            rotation: correction.rotation() * self.rotation,
            translation: correction.shift() + self.translation,
        }
    }
}

/// Measured offset of a detector element from its nominal placement.
///
/// Shifts are in millimetres, rotations in radians about the global x, y and
/// z axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlignmentCorrection {
    pub sh_x: f64,
    pub sh_y: f64,
    pub sh_z: f64,
    pub sh_x_unc: f64,
    pub sh_y_unc: f64,
    pub sh_z_unc: f64,
    pub rot_x: f64,
    pub rot_y: f64,
    pub rot_z: f64,
    pub rot_x_unc: f64,
    pub rot_y_unc: f64,
    pub rot_z_unc: f64,
}

impl AlignmentCorrection {
    /// Correction with shifts and rotations, no uncertainties.
    #[must_use]
    pub fn new(shift: Vector3<f64>, rot_x: f64, rot_y: f64, rot_z: f64) -> Self {
        Self {
            sh_x: shift.x,
            sh_y: shift.y,
            sh_z: shift.z,
            rot_x,
            rot_y,
            rot_z,
            ..Self::default()
        }
    }

    /// Shift vector in mm.
    #[must_use]
    pub fn shift(&self) -> Vector3<f64> {
        Vector3::new(self.sh_x, self.sh_y, self.sh_z)
    }

    /// Rotation `Rz(rot_z) * Ry(rot_y) * Rx(rot_x)`.
    #[must_use]
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(self.rot_x, self.rot_y, self.rot_z)
    }

    /// Returns true if the correction changes nothing.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.shift() == Vector3::zeros() && self.rot_x == 0.0 && self.rot_y == 0.0 && self.rot_z == 0.0
    }

    /// Composes two corrections: values add, uncertainties add in quadrature.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let quad = |a: f64, b: f64| a.hypot(b);
        Self {
            sh_x: self.sh_x + other.sh_x,
            sh_y: self.sh_y + other.sh_y,
            sh_z: self.sh_z + other.sh_z,
            sh_x_unc: quad(self.sh_x_unc, other.sh_x_unc),
            sh_y_unc: quad(self.sh_y_unc, other.sh_y_unc),
            sh_z_unc: quad(self.sh_z_unc, other.sh_z_unc),
            rot_x: self.rot_x + other.rot_x,
            rot_y: self.rot_y + other.rot_y,
            rot_z: self.rot_z + other.rot_z,
            rot_x_unc: quad(self.rot_x_unc, other.rot_x_unc),
            rot_y_unc: quad(self.rot_y_unc, other.rot_y_unc),
            rot_z_unc: quad(self.rot_z_unc, other.rot_z_unc),
        }
    }
}

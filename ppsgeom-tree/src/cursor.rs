//! Capabilities a detector-description traversal must expose.
//!
//! The tree only reads the cursor; the caller decides traversal order through
//! [`Navigate`].

use nalgebra::{Rotation3, Vector3};
use ppsgeom_core::{CopyNumberChain, LengthUnit};
use serde::{Deserialize, Serialize};

/// Description back-end a cursor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Legacy description: lengths in mm, copy numbers listed root first.
    #[default]
    Legacy,
    /// Current (`DD4hep`) description: lengths in cm, copy numbers listed leaf first.
    Dd4hep,
}

impl Flavor {
    /// Native length unit of the back-end.
    #[must_use]
    pub fn length_unit(self) -> LengthUnit {
        match self {
            Self::Legacy => LengthUnit::Millimeter,
            Self::Dd4hep => LengthUnit::Centimeter,
        }
    }

    /// Returns true for the current back-end.
    #[must_use]
    pub fn is_dd4hep(self) -> bool {
        self == Self::Dd4hep
    }
}

/// Primitive type of a solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolidKind {
    /// Rectangular box, parameters are the three half-widths.
    Box,
    /// Trapezoid.
    Trd,
    /// Tube section.
    Tubs,
    /// Polycone.
    Polycone,
    /// Anything else (boolean solids, assemblies, ...).
    #[default]
    #[serde(other)]
    Other,
}

/// Read access to one placement of a detector-description traversal.
///
/// Lengths are in the back-end's native unit; placements are global.
pub trait TraversalCursor {
    /// Back-end of this cursor.
    fn flavor(&self) -> Flavor;

    /// Raw volume label, possibly with a `namespace:` prefix.
    fn name(&self) -> &str;

    /// Copy number of the current placement.
    fn copy_number(&self) -> i32;

    /// Copy numbers from the root to the current placement, in back-end order.
    fn copy_numbers(&self) -> CopyNumberChain;

    /// Global translation of the current placement.
    fn translation(&self) -> Vector3<f64>;

    /// Global rotation of the current placement.
    fn rotation(&self) -> Rotation3<f64>;

    /// z of the current placement relative to its parent.
    fn parent_z(&self) -> f64;

    /// Primitive type of the current solid.
    fn solid_kind(&self) -> SolidKind;

    /// Parameters of the current solid.
    fn solid_parameters(&self) -> Vec<f64>;

    /// Native length unit.
    fn length_unit(&self) -> LengthUnit {
        self.flavor().length_unit()
    }
}

/// Movement of a cursor through the placement hierarchy.
pub trait Navigate {
    /// Descends to the first child. Returns false (and stays) at a leaf.
    fn first_child(&mut self) -> bool;

    /// Moves to the next sibling. Returns false (and stays) at the last one.
    fn next_sibling(&mut self) -> bool;

    /// Climbs to the parent. Returns false (and stays) at the root.
    fn parent(&mut self) -> bool;
}

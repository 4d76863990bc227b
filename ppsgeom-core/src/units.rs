//! Length units and flavor-tagged shape parameters.
//!
//! The two description back-ends disagree on lengths: the legacy one works in
//! millimetres, the current one in centimetres. Placements are normalised to
//! millimetres when a node is built; raw solid parameters are not, so they
//! carry the unit they were read in.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Length unit of a description back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LengthUnit {
    /// Millimetres (legacy description, reconstruction convention).
    #[default]
    Millimeter,
    /// Centimetres (current description).
    Centimeter,
}

impl LengthUnit {
    /// Multiplier converting a length in this unit to millimetres.
    #[inline]
    #[must_use]
    pub fn to_mm_factor(self) -> f64 {
        match self {
            Self::Millimeter => 1.0,
            Self::Centimeter => 10.0,
        }
    }

    /// Converts a length in this unit to millimetres.
    #[inline]
    #[must_use]
    pub fn to_mm(self, value: f64) -> f64 {
        value * self.to_mm_factor()
    }

    /// Short unit symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Millimeter => "mm",
            Self::Centimeter => "cm",
        }
    }
}

/// Solid parameters in the unit of the back-end that produced them.
///
/// Parameter order depends on the solid type and, for non-box solids, on the
/// back-end version. Only read raw values when the provenance is known.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeParameters {
    values: Vec<f64>,
    unit: LengthUnit,
}

impl ShapeParameters {
    /// Creates parameters tagged with their unit.
    #[must_use]
    pub fn new(values: Vec<f64>, unit: LengthUnit) -> Self {
        Self { values, unit }
    }

    /// Raw values, in [`Self::unit`].
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Unit the raw values are expressed in.
    #[must_use]
    pub fn unit(&self) -> LengthUnit {
        self.unit
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameter `index` converted to millimetres, if present.
    #[must_use]
    pub fn get_mm(&self, index: usize) -> Option<f64> {
        self.values.get(index).map(|&v| self.unit.to_mm(v))
    }
}

/// Half-widths of a diamond-shaped sensor, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiamondDimensions {
    pub x_half_width: f64,
    pub y_half_width: f64,
    pub z_half_width: f64,
}

/// Number of parameters a trapezoid carries: `dx1, dx2, dy1, dy2, dz`.
const TRD_PARAMETER_COUNT: usize = 5;

impl DiamondDimensions {
    /// Derives half-widths from trapezoid parameters `dx1, dx2, dy1, dy2, dz`.
    ///
    /// Each transverse half-width is the larger of the two faces. Returns
    /// `None` unless exactly five finite parameters are present.
    #[must_use]
    pub fn from_trd(params: &ShapeParameters) -> Option<Self> {
        if params.len() != TRD_PARAMETER_COUNT {
            return None;
        }
        let mm: Vec<f64> = (0..TRD_PARAMETER_COUNT)
            .filter_map(|i| params.get_mm(i))
            .collect();
        if !mm.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Self {
            x_half_width: mm[0].max(mm[1]),
            y_half_width: mm[2].max(mm[3]),
            z_half_width: mm[4],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_conversion() {
        assert_relative_eq!(LengthUnit::Millimeter.to_mm(4.2), 4.2);
        assert_relative_eq!(LengthUnit::Centimeter.to_mm(4.2), 42.0);
        assert_eq!(LengthUnit::Centimeter.symbol(), "cm");
    }

    #[test]
    fn test_shape_parameters_keep_native_unit() {
        let params = ShapeParameters::new(vec![1.0, 2.0, 0.5], LengthUnit::Centimeter);
        assert_eq!(params.values(), &[1.0, 2.0, 0.5]);
        assert_eq!(params.len(), 3);
        assert_relative_eq!(params.get_mm(2).unwrap(), 5.0);
        assert!(params.get_mm(3).is_none());
    }

    #[test]
    fn test_diamond_dimensions_from_trd() {
        let params = ShapeParameters::new(vec![1.0, 1.5, 2.0, 1.0, 0.25], LengthUnit::Centimeter);
        let dims = DiamondDimensions::from_trd(&params).unwrap();
        assert_relative_eq!(dims.x_half_width, 15.0);
        assert_relative_eq!(dims.y_half_width, 20.0);
        assert_relative_eq!(dims.z_half_width, 2.5);
    }

    #[test]
    fn test_diamond_dimensions_rejects_wrong_count_or_nan() {
        let short = ShapeParameters::new(vec![1.0, 1.0, 2.0, 2.0], LengthUnit::Millimeter);
        assert!(DiamondDimensions::from_trd(&short).is_none());

        let long = ShapeParameters::new(vec![1.0; 6], LengthUnit::Millimeter);
        assert!(DiamondDimensions::from_trd(&long).is_none());

        let nan = ShapeParameters::new(vec![1.0, 1.0, f64::NAN, 2.0, 3.0], LengthUnit::Millimeter);
        assert!(DiamondDimensions::from_trd(&nan).is_none());
    }
}

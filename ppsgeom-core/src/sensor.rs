//! Sensor classification from volume names.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::detid::{DIAMOND_SEGMENT_NAME, PIXEL_SENSOR_NAME, STRIP_SENSOR_NAME, UFSD_SEGMENT_NAME};

/// Tag in a pixel wafer name selecting the 2x2 read-out layout.
pub const PIXEL_2X2_TAG: &str = "2x2";

/// Kind of sensor a volume holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorType {
    /// Structural or support volume.
    #[default]
    None,
    /// Silicon strip sensor.
    Strip,
    /// Pixel sensor read out by a 2x2 arrangement of chips.
    Pixel2x2,
    /// Pixel sensor read out by a 3x2 arrangement of chips.
    Pixel3x2,
    /// Timing sensor (diamond or UFSD).
    Diamond,
}

impl SensorType {
    /// Classifies a namespace-free volume name.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        if name == STRIP_SENSOR_NAME {
            Self::Strip
        } else if name.starts_with(PIXEL_SENSOR_NAME) {
            if name.contains(PIXEL_2X2_TAG) {
                Self::Pixel2x2
            } else {
                Self::Pixel3x2
            }
        } else if name.starts_with(DIAMOND_SEGMENT_NAME) || name.starts_with(UFSD_SEGMENT_NAME) {
            Self::Diamond
        } else {
            Self::None
        }
    }

    /// Returns true for any active sensor.
    #[must_use]
    pub fn is_sensor(self) -> bool {
        self != Self::None
    }

    /// Returns true for pixel sensors.
    #[must_use]
    pub fn is_pixel(self) -> bool {
        matches!(self, Self::Pixel2x2 | Self::Pixel3x2)
    }

    /// Classification string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Strip => "strip",
            Self::Pixel2x2 => "2x2",
            Self::Pixel3x2 => "3x2",
            Self::Diamond => "diamond",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(SensorType::classify("RP_Silicon_Detector"), SensorType::Strip);
        assert_eq!(SensorType::classify("RPixWafer"), SensorType::Pixel3x2);
        assert_eq!(SensorType::classify("RPixWafer_2x2"), SensorType::Pixel2x2);
        assert_eq!(SensorType::classify("CTPPS_Diamond_Segment"), SensorType::Diamond);
        assert_eq!(SensorType::classify("CTPPS_UFSD_Segment"), SensorType::Diamond);
        assert_eq!(SensorType::classify("RP_box_primary_vacuum"), SensorType::None);
        assert_eq!(SensorType::classify("Plane"), SensorType::None);
    }

    #[test]
    fn test_display() {
        assert_eq!(SensorType::Pixel3x2.to_string(), "3x2");
        assert_eq!(SensorType::None.to_string(), "");
        assert!(SensorType::Pixel2x2.is_pixel());
        assert!(!SensorType::Strip.is_pixel());
        assert!(SensorType::Diamond.is_sensor());
    }
}

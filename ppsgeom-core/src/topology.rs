//! Geometrical and topological description of the `RPix` silicon sensor.
//!
//! Coordinates are local to the wafer, origin at its centre, lengths in mm.

use crate::sensor::SensorType;

/// Constants and containment test for the pixel sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelTopology;

// Module layout in micrometres: 100 um pitch along x, 150 um along y, with
// double-size pixels at chip boundaries.
const X_OFFSET_UM: u32 = 79 * 100 + 200;
const Y_OFFSET_UM: u32 = 51 * 150 + 2 * 300 + 25 * 150;
const X_MODULE_UM: u32 = 79 * 100 + 2 * 200 + 79 * 100;
const Y_MODULE_3X2_UM: u32 = 51 * 150 + 2 * 300 + 50 * 150 + 2 * 300 + 51 * 150;
const Y_MODULE_2X2_UM: u32 = 51 * 150 + 2 * 300 + 51 * 150;

// Shifted coordinates are held as f32, so points within rounding of the
// module edge count as inside.
fn shift_to_corner(local: f32, offset_um: u32) -> f32 {
    #[allow(clippy::cast_possible_truncation)]
    {
        (f64::from(local) + f64::from(offset_um) / 1000.0) as f32
    }
}

impl PixelTopology {
    /// Simulated pitch along y (mm).
    pub const PITCH_SIM_Y: f64 = 150E-3;
    /// Simulated pitch along x (mm).
    pub const PITCH_SIM_X: f64 = 100E-3;
    /// Sensor thickness (mm).
    pub const THICKNESS: f64 = 0.23;
    /// Number of simulated pixels along x.
    pub const PIXELS_SIM_X: u16 = 160;
    /// Number of simulated pixels along y.
    pub const PIXELS_SIM_Y: u16 = 156;
    /// Total number of simulated pixels.
    pub const PIXELS: u16 = 160 * 156;
    /// Simulated width along x (mm).
    pub const SIM_X_WIDTH: f64 = 16.6;
    /// Simulated width along y (mm).
    pub const SIM_Y_WIDTH: f64 = 24.4;
    /// Dead edge width (mm).
    pub const DEAD_EDGE_WIDTH: f64 = 200E-3;
    /// Active edge smearing (mm).
    pub const ACTIVE_EDGE_SIGMA: f64 = 0.02;
    /// Physical active edge distance (mm).
    pub const PHYS_ACTIVE_EDGE_DIST: f64 = 0.150;

    /// Module extent along x, truncated to whole millimetres.
    #[must_use]
    pub const fn x_module_size() -> u32 {
        X_MODULE_UM / 1000
    }

    /// Module extent along y, truncated to whole millimetres.
    #[must_use]
    pub const fn y_module_size(is_3x2: bool) -> u32 {
        if is_3x2 {
            Y_MODULE_3X2_UM / 1000
        } else {
            Y_MODULE_2X2_UM / 1000
        }
    }

    /// Checks whether a local hit position falls on the pixel module.
    ///
    /// The position is shifted to the module corner in single precision, then
    /// compared against the module extent truncated to whole millimetres.
    #[must_use]
    pub fn is_pixel_hit(x_local: f32, y_local: f32, is_3x2: bool) -> bool {
        let x = f64::from(shift_to_corner(x_local, X_OFFSET_UM));
        let y = f64::from(shift_to_corner(y_local, Y_OFFSET_UM));

        if x < 0.0 || y < 0.0 {
            return false;
        }
        if x > f64::from(Self::x_module_size()) {
            return false;
        }
        if y > f64::from(Self::y_module_size(is_3x2)) {
            return false;
        }
        true
    }

    /// Containment test using the read-out layout of a classified sensor.
    ///
    /// Returns false for anything that is not a pixel sensor.
    #[must_use]
    pub fn contains(sensor_type: SensorType, x_local: f32, y_local: f32) -> bool {
        match sensor_type {
            SensorType::Pixel3x2 => Self::is_pixel_hit(x_local, y_local, true),
            SensorType::Pixel2x2 => Self::is_pixel_hit(x_local, y_local, false),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(PixelTopology::PIXELS, 24_960);
        assert_eq!(PixelTopology::x_module_size(), 16);
        assert_eq!(PixelTopology::y_module_size(true), 24);
        assert_eq!(PixelTopology::y_module_size(false), 15);
    }

    #[test]
    fn test_centre_is_hit() {
        assert!(PixelTopology::is_pixel_hit(0.0, 0.0, true));
        assert!(PixelTopology::is_pixel_hit(0.0, 0.0, false));
    }

    #[test]
    fn test_x_bounds() {
        // x offset is 8.1 mm, module is 16 mm wide
        assert!(PixelTopology::is_pixel_hit(-8.0, 0.0, true));
        assert!(!PixelTopology::is_pixel_hit(-8.2, 0.0, true));
        assert!(PixelTopology::is_pixel_hit(7.8, 0.0, true));
        assert!(!PixelTopology::is_pixel_hit(8.0, 0.0, true));
    }

    #[test]
    fn test_upper_x_edge_rounds_in_single_precision() {
        // 7.9 + 8.1 is just above 16 in f64 but exactly 16 in f32
        assert!(PixelTopology::is_pixel_hit(7.9, 0.0, true));
        assert!(PixelTopology::is_pixel_hit(7.9, 0.0, false));
        assert!(!PixelTopology::is_pixel_hit(7.91, 0.0, true));
    }

    #[test]
    fn test_y_bounds_depend_on_layout() {
        // y offset is 12.0 mm; 3x2 module is 24 mm tall, 2x2 is 15 mm
        assert!(!PixelTopology::is_pixel_hit(0.0, -12.1, true));
        assert!(PixelTopology::is_pixel_hit(0.0, 11.5, true));
        assert!(!PixelTopology::is_pixel_hit(0.0, 11.5, false));
        assert!(PixelTopology::is_pixel_hit(0.0, 2.5, false));
        assert!(!PixelTopology::is_pixel_hit(0.0, 3.5, false));
    }

    #[test]
    fn test_contains_by_sensor_type() {
        assert!(PixelTopology::contains(SensorType::Pixel3x2, 0.0, 11.5));
        assert!(!PixelTopology::contains(SensorType::Pixel2x2, 0.0, 11.5));
        assert!(!PixelTopology::contains(SensorType::Strip, 0.0, 0.0));
    }
}

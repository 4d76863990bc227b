//! Detector identifiers for the very-forward proton spectrometer.
//!
//! Bit layout (most significant first):
//!
//! ```text
//! | det (4) | subdet (3) | arm (1) | station (2) | rp (3) | sub-detector specific ... |
//!  31    28  27       25   24        23      22   21   19
//! ```
//!
//! Below the RP field each sub-detector packs its own fields:
//! strip plane at bit 15, pixel plane at bit 16, diamond plane at bit 17 and
//! diamond channel at bit 12.
#![allow(clippy::module_name_repetitions)]

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DET_FORWARD: u32 = 7;
const START_DET_BIT: u32 = 28;
const START_SUBDET_BIT: u32 = 25;
const MASK_SUBDET: u32 = 0x7;

const START_ARM_BIT: u32 = 24;
const MASK_ARM: u32 = 0x1;
const START_STATION_BIT: u32 = 22;
const MASK_STATION: u32 = 0x3;
const START_RP_BIT: u32 = 19;
const MASK_RP: u32 = 0x7;

const START_STRIP_PLANE_BIT: u32 = 15;
const MASK_STRIP_PLANE: u32 = 0xF;
const START_PIXEL_PLANE_BIT: u32 = 16;
const MASK_PIXEL_PLANE: u32 = 0x7;
const START_DIAMOND_PLANE_BIT: u32 = 17;
const MASK_DIAMOND_PLANE: u32 = 0x3;
const START_DIAMOND_CHANNEL_BIT: u32 = 12;
const MASK_DIAMOND_CHANNEL: u32 = 0x1F;

/// Volume name of a strip sensor.
pub const STRIP_SENSOR_NAME: &str = "RP_Silicon_Detector";
/// Volume name of a Roman Pot box.
pub const RP_BOX_NAME: &str = "RP_box_primary_vacuum";
/// Volume name of a pixel sensor.
pub const PIXEL_SENSOR_NAME: &str = "RPixWafer";
/// Volume name of a timing diamond segment.
pub const DIAMOND_SEGMENT_NAME: &str = "CTPPS_Diamond_Segment";
/// Volume name of a UFSD timing segment.
pub const UFSD_SEGMENT_NAME: &str = "CTPPS_UFSD_Segment";

/// Sub-detector field of a CTPPS id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SubDetector {
    /// Silicon strip Roman Pots.
    TotemRp,
    /// Timing diamonds (and UFSD).
    TimingDiamond,
    /// Silicon pixels.
    Pixel,
}

impl SubDetector {
    fn code(self) -> u32 {
        match self {
            Self::TotemRp => 3,
            Self::TimingDiamond => 4,
            Self::Pixel => 5,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            3 => Some(Self::TotemRp),
            4 => Some(Self::TimingDiamond),
            5 => Some(Self::Pixel),
            _ => None,
        }
    }
}

impl fmt::Display for SubDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TotemRp => "TotemRP",
            Self::TimingDiamond => "TimingDiamond",
            Self::Pixel => "Pixel",
        };
        f.write_str(name)
    }
}

/// Detector identifier. Zero is the default, meaning "not a detector".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DetId(pub u32);

fn checked(subdetector: SubDetector, field: &'static str, value: u32, mask: u32) -> Result<u32> {
    if value > mask {
        return Err(Error::FieldOutOfRange {
            subdetector,
            field,
            value,
            max: mask,
        });
    }
    Ok(value)
}

impl DetId {
    /// Raw value.
    #[inline]
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Returns true for the default ("no detector") id.
    #[inline]
    #[must_use]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Id of a Roman Pot (arm, station, rp) for the given sub-detector.
    ///
    /// # Errors
    /// Returns an error if a field does not fit its bit range.
    pub fn rp(subdetector: SubDetector, arm: u32, station: u32, rp: u32) -> Result<Self> {
        let arm = checked(subdetector, "arm", arm, MASK_ARM)?;
        let station = checked(subdetector, "station", station, MASK_STATION)?;
        let rp = checked(subdetector, "rp", rp, MASK_RP)?;
        Ok(Self(
            (DET_FORWARD << START_DET_BIT)
                | (subdetector.code() << START_SUBDET_BIT)
                | (arm << START_ARM_BIT)
                | (station << START_STATION_BIT)
                | (rp << START_RP_BIT),
        ))
    }

    /// Id of a strip sensor plane.
    ///
    /// # Errors
    /// Returns an error if a field does not fit its bit range.
    pub fn strip(arm: u32, station: u32, rp: u32, plane: u32) -> Result<Self> {
        let base = Self::rp(SubDetector::TotemRp, arm, station, rp)?;
        let plane = checked(SubDetector::TotemRp, "plane", plane, MASK_STRIP_PLANE)?;
        Ok(Self(base.0 | (plane << START_STRIP_PLANE_BIT)))
    }

    /// Id of a pixel sensor plane.
    ///
    /// # Errors
    /// Returns an error if a field does not fit its bit range.
    pub fn pixel(arm: u32, station: u32, rp: u32, plane: u32) -> Result<Self> {
        let base = Self::rp(SubDetector::Pixel, arm, station, rp)?;
        let plane = checked(SubDetector::Pixel, "plane", plane, MASK_PIXEL_PLANE)?;
        Ok(Self(base.0 | (plane << START_PIXEL_PLANE_BIT)))
    }

    /// Id of a timing channel.
    ///
    /// # Errors
    /// Returns an error if a field does not fit its bit range.
    pub fn diamond(arm: u32, station: u32, rp: u32, plane: u32, channel: u32) -> Result<Self> {
        let sub = SubDetector::TimingDiamond;
        let base = Self::rp(sub, arm, station, rp)?;
        let plane = checked(sub, "plane", plane, MASK_DIAMOND_PLANE)?;
        let channel = checked(sub, "channel", channel, MASK_DIAMOND_CHANNEL)?;
        Ok(Self(
            base.0 | (plane << START_DIAMOND_PLANE_BIT) | (channel << START_DIAMOND_CHANNEL_BIT),
        ))
    }

    /// Sub-detector of a CTPPS id.
    ///
    /// # Errors
    /// Returns an error if the id is not a CTPPS id.
    pub fn subdetector(self) -> Result<SubDetector> {
        if self.0 >> START_DET_BIT != DET_FORWARD {
            return Err(Error::NotCtppsId(self.0));
        }
        SubDetector::from_code((self.0 >> START_SUBDET_BIT) & MASK_SUBDET)
            .ok_or(Error::NotCtppsId(self.0))
    }

    /// Arm field.
    #[must_use]
    pub fn arm(self) -> u32 {
        (self.0 >> START_ARM_BIT) & MASK_ARM
    }

    /// Station field.
    #[must_use]
    pub fn station(self) -> u32 {
        (self.0 >> START_STATION_BIT) & MASK_STATION
    }

    /// RP field.
    #[must_use]
    pub fn rp_number(self) -> u32 {
        (self.0 >> START_RP_BIT) & MASK_RP
    }

    /// Decimal RP id (`100 * arm + 10 * station + rp`).
    #[must_use]
    pub fn decimal_rp_id(self) -> u32 {
        100 * self.arm() + 10 * self.station() + self.rp_number()
    }

    /// The enclosing Roman Pot id (sub-detector fields below the RP cleared).
    #[must_use]
    pub fn rp_id(self) -> Self {
        let keep = u32::MAX << START_RP_BIT;
        Self(self.0 & keep)
    }

    /// Plane field, interpreted according to the sub-detector.
    ///
    /// # Errors
    /// Returns an error if the id is not a CTPPS id.
    pub fn plane(self) -> Result<u32> {
        Ok(match self.subdetector()? {
            SubDetector::TotemRp => (self.0 >> START_STRIP_PLANE_BIT) & MASK_STRIP_PLANE,
            SubDetector::Pixel => (self.0 >> START_PIXEL_PLANE_BIT) & MASK_PIXEL_PLANE,
            SubDetector::TimingDiamond => (self.0 >> START_DIAMOND_PLANE_BIT) & MASK_DIAMOND_PLANE,
        })
    }
}

impl fmt::Display for DetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subdetector() {
            Ok(sub) => write!(
                f,
                "{} ({sub} arm {} station {} rp {})",
                self.0,
                self.arm(),
                self.station(),
                self.rp_number()
            ),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

/// Ordering of a copy-number chain as delivered by a description back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOrder {
    /// First entry is the root, last is the current volume.
    RootFirst,
    /// First entry is the current volume, last is the root.
    LeafFirst,
}

/// Copy numbers of the current volume and all its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyNumberChain {
    numbers: Vec<i32>,
    order: ChainOrder,
}

impl CopyNumberChain {
    /// Wraps a chain with its back-end ordering.
    #[must_use]
    pub fn new(numbers: Vec<i32>, order: ChainOrder) -> Self {
        Self { numbers, order }
    }

    /// Copy number `depth` levels above the current volume (0 = the volume itself).
    #[must_use]
    pub fn from_leaf(&self, depth: usize) -> Option<i32> {
        match self.order {
            ChainOrder::LeafFirst => self.numbers.get(depth).copied(),
            ChainOrder::RootFirst => self
                .numbers
                .len()
                .checked_sub(depth + 1)
                .and_then(|i| self.numbers.get(i).copied()),
        }
    }

    /// Number of levels in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    /// Returns true if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

/// Maps a volume name and its copy-number chain to a detector identifier.
pub trait DetIdEncoder {
    /// Returns the id for the volume, or the default id for structural volumes.
    fn encode(&self, name: &str, chain: &CopyNumberChain, copy_number: i32) -> DetId;
}

/// Identifier encoding of the PPS volume naming convention.
///
/// - strip sensor: decimal RP id two levels up, plane = copy number;
/// - RP box: decimal RP id = copy number;
/// - pixel sensor: decimal RP id two levels up, plane = copy number;
/// - diamond / UFSD segment: arm from the ancestor two levels up (1-based),
///   station 1, rp 6, plane = copy / 100, channel = copy % 100.
///
/// Malformed chains or out-of-range fields are logged and yield the default id.
#[derive(Debug, Clone, Copy, Default)]
pub struct PpsDetIdEncoder;

impl PpsDetIdEncoder {
    fn ancestor(name: &str, chain: &CopyNumberChain, depth: usize) -> Option<u32> {
        let value = chain.from_leaf(depth).and_then(|c| u32::try_from(c).ok());
        if value.is_none() {
            log::warn!(
                "cannot read copy number {depth} levels above {name} (chain of {} levels)",
                chain.len()
            );
        }
        value
    }

    fn split_rp(dec: u32) -> (u32, u32, u32) {
        (dec / 100, (dec % 100) / 10, dec % 10)
    }

    fn try_encode(name: &str, chain: &CopyNumberChain, copy_number: i32) -> Option<Result<DetId>> {
        let Ok(copy) = u32::try_from(copy_number) else {
            log::warn!("negative copy number {copy_number} for {name}");
            return None;
        };
        let id = match name {
            STRIP_SENSOR_NAME => {
                let (arm, station, rp) = Self::split_rp(Self::ancestor(name, chain, 2)?);
                DetId::strip(arm, station, rp, copy)
            }
            RP_BOX_NAME => {
                let (arm, station, rp) = Self::split_rp(copy);
                DetId::rp(SubDetector::TotemRp, arm, station, rp)
            }
            n if n.starts_with(PIXEL_SENSOR_NAME) => {
                let (arm, station, rp) = Self::split_rp(Self::ancestor(name, chain, 2)?);
                DetId::pixel(arm, station, rp, copy)
            }
            n if n.starts_with(DIAMOND_SEGMENT_NAME) || n.starts_with(UFSD_SEGMENT_NAME) => {
                let arm = Self::ancestor(name, chain, 2)?.checked_sub(1)?;
                DetId::diamond(arm, 1, 6, copy / 100, copy % 100)
            }
            _ => return None,
        };
        Some(id)
    }
}

impl DetIdEncoder for PpsDetIdEncoder {
    fn encode(&self, name: &str, chain: &CopyNumberChain, copy_number: i32) -> DetId {
        match Self::try_encode(name, chain, copy_number) {
            Some(Ok(id)) => id,
            Some(Err(err)) => {
                log::warn!("cannot encode detector id for {name} copy {copy_number}: {err}");
                DetId::default()
            }
            None => DetId::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_id_fields() {
        let id = DetId::strip(1, 2, 3, 7).unwrap();
        assert_eq!(id.subdetector().unwrap(), SubDetector::TotemRp);
        assert_eq!(id.arm(), 1);
        assert_eq!(id.station(), 2);
        assert_eq!(id.rp_number(), 3);
        assert_eq!(id.plane().unwrap(), 7);
        assert_eq!(id.decimal_rp_id(), 123);
        assert_eq!(
            id.rp_id(),
            DetId::rp(SubDetector::TotemRp, 1, 2, 3).unwrap()
        );
    }

    #[test]
    fn test_field_out_of_range() {
        assert!(DetId::pixel(0, 0, 8, 0).is_err());
        assert!(DetId::strip(2, 0, 0, 0).is_err());
        assert!(DetId::diamond(0, 1, 6, 0, 32).is_err());
    }

    #[test]
    fn test_non_ctpps_id() {
        assert!(DetId(0x1234).subdetector().is_err());
        assert!(DetId::default().is_null());
    }

    #[test]
    fn test_chain_orders_agree() {
        let root_first = CopyNumberChain::new(vec![1, 103, 0, 4], ChainOrder::RootFirst);
        let leaf_first = CopyNumberChain::new(vec![4, 0, 103, 1], ChainOrder::LeafFirst);
        for depth in 0..4 {
            assert_eq!(root_first.from_leaf(depth), leaf_first.from_leaf(depth));
        }
        assert_eq!(root_first.from_leaf(2), Some(103));
        assert_eq!(root_first.from_leaf(4), None);
        assert_eq!(leaf_first.from_leaf(4), None);
    }

    #[test]
    fn test_encoder_strip_sensor() {
        let chain = CopyNumberChain::new(vec![1, 23, 0, 5], ChainOrder::RootFirst);
        let id = PpsDetIdEncoder.encode(STRIP_SENSOR_NAME, &chain, 5);
        assert_eq!(id, DetId::strip(0, 2, 3, 5).unwrap());
    }

    #[test]
    fn test_encoder_rp_box_and_diamond() {
        let chain = CopyNumberChain::new(vec![123], ChainOrder::LeafFirst);
        let id = PpsDetIdEncoder.encode(RP_BOX_NAME, &chain, 123);
        assert_eq!(id, DetId::rp(SubDetector::TotemRp, 1, 2, 3).unwrap());

        let chain = CopyNumberChain::new(vec![1, 2, 0, 207], ChainOrder::RootFirst);
        let id = PpsDetIdEncoder.encode(DIAMOND_SEGMENT_NAME, &chain, 207);
        assert_eq!(id, DetId::diamond(1, 1, 6, 2, 7).unwrap());
    }

    #[test]
    fn test_encoder_structural_and_malformed() {
        let chain = CopyNumberChain::new(vec![0, 1], ChainOrder::RootFirst);
        assert!(PpsDetIdEncoder.encode("Sensor_B", &chain, 1).is_null());
        // chain too short for the RP ancestor
        assert!(PpsDetIdEncoder.encode(PIXEL_SENSOR_NAME, &chain, 1).is_null());
        // rp digit out of range
        let chain = CopyNumberChain::new(vec![1, 9, 0, 1], ChainOrder::RootFirst);
        assert!(PpsDetIdEncoder.encode(PIXEL_SENSOR_NAME, &chain, 1).is_null());
    }
}

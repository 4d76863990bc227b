//! Sets of alignment corrections and their application to a geometry tree.
//!
//! Corrections are kept at two levels: one per Roman Pot and one per sensor.
//! A sensor's full correction is its pot's correction composed with its own.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ppsgeom_core::detid::RP_BOX_NAME;
use ppsgeom_core::{AlignmentCorrection, DetId};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::node::GeometryNode;

/// Alignment corrections keyed by detector id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentCorrections {
    rp: BTreeMap<DetId, AlignmentCorrection>,
    sensor: BTreeMap<DetId, AlignmentCorrection>,
}

// Intermediate structs for the JSON file layout
#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
struct JsonCorrections {
    rp: Vec<JsonEntry>,
    sensor: Vec<JsonEntry>,
}

#[derive(Deserialize, Serialize)]
struct JsonEntry {
    id: DetId,
    #[serde(flatten)]
    correction: AlignmentCorrection,
}

impl AlignmentCorrections {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no correction is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rp.is_empty() && self.sensor.is_empty()
    }

    /// Sets the correction of the pot enclosing `id`, replacing any previous one.
    pub fn set_rp_correction(&mut self, id: DetId, correction: AlignmentCorrection) {
        self.rp.insert(id.rp_id(), correction);
    }

    /// Composes `correction` onto the pot enclosing `id`.
    pub fn add_rp_correction(&mut self, id: DetId, correction: &AlignmentCorrection) {
        self.rp
            .entry(id.rp_id())
            .and_modify(|existing| *existing = existing.add(correction))
            .or_insert(*correction);
    }

    /// Sets the correction of a single sensor.
    pub fn set_sensor_correction(&mut self, id: DetId, correction: AlignmentCorrection) {
        self.sensor.insert(id, correction);
    }

    /// Correction of the pot enclosing `id`.
    #[must_use]
    pub fn rp_correction(&self, id: DetId) -> Option<&AlignmentCorrection> {
        self.rp.get(&id.rp_id())
    }

    /// Correction of the sensor itself, without its pot's.
    #[must_use]
    pub fn sensor_correction(&self, id: DetId) -> Option<&AlignmentCorrection> {
        self.sensor.get(&id)
    }

    /// Pot correction composed with the sensor correction. `None` if neither
    /// is known.
    #[must_use]
    pub fn full_sensor_correction(&self, id: DetId) -> Option<AlignmentCorrection> {
        match (self.rp_correction(id), self.sensor_correction(id)) {
            (None, None) => None,
            (rp, sensor) => {
                let rp = rp.copied().unwrap_or_default();
                Some(rp.add(&sensor.copied().unwrap_or_default()))
            }
        }
    }

    /// Pot corrections, ordered by id.
    #[must_use]
    pub fn rp_corrections(&self) -> impl Iterator<Item = (DetId, &AlignmentCorrection)> {
        self.rp.iter().map(|(id, c)| (*id, c))
    }

    /// Sensor corrections, ordered by id.
    #[must_use]
    pub fn sensor_corrections(&self) -> impl Iterator<Item = (DetId, &AlignmentCorrection)> {
        self.sensor.iter().map(|(id, c)| (*id, c))
    }

    /// Load corrections from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or names a
    /// non-CTPPS id.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let json: JsonCorrections = serde_json::from_reader(BufReader::new(file))?;
        Self::from_json_corrections(json)
    }

    /// Load corrections from a JSON string.
    ///
    /// ```json
    /// { "rp": [ { "id": 1981284352, "sh_x": 0.1 } ],
    ///   "sensor": [ { "id": 1981317120, "rot_z": 0.002 } ] }
    /// ```
    ///
    /// # Errors
    /// Returns an error if the JSON cannot be parsed or names a non-CTPPS id.
    pub fn from_json(json: &str) -> Result<Self> {
        let json: JsonCorrections = serde_json::from_str(json)?;
        Self::from_json_corrections(json)
    }

    fn from_json_corrections(json: JsonCorrections) -> Result<Self> {
        let mut corrections = Self::new();
        for entry in json.rp {
            entry.id.subdetector()?;
            corrections.add_rp_correction(entry.id, &entry.correction);
        }
        for entry in json.sensor {
            entry.id.subdetector()?;
            corrections.set_sensor_correction(entry.id, entry.correction);
        }
        Ok(corrections)
    }

    /// Serializes the set in the layout [`Self::from_json`] reads.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let entries = |map: &BTreeMap<DetId, AlignmentCorrection>| {
            map.iter()
                .map(|(id, correction)| JsonEntry {
                    id: *id,
                    correction: *correction,
                })
                .collect()
        };
        let json = JsonCorrections {
            rp: entries(&self.rp),
            sensor: entries(&self.sensor),
        };
        Ok(serde_json::to_string_pretty(&json)?)
    }

    /// Aligns every pot box and sensor of `tree` that has a correction.
    ///
    /// Pot boxes take their pot correction, sensors the full correction.
    /// Returns the number of nodes moved.
    pub fn apply_to(&self, tree: &mut GeometryNode) -> usize {
        let mut aligned = 0;
        tree.for_each_mut(|node| {
            let id = node.geographical_id();
            if id.is_null() {
                return;
            }
            let correction = if node.sensor_type().is_sensor() {
                self.full_sensor_correction(id)
            } else if node.name() == RP_BOX_NAME {
                self.rp_correction(id).copied()
            } else {
                None
            };
            if let Some(correction) = correction {
                node.apply_alignment(&correction);
                aligned += 1;
            }
        });
        log::debug!("applied alignment to {aligned} nodes");
        aligned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn shift(x: f64) -> AlignmentCorrection {
        AlignmentCorrection::new(Vector3::new(x, 0.0, 0.0), 0.0, 0.0, 0.0)
    }

    #[test]
    fn test_full_sensor_correction() {
        let sensor = DetId::strip(0, 2, 3, 4).unwrap();
        let mut corrections = AlignmentCorrections::new();
        assert!(corrections.full_sensor_correction(sensor).is_none());

        corrections.set_rp_correction(sensor, shift(0.5));
        let pot = DetId::strip(0, 2, 3, 0).unwrap();
        assert_eq!(corrections.rp_correction(pot), Some(&shift(0.5)));

        corrections.set_sensor_correction(sensor, shift(0.25));
        let full = corrections.full_sensor_correction(sensor).unwrap();
        assert_relative_eq!(full.sh_x, 0.75);

        let other_plane = DetId::strip(0, 2, 3, 5).unwrap();
        let full = corrections.full_sensor_correction(other_plane).unwrap();
        assert_relative_eq!(full.sh_x, 0.5);
    }

    #[test]
    fn test_add_rp_correction_composes() {
        let pot = DetId::strip(1, 0, 2, 0).unwrap();
        let mut corrections = AlignmentCorrections::new();
        corrections.add_rp_correction(pot, &shift(1.0));
        corrections.add_rp_correction(pot, &shift(2.0));
        assert_relative_eq!(corrections.rp_correction(pot).unwrap().sh_x, 3.0);
    }

    #[test]
    fn test_json_loading() {
        let pot = DetId::strip(0, 0, 3, 0).unwrap();
        let sensor = DetId::strip(0, 0, 3, 1).unwrap();
        let json = format!(
            r#"{{
                "rp": [ {{ "id": {}, "sh_x": 0.1, "sh_x_unc": 0.01 }} ],
                "sensor": [ {{ "id": {}, "rot_z": 0.002 }} ]
            }}"#,
            pot.raw(),
            sensor.raw()
        );
        let corrections = AlignmentCorrections::from_json(&json).unwrap();
        assert_relative_eq!(corrections.rp_correction(pot).unwrap().sh_x_unc, 0.01);
        assert_relative_eq!(corrections.sensor_correction(sensor).unwrap().rot_z, 0.002);

        let round = AlignmentCorrections::from_json(&corrections.to_json().unwrap()).unwrap();
        assert_eq!(round, corrections);
    }

    #[test]
    fn test_json_rejects_foreign_id() {
        let json = r#"{ "sensor": [ { "id": 1, "sh_x": 0.1 } ] }"#;
        assert!(AlignmentCorrections::from_json(json).is_err());
        assert!(AlignmentCorrections::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "rp": [], "sensor": [] }}"#).unwrap();
        let corrections = AlignmentCorrections::from_file(file.path()).unwrap();
        assert!(corrections.is_empty());
        assert!(AlignmentCorrections::from_file("/nonexistent/alignment.json").is_err());
    }
}

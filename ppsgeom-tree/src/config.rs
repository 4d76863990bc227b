//! Geometry configuration: which description to load and how to align it.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::alignment::AlignmentCorrections;
use crate::cursor::Flavor;
use crate::description::CompactDescription;
use crate::error::{Error, Result};
use crate::node::GeometryNode;

/// Where the geometry comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Back-end convention, overriding the one recorded in the description.
    pub flavor: Option<Flavor>,
    /// Path of the description JSON.
    pub description: PathBuf,
    /// Optional alignment corrections JSON.
    pub alignment: Option<PathBuf>,
}

// Intermediate structs for the configuration file layout
#[derive(Deserialize)]
struct JsonConfig {
    geometry: JsonGeometry,
}

#[derive(Deserialize)]
struct JsonGeometry {
    #[serde(default)]
    flavor: Option<Flavor>,
    description: PathBuf,
    #[serde(default)]
    alignment: Option<PathBuf>,
}

impl GeometryConfig {
    /// Configuration for a description file with no alignment.
    #[must_use]
    pub fn new(description: impl Into<PathBuf>) -> Self {
        Self {
            flavor: None,
            description: description.into(),
            alignment: None,
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// Relative paths inside the file are resolved against its directory.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or names no
    /// description.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let json: JsonConfig = serde_json::from_reader(BufReader::new(file))?;
        let mut config = Self::from_json_config(json)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON cannot be parsed or names no description.
    pub fn from_json(json: &str) -> Result<Self> {
        let json: JsonConfig = serde_json::from_str(json)?;
        Self::from_json_config(json)
    }

    fn from_json_config(json: JsonConfig) -> Result<Self> {
        let geometry = json.geometry;
        if geometry.description.as_os_str().is_empty() {
            return Err(Error::InvalidDescription(
                "geometry.description must name a file".into(),
            ));
        }
        Ok(Self {
            flavor: geometry.flavor,
            description: geometry.description,
            alignment: geometry.alignment,
        })
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        if self.description.is_relative() {
            self.description = base.join(&self.description);
        }
        if let Some(alignment) = self.alignment.as_mut().filter(|p| p.is_relative()) {
            *alignment = base.join(&*alignment);
        }
    }

    /// Reads the description, builds the tree and applies the alignment if
    /// one is configured.
    ///
    /// # Errors
    /// Returns an error if the description or alignment file cannot be
    /// loaded.
    pub fn load_tree(&self) -> Result<GeometryNode> {
        let mut description = CompactDescription::from_file(&self.description)?;
        if let Some(flavor) = self.flavor {
            description.flavor = flavor;
        }
        let mut tree = description.build_tree();
        log::info!(
            "built geometry from {} ({} nodes)",
            self.description.display(),
            tree.node_count()
        );
        if let Some(path) = &self.alignment {
            let corrections = AlignmentCorrections::from_file(path)?;
            let aligned = corrections.apply_to(&mut tree);
            log::info!("aligned {aligned} nodes from {}", path.display());
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_json_loading() {
        let json = r#"{
            "geometry": {
                "flavor": "dd4hep",
                "description": "ctpps.json",
                "alignment": "corrections.json"
            }
        }"#;
        let config = GeometryConfig::from_json(json).unwrap();
        assert_eq!(config.flavor, Some(Flavor::Dd4hep));
        assert_eq!(config.description, PathBuf::from("ctpps.json"));
        assert_eq!(config.alignment, Some(PathBuf::from("corrections.json")));
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{ "geometry": { "description": "a.json" } }"#;
        let config = GeometryConfig::from_json(json).unwrap();
        assert_eq!(config, GeometryConfig::new("a.json"));
    }

    #[test]
    fn test_json_rejects_missing_description() {
        assert!(GeometryConfig::from_json(r#"{ "geometry": {} }"#).is_err());
        assert!(GeometryConfig::from_json(r#"{ "geometry": { "description": "" } }"#).is_err());
    }

    #[test]
    fn test_load_tree_from_file() {
        let dir = TempDir::new().unwrap();
        let mut description = File::create(dir.path().join("geom.json")).unwrap();
        write!(
            description,
            r#"{{ "flavor": "legacy", "root": {{ "name": "World", "children": [ {{ "name": "A" }} ] }} }}"#
        )
        .unwrap();
        let mut config = File::create(dir.path().join("config.json")).unwrap();
        write!(config, r#"{{ "geometry": {{ "description": "geom.json" }} }}"#).unwrap();

        let config = GeometryConfig::from_file(dir.path().join("config.json")).unwrap();
        assert_eq!(config.description, dir.path().join("geom.json"));
        let tree = config.load_tree().unwrap();
        assert_eq!(tree.node_count(), 2);
    }
}

//! ppsgeom-tree: Geometry description tree for the proton spectrometer.
//!
//! This crate turns a detector-description traversal into an owned tree of
//! [`GeometryNode`]s carrying global placements, solid shapes, sensor
//! classifications and detector ids, and applies alignment corrections to it.
//!
//! # Key Components
//!
//! - [`TraversalCursor`] / [`Navigate`] - what a description back-end must expose
//! - [`LegacyView`], [`Dd4hepView`] - the two back-end conventions over a [`CompactDescription`]
//! - [`GeometryNode`] - one placed volume and its owned children
//! - [`build_tree`] / [`GeometryBuilder`] - depth-first tree construction
//! - [`AlignmentCorrections`] - per-pot and per-sensor corrections
//! - [`GeometryConfig`] - JSON configuration tying it together

pub mod alignment;
pub mod builder;
pub mod config;
pub mod cursor;
pub mod description;
pub mod error;
pub mod node;

pub use alignment::AlignmentCorrections;
pub use builder::{build_tree, GeometryBuilder};
pub use config::GeometryConfig;
pub use cursor::{Flavor, Navigate, SolidKind, TraversalCursor};
pub use description::{CompactDescription, Dd4hepView, DescriptionNode, LegacyView, Solid};
pub use error::{Error, Result};
pub use node::GeometryNode;

//! In-memory detector description and the two cursor adapters over it.
//!
//! A [`CompactDescription`] is the nested placement hierarchy as read from
//! JSON. Placements in the file are relative to the parent; the views compose
//! them into the global placements a [`TraversalCursor`] reports.
//!
//! [`LegacyView`] and [`Dd4hepView`] share navigation and differ only in how
//! they present lengths and copy-number chains.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nalgebra::{Rotation3, Vector3};
use ppsgeom_core::{ChainOrder, CopyNumberChain, Placement};
use serde::{Deserialize, Serialize};

use crate::builder::build_tree;
use crate::cursor::{Flavor, Navigate, SolidKind, TraversalCursor};
use crate::error::{Error, Result};
use crate::node::GeometryNode;

fn identity_rows() -> [[f64; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}

/// Solid of a placement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Solid {
    #[serde(default)]
    pub kind: SolidKind,
    #[serde(default)]
    pub parameters: Vec<f64>,
}

/// One placement in the description, relative to its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionNode {
    /// Label, possibly `namespace:name`.
    pub name: String,
    #[serde(default)]
    pub copy_number: i32,
    #[serde(default)]
    pub translation: [f64; 3],
    /// Row-major rotation matrix.
    #[serde(default = "identity_rows")]
    pub rotation: [[f64; 3]; 3],
    #[serde(default)]
    pub solid: Solid,
    #[serde(default)]
    pub children: Vec<DescriptionNode>,
}

impl DescriptionNode {
    /// Creates a placement with identity rotation and no children.
    pub fn new(
        name: impl Into<String>,
        copy_number: i32,
        translation: [f64; 3],
        solid: Solid,
    ) -> Self {
        Self {
            name: name.into(),
            copy_number,
            translation,
            rotation: identity_rows(),
            solid,
            children: Vec::new(),
        }
    }

    /// Appends a child placement.
    #[must_use]
    pub fn with_child(mut self, child: DescriptionNode) -> Self {
        self.children.push(child);
        self
    }

    fn local_placement(&self) -> Placement {
        let rotation = Placement::rotation_from_rows(self.rotation).unwrap_or_else(|err| {
            log::error!("{}: {err}, using identity rotation", self.name);
            Rotation3::identity()
        });
        Placement::new(rotation, Vector3::from(self.translation))
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidDescription("placement without a name".into()));
        }
        Placement::rotation_from_rows(self.rotation).map_err(|err| {
            Error::InvalidDescription(format!("{} copy {}: {err}", self.name, self.copy_number))
        })?;
        self.children.iter().try_for_each(DescriptionNode::validate)
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(DescriptionNode::count).sum::<usize>()
    }
}

/// A complete placement hierarchy, tagged with the back-end whose length
/// convention its numbers follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactDescription {
    #[serde(default)]
    pub flavor: Flavor,
    pub root: DescriptionNode,
}

impl CompactDescription {
    /// Wraps a hierarchy.
    #[must_use]
    pub fn new(flavor: Flavor, root: DescriptionNode) -> Self {
        Self { flavor, root }
    }

    /// Load a description from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or holds an
    /// invalid placement.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let description: Self = serde_json::from_reader(BufReader::new(file))?;
        description.root.validate()?;
        Ok(description)
    }

    /// Load a description from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON cannot be parsed or holds an invalid
    /// placement.
    pub fn from_json(json: &str) -> Result<Self> {
        let description: Self = serde_json::from_str(json)?;
        description.root.validate()?;
        Ok(description)
    }

    /// Number of placements.
    #[must_use]
    pub fn placement_count(&self) -> usize {
        self.root.count()
    }

    /// Builds the geometry tree through the view matching [`Self::flavor`].
    #[must_use]
    pub fn build_tree(&self) -> GeometryNode {
        match self.flavor {
            Flavor::Legacy => build_tree(&mut LegacyView::new(&self.root)),
            Flavor::Dd4hep => build_tree(&mut Dd4hepView::new(&self.root)),
        }
    }
}

#[derive(Debug, Clone)]
struct Level<'a> {
    node: &'a DescriptionNode,
    index: usize,
    global: Placement,
}

/// Depth-first navigation shared by both views.
#[derive(Debug, Clone)]
struct Navigator<'a> {
    stack: Vec<Level<'a>>,
}

impl<'a> Navigator<'a> {
    fn new(root: &'a DescriptionNode) -> Self {
        Self {
            stack: vec![Level {
                node: root,
                index: 0,
                global: root.local_placement(),
            }],
        }
    }

    fn current(&self) -> &Level<'a> {
        // the root level is never popped
        &self.stack[self.stack.len() - 1]
    }

    fn compose(parent: &Placement, local: &Placement) -> Placement {
        Placement::new(
            parent.rotation * local.rotation,
            parent.rotation * local.translation + parent.translation,
        )
    }

    fn copy_numbers_root_first(&self) -> Vec<i32> {
        self.stack.iter().map(|level| level.node.copy_number).collect()
    }

    fn first_child(&mut self) -> bool {
        let current = self.current();
        let node = current.node;
        let Some(child) = node.children.first() else {
            return false;
        };
        let global = Self::compose(&current.global, &child.local_placement());
        self.stack.push(Level {
            node: child,
            index: 0,
            global,
        });
        true
    }

    fn next_sibling(&mut self) -> bool {
        let depth = self.stack.len();
        if depth < 2 {
            return false;
        }
        let parent_node = self.stack[depth - 2].node;
        let parent_global = self.stack[depth - 2].global;
        let index = self.stack[depth - 1].index + 1;
        let Some(sibling) = parent_node.children.get(index) else {
            return false;
        };
        self.stack[depth - 1] = Level {
            node: sibling,
            index,
            global: Self::compose(&parent_global, &sibling.local_placement()),
        };
        true
    }

    fn parent(&mut self) -> bool {
        if self.stack.len() < 2 {
            return false;
        }
        self.stack.pop();
        true
    }
}

macro_rules! delegate_navigation {
    ($view:ident) => {
        impl Navigate for $view<'_> {
            fn first_child(&mut self) -> bool {
                self.nav.first_child()
            }

            fn next_sibling(&mut self) -> bool {
                self.nav.next_sibling()
            }

            fn parent(&mut self) -> bool {
                self.nav.parent()
            }
        }
    };
}

/// Legacy view: lengths as stored (mm), copy numbers root first.
#[derive(Debug, Clone)]
pub struct LegacyView<'a> {
    nav: Navigator<'a>,
}

impl<'a> LegacyView<'a> {
    /// Positions a view at `root`.
    #[must_use]
    pub fn new(root: &'a DescriptionNode) -> Self {
        Self {
            nav: Navigator::new(root),
        }
    }
}

impl TraversalCursor for LegacyView<'_> {
    fn flavor(&self) -> Flavor {
        Flavor::Legacy
    }

    fn name(&self) -> &str {
        &self.nav.current().node.name
    }

    fn copy_number(&self) -> i32 {
        self.nav.current().node.copy_number
    }

    fn copy_numbers(&self) -> CopyNumberChain {
        CopyNumberChain::new(self.nav.copy_numbers_root_first(), ChainOrder::RootFirst)
    }

    fn translation(&self) -> Vector3<f64> {
        self.nav.current().global.translation
    }

    fn rotation(&self) -> Rotation3<f64> {
        self.nav.current().global.rotation
    }

    fn parent_z(&self) -> f64 {
        self.nav.current().node.translation[2]
    }

    fn solid_kind(&self) -> SolidKind {
        self.nav.current().node.solid.kind
    }

    fn solid_parameters(&self) -> Vec<f64> {
        self.nav.current().node.solid.parameters.clone()
    }
}

delegate_navigation!(LegacyView);

/// `DD4hep` view: lengths as stored (cm), copy numbers leaf first.
#[derive(Debug, Clone)]
pub struct Dd4hepView<'a> {
    nav: Navigator<'a>,
}

impl<'a> Dd4hepView<'a> {
    /// Positions a view at `root`.
    #[must_use]
    pub fn new(root: &'a DescriptionNode) -> Self {
        Self {
            nav: Navigator::new(root),
        }
    }
}

impl TraversalCursor for Dd4hepView<'_> {
    fn flavor(&self) -> Flavor {
        Flavor::Dd4hep
    }

    fn name(&self) -> &str {
        &self.nav.current().node.name
    }

    fn copy_number(&self) -> i32 {
        self.nav.current().node.copy_number
    }

    fn copy_numbers(&self) -> CopyNumberChain {
        let mut numbers = self.nav.copy_numbers_root_first();
        numbers.reverse();
        CopyNumberChain::new(numbers, ChainOrder::LeafFirst)
    }

    fn translation(&self) -> Vector3<f64> {
        self.nav.current().global.translation
    }

    fn rotation(&self) -> Rotation3<f64> {
        self.nav.current().global.rotation
    }

    fn parent_z(&self) -> f64 {
        self.nav.current().node.translation[2]
    }

    fn solid_kind(&self) -> SolidKind {
        self.nav.current().node.solid.kind
    }

    fn solid_parameters(&self) -> Vec<f64> {
        self.nav.current().node.solid.parameters.clone()
    }
}

delegate_navigation!(Dd4hepView);

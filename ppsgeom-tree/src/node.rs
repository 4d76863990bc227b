//! Geometry description node.
//!
//! Each node describes one placed volume: its global placement, solid, sensor
//! classification and detector id, plus the exclusively owned child nodes.
//!
//! The translation and rotation define the local-to-global transform:
//!
//! ```text
//! x_global = rotation * x_local + translation
//! ```
//!
//! All lengths held by a node are in mm, except the raw solid parameters,
//! which keep the unit of the back-end that produced them.

use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Write};

use nalgebra::{Rotation3, Vector3};
use ppsgeom_core::{
    AlignmentCorrection, DetId, DetIdEncoder, DiamondDimensions, Placement, PpsDetIdEncoder,
    SensorType, ShapeParameters,
};

use crate::cursor::{Flavor, SolidKind, TraversalCursor};

/// Separator between namespace and volume name in description labels.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Number of parameters a box solid carries (three half-widths).
const BOX_PARAMETER_COUNT: usize = 3;

/// Strips the `namespace:` prefix from a label.
#[must_use]
pub fn name_without_namespace(label: &str) -> &str {
    label
        .rfind(NAMESPACE_SEPARATOR)
        .map_or(label, |pos| &label[pos + NAMESPACE_SEPARATOR.len_utf8()..])
}

/// One node of the geometry tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryNode {
    name: String,
    copy_number: i32,
    flavor: Flavor,
    placement: Placement,
    shape_parameters: ShapeParameters,
    is_box: bool,
    diamond_dimensions: DiamondDimensions,
    sensor_type: SensorType,
    geographical_id: DetId,
    parent_z_position: f64,
    components: Vec<GeometryNode>,
}

impl GeometryNode {
    /// Builds a childless node from the placement under `cursor`, encoding
    /// ids with the PPS naming convention.
    #[must_use]
    pub fn build<C: TraversalCursor + ?Sized>(cursor: &C) -> Self {
        Self::build_with(cursor, &PpsDetIdEncoder)
    }

    /// Builds a childless node with a caller-supplied id encoder.
    ///
    /// Never fails: malformed solids are logged and degrade to non-box
    /// defaults.
    #[must_use]
    pub fn build_with<C, E>(cursor: &C, encoder: &E) -> Self
    where
        C: TraversalCursor + ?Sized,
        E: DetIdEncoder + ?Sized,
    {
        let flavor = cursor.flavor();
        let unit = flavor.length_unit();

        let name = name_without_namespace(cursor.name()).to_owned();
        let copy_number = cursor.copy_number();
        let placement = Placement::new(cursor.rotation(), unit.to_mm_factor() * cursor.translation());
        let shape_parameters = ShapeParameters::new(cursor.solid_parameters(), unit);
        let sensor_type = SensorType::classify(&name);
        let solid_kind = cursor.solid_kind();
        let is_box = Self::compute_is_box(&name, solid_kind, &shape_parameters);
        let diamond_dimensions =
            Self::compute_diamond_dimensions(&name, solid_kind, sensor_type, &shape_parameters);
        let geographical_id = encoder.encode(&name, &cursor.copy_numbers(), copy_number);
        let parent_z_position = unit.to_mm(cursor.parent_z());

        Self {
            name,
            copy_number,
            flavor,
            placement,
            shape_parameters,
            is_box,
            diamond_dimensions,
            sensor_type,
            geographical_id,
            parent_z_position,
            components: Vec::new(),
        }
    }

    fn compute_is_box(name: &str, kind: SolidKind, params: &ShapeParameters) -> bool {
        if kind != SolidKind::Box {
            return false;
        }
        if params.len() != BOX_PARAMETER_COUNT {
            log::warn!(
                "{name}: box solid with {} parameters, treating it as not a box",
                params.len()
            );
            return false;
        }
        true
    }

    fn compute_diamond_dimensions(
        name: &str,
        kind: SolidKind,
        sensor_type: SensorType,
        params: &ShapeParameters,
    ) -> DiamondDimensions {
        let dimensions = match kind {
            SolidKind::Box => return DiamondDimensions::default(),
            SolidKind::Trd => DiamondDimensions::from_trd(params),
            SolidKind::Tubs | SolidKind::Polycone | SolidKind::Other => None,
        };
        dimensions.unwrap_or_else(|| {
            if sensor_type == SensorType::Diamond {
                log::warn!(
                    "{name}: no diamond dimensions from {kind:?} with {} parameters",
                    params.len()
                );
            }
            DiamondDimensions::default()
        })
    }

    /// Volume name without namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy number.
    #[must_use]
    pub fn copy_number(&self) -> i32 {
        self.copy_number
    }

    /// Back-end this node was built from.
    #[must_use]
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Returns true if the node was built from the `DD4hep` back-end.
    #[must_use]
    pub fn is_dd4hep(&self) -> bool {
        self.flavor.is_dd4hep()
    }

    /// Global placement.
    #[must_use]
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Global translation, in mm.
    #[must_use]
    pub fn translation(&self) -> &Vector3<f64> {
        &self.placement.translation
    }

    /// Global rotation.
    #[must_use]
    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.placement.rotation
    }

    /// Raw solid parameters.
    ///
    /// Use with care: parameter order may differ between back-end versions
    /// and lengths are in the back-end's unit (see [`ShapeParameters::unit`]).
    #[must_use]
    pub fn shape_parameters(&self) -> &ShapeParameters {
        &self.shape_parameters
    }

    /// Returns true if the solid is a box.
    #[must_use]
    pub fn is_box(&self) -> bool {
        self.is_box
    }

    /// Half-widths of a diamond sensor, in mm.
    ///
    /// Only meaningful for non-box nodes. Calling it on a box logs an error
    /// and returns the stored, meaningless value.
    #[must_use]
    pub fn diamond_dimensions(&self) -> &DiamondDimensions {
        if self.is_box {
            log::error!(
                "diamond_dimensions called on a box, for solid {}, id = {}",
                self.name,
                self.geographical_id
            );
        }
        &self.diamond_dimensions
    }

    /// Sensor classification.
    #[must_use]
    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    /// Detector id; default for structural volumes.
    #[must_use]
    pub fn geographical_id(&self) -> DetId {
        self.geographical_id
    }

    /// z relative to the parent, in mm.
    #[must_use]
    pub fn parent_z_position(&self) -> f64 {
        self.parent_z_position
    }

    /// Direct children, in insertion order.
    #[must_use]
    pub fn components(&self) -> &[GeometryNode] {
        &self.components
    }

    /// Mutable access to the direct children.
    pub fn components_mut(&mut self) -> &mut [GeometryNode] {
        &mut self.components
    }

    /// Appends a child, taking ownership of it.
    pub fn add_component(&mut self, child: GeometryNode) {
        self.components.push(child);
    }

    /// Returns true if the node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Applies an alignment correction to the placement.
    ///
    /// Only translation and rotation change.
    pub fn apply_alignment(&mut self, correction: &AlignmentCorrection) {
        self.placement = self.placement.aligned(correction);
    }

    /// Detaches the direct children and hands them to the caller.
    ///
    /// Their subtrees stay intact and are owned by the caller from here on.
    #[must_use = "detached children are dropped if not kept"]
    pub fn destroy_shallow(&mut self) -> Vec<GeometryNode> {
        std::mem::take(&mut self.components)
    }

    /// Releases every descendant in post-order and leaves `self` a leaf.
    ///
    /// Returns the number of descendants released, which is
    /// `node_count() - 1`: the node it is called on stays alive with its
    /// owner. Dropping a whole tree releases all of its nodes.
    pub fn destroy_deep(&mut self) -> usize {
        self.destroy_deep_with(|_| {})
    }

    /// Like [`Self::destroy_deep`], calling `on_release` for each descendant
    /// just before it is dropped, after all of its own descendants.
    pub fn destroy_deep_with<F: FnMut(&GeometryNode)>(&mut self, mut on_release: F) -> usize {
        fn release<F: FnMut(&GeometryNode)>(mut node: GeometryNode, on_release: &mut F) -> usize {
            let released: usize = std::mem::take(&mut node.components)
                .into_iter()
                .map(|child| release(child, on_release))
                .sum();
            on_release(&node);
            released + 1
        }

        std::mem::take(&mut self.components)
            .into_iter()
            .map(|child| release(child, &mut on_release))
            .sum()
    }

    /// Pre-order iterator over this subtree.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    /// Post-order iterator over this subtree.
    #[must_use]
    pub fn post_order(&self) -> PostOrder<'_> {
        PostOrder {
            stack: vec![(self, false)],
        }
    }

    /// Calls `f` on every node of this subtree, pre-order.
    pub fn for_each_mut<F: FnMut(&mut GeometryNode)>(&mut self, mut f: F) {
        fn visit<F: FnMut(&mut GeometryNode)>(node: &mut GeometryNode, f: &mut F) {
            f(node);
            for child in &mut node.components {
                visit(child, f);
            }
        }
        visit(self, &mut f);
    }

    /// First node (pre-order) with the given detector id.
    #[must_use]
    pub fn find_by_id(&self, id: DetId) -> Option<&GeometryNode> {
        self.iter().find(|node| node.geographical_id == id)
    }

    /// First node (pre-order) with the given name and copy number.
    #[must_use]
    pub fn find(&self, name: &str, copy_number: i32) -> Option<&GeometryNode> {
        self.iter()
            .find(|node| node.name == name && node.copy_number == copy_number)
    }

    /// All nodes with a detector id, in node order.
    #[must_use]
    pub fn sensors(&self) -> Vec<&GeometryNode> {
        let mut sensors: Vec<_> = self
            .iter()
            .filter(|node| !node.geographical_id.is_null())
            .collect();
        sensors.sort_by(|a, b| a.cmp_by_id(b));
        sensors
    }

    /// Sorts children at every level by node order.
    pub fn sort_components(&mut self) {
        self.for_each_mut(|node| node.components.sort_by(GeometryNode::cmp_by_id));
    }

    /// Node order: by detector id, then name, then copy number.
    #[must_use]
    pub fn cmp_by_id(&self, other: &Self) -> Ordering {
        self.geographical_id
            .cmp(&other.geographical_id)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.copy_number.cmp(&other.copy_number))
    }

    /// Logs identity, placement and shape of this node.
    pub fn print(&self) {
        let t = &self.placement.translation;
        let r = self.placement.rotation.matrix();
        log::info!("{self}");
        log::info!("  translation [mm]: ({:.4}, {:.4}, {:.4})", t.x, t.y, t.z);
        for row in 0..3 {
            log::info!(
                "  rotation row {row}: ({:.6}, {:.6}, {:.6})",
                r[(row, 0)],
                r[(row, 1)],
                r[(row, 2)]
            );
        }
        log::info!(
            "  shape: box = {}, parameters [{}] = {:?}",
            self.is_box,
            self.shape_parameters.unit().symbol(),
            self.shape_parameters.values()
        );
        if !self.is_box {
            let d = &self.diamond_dimensions;
            log::info!(
                "  diamond half-widths [mm]: ({}, {}, {})",
                d.x_half_width,
                d.y_half_width,
                d.z_half_width
            );
        }
        log::info!(
            "  parent z [mm]: {}, children: {}",
            self.parent_z_position,
            self.components.len()
        );
    }

    /// Writes an indented one-line-per-node dump of this subtree.
    ///
    /// # Errors
    /// Returns an error if writing to `writer` fails.
    pub fn write_tree<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        fn write_level<W: Write>(
            node: &GeometryNode,
            depth: usize,
            writer: &mut W,
        ) -> io::Result<()> {
            let t = node.translation();
            writeln!(
                writer,
                "{:indent$}{node} at ({:.3}, {:.3}, {:.3}) mm",
                "",
                t.x,
                t.y,
                t.z,
                indent = 2 * depth
            )?;
            for child in &node.components {
                write_level(child, depth + 1, writer)?;
            }
            Ok(())
        }
        write_level(self, 0, writer)
    }
}

impl fmt::Display for GeometryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.copy_number)?;
        if !self.geographical_id.is_null() {
            write!(f, " id {}", self.geographical_id)?;
        }
        if self.sensor_type.is_sensor() {
            write!(f, " sensor {}", self.sensor_type)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a GeometryNode {
    type Item = &'a GeometryNode;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pre-order iterator, see [`GeometryNode::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    stack: Vec<&'a GeometryNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a GeometryNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.components.iter().rev());
        Some(node)
    }
}

/// Post-order iterator, see [`GeometryNode::post_order`].
#[derive(Debug, Clone)]
pub struct PostOrder<'a> {
    stack: Vec<(&'a GeometryNode, bool)>,
}

impl<'a> Iterator for PostOrder<'a> {
    type Item = &'a GeometryNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, expanded)) = self.stack.pop() {
            if expanded || node.is_leaf() {
                return Some(node);
            }
            self.stack.push((node, true));
            self.stack
                .extend(node.components.iter().rev().map(|child| (child, false)));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::description::{DescriptionNode, LegacyView, Solid};
    use approx::assert_relative_eq;

    fn boxed(params: Vec<f64>) -> Solid {
        Solid {
            kind: SolidKind::Box,
            parameters: params,
        }
    }

    fn leaf(name: &str, copy: i32, solid: Solid) -> GeometryNode {
        let description = DescriptionNode::new(name, copy, [0.0, 0.0, 0.0], solid);
        GeometryNode::build(&LegacyView::new(&description))
    }

    #[test]
    fn test_name_without_namespace() {
        assert_eq!(name_without_namespace("RP_1_Primary:RPixWafer"), "RPixWafer");
        assert_eq!(name_without_namespace("a:b:c"), "c");
        assert_eq!(name_without_namespace("Plain"), "Plain");
        assert_eq!(name_without_namespace("trailing:"), "");
    }

    #[test]
    fn test_box_with_wrong_parameter_count_is_not_a_box() {
        let node = leaf("Odd", 0, boxed(vec![1.0, 2.0]));
        assert!(!node.is_box());
        let node = leaf("Good", 0, boxed(vec![1.0, 2.0, 3.0]));
        assert!(node.is_box());
    }

    #[test]
    fn test_diamond_dimensions_from_trapezoid() {
        let solid = Solid {
            kind: SolidKind::Trd,
            parameters: vec![2.0, 1.5, 3.0, 3.0, 0.25],
        };
        let node = leaf("ns:CTPPS_Diamond_Segment", 101, solid);
        assert!(!node.is_box());
        let dims = node.diamond_dimensions();
        assert_relative_eq!(dims.x_half_width, 2.0);
        assert_relative_eq!(dims.y_half_width, 3.0);
        assert_relative_eq!(dims.z_half_width, 0.25);
    }

    #[test]
    fn test_solids_without_half_width_layout_degrade() {
        let tube = Solid {
            kind: SolidKind::Tubs,
            parameters: vec![0.0, 40.0, 5.0, 0.0, 6.28],
        };
        let node = leaf("CTPPS_Diamond_Segment", 0, tube);
        assert_eq!(*node.diamond_dimensions(), DiamondDimensions::default());

        let other = Solid {
            kind: SolidKind::Other,
            parameters: vec![2.0, 3.0, 0.25],
        };
        let node = leaf("CTPPS_Diamond_Segment", 0, other);
        assert_eq!(*node.diamond_dimensions(), DiamondDimensions::default());

        let short_trd = Solid {
            kind: SolidKind::Trd,
            parameters: vec![1.0, 1.0, 2.0, 2.0],
        };
        let node = leaf("CTPPS_Diamond_Segment", 0, short_trd);
        assert_eq!(*node.diamond_dimensions(), DiamondDimensions::default());
    }

    #[test]
    fn test_diamond_dimensions_on_box_is_not_fatal() {
        let node = leaf("Box_A", 0, boxed(vec![5.0, 5.0, 1.0]));
        assert_eq!(*node.diamond_dimensions(), DiamondDimensions::default());
    }

    #[test]
    fn test_order_falls_back_to_name_and_copy() {
        let a = leaf("Plane", 2, Solid::default());
        let b = leaf("Plane", 1, Solid::default());
        let c = leaf("Alpha", 9, Solid::default());
        assert_eq!(a.cmp_by_id(&b), Ordering::Greater);
        assert_eq!(b.cmp_by_id(&a), Ordering::Less);
        assert_eq!(c.cmp_by_id(&b), Ordering::Less);
        assert_eq!(a.cmp_by_id(&a), Ordering::Equal);
    }

    #[test]
    fn test_iterators() {
        let mut root = leaf("root", 0, Solid::default());
        let mut a = leaf("a", 0, Solid::default());
        a.add_component(leaf("a1", 0, Solid::default()));
        root.add_component(a);
        root.add_component(leaf("b", 0, Solid::default()));

        let pre: Vec<_> = root.iter().map(GeometryNode::name).collect();
        assert_eq!(pre, ["root", "a", "a1", "b"]);
        let post: Vec<_> = root.post_order().map(GeometryNode::name).collect();
        assert_eq!(post, ["a1", "a", "b", "root"]);
        assert_eq!(root.node_count(), 4);
        assert!(root.find("a1", 0).is_some());
        assert!(root.find("a1", 1).is_none());
    }

    #[test]
    fn test_display_and_write_tree() {
        let mut root = leaf("root", 0, Solid::default());
        root.add_component(leaf("RPixWafer", 3, boxed(vec![1.0, 1.0, 1.0])));
        assert_eq!(root.to_string(), "root[0]");
        assert_eq!(root.components()[0].to_string(), "RPixWafer[3] sensor 3x2");

        let mut out = Vec::new();
        root.write_tree(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("  RPixWafer[3]"));
    }
}

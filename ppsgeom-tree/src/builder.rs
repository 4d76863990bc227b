//! Depth-first construction of a [`GeometryNode`] tree from a cursor.

use ppsgeom_core::{DetIdEncoder, PpsDetIdEncoder};

use crate::cursor::{Navigate, TraversalCursor};
use crate::node::GeometryNode;

/// Builds a tree rooted at the cursor's current placement, using the PPS id
/// encoder.
///
/// The cursor is left at the placement it started from.
pub fn build_tree<C: TraversalCursor + Navigate + ?Sized>(cursor: &mut C) -> GeometryNode {
    GeometryBuilder::new().build(cursor)
}

/// Tree builder with a configurable id encoder.
#[derive(Debug, Clone, Default)]
pub struct GeometryBuilder<E = PpsDetIdEncoder> {
    encoder: E,
}

impl GeometryBuilder {
    /// Builder with the PPS id encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: DetIdEncoder> GeometryBuilder<E> {
    /// Builder with a custom id encoder.
    #[must_use]
    pub fn with_encoder(encoder: E) -> Self {
        Self { encoder }
    }

    /// Builds the subtree under the cursor's current placement.
    pub fn build<C: TraversalCursor + Navigate + ?Sized>(&self, cursor: &mut C) -> GeometryNode {
        let mut node = GeometryNode::build_with(&*cursor, &self.encoder);
        if cursor.first_child() {
            loop {
                node.add_component(self.build(cursor));
                if !cursor.next_sibling() {
                    break;
                }
            }
            cursor.parent();
        }
        log::debug!("built {node} with {} children", node.components().len());
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::{DescriptionNode, LegacyView, Solid};
    use ppsgeom_core::{CopyNumberChain, DetId};

    /// Numbers every placement by its copy number.
    struct CopyEncoder;

    impl DetIdEncoder for CopyEncoder {
        fn encode(&self, _name: &str, _chain: &CopyNumberChain, copy_number: i32) -> DetId {
            DetId(u32::try_from(copy_number).unwrap_or_default())
        }
    }

    fn sample() -> DescriptionNode {
        DescriptionNode::new("World", 1, [0.0; 3], Solid::default())
            .with_child(
                DescriptionNode::new("Pot", 2, [0.0; 3], Solid::default())
                    .with_child(DescriptionNode::new("Plane", 3, [0.0; 3], Solid::default()))
                    .with_child(DescriptionNode::new("Plane", 4, [0.0; 3], Solid::default())),
            )
            .with_child(DescriptionNode::new("Pot", 5, [0.0; 3], Solid::default()))
    }

    #[test]
    fn test_build_preserves_shape_and_order() {
        let root = sample();
        let tree = build_tree(&mut LegacyView::new(&root));
        assert_eq!(tree.node_count(), 5);
        let copies: Vec<_> = tree.iter().map(GeometryNode::copy_number).collect();
        assert_eq!(copies, [1, 2, 3, 4, 5]);
        assert_eq!(tree.components()[0].components().len(), 2);
        assert!(tree.components()[1].is_leaf());
    }

    #[test]
    fn test_cursor_returns_to_start() {
        let root = sample();
        let mut view = LegacyView::new(&root);
        let _ = build_tree(&mut view);
        assert_eq!(view.name(), "World");
        assert!(!view.parent());
    }

    #[test]
    fn test_custom_encoder() {
        let root = sample();
        let tree = GeometryBuilder::with_encoder(CopyEncoder).build(&mut LegacyView::new(&root));
        let ids: Vec<_> = tree.iter().map(|n| n.geographical_id().0).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5]);
    }
}

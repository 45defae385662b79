//! Drawing coordinates for a tree snapshot.
//!
//! x comes from the in-order position ("slot"), y from the depth. Only BST
//! order and consistent parent/child links are assumed, so any recorded
//! step can be laid out, including ones taken halfway through a fix-up.

use crate::node::{Color, NodeId, Slot};
use crate::tree::Tree;

/// Spacing used to turn slots and depths into coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutOptions {
    /// Horizontal distance between neighbouring in-order slots
    pub x_spacing: f64,
    /// Vertical distance between depth tiers
    pub y_spacing: f64,
    /// Padding around the drawing
    pub margin: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            x_spacing: 60.0,
            y_spacing: 80.0,
            margin: 40.0,
        }
    }
}

/// A node with its position.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacedNode<K> {
    pub id: NodeId,
    pub value: K,
    pub color: Color,
    /// In-order position, starting at 0
    pub slot: usize,
    /// Distance from the root, starting at 0
    pub depth: usize,
    pub x: f64,
    pub y: f64,
}

/// A parent/child link to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub parent_id: NodeId,
    pub child_id: NodeId,
}

/// Positions for every node of a tree plus the edges between them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layout<K> {
    /// Nodes in ascending key order
    pub nodes: Vec<PlacedNode<K>>,
    pub edges: Vec<Edge>,
    /// Width of the drawing including margins
    pub width: f64,
    /// Height of the drawing including margins
    pub height: f64,
}

impl<K> Default for Layout<K> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            width: 0.0,
            height: 0.0,
        }
    }
}

impl<K> Layout<K> {
    /// Position of the node with `id`.
    pub fn position(&self, id: NodeId) -> Option<(f64, f64)> {
        self.nodes.iter().find(|n| n.id == id).map(|n| (n.x, n.y))
    }
}

/// Lay out `tree` with the given spacing.
pub fn layout<K: Clone>(tree: &Tree<K>, options: &LayoutOptions) -> Layout<K> {
    let mut out = Layout::default();
    let mut max_depth = 0;
    let mut stack: Vec<(Slot, usize)> = Vec::new();
    let mut cursor = tree.root().map(|r| (r, 0));

    loop {
        while let Some((slot, depth)) = cursor {
            stack.push((slot, depth));
            cursor = tree.node(slot).left().map(|l| (l, depth + 1));
        }
        let Some((slot, depth)) = stack.pop() else { break };
        let node = tree.node(slot);
        let position = out.nodes.len();
        out.nodes.push(PlacedNode {
            id: node.id(),
            value: node.value().clone(),
            color: node.color(),
            slot: position,
            depth,
            x: options.margin + position as f64 * options.x_spacing,
            y: options.margin + depth as f64 * options.y_spacing,
        });
        for child in [node.left(), node.right()].into_iter().flatten() {
            out.edges.push(Edge {
                parent_id: node.id(),
                child_id: tree.node(child).id(),
            });
        }
        max_depth = max_depth.max(depth);
        cursor = node.right().map(|r| (r, depth + 1));
    }

    if let Some(last) = out.nodes.len().checked_sub(1) {
        out.width = 2.0 * options.margin + last as f64 * options.x_spacing;
        out.height = 2.0 * options.margin + max_depth as f64 * options.y_spacing;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{build, build_instant};

    #[test]
    fn empty_tree_has_empty_layout() {
        let tree: Tree<i32> = Tree::new();
        let l = layout(&tree, &LayoutOptions::default());
        assert!(l.nodes.is_empty());
        assert!(l.edges.is_empty());
        assert_eq!((l.width, l.height), (0.0, 0.0));
    }

    #[test]
    fn slots_follow_inorder_and_depth_follows_level() {
        let tree = build_instant([20, 10, 30]);
        let l = layout(&tree, &LayoutOptions::default());
        let values: Vec<_> = l.nodes.iter().map(|n| n.value).collect();
        assert_eq!(values, vec![10, 20, 30]);
        let depths: Vec<_> = l.nodes.iter().map(|n| n.depth).collect();
        assert_eq!(depths, vec![1, 0, 1]);
        assert_eq!(l.nodes[1].x, 100.0);
        assert_eq!(l.nodes[0].y, 120.0);
        assert_eq!(l.width, 200.0);
        assert_eq!(l.height, 160.0);
    }

    #[test]
    fn edges_match_child_links() {
        let tree = build_instant(1..=10);
        let l = layout(&tree, &LayoutOptions::default());
        assert_eq!(l.edges.len(), tree.len() - 1);
        let root = tree.root_node().unwrap().id();
        assert!(l.edges.iter().all(|e| e.child_id != root));
    }

    #[test]
    fn tolerates_mid_fixup_snapshots() {
        let run = build([1, 2, 3, 4, 5, 6]);
        for step in &run.steps {
            let l = layout(&step.snapshot, &LayoutOptions::default());
            assert_eq!(l.nodes.len(), step.snapshot.len());
            assert!(l.nodes.windows(2).all(|w| w[0].value < w[1].value && w[0].x < w[1].x));
        }
    }

    #[test]
    fn position_lookup() {
        let tree = build_instant([2, 1, 3]);
        let options = LayoutOptions { x_spacing: 10.0, y_spacing: 10.0, margin: 0.0 };
        let l = layout(&tree, &options);
        let root = tree.root_node().unwrap().id();
        assert_eq!(l.position(root), Some((10.0, 0.0)));
        assert_eq!(l.position(NodeId(99)), None);
    }
}

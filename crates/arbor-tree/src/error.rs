//! Error types for arbor-tree.

use thiserror::Error;

use crate::NodeId;

/// Result type for invariant checks.
pub type Result<T> = std::result::Result<T, InvariantViolation>;

/// A red-black or structural invariant that does not hold.
///
/// Only produced by [`Tree::check_structure`](crate::Tree::check_structure)
/// and [`Tree::check_invariants`](crate::Tree::check_invariants); the
/// algorithms themselves never check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// In-order sequence is not strictly increasing.
    #[error("in-order sequence is not strictly increasing at node {node}")]
    Unordered {
        /// First node that is not greater than its predecessor
        node: NodeId,
    },

    /// The root is red.
    #[error("root {root} is red")]
    RedRoot {
        /// Root node
        root: NodeId,
    },

    /// A red node has a red child.
    #[error("red node {parent} has red child {child}")]
    RedRed {
        /// Red parent
        parent: NodeId,
        /// Red child
        child: NodeId,
    },

    /// Left and right subtrees have different black heights.
    #[error("black height differs below {node}: left {left}, right {right}")]
    BlackHeight {
        /// Node whose subtrees disagree
        node: NodeId,
        /// Black height of the left subtree
        left: usize,
        /// Black height of the right subtree
        right: usize,
    },

    /// A parent back-reference does not match the owning child link.
    #[error("parent link of {node} does not match its owner")]
    ParentLink {
        /// Node with the stale back-reference
        node: NodeId,
    },

    /// The arena holds nodes that cannot be reached from the root.
    #[error("{reachable} of {total} arena nodes are reachable from the root")]
    Unreachable {
        /// Nodes reached by walking from the root
        reachable: usize,
        /// Nodes in the arena
        total: usize,
    },
}

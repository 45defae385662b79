//! Arbor Tree
//!
//! Red-black tree engine that records every intermediate state of an
//! operation as a replayable sequence of snapshots.
//!
//! # Pieces
//!
//! - **Node model** ([`Tree`], [`Node`]): arena-backed nodes with owning
//!   child links, parent back-references, rotations and deep snapshots.
//! - **Mutation algorithms** ([`ops`]): insert with the classical fix-up
//!   cases, delete as an explained rebuild, update, and bulk build.
//! - **Step recorder** ([`Recorder`]): turns progress reports into
//!   `{snapshot, highlight, explanation}` steps.
//! - **Layout** ([`layout()`]): in-order slot and depth to drawing
//!   coordinates.
//!
//! # Example
//!
//! ```
//! use arbor_tree::ops;
//!
//! let run = ops::build([10, 20, 30]);
//! let last = run.final_snapshot().unwrap();
//! assert_eq!(*last.root_node().unwrap().value(), 20);
//! assert_eq!(last.check_invariants(), Ok(1));
//!
//! let run = ops::delete(&run.tree, &20);
//! assert_eq!(run.tree.inorder(), vec![10, 30]);
//! ```

mod error;
mod node;
mod tree;
mod layout;
pub mod ops;
pub mod step;

pub use error::{InvariantViolation, Result};
pub use node::{Color, Node, NodeId, Side, Slot};
pub use tree::{Snapshot, Tree};
pub use layout::{layout, Edge, Layout, LayoutOptions, PlacedNode};
pub use ops::{Key, Outcome, Run, TreeStep};
pub use step::{Capture, Discard, Recorder, Step, StepSink};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_three_key_scenario() {
        let run = ops::build([10, 20, 30]);
        let tree = run.final_snapshot().unwrap();
        let root = tree.root_node().unwrap();
        assert_eq!((*root.value(), root.color()), (20, Color::Black));
        let children: Vec<_> = [root.left(), root.right()]
            .into_iter()
            .flatten()
            .map(|s| (*tree.node(s).value(), tree.node(s).color()))
            .collect();
        assert_eq!(children, vec![(10, Color::Red), (30, Color::Red)]);
    }

    #[test]
    fn build_then_delete_single_key() {
        let built = ops::build([5]);
        let run = ops::delete(&built.tree, &5);
        assert!(run.final_snapshot().unwrap().is_empty());
    }
}

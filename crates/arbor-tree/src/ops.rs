//! Mutation algorithms.
//!
//! Each public operation works on a private copy of the tree it is given
//! and returns the resulting tree together with every recorded step. The
//! `*_with` variants run in place against any [`StepSink`], which is how
//! the unrecorded bulk load ([`build_instant`]) shares code with the
//! recorded paths.
//!
//! Insertion is the classical red-black insert with the four fix-up cases
//! (mirrored for both orientations). Deletion is a rebuild: the surviving
//! keys are replayed through insert onto a fresh tree. That keeps every
//! step explainable with the insert case table, at the cost of O(n log n)
//! work and a final shape that may differ from an in-place delete.

use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use crate::node::{Color, NodeId, Side, Slot};
use crate::step::{Discard, Recorder, Step, StepSink};
use crate::tree::{Snapshot, Tree};

/// Requirements on tree keys.
pub trait Key: Ord + Clone + fmt::Display {}

impl<T: Ord + Clone + fmt::Display> Key for T {}

/// A recorded step of a tree operation.
pub type TreeStep<K> = Step<Snapshot<K>>;

/// What an operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Outcome {
    /// A new node was created
    Inserted {
        /// Id of the new node
        id: NodeId,
    },
    /// The key was already present; nothing changed
    Duplicate {
        /// Id of the existing node
        id: NodeId,
    },
    /// The key was removed and the tree rebuilt
    Deleted {
        /// Keys left after the rebuild
        remaining: usize,
    },
    /// The key to delete or update was not present; nothing changed
    NotFound,
    /// The old key was removed and the new key is present
    Updated {
        /// Node now holding the new key
        id: NodeId,
        /// True if the new key already existed, so the tree shrank by one
        merged: bool,
    },
    /// A tree was built from a sequence
    Built {
        /// Keys that created nodes
        inserted: usize,
        /// Keys skipped as duplicates
        duplicates: usize,
    },
}

impl Outcome {
    /// True if the operation left the tree unchanged.
    pub fn is_noop(&self) -> bool {
        matches!(self, Outcome::Duplicate { .. } | Outcome::NotFound)
    }
}

/// Result of a recorded operation.
#[derive(Debug, Clone)]
pub struct Run<K> {
    /// Tree after the operation
    pub tree: Tree<K>,
    /// Every recorded step, in order
    pub steps: Vec<TreeStep<K>>,
    /// Summary of what happened
    pub outcome: Outcome,
}

impl<K> Run<K> {
    fn finish(operation: &'static str, tree: Tree<K>, recorder: Recorder<Snapshot<K>>, outcome: Outcome) -> Self {
        let steps = recorder.into_steps();
        debug!(operation, ?outcome, steps = steps.len(), keys = tree.len(), "operation recorded");
        Self { tree, steps, outcome }
    }

    /// Snapshot of the last recorded step.
    pub fn final_snapshot(&self) -> Option<&Snapshot<K>> {
        self.steps.last().map(|s| &s.snapshot)
    }
}

/// Insert `value`, recording every step.
pub fn insert<K: Key>(tree: &Tree<K>, value: K) -> Run<K> {
    let mut working = tree.clone_tree();
    let mut recorder = Recorder::new();
    let outcome = insert_with(&mut working, value, &mut recorder);
    Run::finish("insert", working, recorder, outcome)
}

/// Delete `value` by rebuilding from the remaining keys, recording every step.
pub fn delete<K: Key>(tree: &Tree<K>, value: &K) -> Run<K> {
    let mut recorder = Recorder::new();
    let (rebuilt, outcome) = delete_with(tree, value, &mut recorder);
    Run::finish("delete", rebuilt, recorder, outcome)
}

/// Replace `old` with `new`: a delete followed by an insert.
pub fn update<K: Key>(tree: &Tree<K>, old: &K, new: K) -> Run<K> {
    let mut recorder = Recorder::new();
    let (updated, outcome) = update_with(tree, old, new, &mut recorder);
    Run::finish("update", updated, recorder, outcome)
}

/// Build a tree by inserting `values` in order into an empty tree.
pub fn build<K: Key>(values: impl IntoIterator<Item = K>) -> Run<K> {
    let mut recorder = Recorder::new();
    let (built, outcome) = build_with(values, &mut recorder);
    Run::finish("build", built, recorder, outcome)
}

/// Same inserts as [`build`], without taking any snapshots.
pub fn build_instant<K: Key>(values: impl IntoIterator<Item = K>) -> Tree<K> {
    build_with(values, &mut Discard).0
}

/// Insert `value` into `tree` in place, reporting to `sink`.
pub fn insert_with<K: Key, S: StepSink<Tree<K>>>(tree: &mut Tree<K>, value: K, sink: &mut S) -> Outcome {
    insert_node(tree, value, None, sink)
}

/// Delete `value` from a copy of `tree`, reporting to `sink`.
pub fn delete_with<K: Key, S: StepSink<Tree<K>>>(tree: &Tree<K>, value: &K, sink: &mut S) -> (Tree<K>, Outcome) {
    let Some(target) = tree.find(value) else {
        sink.push(tree, &[], format_args!("{value} is not in the tree; nothing to delete"));
        return (tree.clone_tree(), Outcome::NotFound);
    };

    let survivors: Vec<(K, NodeId)> = tree
        .inorder_entries()
        .into_iter()
        .filter(|(key, _)| key != value)
        .collect();
    sink.push(
        tree,
        &[tree.node(target).id()],
        format_args!(
            "Delete {value}: rebuild the tree by inserting the {} remaining keys in order",
            survivors.len()
        ),
    );

    let mut rebuilt = Tree::with_id_base(tree.next_id());
    for (key, id) in survivors {
        insert_node(&mut rebuilt, key, Some(id), sink);
    }

    let remaining = rebuilt.len();
    sink.push(&rebuilt, &[], format_args!("{value} deleted; the rebuilt tree holds {remaining} keys"));
    (rebuilt, Outcome::Deleted { remaining })
}

/// Update `old` to `new` on a copy of `tree`, reporting to `sink`.
pub fn update_with<K: Key, S: StepSink<Tree<K>>>(
    tree: &Tree<K>,
    old: &K,
    new: K,
    sink: &mut S,
) -> (Tree<K>, Outcome) {
    let (mut working, outcome) = delete_with(tree, old, sink);
    if outcome == Outcome::NotFound {
        return (working, outcome);
    }
    let outcome = match insert_node(&mut working, new, None, sink) {
        Outcome::Inserted { id } => Outcome::Updated { id, merged: false },
        Outcome::Duplicate { id } => Outcome::Updated { id, merged: true },
        other => other,
    };
    (working, outcome)
}

/// Build from `values` in place of an empty tree, reporting to `sink`.
pub fn build_with<K: Key, S: StepSink<Tree<K>>>(
    values: impl IntoIterator<Item = K>,
    sink: &mut S,
) -> (Tree<K>, Outcome) {
    let mut tree = Tree::new();
    let (mut inserted, mut duplicates) = (0, 0);
    for value in values {
        match insert_node(&mut tree, value, None, sink) {
            Outcome::Inserted { .. } => inserted += 1,
            Outcome::Duplicate { .. } => duplicates += 1,
            _ => {}
        }
    }
    (tree, Outcome::Built { inserted, duplicates })
}

fn insert_node<K: Key, S: StepSink<Tree<K>>>(
    tree: &mut Tree<K>,
    value: K,
    id: Option<NodeId>,
    sink: &mut S,
) -> Outcome {
    let Some(mut cursor) = tree.root() else {
        let slot = tree.alloc(value, Color::Black, None, id);
        tree.root = Some(slot);
        let node = tree.node(slot);
        sink.push(
            tree,
            &[node.id()],
            format_args!("The tree is empty: {} becomes the black root", node.value()),
        );
        return Outcome::Inserted { id: node.id() };
    };

    let (parent, side) = loop {
        let node = tree.node(cursor);
        let (next, side) = match value.cmp(node.value()) {
            Ordering::Less => (node.left(), Side::Left),
            Ordering::Greater => (node.right(), Side::Right),
            Ordering::Equal => {
                let existing = node.id();
                sink.push(tree, &[existing], format_args!("{value} is already in the tree; nothing changes"));
                return Outcome::Duplicate { id: existing };
            }
        };
        match next {
            Some(child) => cursor = child,
            None => break (cursor, side),
        }
    };

    let slot = tree.alloc(value, Color::Red, Some(parent), id);
    tree.set_child(parent, side, Some(slot));
    let new_id = tree.node(slot).id();
    sink.push(
        tree,
        &[new_id],
        format_args!(
            "Insert {} as a red leaf, {side} child of {}",
            tree.node(slot).value(),
            tree.node(parent).value()
        ),
    );

    fix_red_red(tree, slot, sink);

    if let Some(root) = tree.root() {
        tree.set_color(root, Color::Black);
        let root_node = tree.node(root);
        sink.push(
            tree,
            &[root_node.id()],
            format_args!(
                "Root {} is black; insertion of {} complete",
                root_node.value(),
                tree.node(slot).value()
            ),
        );
    }
    Outcome::Inserted { id: new_id }
}

/// Restore the red-black properties after `x` was attached as a red leaf.
fn fix_red_red<K: Key, S: StepSink<Tree<K>>>(tree: &mut Tree<K>, mut x: Slot, sink: &mut S) {
    loop {
        let Some(mut p) = tree.node(x).parent() else { break };
        if tree.node(p).color().is_black() {
            break;
        }
        let Some(g) = tree.node(p).parent() else { break };

        let parent_side = tree.child_side(g, p);
        let uncle = tree
            .node(g)
            .child(parent_side.opposite())
            .filter(|&u| tree.node(u).color().is_red());

        if let Some(u) = uncle {
            tree.set_color(p, Color::Black);
            tree.set_color(u, Color::Black);
            tree.set_color(g, Color::Red);
            sink.push(
                tree,
                &[tree.node(p).id(), tree.node(u).id(), tree.node(g).id()],
                format_args!(
                    "Parent {} and uncle {} are both red: recolor them black and grandparent {} red",
                    tree.node(p).value(),
                    tree.node(u).value(),
                    tree.node(g).value()
                ),
            );
            x = g;
            continue;
        }

        if tree.child_side(p, x) != parent_side {
            tree.rotate_attached(p, parent_side);
            sink.push(
                tree,
                &[tree.node(x).id(), tree.node(p).id()],
                format_args!(
                    "{} and its parent {} form a triangle: rotate {parent_side} at {} to line them up",
                    tree.node(x).value(),
                    tree.node(p).value(),
                    tree.node(p).value()
                ),
            );
            std::mem::swap(&mut x, &mut p);
        }

        let direction = parent_side.opposite();
        tree.rotate_attached(g, direction);
        tree.set_color(p, Color::Black);
        tree.set_color(x, Color::Red);
        tree.set_color(g, Color::Red);
        sink.push(
            tree,
            &[tree.node(p).id(), tree.node(x).id(), tree.node(g).id()],
            format_args!(
                "{}, {} and {} lie in a straight line: rotate {direction} at {}; {} becomes black with red children",
                tree.node(x).value(),
                tree.node(p).value(),
                tree.node(g).value(),
                tree.node(g).value(),
                tree.node(p).value()
            ),
        );
        break;
    }
}

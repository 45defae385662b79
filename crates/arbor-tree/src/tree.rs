//! Arena-backed red-black tree with rotation primitives and snapshots.

use std::cmp::Ordering;
use std::ops::Deref;

use crate::error::{InvariantViolation, Result};
use crate::node::{Color, Node, NodeId, Side, Slot};
use crate::step::Capture;

/// A binary search tree whose nodes live in an arena.
///
/// Every arena entry is reachable from `root`; nodes are only ever added,
/// never detached, so slots stay valid for the lifetime of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tree<K> {
    pub(crate) nodes: Vec<Node<K>>,
    pub(crate) root: Option<Slot>,
    pub(crate) next_id: u64,
}

impl<K> Default for Tree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Tree<K> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::with_id_base(0)
    }

    /// Empty tree whose fresh node ids start at `next_id`.
    pub(crate) fn with_id_base(next_id: u64) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            next_id,
        }
    }

    /// Root slot, if any.
    pub fn root(&self) -> Option<Slot> {
        self.root
    }

    /// Root node, if any.
    pub fn root_node(&self) -> Option<&Node<K>> {
        self.root.map(|r| &self.nodes[r])
    }

    /// Node at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` was not obtained from this tree.
    pub fn node(&self, slot: Slot) -> &Node<K> {
        &self.nodes[slot]
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Id the next created node will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Slot of the node carrying `id`.
    pub fn slot_of(&self, id: NodeId) -> Option<Slot> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Allocate a node. Reuses `id` when given, otherwise hands out a fresh one.
    pub(crate) fn alloc(&mut self, value: K, color: Color, parent: Option<Slot>, id: Option<NodeId>) -> Slot {
        let id = match id {
            Some(id) => {
                self.next_id = self.next_id.max(id.0 + 1);
                id
            }
            None => {
                let id = NodeId(self.next_id);
                self.next_id += 1;
                id
            }
        };
        self.nodes.push(Node::new(value, color, id, parent));
        self.nodes.len() - 1
    }

    pub(crate) fn set_color(&mut self, slot: Slot, color: Color) {
        self.nodes[slot].color = color;
    }

    pub(crate) fn set_child(&mut self, parent: Slot, side: Side, child: Option<Slot>) {
        match side {
            Side::Left => self.nodes[parent].left = child,
            Side::Right => self.nodes[parent].right = child,
        }
    }

    /// Which side of `parent` the node `child` hangs on.
    pub fn child_side(&self, parent: Slot, child: Slot) -> Side {
        if self.nodes[parent].left == Some(child) {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(Slot, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((slot, depth)) = stack.pop() {
            height = height.max(depth);
            let node = &self.nodes[slot];
            stack.extend(node.left.map(|l| (l, depth + 1)));
            stack.extend(node.right.map(|r| (r, depth + 1)));
        }
        height
    }

    /// Slots in ascending key order.
    pub fn inorder_slots(&self) -> Vec<Slot> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut cursor = self.root;
        loop {
            while let Some(slot) = cursor {
                stack.push(slot);
                cursor = self.nodes[slot].left;
            }
            let Some(slot) = stack.pop() else { break };
            out.push(slot);
            cursor = self.nodes[slot].right;
        }
        out
    }

    /// Rotate left around `x`.
    ///
    /// `x.right` moves up and becomes the local subtree root, which is
    /// returned. Only the links among `x`, `x.right` and `x.right.left`
    /// change; the new root's parent is set to `x`'s former parent, but
    /// that parent's child link is left for the caller to re-attach (see
    /// [`Tree::replace_child`]). Without a right child nothing moves and
    /// `x` is returned.
    pub fn rotate_left(&mut self, x: Slot) -> Slot {
        let Some(y) = self.nodes[x].right else {
            return x;
        };
        let inner = self.nodes[y].left;
        self.nodes[x].right = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(x);
        }
        self.nodes[y].parent = self.nodes[x].parent;
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
        y
    }

    /// Mirror of [`Tree::rotate_left`]; `y.left` moves up.
    pub fn rotate_right(&mut self, y: Slot) -> Slot {
        let Some(x) = self.nodes[y].left else {
            return y;
        };
        let inner = self.nodes[x].right;
        self.nodes[y].left = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(y);
        }
        self.nodes[x].parent = self.nodes[y].parent;
        self.nodes[x].right = Some(y);
        self.nodes[y].parent = Some(x);
        x
    }

    /// Point `parent`'s link that used to hold `old` at `new` (or the root
    /// when `parent` is `None`) and fix `new`'s back-reference.
    pub fn replace_child(&mut self, parent: Option<Slot>, old: Slot, new: Slot) {
        match parent {
            None => self.root = Some(new),
            Some(p) => {
                let side = self.child_side(p, old);
                self.set_child(p, side, Some(new));
            }
        }
        self.nodes[new].parent = parent;
    }

    /// Rotate at `slot` in direction `side` and re-attach the result.
    pub(crate) fn rotate_attached(&mut self, slot: Slot, side: Side) -> Slot {
        let parent = self.nodes[slot].parent;
        let top = match side {
            Side::Left => self.rotate_left(slot),
            Side::Right => self.rotate_right(slot),
        };
        self.replace_child(parent, slot, top);
        top
    }

    /// Walk from the root checking invariant 5 (parent links) and that the
    /// arena holds no stray entries. Returns slots in pre-order.
    fn walk_links(&self) -> Result<Vec<Slot>> {
        let total = self.nodes.len();
        let mut order = Vec::with_capacity(total);
        let mut stack: Vec<(Slot, Option<Slot>)> = self.root.map(|r| (r, None)).into_iter().collect();
        while let Some((slot, expected_parent)) = stack.pop() {
            let node = &self.nodes[slot];
            if node.parent != expected_parent || order.len() >= total {
                return Err(InvariantViolation::ParentLink { node: node.id });
            }
            order.push(slot);
            stack.extend(node.right.map(|r| (r, Some(slot))));
            stack.extend(node.left.map(|l| (l, Some(slot))));
        }
        if order.len() != total {
            return Err(InvariantViolation::Unreachable { reachable: order.len(), total });
        }
        Ok(order)
    }
}

impl<K: Ord> Tree<K> {
    /// Slot holding `value`.
    pub fn find(&self, value: &K) -> Option<Slot> {
        let mut cursor = self.root;
        while let Some(slot) = cursor {
            let node = &self.nodes[slot];
            cursor = match value.cmp(&node.value) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(slot),
            };
        }
        None
    }

    /// True if `value` is stored in the tree.
    pub fn contains(&self, value: &K) -> bool {
        self.find(value).is_some()
    }

    /// Check the invariants that hold at every recorded step, even in the
    /// middle of a fix-up: BST order and consistent parent links.
    pub fn check_structure(&self) -> Result<()> {
        self.walk_links()?;
        let order = self.inorder_slots();
        for pair in order.windows(2) {
            let (prev, next) = (&self.nodes[pair[0]], &self.nodes[pair[1]]);
            if prev.value >= next.value {
                return Err(InvariantViolation::Unordered { node: next.id });
            }
        }
        Ok(())
    }

    /// Check all five red-black invariants of a committed tree.
    ///
    /// Returns the black height (black nodes on any root-to-leaf path).
    pub fn check_invariants(&self) -> Result<usize> {
        self.check_structure()?;
        if let Some(root) = self.root_node() {
            if root.color.is_red() {
                return Err(InvariantViolation::RedRoot { root: root.id });
            }
        }
        self.black_height()
    }

    /// Black nodes on every root-to-leaf path, counting the root.
    ///
    /// Fails if two paths disagree or a red node has a red child.
    pub fn black_height(&self) -> Result<usize> {
        self.black_height_below(self.root)
    }

    fn black_height_below(&self, slot: Option<Slot>) -> Result<usize> {
        let Some(slot) = slot else { return Ok(0) };
        let node = &self.nodes[slot];
        if node.color.is_red() {
            for child in [node.left, node.right].into_iter().flatten() {
                let child = &self.nodes[child];
                if child.color.is_red() {
                    return Err(InvariantViolation::RedRed { parent: node.id, child: child.id });
                }
            }
        }
        let left = self.black_height_below(node.left)?;
        let right = self.black_height_below(node.right)?;
        if left != right {
            return Err(InvariantViolation::BlackHeight { node: node.id, left, right });
        }
        Ok(left + usize::from(node.color.is_black()))
    }
}

impl<K: Clone> Tree<K> {
    /// Keys in ascending order.
    pub fn inorder(&self) -> Vec<K> {
        self.inorder_slots().into_iter().map(|s| self.nodes[s].value.clone()).collect()
    }

    /// Keys in ascending order paired with the ids of their nodes.
    pub fn inorder_entries(&self) -> Vec<(K, NodeId)> {
        self.inorder_slots()
            .into_iter()
            .map(|s| (self.nodes[s].value.clone(), self.nodes[s].id))
            .collect()
    }

    /// Deep copy that keeps ids and colors, renumbers slots in pre-order and
    /// rebuilds every parent link from the child links.
    pub fn clone_tree(&self) -> Self {
        let mut out = Self::with_id_base(self.next_id);
        out.nodes.reserve(self.nodes.len());
        let mut stack: Vec<(Slot, Option<(Slot, Side)>)> = self.root.map(|r| (r, None)).into_iter().collect();
        while let Some((source, attach)) = stack.pop() {
            let node = &self.nodes[source];
            let parent = attach.map(|(p, _)| p);
            let slot = out.nodes.len();
            out.nodes.push(Node::new(node.value.clone(), node.color, node.id, parent));
            match attach {
                None => out.root = Some(slot),
                Some((p, side)) => out.set_child(p, side, Some(slot)),
            }
            stack.extend(node.right.map(|r| (r, Some((slot, Side::Right)))));
            stack.extend(node.left.map(|l| (l, Some((slot, Side::Left)))));
        }
        out
    }

    /// Frozen deep copy of the tree as it is right now.
    pub fn snapshot(&self) -> Snapshot<K> {
        Snapshot(self.clone_tree())
    }
}

impl<K: Clone> Capture for Tree<K> {
    type Snapshot = Snapshot<K>;

    fn capture(&self) -> Snapshot<K> {
        self.snapshot()
    }
}

/// Immutable copy of a [`Tree`] taken at one instant.
///
/// Holds no links into any other tree, so later mutations elsewhere are
/// never observable through it. Read access goes through `Deref`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Snapshot<K>(Tree<K>);

impl<K> Default for Snapshot<K> {
    fn default() -> Self {
        Snapshot(Tree::new())
    }
}

impl<K> Deref for Snapshot<K> {
    type Target = Tree<K>;

    fn deref(&self) -> &Tree<K> {
        &self.0
    }
}

impl<K: Clone> Snapshot<K> {
    /// A mutable working copy of the frozen tree.
    pub fn to_tree(&self) -> Tree<K> {
        self.0.clone_tree()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::build_instant;

    #[test]
    fn empty_tree_basics() {
        let tree: Tree<i32> = Tree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.height(), 0);
        assert!(tree.inorder().is_empty());
        assert_eq!(tree.check_invariants(), Ok(0));
    }

    #[test]
    fn find_walks_by_order() {
        let tree = build_instant([40, 20, 60, 10, 30]);
        let slot = tree.find(&30).unwrap();
        assert_eq!(*tree.node(slot).value(), 30);
        assert!(tree.find(&35).is_none());
        assert!(tree.contains(&10));
    }

    #[test]
    fn rotate_left_preserves_order_and_ids() {
        let mut tree = build_instant([10, 20, 30]);
        let root = tree.root().unwrap();
        let ids_before: Vec<_> = tree.inorder_entries();

        let top = tree.rotate_left(root);
        tree.replace_child(None, root, top);

        assert_eq!(*tree.root_node().unwrap().value(), 30);
        assert_eq!(tree.inorder_entries(), ids_before);
        assert_eq!(tree.check_structure(), Ok(()));
    }

    #[test]
    fn rotate_right_moves_inner_subtree() {
        let mut tree = build_instant([40, 20, 60, 10, 30]);
        let root = tree.root().unwrap();

        let top = tree.rotate_right(root);
        tree.replace_child(None, root, top);

        let top_node = tree.node(top);
        assert_eq!(*top_node.value(), 20);
        let old_root = top_node.right().unwrap();
        assert_eq!(*tree.node(old_root).value(), 40);
        let inner = tree.node(old_root).left().unwrap();
        assert_eq!(*tree.node(inner).value(), 30);
        assert_eq!(tree.node(inner).parent(), Some(old_root));
        assert_eq!(tree.check_structure(), Ok(()));
    }

    #[test]
    fn rotation_without_pivot_is_noop() {
        let mut tree = build_instant([5]);
        let root = tree.root().unwrap();
        let before = tree.clone();
        assert_eq!(tree.rotate_left(root), root);
        assert_eq!(tree.rotate_right(root), root);
        assert_eq!(tree, before);
    }

    #[test]
    fn rotation_below_root_needs_reattach() {
        let mut tree = build_instant([50, 30, 70, 60, 80]);
        let right = tree.find(&70).unwrap();
        let parent = tree.node(right).parent();

        let top = tree.rotate_right(right);
        // Until re-attached the old parent still points at 70.
        assert!(tree.check_structure().is_err());
        tree.replace_child(parent, right, top);

        assert_eq!(tree.check_structure(), Ok(()));
        assert_eq!(tree.inorder(), vec![30, 50, 60, 70, 80]);
    }

    #[test]
    fn clone_tree_rebuilds_parents_and_compacts() {
        let tree = build_instant([8, 4, 12, 2, 6, 10, 14, 1]);
        let copy = tree.clone_tree();

        assert_eq!(copy.root(), Some(0));
        assert_eq!(copy.inorder_entries(), tree.inorder_entries());
        assert_eq!(copy.check_invariants(), tree.check_invariants());
        assert_eq!(copy.next_id(), tree.next_id());
        for slot in copy.inorder_slots() {
            let id = copy.node(slot).id();
            let original = tree.node(tree.slot_of(id).unwrap());
            assert_eq!(copy.node(slot).color(), original.color());
        }
    }

    #[test]
    fn snapshot_is_independent() {
        let mut tree = build_instant([2, 1, 3]);
        let snap = tree.snapshot();
        let root = tree.root().unwrap();
        tree.set_color(root, Color::Red);

        assert!(snap.root_node().unwrap().color().is_black());
        assert_eq!(snap.to_tree().inorder(), vec![1, 2, 3]);
    }

    #[test]
    fn detects_red_root() {
        let mut tree = build_instant([1]);
        let root = tree.root().unwrap();
        tree.set_color(root, Color::Red);
        assert!(matches!(tree.check_invariants(), Err(InvariantViolation::RedRoot { .. })));
    }

    #[test]
    fn black_height_ignores_root_color() {
        let empty: Tree<i32> = Tree::new();
        assert_eq!(empty.black_height(), Ok(0));

        assert_eq!(build_instant([2, 1, 3]).black_height(), Ok(1));

        let mut tree = build_instant([1]);
        let root = tree.root().unwrap();
        tree.set_color(root, Color::Red);
        assert_eq!(tree.black_height(), Ok(0));
        assert!(tree.check_invariants().is_err());

        let tree = build_instant(1..=31);
        assert_eq!(tree.black_height(), tree.check_invariants());
    }

    #[test]
    fn detects_red_red() {
        let mut tree = build_instant([2, 1, 3]);
        let left = tree.find(&1).unwrap();
        let right = tree.find(&3).unwrap();
        tree.set_color(left, Color::Red);
        tree.set_color(right, Color::Black);
        let root = tree.root().unwrap();
        tree.set_color(root, Color::Black);
        // 1 red, 3 black: black heights differ
        assert!(matches!(tree.check_invariants(), Err(InvariantViolation::BlackHeight { .. })));

        let mut tree = build_instant([10, 5, 15, 1]);
        let five = tree.find(&5).unwrap();
        tree.set_color(five, Color::Red);
        let fifteen = tree.find(&15).unwrap();
        tree.set_color(fifteen, Color::Red);
        assert!(matches!(tree.check_invariants(), Err(InvariantViolation::RedRed { .. })));
    }

    #[test]
    fn detects_disorder() {
        let mut tree = build_instant([2, 1, 3]);
        let left = tree.find(&1).unwrap();
        tree.nodes[left].value = 9;
        assert!(matches!(tree.check_structure(), Err(InvariantViolation::Unordered { .. })));
    }

    #[test]
    fn detects_stale_parent() {
        let mut tree = build_instant([2, 1, 3]);
        let left = tree.find(&1).unwrap();
        let right = tree.find(&3).unwrap();
        tree.nodes[left].parent = Some(right);
        assert!(matches!(tree.check_structure(), Err(InvariantViolation::ParentLink { .. })));
    }

    #[test]
    fn height_counts_levels() {
        let tree = build_instant(1..=7);
        assert_eq!(tree.len(), 7);
        assert!(tree.height() <= 4);
    }
}

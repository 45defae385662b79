//! Tree nodes, colors and stable node identifiers.

use std::fmt;

/// Index of a node inside the arena of the [`Tree`](crate::Tree) that owns it.
///
/// Slots are only meaningful for the tree (or snapshot) they were obtained
/// from; a snapshot renumbers its slots.
pub type Slot = usize;

/// Balance color of a red-black node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Color {
    /// Red node
    Red,
    /// Black node
    Black,
}

impl Color {
    /// True for [`Color::Red`].
    pub const fn is_red(self) -> bool {
        matches!(self, Color::Red)
    }

    /// True for [`Color::Black`].
    pub const fn is_black(self) -> bool {
        matches!(self, Color::Black)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => f.write_str("red"),
            Color::Black => f.write_str("black"),
        }
    }
}

/// Opaque identifier assigned once when a node is created.
///
/// Survives rotations, recolors and snapshots. Used for highlighting and
/// visual continuity only, never for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which child of its parent a node is. Also names a rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Side {
    /// Left child / left rotation
    Left,
    /// Right child / right rotation
    Right,
}

impl Side {
    /// The mirrored side.
    pub const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// A single red-black node.
///
/// `left` and `right` are the owning links; `parent` is a back-reference
/// kept in sync with them and rebuilt whenever a snapshot is taken.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node<K> {
    pub(crate) value: K,
    pub(crate) color: Color,
    pub(crate) id: NodeId,
    pub(crate) left: Option<Slot>,
    pub(crate) right: Option<Slot>,
    pub(crate) parent: Option<Slot>,
}

impl<K> Node<K> {
    pub(crate) fn new(value: K, color: Color, id: NodeId, parent: Option<Slot>) -> Self {
        Self {
            value,
            color,
            id,
            left: None,
            right: None,
            parent,
        }
    }

    /// The key stored in this node.
    pub fn value(&self) -> &K {
        &self.value
    }

    /// Current color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Stable identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Left child slot.
    pub fn left(&self) -> Option<Slot> {
        self.left
    }

    /// Right child slot.
    pub fn right(&self) -> Option<Slot> {
        self.right
    }

    /// Parent slot (`None` for the root).
    pub fn parent(&self) -> Option<Slot> {
        self.parent
    }

    /// Child on the given side.
    pub fn child(&self, side: Side) -> Option<Slot> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

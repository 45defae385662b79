//! Frames as the frontend draws them.

use std::collections::BTreeSet;

use arbor_tree::{layout, Layout, LayoutOptions, NodeId};
use serde::Serialize;

use crate::playback::PlaybackState;
use crate::session::TreeFrame;

/// A frame with its tree already laid out.
#[derive(Debug, Clone, Serialize)]
pub struct FrameView<K> {
    pub step_index: Option<usize>,
    pub total_steps: usize,
    pub state: PlaybackState,
    pub explanation: String,
    pub highlight: BTreeSet<NodeId>,
    /// Empty when nothing is applied
    pub layout: Layout<K>,
    /// In-order keys of the shown tree
    pub keys: Vec<K>,
}

impl<K: Clone> FrameView<K> {
    pub fn new(frame: &TreeFrame<K>, options: &LayoutOptions) -> Self {
        let (layout, keys) = match &frame.current {
            Some(snapshot) => (layout(snapshot, options), snapshot.inorder()),
            None => (Layout::default(), Vec::new()),
        };
        Self {
            step_index: frame.step_index,
            total_steps: frame.total_steps,
            state: frame.state,
            explanation: frame.explanation.clone(),
            highlight: frame.highlight.clone(),
            layout,
            keys,
        }
    }
}

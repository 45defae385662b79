//! Command facade tying the tree engine to the player.
//!
//! The session owns the committed tree (the result of the last finished
//! operation) and the player showing how it got there. Every tree command
//! stops current playback first, runs the operation against the committed
//! tree, commits the result and loads the recorded steps.

use std::time::Duration;

use arbor_tree::{ops, Key, Outcome, Run, Snapshot, Step, Tree};
use tracing::{debug, info};

use crate::error::Result;
use crate::playback::{Frame, Playable, Playback, PlaybackStatus};

/// Frame of a tree session.
pub type TreeFrame<K> = Frame<Snapshot<K>>;

/// A committed tree plus the playback of its latest operation.
#[derive(Debug)]
pub struct Session<K> {
    committed: Tree<K>,
    playback: Playback<Snapshot<K>>,
    last_outcome: Option<Outcome>,
}

impl<K: Key> Default for Session<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key> Session<K> {
    pub fn new() -> Self {
        Self {
            committed: Tree::new(),
            playback: Playback::new(),
            last_outcome: None,
        }
    }

    /// The tree as of the last finished operation.
    pub fn committed(&self) -> &Tree<K> {
        &self.committed
    }

    /// In-order keys of the committed tree.
    pub fn keys(&self) -> Vec<K> {
        self.committed.inorder()
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    pub fn playback(&self) -> &Playback<Snapshot<K>> {
        &self.playback
    }

    /// Insert `value` and load the recorded steps.
    pub fn insert(&mut self, value: K) -> Outcome {
        info!(%value, "insert");
        self.playback.stop();
        let run = ops::insert(&self.committed, value);
        self.commit(run)
    }

    /// Delete `value` and load the recorded steps.
    pub fn delete(&mut self, value: &K) -> Outcome {
        info!(%value, "delete");
        self.playback.stop();
        let run = ops::delete(&self.committed, value);
        self.commit(run)
    }

    /// Replace `old` with `new` and load the recorded steps.
    pub fn update(&mut self, old: &K, new: K) -> Outcome {
        info!(%old, %new, "update");
        self.playback.stop();
        let run = ops::update(&self.committed, old, new);
        self.commit(run)
    }

    /// Replace the committed tree with one built from `values`, recording
    /// every insert.
    pub fn build_animated(&mut self, values: Vec<K>) -> Outcome {
        info!(count = values.len(), "build animated");
        self.playback.stop();
        let run = ops::build(values);
        self.commit(run)
    }

    /// Replace the committed tree with one built from `values` without
    /// recording. The player shows the finished tree as a single step.
    pub fn load_instant(&mut self, values: Vec<K>) -> Outcome {
        info!(count = values.len(), "load instant");
        self.playback.stop();
        let before = values.len();
        let tree = ops::build_instant(values);
        let outcome = Outcome::Built {
            inserted: tree.len(),
            duplicates: before - tree.len(),
        };
        let step = Step {
            snapshot: tree.snapshot(),
            highlight: Default::default(),
            explanation: format!("Loaded {} keys", tree.len()),
        };
        self.committed = tree;
        self.playback.load_settled(vec![step]);
        self.last_outcome = Some(outcome);
        outcome
    }

    /// Start automatic playback. Returns the generation a ticker must carry.
    pub fn play(&mut self, interval: Duration) -> u64 {
        self.playback.play(interval)
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn step_forward(&mut self) -> Result<()> {
        self.playback.step_forward().map(|_| ())
    }

    pub fn step_back(&mut self) -> Result<()> {
        self.playback.step_back().map(|_| ())
    }

    pub fn seek(&mut self, index: usize) -> Result<()> {
        self.playback.seek(index).map(|_| ())
    }

    /// Stop playback and clear the loaded steps. The committed tree stays.
    pub fn stop(&mut self) {
        self.playback.stop();
    }

    pub fn frame(&self) -> TreeFrame<K> {
        self.playback.frame()
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus::from(&self.playback)
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TreeFrame<K>> {
        self.playback.subscribe()
    }

    fn commit(&mut self, run: Run<K>) -> Outcome {
        let Run { tree, steps, outcome } = run;
        debug!(?outcome, steps = steps.len(), "loading recorded steps");
        self.committed = tree;
        self.playback.load_steps(steps);
        self.last_outcome = Some(outcome);
        outcome
    }
}

impl<K: Key> Playable for Session<K> {
    type Snapshot = Snapshot<K>;

    fn playback_mut(&mut self) -> &mut Playback<Snapshot<K>> {
        &mut self.playback
    }
}

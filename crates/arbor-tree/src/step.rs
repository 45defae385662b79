//! Step recording.
//!
//! Algorithms report progress to a [`StepSink`] at every semantically
//! meaningful boundary (node created, recolor group, rotation, operation
//! complete). A [`Recorder`] captures a frozen snapshot of the state for
//! each report; [`Discard`] ignores them so the same algorithm can run
//! without recording.

use std::collections::BTreeSet;
use std::fmt;

use crate::NodeId;

/// State that can be frozen into an independent snapshot.
pub trait Capture {
    /// Frozen copy type.
    type Snapshot: Clone;

    /// Take a deep copy that shares nothing mutable with `self`.
    fn capture(&self) -> Self::Snapshot;
}

/// One recorded instant of an algorithm run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step<S> {
    /// Frozen state after the change this step explains
    pub snapshot: S,
    /// Nodes relevant to this step
    pub highlight: BTreeSet<NodeId>,
    /// Human-readable explanation
    pub explanation: String,
}

/// Receiver of progress reports from an algorithm.
pub trait StepSink<T: Capture> {
    /// Report that `state` has reached a meaningful boundary.
    fn push(&mut self, state: &T, highlight: &[NodeId], explanation: fmt::Arguments<'_>);
}

/// Sink that keeps a snapshot of every reported state.
#[derive(Debug, Clone)]
pub struct Recorder<S> {
    steps: Vec<Step<S>>,
}

impl<S> Default for Recorder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Recorder<S> {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Most recent step.
    pub fn last(&self) -> Option<&Step<S>> {
        self.steps.last()
    }

    /// Consume the recorder, yielding its steps.
    pub fn into_steps(self) -> Vec<Step<S>> {
        self.steps
    }
}

impl<S: Clone> Recorder<S> {
    /// Copy of every step recorded so far.
    pub fn steps(&self) -> Vec<Step<S>> {
        self.steps.clone()
    }
}

impl<T: Capture> StepSink<T> for Recorder<T::Snapshot> {
    fn push(&mut self, state: &T, highlight: &[NodeId], explanation: fmt::Arguments<'_>) {
        let step = Step {
            snapshot: state.capture(),
            highlight: highlight.iter().copied().collect(),
            explanation: explanation.to_string(),
        };
        tracing::trace!(index = self.steps.len(), explanation = %step.explanation, "recorded step");
        self.steps.push(step);
    }
}

/// Sink that drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl<T: Capture> StepSink<T> for Discard {
    fn push(&mut self, _state: &T, _highlight: &[NodeId], _explanation: fmt::Arguments<'_>) {}
}

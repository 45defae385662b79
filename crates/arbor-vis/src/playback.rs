//! Playback controls for recorded step sequences.
//!
//! A [`Playback`] owns one `Step[]` and a single authoritative current
//! index. The "current tree" is always exactly the snapshot of the step at
//! that index, never an interpolation. Automatic advance is cooperative:
//! [`drive`] ticks the player on a timer and stops as soon as the player is
//! paused, stopped or reloaded.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arbor_tree::{NodeId, Step};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use crate::error::{Error, Result};

/// Frames buffered per observer before it starts lagging.
const OBSERVER_CAPACITY: usize = 1024;

/// Playback speed presets relative to a base interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackSpeed {
    /// 0.25x speed
    QuarterSpeed,
    /// 0.5x speed
    HalfSpeed,
    /// Normal speed (1x)
    Normal,
    /// 2x speed
    Double,
    /// 4x speed
    Quadruple,
    /// 10x speed
    TenX,
    /// One step per millisecond
    Maximum,
}

impl PlaybackSpeed {
    /// Interval between steps at this speed, never shorter than 1ms.
    pub fn interval(&self, base: Duration) -> Duration {
        let scaled = match self {
            PlaybackSpeed::QuarterSpeed => base * 4,
            PlaybackSpeed::HalfSpeed => base * 2,
            PlaybackSpeed::Normal => base,
            PlaybackSpeed::Double => base / 2,
            PlaybackSpeed::Quadruple => base / 4,
            PlaybackSpeed::TenX => base / 10,
            PlaybackSpeed::Maximum => Duration::ZERO,
        };
        scaled.max(Duration::from_millis(1))
    }
}

/// Current state of playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing scheduled; either nothing loaded, nothing applied yet, or the last step reached
    Idle,
    /// Advancing one step per interval
    Playing,
    /// Automatic advance suspended
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => f.write_str("idle"),
            PlaybackState::Playing => f.write_str("playing"),
            PlaybackState::Paused => f.write_str("paused"),
        }
    }
}

/// What observers see after every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame<S> {
    /// Snapshot of the applied step, `None` before the first step or after stop
    pub current: Option<S>,
    pub highlight: BTreeSet<NodeId>,
    pub explanation: String,
    /// Index of the applied step
    pub step_index: Option<usize>,
    pub total_steps: usize,
    pub state: PlaybackState,
}

/// Playback controller for a recorded step sequence.
#[derive(Debug)]
pub struct Playback<S> {
    steps: Vec<Step<S>>,
    current: Option<usize>,
    state: PlaybackState,
    interval: Duration,
    generation: u64,
    observers: broadcast::Sender<Frame<S>>,
}

impl<S: Clone> Default for Playback<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone> Playback<S> {
    /// Create an empty playback controller.
    pub fn new() -> Self {
        let (observers, _) = broadcast::channel(OBSERVER_CAPACITY);
        Self {
            steps: Vec::new(),
            current: None,
            state: PlaybackState::Idle,
            interval: Duration::from_millis(700),
            generation: 0,
            observers,
        }
    }

    /// Receive a [`Frame`] on every state change.
    pub fn subscribe(&self) -> broadcast::Receiver<Frame<S>> {
        self.observers.subscribe()
    }

    /// Index of the applied step, `None` if nothing has been applied.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Get the total number of steps.
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Get the current playback state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Interval of the most recent `play`.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Bumped by every load, play and stop. A timer that started under an
    /// older generation must not advance the player any more.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The applied step.
    pub fn current_step(&self) -> Option<&Step<S>> {
        self.current.and_then(|i| self.steps.get(i))
    }

    /// All loaded steps.
    pub fn steps(&self) -> &[Step<S>] {
        &self.steps
    }

    /// Replace the sequence. Nothing is applied until the first advance.
    pub fn load_steps(&mut self, steps: Vec<Step<S>>) {
        self.steps = steps;
        self.current = None;
        self.state = PlaybackState::Idle;
        self.generation += 1;
        self.notify();
    }

    /// Replace the sequence and apply its last step right away.
    pub fn load_settled(&mut self, steps: Vec<Step<S>>) {
        self.steps = steps;
        self.current = self.steps.len().checked_sub(1);
        self.state = PlaybackState::Idle;
        self.generation += 1;
        self.notify();
    }

    /// Start advancing one step per `interval`. Returns the generation the
    /// timer must carry.
    ///
    /// With nothing loaded the player stays idle. When the last step is
    /// already applied, playback restarts from the beginning.
    pub fn play(&mut self, interval: Duration) -> u64 {
        self.generation += 1;
        self.interval = interval;
        if self.steps.is_empty() {
            self.state = PlaybackState::Idle;
        } else {
            if self.is_at_end() {
                self.current = None;
            }
            self.state = PlaybackState::Playing;
        }
        tracing::debug!(generation = self.generation, ?interval, state = %self.state, "play");
        self.notify();
        self.generation
    }

    /// Pause playback.
    pub fn pause(&mut self) {
        self.state = PlaybackState::Paused;
        self.notify();
    }

    /// Clear the sequence and return to an empty idle player.
    pub fn stop(&mut self) {
        self.steps.clear();
        self.current = None;
        self.state = PlaybackState::Idle;
        self.generation += 1;
        self.notify();
    }

    /// Advance by one step while playing. Returns `true` if a step was
    /// applied; reaching the last step switches back to idle.
    pub fn tick(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        let next = self.current.map_or(0, |i| i + 1);
        if next >= self.steps.len() {
            self.state = PlaybackState::Idle;
            self.notify();
            return false;
        }
        self.current = Some(next);
        if next + 1 == self.steps.len() {
            self.state = PlaybackState::Idle;
        }
        self.notify();
        true
    }

    /// Apply the next step (clamped to the last one).
    pub fn step_forward(&mut self) -> Result<Option<&Step<S>>> {
        self.ensure_not_playing()?;
        let target = self.current.map_or(0, |i| i + 1);
        Ok(self.apply(target))
    }

    /// Apply the previous step (clamped to the first one).
    pub fn step_back(&mut self) -> Result<Option<&Step<S>>> {
        self.ensure_not_playing()?;
        let target = self.current.map_or(0, |i| i.saturating_sub(1));
        Ok(self.apply(target))
    }

    /// Apply the step at `index` (clamped).
    pub fn seek(&mut self, index: usize) -> Result<Option<&Step<S>>> {
        self.ensure_not_playing()?;
        Ok(self.apply(index))
    }

    /// Calculate progress as a fraction (0.0 - 1.0).
    pub fn progress(&self) -> f64 {
        match self.current {
            Some(i) if !self.steps.is_empty() => (i + 1) as f64 / self.steps.len() as f64,
            _ => 0.0,
        }
    }

    /// Build the frame observers would see now.
    pub fn frame(&self) -> Frame<S> {
        let step = self.current_step();
        Frame {
            current: step.map(|s| s.snapshot.clone()),
            highlight: step.map(|s| s.highlight.clone()).unwrap_or_default(),
            explanation: step.map(|s| s.explanation.clone()).unwrap_or_default(),
            step_index: self.current,
            total_steps: self.steps.len(),
            state: self.state,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current.is_some_and(|i| i + 1 >= self.steps.len())
    }

    fn apply(&mut self, index: usize) -> Option<&Step<S>> {
        let last = self.steps.len().checked_sub(1)?;
        self.current = Some(index.min(last));
        self.notify();
        self.current_step()
    }

    fn ensure_not_playing(&self) -> Result<()> {
        if self.state == PlaybackState::Playing {
            return Err(Error::InvalidState {
                expected: "idle or paused",
                actual: self.state,
            });
        }
        Ok(())
    }

    fn notify(&self) {
        if self.observers.receiver_count() > 0 {
            // Only fails when every receiver has been dropped in between.
            let _ = self.observers.send(self.frame());
        }
    }
}

/// Playback status for sending to frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub current_index: Option<usize>,
    pub total_steps: usize,
    pub state: PlaybackState,
    pub interval_ms: u64,
    pub progress: f64,
}

impl<S: Clone> From<&Playback<S>> for PlaybackStatus {
    fn from(playback: &Playback<S>) -> Self {
        Self {
            current_index: playback.current_index(),
            total_steps: playback.total_steps(),
            state: playback.state(),
            interval_ms: u64::try_from(playback.interval().as_millis()).unwrap_or(u64::MAX),
            progress: playback.progress(),
        }
    }
}

/// Anything that owns a [`Playback`] the timer can advance.
pub trait Playable {
    /// Snapshot type of the steps being played.
    type Snapshot: Clone;

    /// The player to tick.
    fn playback_mut(&mut self) -> &mut Playback<Self::Snapshot>;
}

impl<S: Clone> Playable for Playback<S> {
    type Snapshot = S;

    fn playback_mut(&mut self) -> &mut Playback<S> {
        self
    }
}

/// Advance the shared player once per `interval` until it leaves the
/// playing state or a newer generation takes over.
///
/// Each tick takes the write lock for exactly one step, so commands issued
/// in between (pause, stop, a new operation) take effect between steps.
pub async fn drive<T: Playable>(shared: Arc<RwLock<T>>, generation: u64, interval: Duration) {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    timer.tick().await;
    loop {
        timer.tick().await;
        let mut guard = shared.write().await;
        let playback = guard.playback_mut();
        if playback.generation() != generation {
            tracing::debug!(generation, current = playback.generation(), "playback superseded");
            break;
        }
        playback.tick();
        if playback.state() != PlaybackState::Playing {
            break;
        }
    }
}

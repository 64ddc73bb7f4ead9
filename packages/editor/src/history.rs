//! # Undo/Redo History
//!
//! Snapshot-based history over whole document states.
//!
//! ## Design
//!
//! - `record` either pushes a checkpoint or merges into the present entry
//! - Edits arriving within the debounce window merge, so a burst of typing
//!   undoes as one step; `immediate` edits always form their own checkpoint
//! - Any new edit clears the redo stack
//! - `past` is bounded; the oldest checkpoint is evicted first
//!
//! Snapshots are compared by identity, not content: recording the snapshot
//! that is already present is a no-op.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new(Arc::new(doc), HistoryConfig::default(), SystemClock::new());
//! history.record(Arc::new(edited), false);
//! history.undo();
//! history.redo();
//! ```

use crate::clock::Clock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Snapshot type the history can hold
pub trait Checkpoint: Clone {
    /// Whether two snapshots are the same value (not merely equal)
    fn is_same(&self, other: &Self) -> bool;
}

impl<T> Checkpoint for Arc<T> {
    fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    pub debounce: Duration,
    pub max_history: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(800),
            max_history: 100,
        }
    }
}

/// Exportable history stacks, e.g. cached per open chapter
#[derive(Debug, Clone)]
pub struct HistoryState<T> {
    /// Oldest first
    pub past: VecDeque<T>,
    pub present: T,
    /// Next redo first
    pub future: VecDeque<T>,
}

/// What `record` did with a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// Same snapshot as the present one
    Ignored,
    /// Previous present pushed as a checkpoint
    Checkpoint,
    /// Present replaced in place
    Merged,
}

pub struct History<T: Checkpoint, C: Clock> {
    state: HistoryState<T>,
    last_edit: Duration,
    config: HistoryConfig,
    clock: C,
}

impl<T: Checkpoint, C: Clock> History<T, C> {
    pub fn new(present: T, config: HistoryConfig, clock: C) -> Self {
        let last_edit = clock.now();
        Self {
            state: HistoryState {
                past: VecDeque::new(),
                present,
                future: VecDeque::new(),
            },
            last_edit,
            config,
            clock,
        }
    }

    pub fn record(&mut self, next: T, immediate: bool) -> Recorded {
        if next.is_same(&self.state.present) {
            return Recorded::Ignored;
        }

        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.last_edit);
        self.last_edit = now;
        self.state.future.clear();

        if immediate || elapsed > self.config.debounce {
            let previous = std::mem::replace(&mut self.state.present, next);
            self.push_past(previous);
            tracing::trace!(immediate, ?elapsed, "history checkpoint");
            Recorded::Checkpoint
        } else {
            self.state.present = next;
            tracing::trace!(?elapsed, "history merge");
            Recorded::Merged
        }
    }

    /// Step back one checkpoint; `false` when there is nothing to undo
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.state.past.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.state.present, previous);
        self.state.future.push_front(current);
        true
    }

    /// Step forward one checkpoint; `false` when there is nothing to redo
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.state.future.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.state.present, next);
        self.push_past(current);
        true
    }

    /// Checkpoint the present without changing it.
    ///
    /// Taken before a large programmatic edit; the edit's own `record` then
    /// merges into the fresh entry, so the whole edit undoes in one step.
    pub fn snapshot(&mut self) {
        let present = self.state.present.clone();
        self.push_past(present);
        self.last_edit = self.clock.now();
    }

    /// Start over with `present`; no history carries across
    pub fn reset(&mut self, present: T) {
        self.state = HistoryState {
            past: VecDeque::new(),
            present,
            future: VecDeque::new(),
        };
        self.last_edit = self.clock.now();
    }

    /// Reinstate previously exported stacks
    pub fn restore(&mut self, state: HistoryState<T>) {
        self.state = state;
        while self.state.past.len() > self.config.max_history {
            self.state.past.pop_front();
        }
        self.last_edit = self.clock.now();
    }

    pub fn present(&self) -> &T {
        &self.state.present
    }

    pub fn state(&self) -> &HistoryState<T> {
        &self.state
    }

    pub fn can_undo(&self) -> bool {
        !self.state.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.state.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.state.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.state.future.len()
    }

    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    fn push_past(&mut self, entry: T) {
        self.state.past.push_back(entry);
        while self.state.past.len() > self.config.max_history {
            self.state.past.pop_front();
        }
    }
}

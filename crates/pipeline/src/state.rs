//! Lifecycle of one pipeline run.

use std::fmt;

use billing_core::{Error, Result};
use tracing::debug;

/// Phase of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Extracting,
    Decoding,
    Chunking,
    Aggregating,
    Draining,
    Persisting,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether a run may move from `self` to `next`.
    ///
    /// A failed archive can abandon any phase, so `Extracting` (next entry
    /// or archive) and `Persisting` are reachable from every live state.
    /// `Decoding` may also fall back to `Extracting` when a file is skipped.
    pub fn can_transition(&self, next: RunState) -> bool {
        if self.is_terminal() {
            return false;
        }

        match next {
            Self::Idle => false,
            Self::Extracting | Self::Persisting | Self::Failed => true,
            Self::Decoding => *self == Self::Extracting,
            Self::Chunking => *self == Self::Decoding,
            Self::Aggregating => *self == Self::Chunking,
            Self::Draining => *self == Self::Aggregating,
            Self::Done => *self == Self::Persisting,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Decoding => "decoding",
            Self::Chunking => "chunking",
            Self::Aggregating => "aggregating",
            Self::Draining => "draining",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks and validates state transitions.
#[derive(Debug)]
pub struct RunStateMachine {
    state: RunState,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn transition(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition(next) {
            return Err(Error::internal(format!(
                "invalid run state transition {} -> {}",
                self.state, next
            )));
        }
        debug!(from = %self.state, to = %next, "Run state");
        self.state = next;
        Ok(())
    }

    /// Moves to `Failed` unless the run already ended.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            debug!(from = %self.state, "Run failed");
            self.state = RunState::Failed;
        }
    }
}

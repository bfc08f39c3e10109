/// Run state definitions for the pipeline coordinator
///
/// A run moves strictly forward through these states; `Done` and `Aborted`
/// are terminal.
use crate::IngestError;
use std::fmt;

/// Represents the lifecycle state of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Nothing read yet
    Idle,

    /// Header read and required columns located
    HeaderValidated,

    /// Workers running, rows being read and enqueued
    Streaming,

    /// Queue closed, waiting for outstanding jobs
    Draining,

    /// Every enqueued job finished
    Done,

    /// Run failed on malformed input or a read error
    Aborted,
}

impl RunState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::HeaderValidated)
                | (Self::Idle, Self::Aborted)
                | (Self::HeaderValidated, Self::Streaming)
                | (Self::Streaming, Self::Draining)
                | (Self::Draining, Self::Done)
                | (Self::Draining, Self::Aborted)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::HeaderValidated => "header_validated",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks the current state of a run and enforces legal transitions
#[derive(Debug)]
pub struct RunStateMachine {
    current: RunState,
    history: Vec<RunState>,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            current: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }

    pub fn current(&self) -> RunState {
        self.current
    }

    /// States visited so far, starting with `Idle`
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: RunState) -> Result<(), IngestError> {
        if !self.current.can_transition_to(next) {
            return Err(IngestError::InvalidTransition {
                from: self.current,
                to: next,
            });
        }

        tracing::debug!("Run state {} -> {}", self.current, next);
        self.current = next;
        self.history.push(next);
        Ok(())
    }
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

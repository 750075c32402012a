//! Conversation turn model.
//!
//! A turn's lifecycle is encoded in [`TurnPhase`]: assistant turns are born
//! `Streaming` and leave that phase exactly once, after which their content
//! is immutable. User turns are `Complete` from birth.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::TurnId;
use crate::proofs::NonEmptyString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Where a turn is in its lifecycle.
///
/// Transitions: `Streaming -> Complete | Failed | Cancelled`, each taken at
/// most once. There is no way back into `Streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnPhase {
    Streaming,
    Complete,
    Failed,
    Cancelled,
}

/// Returned when a second stream is started while one is active.
///
/// The pipeline is strictly one-active-stream-at-a-time; the store enforces
/// this in the API rather than trusting callers to disable their input.
#[derive(Debug, Error)]
#[error("a streaming turn is already active (id {active})")]
pub struct StreamActiveError {
    pub active: TurnId,
}

/// One message in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    id: TurnId,
    role: Role,
    content: String,
    timestamp: SystemTime,
    phase: TurnPhase,
}

impl ChatTurn {
    /// A user turn; complete from the moment it exists.
    #[must_use]
    pub fn user(id: TurnId, content: NonEmptyString, timestamp: SystemTime) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into_inner(),
            timestamp,
            phase: TurnPhase::Complete,
        }
    }

    /// An assistant turn that will be assembled incrementally.
    #[must_use]
    pub fn streaming_assistant(id: TurnId, timestamp: SystemTime) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            timestamp,
            phase: TurnPhase::Streaming,
        }
    }

    #[must_use]
    pub fn id(&self) -> TurnId {
        self.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.phase == TurnPhase::Streaming
    }

    /// Append a chunk to a streaming turn. Returns false (and leaves the turn
    /// untouched) once the turn has left `Streaming`.
    pub fn push_chunk(&mut self, chunk: &str) -> bool {
        if !self.is_streaming() {
            return false;
        }
        self.content.push_str(chunk);
        true
    }

    /// `Streaming -> Complete`. Returns false if the transition was already
    /// taken.
    pub fn finalize(&mut self) -> bool {
        self.transition(TurnPhase::Complete)
    }

    /// `Streaming -> Failed`, replacing content with the error text in the
    /// same step so no reader observes a failed turn with partial content.
    pub fn fail(&mut self, error_text: &str) -> bool {
        if !self.is_streaming() {
            return false;
        }
        self.content.clear();
        self.content.push_str(error_text);
        self.phase = TurnPhase::Failed;
        true
    }

    /// `Streaming -> Cancelled`. Partial content is kept.
    pub fn cancel(&mut self) -> bool {
        self.transition(TurnPhase::Cancelled)
    }

    fn transition(&mut self, next: TurnPhase) -> bool {
        if !self.is_streaming() {
            return false;
        }
        self.phase = next;
        true
    }
}

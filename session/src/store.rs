//! The conversation log.
//!
//! Turns are only appended or mutated in place; they are never reordered
//! and never removed except by [`MessageStore::reset`]. At most one turn is
//! streaming at a time, and it is always the most recently appended turn -
//! [`MessageStore::begin_assistant_turn`] enforces this in the API instead
//! of trusting the UI to disable its input.

use std::time::SystemTime;

use omnis_types::{ChatTurn, NonEmptyString, StreamActiveError, TurnId};

#[derive(Debug, Default)]
pub struct MessageStore {
    turns: Vec<ChatTurn>,
    next_id: u64,
    streaming: Option<TurnId>,
}

impl MessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> TurnId {
        let id = TurnId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a completed user turn.
    pub fn append_user_turn(&mut self, content: NonEmptyString) -> TurnId {
        let id = self.allocate_id();
        self.turns
            .push(ChatTurn::user(id, content, SystemTime::now()));
        id
    }

    /// Append an empty assistant turn in the streaming phase. Rejected while
    /// another turn is still streaming.
    pub fn begin_assistant_turn(&mut self) -> Result<TurnId, StreamActiveError> {
        if let Some(active) = self.streaming {
            return Err(StreamActiveError { active });
        }
        let id = self.allocate_id();
        self.turns
            .push(ChatTurn::streaming_assistant(id, SystemTime::now()));
        self.streaming = Some(id);
        Ok(id)
    }

    /// Append a chunk to the identified streaming turn. A stale id (reset
    /// raced the stream, or the turn already left its streaming phase) is a
    /// silent no-op; the assembler never errors the whole store over one.
    pub fn append_chunk(&mut self, id: TurnId, chunk: &str) {
        if let Some(turn) = self.turn_mut(id) {
            turn.push_chunk(chunk);
        }
    }

    /// `Streaming -> Complete`. Returns whether a transition happened.
    pub fn finalize(&mut self, id: TurnId) -> bool {
        self.terminal(id, ChatTurn::finalize)
    }

    /// `Streaming -> Failed`, replacing content with `error_text` in the
    /// same mutation.
    pub fn fail(&mut self, id: TurnId, error_text: &str) -> bool {
        self.terminal(id, |turn| turn.fail(error_text))
    }

    /// `Streaming -> Cancelled`, keeping partial content.
    pub fn cancel(&mut self, id: TurnId) -> bool {
        self.terminal(id, ChatTurn::cancel)
    }

    fn terminal(&mut self, id: TurnId, apply: impl FnOnce(&mut ChatTurn) -> bool) -> bool {
        let Some(turn) = self.turn_mut(id) else {
            return false;
        };
        let transitioned = apply(turn);
        if transitioned && self.streaming == Some(id) {
            self.streaming = None;
        }
        transitioned
    }

    /// Drop every turn. Ids are not reused afterwards, so mutations from a
    /// stream that outlived the reset land nowhere.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.streaming = None;
    }

    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    #[must_use]
    pub fn turn(&self, id: TurnId) -> Option<&ChatTurn> {
        self.turns.iter().find(|turn| turn.id() == id)
    }

    fn turn_mut(&mut self, id: TurnId) -> Option<&mut ChatTurn> {
        self.turns.iter_mut().find(|turn| turn.id() == id)
    }

    /// Id of the turn currently streaming, if any.
    #[must_use]
    pub fn streaming_turn(&self) -> Option<TurnId> {
        self.streaming
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }
}

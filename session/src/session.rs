//! The chat session: transport events in, store mutations and change
//! notifications out.

use std::collections::VecDeque;

use thiserror::Error;

use omnis_transport::{AgentRequest, Backend, StreamHandle};
use omnis_types::{
    ChatTurn, EmptyStringError, NonEmptyString, StreamActiveError, StreamEvent,
    StreamFinishReason, TriggerRule, TurnId,
};

use crate::STREAM_ERROR_TEXT;
use crate::store::MessageStore;
use crate::trigger::TriggerDetector;

/// Why [`ChatSession::send`] refused a message.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Empty(#[from] EmptyStringError),
    #[error(transparent)]
    StreamActive(#[from] StreamActiveError),
}

/// A store mutation observed by the presentation layer.
///
/// Emitted in mutation order. `TurnFinished` for a given stream always
/// precedes any `TriggerMatched` it unlocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// The streaming assistant turn grew by `text`.
    AssistantDelta { turn: TurnId, text: String },
    /// The assistant turn left its streaming phase.
    TurnFinished {
        turn: TurnId,
        reason: StreamFinishReason,
    },
    /// A user turn matched a trigger rule; the caller schedules the reveal
    /// after [`DASHBOARD_REVEAL_DELAY`](crate::DASHBOARD_REVEAL_DELAY).
    TriggerMatched { turn: TurnId, dashboard: String },
}

#[derive(Debug)]
struct ActiveTurn {
    turn: TurnId,
    handle: StreamHandle,
}

/// One conversation with the agent.
///
/// Single-threaded by construction: all store mutations happen on the task
/// that polls [`next_change`](Self::next_change) or
/// [`try_drain_changes`](Self::try_drain_changes), which serializes them in
/// event arrival order.
#[derive(Debug)]
pub struct ChatSession {
    store: MessageStore,
    detector: TriggerDetector,
    backend: Backend,
    user_id: String,
    execute: bool,
    active: Option<ActiveTurn>,
    pending: VecDeque<SessionChange>,
}

impl ChatSession {
    #[must_use]
    pub fn new(backend: Backend, rules: Vec<TriggerRule>, user_id: impl Into<String>) -> Self {
        Self {
            store: MessageStore::new(),
            detector: TriggerDetector::new(rules),
            backend,
            user_id: user_id.into(),
            execute: true,
            active: None,
            pending: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn with_execute(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    /// Submit a user message and start streaming the reply.
    ///
    /// Returns the id of the assistant turn being assembled. Rejected while
    /// a previous stream is active (no queueing) and for whitespace-only
    /// input.
    pub fn send(&mut self, text: &str) -> Result<TurnId, SendError> {
        if let Some(active) = &self.active {
            return Err(StreamActiveError { active: active.turn }.into());
        }

        let query = NonEmptyString::new(text.trim())?;
        let request = AgentRequest::new(&query, self.execute, self.user_id.clone());

        self.store.append_user_turn(query);
        let turn = self.store.begin_assistant_turn()?;
        let handle = self.backend.open(request);
        self.active = Some(ActiveTurn { turn, handle });

        tracing::debug!(%turn, "Stream started");
        Ok(turn)
    }

    /// Await the next change. Returns `None` when the session is idle with
    /// nothing queued.
    pub async fn next_change(&mut self) -> Option<SessionChange> {
        if let Some(change) = self.pending.pop_front() {
            return Some(change);
        }

        let active = self.active.as_mut()?;
        let turn = active.turn;
        let event = match active.handle.recv().await {
            Some(event) => event,
            None => {
                tracing::warn!(%turn, "Stream channel disconnected");
                StreamEvent::Error("stream disconnected".to_string())
            }
        };

        Some(self.apply_event(turn, event))
    }

    /// Non-blocking pump: apply every event already delivered and return the
    /// resulting changes. Suits tick-driven UIs that render on a cadence.
    pub fn try_drain_changes(&mut self) -> Vec<SessionChange> {
        let mut changes: Vec<SessionChange> = self.pending.drain(..).collect();

        loop {
            let turn;
            let event = {
                let Some(active) = self.active.as_mut() else {
                    break;
                };
                turn = active.turn;
                match active.handle.try_recv() {
                    Ok(event) => event,
                    Err(tokio::sync::mpsc::error::TryRecvError::Empty) => break,
                    Err(tokio::sync::mpsc::error::TryRecvError::Disconnected) => {
                        tracing::warn!(%turn, "Stream channel disconnected");
                        StreamEvent::Error("stream disconnected".to_string())
                    }
                }
            };
            changes.push(self.apply_event(turn, event));
        }

        changes.extend(self.pending.drain(..));
        changes
    }

    fn apply_event(&mut self, turn: TurnId, event: StreamEvent) -> SessionChange {
        match event {
            StreamEvent::Chunk(text) => {
                self.store.append_chunk(turn, &text);
                SessionChange::AssistantDelta { turn, text }
            }
            StreamEvent::Done => {
                self.store.finalize(turn);
                self.conclude(turn, StreamFinishReason::Done)
            }
            StreamEvent::Error(msg) => {
                tracing::warn!(%turn, %msg, "Stream failed");
                self.store.fail(turn, STREAM_ERROR_TEXT);
                self.conclude(turn, StreamFinishReason::Error(msg))
            }
        }
    }

    fn conclude(&mut self, turn: TurnId, reason: StreamFinishReason) -> SessionChange {
        self.active = None;
        self.queue_trigger_matches();
        SessionChange::TurnFinished { turn, reason }
    }

    fn queue_trigger_matches(&mut self) {
        for matched in self.detector.scan(&self.store) {
            self.pending.push_back(SessionChange::TriggerMatched {
                turn: matched.turn,
                dashboard: matched.dashboard,
            });
        }
    }

    /// Abort the in-flight stream, if any, marking its turn cancelled with
    /// whatever content had arrived.
    pub fn cancel(&mut self) -> Option<TurnId> {
        let active = self.active.take()?;
        active.handle.abort();
        self.store.cancel(active.turn);
        self.pending.push_back(SessionChange::TurnFinished {
            turn: active.turn,
            reason: StreamFinishReason::Cancelled,
        });
        self.queue_trigger_matches();
        tracing::debug!(turn = %active.turn, "Stream cancelled");
        Some(active.turn)
    }

    /// Start the conversation over: abort any in-flight stream, drop all
    /// turns, and forget scanned trigger ids so the same phrase can match
    /// again.
    pub fn reset(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.abort();
        }
        self.store.reset();
        self.detector.clear();
        self.pending.clear();
    }

    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        self.store.turns()
    }

    #[must_use]
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// True while [`next_change`](Self::next_change) can still produce
    /// something without a new `send`.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.active.is_some() || !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::future::AbortHandle;
    use tokio::sync::mpsc;

    use omnis_transport::{Backend, ScriptedTransport, StreamHandle};
    use omnis_types::{
        NonEmptyString, StreamEvent, StreamFinishReason, TurnPhase, default_trigger_rules,
    };

    use super::{ActiveTurn, ChatSession, SendError, SessionChange};
    use crate::STREAM_ERROR_TEXT;

    const TRIGGER_TEXT: &str =
        "Show today's autonomous truck performance with insights from Gatik";

    fn scripted_session() -> ChatSession {
        let backend = Backend::Scripted(
            ScriptedTransport::default().with_chunk_delay(std::time::Duration::ZERO),
        );
        ChatSession::new(backend, default_trigger_rules(), "test-user")
    }

    /// Session wired to a hand-fed event channel, bypassing any backend.
    fn hand_fed_session() -> (ChatSession, mpsc::UnboundedSender<StreamEvent>) {
        let mut session = scripted_session();
        session
            .store
            .append_user_turn(NonEmptyString::new("hi").expect("non-empty"));
        let turn = session
            .store
            .begin_assistant_turn()
            .expect("no active stream");

        let (tx, rx) = mpsc::unbounded_channel();
        let (abort_handle, _abort_registration) = AbortHandle::new_pair();
        session.active = Some(ActiveTurn {
            turn,
            handle: StreamHandle::new(rx, abort_handle),
        });
        (session, tx)
    }

    #[tokio::test]
    async fn applies_deltas_and_done() {
        let (mut session, tx) = hand_fed_session();
        tx.send(StreamEvent::Chunk("hel".to_string())).expect("send");
        tx.send(StreamEvent::Chunk("lo".to_string())).expect("send");
        tx.send(StreamEvent::Done).expect("send");

        let changes = session.try_drain_changes();
        assert_eq!(changes.len(), 3);
        assert!(matches!(
            changes[2],
            SessionChange::TurnFinished {
                reason: StreamFinishReason::Done,
                ..
            }
        ));

        let last = session.turns().last().expect("assistant turn");
        assert_eq!(last.content(), "hello");
        assert_eq!(last.phase(), TurnPhase::Complete);
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn error_after_chunks_replaces_partial_content() {
        let (mut session, tx) = hand_fed_session();
        tx.send(StreamEvent::Chunk("two ".to_string())).expect("send");
        tx.send(StreamEvent::Chunk("chunks".to_string())).expect("send");
        tx.send(StreamEvent::Error("boom".to_string())).expect("send");

        let changes = session.try_drain_changes();
        assert!(matches!(
            changes.last(),
            Some(SessionChange::TurnFinished {
                reason: StreamFinishReason::Error(_),
                ..
            })
        ));

        let last = session.turns().last().expect("assistant turn");
        assert_eq!(last.content(), STREAM_ERROR_TEXT);
        assert_eq!(last.phase(), TurnPhase::Failed);
    }

    #[tokio::test]
    async fn disconnect_without_terminal_event_fails_the_turn() {
        let (mut session, tx) = hand_fed_session();
        drop(tx);

        let changes = session.try_drain_changes();
        assert!(matches!(
            changes.last(),
            Some(SessionChange::TurnFinished {
                reason: StreamFinishReason::Error(_),
                ..
            })
        ));
        let last = session.turns().last().expect("assistant turn");
        assert_eq!(last.phase(), TurnPhase::Failed);
    }

    #[tokio::test]
    async fn send_is_rejected_while_streaming() {
        let (mut session, _tx) = hand_fed_session();
        let err = session.send("another question").expect_err("must reject");
        assert!(matches!(err, SendError::StreamActive(_)));

        let streaming_count = session
            .turns()
            .iter()
            .filter(|turn| turn.is_streaming())
            .count();
        assert_eq!(streaming_count, 1);
    }

    #[tokio::test]
    async fn send_rejects_whitespace_only_input() {
        let mut session = scripted_session();
        assert!(matches!(session.send("   "), Err(SendError::Empty(_))));
        assert!(session.turns().is_empty());
    }

    #[tokio::test]
    async fn cancel_marks_turn_cancelled_and_keeps_partial_content() {
        let (mut session, tx) = hand_fed_session();
        tx.send(StreamEvent::Chunk("partial".to_string())).expect("send");
        let _ = session.try_drain_changes();

        let cancelled = session.cancel().expect("stream was active");
        let changes = session.try_drain_changes();
        assert!(changes.iter().any(|change| matches!(
            change,
            SessionChange::TurnFinished {
                reason: StreamFinishReason::Cancelled,
                ..
            }
        )));

        let turn = session.store().turn(cancelled).expect("turn exists");
        assert_eq!(turn.phase(), TurnPhase::Cancelled);
        assert_eq!(turn.content(), "partial");
        assert!(!session.is_streaming());
        assert!(session.send("next question").is_ok());
    }

    #[tokio::test]
    async fn reset_clears_turns_and_lets_the_same_trigger_fire_again() {
        let mut session = scripted_session();

        session.send(TRIGGER_TEXT).expect("send");
        let mut fired = 0;
        while let Some(change) = session.next_change().await {
            if matches!(change, SessionChange::TriggerMatched { .. }) {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);

        session.reset();
        assert!(session.turns().is_empty());

        session.send(TRIGGER_TEXT).expect("send after reset");
        let mut fired_again = 0;
        while let Some(change) = session.next_change().await {
            if matches!(change, SessionChange::TriggerMatched { .. }) {
                fired_again += 1;
            }
        }
        assert_eq!(fired_again, 1, "reset must clear the trigger record");
    }

    #[tokio::test]
    async fn late_events_after_reset_do_not_resurrect_turns() {
        let (mut session, tx) = hand_fed_session();
        tx.send(StreamEvent::Chunk("zombie".to_string())).expect("send");
        session.reset();

        assert!(session.turns().is_empty());
        assert!(session.try_drain_changes().is_empty());
        assert!(session.turns().is_empty());
    }
}

//! Conversation state for the Omnis chat pipeline.
//!
//! # Architecture
//!
//! - [`MessageStore`] - ordered, append-only log of conversation turns; the
//!   single piece of mutable shared state
//! - [`ChatSession`] - owns the store, a trigger detector, and the agent
//!   backend; assembles streamed replies into the store and reports changes
//! - [`TriggerDetector`] - scans finished turns for dashboard trigger
//!   phrases, at most once per assistant turn
//!
//! # Control flow
//!
//! [`ChatSession::send`] appends a user turn and an empty streaming
//! assistant turn, then opens a transport stream. Each arriving
//! [`StreamEvent`](omnis_types::StreamEvent) is applied to the store in
//! arrival order and surfaced as a [`SessionChange`] for the presentation
//! layer. When the assistant turn leaves its streaming phase, the trigger
//! detector runs and any match is reported; the caller owns the reveal
//! timer ([`DASHBOARD_REVEAL_DELAY`]).
//!
//! # Error handling
//!
//! Transport errors never propagate as panics or `Err` returns from the
//! event loop; they become a terminal store mutation (the failed turn's
//! content is [`STREAM_ERROR_TEXT`]) and a [`SessionChange::TurnFinished`]
//! with the underlying message attached for logging. Mutations referencing
//! stale turn ids (a reset racing an in-flight stream) are silent no-ops.

mod session;
mod store;
mod trigger;

use std::time::Duration;

pub use session::{ChatSession, SendError, SessionChange};
pub use store::MessageStore;
pub use trigger::{TriggerDetector, TriggerMatch};

/// How long the presentation layer waits after a trigger match before
/// revealing the dashboard.
pub const DASHBOARD_REVEAL_DELAY: Duration = Duration::from_secs(5);

/// What a failed assistant turn says. The underlying transport message is
/// logged, not shown.
pub const STREAM_ERROR_TEXT: &str = "Sorry, there was an error processing your request.";

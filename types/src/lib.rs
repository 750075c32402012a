//! Core domain types for the Omnis chat pipeline.
//!
//! This crate holds the conversation model shared by the transport, session,
//! and presentation layers: turns, turn identity, stream events, and the
//! declarative trigger rules that drive dashboard reveals. It has no IO and
//! no async; constructors that need a clock take `SystemTime` explicitly so
//! callers own time.

mod events;
mod ids;
mod proofs;
mod trigger;
mod turn;

pub use events::{StreamEvent, StreamFinishReason};
pub use ids::TurnId;
pub use proofs::{EmptyStringError, NonEmptyString};
pub use trigger::{TriggerRule, default_trigger_rules, matches_trigger};
pub use turn::{ChatTurn, Role, StreamActiveError, TurnPhase};

use std::fmt;

/// Opaque identity of a conversation turn.
///
/// Allocated by the message store, stable for the turn's lifetime, and never
/// reused within a conversation. Ids from before a reset refer to nothing;
/// store mutations with such ids are silent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TurnId(u64);

impl TurnId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

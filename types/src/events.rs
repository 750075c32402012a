/// Streaming event from the agent backend.
///
/// The transport normalizes every backend (HTTP or scripted) to this
/// vocabulary. Exactly one terminal event (`Done` or `Error`) is delivered
/// per stream, and nothing follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text content, opaque to the pipeline. Chunk boundaries
    /// carry no meaning; consumers concatenate as-is.
    Chunk(String),
    /// Stream completed.
    Done,
    /// Stream terminated with an error.
    Error(String),
}

impl StreamEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

/// How a stream ended, as recorded on the turn it was feeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFinishReason {
    Done,
    Error(String),
    Cancelled,
}

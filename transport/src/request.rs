use chrono::Utc;
use serde::Serialize;

use omnis_types::NonEmptyString;

/// Value of `metadata.source` on every request this client sends.
pub const REQUEST_SOURCE: &str = "omnis-chat";

/// JSON body of the agent `POST`.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRequest {
    pub query: String,
    pub execute: bool,
    pub user_id: String,
    pub metadata: AgentMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentMetadata {
    pub source: String,
    /// ISO-8601, captured when the request is built.
    pub timestamp: String,
}

impl AgentRequest {
    /// Callers validate emptiness up front via [`NonEmptyString`]; the wire
    /// sees the query verbatim, untrimmed.
    #[must_use]
    pub fn new(query: &NonEmptyString, execute: bool, user_id: impl Into<String>) -> Self {
        Self {
            query: query.as_str().to_string(),
            execute,
            user_id: user_id.into(),
            metadata: AgentMetadata {
                source: REQUEST_SOURCE.to_string(),
                timestamp: Utc::now().to_rfc3339(),
            },
        }
    }
}

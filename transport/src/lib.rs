//! Agent stream transport for the Omnis chat pipeline.
//!
//! # Architecture
//!
//! The crate is organized around a backend dispatch pattern:
//!
//! - [`Backend`] - Unified entry point that dispatches to backend-specific
//!   implementations
//! - [`HttpTransport`] - Streams a reply from the configured agent endpoint
//! - [`ScriptedTransport`] - Streams canned replies offline, for demos and
//!   tests
//!
//! Both backends deliver events through a [`tokio::sync::mpsc`] unbounded
//! channel wrapped in a [`StreamHandle`], allowing the caller to process
//! content as it arrives and to abort the producing task.
//!
//! # Wire contract
//!
//! Requests are a single `POST` with an [`AgentRequest`] JSON body. The
//! response body is opaque UTF-8 text with no framing; fragments are
//! forwarded as [`StreamEvent::Chunk`]s to be concatenated as-is.
//!
//! # Guarantees
//!
//! - Chunks are delivered in arrival order.
//! - Exactly one terminal event ([`StreamEvent::Done`] or
//!   [`StreamEvent::Error`]) is delivered per stream, and no chunk follows
//!   it. The forwarding task returns immediately after sending a terminal
//!   event, so this holds structurally rather than by bookkeeping.
//! - Transport failures (connection errors, non-success status, missing
//!   body, invalid UTF-8, idle timeout) each surface as a single
//!   `StreamEvent::Error` carrying a human-readable message. No retry is
//!   attempted.

mod decode;
mod http;
mod request;
mod scripted;

use std::sync::OnceLock;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use futures_util::future::AbortHandle;
use omnis_types::StreamEvent;

pub use http::HttpTransport;
pub use request::{AgentMetadata, AgentRequest, REQUEST_SOURCE};
pub use scripted::ScriptedTransport;

const CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;

const TCP_KEEPALIVE_SECS: u64 = 60;

const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid agent endpoint `{url}`: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

/// Shared HTTP client. Redirects are refused; the agent endpoint is a single
/// configured URL and anything else is a misconfiguration.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build tuned HTTP client: {e}. Using defaults.");
                reqwest::Client::new()
            })
    })
}

pub(crate) fn stream_idle_timeout() -> Duration {
    static TIMEOUT: OnceLock<Duration> = OnceLock::new();
    *TIMEOUT.get_or_init(|| {
        let timeout = std::env::var("OMNIS_STREAM_IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_STREAM_IDLE_TIMEOUT_SECS);
        Duration::from_secs(timeout)
    })
}

pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// A live stream of agent reply events plus the means to abort it.
///
/// Dropping the handle does not stop the producing task; call
/// [`StreamHandle::abort`] for that. After an abort, no further events
/// arrive and [`recv`](StreamHandle::recv) eventually returns `None`.
#[derive(Debug)]
pub struct StreamHandle {
    receiver: mpsc::UnboundedReceiver<StreamEvent>,
    abort: AbortHandle,
}

impl StreamHandle {
    #[must_use]
    pub fn new(receiver: mpsc::UnboundedReceiver<StreamEvent>, abort: AbortHandle) -> Self {
        Self { receiver, abort }
    }

    /// Await the next event. `None` means the producer is gone without a
    /// terminal event (abort, or a task panic).
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<StreamEvent, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }
}

/// Which agent backend a session talks to.
///
/// Dispatch is an enum, not a trait object: there are exactly two backends
/// and the session treats them identically.
#[derive(Debug, Clone)]
pub enum Backend {
    Http(HttpTransport),
    Scripted(ScriptedTransport),
}

impl Backend {
    #[must_use]
    pub fn open(&self, request: AgentRequest) -> StreamHandle {
        match self {
            Backend::Http(transport) => transport.open(request),
            Backend::Scripted(transport) => transport.open(&request.query),
        }
    }
}

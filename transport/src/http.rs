//! HTTP streaming backend.
//!
//! One `POST` per user turn; the response body is forwarded chunk by chunk
//! until EOF. EOF is the completion signal - the wire has no framing and no
//! done marker.

use futures_util::StreamExt;
use futures_util::future::{AbortHandle, Abortable};
use tokio::sync::mpsc;

use omnis_types::StreamEvent;

use crate::decode::Utf8Carry;
use crate::request::AgentRequest;
use crate::{StreamHandle, TransportError, http_client, read_capped_error_body};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: reqwest::Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        let endpoint =
            reqwest::Url::parse(endpoint).map_err(|e| TransportError::InvalidEndpoint {
                url: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }

    /// Open a stream for one request. The returned handle observes the
    /// transport guarantees documented at the crate root.
    #[must_use]
    pub fn open(&self, request: AgentRequest) -> StreamHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        let endpoint = self.endpoint.clone();

        let task = async move {
            run_stream(endpoint, request, &tx).await;
        };
        tokio::spawn(async move {
            let _ = Abortable::new(task, abort_registration).await;
        });

        StreamHandle::new(rx, abort_handle)
    }
}

async fn run_stream(
    endpoint: reqwest::Url,
    request: AgentRequest,
    tx: &mpsc::UnboundedSender<StreamEvent>,
) {
    let response = match http_client().post(endpoint).json(&request).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(%e, "Agent request failed");
            let _ = tx.send(StreamEvent::Error(format!("Request failed: {e}")));
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let error_text = read_capped_error_body(response).await;
        let _ = tx.send(StreamEvent::Error(format!(
            "Agent error {status}: {error_text}"
        )));
        return;
    }

    let mut stream = response.bytes_stream();
    let mut carry = Utf8Carry::new();
    let mut received_any = false;
    let idle_timeout = crate::stream_idle_timeout();

    loop {
        let Ok(next) = tokio::time::timeout(idle_timeout, stream.next()).await else {
            let _ = tx.send(StreamEvent::Error("Stream idle timeout".to_string()));
            return;
        };

        let Some(chunk) = next else { break };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(format!("Stream read failed: {e}")));
                return;
            }
        };
        received_any = received_any || !chunk.is_empty();

        match carry.push(&chunk) {
            Ok(text) => {
                if !text.is_empty() && tx.send(StreamEvent::Chunk(text)).is_err() {
                    return;
                }
            }
            Err(_) => {
                let _ = tx.send(StreamEvent::Error(
                    "Received invalid UTF-8 from agent stream".to_string(),
                ));
                return;
            }
        }
    }

    if !received_any {
        // A success status with no body at all is a broken reply, not an
        // empty one.
        let _ = tx.send(StreamEvent::Error(
            "Agent response had no body".to_string(),
        ));
        return;
    }

    if !carry.is_empty() {
        let _ = tx.send(StreamEvent::Error(
            "Agent stream ended mid-character".to_string(),
        ));
        return;
    }

    let _ = tx.send(StreamEvent::Done);
}

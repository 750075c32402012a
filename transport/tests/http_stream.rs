//! Integration tests for the HTTP streaming backend.
//!
//! A wiremock server stands in for the agent endpoint; assertions cover the
//! transport guarantees: ordered chunk delivery, exactly one terminal event,
//! and every failure mode mapping to a single human-readable error.

use std::time::Duration;

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use omnis_transport::{AgentRequest, HttpTransport, ScriptedTransport, StreamHandle};
use omnis_types::{NonEmptyString, StreamEvent};

fn request(text: &str) -> AgentRequest {
    let query = NonEmptyString::new(text).expect("non-empty");
    AgentRequest::new(&query, true, "test-user")
}

/// Drain a handle to completion, asserting nothing follows the terminal
/// event.
async fn collect(mut handle: StreamHandle) -> (String, Option<StreamEvent>) {
    let mut content = String::new();
    let mut terminal = None;
    while let Some(event) = handle.recv().await {
        assert!(terminal.is_none(), "event delivered after terminal: {event:?}");
        match event {
            StreamEvent::Chunk(text) => content.push_str(&text),
            other => terminal = Some(other),
        }
    }
    (content, terminal)
}

#[tokio::test]
async fn streams_body_and_completes_on_eof() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/agent"))
        .and(body_partial_json(serde_json::json!({
            "query": "hello agent",
            "execute": true,
            "user_id": "test-user",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello, world!"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&format!("{}/api/agent", server.uri())).expect("endpoint");
    let handle = transport.open(request("hello agent"));

    let (content, terminal) = collect(handle).await;
    assert_eq!(content, "Hello, world!");
    assert_eq!(terminal, Some(StreamEvent::Done));
}

#[tokio::test]
async fn non_success_status_is_a_single_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("agent exploded"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&server.uri()).expect("endpoint");
    let handle = transport.open(request("hello"));

    let (content, terminal) = collect(handle).await;
    assert_eq!(content, "", "no chunks may precede a status error");
    match terminal {
        Some(StreamEvent::Error(msg)) => {
            assert!(msg.contains("500"), "error should carry the status: {msg}");
            assert!(msg.contains("agent exploded"), "error should carry the body: {msg}");
        }
        other => panic!("expected error terminal, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_success_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&server.uri()).expect("endpoint");
    let handle = transport.open(request("hello"));

    let (content, terminal) = collect(handle).await;
    assert_eq!(content, "");
    assert!(
        matches!(terminal, Some(StreamEvent::Error(_))),
        "got {terminal:?}"
    );
}

#[tokio::test]
async fn connection_failure_is_a_single_error() {
    // Nothing listens here.
    let transport = HttpTransport::new("http://127.0.0.1:9/api/agent").expect("endpoint");
    let handle = transport.open(request("hello"));

    let (content, terminal) = collect(handle).await;
    assert_eq!(content, "");
    assert!(
        matches!(terminal, Some(StreamEvent::Error(_))),
        "got {terminal:?}"
    );
}

#[test]
fn invalid_endpoint_is_rejected_at_construction() {
    assert!(HttpTransport::new("not a url").is_err());
}

#[tokio::test]
async fn abort_stops_delivery_without_terminal_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("slow reply")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&server.uri()).expect("endpoint");
    let mut handle = transport.open(request("hello"));
    handle.abort();

    // The producing task is gone; the channel closes with no terminal event.
    assert_eq!(handle.recv().await, None);
}

#[tokio::test]
async fn scripted_backend_streams_narration_for_matched_query() {
    let transport = ScriptedTransport::default().with_chunk_delay(Duration::ZERO);
    let handle =
        transport.open("Show today's autonomous truck performance with insights from Gatik");

    let (content, terminal) = collect(handle).await;
    assert!(content.contains("Gatik"), "narration mentions the partner");
    assert!(content.contains("fleet"), "narration is the fleet story");
    assert_eq!(terminal, Some(StreamEvent::Done));
}

#[tokio::test]
async fn scripted_backend_falls_back_for_unmatched_query() {
    let transport = ScriptedTransport::default().with_chunk_delay(Duration::ZERO);
    let handle = transport.open("what's the weather?");

    let (content, terminal) = collect(handle).await;
    assert!(content.contains("demo dashboards"));
    assert_eq!(terminal, Some(StreamEvent::Done));
}

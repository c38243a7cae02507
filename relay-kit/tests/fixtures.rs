//! Mock agent helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SUBSCRIBE_PATH: &str = "/a2a/sendSubscribe";

/// Wrap an SSE body in a response.
pub fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_string())
}

/// Encode task frames the way agents send them, with the leading comment.
pub fn task_stream(frames: &[Value]) -> String {
    let mut body = String::from(":\n\n");
    for frame in frames {
        body.push_str(&format!("data: {frame}\n\n"));
    }
    body
}

pub fn status(stage: &str) -> Value {
    json!({"type": "status", "taskId": "t1", "stage": stage})
}

pub fn final_artifact(kind: &str, data: Value) -> Value {
    json!({"type": "final", "taskId": "t1", "artifact": {"kind": kind, "data": data}})
}

pub fn final_error(message: &str) -> Value {
    json!({"type": "final", "taskId": "t1", "error": message})
}

/// Serve an agent card pointing at this server's subscribe endpoint.
pub async fn mount_card(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path("/.well-known/agent-card.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": name,
            "version": "1.0.0",
            "endpoints": {"sendSubscribe": format!("{}{SUBSCRIBE_PATH}", server.uri())}
        })))
        .mount(server)
        .await;
}

/// Serve `body` on the subscribe endpoint after `delay`.
pub async fn mount_subscribe(server: &MockServer, body: String, delay: Duration) {
    Mock::given(method("POST"))
        .and(path(SUBSCRIBE_PATH))
        .respond_with(sse_response(&body).set_delay(delay))
        .mount(server)
        .await;
}

/// A complete agent answering every task with `frames`.
pub async fn agent(name: &str, frames: &[Value], delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    mount_card(&server, name).await;
    mount_subscribe(&server, task_stream(frames), delay).await;
    server
}

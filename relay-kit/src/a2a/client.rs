//! Streaming task client
//!
//! Submits one task to an agent's `sendSubscribe` endpoint and reads the
//! server-sent frames until the terminal `final` frame.
//!
//! ```text
//! POST sendSubscribe {"input": ...}
//!   :                                                   (ignored)
//!   data: {"type":"status","taskId":"t1","stage":"started"}
//!   data: {"type":"final","taskId":"t1","artifact":{"kind":"weather","data":{...}}}
//! ```

use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use super::card::CardCache;
use super::error::{AgentError, DiscoveryError, RpcError};
use crate::a2ui::sse::{FrameDecoder, data_payloads};

/// Default bound on one task call, request and stream read included.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Result payload of a task. Passed through, never inspected here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub data: Value,
}

/// One frame of a task stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskFrame {
    Status {
        #[serde(rename = "taskId", default)]
        task_id: String,
        #[serde(default)]
        stage: String,
    },
    Final {
        #[serde(rename = "taskId", default)]
        task_id: String,
        #[serde(default)]
        artifact: Option<Artifact>,
        #[serde(default)]
        error: Option<Value>,
    },
}

/// Client for agent task calls.
///
/// Cheap to clone; clones share the HTTP connection pool and the card cache.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    cards: CardCache,
}

impl Default for AgentClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl AgentClient {
    pub fn new(http: reqwest::Client) -> Self {
        AgentClient {
            cards: CardCache::new(http.clone()),
            http,
        }
    }

    pub fn cards(&self) -> &CardCache {
        &self.cards
    }

    /// Run one task on the agent at `base_address` and wait for its artifact.
    ///
    /// Discovery happens first and is not counted against `timeout`; the POST and
    /// the whole stream read are.
    pub async fn call(
        &self,
        base_address: &str,
        input: &Value,
        timeout: Duration,
    ) -> Result<Artifact, AgentError> {
        let card = self.cards.get(base_address).await?;
        let endpoint = card
            .send_subscribe_url()
            .map_err(|reason| DiscoveryError::InvalidCard {
                address: base_address.to_string(),
                reason,
            })?;

        match tokio::time::timeout(timeout, self.subscribe(endpoint, input)).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                ::log::warn!(
                    "[A2A] Task on {base_address} timed out after {}ms",
                    timeout.as_millis()
                );
                Err(RpcError::Timeout { elapsed: timeout }.into())
            }
        }
    }

    async fn subscribe(&self, endpoint: Url, input: &Value) -> Result<Artifact, RpcError> {
        ::log::debug!("[A2A] POST {endpoint}");
        let response = self
            .http
            .post(endpoint.clone())
            .header(ACCEPT, "text/event-stream")
            .json(&json!({ "input": input }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RpcError::Transport(format!(
                "{endpoint} returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let frames = task_frames(response);
        futures::pin_mut!(frames);

        while let Some(frame) = frames.next().await {
            match frame? {
                TaskFrame::Status { task_id, stage } => {
                    ::log::debug!("[A2A] Task {task_id}: {stage}");
                }
                TaskFrame::Final {
                    error: Some(error), ..
                } => {
                    return Err(RpcError::Remote(error_message(&error)));
                }
                TaskFrame::Final {
                    artifact: Some(artifact),
                    task_id,
                    ..
                } => {
                    ::log::debug!("[A2A] Task {task_id}: final {}", artifact.kind);
                    return Ok(artifact);
                }
                TaskFrame::Final { task_id, .. } => {
                    ::log::warn!("[A2A] Task {task_id}: final frame without artifact or error");
                }
            }
        }

        Err(RpcError::StreamEnded)
    }
}

/// Decode a task response body into frames.
///
/// Payloads that are not JSON, or not a known frame, are skipped.
fn task_frames(
    response: reqwest::Response,
) -> impl Stream<Item = Result<TaskFrame, reqwest::Error>> {
    async_stream::try_stream! {
        let mut decoder = FrameDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in decoder.push(&chunk) {
                for payload in data_payloads(&event) {
                    match serde_json::from_str::<TaskFrame>(payload) {
                        Ok(frame) => yield frame,
                        Err(e) => ::log::debug!("[A2A] Skipping frame: {e}"),
                    }
                }
            }
        }

        if let Some(tail) = decoder.finish() {
            ::log::debug!("[A2A] Unterminated data at end of stream: {tail:?}");
        }
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_frames() {
        let status: TaskFrame =
            serde_json::from_str(r#"{"type":"status","taskId":"t1","stage":"started"}"#).unwrap();
        assert_eq!(
            status,
            TaskFrame::Status {
                task_id: "t1".to_string(),
                stage: "started".to_string()
            }
        );

        let done: TaskFrame = serde_json::from_str(
            r#"{"type":"final","taskId":"t1","artifact":{"kind":"weather","data":{"min":18}}}"#,
        )
        .unwrap();
        assert!(matches!(
            done,
            TaskFrame::Final { artifact: Some(Artifact { ref kind, .. }), error: None, .. } if kind == "weather"
        ));

        let failed: TaskFrame =
            serde_json::from_str(r#"{"type":"final","taskId":"t1","error":"boom"}"#).unwrap();
        assert!(matches!(failed, TaskFrame::Final { error: Some(_), artifact: None, .. }));

        assert!(serde_json::from_str::<TaskFrame>(r#"{"type":"progress"}"#).is_err());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(&json!("no flights")), "no flights");
        assert_eq!(error_message(&json!({"code": 1})), r#"{"code":1}"#);
    }
}

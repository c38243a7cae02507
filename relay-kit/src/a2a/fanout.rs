//! Concurrent fan-out over several agents.

use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::Value;

use super::client::{AgentClient, Artifact, DEFAULT_RPC_TIMEOUT};
use super::error::AgentError;

/// One task to run as part of a fan-out
#[derive(Debug, Clone, PartialEq)]
pub struct AgentCall {
    /// Name used in logs and errors
    pub agent: String,
    pub base_address: String,
    pub input: Value,
    pub timeout: Duration,
}

impl AgentCall {
    pub fn new(agent: impl Into<String>, base_address: impl Into<String>, input: Value) -> Self {
        AgentCall {
            agent: agent.into(),
            base_address: base_address.into(),
            input,
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Run every call concurrently and collect artifacts in call order.
///
/// All or nothing: the first failure is returned as soon as it happens. Calls
/// still in flight at that point keep running detached and their results are
/// discarded.
pub async fn run_all(
    client: &AgentClient,
    calls: Vec<AgentCall>,
) -> Result<Vec<Artifact>, AgentError> {
    let count = calls.len();
    ::log::info!("[A2A fanout] Dispatching {count} calls");

    let mut pending: FuturesUnordered<_> = calls
        .into_iter()
        .enumerate()
        .map(|(index, call)| {
            let client = client.clone();
            let agent = call.agent.clone();
            let handle = tokio::spawn(async move {
                client
                    .call(&call.base_address, &call.input, call.timeout)
                    .await
            });
            async move { (index, agent, handle.await) }
        })
        .collect();

    let mut artifacts: Vec<Option<Artifact>> = (0..count).map(|_| None).collect();

    while let Some((index, agent, joined)) = pending.next().await {
        match joined {
            Ok(Ok(artifact)) => {
                ::log::debug!("[A2A fanout] {agent} done");
                artifacts[index] = Some(artifact);
            }
            Ok(Err(e)) => {
                ::log::warn!("[A2A fanout] {agent} failed: {e}");
                return Err(e);
            }
            Err(join_error) => {
                ::log::error!("[A2A fanout] {agent} task aborted: {join_error}");
                return Err(AgentError::Aborted { agent });
            }
        }
    }

    Ok(artifacts.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_fanout() {
        let client = AgentClient::default();
        let artifacts = run_all(&client, Vec::new()).await.unwrap();
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_address_fails() {
        let client = AgentClient::default();
        let calls = vec![AgentCall::new("weather", "not a url", serde_json::json!({}))];

        let err = run_all(&client, calls).await.unwrap_err();
        assert!(matches!(err, AgentError::Discovery(_)));
    }
}

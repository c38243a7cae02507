use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Failure to resolve an agent card.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid agent address {address}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("agent card fetch failed for {address}: {source}")]
    Transport {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("agent card fetch failed for {address}: HTTP {status}")]
    Status { address: String, status: u16 },

    #[error("agent card from {address} is not valid: {reason}")]
    InvalidCard { address: String, reason: String },
}

impl DiscoveryError {
    /// The agent base address the failure refers to
    pub fn address(&self) -> &str {
        match self {
            DiscoveryError::InvalidAddress { address, .. }
            | DiscoveryError::Transport { address, .. }
            | DiscoveryError::Status { address, .. }
            | DiscoveryError::InvalidCard { address, .. } => address,
        }
    }
}

/// Failure of one streaming task call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The agent answered with a terminal `error` frame
    #[error("{0}")]
    Remote(String),

    #[error("sendSubscribe timeout after {}ms", .elapsed.as_millis())]
    Timeout { elapsed: Duration },

    #[error("SSE stream ended without final message")]
    StreamEnded,

    #[error("sendSubscribe request failed: {0}")]
    Transport(String),
}

/// Coarse classification of an [`RpcError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorKind {
    RemoteError,
    Timeout,
    StreamEndedWithoutResult,
    Transport,
}

impl RpcErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcErrorKind::RemoteError => "remote-error",
            RpcErrorKind::Timeout => "timeout",
            RpcErrorKind::StreamEndedWithoutResult => "stream-ended-without-result",
            RpcErrorKind::Transport => "transport",
        }
    }
}

impl fmt::Display for RpcErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RpcError {
    pub fn kind(&self) -> RpcErrorKind {
        match self {
            RpcError::Remote(_) => RpcErrorKind::RemoteError,
            RpcError::Timeout { .. } => RpcErrorKind::Timeout,
            RpcError::StreamEnded => RpcErrorKind::StreamEndedWithoutResult,
            RpcError::Transport(_) => RpcErrorKind::Transport,
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        RpcError::Transport(err.to_string())
    }
}

/// Any failure of an agent call.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The call's task panicked or was cancelled
    #[error("agent call {agent} aborted")]
    Aborted { agent: String },
}

impl AgentError {
    /// RPC failure kind, if this is an RPC failure
    pub fn rpc_kind(&self) -> Option<RpcErrorKind> {
        match self {
            AgentError::Rpc(e) => Some(e.kind()),
            _ => None,
        }
    }
}

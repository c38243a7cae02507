//! A2A (Agent-to-Agent) task calls
//!
//! Discovery of agent cards, streaming task submission with a per-call timeout,
//! and an all-or-nothing fan-out across several agents.
//!
//! # Example
//!
//! ```rust,ignore
//! let client = AgentClient::default();
//! let artifact = client
//!     .call("http://localhost:3001", &json!({"query": "Tokyo"}), DEFAULT_RPC_TIMEOUT)
//!     .await?;
//! ```

mod card;
mod client;
mod error;
mod fanout;

pub use card::*;
pub use client::*;
pub use error::*;
pub use fanout::*;

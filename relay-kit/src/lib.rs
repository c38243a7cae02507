//! # Description
//!
//! Relay Kit contains the protocol plumbing of a coordinator that delegates work
//! to independent agents and drives a thin declarative UI with the results.
//!
//! # Features
//!
//! - Agent card discovery and streaming task calls with per-call timeouts.
//! - All-or-nothing fan-out across several agents.
//! - A2UI surfaces: catalog-driven initial state, one live stream per surface,
//!   heartbeats and incremental data-model writes.
//! - A client-side reconciliation engine producing a render tree, plus an HTTP
//!   host to consume a surface from Rust.

pub mod a2a;
pub mod a2ui;

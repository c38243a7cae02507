//! A2UI Protocol Implementation
//!
//! A2UI (Agent-to-UI) is a declarative JSON protocol for driving a thin UI from
//! a server: a component catalog plus a path-addressed data model, sent as
//! incremental frames over a server-sent event stream.
//!
//! # Architecture
//!
//! ```text
//!   server                                   client
//!
//!   SurfaceCatalog                           UiHost (GET /ui/stream)
//!        ↓ infer_init / materialize                 ↓
//!   SurfaceEmitter ── SseFrame ──────────→ FrameDecoder
//!        ↑ write / write_many                       ↓
//!   ConnectionRegistry                       SurfaceProcessor
//!   (one stream per surface)                 ┌──────┴──────┐
//!                                            │             │
//!                                      DataModel  ComponentRegistry
//!                                            │             │
//!                                            └──────┬──────┘
//!                                                   ↓
//!                                              RenderNode tree
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_kit::a2ui::*;
//!
//! let mut processor = SurfaceProcessor::new("main");
//! let json = r#"{"beginRendering": {"surfaceId": "main", "root": "root"}}"#;
//! processor.process_json(json)?;
//! ```

mod data_model;
mod emitter;
mod host;
mod init;
mod message;
mod processor;
mod registry;
mod render;
mod value;

pub mod sse;

pub use data_model::*;
pub use emitter::*;
pub use host::*;
pub use init::*;
pub use message::*;
pub use processor::*;
pub use registry::*;
pub use render::*;
pub use value::*;

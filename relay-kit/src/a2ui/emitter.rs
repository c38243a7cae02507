//! Surface Update Emitter
//!
//! Server side of the UI stream. One live connection per surface id; every
//! frame pushed to a surface is delivered, in order, to that connection only.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::data_model::split_path;
use super::init::{DataModelPatch, infer_init, materialize};
use super::message::*;
use super::sse::SseFrame;

/// Heartbeat period used when none is configured.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Returned when pushing to a surface that has no open stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No active stream for surfaceId {surface_id}")]
pub struct NoActiveStreamError {
    pub surface_id: String,
}

struct ActiveConnection {
    connection_id: Uuid,
    sender: mpsc::UnboundedSender<SseFrame>,
    heartbeat: JoinHandle<()>,
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        self.heartbeat.abort();
    }
}

/// A fresh registration: its id and the receiving end of its frame queue.
pub struct Registration {
    pub connection_id: Uuid,
    pub receiver: mpsc::UnboundedReceiver<SseFrame>,
}

/// Map of surface id to its active connection.
///
/// Cloning yields another handle to the same map.
#[derive(Clone)]
pub struct ConnectionRegistry {
    connections: Arc<Mutex<HashMap<String, ActiveConnection>>>,
    heartbeat_interval: Duration,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_INTERVAL)
    }
}

impl ConnectionRegistry {
    pub fn new(heartbeat_interval: Duration) -> Self {
        ConnectionRegistry {
            connections: Arc::new(Mutex::new(HashMap::new())),
            heartbeat_interval,
        }
    }

    /// Register a new connection for `surface_id`, superseding any previous one.
    ///
    /// `preamble` is queued on the new connection before it becomes reachable,
    /// so frames sent by other writers always come after it. The previous
    /// connection's heartbeat is stopped and its sender dropped, which ends its
    /// stream. Must be called within a tokio runtime.
    pub fn register(&self, surface_id: &str, preamble: Vec<SseFrame>) -> Registration {
        let (sender, receiver) = mpsc::unbounded_channel();
        for frame in preamble {
            // The receiver is still held here, so this cannot fail.
            let _ = sender.send(frame);
        }

        let connection_id = Uuid::now_v7();
        let heartbeat = tokio::spawn(heartbeat(sender.clone(), self.heartbeat_interval));

        let previous = self.lock().insert(
            surface_id.to_string(),
            ActiveConnection {
                connection_id,
                sender,
                heartbeat,
            },
        );

        if let Some(previous) = previous {
            ::log::info!(
                "[A2UI emitter] Surface {surface_id}: connection {} superseded by {connection_id}",
                previous.connection_id
            );
        } else {
            ::log::info!("[A2UI emitter] Surface {surface_id}: connection {connection_id} opened");
        }

        Registration {
            connection_id,
            receiver,
        }
    }

    /// Remove the registration only if `connection_id` is still the active one.
    pub fn release(&self, surface_id: &str, connection_id: Uuid) -> bool {
        let mut connections = self.lock();
        let current = connections
            .get(surface_id)
            .is_some_and(|c| c.connection_id == connection_id);

        if current {
            connections.remove(surface_id);
            ::log::info!("[A2UI emitter] Surface {surface_id}: connection {connection_id} closed");
        }
        current
    }

    /// Queue a frame on the active connection of `surface_id`.
    pub fn send(&self, surface_id: &str, frame: SseFrame) -> Result<(), NoActiveStreamError> {
        let connections = self.lock();
        let sent = connections
            .get(surface_id)
            .is_some_and(|c| c.sender.send(frame).is_ok());

        if sent {
            Ok(())
        } else {
            Err(NoActiveStreamError {
                surface_id: surface_id.to_string(),
            })
        }
    }

    pub fn is_active(&self, surface_id: &str) -> bool {
        self.lock()
            .get(surface_id)
            .is_some_and(|c| !c.sender.is_closed())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ActiveConnection>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn heartbeat(sender: mpsc::UnboundedSender<SseFrame>, period: Duration) {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);
    loop {
        interval.tick().await;
        if sender.send(SseFrame::heartbeat()).is_err() {
            break;
        }
    }
}

/// Frames of one surface connection.
///
/// Ends when the connection is superseded. Dropping it releases the registration.
pub struct SurfaceStream {
    surface_id: String,
    connection_id: Uuid,
    receiver: mpsc::UnboundedReceiver<SseFrame>,
    registry: ConnectionRegistry,
}

impl SurfaceStream {
    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }
}

impl Stream for SurfaceStream {
    type Item = SseFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<SseFrame>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for SurfaceStream {
    fn drop(&mut self) {
        self.registry.release(&self.surface_id, self.connection_id);
    }
}

/// The catalog served to every new surface connection.
#[derive(Debug, Clone, Default)]
pub struct SurfaceCatalog {
    /// Root component id sent in `beginRendering`
    pub root: String,
    pub components: Vec<ComponentDefinition>,
    /// Full path to literal, replacing inferred defaults
    pub defaults: Map<String, Value>,
}

/// Pushes catalog, state and rendering frames to surfaces.
#[derive(Clone)]
pub struct SurfaceEmitter {
    registry: ConnectionRegistry,
    catalog: Arc<SurfaceCatalog>,
    init: Arc<Vec<DataModelPatch>>,
}

impl SurfaceEmitter {
    pub fn new(registry: ConnectionRegistry, catalog: SurfaceCatalog) -> Self {
        let init = materialize(&infer_init(&catalog.components), &catalog.defaults);
        ::log::debug!(
            "[A2UI emitter] Catalog: {} components, {} init patches",
            catalog.components.len(),
            init.len()
        );

        SurfaceEmitter {
            registry,
            catalog: Arc::new(catalog),
            init: Arc::new(init),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &SurfaceCatalog {
        &self.catalog
    }

    /// Open a stream for `surface_id`.
    ///
    /// The stream starts with a comment frame, then the full catalog, the initial
    /// data-model state and `beginRendering`.
    pub fn open(&self, surface_id: &str) -> SurfaceStream {
        let Registration {
            connection_id,
            receiver,
        } = self
            .registry
            .register(surface_id, self.initial_frames(surface_id));

        SurfaceStream {
            surface_id: surface_id.to_string(),
            connection_id,
            receiver,
            registry: self.registry.clone(),
        }
    }

    fn initial_frames(&self, surface_id: &str) -> Vec<SseFrame> {
        let mut messages = vec![A2uiMessage::SurfaceUpdate(SurfaceUpdate {
            surface_id: surface_id.to_string(),
            components: self.catalog.components.clone(),
        })];
        messages.extend(self.init.iter().map(|patch| {
            A2uiMessage::DataModelUpdate(DataModelUpdate {
                surface_id: surface_id.to_string(),
                path: patch.path.clone(),
                contents: patch.contents.clone(),
            })
        }));
        messages.push(A2uiMessage::BeginRendering(BeginRendering {
            surface_id: surface_id.to_string(),
            root: self.catalog.root.clone(),
        }));

        let mut frames = vec![SseFrame::heartbeat()];
        frames.extend(messages.iter().filter_map(encode));
        frames
    }

    /// Write one value at `full_path`.
    ///
    /// The value is projected like an init override. A path without a key is
    /// ignored.
    pub fn write(
        &self,
        surface_id: &str,
        full_path: &str,
        value: &Value,
    ) -> Result<(), NoActiveStreamError> {
        let Some((base, key)) = split_path(full_path) else {
            ::log::warn!("[A2UI emitter] Ignoring write to unsplittable path {full_path:?}");
            return Ok(());
        };
        self.write_many(surface_id, &base, vec![DataContent::from_literal(key, value)])
    }

    /// Write several keys under one base path as a single frame.
    pub fn write_many(
        &self,
        surface_id: &str,
        base: &str,
        contents: Vec<DataContent>,
    ) -> Result<(), NoActiveStreamError> {
        self.send_message(
            surface_id,
            &A2uiMessage::DataModelUpdate(DataModelUpdate {
                surface_id: surface_id.to_string(),
                path: base.to_string(),
                contents,
            }),
        )
    }

    /// Re-send component definitions.
    pub fn update_catalog(
        &self,
        surface_id: &str,
        components: Vec<ComponentDefinition>,
    ) -> Result<(), NoActiveStreamError> {
        self.send_message(
            surface_id,
            &A2uiMessage::SurfaceUpdate(SurfaceUpdate {
                surface_id: surface_id.to_string(),
                components,
            }),
        )
    }

    pub fn send_message(
        &self,
        surface_id: &str,
        message: &A2uiMessage,
    ) -> Result<(), NoActiveStreamError> {
        match encode(message) {
            Some(frame) => self.registry.send(surface_id, frame),
            None => Ok(()),
        }
    }
}

fn encode(message: &A2uiMessage) -> Option<SseFrame> {
    SseFrame::json(message)
        .inspect_err(|e| ::log::error!("[A2UI emitter] Failed to encode frame: {e}"))
        .ok()
}

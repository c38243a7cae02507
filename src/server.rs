//! HTTP surface of the coordinator: the UI stream, user events and health.

use std::convert::Infallible;
use std::future::IntoFuture;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use relay_kit::a2ui::UserAction;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;

use crate::orchestrate::{ActionError, Orchestrator};

const DEFAULT_SURFACE: &str = "main";

fn default_surface() -> String {
    DEFAULT_SURFACE.to_string()
}

pub fn router(orchestrator: Orchestrator) -> Router {
    Router::new()
        .route("/ui/stream", get(stream_handler))
        .route("/ui/event", post(event_handler))
        .route("/health", get(health_handler))
        .with_state(orchestrator)
}

/// Serve until ctrl-c.
///
/// Open UI streams never end on their own, so shutdown does not wait for them.
pub async fn run_server(addr: SocketAddr, orchestrator: Orchestrator) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    ::log::info!("Listening on http://{addr}");

    tokio::select! {
        result = axum::serve(listener, router(orchestrator)).into_future() => {
            result.context("Server error")
        }
        _ = tokio::signal::ctrl_c() => {
            ::log::info!("Shutting down");
            Ok(())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamQuery {
    surface_id: Option<String>,
}

async fn stream_handler(
    State(orchestrator): State<Orchestrator>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let surface_id = query
        .surface_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(default_surface);

    let frames = orchestrator
        .emitter()
        .open(&surface_id)
        .map(|frame| Ok::<_, Infallible>(frame.encode()));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRequest {
    #[serde(default)]
    user_action: Option<IncomingAction>,
}

/// A `userAction` as browsers send it, with every field optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingAction {
    #[serde(default = "default_surface")]
    surface_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    context: Map<String, Value>,
    #[serde(default)]
    component_id: Option<String>,
}

impl From<EventRequest> for UserAction {
    fn from(request: EventRequest) -> Self {
        match request.user_action {
            Some(action) => UserAction {
                surface_id: action.surface_id,
                name: action.name,
                context: action.context,
                component_id: action.component_id,
            },
            None => UserAction {
                surface_id: default_surface(),
                name: String::new(),
                context: Map::new(),
                component_id: None,
            },
        }
    }
}

async fn event_handler(
    State(orchestrator): State<Orchestrator>,
    Json(request): Json<EventRequest>,
) -> Result<Json<Value>, ActionError> {
    let action = UserAction::from(request);
    orchestrator.handle_action(&action).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "ok": true, "service": "relay" }))
}

impl ActionError {
    pub fn status(&self) -> StatusCode {
        match self {
            ActionError::NoActiveStream(_) => StatusCode::CONFLICT,
            ActionError::EmptyQuery => StatusCode::BAD_REQUEST,
            ActionError::Agents(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

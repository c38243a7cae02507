//! A2UI Host
//!
//! Client side of a surface served over HTTP: consumes `GET /ui/stream`, drives a
//! [`SurfaceProcessor`], and posts user actions back to `POST /ui/event`.

use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use thiserror::Error;
use url::Url;

use super::message::{A2uiMessage, UserAction};
use super::processor::{ProcessorEvent, SurfaceProcessor};
use super::sse::{FrameDecoder, data_payloads};

/// Errors from the UI host
#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid UI server address {address}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no active stream for surface {0}")]
    NoActiveStream(String),

    #[error("UI server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// A connected surface.
pub struct UiHost {
    http: reqwest::Client,
    base_url: Url,
    processor: SurfaceProcessor,
    events: BoxStream<'static, Result<String, reqwest::Error>>,
    is_connected: bool,
}

impl UiHost {
    /// Open the stream of `surface_id` on the UI server at `base_url`
    pub async fn connect(base_url: &str, surface_id: &str) -> Result<Self, HostError> {
        Self::connect_with(reqwest::Client::new(), base_url, surface_id).await
    }

    pub async fn connect_with(
        http: reqwest::Client,
        base_url: &str,
        surface_id: &str,
    ) -> Result<Self, HostError> {
        let base_url = Url::parse(base_url).map_err(|source| HostError::InvalidAddress {
            address: base_url.to_string(),
            source,
        })?;
        let invalid = |source| HostError::InvalidAddress {
            address: base_url.to_string(),
            source,
        };

        let mut stream_url = base_url.join("/ui/stream").map_err(invalid)?;
        stream_url
            .query_pairs_mut()
            .append_pair("surfaceId", surface_id);

        ::log::info!("[A2UI host] Connecting to {stream_url}");
        let response = http
            .get(stream_url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response, surface_id).await?;

        Ok(UiHost {
            http,
            base_url,
            processor: SurfaceProcessor::new(surface_id),
            events: event_texts(response).boxed(),
            is_connected: true,
        })
    }

    pub fn processor(&self) -> &SurfaceProcessor {
        &self.processor
    }

    /// Mutable access for interactions (`input_text`, `select_option`, `click`)
    pub fn processor_mut(&mut self) -> &mut SurfaceProcessor {
        &mut self.processor
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Wait for the next stream event and apply it.
    ///
    /// Returns `None` once the stream has ended. Comment-only events and
    /// malformed frames produce no processor events and are skipped.
    pub async fn next_events(&mut self) -> Result<Option<Vec<ProcessorEvent>>, HostError> {
        while let Some(event) = self.events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    self.is_connected = false;
                    return Err(e.into());
                }
            };

            let mut events = Vec::new();
            for payload in data_payloads(&event) {
                if let Ok(processed) = self.processor.process_json(payload) {
                    events.extend(processed);
                }
            }
            if !events.is_empty() {
                return Ok(Some(events));
            }
        }

        if self.is_connected {
            ::log::info!("[A2UI host] Stream of {} ended", self.processor.surface_id());
        }
        self.is_connected = false;
        Ok(None)
    }

    /// Post a user action to the UI server
    pub async fn send_action(&self, action: &UserAction) -> Result<(), HostError> {
        let url = self
            .base_url
            .join("/ui/event")
            .map_err(|source| HostError::InvalidAddress {
                address: self.base_url.to_string(),
                source,
            })?;

        ::log::info!("[A2UI host] Sending action {}", action.name);
        let response = self
            .http
            .post(url)
            .json(&A2uiMessage::UserAction(action.clone()))
            .send()
            .await?;
        check_status(response, &action.surface_id).await?;
        Ok(())
    }

    /// Send every action queued by the processor, in order.
    pub async fn flush_actions(&mut self) -> Result<usize, HostError> {
        let actions = self.processor.take_pending_actions();
        for action in &actions {
            self.send_action(action).await?;
        }
        Ok(actions.len())
    }
}

async fn check_status(
    response: reqwest::Response,
    surface_id: &str,
) -> Result<reqwest::Response, HostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::CONFLICT {
        return Err(HostError::NoActiveStream(surface_id.to_string()));
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(HostError::Status {
        status: status.as_u16(),
        body,
    })
}

fn event_texts(
    response: reqwest::Response,
) -> impl futures::Stream<Item = Result<String, reqwest::Error>> {
    async_stream::try_stream! {
        let mut decoder = FrameDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in decoder.push(&chunk) {
                yield event;
            }
        }

        if let Some(tail) = decoder.finish() {
            ::log::debug!("[A2UI host] Unterminated data at end of stream: {tail:?}");
        }
    }
}

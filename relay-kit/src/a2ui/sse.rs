//! SSE (Server-Sent Events) Transport Layer
//!
//! Frame codec shared by the agent RPC client, the UI host and the surface emitter.
//! SSE format:
//! - Lines starting with "data:" contain JSON payload
//! - Lines starting with ":" are comments (keep-alive pings)
//! - A blank line (double newline) ends an event
//!
//! Decoding is transport independent: bytes go into a [`FrameDecoder`] in whatever
//! chunks the network produced them, and complete event texts come out.

use serde::Serialize;

/// Delimiter between two events on the wire.
pub const FRAME_DELIMITER: &str = "\n\n";

/// A single outgoing frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Data event with JSON payload
    Data(String),
    /// Comment (keep-alive)
    Comment(String),
}

impl SseFrame {
    /// Serialize `value` as the payload of a data frame.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(SseFrame::Data)
    }

    /// The bare comment frame (`":\n\n"`) used as stream preamble and heartbeat.
    pub fn heartbeat() -> Self {
        SseFrame::Comment(String::new())
    }

    /// Encode the frame in wire format, delimiter included.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        match self {
            SseFrame::Data(data) => {
                for line in data.split('\n') {
                    out.push_str("data: ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
            SseFrame::Comment(text) => {
                for line in text.split('\n') {
                    out.push(':');
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out.push('\n');
        out
    }
}

/// Split every complete event out of `buffer`.
///
/// Returns the event texts (delimiter stripped) and the incomplete remainder,
/// which must be kept and prefixed to the next read.
pub fn extract_frames(buffer: &str) -> (Vec<&str>, &str) {
    let mut frames = Vec::new();
    let mut rest = buffer;

    while let Some(idx) = rest.find(FRAME_DELIMITER) {
        frames.push(&rest[..idx]);
        rest = &rest[idx + FRAME_DELIMITER.len()..];
    }

    (frames, rest)
}

/// Payloads of the `data:` lines of one event, trimmed.
///
/// Comment lines, other SSE fields and empty payloads are skipped.
pub fn data_payloads(event: &str) -> impl Iterator<Item = &str> {
    event.lines().filter_map(|line| {
        let payload = line.trim().strip_prefix("data:")?.trim();
        (!payload.is_empty()).then_some(payload)
    })
}

/// Incremental decoder state: raw bytes not yet valid UTF-8, and decoded text
/// not yet terminated by a delimiter.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending_bytes: Vec<u8>,
    pending_text: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read. Returns every event completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending_bytes.extend_from_slice(chunk);
        self.decode_pending();

        let (frames, consumed) = {
            let (frames, rest) = extract_frames(&self.pending_text);
            let frames: Vec<String> = frames.into_iter().map(str::to_owned).collect();
            (frames, self.pending_text.len() - rest.len())
        };
        self.pending_text.drain(..consumed);
        frames
    }

    /// Text received after the last delimiter.
    pub fn pending_text(&self) -> &str {
        &self.pending_text
    }

    /// Flush whatever is left once the stream ends.
    ///
    /// Returns the unterminated tail, if any. It is never a complete event.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            self.pending_text
                .push_str(&String::from_utf8_lossy(&self.pending_bytes));
            self.pending_bytes.clear();
        }

        let tail = std::mem::take(&mut self.pending_text);
        if tail.trim().is_empty() { None } else { Some(tail) }
    }

    /// Move the longest decodable prefix of `pending_bytes` into `pending_text`.
    ///
    /// An incomplete multi-byte sequence at the end stays buffered; invalid
    /// sequences are replaced with U+FFFD.
    fn decode_pending(&mut self) {
        loop {
            let (valid, error_len) = match std::str::from_utf8(&self.pending_bytes) {
                Ok(text) => {
                    self.pending_text.push_str(text);
                    self.pending_bytes.clear();
                    return;
                }
                Err(err) => (err.valid_up_to(), err.error_len()),
            };

            self.pending_text
                .push_str(&String::from_utf8_lossy(&self.pending_bytes[..valid]));

            match error_len {
                Some(len) => {
                    self.pending_text.push(char::REPLACEMENT_CHARACTER);
                    self.pending_bytes.drain(..valid + len);
                }
                None => {
                    self.pending_bytes.drain(..valid);
                    return;
                }
            }
        }
    }
}

//! Server-sent event parsing for streaming converters.
//!
//! Providers stream completions as `text/event-stream` bodies. [`events`]
//! decodes the line protocol, [`json_events`] keeps only JSON payloads, and
//! [`text_deltas`] turns those into a [`StreamResult`] given a function that
//! picks the text delta out of each event.
//!
//! Malformed frames never fail the stream: comment lines (keep-alives), the
//! `[DONE]` sentinel and `data:` payloads that are not JSON are skipped.

use crate::error::PlatformError;
use crate::raw::ByteStream;
use crate::result::{Metadata, StreamResult};
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use serde_json::Value;

/// A dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSentEvent {
    /// The `event:` field, if present.
    pub event: Option<String>,
    /// The `data:` lines, joined with `\n`.
    pub data: String,
    /// The `id:` field, if present.
    pub id: Option<String>,
}

#[derive(Default)]
struct PendingEvent {
    event: Option<String>,
    data: String,
    id: Option<String>,
    has_data: bool,
}

impl PendingEvent {
    fn feed(&mut self, line: &str) -> Option<ServerSentEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            tracing::trace!(comment = line, "Skipping SSE comment");
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => tracing::trace!(field, "Ignoring SSE field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<ServerSentEvent> {
        let pending = core::mem::take(self);
        pending.has_data.then(|| ServerSentEvent {
            event: pending.event,
            data: pending.data,
            id: pending.id,
        })
    }
}

/// Decodes a `text/event-stream` body into events.
///
/// Lines may be split across chunks; they are buffered until complete.
pub fn events(body: ByteStream) -> impl Stream<Item = Result<ServerSentEvent, PlatformError>> + Send {
    try_stream! {
        let mut body = body;
        let mut buffer: Vec<u8> = Vec::new();
        let mut pending = PendingEvent::default();
        // Bytes of `buffer` already known to hold no newline.
        let mut scanned = 0;

        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);

            while let Some(offset) = buffer[scanned..].iter().position(|byte| *byte == b'\n') {
                let end = scanned + offset;
                scanned = 0;
                let raw: Vec<u8> = buffer.drain(..=end).collect();
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches(['\n', '\r']);
                tracing::trace!(line, "SSE line");
                if let Some(event) = pending.feed(line) {
                    yield event;
                }
            }
            scanned = buffer.len();
        }

        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer).trim_end_matches('\r').to_string();
            if let Some(event) = pending.feed(&line) {
                yield event;
            }
        }
        if let Some(event) = pending.dispatch() {
            yield event;
        }
    }
}

/// Decodes a `text/event-stream` body into JSON payloads.
///
/// The `[DONE]` sentinel and non-JSON payloads are skipped.
pub fn json_events(body: ByteStream) -> impl Stream<Item = Result<Value, PlatformError>> + Send {
    try_stream! {
        let mut events = Box::pin(events(body));

        while let Some(event) = events.next().await {
            let event = event?;
            let data = event.data.trim();
            if data.is_empty() || data == "[DONE]" {
                continue;
            }
            match serde_json::from_str::<Value>(data) {
                Ok(value) => yield value,
                Err(err) => tracing::warn!(error = %err, data, "Skipping malformed SSE payload"),
            }
        }
    }
}

/// Builds a [`StreamResult`] from a `text/event-stream` body.
///
/// `extract` is called for every JSON event. It returns the text delta the
/// event carries, if any, and may record trailing information (usage,
/// citations) in the metadata, which becomes the stream's trailer.
///
/// ```
/// use bytes::Bytes;
/// use lodestar_platform::stream::text_deltas;
///
/// # async fn run() {
/// let body = futures::stream::iter([Ok::<_, lodestar_platform::PlatformError>(
///     Bytes::from_static(b": keep-alive\n\ndata: {\"delta\":\"Hi\"}\n\ndata: [DONE]\n\n"),
/// )]);
///
/// let stream = text_deltas(Box::pin(body), |event, _| {
///     event["delta"].as_str().map(str::to_string)
/// });
/// let (text, _) = stream.into_text().await.unwrap();
/// assert_eq!(text, "Hi");
/// # }
/// ```
pub fn text_deltas<F>(body: ByteStream, extract: F) -> StreamResult
where
    F: FnMut(&Value, &mut Metadata) -> Option<String> + Send + 'static,
{
    StreamResult::with_trailer(move |trailer| {
        try_stream! {
            let mut extract = extract;
            let mut metadata = Metadata::new();
            let mut events = Box::pin(json_events(body));

            while let Some(event) = events.next().await {
                let event = event?;
                if let Some(delta) = extract(&event, &mut metadata) {
                    if !delta.is_empty() {
                        yield delta;
                    }
                }
            }

            trailer.send(metadata);
        }
    })
}

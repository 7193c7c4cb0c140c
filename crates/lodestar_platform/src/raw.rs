//! Provider-native responses.

use crate::error::PlatformError;
use bytes::Bytes;
use core::pin::Pin;
use core::time::Duration;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use serde_json::Value;

/// A stream of response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, PlatformError>> + Send>>;

/// The body of a [`RawResult`] beyond its decoded JSON.
#[derive(Default)]
pub enum RawBody {
    /// Nothing beyond the decoded JSON.
    #[default]
    Empty,
    /// A fully buffered binary body (audio, images).
    Bytes(Bytes),
    /// A body still being received, consumed by streaming converters.
    Stream(ByteStream),
}

impl core::fmt::Debug for RawBody {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A provider response before conversion.
///
/// This is the only place provider-native shapes appear. It is owned by the
/// [`DeferredResult`](crate::result::DeferredResult) that wraps it and handed
/// to the converter by mutable reference, so a converter can take the stream
/// or body out of it.
#[derive(Debug, Default)]
pub struct RawResult {
    data: Value,
    body: RawBody,
}

impl RawResult {
    /// Creates a result from a decoded JSON body.
    #[must_use]
    pub fn json(data: Value) -> Self {
        Self {
            data,
            body: RawBody::Empty,
        }
    }

    /// Creates a result from a binary body.
    #[must_use]
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            data: Value::Null,
            body: RawBody::Bytes(bytes.into()),
        }
    }

    /// Creates a result from a body stream.
    #[must_use]
    pub fn streaming(stream: ByteStream) -> Self {
        Self {
            data: Value::Null,
            body: RawBody::Stream(stream),
        }
    }

    /// Attaches decoded JSON (e.g. response headers of interest) to the result.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Returns the decoded JSON body.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns whether the body is a stream.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self.body, RawBody::Stream(_))
    }

    /// Takes the body stream out of the result.
    ///
    /// Returns `None` if the body is not a stream or was already taken.
    pub fn take_stream(&mut self) -> Option<ByteStream> {
        match core::mem::take(&mut self.body) {
            RawBody::Stream(stream) => Some(stream),
            other => {
                self.body = other;
                None
            }
        }
    }

    /// Takes the binary body out of the result.
    pub fn take_bytes(&mut self) -> Option<Bytes> {
        match core::mem::take(&mut self.body) {
            RawBody::Bytes(bytes) => Some(bytes),
            other => {
                self.body = other;
                None
            }
        }
    }

    /// Reads an HTTP response into a raw result.
    ///
    /// With `stream` set, the body is left unread and exposed as a
    /// [`ByteStream`]. Otherwise JSON bodies are decoded and any other
    /// content type is buffered as bytes.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::RateLimited`] on HTTP 429, with the `Retry-After` hint.
    /// - [`PlatformError::Provider`] on any other non-success status.
    /// - [`PlatformError::Http`] if the body cannot be read.
    /// - [`PlatformError::InvalidResponse`] if a JSON body does not parse.
    pub async fn from_http_response(
        response: reqwest::Response,
        stream: bool,
    ) -> Result<Self, PlatformError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PlatformError::RateLimited {
                retry_after: retry_after(response.headers()),
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .map_err(|err| PlatformError::Http(err.to_string()))?;
            return Err(PlatformError::Provider {
                status: Some(status.as_u16()),
                message,
            });
        }

        if stream {
            let chunks = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|err| PlatformError::Http(err.to_string())));
            return Ok(Self::streaming(Box::pin(chunks)));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("json"));

        let body = response
            .bytes()
            .await
            .map_err(|err| PlatformError::Http(err.to_string()))?;

        if is_json {
            let data = serde_json::from_slice(&body).map_err(|err| {
                PlatformError::InvalidResponse(format!(
                    "Failed to parse response: {err}\nBody: {}",
                    String::from_utf8_lossy(&body)
                ))
            })?;
            Ok(Self::json(data))
        } else {
            Ok(Self::bytes(body))
        }
    }
}

/// Reads a `Retry-After` header given in seconds or as an HTTP date.
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    (at.with_timezone(&chrono::Utc) - chrono::Utc::now())
        .to_std()
        .ok()
}

//! Streamed text results.

use super::Metadata;
use crate::error::PlatformError;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::stream::{BoxStream, Fuse};
use futures::{Stream, StreamExt};
use tokio::sync::oneshot;

/// A single-pass stream of text fragments with an optional trailer.
///
/// Reading happens in two phases. Chunks are pulled through the
/// [`Stream`] implementation; once the stream is exhausted the producer may
/// deliver trailing metadata (token usage, citations) which
/// [`finalize`](Self::finalize) resolves to.
///
/// The stream is forward-only: after it ends every further poll yields
/// `None`, so a second pass is empty.
///
/// ```
/// use futures::StreamExt;
/// use lodestar_platform::result::{Metadata, StreamResult};
///
/// # async fn run() {
/// let (mut stream, trailer) = StreamResult::channel(futures::stream::iter([
///     Ok("Hel".to_string()),
///     Ok("lo".to_string()),
/// ]));
/// let mut usage = Metadata::new();
/// usage.insert("output_tokens", 2);
/// trailer.send(usage);
///
/// let mut text = String::new();
/// while let Some(chunk) = stream.next().await {
///     text.push_str(&chunk.unwrap());
/// }
/// assert_eq!(text, "Hello");
/// assert_eq!(stream.finalize().await.get("output_tokens"), Some(&serde_json::json!(2)));
/// # }
/// ```
pub struct StreamResult {
    chunks: Fuse<BoxStream<'static, Result<String, PlatformError>>>,
    trailer: Option<oneshot::Receiver<Metadata>>,
}

/// The producer side of a [`StreamResult`] trailer.
#[derive(Debug)]
pub struct TrailerSender(oneshot::Sender<Metadata>);

impl TrailerSender {
    /// Delivers the trailing metadata. Dropping the sender instead delivers
    /// empty metadata.
    pub fn send(self, metadata: Metadata) {
        // The receiver is gone only if the stream result was dropped.
        let _ = self.0.send(metadata);
    }
}

impl StreamResult {
    /// Creates a stream result without a trailer.
    #[must_use]
    pub fn new(chunks: impl Stream<Item = Result<String, PlatformError>> + Send + 'static) -> Self {
        Self {
            chunks: chunks.boxed().fuse(),
            trailer: None,
        }
    }

    /// Creates a stream result paired with the sender for its trailer.
    #[must_use]
    pub fn channel(
        chunks: impl Stream<Item = Result<String, PlatformError>> + Send + 'static,
    ) -> (Self, TrailerSender) {
        let (sender, receiver) = oneshot::channel();
        let stream = Self {
            chunks: chunks.boxed().fuse(),
            trailer: Some(receiver),
        };
        (stream, TrailerSender(sender))
    }

    /// Creates a stream result whose producer owns the trailer sender.
    ///
    /// `build` receives the sender and returns the chunk stream; the stream
    /// sends the trailer once it has produced its last chunk.
    #[must_use]
    pub fn with_trailer<S, F>(build: F) -> Self
    where
        F: FnOnce(TrailerSender) -> S,
        S: Stream<Item = Result<String, PlatformError>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        Self {
            chunks: build(TrailerSender(sender)).boxed().fuse(),
            trailer: Some(receiver),
        }
    }

    /// Creates a stream result yielding fixed chunks.
    #[must_use]
    pub fn from_chunks<S: Into<String>>(chunks: impl IntoIterator<Item = S>) -> Self {
        let chunks: Vec<_> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(futures::stream::iter(chunks))
    }

    /// Returns whether the chunk stream has ended.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        futures::stream::FusedStream::is_terminated(&self.chunks)
    }

    /// Resolves the trailing metadata.
    ///
    /// Any chunks not yet read are drained and discarded first, since the
    /// producer only sends the trailer after its last chunk.
    pub async fn finalize(mut self) -> Metadata {
        while self.chunks.next().await.is_some() {}
        match self.trailer.take() {
            Some(receiver) => receiver.await.unwrap_or_default(),
            None => Metadata::new(),
        }
    }

    /// Reads the whole stream into a string, then resolves the trailer.
    ///
    /// # Errors
    ///
    /// Returns the first chunk error.
    pub async fn into_text(mut self) -> Result<(String, Metadata), PlatformError> {
        let mut text = String::new();
        while let Some(chunk) = self.chunks.next().await {
            text.push_str(&chunk?);
        }
        Ok((text, self.finalize().await))
    }
}

impl Stream for StreamResult {
    type Item = Result<String, PlatformError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.chunks.poll_next_unpin(cx)
    }
}

impl core::fmt::Debug for StreamResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StreamResult")
            .field("terminated", &self.is_terminated())
            .field("has_trailer", &self.trailer.is_some())
            .finish()
    }
}

//! Lazily converted results.

use super::{ModelResult, StreamResult};
use crate::error::{PlatformError, ResultError};
use crate::raw::RawResult;
use crate::transport::ResultConverter;
use lodestar_models::{Options, ToolCall, Vector};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

enum State {
    Pending(Arc<dyn ResultConverter>),
    Converting,
    Ready(ModelResult),
    Failed(String),
}

/// A platform response whose conversion has not necessarily happened yet.
///
/// The converter selected at dispatch time runs the first time the result is
/// read; its output is memoized, so the converter runs at most once no matter
/// how many accessors are called. A failed conversion is memoized too:
/// later reads return [`ResultError::ConversionFailed`].
pub struct DeferredResult {
    state: State,
    raw: RawResult,
    options: Options,
}

impl DeferredResult {
    /// Creates a pending result.
    #[must_use]
    pub fn new(converter: Arc<dyn ResultConverter>, raw: RawResult, options: Options) -> Self {
        Self {
            state: State::Pending(converter),
            raw,
            options,
        }
    }

    /// Creates an already converted result.
    #[must_use]
    pub fn ready(result: ModelResult) -> Self {
        Self {
            state: State::Ready(result),
            raw: RawResult::default(),
            options: Options::new(),
        }
    }

    /// Returns whether the converter has already run.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, State::Ready(_) | State::Failed(_))
    }

    /// Returns the raw provider response.
    ///
    /// A streaming converter takes the body stream out of it during conversion.
    #[must_use]
    pub fn raw_result(&self) -> &RawResult {
        &self.raw
    }

    /// Returns the options the call was made with.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    async fn resolve(&mut self) -> Result<(), PlatformError> {
        let converter = match core::mem::replace(&mut self.state, State::Converting) {
            State::Pending(converter) => converter,
            State::Converting => {
                // A previous conversion future was dropped mid-flight.
                let message = "conversion was cancelled".to_string();
                self.state = State::Failed(message.clone());
                return Err(ResultError::ConversionFailed(message).into());
            }
            State::Failed(message) => {
                self.state = State::Failed(message.clone());
                return Err(ResultError::ConversionFailed(message).into());
            }
            ready @ State::Ready(_) => {
                self.state = ready;
                return Ok(());
            }
        };

        match converter.convert(&mut self.raw, &self.options).await {
            Ok(result) => {
                self.state = State::Ready(result);
                Ok(())
            }
            Err(err) => {
                tracing::debug!(error = %err, "Result conversion failed");
                self.state = State::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Converts the response if needed and returns the result.
    ///
    /// # Errors
    ///
    /// Returns the converter's error, or [`ResultError::ConversionFailed`] if
    /// an earlier conversion failed.
    pub async fn result(&mut self) -> Result<&ModelResult, PlatformError> {
        self.result_mut().await.map(|result| &*result)
    }

    /// Converts the response if needed and returns the result for modification.
    ///
    /// # Errors
    ///
    /// Same as [`result`](Self::result).
    pub async fn result_mut(&mut self) -> Result<&mut ModelResult, PlatformError> {
        self.resolve().await?;
        match &mut self.state {
            State::Ready(result) => Ok(result),
            State::Failed(message) => Err(ResultError::ConversionFailed(message.clone()).into()),
            State::Pending(_) | State::Converting => Err(ResultError::ConversionFailed(
                "result was not converted".to_string(),
            )
            .into()),
        }
    }

    /// Converts the response if needed and takes the result.
    ///
    /// # Errors
    ///
    /// Same as [`result`](Self::result).
    pub async fn into_result(mut self) -> Result<ModelResult, PlatformError> {
        self.resolve().await?;
        match self.state {
            State::Ready(result) => Ok(result),
            State::Failed(message) => Err(ResultError::ConversionFailed(message).into()),
            State::Pending(_) | State::Converting => Err(ResultError::ConversionFailed(
                "result was not converted".to_string(),
            )
            .into()),
        }
    }

    /// Returns the text of a text result.
    ///
    /// # Errors
    ///
    /// Returns a conversion error, or [`ResultError::UnexpectedKind`].
    pub async fn as_text(&mut self) -> Result<&str, PlatformError> {
        Ok(self.result().await?.as_text()?)
    }

    /// Returns the value of an object result.
    ///
    /// # Errors
    ///
    /// Returns a conversion error, or [`ResultError::UnexpectedKind`].
    pub async fn as_object(&mut self) -> Result<&Value, PlatformError> {
        Ok(self.result().await?.as_object()?)
    }

    /// Decodes an object result into `T`.
    ///
    /// # Errors
    ///
    /// Returns a conversion error, [`ResultError::UnexpectedKind`] or
    /// [`ResultError::Deserialize`].
    pub async fn as_deserialized<T: DeserializeOwned>(&mut self) -> Result<T, PlatformError> {
        Ok(self.result().await?.as_deserialized()?)
    }

    /// Returns the vectors of a vector result.
    ///
    /// # Errors
    ///
    /// Returns a conversion error, or [`ResultError::UnexpectedKind`].
    pub async fn as_vectors(&mut self) -> Result<&[Vector], PlatformError> {
        Ok(self.result().await?.as_vectors()?)
    }

    /// Returns the calls of a tool-call result.
    ///
    /// # Errors
    ///
    /// Returns a conversion error, or [`ResultError::UnexpectedKind`].
    pub async fn as_tool_calls(&mut self) -> Result<&[ToolCall], PlatformError> {
        Ok(self.result().await?.as_tool_calls()?)
    }

    /// Returns the bytes and MIME type of a binary result.
    ///
    /// # Errors
    ///
    /// Returns a conversion error, or [`ResultError::UnexpectedKind`].
    pub async fn as_binary(&mut self) -> Result<(&bytes::Bytes, Option<&str>), PlatformError> {
        Ok(self.result().await?.as_binary()?)
    }

    /// Converts the response and takes the stream out of a stream result.
    ///
    /// # Errors
    ///
    /// Returns a conversion error, or [`ResultError::UnexpectedKind`].
    pub async fn into_stream(self) -> Result<StreamResult, PlatformError> {
        Ok(self.into_result().await?.into_stream()?)
    }
}

impl core::fmt::Debug for DeferredResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = match &self.state {
            State::Pending(_) => "pending",
            State::Converting => "converting",
            State::Ready(_) => "ready",
            State::Failed(_) => "failed",
        };
        f.debug_struct("DeferredResult")
            .field("state", &state)
            .field("raw", &self.raw)
            .field("options", &self.options)
            .finish()
    }
}

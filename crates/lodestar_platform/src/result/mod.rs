//! Converted results.
//!
//! A [`ModelResult`] is a closed sum over everything a model can return,
//! plus a [`Metadata`] side channel that output processors may write to.
//! Accessors such as [`ModelResult::as_text`] check the kind and fail with
//! [`ResultError::UnexpectedKind`] instead of panicking.
//!
//! Platforms return a [`DeferredResult`], which runs the provider converter
//! the first time the result is read.

mod deferred;
mod stream;

pub use deferred::DeferredResult;
pub use stream::{StreamResult, TrailerSender};

use crate::error::ResultError;
use bytes::Bytes;
use lodestar_models::{ToolCall, Vector};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────
// Metadata
// ─────────────────────────────────────────────────────────────────────

/// Out-of-band information attached to a result (token usage, citations,
/// cache annotations).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Removes an entry.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Copies every entry of `other` into `self`, replacing existing keys.
    pub fn merge(&mut self, other: Metadata) {
        self.0.extend(other.0);
    }

    /// Returns whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the entries.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Result kinds
// ─────────────────────────────────────────────────────────────────────

/// What a model returned.
#[derive(Debug)]
pub enum ResultKind {
    /// Generated text.
    Text(String),
    /// Tool calls requested by the model.
    ToolCalls(Vec<ToolCall>),
    /// Streamed text fragments.
    Stream(StreamResult),
    /// Embeddings.
    Vectors(Vec<Vector>),
    /// A structured value (structured output, decoded JSON).
    Object(Value),
    /// Binary output (speech, images).
    Binary {
        /// The raw bytes.
        data: Bytes,
        /// MIME type of the data.
        mime_type: Option<String>,
    },
    /// Several alternative results.
    Choices(Vec<ModelResult>),
}

impl ResultKind {
    /// Returns the name of the kind, as used in errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::ToolCalls(_) => "tool_calls",
            Self::Stream(_) => "stream",
            Self::Vectors(_) => "vectors",
            Self::Object(_) => "object",
            Self::Binary { .. } => "binary",
            Self::Choices(_) => "choices",
        }
    }
}

/// A converted model result.
#[derive(Debug)]
pub struct ModelResult {
    kind: ResultKind,
    metadata: Metadata,
}

macro_rules! unexpected {
    ($expected:literal, $kind:expr) => {
        ResultError::UnexpectedKind {
            expected: $expected,
            actual: $kind.name(),
        }
    };
}

impl ModelResult {
    /// Creates a result with empty metadata.
    #[must_use]
    pub fn new(kind: ResultKind) -> Self {
        Self {
            kind,
            metadata: Metadata::new(),
        }
    }

    /// Creates a text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ResultKind::Text(text.into()))
    }

    /// Creates a tool-call result.
    #[must_use]
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self::new(ResultKind::ToolCalls(calls))
    }

    /// Creates a stream result.
    #[must_use]
    pub fn stream(stream: StreamResult) -> Self {
        Self::new(ResultKind::Stream(stream))
    }

    /// Creates a vector result.
    #[must_use]
    pub fn vectors(vectors: Vec<Vector>) -> Self {
        Self::new(ResultKind::Vectors(vectors))
    }

    /// Creates an object result.
    #[must_use]
    pub fn object(value: Value) -> Self {
        Self::new(ResultKind::Object(value))
    }

    /// Creates a binary result.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>, mime_type: Option<String>) -> Self {
        Self::new(ResultKind::Binary {
            data: data.into(),
            mime_type,
        })
    }

    /// Creates a result holding alternatives.
    #[must_use]
    pub fn choices(choices: Vec<ModelResult>) -> Self {
        Self::new(ResultKind::Choices(choices))
    }

    /// Replaces the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the result kind.
    #[must_use]
    pub fn kind(&self) -> &ResultKind {
        &self.kind
    }

    /// Consumes the result, returning its kind.
    #[must_use]
    pub fn into_kind(self) -> ResultKind {
        self.kind
    }

    /// Returns the metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Returns the metadata for modification.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Returns whether this is a stream result.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self.kind, ResultKind::Stream(_))
    }

    /// Returns the text of a text result.
    ///
    /// # Errors
    ///
    /// Returns [`ResultError::UnexpectedKind`] for any other kind.
    pub fn as_text(&self) -> Result<&str, ResultError> {
        match &self.kind {
            ResultKind::Text(text) => Ok(text),
            kind => Err(unexpected!("text", kind)),
        }
    }

    /// Returns the value of an object result.
    ///
    /// # Errors
    ///
    /// Returns [`ResultError::UnexpectedKind`] for any other kind.
    pub fn as_object(&self) -> Result<&Value, ResultError> {
        match &self.kind {
            ResultKind::Object(value) => Ok(value),
            kind => Err(unexpected!("object", kind)),
        }
    }

    /// Decodes an object result into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ResultError::UnexpectedKind`] for any other kind, or
    /// [`ResultError::Deserialize`] if the value does not match `T`.
    pub fn as_deserialized<T: DeserializeOwned>(&self) -> Result<T, ResultError> {
        Ok(T::deserialize(self.as_object()?)?)
    }

    /// Returns the vectors of a vector result.
    ///
    /// # Errors
    ///
    /// Returns [`ResultError::UnexpectedKind`] for any other kind.
    pub fn as_vectors(&self) -> Result<&[Vector], ResultError> {
        match &self.kind {
            ResultKind::Vectors(vectors) => Ok(vectors),
            kind => Err(unexpected!("vectors", kind)),
        }
    }

    /// Returns the calls of a tool-call result.
    ///
    /// # Errors
    ///
    /// Returns [`ResultError::UnexpectedKind`] for any other kind.
    pub fn as_tool_calls(&self) -> Result<&[ToolCall], ResultError> {
        match &self.kind {
            ResultKind::ToolCalls(calls) => Ok(calls),
            kind => Err(unexpected!("tool_calls", kind)),
        }
    }

    /// Returns the bytes and MIME type of a binary result.
    ///
    /// # Errors
    ///
    /// Returns [`ResultError::UnexpectedKind`] for any other kind.
    pub fn as_binary(&self) -> Result<(&Bytes, Option<&str>), ResultError> {
        match &self.kind {
            ResultKind::Binary { data, mime_type } => Ok((data, mime_type.as_deref())),
            kind => Err(unexpected!("binary", kind)),
        }
    }

    /// Returns the alternatives of a choice result.
    ///
    /// # Errors
    ///
    /// Returns [`ResultError::UnexpectedKind`] for any other kind.
    pub fn as_choices(&self) -> Result<&[ModelResult], ResultError> {
        match &self.kind {
            ResultKind::Choices(choices) => Ok(choices),
            kind => Err(unexpected!("choices", kind)),
        }
    }

    /// Takes the stream out of a stream result.
    ///
    /// # Errors
    ///
    /// Returns [`ResultError::UnexpectedKind`] for any other kind.
    pub fn into_stream(self) -> Result<StreamResult, ResultError> {
        match self.kind {
            ResultKind::Stream(stream) => Ok(stream),
            kind => Err(unexpected!("stream", kind)),
        }
    }

    /// Clones a materialized result.
    ///
    /// Returns `None` for stream results (and choices containing one), which
    /// are single-pass and cannot be duplicated.
    #[must_use]
    pub fn try_clone(&self) -> Option<Self> {
        let kind = match &self.kind {
            ResultKind::Text(text) => ResultKind::Text(text.clone()),
            ResultKind::ToolCalls(calls) => ResultKind::ToolCalls(calls.clone()),
            ResultKind::Stream(_) => return None,
            ResultKind::Vectors(vectors) => ResultKind::Vectors(vectors.clone()),
            ResultKind::Object(value) => ResultKind::Object(value.clone()),
            ResultKind::Binary { data, mime_type } => ResultKind::Binary {
                data: data.clone(),
                mime_type: mime_type.clone(),
            },
            ResultKind::Choices(choices) => ResultKind::Choices(
                choices
                    .iter()
                    .map(Self::try_clone)
                    .collect::<Option<Vec<_>>>()?,
            ),
        };
        Some(Self {
            kind,
            metadata: self.metadata.clone(),
        })
    }
}

//! Result caches.

use crate::error::PlatformError;
use crate::result::{Metadata, ModelResult, ResultKind};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use lodestar_models::{ToolCall, Vector};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A serializable snapshot of a materialized [`ModelResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    /// The result payload.
    pub kind: CachedKind,
    /// Metadata present when the result was stored.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// When the result was stored.
    pub cached_at: DateTime<Utc>,
}

/// Payload of a [`CachedResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachedKind {
    /// Generated text.
    Text {
        /// The text.
        text: String,
    },
    /// Tool calls.
    ToolCalls {
        /// The calls.
        calls: Vec<ToolCall>,
    },
    /// Embeddings.
    Vectors {
        /// The vectors.
        vectors: Vec<Vector>,
    },
    /// A structured value.
    Object {
        /// The value.
        value: Value,
    },
    /// Binary output.
    Binary {
        /// Base64-encoded bytes.
        data: String,
        /// MIME type of the data.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    /// Alternatives.
    Choices {
        /// The alternatives.
        choices: Vec<CachedKind>,
    },
}

impl CachedKind {
    fn snapshot(kind: &ResultKind) -> Option<Self> {
        Some(match kind {
            ResultKind::Text(text) => Self::Text { text: text.clone() },
            ResultKind::ToolCalls(calls) => Self::ToolCalls {
                calls: calls.clone(),
            },
            ResultKind::Stream(_) => return None,
            ResultKind::Vectors(vectors) => Self::Vectors {
                vectors: vectors.clone(),
            },
            ResultKind::Object(value) => Self::Object {
                value: value.clone(),
            },
            ResultKind::Binary { data, mime_type } => Self::Binary {
                data: STANDARD.encode(data),
                mime_type: mime_type.clone(),
            },
            ResultKind::Choices(choices) => Self::Choices {
                choices: choices
                    .iter()
                    .map(|choice| Self::snapshot(choice.kind()))
                    .collect::<Option<_>>()?,
            },
        })
    }

    fn restore(self) -> Result<ResultKind, PlatformError> {
        Ok(match self {
            Self::Text { text } => ResultKind::Text(text),
            Self::ToolCalls { calls } => ResultKind::ToolCalls(calls),
            Self::Vectors { vectors } => ResultKind::Vectors(vectors),
            Self::Object { value } => ResultKind::Object(value),
            Self::Binary { data, mime_type } => ResultKind::Binary {
                data: STANDARD
                    .decode(data)
                    .map_err(|err| PlatformError::InvalidResponse(format!("corrupt cache entry: {err}")))?
                    .into(),
                mime_type,
            },
            Self::Choices { choices } => ResultKind::Choices(
                choices
                    .into_iter()
                    .map(|choice| choice.restore().map(ModelResult::new))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

impl CachedResult {
    /// Snapshots `result`.
    ///
    /// Returns `None` for stream results, which are single-pass.
    #[must_use]
    pub fn from_result(result: &ModelResult, cached_at: DateTime<Utc>) -> Option<Self> {
        Some(Self {
            kind: CachedKind::snapshot(result.kind())?,
            metadata: result.metadata().as_map().clone(),
            cached_at,
        })
    }

    /// Rebuilds the result.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidResponse`] if a binary payload is not
    /// valid base64.
    pub fn into_result(self) -> Result<ModelResult, PlatformError> {
        Ok(ModelResult::new(self.kind.restore()?).with_metadata(Metadata::from(self.metadata)))
    }
}

// ─────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────

/// A tag-aware result store.
///
/// Entries carry tags (model names) so every result of a model can be
/// dropped at once with [`invalidate_tags`](Self::invalidate_tags).
#[async_trait]
pub trait Cache: Send + Sync + 'static {
    /// Returns the entry stored under `key`.
    async fn get(&self, key: &str) -> Option<CachedResult>;

    /// Stores `value` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, value: CachedResult, tags: &[String]);

    /// Removes every entry carrying one of `tags`. Returns how many were removed.
    async fn invalidate_tags(&self, tags: &[String]) -> usize;
}

/// An in-process [`Cache`].
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (CachedResult, Vec<String>)>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<CachedResult> {
        self.entries.read().get(key).map(|(value, _)| value.clone())
    }

    async fn set(&self, key: &str, value: CachedResult, tags: &[String]) {
        self.entries
            .write()
            .insert(key.to_string(), (value, tags.to_vec()));
    }

    async fn invalidate_tags(&self, tags: &[String]) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, (_, entry_tags)| !entry_tags.iter().any(|tag| tags.contains(tag)));
        before - entries.len()
    }
}

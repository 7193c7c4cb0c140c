//! Scripted provider bridges and platforms for tests.
//!
//! Enabled by the `test-utils` feature.
//!
//! - [`MockTransport`] returns queued [`RawResult`]s and records requests.
//! - [`MockConverter`] understands a small JSON vocabulary
//!   (`{"text": ..}`, `{"object": ..}`, `{"tool_calls": [..]}`,
//!   `{"vectors": [[..]]}`) and SSE bodies carrying `{"delta": ..}` events.
//! - [`MockPlatform`] skips bridges entirely and returns queued
//!   [`ModelResult`]s.
//!
//! All three are cheap to clone; clones share their script and recordings,
//! so a test can keep a handle after moving one into a platform.

use crate::contract::RequestInput;
use crate::error::PlatformError;
use crate::platform::Platform;
use crate::raw::RawResult;
use crate::result::{DeferredResult, Metadata, ModelResult};
use crate::stream::text_deltas;
use crate::transport::{ResultConverter, Transport};
use async_trait::async_trait;
use lodestar_models::catalog::{FallbackModelCatalog, ModelCatalog};
use lodestar_models::{Model, Options, ToolCall, Vector};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type ModelPredicate = Arc<dyn Fn(&Model) -> bool + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────
// MockTransport
// ─────────────────────────────────────────────────────────────────────

/// A request received by a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Resolved model name.
    pub model: String,
    /// Normalized payload.
    pub payload: Value,
    /// Options as forwarded to the transport.
    pub options: Options,
}

/// A transport returning scripted raw results.
#[derive(Clone)]
pub struct MockTransport {
    supports: ModelPredicate,
    responses: Arc<Mutex<VecDeque<RawResult>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockTransport {
    /// Creates a transport supporting every model.
    #[must_use]
    pub fn new() -> Self {
        Self::supporting(|_| true)
    }

    /// Creates a transport supporting models accepted by `predicate`.
    #[must_use]
    pub fn supporting(predicate: impl Fn(&Model) -> bool + Send + Sync + 'static) -> Self {
        Self {
            supports: Arc::new(predicate),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a raw result.
    #[must_use]
    pub fn with_response(self, raw: RawResult) -> Self {
        self.responses.lock().push_back(raw);
        self
    }

    /// Queues a JSON response.
    #[must_use]
    pub fn with_json(self, data: Value) -> Self {
        self.with_response(RawResult::json(data))
    }

    /// Returns the requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Returns how many requests were received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn supports(&self, model: &Model) -> bool {
        (self.supports)(model)
    }

    async fn request(
        &self,
        model: &Model,
        payload: Value,
        options: &Options,
    ) -> Result<RawResult, PlatformError> {
        self.requests.lock().push(RecordedRequest {
            model: model.name().to_string(),
            payload,
            options: options.clone(),
        });
        self.responses.lock().pop_front().ok_or_else(|| {
            PlatformError::InvalidResponse(format!("no scripted response for '{}'", model.name()))
        })
    }
}

impl core::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued", &self.responses.lock().len())
            .field("requests", &self.request_count())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────
// MockConverter
// ─────────────────────────────────────────────────────────────────────

/// A converter for the scripted JSON vocabulary.
#[derive(Clone)]
pub struct MockConverter {
    supports: ModelPredicate,
    conversions: Arc<AtomicUsize>,
}

impl MockConverter {
    /// Creates a converter supporting every model.
    #[must_use]
    pub fn new() -> Self {
        Self::supporting(|_| true)
    }

    /// Creates a converter supporting models accepted by `predicate`.
    #[must_use]
    pub fn supporting(predicate: impl Fn(&Model) -> bool + Send + Sync + 'static) -> Self {
        Self {
            supports: Arc::new(predicate),
            conversions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns how many conversions ran.
    #[must_use]
    pub fn conversions(&self) -> usize {
        self.conversions.load(Ordering::SeqCst)
    }
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultConverter for MockConverter {
    fn supports(&self, model: &Model) -> bool {
        (self.supports)(model)
    }

    async fn convert(
        &self,
        raw: &mut RawResult,
        _: &Options,
    ) -> Result<ModelResult, PlatformError> {
        self.conversions.fetch_add(1, Ordering::SeqCst);

        if let Some(body) = raw.take_stream() {
            let stream = text_deltas(body, |event, metadata| {
                if let Some(usage) = event.get("usage") {
                    metadata.insert("usage", usage.clone());
                }
                event.get("delta").and_then(Value::as_str).map(str::to_string)
            });
            return Ok(ModelResult::stream(stream));
        }

        let data = raw.data();
        let mut metadata = Metadata::new();
        if let Some(usage) = data.get("usage") {
            metadata.insert("usage", usage.clone());
        }

        let result = if let Some(text) = data.get("text").and_then(Value::as_str) {
            ModelResult::text(text)
        } else if let Some(object) = data.get("object") {
            ModelResult::object(object.clone())
        } else if let Some(calls) = data.get("tool_calls") {
            let calls: Vec<ToolCall> = serde_json::from_value(calls.clone())
                .map_err(|err| PlatformError::InvalidResponse(err.to_string()))?;
            ModelResult::tool_calls(calls)
        } else if let Some(vectors) = data.get("vectors") {
            let vectors: Vec<Vector> = serde_json::from_value(vectors.clone())
                .map_err(|err| PlatformError::InvalidResponse(err.to_string()))?;
            ModelResult::vectors(vectors)
        } else {
            return Err(PlatformError::InvalidResponse(format!(
                "unrecognized mock response: {data}"
            )));
        };

        Ok(result.with_metadata(metadata))
    }
}

impl core::fmt::Debug for MockConverter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockConverter")
            .field("conversions", &self.conversions())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────
// MockPlatform
// ─────────────────────────────────────────────────────────────────────

/// An invocation received by a [`MockPlatform`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Model name as given by the caller.
    pub model: String,
    /// The request input.
    pub input: RequestInput,
    /// The options as given by the caller.
    pub options: Options,
}

/// A platform returning scripted results.
///
/// Model names resolve through a [`FallbackModelCatalog`] unless another
/// catalog is set.
#[derive(Clone)]
pub struct MockPlatform {
    results: Arc<Mutex<VecDeque<ModelResult>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    catalog: Arc<dyn ModelCatalog>,
}

impl MockPlatform {
    /// Creates a platform with no scripted results.
    #[must_use]
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            catalog: Arc::new(FallbackModelCatalog::new()),
        }
    }

    /// Queues a result.
    #[must_use]
    pub fn with_result(self, result: ModelResult) -> Self {
        self.push_result(result);
        self
    }

    /// Sets the catalog used to resolve names.
    #[must_use]
    pub fn with_catalog(mut self, catalog: impl ModelCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Queues a result on a shared handle.
    pub fn push_result(&self, result: ModelResult) {
        self.results.lock().push_back(result);
    }

    /// Returns the invocations received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns how many invocations were received.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn invoke(
        &self,
        model: &str,
        input: RequestInput,
        options: Options,
    ) -> Result<DeferredResult, PlatformError> {
        self.calls.lock().push(RecordedCall {
            model: model.to_string(),
            input,
            options,
        });
        let result = self.results.lock().pop_front().ok_or_else(|| {
            PlatformError::InvalidResponse(format!("no scripted result for '{model}'"))
        })?;
        Ok(DeferredResult::ready(result))
    }

    fn model_catalog(&self) -> &dyn ModelCatalog {
        self.catalog.as_ref()
    }
}

impl core::fmt::Debug for MockPlatform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockPlatform")
            .field("queued", &self.results.lock().len())
            .field("invocations", &self.invocations())
            .finish()
    }
}

//! Shared test helpers for platform integration tests.

#![allow(dead_code, reason = "not every test file uses every helper")]

use async_trait::async_trait;
use bytes::Bytes;
use lodestar_models::catalog::{CatalogEntry, StaticModelCatalog};
use lodestar_models::{Capability, Model, Options};
use lodestar_platform::{ModelResult, PlatformError, RawResult, ResultConverter, Transport};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A catalog with one chat model per family used in the tests.
pub fn catalog() -> StaticModelCatalog {
    StaticModelCatalog::new([
        (
            "gpt-4o",
            CatalogEntry::new(
                "gpt",
                [
                    Capability::InputMessages,
                    Capability::InputImage,
                    Capability::OutputText,
                    Capability::OutputStreaming,
                    Capability::OutputStructured,
                    Capability::ToolCalling,
                ],
            ),
        ),
        (
            "claude-*",
            CatalogEntry::new("claude", [Capability::InputMessages, Capability::OutputText]),
        ),
        (
            "text-embedding-3-small",
            CatalogEntry::new("embeddings", [Capability::InputText, Capability::Embeddings]),
        ),
    ])
}

/// A request seen by a [`FamilyTransport`].
#[derive(Debug, Clone)]
pub struct Seen {
    pub transport: &'static str,
    pub model: String,
    pub payload: Value,
    pub options: Options,
}

/// A transport serving one model family, answering with a fixed JSON body.
#[derive(Clone)]
pub struct FamilyTransport {
    pub name: &'static str,
    family: Option<&'static str>,
    response: Value,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl FamilyTransport {
    /// Serves `family` only.
    pub fn new(name: &'static str, family: &'static str, response: Value) -> Self {
        Self {
            name,
            family: Some(family),
            response,
            seen: Arc::default(),
        }
    }

    /// Serves every model.
    pub fn catch_all(name: &'static str, response: Value) -> Self {
        Self {
            name,
            family: None,
            response,
            seen: Arc::default(),
        }
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Transport for FamilyTransport {
    fn supports(&self, model: &Model) -> bool {
        self.family.is_none_or(|family| model.family() == family)
    }

    async fn request(
        &self,
        model: &Model,
        payload: Value,
        options: &Options,
    ) -> Result<RawResult, PlatformError> {
        self.seen.lock().push(Seen {
            transport: self.name,
            model: model.name().to_string(),
            payload,
            options: options.clone(),
        });
        Ok(RawResult::json(self.response.clone()))
    }
}

/// A transport answering with a server-sent event body.
pub struct SseTransport {
    chunks: Vec<&'static str>,
}

impl SseTransport {
    pub fn new(chunks: Vec<&'static str>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl Transport for SseTransport {
    fn supports(&self, _: &Model) -> bool {
        true
    }

    async fn request(
        &self,
        _: &Model,
        _: Value,
        _: &Options,
    ) -> Result<RawResult, PlatformError> {
        let chunks: Vec<Result<Bytes, PlatformError>> = self
            .chunks
            .iter()
            .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
            .collect();
        Ok(RawResult::streaming(Box::pin(futures::stream::iter(chunks))))
    }
}

/// Converts `{"text": ..}` bodies and SSE `{"delta": ..}` streams, counting runs.
#[derive(Clone, Default)]
pub struct TextConverter {
    pub runs: Arc<AtomicUsize>,
    family: Option<&'static str>,
}

impl TextConverter {
    pub fn for_family(family: &'static str) -> Self {
        Self {
            runs: Arc::default(),
            family: Some(family),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultConverter for TextConverter {
    fn supports(&self, model: &Model) -> bool {
        self.family.is_none_or(|family| model.family() == family)
    }

    async fn convert(
        &self,
        raw: &mut RawResult,
        _: &Options,
    ) -> Result<ModelResult, PlatformError> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        if let Some(body) = raw.take_stream() {
            return Ok(ModelResult::stream(lodestar_platform::stream::text_deltas(
                body,
                |event, metadata| {
                    if let Some(usage) = event.get("usage") {
                        metadata.insert("usage", usage.clone());
                    }
                    event.get("delta").and_then(Value::as_str).map(str::to_string)
                },
            )));
        }

        raw.data()
            .get("text")
            .and_then(Value::as_str)
            .map(ModelResult::text)
            .ok_or_else(|| PlatformError::InvalidResponse("missing text".to_string()))
    }
}

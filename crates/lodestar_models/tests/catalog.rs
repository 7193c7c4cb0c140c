//! Integration tests for model catalogs.

use async_trait::async_trait;
use indexmap::IndexMap;
use lodestar_models::catalog::{
    CatalogEntry, CatalogFetcher, ModelCatalog, RemoteModelCatalog, StaticModelCatalog,
    parse_model_name,
};
use lodestar_models::{Capability, CatalogError};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ─────────────────────────────────────────────────────────────────────
// Inline options
// ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn inline_options_are_typed() {
    let catalog = StaticModelCatalog::new([(
        "name",
        CatalogEntry::new("gpt", [Capability::OutputText]),
    )]);

    let model = catalog
        .model("name?temperature=0.7&max_tokens=1000")
        .await
        .unwrap();

    assert_eq!(model.name(), "name");
    let temperature = model.options().get("temperature").unwrap();
    assert!(temperature.is_f64());
    assert_eq!(temperature.as_f64(), Some(0.7));

    let max_tokens = model.options().get("max_tokens").unwrap();
    assert!(max_tokens.is_i64());
    assert_eq!(max_tokens.as_i64(), Some(1000));
}

proptest! {
    #[test]
    fn integer_options_parse_as_integers(value in any::<i64>()) {
        let (_, options) = parse_model_name(&format!("m?n={value}")).unwrap();
        prop_assert_eq!(options.get("n"), Some(&json!(value)));
    }

    #[test]
    fn plain_words_stay_strings(value in "[a-df-z]{1,12}") {
        let (_, options) = parse_model_name(&format!("m?word={value}")).unwrap();
        prop_assert_eq!(options.get("word"), Some(&json!(value)));
    }

    #[test]
    fn base_name_is_everything_before_first_question_mark(
        base in "[a-z][a-z0-9-]{0,20}",
        key in "[a-z]{1,8}",
        value in "[a-z0-9?]{0,10}",
    ) {
        let (name, options) = parse_model_name(&format!("{base}?{key}={value}")).unwrap();
        prop_assert_eq!(name, base);
        prop_assert!(options.contains_key(&key));
    }
}

// ─────────────────────────────────────────────────────────────────────
// Remote catalogs
// ─────────────────────────────────────────────────────────────────────

struct CountingFetcher {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CatalogFetcher for CountingFetcher {
    async fn fetch(&self) -> Result<IndexMap<String, CatalogEntry>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut table = IndexMap::new();
        table.insert(
            "remote-chat".to_string(),
            CatalogEntry::new("chat", [Capability::InputMessages, Capability::OutputText]),
        );
        table.insert(
            "remote-embed".to_string(),
            CatalogEntry::new("embeddings", [Capability::Embeddings]),
        );
        Ok(table)
    }
}

struct FailingFetcher;

#[async_trait]
impl CatalogFetcher for FailingFetcher {
    async fn fetch(&self) -> Result<IndexMap<String, CatalogEntry>, CatalogError> {
        Err(CatalogError::Fetch("connection refused".to_string()))
    }
}

#[tokio::test]
async fn remote_catalog_fetches_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let catalog = RemoteModelCatalog::new(CountingFetcher {
        calls: Arc::clone(&calls),
    });

    assert!(!catalog.is_loaded());
    assert_eq!(calls.load(Ordering::SeqCst), 0, "population is deferred");

    catalog.model("remote-chat").await.unwrap();
    catalog.model("remote-embed").await.unwrap();
    catalog.models().await.unwrap();

    assert!(catalog.is_loaded());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remote_catalog_overrides_win() {
    let catalog = RemoteModelCatalog::new(CountingFetcher {
        calls: Arc::new(AtomicUsize::new(0)),
    })
    .with_overrides([(
        "remote-chat",
        CatalogEntry::new("chat", [Capability::OutputStructured]),
    )]);

    let model = catalog.model("remote-chat").await.unwrap();
    assert!(model.supports(Capability::OutputStructured));
    assert!(!model.supports(Capability::OutputText));
}

#[tokio::test]
async fn remote_catalog_rejects_unknown_names() {
    let catalog = RemoteModelCatalog::new(CountingFetcher {
        calls: Arc::new(AtomicUsize::new(0)),
    });

    let err = catalog.model("local-only").await.unwrap_err();
    assert!(matches!(err, CatalogError::UnknownModel(_)));
}

#[tokio::test]
async fn failed_fetch_is_reported_and_not_cached() {
    let catalog = RemoteModelCatalog::new(FailingFetcher);

    let err = catalog.model("anything").await.unwrap_err();
    assert!(matches!(err, CatalogError::Fetch(_)));
    assert!(!catalog.is_loaded());
}

#[test]
fn catalog_document_round_trips() {
    let catalog = StaticModelCatalog::from_json(
        r#"{
            "whisper-1": {"family": "whisper", "capabilities": ["input-audio", "speech-to-text"]},
            "tts-1": {"capabilities": ["text-to-speech"]}
        }"#,
    )
    .unwrap();

    let whisper = catalog.lookup("whisper-1").unwrap();
    assert_eq!(whisper.family(), "whisper");
    assert!(whisper.supports(Capability::SpeechToText));

    let tts = catalog.lookup("tts-1").unwrap();
    assert_eq!(tts.family(), "generic");
}

#[test]
fn malformed_catalog_document_is_rejected() {
    let err = StaticModelCatalog::from_json(r#"{"m": {"capabilities": ["mind-reading"]}}"#)
        .unwrap_err();
    assert!(matches!(err, CatalogError::Decode(_)));
}

//! Response caching around a [`Platform`].

use crate::cache::{Cache, CachedResult};
use crate::contract::RequestInput;
use crate::error::PlatformError;
use crate::platform::Platform;
use crate::result::DeferredResult;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use lodestar_models::Options;
use lodestar_models::catalog::{ModelCatalog, parse_model_name};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// A [`Platform`] decorator that caches results by an explicit key.
///
/// Calls without a non-empty `prompt_cache_key` option pass straight through.
/// Otherwise the composite key
/// `{prefix or prompt_cache_key}_{sha256(model)}_{sha256(input)}` is looked up
/// in the [`Cache`]; the `prompt_cache_key` option itself is never forwarded.
///
/// On a miss the inner platform is invoked, the result is converted, and a
/// snapshot is stored tagged with the model name so
/// [`invalidate_model`](Self::invalidate_model) can drop it later. Both hits
/// and freshly stored results carry `cached: true`, `cache_key` and
/// `cached_at` metadata. Stream results are returned as-is and never stored.
///
/// De-duplication is best effort: two concurrent calls with the same key may
/// both miss and both reach the provider. There is no per-key lock.
pub struct CachedPlatform<P> {
    inner: P,
    cache: Arc<dyn Cache>,
    key_prefix: Option<String>,
}

impl<P: Platform> CachedPlatform<P> {
    /// Wraps `inner` with `cache`.
    #[must_use]
    pub fn new(inner: P, cache: Arc<dyn Cache>) -> Self {
        Self {
            inner,
            cache,
            key_prefix: None,
        }
    }

    /// Uses `prefix` instead of the caller's `prompt_cache_key` as the first
    /// key segment.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Returns the wrapped platform.
    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drops every cached result of `model`, whatever inline options the
    /// calls carried. Returns how many entries were removed.
    pub async fn invalidate_model(&self, model: &str) -> usize {
        let removed = self.cache.invalidate_tags(&[model.to_string()]).await;
        tracing::debug!(model, removed, "Invalidated cached results");
        removed
    }

    fn cache_key(
        &self,
        prompt_cache_key: &str,
        model: &str,
        input: &RequestInput,
    ) -> Result<String, PlatformError> {
        let input = serde_json::to_vec(input).map_err(PlatformError::InvalidOptions)?;
        let prefix = self.key_prefix.as_deref().unwrap_or(prompt_cache_key);
        Ok(format!(
            "{prefix}_{}_{}",
            sha256_hex(model.as_bytes()),
            sha256_hex(&input)
        ))
    }
}

fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[async_trait]
impl<P: Platform> Platform for CachedPlatform<P> {
    async fn invoke(
        &self,
        model: &str,
        input: RequestInput,
        mut options: Options,
    ) -> Result<DeferredResult, PlatformError> {
        let Some(prompt_cache_key) = options.prompt_cache_key().map(str::to_string) else {
            return self.inner.invoke(model, input, options).await;
        };
        options.remove(Options::PROMPT_CACHE_KEY);

        let key = self.cache_key(&prompt_cache_key, model, &input)?;

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(model, key = %key, "Cache hit");
            return Ok(DeferredResult::ready(cached.into_result()?));
        }

        tracing::debug!(model, key = %key, "Cache miss");
        let deferred = self.inner.invoke(model, input, options).await?;
        let mut result = deferred.into_result().await?;

        if result.is_stream() {
            tracing::debug!(model, "Stream result bypasses the cache");
            return Ok(DeferredResult::ready(result));
        }

        let cached_at = Utc::now();
        let metadata = result.metadata_mut();
        metadata.insert("cached", true);
        metadata.insert("cache_key", key.clone());
        metadata.insert(
            "cached_at",
            cached_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        if let Some(snapshot) = CachedResult::from_result(&result, cached_at) {
            let tag = parse_model_name(model).map_or_else(|_| model.to_string(), |(name, _)| name);
            self.cache.set(&key, snapshot, &[tag]).await;
            tracing::debug!(model, key = %key, "Stored result in cache");
        }

        Ok(DeferredResult::ready(result))
    }

    fn model_catalog(&self) -> &dyn ModelCatalog {
        self.inner.model_catalog()
    }
}

impl<P> core::fmt::Debug for CachedPlatform<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CachedPlatform")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

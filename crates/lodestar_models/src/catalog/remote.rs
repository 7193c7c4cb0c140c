//! Lazily fetched catalogs.

use super::{CatalogEntry, ModelCatalog, StaticModelCatalog};
use crate::error::CatalogError;
use crate::model::Model;
use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::OnceCell;

/// Source of a remote catalog table.
#[async_trait]
pub trait CatalogFetcher: Send + Sync + 'static {
    /// Fetches the full `name → entry` table.
    async fn fetch(&self) -> Result<IndexMap<String, CatalogEntry>, CatalogError>;
}

/// A catalog whose table is fetched on first access and kept for the lifetime
/// of the catalog.
///
/// Locally supplied overrides are merged over the fetched table. A failed
/// fetch is not cached: the next lookup retries.
pub struct RemoteModelCatalog<F> {
    fetcher: F,
    overrides: IndexMap<String, CatalogEntry>,
    table: OnceCell<StaticModelCatalog>,
}

impl<F: CatalogFetcher> RemoteModelCatalog<F> {
    /// Creates a catalog that will populate itself from `fetcher`.
    #[must_use]
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            overrides: IndexMap::new(),
            table: OnceCell::new(),
        }
    }

    /// Adds entries that take precedence over fetched ones.
    #[must_use]
    pub fn with_overrides<K: Into<String>>(
        mut self,
        overrides: impl IntoIterator<Item = (K, CatalogEntry)>,
    ) -> Self {
        self.overrides
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Returns whether the table has been fetched.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.table.initialized()
    }

    /// Fetches the table now instead of on first lookup.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error.
    pub async fn preload(&self) -> Result<(), CatalogError> {
        self.table().await.map(|_| ())
    }

    async fn table(&self) -> Result<&StaticModelCatalog, CatalogError> {
        self.table
            .get_or_try_init(|| async {
                let fetched = self.fetcher.fetch().await?;
                tracing::debug!(
                    entries = fetched.len(),
                    overrides = self.overrides.len(),
                    "Fetched remote model catalog"
                );
                Ok::<_, CatalogError>(
                    StaticModelCatalog::new(fetched).with_overrides(self.overrides.clone()),
                )
            })
            .await
    }
}

#[async_trait]
impl<F: CatalogFetcher> ModelCatalog for RemoteModelCatalog<F> {
    async fn model(&self, name: &str) -> Result<Model, CatalogError> {
        self.table().await?.lookup(name)
    }

    async fn models(&self) -> Result<Vec<(String, CatalogEntry)>, CatalogError> {
        self.table().await?.models().await
    }
}

impl<F> core::fmt::Debug for RemoteModelCatalog<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RemoteModelCatalog")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("loaded", &self.table.initialized())
            .finish()
    }
}

/// Fetches a catalog document over HTTP.
///
/// The endpoint must return the JSON shape accepted by
/// [`StaticModelCatalog::from_json`].
#[derive(Clone)]
pub struct HttpCatalogFetcher {
    client: reqwest::Client,
    url: String,
    bearer_token: Option<String>,
}

impl HttpCatalogFetcher {
    /// Creates a fetcher for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            bearer_token: None,
        }
    }

    /// Creates a fetcher reading the endpoint from the specified environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the variable is not set.
    pub fn from_env(env_var: &str) -> Result<Self, CatalogError> {
        let url = std::env::var(env_var).map_err(|_| {
            CatalogError::Fetch(format!("environment variable {env_var} is not set"))
        })?;
        Ok(Self::new(url))
    }

    /// Sends `Authorization: Bearer <token>` with the request.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

#[async_trait]
impl CatalogFetcher for HttpCatalogFetcher {
    async fn fetch(&self) -> Result<IndexMap<String, CatalogEntry>, CatalogError> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| CatalogError::Fetch(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| CatalogError::Fetch(err.to_string()))?;

        if !status.is_success() {
            return Err(CatalogError::Fetch(format!(
                "{} returned {status}: {body}",
                self.url
            )));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl core::fmt::Debug for HttpCatalogFetcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpCatalogFetcher")
            .field("url", &self.url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

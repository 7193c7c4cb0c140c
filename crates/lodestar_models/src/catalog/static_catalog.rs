//! In-memory catalogs.

use super::{CatalogEntry, ModelCatalog, parse_model_name};
use crate::capability::Capability;
use crate::error::CatalogError;
use crate::model::{GENERIC_FAMILY, Model};
use async_trait::async_trait;
use indexmap::IndexMap;

/// A catalog backed by a fixed table of entries.
///
/// Keys are exact model names, or prefixes ending in `*` (e.g. `gpt-4o*`).
/// Exact names are tried first; prefix patterns are tried in insertion order.
///
/// Provider crates extend a base table with [`with_overrides`](Self::with_overrides):
/// entries with the same key replace the built-in ones.
#[derive(Debug, Clone, Default)]
pub struct StaticModelCatalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl StaticModelCatalog {
    /// Creates a catalog from `(name, entry)` pairs.
    #[must_use]
    pub fn new<K: Into<String>>(entries: impl IntoIterator<Item = (K, CatalogEntry)>) -> Self {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Loads a catalog from a JSON object of `name → {family, capabilities}`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Decode`] if the document is malformed.
    ///
    /// # Example
    ///
    /// ```
    /// use lodestar_models::catalog::StaticModelCatalog;
    ///
    /// let catalog = StaticModelCatalog::from_json(r#"{
    ///     "text-embedding-3-small": {"family": "embeddings", "capabilities": ["input-text", "embeddings"]}
    /// }"#).unwrap();
    /// assert_eq!(catalog.len(), 1);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: IndexMap<String, CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    /// Merges `overrides` into the table; existing keys are replaced.
    #[must_use]
    pub fn with_overrides<K: Into<String>>(
        mut self,
        overrides: impl IntoIterator<Item = (K, CatalogEntry)>,
    ) -> Self {
        for (name, entry) in overrides {
            self.entries.insert(name.into(), entry);
        }
        self
    }

    /// Adds or replaces a single entry.
    pub fn insert(&mut self, name: impl Into<String>, entry: CatalogEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &IndexMap<String, CatalogEntry> {
        &self.entries
    }

    /// Resolves `name` synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownModel`] if no entry matches.
    pub fn lookup(&self, name: &str) -> Result<Model, CatalogError> {
        let (base, options) = parse_model_name(name)?;
        let entry = self
            .find(&base)
            .ok_or_else(|| CatalogError::UnknownModel(base.clone()))?;
        Ok(entry.to_model(&base, options)?)
    }

    fn find(&self, base: &str) -> Option<&CatalogEntry> {
        self.entries.get(base).or_else(|| {
            self.entries.iter().find_map(|(pattern, entry)| {
                pattern
                    .strip_suffix('*')
                    .filter(|prefix| base.starts_with(prefix))
                    .map(|_| entry)
            })
        })
    }
}

#[async_trait]
impl ModelCatalog for StaticModelCatalog {
    async fn model(&self, name: &str) -> Result<Model, CatalogError> {
        self.lookup(name)
    }

    async fn models(&self) -> Result<Vec<(String, CatalogEntry)>, CatalogError> {
        Ok(self
            .entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect())
    }
}

/// A catalog that accepts any name and grants every capability.
///
/// Used in front of gateways and routers whose model list is open-ended.
#[derive(Debug, Clone)]
pub struct FallbackModelCatalog {
    family: String,
}

impl FallbackModelCatalog {
    /// Creates a fallback catalog producing models in the generic family.
    #[must_use]
    pub fn new() -> Self {
        Self {
            family: GENERIC_FAMILY.to_string(),
        }
    }

    /// Sets the family assigned to every model.
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }
}

impl Default for FallbackModelCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelCatalog for FallbackModelCatalog {
    async fn model(&self, name: &str) -> Result<Model, CatalogError> {
        let (base, options) = parse_model_name(name)?;
        Ok(Model::new(base, Capability::ALL.iter().copied())?
            .with_family(self.family.clone())
            .with_options(options))
    }

    async fn models(&self) -> Result<Vec<(String, CatalogEntry)>, CatalogError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> StaticModelCatalog {
        StaticModelCatalog::new([
            ("gpt-4o", CatalogEntry::new("gpt", [Capability::OutputText])),
            ("gpt-4o*", CatalogEntry::new("gpt", [Capability::OutputStreaming])),
        ])
    }

    #[test]
    fn exact_name_beats_prefix_pattern() {
        let model = base().lookup("gpt-4o").unwrap();
        assert!(model.supports(Capability::OutputText));
        assert!(!model.supports(Capability::OutputStreaming));

        let model = base().lookup("gpt-4o-mini").unwrap();
        assert!(model.supports(Capability::OutputStreaming));
    }

    #[test]
    fn overrides_replace_builtins() {
        let catalog = base().with_overrides([(
            "gpt-4o",
            CatalogEntry::new("custom", [Capability::Embeddings]),
        )]);

        let model = catalog.lookup("gpt-4o").unwrap();
        assert_eq!(model.family(), "custom");
        assert!(model.supports(Capability::Embeddings));
        assert!(!model.supports(Capability::OutputText));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn unknown_model_is_rejected() {
        let err = base().lookup("mistral-large").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownModel(name) if name == "mistral-large"));
    }

    #[tokio::test]
    async fn fallback_grants_every_capability() {
        let model = FallbackModelCatalog::new()
            .model("anything/at-all?temperature=1")
            .await
            .unwrap();

        assert_eq!(model.name(), "anything/at-all");
        assert_eq!(model.capabilities().len(), Capability::ALL.len());
        assert_eq!(model.options().get("temperature"), Some(&serde_json::json!(1)));
    }
}

//! The [`Model`] description.

use crate::capability::Capability;
use crate::error::ModelError;
use crate::options::Options;
use serde::Serialize;
use std::collections::BTreeSet;

/// Family assigned to models that do not declare one.
pub const GENERIC_FAMILY: &str = "generic";

/// An addressable model and the capabilities it supports.
///
/// Models are immutable once built. Catalogs create one per lookup, so each
/// invocation works on its own copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    name: String,
    family: String,
    capabilities: BTreeSet<Capability>,
    options: Options,
}

impl Model {
    /// Creates a model in the generic family with no default options.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyName`] if `name` is empty or whitespace-only.
    pub fn new(
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::EmptyName);
        }

        Ok(Self {
            name,
            family: GENERIC_FAMILY.to_string(),
            capabilities: capabilities.into_iter().collect(),
            options: Options::new(),
        })
    }

    /// Sets the model family transports and converters match on (e.g. `"gpt"`).
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    /// Sets the default options sent with every request for this model.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Returns the model name, without inline options.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the model family.
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Returns the advertised capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    /// Returns whether the model advertises `capability`.
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Returns the default options for this model.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(Model::new("", []), Err(ModelError::EmptyName)));
        assert!(matches!(Model::new("   ", []), Err(ModelError::EmptyName)));
    }

    #[test]
    fn supports_reflects_capabilities() {
        let model = Model::new("gpt-4o", [Capability::InputText, Capability::OutputText]).unwrap();

        assert!(model.supports(Capability::OutputText));
        assert!(!model.supports(Capability::Embeddings));
        assert_eq!(model.family(), GENERIC_FAMILY);
    }
}

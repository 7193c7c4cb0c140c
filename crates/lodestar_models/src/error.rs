//! Error types for model construction and catalog lookups.

/// Error constructing a [`Model`](crate::Model) or parsing a model name.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model name was empty or whitespace-only.
    #[error("model name must not be empty")]
    EmptyName,

    /// An inline option in the model name could not be decoded.
    #[error("invalid option '{key}' in model name '{name}'")]
    InvalidOption {
        /// The full model name as given.
        name: String,
        /// The offending option key.
        key: String,
    },
}

/// Error resolving a model through a [`ModelCatalog`](crate::catalog::ModelCatalog).
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No catalog entry matches the requested name.
    #[error("model '{0}' is not supported by this catalog")]
    UnknownModel(String),

    /// The requested name could not be turned into a model.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Fetching a remote catalog failed.
    #[error("failed to fetch model catalog: {0}")]
    Fetch(String),

    /// A catalog document could not be decoded.
    #[error("invalid model catalog: {0}")]
    Decode(#[from] serde_json::Error),
}

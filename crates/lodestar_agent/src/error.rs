//! Error types for agents and processors.

use lodestar_models::{Capability, CatalogError};
use lodestar_platform::{PlatformError, ResultError};
use thiserror::Error;

/// Errors raised while building or calling an agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Construction input was malformed.
    #[error("{0}")]
    InvalidArgument(String),

    /// The call could not proceed with the given conversation.
    #[error("{0}")]
    Runtime(String),

    /// A processor needs a capability the model does not advertise.
    #[error("model '{model}' does not support {capability}")]
    MissingCapability {
        /// Name of the model.
        model: String,
        /// The capability that was required.
        capability: Capability,
    },

    /// A tool call failed.
    #[error("tool error: {0}")]
    Tool(String),

    /// The model could not be resolved.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The platform call failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The result had an unexpected shape.
    #[error(transparent)]
    Result(#[from] ResultError),

    /// A JSON value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Creates an [`InvalidArgument`](Self::InvalidArgument).
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates a [`Runtime`](Self::Runtime).
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Creates a [`Tool`](Self::Tool).
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }
}

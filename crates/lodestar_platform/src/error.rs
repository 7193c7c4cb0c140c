//! Error types for dispatch, normalization and result access.

use core::time::Duration;
use lodestar_models::{Capability, CatalogError};

/// Errors raised while invoking a model through a [`Platform`](crate::Platform).
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// No registered transport supports the model.
    #[error("no transport for model '{model}'")]
    NoTransport {
        /// The resolved model name.
        model: String,
    },

    /// No registered converter supports the model.
    #[error("no converter for model '{model}'")]
    NoConverter {
        /// The resolved model name.
        model: String,
    },

    /// The request needs a capability the model does not advertise.
    #[error("model '{model}' does not support {capability}")]
    MissingCapability {
        /// The resolved model name.
        model: String,
        /// The missing capability.
        capability: Capability,
    },

    /// Rate limited by the provider.
    #[error("rate limited{}", .retry_after.map(|d| format!(", retry after {d:?}")).unwrap_or_default())]
    RateLimited {
        /// Suggested time to wait before retrying.
        retry_after: Option<Duration>,
    },

    /// The provider response is missing expected fields.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Http error (e.g.: connection error, timeout, etc.)
    #[error("http error: {0}")]
    Http(String),

    /// Error returned by the model provider.
    #[error("provider error: {message}")]
    Provider {
        /// HTTP status code if available.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// The invocation options could not be read or written.
    #[error("invalid options: {0}")]
    InvalidOptions(#[source] serde_json::Error),

    /// Model resolution failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Payload construction failed.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Result conversion or access failed.
    #[error(transparent)]
    Result(#[from] ResultError),
}

/// Errors raised by a [`Contract`](crate::contract::Contract).
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// No normalizer supports the value.
    #[error("no normalizer supports {shape}")]
    Unsupported {
        /// Description of the value shape, e.g. `content:image`.
        shape: String,
    },

    /// A fragment could not be serialized.
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised when reading a [`ModelResult`](crate::result::ModelResult).
#[derive(Debug, thiserror::Error)]
pub enum ResultError {
    /// The result is not of the requested kind.
    #[error("expected a {expected} result, got {actual}")]
    UnexpectedKind {
        /// The kind the accessor expects.
        expected: &'static str,
        /// The kind the result actually holds.
        actual: &'static str,
    },

    /// An object result could not be decoded into the requested type.
    #[error("failed to deserialize object result: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// A previous conversion attempt failed; the deferred result cannot be retried.
    #[error("result conversion previously failed: {0}")]
    ConversionFailed(String),
}

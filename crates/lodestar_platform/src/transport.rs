//! Provider bridge interfaces.
//!
//! A provider bridge is a [`Transport`] that sends the normalized payload and
//! a [`ResultConverter`] that turns the provider's [`RawResult`] into a
//! [`ModelResult`]. Both declare which models they serve through
//! `supports`, which must be side-effect free.

use crate::error::PlatformError;
use crate::raw::RawResult;
use crate::result::ModelResult;
use async_trait::async_trait;
use lodestar_models::{Model, Options};
use serde_json::Value;

/// Sends requests to a provider.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Returns whether this transport serves `model`.
    fn supports(&self, model: &Model) -> bool;

    /// Sends `payload` for `model`.
    ///
    /// # Arguments
    ///
    /// * `model` - The resolved model
    /// * `payload` - The normalized request body
    /// * `options` - Invocation options, with tools already normalized
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    async fn request(
        &self,
        model: &Model,
        payload: Value,
        options: &Options,
    ) -> Result<RawResult, PlatformError>;
}

/// Converts provider responses into [`ModelResult`]s.
#[async_trait]
pub trait ResultConverter: Send + Sync + 'static {
    /// Returns whether this converter understands responses for `model`.
    fn supports(&self, model: &Model) -> bool;

    /// Converts `raw`.
    ///
    /// Streaming converters take the body stream out of `raw` with
    /// [`RawResult::take_stream`].
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidResponse`] if the response lacks
    /// expected fields.
    async fn convert(
        &self,
        raw: &mut RawResult,
        options: &Options,
    ) -> Result<ModelResult, PlatformError>;
}

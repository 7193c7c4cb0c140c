//! Model invocation and provider dispatch.

use crate::contract::{Contract, RequestInput};
use crate::error::PlatformError;
use crate::result::DeferredResult;
use crate::transport::{ResultConverter, Transport};
use async_trait::async_trait;
use lodestar_models::catalog::{FallbackModelCatalog, ModelCatalog};
use lodestar_models::{Capability, Model, Options};
use std::sync::Arc;

/// Invokes models by name.
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// Invokes `model` with `input`.
    ///
    /// The returned [`DeferredResult`] is not converted yet; conversion runs
    /// when the caller first reads it.
    ///
    /// # Arguments
    ///
    /// * `model` - Model name, optionally with inline options (`gpt-4o?temperature=0.2`)
    /// * `input` - Conversation, text or raw JSON input
    /// * `options` - Invocation options; they win over the model's own options
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be resolved, lacks a requested
    /// capability, has no transport or converter, or the request fails.
    async fn invoke(
        &self,
        model: &str,
        input: RequestInput,
        options: Options,
    ) -> Result<DeferredResult, PlatformError>;

    /// Returns the catalog used to resolve model names.
    fn model_catalog(&self) -> &dyn ModelCatalog;
}

#[async_trait]
impl<P: Platform + ?Sized> Platform for Arc<P> {
    async fn invoke(
        &self,
        model: &str,
        input: RequestInput,
        options: Options,
    ) -> Result<DeferredResult, PlatformError> {
        (**self).invoke(model, input, options).await
    }

    fn model_catalog(&self) -> &dyn ModelCatalog {
        (**self).model_catalog()
    }
}

/// Checks the capabilities implied by `options` against `model`.
///
/// # Errors
///
/// Returns [`PlatformError::MissingCapability`] for the first unmet requirement:
/// `stream: true` needs [`Capability::OutputStreaming`], `tools` needs
/// [`Capability::ToolCalling`] and `response_format` needs
/// [`Capability::OutputStructured`].
pub fn check_capabilities(model: &Model, options: &Options) -> Result<(), PlatformError> {
    let required = [
        (options.stream(), Capability::OutputStreaming),
        (options.contains_key(Options::TOOLS), Capability::ToolCalling),
        (
            options.response_format().is_some(),
            Capability::OutputStructured,
        ),
    ];

    match required
        .into_iter()
        .find(|(needed, capability)| *needed && !model.supports(*capability))
    {
        Some((_, capability)) => Err(PlatformError::MissingCapability {
            model: model.name().to_string(),
            capability,
        }),
        None => Ok(()),
    }
}

// ─────────────────────────────────────────────────────────────────────
// RoutingPlatform
// ─────────────────────────────────────────────────────────────────────

/// A [`Platform`] dispatching to registered provider bridges.
///
/// Transports and converters are scanned in registration order and the first
/// one whose `supports` accepts the model is used. Registration order is
/// therefore part of the configuration: register specific bridges ahead of
/// catch-all ones.
///
/// ```
/// # use lodestar_platform::{RoutingPlatform, Transport, ResultConverter};
/// # fn wire(openai: impl Transport, openai_results: impl ResultConverter) {
/// let platform = RoutingPlatform::builder()
///     .transport(openai)
///     .converter(openai_results)
///     .build();
/// # let _ = platform;
/// # }
/// ```
pub struct RoutingPlatform {
    transports: Vec<Arc<dyn Transport>>,
    converters: Vec<Arc<dyn ResultConverter>>,
    contract: Contract,
    catalog: Arc<dyn ModelCatalog>,
}

impl RoutingPlatform {
    /// Starts building a platform.
    #[must_use]
    pub fn builder() -> RoutingPlatformBuilder {
        RoutingPlatformBuilder::default()
    }

    /// Returns the contract used to build payloads.
    #[must_use]
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    fn transport_for(&self, model: &Model) -> Result<&Arc<dyn Transport>, PlatformError> {
        let (index, transport) = self
            .transports
            .iter()
            .enumerate()
            .find(|(_, transport)| transport.supports(model))
            .ok_or_else(|| PlatformError::NoTransport {
                model: model.name().to_string(),
            })?;
        tracing::debug!(model = model.name(), index, "Selected transport");
        Ok(transport)
    }

    fn converter_for(&self, model: &Model) -> Result<&Arc<dyn ResultConverter>, PlatformError> {
        let (index, converter) = self
            .converters
            .iter()
            .enumerate()
            .find(|(_, converter)| converter.supports(model))
            .ok_or_else(|| PlatformError::NoConverter {
                model: model.name().to_string(),
            })?;
        tracing::debug!(model = model.name(), index, "Selected converter");
        Ok(converter)
    }
}

#[async_trait]
impl Platform for RoutingPlatform {
    async fn invoke(
        &self,
        model: &str,
        input: RequestInput,
        options: Options,
    ) -> Result<DeferredResult, PlatformError> {
        let model = self.catalog.model(model).await?;
        let mut options = options.merged_over(model.options());
        tracing::debug!(
            model = model.name(),
            family = model.family(),
            options = options.len(),
            "Invoking model"
        );

        check_capabilities(&model, &options)?;

        let payload = self.contract.create_request_payload(&model, &input)?;

        if let Some(tools) = options.tools().map_err(PlatformError::InvalidOptions)? {
            let tools = self.contract.create_tool_option(&tools, &model)?;
            options.insert(Options::TOOLS, tools);
        }

        let transport = self.transport_for(&model)?;
        // Resolve the converter before sending so a misconfiguration fails
        // without a provider round-trip.
        let converter = Arc::clone(self.converter_for(&model)?);

        let raw = transport.request(&model, payload, &options).await?;

        Ok(DeferredResult::new(converter, raw, options))
    }

    fn model_catalog(&self) -> &dyn ModelCatalog {
        self.catalog.as_ref()
    }
}

impl core::fmt::Debug for RoutingPlatform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoutingPlatform")
            .field("transports", &self.transports.len())
            .field("converters", &self.converters.len())
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RoutingPlatform`].
///
/// Without a catalog, the platform accepts any model name and grants it every
/// capability ([`FallbackModelCatalog`]).
#[derive(Default)]
pub struct RoutingPlatformBuilder {
    transports: Vec<Arc<dyn Transport>>,
    converters: Vec<Arc<dyn ResultConverter>>,
    contract: Option<Contract>,
    catalog: Option<Arc<dyn ModelCatalog>>,
}

impl RoutingPlatformBuilder {
    /// Appends a transport.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transports.push(Arc::new(transport));
        self
    }

    /// Appends a shared transport.
    #[must_use]
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Appends a converter.
    #[must_use]
    pub fn converter(mut self, converter: impl ResultConverter) -> Self {
        self.converters.push(Arc::new(converter));
        self
    }

    /// Appends a shared converter.
    #[must_use]
    pub fn shared_converter(mut self, converter: Arc<dyn ResultConverter>) -> Self {
        self.converters.push(converter);
        self
    }

    /// Sets the contract. Defaults to [`Contract::default`].
    #[must_use]
    pub fn contract(mut self, contract: Contract) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Sets the model catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: impl ModelCatalog) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    /// Sets a shared model catalog.
    #[must_use]
    pub fn shared_catalog(mut self, catalog: Arc<dyn ModelCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Builds the platform.
    #[must_use]
    pub fn build(self) -> RoutingPlatform {
        RoutingPlatform {
            transports: self.transports,
            converters: self.converters,
            contract: self.contract.unwrap_or_default(),
            catalog: self
                .catalog
                .unwrap_or_else(|| Arc::new(FallbackModelCatalog::new())),
        }
    }
}

impl core::fmt::Debug for RoutingPlatformBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoutingPlatformBuilder")
            .field("transports", &self.transports.len())
            .field("converters", &self.converters.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(capabilities: &[Capability]) -> Model {
        Model::new("m", capabilities.iter().copied()).unwrap()
    }

    #[test]
    fn streaming_requires_output_streaming() {
        let options = Options::new().with(Options::STREAM, true);

        let err = check_capabilities(&model(&[Capability::OutputText]), &options).unwrap_err();
        assert!(matches!(
            err,
            PlatformError::MissingCapability {
                capability: Capability::OutputStreaming,
                ..
            }
        ));

        check_capabilities(&model(&[Capability::OutputStreaming]), &options).unwrap();
    }

    #[test]
    fn stream_false_needs_nothing() {
        let options = Options::new().with(Options::STREAM, false);
        check_capabilities(&model(&[]), &options).unwrap();
    }

    #[test]
    fn structured_output_requires_capability() {
        let options = Options::new().with(Options::RESPONSE_FORMAT, serde_json::json!({}));
        let err = check_capabilities(&model(&[Capability::ToolCalling]), &options).unwrap_err();
        assert_eq!(err.to_string(), "model 'm' does not support output-structured");
    }
}

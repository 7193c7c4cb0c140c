//! Request payload construction.
//!
//! A [`Contract`] is an ordered list of [`Normalizer`]s. Each normalizer
//! declares which [`Subject`] shapes it handles, optionally depending on the
//! [`Model`] in the call context, and turns a supported value into a JSON
//! fragment. Resolution is first match in list order, so a specialised
//! normalizer must be placed ahead of the generic one it refines.
//! [`Contract::create`] puts custom normalizers in front of the defaults.
//!
//! Composite values (message bags, user content lists) normalize their
//! elements by calling back into the contract, so a custom normalizer for a
//! single content kind also applies inside every message that contains it.
//!
//! ```
//! use lodestar_models::{Message, MessageBag};
//! use lodestar_platform::contract::{Contract, NormalizeContext, Subject};
//! use serde_json::json;
//!
//! let bag = MessageBag::new().with(Message::user("Hello"));
//! let payload = Contract::default()
//!     .normalize(&Subject::Bag(&bag), &NormalizeContext::default())
//!     .unwrap();
//!
//! assert_eq!(payload, json!({"messages": [{"role": "user", "content": "Hello"}]}));
//! ```

mod normalizers;

pub use normalizers::{
    AssistantMessageNormalizer, AudioNormalizer, FileNormalizer, ImageNormalizer,
    ImageUrlNormalizer, JsonNormalizer, MessageBagNormalizer, PlainTextNormalizer,
    SystemMessageNormalizer, TextContentNormalizer, ToolCallMessageNormalizer,
    ToolCallNormalizer, ToolNormalizer, UserMessageNormalizer,
};

use crate::error::ContractError;
use lodestar_models::{Content, Message, MessageBag, Model, Tool, ToolCall};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────
// Subjects
// ─────────────────────────────────────────────────────────────────────

/// A value handed to the contract for normalization.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// A whole conversation.
    Bag(&'a MessageBag),
    /// A single message.
    Message(&'a Message),
    /// A user content part.
    Content(&'a Content),
    /// A tool call requested by the model.
    ToolCall(&'a ToolCall),
    /// A tool descriptor.
    Tool(&'a Tool),
    /// Raw text input (e.g. for embeddings).
    Text(&'a str),
    /// Pre-built JSON input, passed through.
    Json(&'a Value),
}

impl Subject<'_> {
    /// Returns a short description of the value shape, used in errors.
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Bag(_) => "message_bag",
            Self::Message(Message::System { .. }) => "message:system",
            Self::Message(Message::User { .. }) => "message:user",
            Self::Message(Message::Assistant { .. }) => "message:assistant",
            Self::Message(Message::ToolCall { .. }) => "message:tool_call",
            Self::Content(Content::Text { .. }) => "content:text",
            Self::Content(Content::Image { .. }) => "content:image",
            Self::Content(Content::ImageUrl { .. }) => "content:image_url",
            Self::Content(Content::Audio { .. }) => "content:audio",
            Self::Content(Content::File { .. }) => "content:file",
            Self::ToolCall(_) => "tool_call",
            Self::Tool(_) => "tool",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
        }
    }
}

/// Context available to normalizers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeContext<'a> {
    /// The model the payload is built for, if any.
    pub model: Option<&'a Model>,
}

impl<'a> NormalizeContext<'a> {
    /// Creates a context for `model`.
    #[must_use]
    pub fn for_model(model: &'a Model) -> Self {
        Self { model: Some(model) }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Normalizers
// ─────────────────────────────────────────────────────────────────────

/// Turns one kind of [`Subject`] into a JSON fragment.
pub trait Normalizer: Send + Sync + 'static {
    /// Returns whether this normalizer handles `subject` in `context`.
    fn supports(&self, subject: &Subject<'_>, context: &NormalizeContext<'_>) -> bool;

    /// Normalizes `subject`.
    ///
    /// Composite values normalize their elements through `contract`.
    ///
    /// # Errors
    ///
    /// Returns an error if an element cannot be normalized.
    fn normalize(
        &self,
        subject: &Subject<'_>,
        context: &NormalizeContext<'_>,
        contract: &Contract,
    ) -> Result<Value, ContractError>;
}

type SupportsFn = dyn Fn(&Subject<'_>, &NormalizeContext<'_>) -> bool + Send + Sync;
type NormalizeFn =
    dyn Fn(&Subject<'_>, &NormalizeContext<'_>, &Contract) -> Result<Value, ContractError>
        + Send
        + Sync;

/// A [`Normalizer`] built from two closures.
///
/// Useful for provider-specific tweaks gated on the model:
///
/// ```
/// use lodestar_models::Content;
/// use lodestar_platform::contract::{Contract, FnNormalizer, Subject};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let images_as_urls = FnNormalizer::new(
///     |subject, ctx| {
///         matches!(subject, Subject::Content(Content::Image { .. }))
///             && ctx.model.is_some_and(|m| m.family() == "claude")
///     },
///     |subject, _, _| match subject {
///         Subject::Content(Content::Image { data, media_type }) => Ok(json!({
///             "type": "image",
///             "source": {"type": "base64", "media_type": media_type, "data": data},
///         })),
///         _ => unreachable!(),
///     },
/// );
///
/// let contract = Contract::create([Arc::new(images_as_urls) as _]);
/// # let _ = contract;
/// ```
pub struct FnNormalizer {
    supports: Box<SupportsFn>,
    normalize: Box<NormalizeFn>,
}

impl FnNormalizer {
    /// Creates a normalizer from a support predicate and a conversion function.
    #[must_use]
    pub fn new<S, N>(supports: S, normalize: N) -> Self
    where
        S: Fn(&Subject<'_>, &NormalizeContext<'_>) -> bool + Send + Sync + 'static,
        N: Fn(&Subject<'_>, &NormalizeContext<'_>, &Contract) -> Result<Value, ContractError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            supports: Box::new(supports),
            normalize: Box::new(normalize),
        }
    }
}

impl Normalizer for FnNormalizer {
    fn supports(&self, subject: &Subject<'_>, context: &NormalizeContext<'_>) -> bool {
        (self.supports)(subject, context)
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        context: &NormalizeContext<'_>,
        contract: &Contract,
    ) -> Result<Value, ContractError> {
        (self.normalize)(subject, context, contract)
    }
}

impl core::fmt::Debug for FnNormalizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnNormalizer").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────
// Request input
// ─────────────────────────────────────────────────────────────────────

/// The input of a platform invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestInput {
    /// A conversation.
    Messages(MessageBag),
    /// A single text (e.g. to embed or to speak).
    Text(String),
    /// A batch of texts.
    Texts(Vec<String>),
    /// A provider-specific payload, passed through.
    Json(Value),
}

impl From<MessageBag> for RequestInput {
    fn from(messages: MessageBag) -> Self {
        Self::Messages(messages)
    }
}

impl From<String> for RequestInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RequestInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<String>> for RequestInput {
    fn from(texts: Vec<String>) -> Self {
        Self::Texts(texts)
    }
}

impl From<Value> for RequestInput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Contract
// ─────────────────────────────────────────────────────────────────────

/// An ordered normalizer registry.
#[derive(Clone)]
pub struct Contract {
    normalizers: Vec<Arc<dyn Normalizer>>,
}

impl Contract {
    /// Creates a contract with exactly `normalizers`, in order.
    #[must_use]
    pub fn new(normalizers: Vec<Arc<dyn Normalizer>>) -> Self {
        Self { normalizers }
    }

    /// Creates a contract with `extra` normalizers ahead of the defaults.
    #[must_use]
    pub fn create(extra: impl IntoIterator<Item = Arc<dyn Normalizer>>) -> Self {
        let mut normalizers: Vec<Arc<dyn Normalizer>> = extra.into_iter().collect();
        normalizers.extend(default_normalizers());
        Self { normalizers }
    }

    /// Returns the number of registered normalizers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.normalizers.len()
    }

    /// Returns whether no normalizer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normalizers.is_empty()
    }

    /// Normalizes `subject` with the first normalizer that supports it.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Unsupported`] if no normalizer supports the
    /// value. This indicates a misconfigured contract.
    pub fn normalize(
        &self,
        subject: &Subject<'_>,
        context: &NormalizeContext<'_>,
    ) -> Result<Value, ContractError> {
        let normalizer = self
            .normalizers
            .iter()
            .find(|n| n.supports(subject, context))
            .ok_or_else(|| ContractError::Unsupported {
                shape: subject.shape().to_string(),
            })?;
        normalizer.normalize(subject, context, self)
    }

    /// Builds the request payload for `model`.
    ///
    /// Message bags become a `{messages: [...], model: ...}` envelope; text
    /// and JSON inputs are normalized as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if part of the input cannot be normalized.
    pub fn create_request_payload(
        &self,
        model: &Model,
        input: &RequestInput,
    ) -> Result<Value, ContractError> {
        let context = NormalizeContext::for_model(model);
        match input {
            RequestInput::Messages(bag) => self.normalize(&Subject::Bag(bag), &context),
            RequestInput::Text(text) => self.normalize(&Subject::Text(text), &context),
            RequestInput::Texts(texts) => texts
                .iter()
                .map(|text| self.normalize(&Subject::Text(text), &context))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            RequestInput::Json(value) => self.normalize(&Subject::Json(value), &context),
        }
    }

    /// Normalizes tool descriptors into the model's function-calling schema.
    ///
    /// # Errors
    ///
    /// Returns an error if a tool cannot be normalized.
    pub fn create_tool_option(&self, tools: &[Tool], model: &Model) -> Result<Value, ContractError> {
        let context = NormalizeContext::for_model(model);
        tools
            .iter()
            .map(|tool| self.normalize(&Subject::Tool(tool), &context))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

impl Default for Contract {
    fn default() -> Self {
        Self::create([])
    }
}

impl core::fmt::Debug for Contract {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Contract")
            .field("normalizers", &self.normalizers.len())
            .finish()
    }
}

fn default_normalizers() -> Vec<Arc<dyn Normalizer>> {
    vec![
        Arc::new(MessageBagNormalizer),
        Arc::new(SystemMessageNormalizer),
        Arc::new(UserMessageNormalizer),
        Arc::new(AssistantMessageNormalizer),
        Arc::new(ToolCallMessageNormalizer),
        Arc::new(TextContentNormalizer),
        Arc::new(ImageNormalizer),
        Arc::new(ImageUrlNormalizer),
        Arc::new(AudioNormalizer),
        Arc::new(FileNormalizer),
        Arc::new(ToolCallNormalizer),
        Arc::new(ToolNormalizer),
        Arc::new(PlainTextNormalizer),
        Arc::new(JsonNormalizer),
    ]
}

//! Model invocation for Lodestar.
//!
//! This crate turns a provider-agnostic request (model name, conversation,
//! options) into a provider call and the provider's answer into a uniform
//! result:
//!
//! 1. [`contract`] normalizes messages, content and tools into the payload a
//!    provider expects.
//! 2. A [`RoutingPlatform`] resolves the model, checks the capabilities the
//!    options require, and dispatches to the first registered [`Transport`]
//!    that supports the model.
//! 3. The first matching [`ResultConverter`] is paired with the
//!    [`RawResult`] in a [`DeferredResult`]; conversion runs when the caller
//!    first reads the result.
//! 4. [`CachedPlatform`] layers keyed result caching over any [`Platform`].
//!
//! Provider bridges live outside this crate; they implement [`Transport`]
//! and [`ResultConverter`] and typically use [`RawResult::from_http_response`]
//! and the [`stream`] helpers for server-sent events.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use lodestar_models::{Message, MessageBag, Model, Options};
//! use lodestar_platform::{
//!     ModelResult, Platform, PlatformError, RawResult, ResultConverter, RoutingPlatform, Transport,
//! };
//! use serde_json::Value;
//!
//! struct EchoTransport;
//!
//! #[async_trait]
//! impl Transport for EchoTransport {
//!     fn supports(&self, model: &Model) -> bool {
//!         model.name().starts_with("echo")
//!     }
//!
//!     async fn request(&self, _: &Model, payload: Value, _: &Options) -> Result<RawResult, PlatformError> {
//!         Ok(RawResult::json(payload))
//!     }
//! }
//!
//! struct LastMessage;
//!
//! #[async_trait]
//! impl ResultConverter for LastMessage {
//!     fn supports(&self, _: &Model) -> bool {
//!         true
//!     }
//!
//!     async fn convert(&self, raw: &mut RawResult, _: &Options) -> Result<ModelResult, PlatformError> {
//!         raw.data()["messages"][0]["content"]
//!             .as_str()
//!             .map(ModelResult::text)
//!             .ok_or_else(|| PlatformError::InvalidResponse("no content".to_string()))
//!     }
//! }
//!
//! # async fn run() -> Result<(), PlatformError> {
//! let platform = RoutingPlatform::builder()
//!     .transport(EchoTransport)
//!     .converter(LastMessage)
//!     .build();
//!
//! let messages = MessageBag::new().with(Message::user("Hello"));
//! let mut result = platform
//!     .invoke("echo-1?temperature=0.2", messages.into(), Options::new())
//!     .await?;
//!
//! assert_eq!(result.as_text().await?, "Hello");
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `test-utils` - Enables the `testing` module with scripted transports,
//!   converters and platforms.

pub mod cache;
mod cached;
pub mod contract;
pub mod error;
mod platform;
mod raw;
pub mod result;
pub mod stream;
mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use cache::{Cache, CachedResult, InMemoryCache};
pub use cached::CachedPlatform;
pub use contract::{Contract, RequestInput};
pub use error::{ContractError, PlatformError, ResultError};
pub use platform::{Platform, RoutingPlatform, RoutingPlatformBuilder, check_capabilities};
pub use raw::{ByteStream, RawBody, RawResult, retry_after};
pub use result::{DeferredResult, Metadata, ModelResult, ResultKind, StreamResult};
pub use transport::{ResultConverter, Transport};

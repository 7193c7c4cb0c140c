//! Model descriptions and conversation types for Lodestar.
//!
//! This crate holds everything a request is made of before it reaches a
//! provider:
//!
//! - [`Capability`] and [`Model`]: an addressable model and the tagged set of
//!   features it supports.
//! - [`catalog`]: lookup tables mapping a model name (optionally carrying inline
//!   options, e.g. `gpt-4o?temperature=0.7`) to a [`Model`].
//! - [`MessageBag`], [`Message`] and [`Content`]: the provider-agnostic
//!   conversation.
//! - [`Tool`], [`ToolCall`] and [`Vector`]: values exchanged with tool-calling
//!   and embedding models.
//! - [`Options`]: the invocation option map shared by every layer.
//!
//! # Example
//!
//! ```
//! use lodestar_models::catalog::{CatalogEntry, ModelCatalog, StaticModelCatalog};
//! use lodestar_models::{Capability, Message, MessageBag};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = StaticModelCatalog::new([(
//!     "gpt-4o-mini",
//!     CatalogEntry::new("gpt", [Capability::InputMessages, Capability::OutputText]),
//! )]);
//!
//! let model = catalog.model("gpt-4o-mini?temperature=0.2").await?;
//! assert!(model.supports(Capability::OutputText));
//! assert_eq!(model.options().get("temperature"), Some(&serde_json::json!(0.2)));
//!
//! let messages = MessageBag::new()
//!     .with(Message::system("You are terse."))
//!     .with(Message::user("Hello!"));
//! assert_eq!(messages.len(), 2);
//! # Ok(())
//! # }
//! ```

mod capability;
pub mod catalog;
mod content;
pub mod error;
mod message;
mod model;
mod options;
mod tool;
mod vector;

pub use capability::Capability;
pub use content::Content;
pub use error::{CatalogError, ModelError};
pub use message::{Message, MessageBag, Role};
pub use model::Model;
pub use options::Options;
pub use tool::{Tool, ToolCall};
pub use vector::Vector;

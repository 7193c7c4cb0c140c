//! Agents for Lodestar.
//!
//! An [`Agent`] answers a conversation. This crate provides two:
//!
//! - [`ChatAgent`] sends the conversation to one model through a
//!   [`Platform`](lodestar_platform::Platform), running ordered
//!   [`InputProcessor`]s before the call and [`OutputProcessor`]s after it.
//! - [`MultiAgent`] asks an orchestrator agent for a [`Decision`] and hands
//!   the conversation to the chosen agent, or to a fallback.
//!
//! Built-in processors:
//!
//! | Processor | Stage | Effect |
//! |-----------|-------|--------|
//! | [`SystemPromptProcessor`] | input | adds system instructions if missing |
//! | [`StructuredOutputProcessor`] | both | strict JSON schema in, object result out |
//! | [`ToolProcessor`] | both | advertises tools, runs tool calls, calls the agent again |
//!
//! # Example
//!
//! ```no_run
//! use lodestar_agent::{Agent, ChatAgent, Handoff, MultiAgent, StructuredOutputProcessor};
//! use lodestar_models::{Message, MessageBag, Options};
//! use lodestar_platform::RoutingPlatform;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), lodestar_agent::AgentError> {
//! let platform = Arc::new(RoutingPlatform::builder().build());
//!
//! let orchestrator = ChatAgent::builder(platform.clone(), "gpt-4o-mini")
//!     .name("orchestrator")
//!     .processor(StructuredOutputProcessor::new())
//!     .build();
//! let billing = ChatAgent::builder(platform.clone(), "gpt-4o").name("billing").build();
//! let general = ChatAgent::builder(platform, "gpt-4o-mini").name("general").build();
//!
//! let router = MultiAgent::new(
//!     orchestrator,
//!     vec![Handoff::new(billing, ["invoices", "refunds"])?],
//!     general,
//! )?;
//!
//! let _answer = router
//!     .call(MessageBag::new().with(Message::user("Where is my refund?")), Options::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod agent;
pub mod error;
mod multi_agent;
pub mod processor;

pub use agent::{Agent, ChatAgent, ChatAgentBuilder};
pub use error::AgentError;
pub use multi_agent::{Decision, Handoff, MultiAgent};
pub use processor::{
    AgentAware, AgentSlot, Input, InputProcessor, Output, OutputProcessor,
    StructuredOutputProcessor, SystemPromptProcessor, ToolHandler, ToolProcessor, ToolRegistry,
    Toolbox,
};

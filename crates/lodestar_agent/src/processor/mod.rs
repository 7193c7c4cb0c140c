//! Input and output processors.
//!
//! A [`ChatAgent`](crate::ChatAgent) runs its input processors, in
//! registration order, over an [`Input`] before the platform call, and its
//! output processors over an [`Output`] afterwards. Each processor sees every
//! mutation made by the ones before it.
//!
//! Processors that need to call back into their agent (for example to
//! continue a tool-calling loop) return themselves from `agent_aware()`; the
//! agent builder hands them a weak back-reference once, at build time.

mod structured;
mod system_prompt;
mod tools;

pub use structured::{StructuredOutputProcessor, normalize_schema_for_strict_mode};
pub use system_prompt::SystemPromptProcessor;
pub use tools::{ToolHandler, ToolProcessor, ToolRegistry, Toolbox};

use crate::agent::Agent;
use crate::error::AgentError;
use async_trait::async_trait;
use lodestar_models::{MessageBag, Model, Options};
use lodestar_platform::ModelResult;
use std::sync::{Arc, OnceLock, Weak};

/// The request as seen by input processors.
#[derive(Debug, Clone)]
pub struct Input {
    /// The resolved model.
    pub model: Model,
    /// The conversation to send.
    pub messages: MessageBag,
    /// Invocation options.
    pub options: Options,
}

/// The answer as seen by output processors.
#[derive(Debug)]
pub struct Output {
    /// The model that produced the result.
    pub model: Model,
    /// The converted result. Processors may replace it.
    pub result: ModelResult,
    /// The conversation that was sent.
    pub messages: MessageBag,
    /// The options the request was made with.
    pub options: Options,
}

/// Mutates a request before it is sent.
#[async_trait]
pub trait InputProcessor: Send + Sync + 'static {
    /// Processes the request in place.
    ///
    /// # Errors
    ///
    /// An error aborts the call.
    async fn process_input(&self, input: &mut Input) -> Result<(), AgentError>;

    /// Returns the back-reference setter, if this processor wants one.
    fn agent_aware(&self) -> Option<&dyn AgentAware> {
        None
    }
}

/// Mutates or replaces a result after it is received.
#[async_trait]
pub trait OutputProcessor: Send + Sync + 'static {
    /// Processes the answer in place.
    ///
    /// # Errors
    ///
    /// An error aborts the call.
    async fn process_output(&self, output: &mut Output) -> Result<(), AgentError>;

    /// Returns the back-reference setter, if this processor wants one.
    fn agent_aware(&self) -> Option<&dyn AgentAware> {
        None
    }
}

/// Receives a reference to the agent a processor belongs to.
pub trait AgentAware: Send + Sync {
    /// Stores the owning agent. Called once by the agent builder.
    fn set_agent(&self, agent: Weak<dyn Agent>);
}

/// A write-once slot for an agent back-reference.
///
/// The first assignment wins; later ones are ignored.
#[derive(Default)]
pub struct AgentSlot(OnceLock<Weak<dyn Agent>>);

impl AgentSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Stores `agent` unless the slot is already filled.
    ///
    /// Returns whether the value was stored.
    pub fn set(&self, agent: Weak<dyn Agent>) -> bool {
        self.0.set(agent).is_ok()
    }

    /// Returns the agent if it is set and still alive.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn Agent>> {
        self.0.get().and_then(Weak::upgrade)
    }

    /// Returns whether a back-reference was ever stored.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.get().is_some()
    }
}

impl core::fmt::Debug for AgentSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("AgentSlot").field(&self.is_set()).finish()
    }
}

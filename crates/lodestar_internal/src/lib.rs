//! # Lodestar Internal Library
//!
//! Re-exports the core Lodestar crates for convenience.

/// Models, catalogs and conversation types.
pub use lodestar_models;

/// Provider dispatch, deferred results and caching.
pub use lodestar_platform;

/// Chat agents, processors and multi-agent routing.
pub use lodestar_agent;

/// Process-wide tracing setup.
pub use lodestar_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use lodestar_agent::{
        Agent, AgentError, ChatAgent, Handoff, InputProcessor, MultiAgent, OutputProcessor,
        StructuredOutputProcessor, SystemPromptProcessor, ToolHandler, ToolProcessor,
        ToolRegistry,
    };
    pub use lodestar_core::{TracingConfig, TracingFormat};
    pub use lodestar_models::catalog::{CatalogEntry, ModelCatalog, StaticModelCatalog};
    pub use lodestar_models::{
        Capability, Content, Message, MessageBag, Model, Options, Role, Tool, ToolCall,
    };
    pub use lodestar_platform::{
        CachedPlatform, DeferredResult, InMemoryCache, ModelResult, Platform, PlatformError,
        RawResult, RequestInput, ResultConverter, RoutingPlatform, Transport,
    };
}

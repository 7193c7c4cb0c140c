//! Example support desk built with Lodestar.
//!
//! A router agent reads each question and hands it to a specialist. The
//! models are served by an offline provider, so the whole pipeline runs
//! without network access or API keys.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  MultiAgent "support-desk"                                   │
//! │                                                              │
//! │  ┌──────────────┐  Decision  ┌──────────┐                    │
//! │  │ orchestrator │───────────▶│  orders  │──▶ order_status    │
//! │  └──────────────┘     │      └──────────┘                    │
//! │                       ├─────▶┌──────────┐                    │
//! │                       │      │ billing  │                    │
//! │                       │      └──────────┘                    │
//! │                       └─────▶┌──────────┐                    │
//! │                     fallback │ general  │                    │
//! │                              └──────────┘                    │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                ▼
//!              CachedPlatform ─▶ RoutingPlatform ─▶ DeskTransport
//! ```

pub mod provider;
pub mod tools;

pub use provider::{ChatCompletionConverter, DeskTransport};
pub use tools::OrderStatus;

use lodestar_agent::{
    AgentError, ChatAgent, Handoff, MultiAgent, StructuredOutputProcessor, SystemPromptProcessor,
    ToolProcessor, ToolRegistry,
};
use lodestar_platform::{CachedPlatform, InMemoryCache, Platform, RoutingPlatform};
use std::sync::Arc;

/// Name of the router agent.
pub const DESK_NAME: &str = "support-desk";

/// Builds the routing platform over the offline provider, wrapped in an
/// in-memory result cache.
#[must_use]
pub fn platform() -> Arc<CachedPlatform<RoutingPlatform>> {
    let routing = RoutingPlatform::builder()
        .catalog(provider::catalog())
        .transport(DeskTransport)
        .converter(ChatCompletionConverter)
        .build();

    Arc::new(CachedPlatform::new(routing, Arc::new(InMemoryCache::new())))
}

/// Builds the support desk router on `platform`.
///
/// # Errors
///
/// Returns an error if a tool schema cannot be generated or the router is
/// misconfigured.
pub fn support_desk(platform: Arc<dyn Platform>) -> Result<MultiAgent, AgentError> {
    let orchestrator = ChatAgent::builder(platform.clone(), "desk-router")
        .name("orchestrator")
        .processor(StructuredOutputProcessor::new())
        .build();

    let orders = ChatAgent::builder(platform.clone(), "desk-agent?temperature=0.2")
        .name("orders")
        .input_processor(SystemPromptProcessor::new("the orders team"))
        .processor(ToolProcessor::new(ToolRegistry::new().with(OrderStatus::new()?)))
        .build();

    let billing = ChatAgent::builder(platform.clone(), "desk-agent")
        .name("billing")
        .input_processor(SystemPromptProcessor::new("the billing team"))
        .build();

    let general = ChatAgent::builder(platform, "desk-agent")
        .name("general")
        .input_processor(SystemPromptProcessor::new("the front desk"))
        .build();

    Ok(MultiAgent::new(
        orchestrator,
        vec![
            Handoff::new(orders, ["order status", "shipping", "delivery"])?,
            Handoff::new(billing, ["invoices", "refunds", "charges"])?,
        ],
        general,
    )?
    .with_name(DESK_NAME))
}

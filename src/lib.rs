//! A multi-provider LLM invocation runtime.
//!
//! Lodestar resolves model names against a catalog, dispatches requests to
//! provider transports, converts answers into uniform results on first read,
//! caches them, and layers agents with input and output processors on top.

pub use lodestar_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use lodestar_internal::prelude::*;
}

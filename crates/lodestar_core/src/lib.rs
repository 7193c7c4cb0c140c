//! Application-level setup for Lodestar.
//!
//! Library crates in the workspace only emit `tracing` events. Without a
//! subscriber those events are discarded; an application that wants to see
//! them installs one through [`TracingConfig`].

mod tracing_config;

pub use tracing_config::{FormatParseError, TracingConfig, TracingFormat};

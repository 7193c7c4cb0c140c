//! Tracing subscriber configuration.
//!
//! # Example
//!
//! ```
//! use lodestar_core::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! // Development: pretty output, debug events from the platform only.
//! TracingConfig::new()
//!     .with_format(TracingFormat::Pretty)
//!     .with_env_filter("lodestar_platform=debug,lodestar_agent=info")
//!     .init();
//!
//! // Production: JSON lines at info level.
//! let config = TracingConfig::new()
//!     .with_level(Level::INFO)
//!     .with_format(TracingFormat::Json);
//! assert_eq!(config.format(), TracingFormat::Json);
//! ```

use core::str::FromStr;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

/// Error returned when parsing an unknown [`TracingFormat`] name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tracing format '{0}', expected pretty, compact or json")]
pub struct FormatParseError(String);

impl FromStr for TracingFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for the process-wide tracing subscriber.
///
/// [`init`](Self::init) installs a registry with an [`EnvFilter`] and a
/// formatting layer. The filter comes from [`with_env_filter`](Self::with_env_filter)
/// when set and valid, and from the level otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    level: Level,
    format: TracingFormat,
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Environment variable holding a filter directive string.
    pub const FILTER_VAR: &'static str = "LODESTAR_LOG";
    /// Environment variable holding the output format name.
    pub const FORMAT_VAR: &'static str = "LODESTAR_LOG_FORMAT";

    /// Creates a configuration with default settings: `INFO`, pretty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from [`FILTER_VAR`](Self::FILTER_VAR) and
    /// [`FORMAT_VAR`](Self::FORMAT_VAR). Unset or unparsable values keep
    /// their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(filter) = std::env::var(Self::FILTER_VAR)
            && !filter.trim().is_empty()
        {
            config.env_filter = Some(filter);
        }
        if let Some(format) = std::env::var(Self::FORMAT_VAR)
            .ok()
            .and_then(|name| name.parse().ok())
        {
            config.format = format;
        }
        config
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a filter directive string, `target=level,target=level,...`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the configured level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Returns the configured format.
    #[must_use]
    pub fn format(&self) -> TracingFormat {
        self.format
    }

    /// Returns the filter directive string, if any.
    #[must_use]
    pub fn env_filter(&self) -> Option<&str> {
        self.env_filter.as_deref()
    }

    /// Builds the filter. An invalid directive string falls back to the level.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        self.env_filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.as_str()))
    }

    /// Installs the subscriber.
    ///
    /// Returns `false` if a global subscriber was already installed, in which
    /// case this configuration is ignored.
    pub fn init(&self) -> bool {
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };
        let registry = tracing_subscriber::registry().with(self.filter());

        let installed = match self.format {
            TracingFormat::Pretty => registry
                .with(tracing_subscriber::fmt::layer().pretty().with_span_events(span_events))
                .try_init(),
            TracingFormat::Compact => registry
                .with(tracing_subscriber::fmt::layer().compact().with_span_events(span_events))
                .try_init(),
            TracingFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json().with_span_events(span_events))
                .try_init(),
        }
        .is_ok();

        if installed {
            tracing::debug!(
                level = %self.level,
                format = ?self.format,
                filter = self.env_filter.as_deref(),
                "Tracing initialized"
            );
        }
        installed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn defaults_are_info_and_pretty() {
        let config = TracingConfig::default();
        assert_eq!(config.level(), Level::INFO);
        assert_eq!(config.format(), TracingFormat::Pretty);
        assert_eq!(config.env_filter(), None);
    }

    #[test]
    fn builder_sets_every_field() {
        let config = TracingConfig::new()
            .with_level(Level::DEBUG)
            .with_format(TracingFormat::Compact)
            .with_env_filter("lodestar_platform=trace")
            .with_span_events(true);

        assert_eq!(config.level(), Level::DEBUG);
        assert_eq!(config.format(), TracingFormat::Compact);
        assert_eq!(config.env_filter(), Some("lodestar_platform=trace"));
        assert!(config.span_events);
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("JSON".parse::<TracingFormat>(), Ok(TracingFormat::Json));
        assert_eq!(" compact ".parse::<TracingFormat>(), Ok(TracingFormat::Compact));
        assert_eq!(
            "yaml".parse::<TracingFormat>().unwrap_err().to_string(),
            "unknown tracing format 'yaml', expected pretty, compact or json"
        );
    }

    #[test]
    fn invalid_directives_fall_back_to_the_level() {
        let config = TracingConfig::new()
            .with_level(Level::WARN)
            .with_env_filter("lodestar=notalevel");
        assert_eq!(config.filter().max_level_hint(), Some(LevelFilter::WARN));

        let config = TracingConfig::new().with_env_filter("lodestar_agent=debug");
        assert_eq!(config.filter().max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn second_init_is_ignored() {
        TracingConfig::new().with_format(TracingFormat::Compact).init();
        assert!(!TracingConfig::new().with_format(TracingFormat::Json).init());
    }
}

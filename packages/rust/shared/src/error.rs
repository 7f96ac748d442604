//! Error types for CiteLens.
//!
//! Library crates use [`CiteLensError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Provider failures are recovered at the probe call site and recorded as
//! absent results; they only appear here when a single-provider operation
//! is asked for directly.

use std::path::PathBuf;

/// Top-level error type for all CiteLens operations.
#[derive(Debug, thiserror::Error)]
pub enum CiteLensError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside any specific provider call.
    #[error("network error: {0}")]
    Network(String),

    /// A single answer-engine provider call failed (transport, timeout,
    /// 4xx/5xx, or malformed payload).
    #[error("provider `{provider}` failed: {message}")]
    Provider { provider: String, message: String },

    /// No providers are enabled; probe and analysis entry points cannot do
    /// useful work.
    #[error("no answer-engine providers are enabled")]
    NoProvidersEnabled,

    /// Citation graph / storage layer error.
    #[error("graph error: {0}")]
    Graph(String),

    /// Content or response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CiteLensError>;

impl CiteLensError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a provider error attributed to a named provider.
    pub fn provider(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CiteLensError::config("missing provider entry");
        assert_eq!(err.to_string(), "config error: missing provider entry");

        let err = CiteLensError::provider("perplexity", "HTTP 429");
        assert_eq!(err.to_string(), "provider `perplexity` failed: HTTP 429");

        let err = CiteLensError::NoProvidersEnabled;
        assert!(err.to_string().contains("no answer-engine providers"));
    }
}

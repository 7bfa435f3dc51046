//! # Error Types
//!
//! Defines error types used across subsystems.

use thiserror::Error;

/// Failure raised by user-supplied callbacks (subscribers, factories, hooks).
///
/// Callbacks are arbitrary user code, so they report through `anyhow` and the
/// kernel wraps the error in its own typed variant before surfacing it.
pub type HandlerError = anyhow::Error;

/// Errors produced while invoking a repository method.
#[derive(Debug, Error)]
pub enum MethodError {
    /// The target exposes no callable member with this name.
    #[error("Unknown method: {method}")]
    UnknownMethod { method: String },

    /// The arguments did not match what the method expects.
    #[error("Invalid arguments for {method}: {reason}")]
    InvalidArguments { method: String, reason: String },

    /// The method (or a middleware wrapping it) failed.
    #[error("Method {method} failed: {source}")]
    Failed {
        method: String,
        #[source]
        source: HandlerError,
    },
}

impl MethodError {
    /// Build an `InvalidArguments` error.
    pub fn invalid_arguments(method: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap an arbitrary failure raised while running `method`.
    pub fn failed(method: &str, source: impl Into<HandlerError>) -> Self {
        Self::Failed {
            method: method.to_string(),
            source: source.into(),
        }
    }

    /// Name of the method the error refers to.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::UnknownMethod { method }
            | Self::InvalidArguments { method, .. }
            | Self::Failed { method, .. } => method,
        }
    }
}

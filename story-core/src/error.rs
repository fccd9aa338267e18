//! Error types for the story pipeline.
//!
//! Generation failures live next to the client in [`crate::generation`];
//! this module holds configuration and session errors and re-exports the rest.

use crate::id::SessionId;
use thiserror::Error;

pub use crate::generation::{FailureKind, GenerationFailure, GeneratorError};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is outside its allowed range.
    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: String, reason: String },

    /// A string could not be parsed into one of the closed enums.
    #[error("Unknown {kind}: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },

    /// The TOML document is malformed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No API key is available for the text-generation service.
    #[error("No API key configured - set ANTHROPIC_API_KEY environment variable")]
    NoApiKey,
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from [`crate::session::StorySession`] and the session registry.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A fatal generation failure (authentication or malformed request).
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationFailure),

    /// The operation is not allowed in the session's current state.
    #[error("Invalid session state: {reason}")]
    InvalidSessionState { reason: String },

    /// No session with this id is registered.
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    /// The child's name is empty or too short.
    #[error("Child name must contain at least {min} characters")]
    InvalidChildName { min: usize },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SessionError {
    pub(crate) fn state(reason: impl Into<String>) -> Self {
        Self::InvalidSessionState {
            reason: reason.into(),
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::invalid("retry.max_attempts", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for retry.max_attempts: must be at least 1"
        );

        let err = SessionError::state("session is complete");
        assert_eq!(err.to_string(), "Invalid session state: session is complete");
    }

    #[test]
    fn test_error_conversion() {
        let failure = GenerationFailure::Authentication {
            reason: "bad key".to_string(),
        };
        let err: SessionError = failure.into();
        assert!(matches!(err, SessionError::Generation(_)));
    }
}

//! # Real-Time Errors
//!
//! Error types for the real-time module.

use thiserror::Error;

/// Result type for real-time operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Real-time errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    /// Channel name is empty or blank
    #[error("Invalid channel: {0:?}")]
    InvalidChannel(String),

    /// `connect()` was called outside a tokio runtime
    #[error("No tokio runtime available to drive the connection")]
    NoRuntime,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RealtimeError {
    /// Stable code for logs and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            RealtimeError::InvalidChannel(_) => "ARTBOARD_RT_INVALID_CHANNEL",
            RealtimeError::NoRuntime => "ARTBOARD_RT_NO_RUNTIME",
            RealtimeError::Internal(_) => "ARTBOARD_RT_INTERNAL",
            RealtimeError::ConfigError(_) => "ARTBOARD_RT_CONFIG",
        }
    }

    pub(crate) fn poisoned() -> Self {
        RealtimeError::Internal("Lock poisoned".into())
    }
}

/// Failure while building a synthetic payload.
///
/// The simulator skips the cycle instead of emitting a partial event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// A canned pool the generator draws from is empty
    #[error("Nothing to draw {0} from")]
    EmptyPool(&'static str),

    /// Source-specific failure
    #[error("Synthesis failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RealtimeError::InvalidChannel(String::new()).code(),
            "ARTBOARD_RT_INVALID_CHANNEL"
        );
        assert_eq!(RealtimeError::NoRuntime.code(), "ARTBOARD_RT_NO_RUNTIME");
        assert_eq!(RealtimeError::poisoned().code(), "ARTBOARD_RT_INTERNAL");
    }

    #[test]
    fn test_error_display() {
        let err = RealtimeError::InvalidChannel("  ".into());
        assert_eq!(err.to_string(), "Invalid channel: \"  \"");

        let err = SynthesisError::EmptyPool("authors");
        assert_eq!(err.to_string(), "Nothing to draw authors from");
    }
}

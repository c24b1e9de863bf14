//! Error taxonomy shared across the workspace

use std::time::Duration;
use thiserror::Error;

/// Why response generation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// Backend did not answer within the configured deadline
    Timeout,
    /// Backend unreachable or returned a server error
    Unavailable,
    /// Backend answered with no usable text
    Empty,
    /// Backend answered with a payload we could not parse
    Malformed,
}

impl std::fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationErrorKind::Timeout => write!(f, "timeout"),
            GenerationErrorKind::Unavailable => write!(f, "unavailable"),
            GenerationErrorKind::Empty => write!(f, "empty"),
            GenerationErrorKind::Malformed => write!(f, "malformed"),
        }
    }
}

/// Response generation failure with its kind, per the boundary contract
#[derive(Debug, Clone, Error)]
#[error("generation failed ({kind}): {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Timeout, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Unavailable, message)
    }

    pub fn empty() -> Self {
        Self::new(GenerationErrorKind::Empty, "backend returned no text")
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Malformed, message)
    }

    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            GenerationErrorKind::Timeout | GenerationErrorKind::Unavailable
        )
    }
}

/// Workspace-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// No speech detected within the silence window. Recoverable: the
    /// orchestrator silently returns to idle.
    #[error("no speech detected within {0:?}")]
    CaptureTimeout(Duration),

    /// Microphone or recognizer device error
    #[error("capture failure: {0}")]
    CaptureFailure(String),

    /// Language model backend failure
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// TTS or audio output failure
    #[error("synthesis failure: {0}")]
    Synthesis(String),

    /// Cue table malformed or clock unavailable. Never crashes the render
    /// loop; the synchronizer substitutes the idle loop instead.
    #[error("synchronization fault: {0}")]
    Synchronization(String),

    /// Configuration or asset loading problem
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn capture(message: impl Into<String>) -> Self {
        Error::CaptureFailure(message.into())
    }

    pub fn synthesis(message: impl Into<String>) -> Self {
        Error::Synthesis(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::timeout("no answer after 10s");
        assert_eq!(
            err.to_string(),
            "generation failed (timeout): no answer after 10s"
        );
        assert!(err.is_retryable());
        assert!(!GenerationError::empty().is_retryable());
    }

    #[test]
    fn test_error_from_generation() {
        let err: Error = GenerationError::unavailable("connection refused").into();
        assert!(matches!(err, Error::Generation(_)));
    }
}

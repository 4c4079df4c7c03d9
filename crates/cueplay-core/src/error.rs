//! Error types for cueplay core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
///
/// These cover construction and configuration only. Failures that happen
/// while a clip is playing are never returned as `Err`; they are normalized
/// into [`crate::PlaybackError`] and emitted as [`crate::PlayerEvent::Error`].
#[derive(Error, Debug)]
pub enum Error {
    // Capability errors
    #[error("No playback backend available: native HLS playback and the streaming engine are both unsupported")]
    Unsupported,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    // Session errors
    #[error("Invalid session state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl Error {
    /// Returns the error code for diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unsupported => "UNSUPPORTED",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ConfigParse(_) => "CONFIG_PARSE",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
        }
    }

    /// Returns true if this error leaves no usable player behind
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Unsupported | Error::InvalidStateTransition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Unsupported.error_code(), "UNSUPPORTED");
        assert_eq!(Error::InvalidConfig("x".into()).error_code(), "INVALID_CONFIG");

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(Error::from(parse).error_code(), "CONFIG_PARSE");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Unsupported.is_fatal());
        assert!(!Error::InvalidConfig("capacity".into()).is_fatal());
    }
}

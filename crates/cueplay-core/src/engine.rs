//! Streaming engine interface
//!
//! The engine fetches segments and feeds the media element. cueplay treats it
//! as opaque: it creates one per backend attachment, tells it what to load,
//! listens for manifest and error events and calls its recovery primitives.

use crate::events::SignalSink;
use crate::types::{EngineConfig, ListenerId, MediaHandle};
use serde::{Deserialize, Serialize};

/// Events the session controller subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineEventKind {
    MediaAttached,
    ManifestParsed,
    Error,
}

impl EngineEventKind {
    pub const ALL: [EngineEventKind; 3] = [
        EngineEventKind::MediaAttached,
        EngineEventKind::ManifestParsed,
        EngineEventKind::Error,
    ];
}

/// Events fired by a streaming engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The engine is bound to the element
    MediaAttached,
    /// The playable manifest has been parsed
    ManifestParsed { levels: usize },
    /// Structured engine error
    Error(EngineErrorData),
}

impl EngineEvent {
    pub fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::MediaAttached => EngineEventKind::MediaAttached,
            EngineEvent::ManifestParsed { .. } => EngineEventKind::ManifestParsed,
            EngineEvent::Error(_) => EngineEventKind::Error,
        }
    }
}

/// Engine error categories, parsed from the engine's string codes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineErrorType {
    Network,
    Media,
    KeySystem,
    Mux,
    Other,
    /// A code this crate does not know about
    Unknown(String),
}

impl EngineErrorType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "networkError" => EngineErrorType::Network,
            "mediaError" => EngineErrorType::Media,
            "keySystemError" => EngineErrorType::KeySystem,
            "muxError" => EngineErrorType::Mux,
            "otherError" => EngineErrorType::Other,
            other => EngineErrorType::Unknown(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            EngineErrorType::Network => "networkError",
            EngineErrorType::Media => "mediaError",
            EngineErrorType::KeySystem => "keySystemError",
            EngineErrorType::Mux => "muxError",
            EngineErrorType::Other => "otherError",
            EngineErrorType::Unknown(code) => code,
        }
    }
}

/// Payload of engine error events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineErrorData {
    pub error_type: EngineErrorType,
    pub details: String,
    pub fatal: bool,
}

impl EngineErrorData {
    pub fn new(error_type: EngineErrorType, details: impl Into<String>, fatal: bool) -> Self {
        Self {
            error_type,
            details: details.into(),
            fatal,
        }
    }

    /// Build from the engine's raw string code
    pub fn from_code(code: &str, details: impl Into<String>, fatal: bool) -> Self {
        Self::new(EngineErrorType::from_code(code), details, fatal)
    }
}

/// A live streaming engine instance
pub trait StreamingEngine {
    /// Bind to the media element identified by `media`
    fn attach_media(&mut self, media: MediaHandle);
    /// Start loading a manifest
    fn load_source(&mut self, locator: &str);

    fn add_listener(&mut self, event: EngineEventKind, sink: SignalSink) -> ListenerId;
    fn remove_listener(&mut self, id: ListenerId);

    /// Recovery primitive for fatal network errors
    fn start_load(&mut self);
    /// Recovery primitive for fatal media errors
    fn recover_media_error(&mut self);

    /// Release every resource; the instance is not used afterwards
    fn destroy(&mut self);
}

/// Factory and platform probe for streaming engines
pub trait EngineProvider {
    /// Whether the platform can run the engine at all
    fn is_supported(&self) -> bool;
    /// Create an engine; it owns `config` outright
    fn create(&self, config: EngineConfig) -> Box<dyn StreamingEngine>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_codes() {
        for code in ["networkError", "mediaError", "keySystemError", "muxError", "otherError"] {
            assert_eq!(EngineErrorType::from_code(code).code(), code);
        }
        assert_eq!(
            EngineErrorType::from_code("futureError"),
            EngineErrorType::Unknown("futureError".to_string())
        );
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(
            EngineEvent::ManifestParsed { levels: 3 }.kind(),
            EngineEventKind::ManifestParsed
        );
        let error = EngineEvent::Error(EngineErrorData::from_code("mediaError", "bufferStalledError", false));
        assert_eq!(error.kind(), EngineEventKind::Error);
    }
}

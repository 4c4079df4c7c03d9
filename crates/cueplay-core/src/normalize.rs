//! Mapping from backend-native events and errors to the public taxonomy
//!
//! Every error surfaced to callers is built here. The mappings are total:
//! unknown codes land in [`ErrorType::OtherError`] instead of passing through.

use crate::engine::{EngineErrorData, EngineErrorType};
use crate::events::PlayerEvent;
use crate::media::{MediaElement, MediaErrorCode, MediaErrorInfo, MediaEvent};
use crate::types::VolumeState;
use serde::{Deserialize, Serialize};

/// Public error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    NetworkError,
    MediaError,
    OtherError,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorType::NetworkError => write!(f, "NetworkError"),
            ErrorType::MediaError => write!(f, "MediaError"),
            ErrorType::OtherError => write!(f, "OtherError"),
        }
    }
}

/// Payload of public `Error` events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackError {
    #[serde(rename = "type")]
    error_type: ErrorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fatal: Option<bool>,
}

impl PlaybackError {
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn fatal(&self) -> Option<bool> {
        self.fatal
    }
}

impl std::fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error_type)?;
        if let Some(details) = &self.details {
            write!(f, ": {}", details)?;
        }
        if self.fatal == Some(true) {
            write!(f, " (fatal)")?;
        }
        Ok(())
    }
}

/// Collapse an engine error category into the public taxonomy
pub fn classify_engine_error(error_type: &EngineErrorType) -> ErrorType {
    match error_type {
        EngineErrorType::Network => ErrorType::NetworkError,
        EngineErrorType::Media => ErrorType::MediaError,
        EngineErrorType::KeySystem
        | EngineErrorType::Mux
        | EngineErrorType::Other
        | EngineErrorType::Unknown(_) => ErrorType::OtherError,
    }
}

/// Collapse a media element error code into the public taxonomy
pub fn classify_media_error(code: MediaErrorCode) -> ErrorType {
    match code {
        MediaErrorCode::Network | MediaErrorCode::SrcNotSupported => ErrorType::NetworkError,
        MediaErrorCode::Decode => ErrorType::MediaError,
        MediaErrorCode::Aborted | MediaErrorCode::Unknown(_) => ErrorType::OtherError,
    }
}

/// Normalize a structured engine error
pub fn engine_error(data: &EngineErrorData) -> PlaybackError {
    PlaybackError {
        error_type: classify_engine_error(&data.error_type),
        details: Some(data.details.clone()),
        fatal: Some(data.fatal),
    }
}

/// Normalize the element's error state.
///
/// Element errors end the current clip, so they are always fatal. An error
/// event without error state is reported as `OtherError`.
pub fn media_error(info: Option<&MediaErrorInfo>) -> PlaybackError {
    match info {
        Some(info) => PlaybackError {
            error_type: classify_media_error(info.code),
            details: Some(
                info.message
                    .clone()
                    .unwrap_or_else(|| info.code.name().to_string()),
            ),
            fatal: Some(true),
        },
        None => PlaybackError {
            error_type: ErrorType::OtherError,
            details: None,
            fatal: Some(true),
        },
    }
}

/// Map a raw element event to its public event, reading the payload from the
/// element as it is right now.
pub fn media_event(event: MediaEvent, element: &dyn MediaElement) -> PlayerEvent {
    match event {
        MediaEvent::Ended => PlayerEvent::Finish,
        MediaEvent::Error => PlayerEvent::Error(media_error(element.error().as_ref())),
        MediaEvent::LoadedMetadata => PlayerEvent::Ready,
        MediaEvent::Pause => PlayerEvent::Pause,
        MediaEvent::Play => PlayerEvent::Resume,
        MediaEvent::Progress => PlayerEvent::Buffer(element.buffered()),
        MediaEvent::RateChange => PlayerEvent::Speed(element.playback_rate()),
        MediaEvent::Seeked => PlayerEvent::Seek(element.current_time()),
        MediaEvent::TimeUpdate => PlayerEvent::Progress(element.current_time()),
        MediaEvent::VolumeChange => PlayerEvent::Volume(VolumeState {
            volume: element.volume(),
            muted: element.muted(),
        }),
    }
}

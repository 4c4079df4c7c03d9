//! Media element interface
//!
//! The element decodes and renders; cueplay only drives it. Implementations
//! wrap whatever the host has (a browser video element, a GStreamer
//! pipeline, a test double) and forward their lifecycle events into the
//! [`SignalSink`] handed to [`MediaElement::add_listener`].

use crate::events::SignalSink;
use crate::types::{ListenerId, MediaHandle, TimeRanges};
use serde::{Deserialize, Serialize};

/// MIME type probed to decide whether the element plays HLS natively
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// Raw lifecycle events fired by a media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEvent {
    Ended,
    Error,
    LoadedMetadata,
    Pause,
    Play,
    Progress,
    RateChange,
    Seeked,
    TimeUpdate,
    VolumeChange,
}

impl MediaEvent {
    /// Every event the session controller listens to
    pub const ALL: [MediaEvent; 10] = [
        MediaEvent::Ended,
        MediaEvent::Error,
        MediaEvent::LoadedMetadata,
        MediaEvent::Pause,
        MediaEvent::Play,
        MediaEvent::Progress,
        MediaEvent::RateChange,
        MediaEvent::Seeked,
        MediaEvent::TimeUpdate,
        MediaEvent::VolumeChange,
    ];

    /// DOM-style event name
    pub fn name(&self) -> &'static str {
        match self {
            MediaEvent::Ended => "ended",
            MediaEvent::Error => "error",
            MediaEvent::LoadedMetadata => "loadedmetadata",
            MediaEvent::Pause => "pause",
            MediaEvent::Play => "play",
            MediaEvent::Progress => "progress",
            MediaEvent::RateChange => "ratechange",
            MediaEvent::Seeked => "seeked",
            MediaEvent::TimeUpdate => "timeupdate",
            MediaEvent::VolumeChange => "volumechange",
        }
    }
}

impl std::fmt::Display for MediaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Media element error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaErrorCode {
    /// Fetching was aborted by the user agent (1)
    Aborted,
    /// A network error stopped fetching (2)
    Network,
    /// Decoding failed (3)
    Decode,
    /// The source is not supported (4)
    SrcNotSupported,
    /// Anything the element reports outside the known table
    Unknown(u16),
}

impl MediaErrorCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => MediaErrorCode::Aborted,
            2 => MediaErrorCode::Network,
            3 => MediaErrorCode::Decode,
            4 => MediaErrorCode::SrcNotSupported,
            other => MediaErrorCode::Unknown(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            MediaErrorCode::Aborted => 1,
            MediaErrorCode::Network => 2,
            MediaErrorCode::Decode => 3,
            MediaErrorCode::SrcNotSupported => 4,
            MediaErrorCode::Unknown(code) => *code,
        }
    }

    /// Constant name used as the error details when the element gives none
    pub fn name(&self) -> &'static str {
        match self {
            MediaErrorCode::Aborted => "MEDIA_ERR_ABORTED",
            MediaErrorCode::Network => "MEDIA_ERR_NETWORK",
            MediaErrorCode::Decode => "MEDIA_ERR_DECODE",
            MediaErrorCode::SrcNotSupported => "MEDIA_ERR_SRC_NOT_SUPPORTED",
            MediaErrorCode::Unknown(_) => "MEDIA_ERR_UNKNOWN",
        }
    }
}

/// Error state reported by the element after an `error` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaErrorInfo {
    pub code: MediaErrorCode,
    pub message: Option<String>,
}

impl MediaErrorInfo {
    pub fn new(code: MediaErrorCode) -> Self {
        Self { code, message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Capabilities the core needs from a media element
pub trait MediaElement {
    /// Stable identity used to bind a streaming engine
    fn handle(&self) -> MediaHandle;

    /// Whether the element can play the given MIME type by itself
    fn can_play_type(&self, mime: &str) -> bool;

    fn set_source(&mut self, locator: &str);
    fn play(&mut self);
    fn pause(&mut self);
    fn paused(&self) -> bool;

    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, time: f64);
    /// Duration in seconds; NaN while unknown, infinite for live streams
    fn duration(&self) -> f64;

    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);

    fn buffered(&self) -> TimeRanges;
    /// Error state, populated once an `error` event fired
    fn error(&self) -> Option<MediaErrorInfo>;

    /// Forward `event` occurrences into `sink` until removed
    fn add_listener(&mut self, event: MediaEvent, sink: SignalSink) -> ListenerId;
    fn remove_listener(&mut self, id: ListenerId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(MediaEvent::LoadedMetadata.name(), "loadedmetadata");
        assert_eq!(MediaEvent::TimeUpdate.to_string(), "timeupdate");
        assert_eq!(MediaEvent::ALL.len(), 10);
    }

    #[test]
    fn test_error_code_table() {
        for code in 1..=4 {
            assert_eq!(MediaErrorCode::from_code(code).code(), code);
        }
        assert_eq!(MediaErrorCode::from_code(3), MediaErrorCode::Decode);
        assert_eq!(MediaErrorCode::from_code(42), MediaErrorCode::Unknown(42));
        assert_eq!(MediaErrorCode::Unknown(42).name(), "MEDIA_ERR_UNKNOWN");
    }
}

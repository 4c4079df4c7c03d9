//! Core types for cueplay

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique identifier for a player session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a media element so a streaming engine can bind to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaHandle(pub Uuid);

impl MediaHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MediaHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration returned by `add_listener` on elements and engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

// =============================================================================
// Clips
// =============================================================================

/// A single playable unit: a source locator, an optional start offset and
/// arbitrary caller metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Locator resolved by the active backend
    pub source: String,
    /// Seek offset in seconds, applied once the clip is ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    /// Extra caller metadata, carried untouched
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Clip {
    /// Create a clip that starts at the beginning
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            start: None,
            metadata: Map::new(),
        }
    }

    /// Set the start offset
    pub fn with_start(mut self, start: f64) -> Self {
        self.start = Some(start);
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl From<&str> for Clip {
    fn from(source: &str) -> Self {
        Clip::new(source)
    }
}

/// One clip or a sequence of clips, normalized to a sequence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clips(pub Vec<Clip>);

impl Clips {
    pub fn into_vec(self) -> Vec<Clip> {
        self.0
    }
}

impl From<Clip> for Clips {
    fn from(clip: Clip) -> Self {
        Clips(vec![clip])
    }
}

impl From<Vec<Clip>> for Clips {
    fn from(clips: Vec<Clip>) -> Self {
        Clips(clips)
    }
}

impl From<&[Clip]> for Clips {
    fn from(clips: &[Clip]) -> Self {
        Clips(clips.to_vec())
    }
}

impl<const N: usize> From<[Clip; N]> for Clips {
    fn from(clips: [Clip; N]) -> Self {
        Clips(clips.into())
    }
}

// =============================================================================
// Event payloads
// =============================================================================

/// A single buffered interval in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

/// Buffered-ranges descriptor carried by `Buffer` events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRanges(pub Vec<TimeRange>);

impl TimeRanges {
    pub fn new(ranges: Vec<TimeRange>) -> Self {
        Self(ranges)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// End of the furthest buffered range
    pub fn end(&self) -> Option<f64> {
        self.0.iter().map(|r| r.end).reduce(f64::max)
    }
}

/// Payload of `Volume` events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeState {
    pub volume: f64,
    pub muted: bool,
}

// =============================================================================
// Backend selection and session state
// =============================================================================

/// Which playback path drives the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// The element plays the stream itself
    Native,
    /// The streaming engine feeds the element
    StreamingEngine,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Native => write!(f, "native"),
            BackendKind::StreamingEngine => write!(f, "streaming-engine"),
        }
    }
}

/// Capability facts probed once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// The element can play HLS without help
    pub native: bool,
    /// The streaming engine reports platform support
    pub engine: bool,
}

impl Capabilities {
    /// Deterministic backend selection.
    ///
    /// Native wins only when it is available and preferred. Otherwise the
    /// engine is used if supported, and a native-only platform falls back to
    /// native. `None` means nothing can play.
    pub fn select(&self, prefer_native: bool) -> Option<BackendKind> {
        match (self.native, self.engine) {
            (false, false) => None,
            (true, _) if prefer_native => Some(BackendKind::Native),
            (_, true) => Some(BackendKind::StreamingEngine),
            (true, false) => Some(BackendKind::Native),
        }
    }
}

/// Session controller state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No backend and no element listeners
    Unattached,
    /// Selecting a backend from capability facts
    Probing,
    /// Native backend attached
    NativeActive,
    /// Streaming engine attached
    EngineActive,
    /// Torn down; every call is a no-op
    Destroyed,
}

impl SessionState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Unattached, Probing) |
            (Probing, NativeActive) | (Probing, EngineActive) | (Probing, Destroyed) |
            // A fresh play() rebuilds the backend
            (NativeActive, Probing) | (EngineActive, Probing) |
            (NativeActive, Destroyed) | (EngineActive, Destroyed)
        )
    }

    /// State reached once a backend of this kind is attached
    pub fn active(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Native => SessionState::NativeActive,
            BackendKind::StreamingEngine => SessionState::EngineActive,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::NativeActive | SessionState::EngineActive)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unattached => write!(f, "unattached"),
            SessionState::Probing => write!(f, "probing"),
            SessionState::NativeActive => write!(f, "native-active"),
            SessionState::EngineActive => write!(f, "engine-active"),
            SessionState::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// What happens to the queue when a clip finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Move the cursor forward through the queue
    #[default]
    Cursor,
    /// Drop the finished clip and play whatever is now at the front
    ShrinkingQueue,
}

// =============================================================================
// Configuration
// =============================================================================

/// Free-form streaming engine configuration.
///
/// The engine is always handed its own copy, so nothing it does to its
/// configuration is visible to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineConfig(pub Map<String, Value>);

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, returning self for chaining
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Record diagnostics through the injected sink
    pub debug: bool,
    /// Use native playback when the element supports it
    pub prefer_native: bool,
    /// Clips to start playing right after construction
    pub clips: Vec<Clip>,
    /// Options passed to the streaming engine
    pub engine: EngineConfig,
    /// Queue behavior on finish
    pub advance: AdvancePolicy,
    /// Public event buffer per subscriber
    pub event_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            prefer_native: false,
            clips: Vec::new(),
            engine: EngineConfig::default(),
            advance: AdvancePolicy::Cursor,
            event_capacity: 256,
        }
    }
}

impl PlayerConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfig(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        if let Some(clip) = self.clips.iter().find(|c| c.source.is_empty()) {
            return Err(Error::InvalidConfig(format!(
                "clip with empty source (start: {:?})",
                clip.start
            )));
        }
        Ok(())
    }
}

/// Point-in-time view of a player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub session_id: SessionId,
    pub state: SessionState,
    pub backend: Option<BackendKind>,
    pub current_clip: Option<Clip>,
    pub position: f64,
    pub duration: f64,
    pub paused: bool,
    pub volume: f64,
    pub muted: bool,
    pub speed: f64,
    pub queue_len: usize,
    pub has_next: bool,
}

//! cueplay Core - Queued clip playback over interchangeable backends
//!
//! This crate provides the orchestration layer between a caller playing a
//! queue of video clips and the thing that actually plays them:
//! - Clip playlist with a single forward cursor
//! - Backend selection (native element vs. streaming engine)
//! - Backend setup, teardown and replacement
//! - Normalization of element events and engine errors into one taxonomy
//! - Recovery of fatal network and media errors on the streaming path
//! - Auto-advance through the queue
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         cueplay Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Playlist   │  │    Player    │  │  Event Bus   │──► caller │
//! │  │   (cursor)   │◄─┤  (session)   ├─►│  (broadcast) │           │
//! │  └──────────────┘  └──────┬───────┘  └──────────────┘           │
//! │                           │      ▲                              │
//! │                    ┌──────┴────┐ │ normalized                   │
//! │                    │  Backend  │ │                              │
//! │                    │  Native   │ ┌┴─────────────┐               │
//! │                    │  Engine   │ │  Normalizer  │               │
//! │                    └─────┬─────┘ └──────▲───────┘               │
//! │                          │              │ signals               │
//! │               ┌──────────┴───┐   ┌──────┴───────┐               │
//! │               │ MediaElement │   │ Signal Sink  │               │
//! │               │ StreamEngine ├──►│ (generation) │               │
//! │               └──────────────┘   └──────────────┘               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cueplay_core::{Clip, Player, PlayerConfig, PlayerEvent};
//!
//! let mut player = Player::new(element, engines, PlayerConfig::default())?;
//! let mut events = player.subscribe();
//!
//! player.play(vec![Clip::new("a.m3u8"), Clip::new("b.m3u8").with_start(10.0)]);
//!
//! // From the host's event loop
//! player.pump();
//! while let Ok(event) = events.try_recv() {
//!     if let PlayerEvent::Error(error) = event {
//!         eprintln!("{error}");
//!     }
//! }
//! ```

pub mod backend;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod events;
pub mod media;
pub mod normalize;
pub mod playlist;
pub mod session;
pub mod types;

pub use backend::{recovery_for, RecoveryAction};
pub use diagnostics::{DiagnosticRecord, DiagnosticSink, MemorySink, TracingSink};
pub use engine::{
    EngineErrorData, EngineErrorType, EngineEvent, EngineEventKind, EngineProvider,
    StreamingEngine,
};
pub use error::{Error, Result};
pub use events::{EventKind, PlayerEvent, SignalSink};
pub use media::{MediaElement, MediaErrorCode, MediaErrorInfo, MediaEvent, HLS_MIME_TYPE};
pub use normalize::{ErrorType, PlaybackError};
pub use playlist::Playlist;
pub use session::Player;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "cueplay core initialized");
}

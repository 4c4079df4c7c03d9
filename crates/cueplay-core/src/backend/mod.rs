//! Playback backends
//!
//! A [`Backend`] is either the native element path or the streaming engine
//! path. The session controller owns at most one at a time and matches on it
//! at every call site, so the two can never be attached together.

mod engine;
mod native;

pub use engine::{recovery_for, RecoveryAction};

pub(crate) use engine::EngineBackend;
pub(crate) use native::NativeBackend;

use crate::engine::{EngineErrorData, EngineProvider};
use crate::events::SignalSink;
use crate::media::MediaElement;
use crate::types::{BackendKind, Clip, EngineConfig};

/// Signal that marks a freshly loaded clip as ready for its start offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTrigger {
    /// Element `loadedmetadata`
    MetadataLoaded,
    /// Engine `ManifestParsed`
    ManifestParsed,
}

/// What the controller must do once a load has been issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoadPlan {
    pub(crate) trigger: StartTrigger,
    /// The backend did not start playback; the controller calls `play()`
    /// when the trigger fires
    pub(crate) play_on_trigger: bool,
}

/// The active playback driver
pub(crate) enum Backend {
    Native(NativeBackend),
    Engine(EngineBackend),
}

impl Backend {
    /// Set up a backend of `kind` against `element`
    pub(crate) fn attach(
        kind: BackendKind,
        element: &dyn MediaElement,
        engines: &dyn EngineProvider,
        config: &EngineConfig,
        sink: &SignalSink,
    ) -> Self {
        match kind {
            BackendKind::Native => Backend::Native(NativeBackend::attach()),
            BackendKind::StreamingEngine => {
                Backend::Engine(EngineBackend::attach(element, engines, config, sink))
            }
        }
    }

    pub(crate) fn kind(&self) -> BackendKind {
        match self {
            Backend::Native(_) => BackendKind::Native,
            Backend::Engine(_) => BackendKind::StreamingEngine,
        }
    }

    pub(crate) fn load_and_play(&mut self, element: &mut dyn MediaElement, clip: &Clip) -> LoadPlan {
        match self {
            Backend::Native(native) => native.load_and_play(element, clip),
            Backend::Engine(engine) => engine.load_and_play(clip),
        }
    }

    /// Run the recovery policy for an engine error. Native playback has no
    /// engine errors and never recovers.
    pub(crate) fn recover(&mut self, data: &EngineErrorData) -> Option<RecoveryAction> {
        match self {
            Backend::Native(_) => None,
            Backend::Engine(engine) => engine.recover(data),
        }
    }

    /// Release everything. Consumes the backend so it cannot be used again.
    pub(crate) fn teardown(self) {
        match self {
            Backend::Native(native) => native.teardown(),
            Backend::Engine(engine) => engine.teardown(),
        }
    }
}

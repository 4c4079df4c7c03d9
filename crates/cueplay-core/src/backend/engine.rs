//! Streaming engine playback and its recovery policy

use super::{LoadPlan, StartTrigger};
use crate::engine::{EngineErrorData, EngineErrorType, EngineEventKind, EngineProvider, StreamingEngine};
use crate::events::SignalSink;
use crate::media::MediaElement;
use crate::types::{Clip, EngineConfig, ListenerId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Recovery primitive invoked for an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// `start_load()` after a fatal network error
    ResumeLoading,
    /// `recover_media_error()` after a fatal media error
    RecoverMediaError,
}

/// Recovery policy: only fatal network and media errors have a remedy
pub fn recovery_for(data: &EngineErrorData) -> Option<RecoveryAction> {
    if !data.fatal {
        return None;
    }
    match data.error_type {
        EngineErrorType::Network => Some(RecoveryAction::ResumeLoading),
        EngineErrorType::Media => Some(RecoveryAction::RecoverMediaError),
        _ => None,
    }
}

/// An engine instance bound to the element
pub(crate) struct EngineBackend {
    engine: Box<dyn StreamingEngine>,
    listeners: Vec<ListenerId>,
    recoveries: u32,
}

impl EngineBackend {
    /// Create the engine with its own copy of the configuration, bind it to
    /// the element and subscribe to its events.
    pub(crate) fn attach(
        element: &dyn MediaElement,
        engines: &dyn EngineProvider,
        config: &EngineConfig,
        sink: &SignalSink,
    ) -> Self {
        let mut engine = engines.create(config.clone());
        let listeners = EngineEventKind::ALL
            .iter()
            .map(|kind| engine.add_listener(*kind, sink.clone()))
            .collect();
        engine.attach_media(element.handle());

        info!(options = config.0.len(), generation = sink.generation(), "Streaming engine attached");

        Self {
            engine,
            listeners,
            recoveries: 0,
        }
    }

    /// Ask the engine for the manifest. Playback and the start offset wait
    /// for `ManifestParsed`.
    pub(crate) fn load_and_play(&mut self, clip: &Clip) -> LoadPlan {
        debug!(source = %clip.source, "Engine load");
        self.engine.load_source(&clip.source);

        LoadPlan {
            trigger: StartTrigger::ManifestParsed,
            play_on_trigger: true,
        }
    }

    pub(crate) fn recover(&mut self, data: &EngineErrorData) -> Option<RecoveryAction> {
        let action = recovery_for(data)?;
        self.recoveries += 1;
        warn!(
            error_type = data.error_type.code(),
            details = %data.details,
            ?action,
            recoveries = self.recoveries,
            "Recovering from fatal engine error"
        );

        match action {
            RecoveryAction::ResumeLoading => self.engine.start_load(),
            RecoveryAction::RecoverMediaError => self.engine.recover_media_error(),
        }
        Some(action)
    }

    pub(crate) fn teardown(mut self) {
        for id in self.listeners.drain(..) {
            self.engine.remove_listener(id);
        }
        self.engine.destroy();
        debug!(recoveries = self.recoveries, "Streaming engine destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_policy() {
        let fatal_network = EngineErrorData::from_code("networkError", "fragLoadError", true);
        assert_eq!(recovery_for(&fatal_network), Some(RecoveryAction::ResumeLoading));

        let fatal_media = EngineErrorData::from_code("mediaError", "bufferStalledError", true);
        assert_eq!(recovery_for(&fatal_media), Some(RecoveryAction::RecoverMediaError));

        let non_fatal = EngineErrorData::from_code("networkError", "fragLoadError", false);
        assert_eq!(recovery_for(&non_fatal), None);

        for code in ["keySystemError", "muxError", "otherError", "newError"] {
            let data = EngineErrorData::from_code(code, "x", true);
            assert_eq!(recovery_for(&data), None, "{code}");
        }
    }
}

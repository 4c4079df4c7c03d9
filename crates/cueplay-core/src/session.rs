//! Player - session controller for queued clip playback
//!
//! Coordinates:
//! - Backend selection from probed capabilities
//! - Backend setup, teardown and replacement
//! - Normalization of element and engine signals into public events
//! - Auto-advance through the playlist
//!
//! The player runs on the host's event loop. Elements and engines push raw
//! events into a channel; the host calls [`Player::pump`] (or awaits
//! [`Player::step`]) to have them handled. Nothing here blocks.

use crate::{
    backend::{Backend, StartTrigger},
    diagnostics::{DiagnosticSink, Diagnostics, TracingSink},
    engine::{EngineEvent, EngineProvider},
    events::{EventBus, PlayerEvent, Signal, SignalPayload, SignalSink},
    media::{MediaElement, MediaEvent, HLS_MIME_TYPE},
    normalize,
    playlist::Playlist,
    types::*,
    Error, Result,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Start offset waiting for the load it belongs to
#[derive(Debug, Clone, Copy)]
struct PendingStart {
    /// Load attempt that created it
    attempt: u64,
    trigger: StartTrigger,
    start: Option<f64>,
    play_on_trigger: bool,
}

/// Session controller: one media element, one playlist, one backend at a time
pub struct Player {
    /// Unique session ID
    id: SessionId,
    /// Session configuration
    config: PlayerConfig,
    /// Probed once at construction
    capabilities: Capabilities,
    state: SessionState,
    /// Released on destroy
    element: Option<Box<dyn MediaElement>>,
    engines: Box<dyn EngineProvider>,
    backend: Option<Backend>,
    playlist: Playlist,
    /// Element listener registrations for the current generation
    media_listeners: Vec<ListenerId>,
    /// Incremented on every backend attachment
    generation: u64,
    /// Incremented on every clip load
    attempt: u64,
    /// Shared with every sink so signals carry the load they were sent under
    load_epoch: Arc<AtomicU64>,
    pending_start: Option<PendingStart>,
    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
    bus: EventBus,
    diagnostics: Diagnostics,
}

impl Player {
    /// Create a player, logging diagnostics through `tracing` when
    /// `config.debug` is set.
    ///
    /// Fails with [`Error::Unsupported`] when neither native playback nor
    /// the streaming engine is available.
    pub fn new(
        element: Box<dyn MediaElement>,
        engines: Box<dyn EngineProvider>,
        config: PlayerConfig,
    ) -> Result<Self> {
        Self::with_diagnostics(element, engines, config, Arc::new(TracingSink))
    }

    /// Create a player with a custom diagnostic sink
    pub fn with_diagnostics(
        element: Box<dyn MediaElement>,
        engines: Box<dyn EngineProvider>,
        config: PlayerConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        config.validate()?;

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let mut player = Self {
            id: SessionId::new(),
            capabilities: Capabilities {
                native: false,
                engine: false,
            },
            state: SessionState::Unattached,
            element: Some(element),
            engines,
            backend: None,
            playlist: Playlist::new(),
            media_listeners: Vec::new(),
            generation: 0,
            attempt: 0,
            load_epoch: Arc::new(AtomicU64::new(0)),
            pending_start: None,
            signal_tx,
            signal_rx,
            bus: EventBus::new(config.event_capacity),
            diagnostics: Diagnostics::new(config.debug, sink),
            config,
        };

        player.probe();
        player.establish()?;

        let clips = player.config.clips.clone();
        if !clips.is_empty() {
            player.playlist.set(clips);
            player.advance();
        }

        Ok(player)
    }

    // =========================================================================
    // Public control surface
    // =========================================================================

    /// Replace the queue and start playing its first clip.
    ///
    /// The current backend is torn down and a new one attached, so nothing
    /// from the previous clips can leak into the new session.
    pub fn play(&mut self, clips: impl Into<Clips>) {
        if !self.state.is_active() {
            self.diagnostics.log(|| "play ignored: player is not attached".to_string());
            return;
        }

        self.teardown_backend();
        self.playlist.set(clips);

        if let Err(e) = self.establish() {
            warn!(session_id = %self.id, error = %e, "Failed to rebuild backend");
            return;
        }
        self.advance();
    }

    /// Append clips without interrupting playback
    pub fn add_clips(&mut self, clips: impl Into<Clips>) {
        if self.state == SessionState::Destroyed {
            return;
        }
        self.playlist.push(clips);
        let len = self.playlist.len();
        self.diagnostics.log(|| format!("queue extended to {} clips", len));
    }

    /// Skip to the next queued clip on the current backend.
    ///
    /// Returns false when there is nothing left to play.
    pub fn next_clip(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        self.advance_queue()
    }

    /// Start or continue playback of the current clip
    pub fn resume(&mut self) {
        if let Some(element) = self.attached_element() {
            element.play();
        }
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if let Some(element) = self.attached_element() {
            element.pause();
        }
    }

    /// Resume when paused, pause otherwise
    pub fn toggle(&mut self) {
        if let Some(element) = self.attached_element() {
            if element.paused() {
                element.play();
            } else {
                element.pause();
            }
        }
    }

    /// Seek to `time` seconds.
    ///
    /// Requests outside `[0, duration]` are dropped without error, as are
    /// all requests while the duration is unknown.
    pub fn seek(&mut self, time: f64) {
        let Some(element) = self.attached_element() else {
            return;
        };
        let duration = element.duration();
        if !(0.0..=duration).contains(&time) {
            self.diagnostics
                .log(|| format!("seek to {} dropped (duration {})", time, duration));
            return;
        }
        element.set_current_time(time);
    }

    /// Set the element volume
    pub fn volume(&mut self, level: f64) {
        if let Some(element) = self.attached_element() {
            element.set_volume(level);
        }
    }

    /// Mute or unmute the element
    pub fn mute(&mut self, muted: bool) {
        if let Some(element) = self.attached_element() {
            element.set_muted(muted);
        }
    }

    /// Set the playback rate
    pub fn speed(&mut self, rate: f64) {
        if let Some(element) = self.attached_element() {
            element.set_playback_rate(rate);
        }
    }

    /// Tear everything down. Every later call is a no-op.
    pub fn destroy(&mut self) {
        if self.state == SessionState::Destroyed {
            return;
        }

        self.teardown_backend();
        self.playlist.clear();
        self.bus.close();
        self.element = None;
        while self.signal_rx.try_recv().is_ok() {}

        let from = self.state;
        self.state = SessionState::Destroyed;
        info!(session_id = %self.id, from = %from, "Player destroyed");
    }

    // =========================================================================
    // Event plumbing
    // =========================================================================

    /// Subscribe to normalized events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.bus.subscribe()
    }

    /// Handle every backend signal queued so far. Returns how many were
    /// taken off the queue, including discarded stale ones.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(signal) = self.signal_rx.try_recv() {
            self.handle_signal(signal);
            handled += 1;
        }
        handled
    }

    /// Wait for the next backend signal and handle it.
    ///
    /// Returns false once the player is destroyed.
    pub async fn step(&mut self) -> bool {
        if self.state == SessionState::Destroyed {
            return false;
        }
        match self.signal_rx.recv().await {
            Some(signal) => {
                self.handle_signal(signal);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Kind of the attached backend, if any
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(Backend::kind)
    }

    pub fn current_clip(&self) -> Option<&Clip> {
        self.playlist.current()
    }

    pub fn has_next(&self) -> bool {
        self.playlist.has_next()
    }

    pub fn clips(&self) -> &[Clip] {
        self.playlist.clips()
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Number of public events emitted so far
    pub fn events_emitted(&self) -> u64 {
        self.bus.emitted()
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// Snapshot of the session and element state
    pub fn status(&self) -> PlayerStatus {
        let element = self.element.as_deref().filter(|_| self.state.is_active());
        PlayerStatus {
            session_id: self.id,
            state: self.state,
            backend: self.backend_kind(),
            current_clip: self.playlist.current().cloned(),
            position: element.map_or(0.0, |e| e.current_time()),
            duration: element.map_or(f64::NAN, |e| e.duration()),
            paused: element.map_or(true, |e| e.paused()),
            volume: element.map_or(0.0, |e| e.volume()),
            muted: element.map_or(false, |e| e.muted()),
            speed: element.map_or(1.0, |e| e.playback_rate()),
            queue_len: self.playlist.len(),
            has_next: self.playlist.has_next(),
        }
    }

    // =========================================================================
    // Backend lifecycle
    // =========================================================================

    /// Query the element and the engine provider once
    fn probe(&mut self) {
        let native = self
            .element
            .as_deref()
            .is_some_and(|e| e.can_play_type(HLS_MIME_TYPE));
        self.capabilities = Capabilities {
            native,
            engine: self.engines.is_supported(),
        };
        let capabilities = self.capabilities;
        self.diagnostics.log(|| {
            format!(
                "capabilities: native={} engine={}",
                capabilities.native, capabilities.engine
            )
        });
    }

    /// Select a backend and attach it along with fresh element listeners
    fn establish(&mut self) -> Result<()> {
        self.set_state(SessionState::Probing)?;

        let Some(kind) = self.capabilities.select(self.config.prefer_native) else {
            return Err(Error::Unsupported);
        };

        self.generation += 1;
        let sink = SignalSink::new(
            self.generation,
            self.load_epoch.clone(),
            self.signal_tx.clone(),
        );

        if let Some(element) = self.element.as_deref_mut() {
            self.media_listeners = MediaEvent::ALL
                .iter()
                .map(|event| element.add_listener(*event, sink.clone()))
                .collect();
        }
        if let Some(element) = self.element.as_deref() {
            self.backend = Some(Backend::attach(
                kind,
                element,
                self.engines.as_ref(),
                &self.config.engine,
                &sink,
            ));
        }

        let generation = self.generation;
        let prefer_native = self.config.prefer_native;
        self.diagnostics.log(|| {
            format!(
                "selected {} backend (prefer_native={}, generation {})",
                kind, prefer_native, generation
            )
        });

        self.set_state(SessionState::active(kind))
    }

    /// Remove element listeners and release the backend
    fn teardown_backend(&mut self) {
        if let Some(element) = self.element.as_deref_mut() {
            for id in self.media_listeners.drain(..) {
                element.remove_listener(id);
            }
        }
        self.media_listeners.clear();
        self.pending_start = None;

        if let Some(backend) = self.backend.take() {
            let kind = backend.kind();
            backend.teardown();
            self.diagnostics.log(|| format!("{} backend torn down", kind));
        }
    }

    fn set_state(&mut self, new_state: SessionState) -> Result<()> {
        let current = self.state;

        if !current.can_transition_to(new_state) {
            return Err(Error::InvalidStateTransition {
                from: current.to_string(),
                to: new_state.to_string(),
            });
        }

        self.state = new_state;
        info!(session_id = %self.id, from = %current, to = %new_state, "State transition");

        Ok(())
    }

    fn attached_element(&mut self) -> Option<&mut (dyn MediaElement + 'static)> {
        if self.state.is_active() {
            self.element.as_deref_mut()
        } else {
            None
        }
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Move past the current clip according to the advance policy
    fn advance_queue(&mut self) -> bool {
        if self.config.advance == AdvancePolicy::ShrinkingQueue {
            self.playlist.pop_front();
        }
        self.advance()
    }

    /// Load the next clip, if any
    fn advance(&mut self) -> bool {
        match self.playlist.next().cloned() {
            Some(clip) => {
                self.load(&clip);
                true
            }
            None => {
                self.diagnostics.log(|| "queue exhausted".to_string());
                false
            }
        }
    }

    fn load(&mut self, clip: &Clip) {
        let (Some(backend), Some(element)) = (self.backend.as_mut(), self.element.as_deref_mut())
        else {
            return;
        };

        self.attempt += 1;
        self.load_epoch.store(self.attempt, Ordering::Release);
        let plan = backend.load_and_play(element, clip);
        self.pending_start = Some(PendingStart {
            attempt: self.attempt,
            trigger: plan.trigger,
            start: clip.start,
            play_on_trigger: plan.play_on_trigger,
        });

        let attempt = self.attempt;
        self.diagnostics.log(|| {
            format!(
                "load #{} {} (start {:?}, waits for {:?})",
                attempt, clip.source, clip.start, plan.trigger
            )
        });
    }

    // =========================================================================
    // Signal handling
    // =========================================================================

    fn handle_signal(&mut self, signal: Signal) {
        if self.state == SessionState::Destroyed {
            return;
        }
        if signal.generation != self.generation {
            let current = self.generation;
            self.diagnostics.log(|| {
                format!(
                    "dropped stale {:?} from generation {} (current {})",
                    signal.payload, signal.generation, current
                )
            });
            return;
        }

        match signal.payload {
            SignalPayload::Media(event) => self.on_media_event(event, signal.attempt),
            SignalPayload::Engine(event) => self.on_engine_event(event, signal.attempt),
        }
    }

    fn on_media_event(&mut self, event: MediaEvent, attempt: u64) {
        // Only the current load may become ready or finish
        let load_scoped = matches!(event, MediaEvent::LoadedMetadata | MediaEvent::Ended);
        if load_scoped && attempt != self.attempt {
            let current = self.attempt;
            self.diagnostics.log(|| {
                format!(
                    "dropped {:?} from load #{} (current #{})",
                    event, attempt, current
                )
            });
            return;
        }

        if event == MediaEvent::LoadedMetadata {
            self.fire_start_trigger(StartTrigger::MetadataLoaded, attempt);
        }

        let Some(element) = self.element.as_deref() else {
            return;
        };
        let normalized = normalize::media_event(event, element);
        self.bus.emit(normalized);

        if event == MediaEvent::Ended {
            self.advance_queue();
        }
    }

    fn on_engine_event(&mut self, event: EngineEvent, attempt: u64) {
        match event {
            EngineEvent::MediaAttached => {
                self.diagnostics.log(|| "engine attached to media".to_string());
            }
            EngineEvent::ManifestParsed { levels } => {
                self.diagnostics
                    .log(|| format!("manifest parsed with {} levels", levels));
                self.fire_start_trigger(StartTrigger::ManifestParsed, attempt);
            }
            EngineEvent::Error(data) => {
                // Recovery first, so a recovered error never stalls playback
                let action = self.backend.as_mut().and_then(|b| b.recover(&data));
                self.diagnostics.log(|| {
                    format!(
                        "engine error {} {} fatal={} recovery={:?}",
                        data.error_type.code(),
                        data.details,
                        data.fatal,
                        action
                    )
                });
                self.bus.emit(PlayerEvent::Error(normalize::engine_error(&data)));
            }
        }
    }

    /// Apply the pending start offset once, if `trigger` is what it waits
    /// for and was sent under the same load
    fn fire_start_trigger(&mut self, trigger: StartTrigger, attempt: u64) {
        let Some(pending) = self.pending_start else {
            return;
        };
        if pending.trigger != trigger {
            return;
        }
        if pending.attempt != attempt {
            self.diagnostics.log(|| {
                format!(
                    "{:?} from load #{} left start of load #{} pending",
                    trigger, attempt, pending.attempt
                )
            });
            return;
        }
        self.pending_start = None;

        let Some(element) = self.element.as_deref_mut() else {
            return;
        };
        let mut applied = None;
        if let Some(start) = pending.start.filter(|s| s.is_finite() && *s >= 0.0) {
            element.set_current_time(start);
            applied = Some(start);
        }
        if pending.play_on_trigger {
            element.play();
        }

        self.diagnostics.log(|| {
            format!(
                "load #{} ready on {:?}, start {:?}",
                pending.attempt, trigger, applied
            )
        });
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineEventKind, StreamingEngine};
    use crate::media::MediaErrorInfo;

    struct StubElement {
        native: bool,
    }

    impl MediaElement for StubElement {
        fn handle(&self) -> MediaHandle {
            MediaHandle::default()
        }
        fn can_play_type(&self, _mime: &str) -> bool {
            self.native
        }
        fn set_source(&mut self, _locator: &str) {}
        fn play(&mut self) {}
        fn pause(&mut self) {}
        fn paused(&self) -> bool {
            true
        }
        fn current_time(&self) -> f64 {
            0.0
        }
        fn set_current_time(&mut self, _time: f64) {}
        fn duration(&self) -> f64 {
            f64::NAN
        }
        fn volume(&self) -> f64 {
            1.0
        }
        fn set_volume(&mut self, _volume: f64) {}
        fn muted(&self) -> bool {
            false
        }
        fn set_muted(&mut self, _muted: bool) {}
        fn playback_rate(&self) -> f64 {
            1.0
        }
        fn set_playback_rate(&mut self, _rate: f64) {}
        fn buffered(&self) -> TimeRanges {
            TimeRanges::default()
        }
        fn error(&self) -> Option<MediaErrorInfo> {
            None
        }
        fn add_listener(&mut self, _event: MediaEvent, _sink: SignalSink) -> ListenerId {
            ListenerId(0)
        }
        fn remove_listener(&mut self, _id: ListenerId) {}
    }

    struct StubEngine;

    impl StreamingEngine for StubEngine {
        fn attach_media(&mut self, _media: MediaHandle) {}
        fn load_source(&mut self, _locator: &str) {}
        fn add_listener(&mut self, _event: EngineEventKind, _sink: SignalSink) -> ListenerId {
            ListenerId(0)
        }
        fn remove_listener(&mut self, _id: ListenerId) {}
        fn start_load(&mut self) {}
        fn recover_media_error(&mut self) {}
        fn destroy(&mut self) {}
    }

    struct StubEngines {
        supported: bool,
    }

    impl EngineProvider for StubEngines {
        fn is_supported(&self) -> bool {
            self.supported
        }
        fn create(&self, _config: EngineConfig) -> Box<dyn StreamingEngine> {
            Box::new(StubEngine)
        }
    }

    fn player(native: bool, engine: bool, config: PlayerConfig) -> Result<Player> {
        Player::new(
            Box::new(StubElement { native }),
            Box::new(StubEngines { supported: engine }),
            config,
        )
    }

    #[test]
    fn test_player_creation() {
        let player = player(false, true, PlayerConfig::default()).unwrap();
        assert_eq!(player.state(), SessionState::EngineActive);
        assert_eq!(player.backend_kind(), Some(BackendKind::StreamingEngine));
        assert!(player.current_clip().is_none());
        assert_eq!(player.playlist().cursor(), -1);
    }

    #[test]
    fn test_unsupported_platform() {
        let err = player(false, false, PlayerConfig::default()).err().unwrap();
        assert!(matches!(err, Error::Unsupported));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PlayerConfig {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(player(true, true, config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_initial_clips_start_playing() {
        let config = PlayerConfig {
            prefer_native: true,
            clips: vec![Clip::new("a.m3u8"), Clip::new("b.m3u8")],
            ..Default::default()
        };
        let player = player(true, true, config).unwrap();
        assert_eq!(player.state(), SessionState::NativeActive);
        assert_eq!(player.current_clip().map(|c| c.source.as_str()), Some("a.m3u8"));
        assert!(player.has_next());
    }

    #[test]
    fn test_destroy_is_terminal() {
        let mut player = player(true, false, PlayerConfig::default()).unwrap();
        player.destroy();
        assert_eq!(player.state(), SessionState::Destroyed);
        assert_eq!(player.backend_kind(), None);

        player.play(Clip::new("a.m3u8"));
        player.destroy();
        assert_eq!(player.state(), SessionState::Destroyed);
        assert!(player.clips().is_empty());
    }
}

//! Public event taxonomy and the two channels around the controller
//!
//! - Backend signals: elements and engines push raw events through a
//!   [`SignalSink`]. Each sink is stamped with the generation of the backend
//!   attachment it was created for, so signals from a torn-down attachment
//!   can be recognized and dropped. Signals also carry the clip load that was
//!   current when they were sent.
//! - Public events: normalized [`PlayerEvent`]s fan out to subscribers over a
//!   broadcast channel owned by the controller.

use crate::engine::EngineEvent;
use crate::media::MediaEvent;
use crate::normalize::PlaybackError;
use crate::types::{TimeRanges, VolumeState};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Events emitted to callers, independent of the active backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum PlayerEvent {
    Ready,
    Finish,
    Pause,
    Resume,
    Buffer(TimeRanges),
    Speed(f64),
    Seek(f64),
    Progress(f64),
    Volume(VolumeState),
    Error(PlaybackError),
}

/// Payload-free names of [`PlayerEvent`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Ready,
    Finish,
    Pause,
    Resume,
    Buffer,
    Speed,
    Seek,
    Progress,
    Volume,
    Error,
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlayerEvent::Ready => EventKind::Ready,
            PlayerEvent::Finish => EventKind::Finish,
            PlayerEvent::Pause => EventKind::Pause,
            PlayerEvent::Resume => EventKind::Resume,
            PlayerEvent::Buffer(_) => EventKind::Buffer,
            PlayerEvent::Speed(_) => EventKind::Speed,
            PlayerEvent::Seek(_) => EventKind::Seek,
            PlayerEvent::Progress(_) => EventKind::Progress,
            PlayerEvent::Volume(_) => EventKind::Volume,
            PlayerEvent::Error(_) => EventKind::Error,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Backend signals
// =============================================================================

#[derive(Debug)]
pub(crate) enum SignalPayload {
    Media(MediaEvent),
    Engine(EngineEvent),
}

#[derive(Debug)]
pub(crate) struct Signal {
    pub(crate) generation: u64,
    /// Clip load that was current at send time
    pub(crate) attempt: u64,
    pub(crate) payload: SignalPayload,
}

/// Where element and engine implementations deliver their raw events
#[derive(Debug, Clone)]
pub struct SignalSink {
    generation: u64,
    attempt: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<Signal>,
}

impl SignalSink {
    pub(crate) fn new(
        generation: u64,
        attempt: Arc<AtomicU64>,
        tx: mpsc::UnboundedSender<Signal>,
    ) -> Self {
        Self {
            generation,
            attempt,
            tx,
        }
    }

    /// Backend attachment this sink belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an element event. Returns false once the player is gone.
    pub fn media(&self, event: MediaEvent) -> bool {
        self.send(SignalPayload::Media(event))
    }

    /// Deliver an engine event. Returns false once the player is gone.
    pub fn engine(&self, event: EngineEvent) -> bool {
        self.send(SignalPayload::Engine(event))
    }

    fn send(&self, payload: SignalPayload) -> bool {
        self.tx
            .send(Signal {
                generation: self.generation,
                attempt: self.attempt.load(Ordering::Acquire),
                payload,
            })
            .is_ok()
    }
}

// =============================================================================
// Public event bus
// =============================================================================

/// Fan-out of normalized events; closed for good on destroy
pub(crate) struct EventBus {
    tx: Option<broadcast::Sender<PlayerEvent>>,
    emitted: u64,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx: Some(tx),
            emitted: 0,
        }
    }

    /// New subscriber. After close the receiver reports `Closed` right away.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        match &self.tx {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    pub(crate) fn emit(&mut self, event: PlayerEvent) {
        if let Some(tx) = &self.tx {
            // No subscribers is not an error
            let _ = tx.send(event);
            self.emitted += 1;
        }
    }

    /// Drop every subscriber
    pub(crate) fn close(&mut self) {
        self.tx = None;
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.receiver_count())
    }

    pub(crate) fn emitted(&self) -> u64 {
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_bus_fan_out() {
        let mut bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(PlayerEvent::Progress(1.5));
        assert_eq!(a.try_recv().unwrap(), PlayerEvent::Progress(1.5));
        assert_eq!(b.try_recv().unwrap(), PlayerEvent::Progress(1.5));
        assert_eq!(bus.emitted(), 1);
    }

    #[test]
    fn test_bus_close_drops_subscribers() {
        let mut bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.close();
        bus.emit(PlayerEvent::Ready);

        assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
        assert_eq!(bus.subscribe().try_recv(), Err(TryRecvError::Closed));
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.emitted(), 0);
    }

    #[test]
    fn test_sink_stamps_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = SignalSink::new(7, Arc::new(AtomicU64::new(0)), tx);
        assert!(sink.media(MediaEvent::Play));

        let signal = rx.try_recv().unwrap();
        assert_eq!(signal.generation, 7);
        assert!(matches!(signal.payload, SignalPayload::Media(MediaEvent::Play)));

        drop(rx);
        assert!(!sink.engine(EngineEvent::MediaAttached));
    }

    #[test]
    fn test_sink_stamps_load_at_send_time() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let attempt = Arc::new(AtomicU64::new(1));
        let sink = SignalSink::new(1, attempt.clone(), tx);

        sink.media(MediaEvent::LoadedMetadata);
        attempt.store(2, Ordering::Release);
        sink.media(MediaEvent::LoadedMetadata);

        assert_eq!(rx.try_recv().unwrap().attempt, 1);
        assert_eq!(rx.try_recv().unwrap().attempt, 2);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(PlayerEvent::Seek(10.0)).unwrap();
        assert_eq!(json, serde_json::json!({"event": "Seek", "payload": 10.0}));
        assert_eq!(PlayerEvent::Finish.kind().to_string(), "Finish");
    }
}

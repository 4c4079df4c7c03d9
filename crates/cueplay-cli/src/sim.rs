//! Simulated media element and streaming engine
//!
//! Both share one [`World`]. Control calls queue the events a real element
//! or engine would fire in response; [`World::tick`] delivers them and moves
//! the playhead forward.

use cueplay_core::{
    EngineConfig, EngineErrorData, EngineEvent, EngineEventKind, EngineProvider, ListenerId,
    MediaElement, MediaErrorCode, MediaErrorInfo, MediaEvent, MediaHandle, SignalSink,
    StreamingEngine, TimeRange, TimeRanges, HLS_MIME_TYPE,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use tracing::{debug, trace};

/// Seconds buffered ahead of the playhead
const BUFFER_AHEAD: f64 = 10.0;

/// Error fired once the playhead of the first clip reaches `at`
#[derive(Debug, Clone)]
pub struct Injection {
    pub code: String,
    pub at: f64,
    fired: bool,
}

impl Injection {
    pub fn new(code: impl Into<String>, at: f64) -> Self {
        Self {
            code: code.into(),
            at,
            fired: false,
        }
    }
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Queued events were delivered
    Delivered,
    /// The playhead moved
    Advanced,
    /// Nothing can happen without outside input
    Idle,
}

struct State {
    native: bool,
    clip_duration: f64,
    injection: Option<Injection>,
    source: Option<String>,
    loads: usize,
    paused: bool,
    ended: bool,
    stalled: bool,
    current_time: f64,
    duration: f64,
    volume: f64,
    muted: bool,
    rate: f64,
    error: Option<MediaErrorInfo>,
    media_listeners: BTreeMap<ListenerId, (MediaEvent, SignalSink)>,
    engine_listeners: BTreeMap<ListenerId, (EngineEventKind, SignalSink)>,
    media_queue: VecDeque<MediaEvent>,
    engine_queue: VecDeque<EngineEvent>,
    next_listener: u64,
    recoveries: usize,
}

impl State {
    fn listener_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        id
    }

    fn reset_for(&mut self, source: &str) {
        self.source = Some(source.to_string());
        self.loads += 1;
        self.ended = false;
        self.stalled = false;
        self.current_time = 0.0;
        self.duration = f64::NAN;
        self.error = None;
    }
}

/// Shared simulation state
#[derive(Clone)]
pub struct World {
    state: Rc<RefCell<State>>,
    handle: MediaHandle,
}

impl World {
    pub fn new(native: bool, clip_duration: f64, injection: Option<Injection>) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                native,
                clip_duration,
                injection,
                source: None,
                loads: 0,
                paused: true,
                ended: false,
                stalled: false,
                current_time: 0.0,
                duration: f64::NAN,
                volume: 1.0,
                muted: false,
                rate: 1.0,
                error: None,
                media_listeners: BTreeMap::new(),
                engine_listeners: BTreeMap::new(),
                media_queue: VecDeque::new(),
                engine_queue: VecDeque::new(),
                next_listener: 0,
                recoveries: 0,
            })),
            handle: MediaHandle::new(),
        }
    }

    pub fn element(&self) -> SimElement {
        SimElement(self.clone())
    }

    pub fn engines(&self, supported: bool) -> SimEngines {
        SimEngines {
            world: self.clone(),
            supported,
        }
    }

    /// Current clip played to its end
    pub fn is_ended(&self) -> bool {
        self.state.borrow().ended
    }

    pub fn position(&self) -> f64 {
        self.state.borrow().current_time
    }

    pub fn loads(&self) -> usize {
        self.state.borrow().loads
    }

    pub fn recoveries(&self) -> usize {
        self.state.borrow().recoveries
    }

    /// Deliver queued events, or advance the playhead by `step` seconds
    pub fn tick(&self, step: f64) -> Tick {
        let delivered = self.deliver();
        if delivered > 0 {
            return Tick::Delivered;
        }

        let mut state = self.state.borrow_mut();
        let playable = state.source.is_some()
            && state.duration.is_finite()
            && !state.paused
            && !state.ended
            && !state.stalled;
        if !playable {
            return Tick::Idle;
        }

        state.current_time = (state.current_time + step * state.rate).min(state.duration);
        state.media_queue.push_back(MediaEvent::TimeUpdate);
        state.media_queue.push_back(MediaEvent::Progress);

        if state.loads == 1 {
            let current_time = state.current_time;
            let native = state.native;
            if let Some(injection) = state.injection.as_mut().filter(|i| !i.fired && current_time >= i.at) {
                injection.fired = true;
                let code = injection.code.clone();
                debug!(code = %code, at = current_time, "Injecting playback error");
                state.stalled = true;
                if native {
                    state.error = Some(
                        MediaErrorInfo::new(media_code_for(&code)).with_message(format!("injected {}", code)),
                    );
                    state.media_queue.push_back(MediaEvent::Error);
                } else {
                    state
                        .engine_queue
                        .push_back(EngineEvent::Error(EngineErrorData::from_code(&code, "injected", true)));
                }
                return Tick::Advanced;
            }
        }

        if state.current_time >= state.duration {
            state.ended = true;
            state.media_queue.push_back(MediaEvent::Ended);
        }
        Tick::Advanced
    }

    fn deliver(&self) -> usize {
        let (engine_events, media_events, engine_sinks, media_sinks) = {
            let mut state = self.state.borrow_mut();
            let engine_events: Vec<EngineEvent> = state.engine_queue.drain(..).collect();
            let media_events: Vec<MediaEvent> = state.media_queue.drain(..).collect();
            if media_events.contains(&MediaEvent::LoadedMetadata) {
                state.duration = state.clip_duration;
            }
            let engine_sinks: Vec<(EngineEventKind, SignalSink)> =
                state.engine_listeners.values().cloned().collect();
            let media_sinks: Vec<(MediaEvent, SignalSink)> =
                state.media_listeners.values().cloned().collect();
            (engine_events, media_events, engine_sinks, media_sinks)
        };

        let mut delivered = 0;
        for event in engine_events {
            for (_, sink) in engine_sinks.iter().filter(|(kind, _)| *kind == event.kind()) {
                if sink.engine(event.clone()) {
                    delivered += 1;
                }
            }
        }
        for event in media_events {
            for (_, sink) in media_sinks.iter().filter(|(kind, _)| *kind == event) {
                if sink.media(event) {
                    delivered += 1;
                }
            }
        }
        trace!(delivered, "Simulated events delivered");
        delivered
    }
}

/// Element-side error for an engine error code
fn media_code_for(code: &str) -> MediaErrorCode {
    match code {
        "networkError" => MediaErrorCode::Network,
        "mediaError" => MediaErrorCode::Decode,
        _ => MediaErrorCode::Aborted,
    }
}

// =============================================================================
// Element
// =============================================================================

pub struct SimElement(World);

impl SimElement {
    fn queue(&self, event: MediaEvent) {
        self.0.state.borrow_mut().media_queue.push_back(event);
    }
}

impl MediaElement for SimElement {
    fn handle(&self) -> MediaHandle {
        self.0.handle
    }

    fn can_play_type(&self, mime: &str) -> bool {
        self.0.state.borrow().native && mime == HLS_MIME_TYPE
    }

    fn set_source(&mut self, locator: &str) {
        let mut state = self.0.state.borrow_mut();
        state.reset_for(locator);
        state.media_queue.push_back(MediaEvent::LoadedMetadata);
    }

    fn play(&mut self) {
        self.0.state.borrow_mut().paused = false;
        self.queue(MediaEvent::Play);
    }

    fn pause(&mut self) {
        self.0.state.borrow_mut().paused = true;
        self.queue(MediaEvent::Pause);
    }

    fn paused(&self) -> bool {
        self.0.state.borrow().paused
    }

    fn current_time(&self) -> f64 {
        self.0.state.borrow().current_time
    }

    fn set_current_time(&mut self, time: f64) {
        self.0.state.borrow_mut().current_time = time;
        self.queue(MediaEvent::Seeked);
    }

    fn duration(&self) -> f64 {
        self.0.state.borrow().duration
    }

    fn volume(&self) -> f64 {
        self.0.state.borrow().volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.0.state.borrow_mut().volume = volume;
        self.queue(MediaEvent::VolumeChange);
    }

    fn muted(&self) -> bool {
        self.0.state.borrow().muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.0.state.borrow_mut().muted = muted;
        self.queue(MediaEvent::VolumeChange);
    }

    fn playback_rate(&self) -> f64 {
        self.0.state.borrow().rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.0.state.borrow_mut().rate = rate;
        self.queue(MediaEvent::RateChange);
    }

    fn buffered(&self) -> TimeRanges {
        let state = self.0.state.borrow();
        if !state.duration.is_finite() {
            return TimeRanges::default();
        }
        TimeRanges::new(vec![TimeRange {
            start: 0.0,
            end: (state.current_time + BUFFER_AHEAD).min(state.duration),
        }])
    }

    fn error(&self) -> Option<MediaErrorInfo> {
        self.0.state.borrow().error.clone()
    }

    fn add_listener(&mut self, event: MediaEvent, sink: SignalSink) -> ListenerId {
        let mut state = self.0.state.borrow_mut();
        let id = state.listener_id();
        state.media_listeners.insert(id, (event, sink));
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.0.state.borrow_mut().media_listeners.remove(&id);
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct SimEngine {
    world: World,
    listeners: Vec<ListenerId>,
    config: EngineConfig,
}

impl StreamingEngine for SimEngine {
    fn attach_media(&mut self, media: MediaHandle) {
        debug!(media = ?media.0, options = self.config.0.len(), "Simulated engine attached");
        self.world
            .state
            .borrow_mut()
            .engine_queue
            .push_back(EngineEvent::MediaAttached);
    }

    fn load_source(&mut self, locator: &str) {
        let mut state = self.world.state.borrow_mut();
        state.reset_for(locator);
        state.engine_queue.push_back(EngineEvent::ManifestParsed { levels: 3 });
        state.media_queue.push_back(MediaEvent::LoadedMetadata);
    }

    fn add_listener(&mut self, event: EngineEventKind, sink: SignalSink) -> ListenerId {
        let mut state = self.world.state.borrow_mut();
        let id = state.listener_id();
        state.engine_listeners.insert(id, (event, sink));
        self.listeners.push(id);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.world.state.borrow_mut().engine_listeners.remove(&id);
        self.listeners.retain(|l| *l != id);
    }

    fn start_load(&mut self) {
        let mut state = self.world.state.borrow_mut();
        state.stalled = false;
        state.recoveries += 1;
    }

    fn recover_media_error(&mut self) {
        let mut state = self.world.state.borrow_mut();
        state.stalled = false;
        state.recoveries += 1;
    }

    fn destroy(&mut self) {
        let mut state = self.world.state.borrow_mut();
        for id in self.listeners.drain(..) {
            state.engine_listeners.remove(&id);
        }
        state.engine_queue.clear();
    }
}

pub struct SimEngines {
    world: World,
    supported: bool,
}

impl EngineProvider for SimEngines {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, config: EngineConfig) -> Box<dyn StreamingEngine> {
        Box::new(SimEngine {
            world: self.world.clone(),
            listeners: Vec::new(),
            config,
        })
    }
}

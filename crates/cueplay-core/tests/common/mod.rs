//! Test doubles for the media element and the streaming engine
//!
//! Both record every call and only fire events when a test asks them to.

#![allow(dead_code)]

use cueplay_core::{
    Clip, EngineConfig, EngineEvent, EngineEventKind, EngineProvider, ListenerId, MediaElement,
    MediaErrorInfo, MediaEvent, MediaHandle, MemorySink, Player, PlayerConfig, PlayerEvent,
    SignalSink, StreamingEngine, TimeRanges,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::broadcast;

// =============================================================================
// Media element
// =============================================================================

pub struct ElementState {
    pub native: bool,
    pub sources: Vec<String>,
    pub paused: bool,
    pub play_calls: usize,
    pub pause_calls: usize,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f64,
    pub muted: bool,
    pub playback_rate: f64,
    pub buffered: TimeRanges,
    pub error: Option<MediaErrorInfo>,
    pub listeners: BTreeMap<ListenerId, (MediaEvent, SignalSink)>,
    next_listener: u64,
}

#[derive(Clone)]
pub struct MockElement {
    pub state: Rc<RefCell<ElementState>>,
    handle: MediaHandle,
}

impl MockElement {
    pub fn new(native: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(ElementState {
                native,
                sources: Vec::new(),
                paused: true,
                play_calls: 0,
                pause_calls: 0,
                current_time: 0.0,
                duration: f64::NAN,
                volume: 1.0,
                muted: false,
                playback_rate: 1.0,
                buffered: TimeRanges::default(),
                error: None,
                listeners: BTreeMap::new(),
                next_listener: 0,
            })),
            handle: MediaHandle::new(),
        }
    }

    pub fn media_handle(&self) -> MediaHandle {
        self.handle
    }

    /// Fire `event` at every listener registered for it
    pub fn fire(&self, event: MediaEvent) -> usize {
        let sinks: Vec<SignalSink> = self
            .state
            .borrow()
            .listeners
            .values()
            .filter(|(kind, _)| *kind == event)
            .map(|(_, sink)| sink.clone())
            .collect();
        sinks.iter().filter(|sink| sink.media(event)).count()
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// A registered sink, as a host would have kept it
    pub fn sink_for(&self, event: MediaEvent) -> Option<SignalSink> {
        self.state
            .borrow()
            .listeners
            .values()
            .find(|(kind, _)| *kind == event)
            .map(|(_, sink)| sink.clone())
    }

    pub fn set_time(&self, time: f64) {
        self.state.borrow_mut().current_time = time;
    }

    pub fn set_duration(&self, duration: f64) {
        self.state.borrow_mut().duration = duration;
    }

    pub fn current_time(&self) -> f64 {
        self.state.borrow().current_time
    }

    pub fn sources(&self) -> Vec<String> {
        self.state.borrow().sources.clone()
    }

    pub fn play_calls(&self) -> usize {
        self.state.borrow().play_calls
    }
}

impl MediaElement for MockElement {
    fn handle(&self) -> MediaHandle {
        self.handle
    }

    fn can_play_type(&self, mime: &str) -> bool {
        self.state.borrow().native && mime == cueplay_core::HLS_MIME_TYPE
    }

    fn set_source(&mut self, locator: &str) {
        let mut state = self.state.borrow_mut();
        state.sources.push(locator.to_string());
        state.current_time = 0.0;
        state.error = None;
    }

    fn play(&mut self) {
        let mut state = self.state.borrow_mut();
        state.paused = false;
        state.play_calls += 1;
    }

    fn pause(&mut self) {
        let mut state = self.state.borrow_mut();
        state.paused = true;
        state.pause_calls += 1;
    }

    fn paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().current_time
    }

    fn set_current_time(&mut self, time: f64) {
        self.state.borrow_mut().current_time = time;
    }

    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    fn volume(&self) -> f64 {
        self.state.borrow().volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.state.borrow_mut().volume = volume;
    }

    fn muted(&self) -> bool {
        self.state.borrow().muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.borrow_mut().muted = muted;
    }

    fn playback_rate(&self) -> f64 {
        self.state.borrow().playback_rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.state.borrow_mut().playback_rate = rate;
    }

    fn buffered(&self) -> TimeRanges {
        self.state.borrow().buffered.clone()
    }

    fn error(&self) -> Option<MediaErrorInfo> {
        self.state.borrow().error.clone()
    }

    fn add_listener(&mut self, event: MediaEvent, sink: SignalSink) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.insert(id, (event, sink));
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(&id);
    }
}

// =============================================================================
// Streaming engine
// =============================================================================

#[derive(Default)]
pub struct EngineState {
    pub config: EngineConfig,
    pub attached_to: Option<MediaHandle>,
    pub loads: Vec<String>,
    pub start_load_calls: usize,
    pub recover_media_calls: usize,
    pub destroyed: bool,
    pub listeners: BTreeMap<ListenerId, (EngineEventKind, SignalSink)>,
    next_listener: u64,
}

/// Test-side view of one created engine
#[derive(Clone)]
pub struct EngineHandle(pub Rc<RefCell<EngineState>>);

impl EngineHandle {
    pub fn fire(&self, event: EngineEvent) -> usize {
        let kind = event.kind();
        let sinks: Vec<SignalSink> = self
            .0
            .borrow()
            .listeners
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, sink)| sink.clone())
            .collect();
        sinks.iter().filter(|sink| sink.engine(event.clone())).count()
    }

    pub fn manifest_parsed(&self) -> usize {
        self.fire(EngineEvent::ManifestParsed { levels: 3 })
    }

    pub fn sink(&self) -> Option<SignalSink> {
        self.0.borrow().listeners.values().next().map(|(_, sink)| sink.clone())
    }

    pub fn loads(&self) -> Vec<String> {
        self.0.borrow().loads.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.0.borrow().listeners.len()
    }

    pub fn start_load_calls(&self) -> usize {
        self.0.borrow().start_load_calls
    }

    pub fn recover_media_calls(&self) -> usize {
        self.0.borrow().recover_media_calls
    }

    pub fn destroyed(&self) -> bool {
        self.0.borrow().destroyed
    }
}

struct MockEngine(Rc<RefCell<EngineState>>);

impl StreamingEngine for MockEngine {
    fn attach_media(&mut self, media: MediaHandle) {
        self.0.borrow_mut().attached_to = Some(media);
    }

    fn load_source(&mut self, locator: &str) {
        self.0.borrow_mut().loads.push(locator.to_string());
    }

    fn add_listener(&mut self, event: EngineEventKind, sink: SignalSink) -> ListenerId {
        let mut state = self.0.borrow_mut();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.insert(id, (event, sink));
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.0.borrow_mut().listeners.remove(&id);
    }

    fn start_load(&mut self) {
        self.0.borrow_mut().start_load_calls += 1;
    }

    fn recover_media_error(&mut self) {
        self.0.borrow_mut().recover_media_calls += 1;
    }

    fn destroy(&mut self) {
        self.0.borrow_mut().destroyed = true;
    }
}

#[derive(Clone)]
pub struct MockEngines {
    pub supported: bool,
    pub created: Rc<RefCell<Vec<EngineHandle>>>,
}

impl MockEngines {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            created: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn count(&self) -> usize {
        self.created.borrow().len()
    }

    pub fn latest(&self) -> EngineHandle {
        self.created
            .borrow()
            .last()
            .cloned()
            .expect("no engine created")
    }

    pub fn get(&self, index: usize) -> EngineHandle {
        self.created.borrow()[index].clone()
    }
}

impl EngineProvider for MockEngines {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, config: EngineConfig) -> Box<dyn StreamingEngine> {
        let state = Rc::new(RefCell::new(EngineState {
            config,
            ..Default::default()
        }));
        self.created.borrow_mut().push(EngineHandle(state.clone()));
        Box::new(MockEngine(state))
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub player: Player,
    pub element: MockElement,
    pub engines: MockEngines,
    pub events: broadcast::Receiver<PlayerEvent>,
    pub diagnostics: MemorySink,
}

impl Harness {
    pub fn new(native: bool, engine: bool, config: PlayerConfig) -> Self {
        let element = MockElement::new(native);
        let engines = MockEngines::new(engine);
        let diagnostics = MemorySink::new();
        let player = Player::with_diagnostics(
            Box::new(element.clone()),
            Box::new(engines.clone()),
            config,
            Arc::new(diagnostics.clone()),
        )
        .expect("player construction");
        let events = player.subscribe();

        Self {
            player,
            element,
            engines,
            events,
            diagnostics,
        }
    }

    /// Streaming engine path with debug diagnostics
    pub fn engine() -> Self {
        Self::new(false, true, debug_config())
    }

    /// Native path with debug diagnostics
    pub fn native() -> Self {
        Self::new(
            true,
            true,
            PlayerConfig {
                prefer_native: true,
                ..debug_config()
            },
        )
    }

    /// Handle pending signals and return every public event emitted
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        self.player.pump();
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn engine_handle(&self) -> EngineHandle {
        self.engines.latest()
    }
}

pub fn debug_config() -> PlayerConfig {
    PlayerConfig {
        debug: true,
        ..Default::default()
    }
}

pub fn clips(sources: &[&str]) -> Vec<Clip> {
    sources.iter().map(|s| Clip::new(*s)).collect()
}

pub fn sources(clips: &[Clip]) -> Vec<&str> {
    clips.iter().map(|c| c.source.as_str()).collect()
}

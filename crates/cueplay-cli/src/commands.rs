//! CLI command implementations

use crate::output::{self, OutputFormat};
use crate::sim::{Injection, Tick, World};
use anyhow::Context;
use cueplay_core::normalize::{classify_media_error, engine_error};
use cueplay_core::{
    recovery_for, AdvancePolicy, Capabilities, Clip, EngineErrorData, MediaErrorCode, Player,
    PlayerConfig, PlayerEvent, PlayerStatus,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tabled::Tabled;
use tracing::{info, warn};

/// Options for [`simulate`]
pub struct SimulateOptions {
    pub clips: Vec<String>,
    pub config: Option<PathBuf>,
    pub prefer_native: bool,
    pub native: bool,
    pub engine: bool,
    pub advance: Option<AdvancePolicy>,
    pub debug: bool,
    pub duration: f64,
    pub step: f64,
    pub tick_ms: u64,
    pub inject: Option<String>,
    pub inject_at: f64,
    pub max_ticks: usize,
}

#[derive(Debug, Serialize, Tabled)]
struct EventRow {
    tick: usize,
    clip: String,
    position: String,
    event: String,
    detail: String,
}

impl EventRow {
    fn new(tick: usize, clip: Option<&Clip>, position: f64, event: &PlayerEvent) -> Self {
        Self {
            tick,
            clip: clip.map_or_else(|| "-".to_string(), |c| c.source.clone()),
            position: format!("{:.1}s", position),
            event: event.kind().to_string(),
            detail: describe(event),
        }
    }
}

/// JSON line emitted per event
#[derive(Serialize)]
struct EventRecord<'a> {
    tick: usize,
    clip: Option<&'a str>,
    position: f64,
    event: &'a PlayerEvent,
}

#[derive(Serialize)]
struct SimulationSummary {
    outcome: &'static str,
    ticks: usize,
    loads: usize,
    recoveries: usize,
    errors: usize,
    events: u64,
    status: PlayerStatus,
}

fn describe(event: &PlayerEvent) -> String {
    match event {
        PlayerEvent::Buffer(ranges) => ranges
            .end()
            .map_or_else(|| "nothing buffered".to_string(), |end| format!("buffered to {:.1}s", end)),
        PlayerEvent::Speed(rate) => format!("{}x", rate),
        PlayerEvent::Seek(time) | PlayerEvent::Progress(time) => format!("{:.1}s", time),
        PlayerEvent::Volume(volume) => format!(
            "volume {:.2}{}",
            volume.volume,
            if volume.muted { " (muted)" } else { "" }
        ),
        PlayerEvent::Error(error) => error.to_string(),
        PlayerEvent::Ready
        | PlayerEvent::Finish
        | PlayerEvent::Pause
        | PlayerEvent::Resume => String::new(),
    }
}

/// Parse `locator` or `locator@start`
fn parse_clip(arg: &str) -> Clip {
    if let Some((source, start)) = arg.rsplit_once('@') {
        if let Ok(start) = start.parse::<f64>() {
            if !source.is_empty() {
                return Clip::new(source).with_start(start);
            }
        }
    }
    Clip::new(arg)
}

fn load_config(options: &SimulateOptions) -> anyhow::Result<PlayerConfig> {
    let mut config = match &options.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            PlayerConfig::from_json(&json)?
        }
        None => PlayerConfig::default(),
    };

    if !options.clips.is_empty() {
        config.clips = options.clips.iter().map(|c| parse_clip(c)).collect();
    }
    if let Some(advance) = options.advance {
        config.advance = advance;
    }
    config.prefer_native |= options.prefer_native;
    config.debug |= options.debug;

    config.validate()?;
    Ok(config)
}

/// Play the queue against the simulated element and engine
pub async fn simulate(options: SimulateOptions, format: &str) -> anyhow::Result<()> {
    let format = OutputFormat::from(format);
    let config = load_config(&options)?;

    let injection = options
        .inject
        .as_deref()
        .map(|code| Injection::new(code, options.inject_at));
    let world = World::new(options.native, options.duration, injection);
    let mut player = match Player::new(
        Box::new(world.element()),
        Box::new(world.engines(options.engine)),
        config,
    ) {
        Ok(player) => player,
        Err(e) => {
            warn!(code = e.error_code(), fatal = e.is_fatal(), "Player creation failed");
            return Err(anyhow::Error::new(e).context("cannot create player"));
        }
    };
    let mut events = player.subscribe();

    info!(
        session_id = %player.id(),
        backend = ?player.backend_kind(),
        clips = player.clips().len(),
        "Simulation started"
    );
    if format == OutputFormat::Text {
        let backend = player
            .backend_kind()
            .map_or_else(|| "none".to_string(), |k| k.to_string());
        println!("Backend: {}", backend);
        println!("Clips: {}\n", player.clips().len());
    }

    let mut rows = Vec::new();
    let mut ticks = 0;
    let mut errors = 0;

    while ticks < options.max_ticks {
        ticks += 1;
        let tick = world.tick(options.step);
        player.pump();

        while let Ok(event) = events.try_recv() {
            if matches!(event, PlayerEvent::Error(_)) {
                errors += 1;
            }
            match format {
                OutputFormat::Json => {
                    let record = EventRecord {
                        tick: ticks,
                        clip: player.current_clip().map(|c| c.source.as_str()),
                        position: world.position(),
                        event: &event,
                    };
                    println!("{}", serde_json::to_string(&record)?);
                }
                OutputFormat::Text => {
                    let row = EventRow::new(ticks, player.current_clip(), world.position(), &event);
                    println!(
                        "{:>5}  {:<28} {:>7}  {:<8} {}",
                        row.tick, row.clip, row.position, row.event, row.detail
                    );
                }
                OutputFormat::Table => {
                    rows.push(EventRow::new(ticks, player.current_clip(), world.position(), &event));
                }
            }
        }

        if tick == Tick::Idle {
            break;
        }
        if options.tick_ms > 0 {
            tokio::time::sleep(Duration::from_millis(options.tick_ms)).await;
        }
    }

    let outcome = if world.loads() == 0 {
        "nothing to play"
    } else if world.is_ended() && !player.has_next() {
        "completed"
    } else if ticks >= options.max_ticks {
        "tick limit reached"
    } else {
        "stalled"
    };

    let summary = SimulationSummary {
        outcome,
        ticks,
        loads: world.loads(),
        recoveries: world.recoveries(),
        errors,
        events: player.events_emitted(),
        status: player.status(),
    };
    info!(outcome, ticks, errors, "Simulation finished");

    if format == OutputFormat::Table {
        println!("{}", output::table(&rows));
    }
    if format != OutputFormat::Json {
        println!("\nSummary:");
    }
    println!("{}", output::format_output(&summary, format));

    player.destroy();
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
struct SelectionRow {
    native: bool,
    engine: bool,
    prefer_native: bool,
    selected: String,
}

/// Backend selection for every capability combination
pub fn probe(format: &str) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for native in [true, false] {
        for engine in [true, false] {
            for prefer_native in [true, false] {
                let selected = Capabilities { native, engine }
                    .select(prefer_native)
                    .map_or_else(|| "unsupported".to_string(), |k| k.to_string());
                rows.push(SelectionRow {
                    native,
                    engine,
                    prefer_native,
                    selected,
                });
            }
        }
    }

    println!("{}", output::format_rows(&rows, OutputFormat::from(format)));
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
struct ErrorRow {
    source: &'static str,
    code: String,
    fatal: bool,
    #[tabled(rename = "public type")]
    error_type: String,
    recovery: String,
}

/// Engine and element error classification
pub fn errors(format: &str) -> anyhow::Result<()> {
    let mut rows = Vec::new();

    for code in [
        "networkError",
        "mediaError",
        "keySystemError",
        "muxError",
        "otherError",
    ] {
        for fatal in [true, false] {
            let data = EngineErrorData::from_code(code, code, fatal);
            rows.push(ErrorRow {
                source: "engine",
                code: code.to_string(),
                fatal,
                error_type: engine_error(&data).error_type().to_string(),
                recovery: recovery_for(&data)
                    .map_or_else(|| "-".to_string(), |action| format!("{:?}", action)),
            });
        }
    }

    for code in [
        MediaErrorCode::Aborted,
        MediaErrorCode::Network,
        MediaErrorCode::Decode,
        MediaErrorCode::SrcNotSupported,
    ] {
        rows.push(ErrorRow {
            source: "element",
            code: code.name().to_string(),
            fatal: true,
            error_type: classify_media_error(code).to_string(),
            recovery: "-".to_string(),
        });
    }

    println!("{}", output::format_rows(&rows, OutputFormat::from(format)));
    Ok(())
}

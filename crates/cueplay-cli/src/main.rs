//! cueplay CLI - Headless clip queue simulator
//!
//! Features:
//! - Simulated playback of a clip queue on either backend
//! - Error injection and recovery tracing
//! - Backend selection matrix
//! - Error classification table

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod output;
mod sim;

/// cueplay CLI - Clip queue playback toolkit
#[derive(Parser)]
#[command(name = "cueplay-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Simulate and inspect queued clip playback", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Advance {
    Cursor,
    Shrinking,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a clip queue against a simulated element and engine
    Simulate {
        /// Clip locators, optionally with a start offset (`url@seconds`)
        clips: Vec<String>,

        /// JSON player configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use native playback when available
        #[arg(long)]
        prefer_native: bool,

        /// Element cannot play HLS natively
        #[arg(long)]
        no_native: bool,

        /// Streaming engine is unavailable
        #[arg(long)]
        no_engine: bool,

        /// Queue behavior when a clip finishes
        #[arg(long, value_enum)]
        advance: Option<Advance>,

        /// Length of every simulated clip in seconds
        #[arg(short, long, default_value = "6")]
        duration: f64,

        /// Playhead step per tick in seconds
        #[arg(long, default_value = "1")]
        step: f64,

        /// Wall-clock delay between ticks in milliseconds
        #[arg(long, default_value = "0")]
        tick_ms: u64,

        /// Inject a fatal error in the first clip (networkError, mediaError, ...)
        #[arg(long)]
        inject: Option<String>,

        /// Playhead position of the injected error in seconds
        #[arg(long, default_value = "2")]
        inject_at: f64,

        /// Stop after this many ticks
        #[arg(long, default_value = "10000")]
        max_ticks: usize,
    },

    /// Show which backend is selected for each capability combination
    Probe,

    /// Show how backend errors map to public error types
    Errors,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    cueplay_core::init();

    match cli.command {
        Commands::Simulate {
            clips,
            config,
            prefer_native,
            no_native,
            no_engine,
            advance,
            duration,
            step,
            tick_ms,
            inject,
            inject_at,
            max_ticks,
        } => {
            let options = commands::SimulateOptions {
                clips,
                config,
                prefer_native,
                native: !no_native,
                engine: !no_engine,
                advance: advance.map(|a| match a {
                    Advance::Cursor => cueplay_core::AdvancePolicy::Cursor,
                    Advance::Shrinking => cueplay_core::AdvancePolicy::ShrinkingQueue,
                }),
                debug: cli.verbose,
                duration,
                step,
                tick_ms,
                inject,
                inject_at,
                max_ticks,
            };
            commands::simulate(options, &cli.format).await?;
        }
        Commands::Probe => {
            commands::probe(&cli.format)?;
        }
        Commands::Errors => {
            commands::errors(&cli.format)?;
        }
    }

    Ok(())
}

//! cuebox player - command-line runner
//!
//! Loads a catalog and configuration, plays one clip, group or playlist on
//! simulated channels and steps the service with a fixed tick until the
//! request finishes or the time limit is reached. Lifecycle events are logged,
//! or printed as JSON lines with `--json`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cuebox_common::catalog::Catalog;
use cuebox_common::config::{resolve_config_path, TomlConfig};
use cuebox_common::events::{AudioEvent, SequenceId};
use cuebox_player::channel::SimulatedChannel;
use cuebox_player::edits::{EditModule, EditSet, EditValue};
use cuebox_player::playback::SequenceState;
use cuebox_player::AudioService;

/// Command-line arguments for cuebox-player
#[derive(Parser, Debug)]
#[command(name = "cuebox-player")]
#[command(about = "Play a clip, group or playlist from a cuebox catalog on simulated channels")]
#[command(version)]
struct Args {
    /// Catalog TOML file
    #[arg(short, long, env = "CUEBOX_CATALOG")]
    catalog: PathBuf,

    /// Config TOML file (falls back to CUEBOX_CONFIG, then the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat the request as a group id
    #[arg(long, conflicts_with = "playlist")]
    group: bool,

    /// Treat the request as a playlist id
    #[arg(long)]
    playlist: bool,

    /// Clip, group or playlist id
    request: String,

    /// Simulation step in milliseconds
    #[arg(long, default_value = "16")]
    tick_ms: u64,

    /// Stop after this many simulated seconds
    #[arg(long, default_value = "60")]
    max_seconds: f64,

    /// Loop count for clips and groups (-1 loops until the time limit)
    #[arg(long = "loop", allow_negative_numbers = true)]
    loop_count: Option<i64>,

    /// Fixed volume for clips and groups
    #[arg(long)]
    volume: Option<f32>,

    /// Initial delay in seconds for clips and groups
    #[arg(long)]
    delay: Option<f32>,

    /// Print events as JSON lines on stdout
    #[arg(long)]
    json: bool,
}

/// Final report printed with `--json`
#[derive(Debug, Serialize)]
struct SessionSummary<'a> {
    request: &'a str,
    kind: &'a str,
    simulated_seconds: f64,
    events: usize,
    finished: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match resolve_config_path(args.config.as_deref()) {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    let catalog = Catalog::load(&args.catalog)
        .with_context(|| format!("Failed to load catalog {}", args.catalog.display()))?;

    let mut service = AudioService::new(
        Arc::new(catalog),
        config.audio.clone(),
        SimulatedChannel::factory(),
    );
    service.init();
    let mut events = service.subscribe();

    let edits = build_edits(&args);
    let (kind, sequence) = if args.playlist {
        if !service.play_playlist(&args.request) {
            bail!("playlist '{}' could not be played", args.request);
        }
        ("playlist", None)
    } else if args.group {
        match service.play_group(&args.request, edits) {
            Some(id) => ("group", Some(id)),
            None => bail!("group '{}' could not be played", args.request),
        }
    } else {
        match service.play(&args.request, edits) {
            Some(id) => ("clip", Some(id)),
            None => bail!("clip '{}' could not be played", args.request),
        }
    };

    let dt = (args.tick_ms.max(1) as f32) / 1000.0;
    let mut event_count = 0usize;
    let mut finished = false;

    while service.clock() < args.max_seconds {
        service.tick(dt);

        loop {
            match events.try_recv() {
                Ok(event) => {
                    event_count += 1;
                    report(&event, args.json)?;
                }
                Err(TryRecvError::Lagged(missed)) => warn!("Missed {} events", missed),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if request_finished(&service, sequence) {
            finished = true;
            break;
        }
    }

    if !finished {
        info!(
            "Time limit of {:.1}s reached, stopping '{}'",
            args.max_seconds, args.request
        );
    }
    let simulated_seconds = service.clock();
    service.shutdown();

    if args.json {
        let summary = SessionSummary {
            request: &args.request,
            kind,
            simulated_seconds,
            events: event_count,
            finished,
        };
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        info!(
            "Session over after {:.2}s simulated ({} events)",
            simulated_seconds, event_count
        );
    }
    Ok(())
}

fn build_edits(args: &Args) -> EditSet {
    let mut edits = EditSet::new();
    if let Some(volume) = args.volume {
        edits.insert(EditModule::volume(EditValue::Fixed(volume)));
    }
    if let Some(delay) = args.delay {
        edits.insert(EditModule::delay(delay, false));
    }
    if let Some(count) = args.loop_count {
        edits.insert(EditModule::looped(count));
    }
    edits
}

fn request_finished(service: &AudioService, sequence: Option<SequenceId>) -> bool {
    match sequence {
        Some(id) => match service.sequence(id) {
            // Recycled sequences are gone from the service
            None => true,
            Some(seq) => matches!(
                seq.state(),
                SequenceState::Completed | SequenceState::Stopped
            ),
        },
        None => service.playlist().is_none() && !service.music().is_playing(),
    }
}

fn report(event: &AudioEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", event.to_json()?);
    } else {
        info!("[{:>8.3}s] {:?}", event_time(event), event);
    }
    Ok(())
}

fn event_time(event: &AudioEvent) -> f64 {
    match event {
        AudioEvent::SequenceStarted { at, .. }
        | AudioEvent::SequenceLooped { at, .. }
        | AudioEvent::SequenceCompleted { at, .. }
        | AudioEvent::SequenceStopped { at, .. }
        | AudioEvent::SequencePaused { at, .. }
        | AudioEvent::SequenceResumed { at, .. }
        | AudioEvent::MusicStarted { at, .. }
        | AudioEvent::MusicStopped { at }
        | AudioEvent::MusicPaused { at }
        | AudioEvent::MusicResumed { at }
        | AudioEvent::TransitionStarted { at, .. }
        | AudioEvent::TransitionCompleted { at, .. }
        | AudioEvent::PlaylistAdvanced { at, .. }
        | AudioEvent::PlaylistCompleted { at, .. } => *at,
    }
}

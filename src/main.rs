//! mousewake - keeps a workstation awake
//!
//! Watches the pointer on a fixed cadence. When nobody has moved it, nudges
//! it to a random nearby spot so the session stays active. When nobody has
//! moved it for a long time, sounds an alarm and keeps dinging, louder each
//! cycle, until someone does.

mod alarm;
mod config;
mod logging;
mod notify;
mod pointer;
mod watcher;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::alarm::{EscalationEngine, SystemClock, MAX_DINGS_PER_CYCLE};
use crate::config::Config;
use crate::logging::JsonlLogger;
use crate::notify::SilentNotifier;
use crate::pointer::PlatformPointer;
use crate::watcher::{WatchSettings, Watcher};

/// Application version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "mousewake", version)]
#[command(about = "Keeps the workstation awake and sounds an alarm when nobody is at it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Time between pointer checks, at least 2s (e.g. 30s, 5m)
    #[arg(short, long, global = true, value_parser = humantime::parse_duration)]
    interval: Option<Duration>,
    /// Pixels the pointer must move to count as a human
    #[arg(short, long, global = true)]
    threshold: Option<u32>,
    /// Minimum distance of a synthetic move in pixels
    #[arg(long, global = true)]
    min_distance: Option<u32>,
    /// Maximum distance of a synthetic move in pixels
    #[arg(long, global = true)]
    max_distance: Option<u32>,
    /// Inactivity before the alarm sounds, at least 10s (e.g. 30m)
    #[arg(short = 'T', long, global = true, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
    /// Jump straight to the target instead of gliding
    #[arg(long, global = true)]
    no_glide: bool,
    /// Log alarms and dings instead of playing them
    #[arg(long, global = true)]
    mute: bool,
    /// Do not write the JSONL event journal
    #[arg(long, global = true)]
    no_journal: bool,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq, Debug)]
enum Commands {
    /// Watch the pointer (default)
    Run,
    /// Print the resolved configuration and exit
    Status,
}

impl Cli {
    /// Command-line values win over the config file and environment.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(interval) = self.interval {
            config.poll.interval_seconds = interval.as_secs();
        }
        if let Some(threshold) = self.threshold {
            config.poll.movement_threshold_px = threshold;
        }
        if let Some(min) = self.min_distance {
            config.movement.min_distance_px = min;
        }
        if let Some(max) = self.max_distance {
            config.movement.max_distance_px = max;
        }
        if let Some(timeout) = self.timeout {
            config.alarm.timeout_seconds = timeout.as_secs();
        }
        if self.no_glide {
            config.movement.smooth = false;
        }
        if self.mute {
            config.alarm.mute = true;
        }
        if self.no_journal {
            config.logging.journal = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    init_tracing(&config.logging.level)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config),
        Commands::Status => print_status(&config),
    }
}

fn run(config: Config) -> Result<()> {
    info!("Starting mousewake v{}", VERSION);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let cancel = CancellationToken::new();
    runtime.spawn(shutdown_signal(cancel.clone()));

    let pointer = PlatformPointer::new().context("Pointer access is not available")?;
    let notifier = notify::select(config.alarm.mute);
    let engine = EscalationEngine::new(config.engine_settings(), notifier, SystemClock)?;
    let journal = if config.logging.journal {
        Some(JsonlLogger::new(config.logging.logs_dir())?)
    } else {
        None
    };

    let mut watcher = Watcher::new(
        pointer,
        engine,
        SystemClock,
        WatchSettings::from_config(&config),
        journal,
    );

    let handle = runtime.handle().clone();
    let watch_cancel = cancel.clone();
    let watch_thread = std::thread::Builder::new()
        .name("pointer-watch".to_string())
        .spawn(move || watcher.run(&handle, &watch_cancel))?;

    if watch_thread.join().is_err() {
        error!("Pointer watch thread panicked");
    }
    cancel.cancel();

    info!("mousewake shutdown complete");
    Ok(())
}

/// Cancel `cancel` on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Stopping mousewake...");
    cancel.cancel();
}

fn print_status(config: &Config) -> Result<()> {
    let engine = EscalationEngine::new(config.engine_settings(), SilentNotifier, SystemClock)?;
    let status = engine.status_snapshot();

    println!("mousewake v{}", VERSION);
    println!(
        "  Check interval:       {}",
        humantime::format_duration(status.poll_interval)
    );
    println!(
        "  Movement threshold:   {}px",
        config.poll.movement_threshold_px
    );
    println!(
        "  Random move distance: {}-{}px ({})",
        config.movement.min_distance_px,
        config.movement.max_distance_px,
        if config.movement.smooth { "glide" } else { "jump" }
    );
    println!(
        "  Alarm timeout:        {}",
        humantime::format_duration(status.alarm_timeout)
    );
    println!(
        "  Ding unit:            {}",
        humantime::format_duration(config.alarm.ding_unit())
    );
    println!(
        "  Max dings per cycle:  {} (min({}, interval / ding unit))",
        status.max_ding_count, MAX_DINGS_PER_CYCLE
    );
    println!(
        "  Sound:                {}",
        if config.alarm.mute { "muted" } else { "on" }
    );
    if config.logging.journal {
        println!("  Journal:              {}", config.logging.logs_dir().display());
    } else {
        println!("  Journal:              disabled");
    }
    Ok(())
}

/// Initialize tracing subscriber with the given log level.
fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}

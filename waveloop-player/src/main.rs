//! Waveloop - Main entry point
//!
//! Loads one audio file, loops it, and lets the user edit the loop segment
//! with line commands on stdin (see `commands`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waveloop_common::config::{resolve_config_path, TomlConfig};
use waveloop_player::audio::{AudioBufferLoader, AudioOutput};
use waveloop_player::commands::{CommandResult, EditCommand};
use waveloop_player::playback::{LoopSession, SessionSettings};

/// Command-line arguments for waveloop
#[derive(Parser, Debug)]
#[command(name = "waveloop")]
#[command(about = "Loop an audio file between editable segment boundaries")]
#[command(version)]
struct Args {
    /// Audio file to load (overrides `audio_file` in the config)
    #[arg(env = "WAVELOOP_AUDIO_FILE")]
    audio_file: Option<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Timeline width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Initial segment start in seconds
    #[arg(long)]
    segment_start: Option<f64>,

    /// Initial segment duration in seconds
    #[arg(long)]
    segment_duration: Option<f64>,

    /// Cursor sampling interval in milliseconds
    #[arg(long)]
    frame_interval_ms: Option<u64>,

    /// Output device name
    #[arg(short, long, env = "WAVELOOP_DEVICE")]
    device: Option<String>,

    /// Run without an audio device
    #[arg(long)]
    headless: bool,

    /// Pass out-of-range segments to the transport unclamped
    #[arg(long)]
    no_clamp: bool,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// Apply command-line overrides on top of the file configuration
    fn apply(&self, config: &mut TomlConfig) {
        if let Some(path) = &self.audio_file {
            config.audio_file = Some(path.clone());
        }
        if let Some(width) = self.width {
            config.timeline.width = width;
        }
        if let Some(start) = self.segment_start {
            config.segment.start = start;
        }
        if let Some(duration) = self.segment_duration {
            config.segment.duration = duration;
        }
        if let Some(ms) = self.frame_interval_ms {
            config.playback.frame_interval_ms = ms;
        }
        if let Some(device) = &self.device {
            config.playback.device = Some(device.clone());
        }
        if self.headless {
            config.playback.headless = true;
        }
        if self.no_clamp {
            config.playback.clamp_to_buffer = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);

    // Initialize tracing
    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("waveloop={level},waveloop_player={level},waveloop_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting waveloop v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration source: {:?}", resolve_config_path(args.config.as_deref()));

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to list devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    config
        .validate()
        .context("Invalid configuration after command-line overrides")?;

    let Some(audio_file) = config.audio_file.clone() else {
        anyhow::bail!("No audio file given (pass a path or set audio_file in the config)");
    };

    // Decode straight to the device rate so the transport clock and the
    // stream clock agree
    let mut loader = AudioBufferLoader::new();
    if !config.playback.headless {
        match AudioOutput::default_sample_rate(config.playback.device.as_deref()) {
            Ok(rate) => loader = loader.with_target_sample_rate(rate),
            Err(e) => warn!("Could not query output device: {}", e),
        }
    }

    let buffer = match loader.load(&audio_file).await {
        Ok(buffer) => buffer.into_shared(),
        Err(e) => {
            error!("Failed to load {}: {}", audio_file.display(), e);
            std::process::exit(1);
        }
    };

    let mut session = LoopSession::start(buffer, SessionSettings::from_config(&config))
        .context("Failed to start loop session")?;

    info!("Commands: move <px>, resize <px>, trim <px>, set <start> <duration>, seek <s>, play, stop, status, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("End of input, shutting down");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<EditCommand>() {
                    Ok(command) => match command.apply(&mut session) {
                        CommandResult::Continue(message) => println!("{}", message),
                        CommandResult::Quit => break,
                    },
                    Err(e) => warn!("Ignoring command '{}': {}", line.trim(), e),
                }
            }
        }
    }

    session.shutdown().await.context("Shutdown failed")?;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

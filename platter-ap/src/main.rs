//! Platter player (platter-ap) - Main entry point
//!
//! Plays one WAV file in a loop and bends its pitch to follow the platter:
//! pulses from the rotary sensor speed playback up or slow it down, and the
//! speed drifts back to nominal while the platter is left alone.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use platter_ap::audio::{write_device_list, AudioOutput, AudioSession, WaveLoader};
use platter_ap::config::{Overrides, PlayerConfig};
use platter_ap::control::{SpeedController, SpeedLoop};
use platter_ap::input::PulseInput;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for platter-ap
#[derive(Parser, Debug)]
#[command(name = "platter-ap")]
#[command(about = "Turntable platter player: loops a WAV file at the platter's speed")]
#[command(version)]
struct Args {
    /// WAV file to play in a loop
    #[arg(value_name = "WAV_FILE")]
    wav_file: PathBuf,

    /// Pulse input device
    #[arg(short, long, env = "PLATTER_INPUT_DEVICE")]
    device: Option<PathBuf>,

    /// Config file (default: ~/.config/platter/config.toml)
    #[arg(short, long, env = "PLATTER_CONFIG")]
    config: Option<PathBuf>,

    /// Speed delta scale applied to 1/gap
    #[arg(long)]
    factor: Option<f64>,

    /// Speed units recovered per idle millisecond
    #[arg(long)]
    reflex: Option<f64>,

    /// Longest wait for a pulse per loop iteration
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Output device name (default device when absent or not found)
    #[arg(long)]
    audio_device: Option<String>,

    /// Disable the speed readout on stdout
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            input_device: self.device.clone(),
            factor: self.factor,
            reflex: self.reflex,
            poll_interval_ms: self.poll_interval_ms,
            audio_device: self.audio_device.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(255)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply(&args.overrides())
        .context("Invalid command-line settings")?;

    // Initialize tracing; stderr keeps the stdout readout on one line
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "platter_ap={level},platter_common={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    info!(
        "Starting platter-ap {} ({}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    println!("Using cpal as audio backend");
    write_device_list(&mut io::stdout(), AudioOutput::list_devices())
        .context("Failed to write device list")?;

    let wave = WaveLoader::load(&args.wav_file).with_context(|| {
        format!("Failed to read wave file {}", args.wav_file.display())
    })?;

    let session = AudioSession::open(&config.session(), &wave)
        .context("Failed to start audio playback")?;
    println!("Device: {}", session.device_name());

    let mut input = PulseInput::open(&config.input_device).context("Failed to open pulse input")?;

    let controller = SpeedController::new(config.speed);
    let readout: Box<dyn Write> = if args.quiet {
        Box::new(io::sink())
    } else {
        Box::new(io::stdout())
    };

    let mut speed_loop = SpeedLoop::new(
        controller,
        session.pitch_control(),
        readout,
        config.poll_interval,
    );
    let summary = speed_loop.run_until(&mut input, shutdown_signal()).await;

    info!(
        "Final speed {:.3} after {} pulses",
        summary.final_state.speed, summary.pulses
    );

    drop(input);
    drop(session);

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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

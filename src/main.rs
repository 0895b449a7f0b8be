//! silence-hook: run commands when a live capture stream turns loud or
//! goes silent
//!
//! The daemon:
//! - Reads fixed-size interleaved PCM buffers from ALSA (or stdin)
//! - Reduces each buffer to one loudness value in decibels
//! - Debounces loud/quiet probes into Sound and Silence states
//! - Spawns the configured hook once per state change, without waiting

mod capture;
mod config;
mod detector;
mod events;
mod hook;
mod level;
mod lifecycle;

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "alsa")]
use crate::capture::AlsaCapture;
use crate::capture::{CaptureError, CaptureLoop, ReaderCapture};
use crate::config::Config;
use crate::hook::ProcessSpawner;
use crate::lifecycle::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(use_colour(&io::stderr()))
        .init();

    let config = Config::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        device = %config.device,
        format = %config.format,
        rate = config.rate,
        channels = config.channels,
        "silence-hook starting"
    );

    let shutdown = ShutdownSignal::new();
    let capture_done = start_capture(&config)?;

    tokio::select! {
        result = capture_done => {
            match result {
                Ok(e) => {
                    error!(error = %e, "capture loop stopped");
                    return Err(e).context("capture stream failed");
                }
                Err(_) => anyhow::bail!("capture loop exited without reporting"),
            }
        }

        result = shutdown.wait() => {
            result.context("failed to register signal handlers")?;
            info!("shutdown signal received");
        }
    }

    info!("silence-hook stopped");

    Ok(())
}

/// Open the configured device and start probing it on its own thread
fn start_capture(config: &Config) -> Result<oneshot::Receiver<CaptureError>> {
    if config.reads_stdin() {
        info!("reading raw PCM from stdin");
        let device = ReaderCapture::new(io::stdin(), config.frame_bytes());
        return Ok(CaptureLoop::new(device, config, ProcessSpawner).start()?);
    }

    #[cfg(feature = "alsa")]
    {
        let device =
            AlsaCapture::open(&config.device, config.format, config.rate, config.channels)?;
        Ok(CaptureLoop::new(device, config, ProcessSpawner).start()?)
    }

    #[cfg(not(feature = "alsa"))]
    {
        anyhow::bail!(
            "built without ALSA support, use `-` as the device to read raw PCM from stdin"
        )
    }
}

/// Colour log output only when a person is watching it
fn use_colour(stream: &impl IsTerminal) -> bool {
    stream.is_terminal()
}

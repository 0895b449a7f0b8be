//! The probing loop
//!
//! Reads one buffer per probe, measures it, feeds the detector and hands
//! transitions to the hook runner. Runs on a dedicated thread until the
//! capture device fails.

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use super::device::{Availability, CaptureDevice, CaptureError};
use crate::config::Config;
use crate::detector::HysteresisDetector;
use crate::hook::{HookRunner, ProcessSpawner, Spawner};
use crate::level::LevelEstimator;

/// Availability polls after each re-prepare before reading anyway
pub const READY_POLL_ATTEMPTS: u32 = 50;

/// Pause between availability polls
pub const READY_POLL_BACKOFF: Duration = Duration::from_millis(2);

/// Drives capture → estimator → detector → hooks
pub struct CaptureLoop<D, S = ProcessSpawner> {
    device: D,
    /// Reused for every probe
    buffer: Vec<u8>,
    frames_per_probe: usize,
    probe_delay: Duration,
    estimator: LevelEstimator,
    detector: HysteresisDetector,
    hooks: HookRunner<S>,
    /// Non-empty reads still to discard before measuring
    warmup_remaining: usize,
}

impl<D: CaptureDevice, S: Spawner> CaptureLoop<D, S> {
    pub fn new(device: D, config: &Config, spawner: S) -> Self {
        let buffer = vec![0u8; config.frames_per_probe * config.frame_bytes()];

        Self {
            device,
            buffer,
            frames_per_probe: config.frames_per_probe,
            probe_delay: config.probe_delay,
            estimator: LevelEstimator::new(config.format, config.channels as usize),
            detector: HysteresisDetector::new(config.detector),
            hooks: HookRunner::new(spawner, config.on_sound.clone(), config.on_silence.clone()),
            warmup_remaining: config.frames_per_probe + 1,
        }
    }

    #[cfg(test)]
    pub fn detector(&self) -> &HysteresisDetector {
        &self.detector
    }

    #[cfg(test)]
    pub fn hooks(&self) -> &HookRunner<S> {
        &self.hooks
    }

    /// Probe forever. Only returns when the capture device fails.
    pub fn run(&mut self) -> Result<Infallible, CaptureError> {
        info!(
            format = %self.estimator.format(),
            frames = self.frames_per_probe,
            delay_us = self.probe_delay.as_micros() as u64,
            warmup = self.warmup_remaining,
            threshold = self.detector.config().decibel_threshold,
            state = %self.detector.state(),
            "capture loop started"
        );

        loop {
            self.probe()?;
        }
    }

    /// One iteration: read, and unless the read was empty or discarded,
    /// classify, pace and reset the stream
    fn probe(&mut self) -> Result<(), CaptureError> {
        let frames = self.device.read(&mut self.buffer)?;
        if frames == 0 {
            return Ok(());
        }

        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            if self.warmup_remaining == 0 {
                debug!("warm-up finished");
            }
            return Ok(());
        }

        let sample = self.estimator.measure(&self.buffer, frames);
        if let Some(event) = self.detector.observe(&sample) {
            self.hooks.dispatch(event);
        }

        thread::sleep(self.probe_delay);
        self.recover_stream();

        Ok(())
    }

    /// Re-prepare to drop backlog and overruns, then wait for the device
    fn recover_stream(&mut self) {
        if let Err(e) = self.device.prepare() {
            warn!(error = %e, "failed to re-prepare capture stream");
        }

        for _ in 0..READY_POLL_ATTEMPTS {
            match self.device.available() {
                Ok(Availability::NotReady) => thread::sleep(READY_POLL_BACKOFF),
                Ok(Availability::Ready(frames)) => {
                    trace!(frames, "capture stream ready");
                    return;
                }
                Err(e) => {
                    debug!(error = %e, "availability poll failed");
                    return;
                }
            }
        }

        debug!(
            attempts = READY_POLL_ATTEMPTS,
            "capture stream still not ready, reading anyway"
        );
    }
}

impl<D, S> CaptureLoop<D, S>
where
    D: CaptureDevice + Send + 'static,
    S: Spawner + Send + 'static,
{
    /// Start the loop on a dedicated thread.
    ///
    /// The receiver resolves with the error that stopped the loop.
    pub fn start(mut self) -> Result<oneshot::Receiver<CaptureError>, CaptureError> {
        let (done_tx, done_rx) = oneshot::channel();

        thread::Builder::new()
            .name("capture-loop".to_string())
            .spawn(move || {
                info!("capture loop thread started");

                let err = match self.run() {
                    Ok(never) => match never {},
                    Err(e) => e,
                };

                let _ = done_tx.send(err);
            })
            .map_err(|e| CaptureError::ThreadSpawn(e.to_string()))?;

        Ok(done_rx)
    }
}

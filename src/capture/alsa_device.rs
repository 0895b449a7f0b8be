//! ALSA capture device

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use tracing::info;

use super::device::{Availability, CaptureDevice, CaptureError};
use crate::level::SampleFormat;

/// An ALSA PCM opened for interleaved capture
pub struct AlsaCapture {
    pcm: PCM,
}

impl AlsaCapture {
    /// Open and configure `device`, then prepare it for reading
    pub fn open(
        device: &str,
        format: SampleFormat,
        rate: u32,
        channels: u32,
    ) -> Result<Self, CaptureError> {
        let fail = |stage: &str, e: alsa::Error| CaptureError::Open {
            device: device.to_string(),
            message: format!("{stage} ({e})"),
        };

        let alsa_format = to_alsa_format(format).ok_or_else(|| CaptureError::Open {
            device: device.to_string(),
            message: format!("unsupported sample format {format}"),
        })?;

        let pcm = PCM::new(device, Direction::Capture, false)
            .map_err(|e| fail("cannot open audio device", e))?;

        let actual_rate = {
            let hwp = HwParams::any(&pcm)
                .map_err(|e| fail("cannot initialize hardware parameter structure", e))?;
            hwp.set_access(Access::RWInterleaved)
                .map_err(|e| fail("cannot set access type", e))?;
            hwp.set_format(alsa_format)
                .map_err(|e| fail("cannot set sample format", e))?;
            let actual_rate = hwp
                .set_rate_near(rate, ValueOr::Nearest)
                .map_err(|e| fail("cannot set sample rate", e))?;
            hwp.set_channels(channels)
                .map_err(|e| fail("cannot set channel count", e))?;
            pcm.hw_params(&hwp)
                .map_err(|e| fail("cannot set parameters", e))?;
            actual_rate
        };

        pcm.prepare()
            .map_err(|e| fail("cannot prepare audio interface for use", e))?;

        info!(
            device,
            %format,
            requested_rate = rate,
            rate = actual_rate,
            channels,
            "capture device configured"
        );

        Ok(Self { pcm })
    }
}

impl CaptureDevice for AlsaCapture {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError> {
        self.pcm
            .io_bytes()
            .readi(buffer)
            .map_err(|e| CaptureError::Read(e.to_string()))
    }

    fn prepare(&mut self) -> Result<(), CaptureError> {
        self.pcm
            .prepare()
            .map_err(|e| CaptureError::Prepare(e.to_string()))
    }

    fn available(&mut self) -> Result<Availability, CaptureError> {
        match self.pcm.avail() {
            Ok(frames) => Ok(Availability::Ready(frames.max(0) as usize)),
            Err(e) if e.errno() == libc::EAGAIN => Ok(Availability::NotReady),
            Err(e) => Err(CaptureError::Read(e.to_string())),
        }
    }
}

fn to_alsa_format(format: SampleFormat) -> Option<Format> {
    let known = [
        (SampleFormat::U8, Format::U8),
        (SampleFormat::S8, Format::S8),
        (SampleFormat::S16_LE, Format::S16LE),
        (SampleFormat::S16_BE, Format::S16BE),
        (SampleFormat::S24_LE, Format::S24LE),
        (SampleFormat::S24_BE, Format::S24BE),
        (SampleFormat::S32_LE, Format::S32LE),
        (SampleFormat::S32_BE, Format::S32BE),
    ];

    known
        .into_iter()
        .find(|(ours, _)| *ours == format)
        .map(|(_, theirs)| theirs)
}

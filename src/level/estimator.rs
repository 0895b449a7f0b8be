//! Loudness estimation over one probe buffer

use super::format::SampleFormat;

/// Full-scale reference for the decibel conversion
pub const DECIBEL_REFERENCE: f64 = 32768.0;

/// Loudness of a single probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessSample {
    /// Root of the mean squared sample value
    pub power: f64,
    /// `10 * log10(power / 32768)`, negative infinity when silent
    pub decibel: f64,
    /// True when `power` is exactly zero
    pub silent: bool,
}

impl LoudnessSample {
    pub fn from_power(power: f64) -> Self {
        if power == 0.0 {
            return Self {
                power: 0.0,
                decibel: f64::NEG_INFINITY,
                silent: true,
            };
        }

        Self {
            power,
            decibel: 10.0 * (power / DECIBEL_REFERENCE).log10(),
            silent: false,
        }
    }
}

/// Turns interleaved PCM buffers into loudness samples.
///
/// Adjacent raw samples `i` and `i + 1` are squared together over the first
/// half of the buffer, without de-interleaving channels first. For more than
/// one channel this mixes neighbouring channels into one term. Deployed
/// thresholds are tuned against this exact arithmetic, so keep it unless the
/// thresholds are re-tuned too.
#[derive(Debug, Clone, Copy)]
pub struct LevelEstimator {
    format: SampleFormat,
    channels: usize,
}

impl LevelEstimator {
    pub fn new(format: SampleFormat, channels: usize) -> Self {
        Self { format, channels }
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Measure the first `frames` frames of `buffer`
    pub fn measure(&self, buffer: &[u8], frames: usize) -> LoudnessSample {
        let width = self.format.bytes_per_sample();
        let decodable = buffer.len() / width;
        let total = frames.saturating_mul(self.channels).min(decodable);
        if total == 0 {
            return LoudnessSample::from_power(0.0);
        }

        let sample = |i: usize| self.format.decode(&buffer[i * width..(i + 1) * width]) as f64;

        let sum: f64 = (0..total / 2)
            .map(|i| {
                let a = sample(i);
                let b = sample(i + 1);
                a * a + b * b
            })
            .sum();

        LoudnessSample::from_power((sum / total as f64).sqrt())
    }
}

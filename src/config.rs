//! Configuration loading and management
//!
//! Everything is taken from positional command-line arguments once at
//! startup and never changes afterwards.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use crate::detector::{DetectorConfig, OVER_THRESH_MODULUS};
use crate::hook::HookSpec;
use crate::level::{SampleFormat, UnknownSampleFormat};

/// Frames read per probe when the format descriptor omits it
pub const DEFAULT_FRAMES_PER_PROBE: usize = 128;

/// Pause between probes when the format descriptor omits it
pub const DEFAULT_PROBE_DELAY_US: u64 = 1_000_000;

/// Upper bound on the probe buffer allocated once at startup
pub const MAX_PROBE_BUFFER_BYTES: usize = 64 * 1024 * 1024;

/// Device name that selects raw PCM on stdin instead of ALSA
pub const STDIN_DEVICE: &str = "-";

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(
    name = "silence-hook",
    version,
    about = "Run hooks when a live capture stream turns loud or goes silent"
)]
pub struct Cli {
    /// Capture device (e.g. `default`, `hw:0,0`), or `-` for raw PCM on stdin
    pub device: String,

    /// <sample-format:sample-rate:channels[:frames:probe-delay-us]>
    ///
    /// sample-format: u8, s8, s16le, s16be, s24le, s24be, s32le, s32be.
    /// frames defaults to 128, probe-delay-us to 1000000 (1s).
    #[arg(value_name = "FORMAT")]
    pub format: FormatDescriptor,

    /// Decibel threshold at or above which a probe counts as sound (e.g. 20.0)
    #[arg(value_name = "SILENCE_THRESHOLD", allow_negative_numbers = true)]
    pub threshold: f64,

    /// <sound-probes:silence-probes>, consecutive probes before a hook runs
    #[arg(value_name = "PROBE_NUM")]
    pub probes: ProbeCounts,

    /// Command run when sound is detected: program and at most one argument
    #[arg(value_name = "SOUND_DETECTED_HOOK")]
    pub on_sound: Option<String>,

    /// Command run when silence is detected: program and at most one argument
    #[arg(value_name = "SILENCE_HOOK")]
    pub on_silence: Option<String>,
}

/// Errors in command-line values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    SampleFormat(#[from] UnknownSampleFormat),

    #[error("unknown format: {0}")]
    Format(String),

    #[error("invalid {field} in format descriptor: {value}")]
    FormatField { field: &'static str, value: String },

    #[error("invalid probe_num format: {0}")]
    ProbeCounts(String),

    #[error("buffer of {frames} frames is too large (limit {MAX_PROBE_BUFFER_BYTES} bytes)")]
    BufferTooLarge { frames: usize },

    #[error("probe count {0} out of range 1..={max}", max = OVER_THRESH_MODULUS - 1)]
    ProbeCountRange(u32),

    #[error("invalid silence threshold: {0}")]
    Threshold(f64),
}

/// Parsed `<sample-format:sample-rate:channels[:frames:probe-delay-us]>`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatDescriptor {
    pub sample_format: SampleFormat,
    pub rate: u32,
    pub channels: u32,
    pub frames_per_probe: usize,
    pub probe_delay: Duration,
}

impl FromStr for FormatDescriptor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        if !(3..=5).contains(&fields.len()) {
            return Err(ConfigError::Format(s.to_string()));
        }

        let sample_format: SampleFormat = fields[0].parse()?;
        let rate = positive::<u32>("sample rate", fields[1])?;
        let channels = positive::<u32>("channels", fields[2])?;
        let frames_per_probe = match fields.get(3) {
            Some(v) => positive::<usize>("buffer frames", v)?,
            None => DEFAULT_FRAMES_PER_PROBE,
        };
        let buffer_bytes = (channels as usize)
            .checked_mul(sample_format.bytes_per_sample())
            .and_then(|frame_bytes| frame_bytes.checked_mul(frames_per_probe));
        if !matches!(buffer_bytes, Some(n) if n <= MAX_PROBE_BUFFER_BYTES) {
            return Err(ConfigError::BufferTooLarge {
                frames: frames_per_probe,
            });
        }
        let probe_delay_us = match fields.get(4) {
            Some(v) => positive::<u64>("probe delay", v)?,
            None => DEFAULT_PROBE_DELAY_US,
        };

        Ok(Self {
            sample_format,
            rate,
            channels,
            frames_per_probe,
            probe_delay: Duration::from_micros(probe_delay_us),
        })
    }
}

/// Parsed `<sound-probes:silence-probes>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeCounts {
    pub sound: u32,
    pub silence: u32,
}

impl FromStr for ProbeCounts {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sound, silence) = s
            .split_once(':')
            .ok_or_else(|| ConfigError::ProbeCounts(s.to_string()))?;

        let parse = |v: &str| -> Result<u32, ConfigError> {
            let n: u32 = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::ProbeCounts(s.to_string()))?;
            if n == 0 || n >= OVER_THRESH_MODULUS {
                return Err(ConfigError::ProbeCountRange(n));
            }
            Ok(n)
        };

        Ok(Self {
            sound: parse(sound)?,
            silence: parse(silence)?,
        })
    }
}

fn positive<T>(field: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(ConfigError::FormatField {
            field,
            value: value.to_string(),
        }),
    }
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Capture device name, or `-` for stdin
    pub device: String,
    pub format: SampleFormat,
    pub rate: u32,
    pub channels: u32,
    pub frames_per_probe: usize,
    /// Pause after every measured probe
    pub probe_delay: Duration,
    pub detector: DetectorConfig,
    pub on_sound: Option<HookSpec>,
    pub on_silence: Option<HookSpec>,
}

impl Config {
    /// Load configuration from the command line.
    ///
    /// Malformed arguments print usage and exit with a non-zero status.
    pub fn load() -> Result<Self> {
        let cli = Cli::parse();
        Ok(Self::from_cli(cli)?)
    }

    /// Validate parsed arguments into a configuration
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if !cli.threshold.is_finite() {
            return Err(ConfigError::Threshold(cli.threshold));
        }
        if cli.threshold <= 0.0 {
            warn!(
                threshold = cli.threshold,
                "non-positive silence threshold, every non-zero probe may count as sound"
            );
        }

        Ok(Self {
            device: cli.device,
            format: cli.format.sample_format,
            rate: cli.format.rate,
            channels: cli.format.channels,
            frames_per_probe: cli.format.frames_per_probe,
            probe_delay: cli.format.probe_delay,
            detector: DetectorConfig {
                decibel_threshold: cli.threshold,
                required_sound_probes: cli.probes.sound,
                required_silence_probes: cli.probes.silence,
            },
            on_sound: cli.on_sound.as_deref().and_then(HookSpec::parse),
            on_silence: cli.on_silence.as_deref().and_then(HookSpec::parse),
        })
    }

    /// Whether raw PCM should be read from stdin
    pub fn reads_stdin(&self) -> bool {
        self.device == STDIN_DEVICE
    }

    /// Bytes in one interleaved frame
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.format.bytes_per_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, String> {
        let cli = Cli::try_parse_from(std::iter::once("silence-hook").chain(args.iter().copied()))
            .map_err(|e| e.to_string())?;
        Config::from_cli(cli).map_err(|e| e.to_string())
    }

    #[test]
    fn test_config_load_with_defaults() {
        let config = parse(&["hw:0,0", "s16le:48000:2", "20.0", "3:10"]).unwrap();

        assert_eq!(config.device, "hw:0,0");
        assert_eq!(config.format, SampleFormat::S16_LE);
        assert_eq!(config.rate, 48000);
        assert_eq!(config.channels, 2);
        assert_eq!(config.frames_per_probe, DEFAULT_FRAMES_PER_PROBE);
        assert_eq!(config.probe_delay, Duration::from_secs(1));
        assert_eq!(config.detector, DetectorConfig::default());
        assert_eq!(config.on_sound, None);
        assert_eq!(config.on_silence, None);
        assert_eq!(config.frame_bytes(), 4);
        assert!(!config.reads_stdin());
    }

    #[test]
    fn test_config_full_descriptor_and_hooks() {
        let config = parse(&[
            "-",
            "s32le:44100:1:256:250000",
            "-12.5",
            "2:5",
            "systemctl start",
            "logger silence now",
        ])
        .unwrap();

        assert!(config.reads_stdin());
        assert_eq!(config.frames_per_probe, 256);
        assert_eq!(config.probe_delay, Duration::from_millis(250));
        assert_eq!(config.detector.decibel_threshold, -12.5);
        assert_eq!(config.detector.required_sound_probes, 2);
        assert_eq!(config.detector.required_silence_probes, 5);
        assert_eq!(config.on_sound.unwrap().argument.as_deref(), Some("start"));
        assert_eq!(config.on_silence.unwrap().argument.as_deref(), Some("silence"));
    }

    #[test]
    fn test_format_descriptor_rejects_bad_values() {
        assert!("s16le:48000".parse::<FormatDescriptor>().is_err());
        assert!("s16le:48000:2:128:1:9".parse::<FormatDescriptor>().is_err());
        assert!("f32le:48000:2".parse::<FormatDescriptor>().is_err());
        assert!("s16le:48000:0".parse::<FormatDescriptor>().is_err());
        assert!("s16le:48000:2:0".parse::<FormatDescriptor>().is_err());
        assert!("s16le:48000:2:128:0".parse::<FormatDescriptor>().is_err());
        assert!("s16le:abc:2".parse::<FormatDescriptor>().is_err());
    }

    #[test]
    fn test_format_descriptor_rejects_oversized_buffer() {
        assert!(matches!(
            "s16le:8000:1:18446744073709551615".parse::<FormatDescriptor>(),
            Err(ConfigError::BufferTooLarge { .. })
        ));
        assert!(matches!(
            "s32le:48000:4294967295:1024".parse::<FormatDescriptor>(),
            Err(ConfigError::BufferTooLarge { frames: 1024 })
        ));

        // exactly at the limit is accepted
        let frames = MAX_PROBE_BUFFER_BYTES / 4;
        let desc: FormatDescriptor = format!("s16le:48000:2:{frames}").parse().unwrap();
        assert_eq!(desc.frames_per_probe, frames);
    }

    #[test]
    fn test_oversized_buffer_rejected_at_startup() {
        let err = parse(&["-", "s16le:8000:1:18446744073709551615", "20", "3:10"]).unwrap_err();
        assert!(err.contains("too large"));
    }

    #[test]
    fn test_format_descriptor_four_fields() {
        let desc: FormatDescriptor = "u8:8000:1:64".parse().unwrap();
        assert_eq!(desc.frames_per_probe, 64);
        assert_eq!(desc.probe_delay, Duration::from_micros(DEFAULT_PROBE_DELAY_US));
    }

    #[test]
    fn test_probe_counts() {
        let counts: ProbeCounts = "3:10".parse().unwrap();
        assert_eq!(counts, ProbeCounts { sound: 3, silence: 10 });

        assert!("3".parse::<ProbeCounts>().is_err());
        assert!("a:b".parse::<ProbeCounts>().is_err());
        assert!(matches!(
            "0:10".parse::<ProbeCounts>(),
            Err(ConfigError::ProbeCountRange(0))
        ));
        assert!(matches!(
            "1024:10".parse::<ProbeCounts>(),
            Err(ConfigError::ProbeCountRange(1024))
        ));
    }

    #[test]
    fn test_missing_arguments_rejected() {
        assert!(parse(&["hw:0,0", "s16le:48000:2"]).is_err());
    }

    #[test]
    fn test_empty_hook_is_none() {
        let config = parse(&["default", "s16le:48000:2", "20", "3:10", ""]).unwrap();
        assert_eq!(config.on_sound, None);
    }
}

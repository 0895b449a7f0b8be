//! Level module for loudness estimation
//!
//! Decodes raw interleaved PCM into one global loudness scalar per probe,
//! expressed as power and as decibels relative to 16-bit full scale.

mod estimator;
mod format;

pub use estimator::{LevelEstimator, LoudnessSample};
pub use format::{SampleFormat, UnknownSampleFormat};

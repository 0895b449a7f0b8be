//! Detector module for sound/silence classification
//!
//! Provides a debounced state machine with two states:
//! - Silence: initial state, the input carries no real audio
//! - Sound: entered after a streak of probes at or above the threshold
//!
//! Only consecutive qualifying probes count toward a transition, and each
//! transition is reported exactly once.

mod machine;

pub use machine::{DetectorConfig, HysteresisDetector, OVER_THRESH_MODULUS};

#[cfg(test)]
pub use machine::{DetectorState, State};

//! Events module for detector transitions
//!
//! Events are edge-triggered: one is emitted at the probe where the
//! classification flips, never while a classification persists.

/// Events emitted by the hysteresis detector during transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorEvent {
    /// Enough consecutive loud probes while classified as silence
    SoundDetected,

    /// Enough consecutive quiet probes while classified as sound
    SilenceDetected,
}

impl std::fmt::Display for DetectorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorEvent::SoundDetected => write!(f, "SOUND_DETECTED"),
            DetectorEvent::SilenceDetected => write!(f, "SILENCE_DETECTED"),
        }
    }
}

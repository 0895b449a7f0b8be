//! Core hysteresis state machine
//!
//! Handles transitions between Silence and Sound based on consecutive
//! loudness probes.

use tracing::{debug, info, trace};

use crate::events::DetectorEvent;
use crate::level::LoudnessSample;

/// The sound streak counter wraps at this modulus
pub const OVER_THRESH_MODULUS: u32 = 1024;

/// The two possible classifications of the input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// No real audio on the input
    #[default]
    Silence,
    /// The input carries audio above the threshold
    Sound,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Silence => write!(f, "Silence"),
            State::Sound => write!(f, "Sound"),
        }
    }
}

/// Debounce parameters, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Probes at or above this level count toward sound
    pub decibel_threshold: f64,
    /// Consecutive loud probes needed to leave Silence
    pub required_sound_probes: u32,
    /// Consecutive quiet probes needed to leave Sound
    pub required_silence_probes: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            decibel_threshold: 20.0,
            required_sound_probes: 3,
            required_silence_probes: 10,
        }
    }
}

/// Classification plus the two streak counters.
///
/// At most one of the counters is non-zero at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectorState {
    pub state: State,
    pub over_thresh: u32,
    pub under_thresh: u32,
}

/// Debounced classifier fed once per probe
#[derive(Debug, Clone)]
pub struct HysteresisDetector {
    config: DetectorConfig,
    current: DetectorState,
}

impl HysteresisDetector {
    /// Create a detector in the Silence state with both counters at zero
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            current: DetectorState::default(),
        }
    }

    /// Get the current state
    pub fn state(&self) -> State {
        self.current.state
    }

    /// Snapshot of the state and counters
    #[cfg(test)]
    pub fn snapshot(&self) -> DetectorState {
        self.current
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Feed one probe and return the transition it caused, if any
    pub fn observe(&mut self, sample: &LoudnessSample) -> Option<DetectorEvent> {
        trace!(
            power = sample.power,
            decibel = sample.decibel,
            silent = sample.silent,
            "probe"
        );

        if self.is_loud(sample) {
            self.current.over_thresh = (self.current.over_thresh + 1) % OVER_THRESH_MODULUS;
            self.current.under_thresh = 0;

            if self.current.state == State::Silence
                && self.current.over_thresh >= self.config.required_sound_probes
            {
                return Some(self.transition_to(State::Sound));
            }
        } else {
            self.current.under_thresh = self.current.under_thresh.saturating_add(1);
            self.current.over_thresh = 0;

            if self.current.state == State::Sound
                && self.current.under_thresh >= self.config.required_silence_probes
            {
                return Some(self.transition_to(State::Silence));
            }
        }

        None
    }

    fn is_loud(&self, sample: &LoudnessSample) -> bool {
        sample.decibel >= self.config.decibel_threshold && !sample.silent
    }

    /// Perform a state transition and reset both streaks
    fn transition_to(&mut self, new_state: State) -> DetectorEvent {
        let old_state = self.current.state;

        let event = match new_state {
            State::Sound => {
                info!("input sound detected");
                DetectorEvent::SoundDetected
            }
            State::Silence => {
                info!("silence detected");
                DetectorEvent::SilenceDetected
            }
        };

        debug!(from = %old_state, to = %new_state, %event, "state transition");

        self.current = DetectorState {
            state: new_state,
            over_thresh: 0,
            under_thresh: 0,
        };

        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud(decibel: f64) -> LoudnessSample {
        LoudnessSample {
            power: 1.0,
            decibel,
            silent: false,
        }
    }

    fn silent() -> LoudnessSample {
        LoudnessSample::from_power(0.0)
    }

    fn detector(sound: u32, silence: u32) -> HysteresisDetector {
        HysteresisDetector::new(DetectorConfig {
            decibel_threshold: 20.0,
            required_sound_probes: sound,
            required_silence_probes: silence,
        })
    }

    fn feed(det: &mut HysteresisDetector, samples: &[LoudnessSample]) -> Vec<DetectorEvent> {
        samples.iter().filter_map(|s| det.observe(s)).collect()
    }

    #[test]
    fn test_initial_state() {
        let det = detector(3, 10);
        assert_eq!(det.snapshot(), DetectorState::default());
        assert_eq!(det.state(), State::Silence);
    }

    #[test]
    fn test_sound_fires_after_exact_streak() {
        let mut det = detector(3, 10);

        assert_eq!(det.observe(&loud(30.0)), None);
        assert_eq!(det.observe(&loud(30.0)), None);
        assert_eq!(det.observe(&loud(30.0)), Some(DetectorEvent::SoundDetected));
        assert_eq!(det.state(), State::Sound);
        assert_eq!(det.snapshot().over_thresh, 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut det = detector(1, 1);
        assert_eq!(det.observe(&loud(20.0)), Some(DetectorEvent::SoundDetected));
    }

    #[test]
    fn test_interruption_resets_streak() {
        let mut det = detector(3, 10);
        let quiet = loud(5.0);

        let seq = [loud(30.0), loud(30.0), quiet, loud(30.0), loud(30.0)];
        assert!(feed(&mut det, &seq).is_empty());
        assert_eq!(det.state(), State::Silence);

        assert_eq!(det.observe(&loud(30.0)), Some(DetectorEvent::SoundDetected));
    }

    #[test]
    fn test_counters_never_both_nonzero() {
        let mut det = detector(5, 5);
        let seq = [loud(30.0), silent(), loud(30.0), loud(30.0), loud(1.0), silent()];

        for s in &seq {
            det.observe(s);
            let snap = det.snapshot();
            assert!(snap.over_thresh == 0 || snap.under_thresh == 0);
        }
    }

    #[test]
    fn test_sustained_sound_fires_once() {
        let mut det = detector(3, 10);

        let events = feed(&mut det, &[loud(30.0); 10]);
        assert_eq!(events, vec![DetectorEvent::SoundDetected]);
        assert_eq!(det.state(), State::Sound);
    }

    #[test]
    fn test_over_thresh_wraps() {
        let mut det = detector(3, 10);
        feed(&mut det, &[loud(30.0); 3]);
        assert_eq!(det.state(), State::Sound);

        for _ in 0..5000 {
            det.observe(&loud(30.0));
            assert!(det.snapshot().over_thresh < OVER_THRESH_MODULUS);
        }
        // 5000 mod 1024
        assert_eq!(det.snapshot().over_thresh, 904);
    }

    #[test]
    fn test_zero_power_never_counts_as_sound() {
        let mut det = HysteresisDetector::new(DetectorConfig {
            decibel_threshold: f64::NEG_INFINITY,
            required_sound_probes: 1,
            required_silence_probes: 1,
        });

        assert_eq!(det.observe(&silent()), None);
        assert_eq!(det.state(), State::Silence);
    }

    #[test]
    fn test_round_trip_scenario() {
        let mut det = detector(3, 10);

        let events = feed(&mut det, &[loud(30.0); 3]);
        assert_eq!(events, vec![DetectorEvent::SoundDetected]);

        let events = feed(&mut det, &[silent(); 10]);
        assert_eq!(events, vec![DetectorEvent::SilenceDetected]);
        assert_eq!(det.snapshot(), DetectorState::default());
    }

    #[test]
    fn test_silence_streak_ignored_while_silent() {
        let mut det = detector(3, 2);
        assert!(feed(&mut det, &[silent(); 50]).is_empty());
        assert_eq!(det.snapshot().under_thresh, 50);
    }
}

//! Capture module for reading and probing the input stream
//!
//! Provides the capture device seam, an ALSA backend, a raw PCM reader
//! backend, and the probing loop that ties level estimation, detection
//! and hook dispatch together.

#[cfg(feature = "alsa")]
mod alsa_device;
mod device;
mod probe_loop;

#[cfg(feature = "alsa")]
pub use alsa_device::AlsaCapture;
pub use device::{CaptureError, ReaderCapture};
pub use probe_loop::CaptureLoop;

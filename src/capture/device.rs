//! Capture device abstraction
//!
//! The probing loop only needs blocking interleaved reads, a way to reset
//! the stream after a probe, and an availability query.

use std::io::{self, Read};

use tracing::debug;

/// Errors that can occur while talking to a capture device
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("cannot open audio device {device}: {message}")]
    Open { device: String, message: String },

    #[error("capture read failed: {0}")]
    Read(String),

    #[error("capture stream ended")]
    EndOfStream,

    #[error("cannot prepare capture stream: {0}")]
    Prepare(String),

    #[error("failed to spawn capture thread: {0}")]
    ThreadSpawn(String),
}

/// Result of polling how many frames the device has buffered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Ready(usize),
    /// The device asked to be polled again
    NotReady,
}

/// A source of interleaved PCM frames
pub trait CaptureDevice {
    /// Read up to `buffer.len()` bytes worth of whole frames.
    ///
    /// Returns the number of frames read. Zero is a valid transient result.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError>;

    /// Reset the stream, discarding any backlog or overrun condition
    fn prepare(&mut self) -> Result<(), CaptureError>;

    /// Query the number of frames ready to be read
    fn available(&mut self) -> Result<Availability, CaptureError>;
}

/// Capture from a raw interleaved PCM byte stream, such as stdin fed by
/// `arecord -t raw`
pub struct ReaderCapture<R> {
    reader: R,
    frame_bytes: usize,
}

impl<R: Read> ReaderCapture<R> {
    pub fn new(reader: R, frame_bytes: usize) -> Self {
        Self {
            reader,
            frame_bytes: frame_bytes.max(1),
        }
    }
}

impl<R: Read> CaptureDevice for ReaderCapture<R> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError> {
        let mut filled = 0;
        while filled < buffer.len() {
            match self.reader.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CaptureError::Read(e.to_string())),
            }
        }

        if filled == 0 && !buffer.is_empty() {
            return Err(CaptureError::EndOfStream);
        }

        if filled < buffer.len() {
            debug!(filled, "short read at end of input");
        }

        Ok(filled / self.frame_bytes)
    }

    fn prepare(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn available(&mut self) -> Result<Availability, CaptureError> {
        Ok(Availability::Ready(0))
    }
}

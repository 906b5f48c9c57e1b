//! Write Sinks
//!
//! The recorder hands every finished record to a sink, in order, and never
//! looks at the outcome. Durability is the sink's business.

use std::io::{self, Write};

use tracing::warn;

use crate::error::RecorderError;

/// Destination for recorded bytes.
pub trait WriteSink {
    /// Append `data` to the stream.
    fn write(&mut self, data: &[u8]);
}

/// In-memory stream.
impl WriteSink for Vec<u8> {
    fn write(&mut self, data: &[u8]) {
        self.extend_from_slice(data);
    }
}

impl<S: WriteSink + ?Sized> WriteSink for Box<S> {
    fn write(&mut self, data: &[u8]) {
        (**self).write(data);
    }
}

/// Adapter for a plain callback.
pub struct FnSink<F>(pub F);

impl<F: FnMut(&[u8])> WriteSink for FnSink<F> {
    fn write(&mut self, data: &[u8]) {
        (self.0)(data);
    }
}

/// Adapter for any [`io::Write`].
///
/// The first I/O error is kept and logged; later writes are dropped so the
/// file never contains a hole in the middle. The owner collects the error
/// with [`IoSink::take_error`] or [`IoSink::finish`].
pub struct IoSink<W: Write> {
    writer: W,
    error: Option<io::Error>,
    written: u64,
}

impl<W: Write> IoSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
            written: 0,
        }
    }

    /// Bytes successfully handed to the writer.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Whether a write has failed.
    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Take the stored error, if any. Writing resumes afterwards.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Flush and return the writer, or the first error seen.
    pub fn finish(mut self) -> Result<W, RecorderError> {
        if let Some(err) = self.error.take() {
            return Err(err.into());
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> WriteSink for IoSink<W> {
    fn write(&mut self, data: &[u8]) {
        if self.error.is_some() {
            return;
        }
        match self.writer.write_all(data) {
            Ok(()) => self.written += data.len() as u64,
            Err(err) => {
                warn!(target: "teehistorian", "write failed after {} bytes: {}", self.written, err);
                self.error = Some(err);
            }
        }
    }
}

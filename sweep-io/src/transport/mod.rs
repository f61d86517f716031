//! Byte sources for the stream reader.
//!
//! A source is a factory: every `open` produces a fresh blocking reader. The
//! reader thread calls it once at start and again after each end-of-stream.
//!
//! Readers follow `std::io::Read` conventions with two additions:
//! - `Ok(0)` means end of stream
//! - `ErrorKind::TimedOut` / `WouldBlock` mean "no data within the timeout"

use crate::error::Result;
use std::io::Read;

mod mock;
mod replay;
mod serial;

pub use mock::{MockEvent, MockSource};
pub use replay::ReplaySource;
pub use serial::SerialSource;

/// Blocking byte stream handed to the reader thread.
pub type ByteStream = Box<dyn Read + Send>;

/// Openable byte source.
pub trait ByteSource: Send {
    /// Human-readable identity used in logs and errors.
    fn name(&self) -> String;

    /// Open a fresh stream. Failure maps to `Error::SourceUnavailable`.
    fn open(&mut self) -> Result<ByteStream>;
}

//! SweepIO - Byte-stream front end for rotating 2D range finders
//!
//! This library turns the raw serial stream of a triangulation lidar into
//! angle/distance samples and hands them to a consumer thread.
//!
//! ## Components
//!
//! - [`FrameDecoder`]: stateful parser for the `0xAA 0x55` framed protocol
//! - [`SampleChannel`]: non-blocking FIFO between reader and consumer
//! - [`StreamReader`]: dedicated thread driving a [`ByteSource`] through the decoder
//! - [`SerialSource`], [`ReplaySource`], [`MockSource`]: byte sources

pub mod channel;
pub mod config;
pub mod error;
pub mod protocol;
pub mod reader;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use channel::SampleChannel;
pub use config::{ReplayConfig, SerialConfig, StreamReaderConfig};
pub use error::{Error, Result};
pub use protocol::{DecodeSummary, DecodedFrame, DecoderStats, FrameDecoder, encode_frame};
pub use reader::{ReaderStats, StreamReader};
pub use transport::{ByteSource, ByteStream, MockEvent, MockSource, ReplaySource, SerialSource};
pub use types::{MAX_DISTANCE, Sample};

//! Configuration for the sensor side of the pipeline.
//!
//! All structs deserialize from partial TOML tables; missing keys take the
//! defaults below.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Reader thread behavior.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamReaderConfig {
    /// Blocking read timeout; also the upper bound on stop latency
    pub read_timeout_ms: u64,
    /// Bytes requested per read call
    pub read_chunk_size: usize,
    /// Pause after the source reports end of stream
    pub closed_backoff_ms: u64,
    /// Pause after any other I/O error
    pub error_backoff_ms: u64,
    /// Consecutive reopen attempts before the reader gives up.
    /// `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
    /// Log reader statistics every N frames (0 disables)
    pub stats_interval_frames: u64,
}

impl Default for StreamReaderConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 1000,
            read_chunk_size: 512,
            closed_backoff_ms: 100,
            error_backoff_ms: 100,
            max_reconnect_attempts: None,
            stats_interval_frames: 1000,
        }
    }
}

impl StreamReaderConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn closed_backoff(&self) -> Duration {
        Duration::from_millis(self.closed_backoff_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_chunk_size == 0 {
            return Err(Error::InvalidConfig(
                "reader.read_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "reader.read_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serial port parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path (e.g. "/dev/ttyUSB0")
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 128_000,
        }
    }
}

impl SerialConfig {
    pub fn validate(&self) -> Result<()> {
        if self.port.is_empty() {
            return Err(Error::InvalidConfig("serial.port is empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(Error::InvalidConfig(
                "serial.baud_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Capture-file replay parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Raw byte capture of the sensor stream
    pub path: PathBuf,
    /// Playback rate; 0 plays back as fast as possible
    pub bytes_per_second: u32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("capture.bin"),
            // 128000 baud 8N1
            bytes_per_second: 12_800,
        }
    }
}

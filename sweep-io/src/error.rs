//! Error types for SweepIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// SweepIO error types
///
/// Resynchronization on a continuous stream is routine and never surfaces
/// here; it only shows up in the decoder statistics.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Byte source could not be opened
    #[error("Source unavailable: {source_name}: {reason}")]
    SourceUnavailable {
        /// Source identity (port path, file path, ...)
        source_name: String,
        /// Underlying failure
        reason: String,
    },

    /// Byte source reported end of stream
    #[error("Stream closed")]
    StreamClosed,

    /// Malformed or interrupted frame, decoder went back to sync seek
    #[error("Frame aborted: {0}")]
    FrameAbort(&'static str),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reader thread could not be spawned
    #[error("Failed to spawn reader thread: {0}")]
    ThreadSpawn(String),

    /// Reader thread panicked
    #[error("Reader thread panicked")]
    ThreadPanic,
}

impl Error {
    /// Build a [`Error::SourceUnavailable`] from any displayable failure.
    pub fn unavailable(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

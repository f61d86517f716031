//! Error types for SweepSLAM
//!
//! Only configuration can fail. Estimation and integration filter or ignore
//! out-of-range input instead of reporting it.

use thiserror::Error;

/// Configuration errors, raised at construction or load time
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<sweep_io::Error> for ConfigError {
    fn from(e: sweep_io::Error) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

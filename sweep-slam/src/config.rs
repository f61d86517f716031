//! Daemon configuration file.
//!
//! ```toml
//! [source]
//! kind = "serial"          # or "replay"
//!
//! [source.serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 128000
//!
//! [reader]
//! closed_backoff_ms = 100
//!
//! [grid]
//! width = 200
//! resolution = 0.05
//!
//! [estimator]
//! trials = 3000
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every table and key is optional; omitted values take their defaults.

use crate::algorithms::mapping::GridConfig;
use crate::algorithms::matching::PoseEstimatorConfig;
use crate::engine::slam::{SlamConfig, SlamEngineConfig};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sweep_io::{
    ByteSource, ReplayConfig, ReplaySource, SerialConfig, SerialSource, StreamReaderConfig,
};

/// Default config file looked up when none is given
pub const DEFAULT_CONFIG_PATH: &str = "sweep-slam.toml";

/// Where a loaded configuration came from.
///
/// `load` runs before logging is configured (the level lives in the file),
/// so callers report this once their logger is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Read from this file
    File(PathBuf),
    /// This file did not exist; built-in defaults are in use
    Defaults(PathBuf),
}

impl ConfigOrigin {
    /// Log the origin: info for a file, warning for the defaults fallback.
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => log::info!("Loaded config from {}", path.display()),
            ConfigOrigin::Defaults(path) => {
                log::warn!("Config {} not found, using defaults", path.display())
            }
        }
    }
}

/// Which byte source feeds the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Serial,
    Replay,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub serial: SerialConfig,
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter (trace, debug, info, warn, error); `RUST_LOG` wins
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Engine tick period
    pub tick_ms: u64,
    /// Log pose and map counts every N ticks (0 disables)
    pub status_interval_ticks: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            status_interval_ticks: 50,
        }
    }
}

impl RuntimeConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub reader: StreamReaderConfig,
    pub grid: GridConfig,
    pub estimator: PoseEstimatorConfig,
    pub engine: SlamEngineConfig,
    pub logging: LoggingConfig,
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load `path` (or [`DEFAULT_CONFIG_PATH`]), falling back to defaults
    /// when the file does not exist. Unreadable, unparsable or invalid files
    /// are errors.
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigOrigin)> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = Self::from_toml(&contents)?;
                Ok((config, ConfigOrigin::File(path.to_path_buf())))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Ok((Self::default(), ConfigOrigin::Defaults(path.to_path_buf())))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.reader.validate()?;
        match self.source.kind {
            SourceKind::Serial => self.source.serial.validate()?,
            SourceKind::Replay => {
                if self.source.replay.path.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid("source.replay.path is empty".to_string()));
                }
            }
        }
        self.grid.validate()?;
        self.estimator.validate()?;
        self.engine.validate()?;
        if self.runtime.tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "runtime.tick_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Grid, estimator and engine sections as one engine config.
    pub fn slam_config(&self) -> SlamConfig {
        SlamConfig {
            grid: self.grid.clone(),
            estimator: self.estimator.clone(),
            engine: self.engine.clone(),
        }
    }

    /// Byte source selected by `[source]`.
    pub fn byte_source(&self) -> Box<dyn ByteSource> {
        match self.source.kind {
            SourceKind::Serial => Box::new(SerialSource::new(
                self.source.serial.clone(),
                self.reader.read_timeout(),
            )),
            SourceKind::Replay => Box::new(ReplaySource::new(self.source.replay.clone())),
        }
    }
}

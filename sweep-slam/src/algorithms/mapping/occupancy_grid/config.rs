//! Occupancy grid configuration.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};

/// Confidence value of a cell on its first observation, before the delta.
pub const BASELINE_CONFIDENCE: u16 = 32768;

/// Three-band cell classification exposed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellState {
    /// Never observed, or confidence between the two thresholds
    #[default]
    Unknown,
    /// Confidence below the free threshold
    Free,
    /// Confidence above the occupied threshold
    Occupied,
}

impl CellState {
    /// Display byte: free 0, unknown 127, occupied 255.
    #[inline]
    pub fn as_byte(self) -> u8 {
        match self {
            CellState::Free => 0,
            CellState::Unknown => 127,
            CellState::Occupied => 255,
        }
    }
}

/// Configuration for occupancy grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Width in cells.
    pub width: usize,

    /// Height in cells.
    pub height: usize,

    /// Cell size in meters.
    pub resolution: f32,

    /// Confidence added per hit (saturates at 65535).
    pub hit_increment: u16,

    /// Confidence removed per miss (saturates at 0).
    ///
    /// Smaller than the hit increment so one clearing pass does not erase a
    /// confirmed obstacle.
    pub miss_decrement: u16,

    /// Cells strictly above this display as occupied.
    pub occupied_threshold: u16,

    /// Cells strictly below this display as free.
    pub free_threshold: u16,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            resolution: 0.05, // 5cm cells, 10m x 10m
            hit_increment: 2000,
            miss_decrement: 500,
            occupied_threshold: 45000,
            free_threshold: 20000,
        }
    }
}

impl GridConfig {
    /// Grid covering `width_m` x `height_m` meters at `resolution`.
    pub fn for_area(width_m: f32, height_m: f32, resolution: f32) -> Self {
        Self {
            width: (width_m / resolution).ceil().max(0.0) as usize,
            height: (height_m / resolution).ceil().max(0.0) as usize,
            resolution,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        // Cell coordinates are i32 and the cell vectors are indexed by usize
        let coords_fit = i32::try_from(self.width).is_ok() && i32::try_from(self.height).is_ok();
        if !coords_fit || self.width.checked_mul(self.height).is_none() {
            return Err(ConfigError::Invalid(format!(
                "grid dimensions {}x{} are too large",
                self.width, self.height
            )));
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "grid resolution must be positive, got {}",
                self.resolution
            )));
        }
        if self.free_threshold > self.occupied_threshold {
            return Err(ConfigError::Invalid(format!(
                "free_threshold {} exceeds occupied_threshold {}",
                self.free_threshold, self.occupied_threshold
            )));
        }
        Ok(())
    }

    /// Display band for a confidence value.
    #[inline]
    pub fn classify(&self, confidence: u16) -> CellState {
        if confidence > self.occupied_threshold {
            CellState::Occupied
        } else if confidence < self.free_threshold {
            CellState::Free
        } else {
            CellState::Unknown
        }
    }

    /// Map extent in meters.
    pub fn extent(&self) -> (f32, f32) {
        (
            self.width as f32 * self.resolution,
            self.height as f32 * self.resolution,
        )
    }
}

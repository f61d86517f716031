//! SLAM engine.
//!
//! Per processed batch:
//!
//! ```text
//! SampleChannel ──drain──▶ batch ──▶ PoseEstimator ──pose──▶ OccupancyGrid::integrate
//!                                        ▲                          │
//!                                        └──────── reads ───────────┘
//! ```
//!
//! The engine owns the grid and the current pose and is the only writer of
//! either. It never blocks: an empty channel yields an update with no
//! estimate and leaves the map untouched.

use crate::algorithms::mapping::{DisplaySnapshot, GridConfig, OccupancyGrid};
use crate::algorithms::matching::{PoseEstimate, PoseEstimator, PoseEstimatorConfig};
use crate::core::math::angle_diff;
use crate::core::types::Pose2D;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use sweep_io::{Sample, SampleChannel};

/// Engine cadence parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlamEngineConfig {
    /// Maximum samples drained per `process` call.
    pub batch_limit: usize,
}

impl Default for SlamEngineConfig {
    fn default() -> Self {
        Self { batch_limit: 2000 }
    }
}

impl SlamEngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_limit == 0 {
            return Err(ConfigError::Invalid(
                "engine.batch_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything needed to build a [`SlamEngine`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlamConfig {
    pub grid: GridConfig,
    pub estimator: PoseEstimatorConfig,
    pub engine: SlamEngineConfig,
}

/// Result of one `process` call.
#[derive(Debug, Clone)]
pub struct SlamUpdate {
    /// Current pose after the batch
    pub pose: Pose2D,
    /// The batch itself, for point-cloud rendering
    pub samples: Vec<Sample>,
    /// Search outcome; `None` for an empty batch
    pub estimate: Option<PoseEstimate>,
}

/// Pose estimation plus grid integration over drained sample batches.
pub struct SlamEngine {
    config: SlamEngineConfig,
    grid: OccupancyGrid,
    estimator: PoseEstimator,
    pose: Pose2D,
    batches: u64,
}

impl SlamEngine {
    /// Validate the configuration and start at the grid center.
    pub fn new(config: SlamConfig) -> Result<Self> {
        config.engine.validate()?;
        let grid = OccupancyGrid::new(config.grid)?;
        let estimator = PoseEstimator::new(config.estimator)?;
        let pose = grid.initial_pose();

        log::info!(
            "SLAM engine ready: {}x{} grid at {}m, initial pose ({:.2}, {:.2})",
            grid.width(),
            grid.height(),
            grid.resolution(),
            pose.x,
            pose.y
        );

        Ok(Self {
            config: config.engine,
            grid,
            estimator,
            pose,
            batches: 0,
        })
    }

    /// Drain up to `batch_limit` samples and process them.
    pub fn process(&mut self, channel: &SampleChannel) -> SlamUpdate {
        let batch = channel.drain_up_to(self.config.batch_limit);
        self.process_batch(batch)
    }

    /// Estimate the pose for `samples`, then integrate them at that pose.
    pub fn process_batch(&mut self, samples: Vec<Sample>) -> SlamUpdate {
        if samples.is_empty() {
            return SlamUpdate {
                pose: self.pose,
                samples,
                estimate: None,
            };
        }

        let estimate = self.estimator.estimate(&samples, &self.pose, &self.grid);
        let previous = self.pose;
        self.pose = estimate.pose;
        self.grid.integrate(&samples, &self.pose);
        self.batches += 1;

        log::trace!(
            "Batch {}: {} samples, moved ({:+.3}, {:+.3}, {:+.3}), score {:.1}{}",
            self.batches,
            samples.len(),
            self.pose.x - previous.x,
            self.pose.y - previous.y,
            angle_diff(previous.theta, self.pose.theta),
            estimate.score,
            if estimate.bootstrapped { " (bootstrap)" } else { "" }
        );

        SlamUpdate {
            pose: self.pose,
            samples,
            estimate: Some(estimate),
        }
    }

    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// Display bands for renderers.
    pub fn snapshot(&self) -> DisplaySnapshot {
        self.grid.snapshot()
    }

    /// Batches processed since construction or the last reset.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Clear the map and return to the initial pose.
    pub fn reset(&mut self) {
        self.grid.reset();
        self.pose = self.grid.initial_pose();
        self.batches = 0;
        log::info!("SLAM engine reset");
    }
}

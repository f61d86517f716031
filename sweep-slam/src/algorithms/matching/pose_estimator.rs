//! Randomized pose search against the occupancy grid.
//!
//! # Algorithm
//!
//! 1. Skip estimation while the cell under the prior pose is unobserved
//!    (bootstrap: nothing to match against yet)
//! 2. Score the prior pose itself
//! 3. Draw `trials - 1` random offsets uniformly from the search window
//!    around the prior and score each candidate
//! 4. Return the first candidate with the strictly highest score
//!
//! Scoring projects every `sample_step`-th in-range sample from the
//! candidate pose and reads the target cell:
//!
//! ```text
//! confidence > occupied_score_threshold  =>  +hit_score
//! confidence < free_score_threshold      =>  -free_penalty
//! otherwise, unobserved or off-grid      =>   0
//! ```
//!
//! This is a coarse correlation search, not a least-squares optimizer. The
//! result is quantized by the random draws and never better than the best
//! sampled candidate.

use crate::algorithms::mapping::OccupancyGrid;
use crate::core::types::Pose2D;
use crate::error::{ConfigError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sweep_io::Sample;

/// Configuration for the randomized pose search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseEstimatorConfig {
    /// Candidates evaluated per estimate, including the prior.
    pub trials: usize,

    /// Full translation window in cells; offsets span ± half of it.
    pub search_window_cells: f32,

    /// Full rotation window in radians; offsets span ± half of it.
    pub angle_window: f32,

    /// Score every N-th sample.
    pub sample_step: usize,

    /// Samples at or below this range (meters) are not scored.
    pub min_range: f32,

    /// Samples beyond this range (meters) are not scored.
    pub max_range: f32,

    /// Confidence above which a target cell counts as a hit.
    pub occupied_score_threshold: u16,

    /// Confidence below which a target cell counts against the candidate.
    pub free_score_threshold: u16,

    /// Reward per sample landing on an occupied cell.
    pub hit_score: f32,

    /// Penalty per sample landing on a free cell.
    pub free_penalty: f32,

    /// Fixed RNG seed for reproducible searches. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for PoseEstimatorConfig {
    fn default() -> Self {
        Self {
            trials: 3000,
            search_window_cells: 20.0, // ±10 cells
            angle_window: 0.2,         // ±0.1 rad
            sample_step: 2,
            min_range: 0.1,
            max_range: 10.0,
            occupied_score_threshold: 40000,
            free_score_threshold: 20000,
            hit_score: 1.0,
            free_penalty: 0.5,
            seed: None,
        }
    }
}

impl PoseEstimatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(ConfigError::Invalid(
                "estimator.trials must be at least 1".to_string(),
            ));
        }
        if self.sample_step == 0 {
            return Err(ConfigError::Invalid(
                "estimator.sample_step must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("search_window_cells", self.search_window_cells),
            ("angle_window", self.angle_window),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "estimator.{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        if !(self.min_range < self.max_range) {
            return Err(ConfigError::Invalid(format!(
                "estimator.min_range {} must be below max_range {}",
                self.min_range, self.max_range
            )));
        }
        if self.free_score_threshold > self.occupied_score_threshold {
            return Err(ConfigError::Invalid(format!(
                "estimator.free_score_threshold {} exceeds occupied_score_threshold {}",
                self.free_score_threshold, self.occupied_score_threshold
            )));
        }
        Ok(())
    }
}

/// Outcome of one estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseEstimate {
    /// Winning pose (the prior when bootstrapped)
    pub pose: Pose2D,
    /// Score of the winning pose (0 when bootstrapped)
    pub score: f32,
    /// True when the search was skipped because the pose cell is unobserved
    pub bootstrapped: bool,
}

/// Randomized local pose search.
///
/// Reads the grid, never mutates it.
pub struct PoseEstimator {
    config: PoseEstimatorConfig,
    rng: StdRng,
}

impl PoseEstimator {
    pub fn new(config: PoseEstimatorConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &PoseEstimatorConfig {
        &self.config
    }

    /// Search for the pose that best explains `samples` against `grid`.
    pub fn estimate(
        &mut self,
        samples: &[Sample],
        prior: &Pose2D,
        grid: &OccupancyGrid,
    ) -> PoseEstimate {
        let (px, py) = grid.world_to_cell_signed(prior.x, prior.y);
        if !grid.is_touched(px, py) {
            log::debug!(
                "Pose cell ({}, {}) unobserved, keeping prior ({:.3}, {:.3}, {:.3})",
                px,
                py,
                prior.x,
                prior.y,
                prior.theta
            );
            return PoseEstimate {
                pose: *prior,
                score: 0.0,
                bootstrapped: true,
            };
        }

        let linear_window = grid.resolution() * self.config.search_window_cells;
        let angle_window = self.config.angle_window;

        let mut best_pose = *prior;
        let mut best_score = self.score(samples, prior, grid);

        for _ in 1..self.config.trials {
            let dx = (self.rng.random::<f32>() - 0.5) * linear_window;
            let dy = (self.rng.random::<f32>() - 0.5) * linear_window;
            let dtheta = (self.rng.random::<f32>() - 0.5) * angle_window;

            let candidate = prior.offset(dx, dy, dtheta);
            let score = self.score(samples, &candidate, grid);
            if score > best_score {
                best_score = score;
                best_pose = candidate;
            }
        }

        log::debug!(
            "Estimated pose ({:.3}, {:.3}, {:.3}) score {:.1} over {} trials",
            best_pose.x,
            best_pose.y,
            best_pose.theta,
            best_score,
            self.config.trials
        );

        PoseEstimate {
            pose: best_pose,
            score: best_score,
            bootstrapped: false,
        }
    }

    /// Match score of a single candidate pose.
    pub fn score(&self, samples: &[Sample], pose: &Pose2D, grid: &OccupancyGrid) -> f32 {
        let mut score = 0.0;

        for sample in samples.iter().step_by(self.config.sample_step) {
            let range = sample.distance();
            if range <= self.config.min_range || range > self.config.max_range {
                continue;
            }

            let hit = pose.project(sample);
            let (cx, cy) = grid.world_to_cell_signed(hit.x, hit.y);
            let Some(confidence) = grid.confidence_signed(cx, cy) else {
                continue;
            };

            if confidence > self.config.occupied_score_threshold {
                score += self.config.hit_score;
            } else if confidence < self.config.free_score_threshold {
                score -= self.config.free_penalty;
            }
        }

        score
    }
}

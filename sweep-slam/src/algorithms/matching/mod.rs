//! Pose estimation against the occupancy grid.
//!
//! - [`PoseEstimator`]: randomized local search scoring candidate poses by
//!   how many samples land on occupied cells

mod pose_estimator;

pub use pose_estimator::{PoseEstimate, PoseEstimator, PoseEstimatorConfig};

//! Geometric types shared by mapping and matching.

mod pose;

pub use pose::{Point2D, Pose2D};

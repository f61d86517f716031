//! Pose and point types for 2D SLAM.

use serde::{Deserialize, Serialize};
use sweep_io::Sample;

/// A 2D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters
    pub y: f32,
}

impl Point2D {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Sensor pose in the map frame.
///
/// Position (x, y) in meters and heading (theta) in radians, normalized to
/// [-π, π].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters
    pub x: f32,
    /// Y position in meters
    pub y: f32,
    /// Heading in radians, normalized to [-π, π]
    pub theta: f32,
}

impl Pose2D {
    /// Create a new pose with theta normalized to [-π, π].
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: crate::core::math::normalize_angle(theta),
        }
    }

    #[inline]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// This pose shifted by a map-frame translation and a rotation.
    #[inline]
    pub fn offset(&self, dx: f32, dy: f32, dtheta: f32) -> Pose2D {
        Pose2D::new(self.x + dx, self.y + dy, self.theta + dtheta)
    }

    /// Map-frame endpoint of a range sample taken from this pose.
    ///
    /// ```text
    /// x = pose.x + d * cos(pose.θ + angle)
    /// y = pose.y + d * sin(pose.θ + angle)
    /// ```
    #[inline]
    pub fn project(&self, sample: &Sample) -> Point2D {
        let (sin_a, cos_a) = (self.theta + sample.angle()).sin_cos();
        Point2D::new(
            self.x + sample.distance() * cos_a,
            self.y + sample.distance() * sin_a,
        )
    }
}

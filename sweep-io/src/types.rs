//! Decoded measurement types.

use std::f32::consts::TAU;

/// Longest distance the wire format can express (`u16::MAX / 4` mm), in meters.
pub const MAX_DISTANCE: f32 = u16::MAX as f32 / 4.0 / 1000.0;

/// A single angle/distance measurement.
///
/// Only constructible through [`Sample::new`], which rejects non-finite
/// distances and those outside `(0, MAX_DISTANCE]`, and reduces the angle
/// into `[0, 2π)`. Fields are
/// read-only once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    angle: f32,
    distance: f32,
}

impl Sample {
    /// Create a sample from an angle (radians, any range) and a distance
    /// (meters). Returns `None` for distances that are not strictly positive,
    /// not finite, or beyond [`MAX_DISTANCE`].
    pub fn new(angle: f32, distance: f32) -> Option<Self> {
        if !angle.is_finite()
            || !distance.is_finite()
            || distance <= 0.0
            || distance > MAX_DISTANCE
        {
            return None;
        }
        Some(Self {
            angle: wrap_to_tau(angle),
            distance,
        })
    }

    /// Beam angle in radians, in `[0, 2π)`.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Measured distance in meters, in `(0, MAX_DISTANCE]`.
    #[inline]
    pub fn distance(&self) -> f32 {
        self.distance
    }
}

/// Reduce an angle into `[0, 2π)`.
#[inline]
pub fn wrap_to_tau(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn test_rejects_non_positive_distance() {
        assert!(Sample::new(0.0, 0.0).is_none());
        assert!(Sample::new(1.0, -0.5).is_none());
        assert!(Sample::new(1.0, f32::NAN).is_none());
        assert!(Sample::new(f32::INFINITY, 1.0).is_none());
    }

    #[test]
    fn test_rejects_distance_beyond_wire_range() {
        assert!(Sample::new(0.0, 1.0e9).is_none());
        assert!(Sample::new(0.0, MAX_DISTANCE + 0.01).is_none());
        assert!(Sample::new(0.0, MAX_DISTANCE).is_some());
        assert_relative_eq!(MAX_DISTANCE, 16.38375, epsilon = 1e-4);
    }

    #[test]
    fn test_angle_is_wrapped() {
        let s = Sample::new(-PI / 2.0, 1.0).unwrap();
        assert_relative_eq!(s.angle(), 1.5 * PI, epsilon = 1e-5);

        let s = Sample::new(TAU + 0.25, 1.0).unwrap();
        assert_relative_eq!(s.angle(), 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_wrap_never_returns_tau() {
        let a = wrap_to_tau(-1e-9);
        assert!((0.0..TAU).contains(&a));
    }
}

//! Core SLAM algorithms layer.
//!
//! # Contents
//!
//! - [`mapping`]: Occupancy grid and ray tracing
//! - [`matching`]: Randomized pose search

pub mod mapping;
pub mod matching;

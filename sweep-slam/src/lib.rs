//! SweepSLAM - Minimal 2D SLAM front end for rotating range finders
//!
//! # Architecture
//!
//! The crate is organized into 3 logical layers on top of `sweep-io`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │        (SlamEngine: drain, estimate, integrate)     │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │     (matching: PoseEstimator, mapping: grid)        │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Samples arrive through a [`sweep_io::SampleChannel`] filled by a
//! [`sweep_io::StreamReader`] thread. Each engine tick drains a batch,
//! searches for the pose that best explains it against the current map and
//! then folds the batch into the map at that pose.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Algorithms (depends on core)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 3: SLAM engine (depends on core, algorithms)
// ============================================================================
pub mod engine;

pub mod config;
pub mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use core::math;
pub use core::types::{Point2D, Pose2D};

// Algorithms - Matching
pub use algorithms::matching::{PoseEstimate, PoseEstimator, PoseEstimatorConfig};

// Algorithms - Mapping
pub use algorithms::mapping::{
    CellCounts, CellState, DisplaySnapshot, GridConfig, OccupancyGrid,
};

// Engine - SLAM
pub use engine::slam::{SlamConfig, SlamEngine, SlamEngineConfig, SlamUpdate};

// Configuration
pub use config::{AppConfig, ConfigOrigin};
pub use error::{ConfigError, Result};

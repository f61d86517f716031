//! Mapping module.
//!
//! Probabilistic occupancy grid built from ray-cast range samples.
//!
//! # Components
//!
//! - [`OccupancyGrid`]: fixed-size grid of 16-bit confidence counters
//! - [`BresenhamLine`]: cell traversal for ray casting
//! - [`DisplaySnapshot`]: three-band quantization for renderers
//!
//! # Example
//!
//! ```
//! use sweep_slam::algorithms::mapping::{GridConfig, OccupancyGrid};
//! use sweep_io::Sample;
//!
//! let mut grid = OccupancyGrid::new(GridConfig::default()).unwrap();
//! let pose = grid.initial_pose();
//! let samples = vec![Sample::new(0.0, 2.0).unwrap()];
//!
//! grid.integrate(&samples, &pose);
//! let bytes = grid.snapshot().to_bytes();
//! assert_eq!(bytes.len(), 200 * 200);
//! ```

mod occupancy_grid;
mod ray_tracer;

pub use occupancy_grid::{
    BASELINE_CONFIDENCE, CellCounts, CellState, DisplaySnapshot, GridConfig, OccupancyGrid,
};
pub use ray_tracer::{BresenhamLine, cells_excluding_end};

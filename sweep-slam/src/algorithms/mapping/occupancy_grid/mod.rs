//! Occupancy grid map with 16-bit confidence counters.
//!
//! Each cell holds `Option<u16>`: `None` until the first observation, then a
//! confidence in `[0, 65535]` seeded at [`BASELINE_CONFIDENCE`].
//!
//! ```text
//! hit:  c = min(c + hit_increment, 65535)
//! miss: c = max(c - miss_decrement, 0)
//! ```
//!
//! This is a clamped log-odds-style filter. The hit increment is larger
//! than the miss decrement, so obstacles confirm faster than they clear.
//!
//! Cell (0, 0) covers world `[0, resolution)²`; cell indices are
//! `floor(world / resolution)`.

mod config;
mod snapshot;

pub use config::{BASELINE_CONFIDENCE, CellState, GridConfig};
pub use snapshot::{CellCounts, DisplaySnapshot};

use super::ray_tracer::{BresenhamLine, cells_excluding_end};
use crate::core::types::{Point2D, Pose2D};
use crate::error::Result;
use sweep_io::Sample;

/// Fixed-size 2D occupancy grid.
///
/// Dimensions and resolution are fixed at construction.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    config: GridConfig,

    /// Row-major confidence: index = y * width + x
    cells: Vec<Option<u16>>,

    /// Display band per cell, refreshed on every update
    display: Vec<CellState>,
}

impl OccupancyGrid {
    /// Create an all-never-touched grid.
    pub fn new(config: GridConfig) -> Result<Self> {
        config.validate()?;
        // validate rejects dimensions whose product overflows
        let len = config.width * config.height;

        log::debug!(
            "Occupancy grid {}x{} cells at {}m ({:.1}m x {:.1}m)",
            config.width,
            config.height,
            config.resolution,
            config.extent().0,
            config.extent().1
        );

        Ok(Self {
            config,
            cells: vec![None; len],
            display: vec![CellState::Unknown; len],
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn width(&self) -> usize {
        self.config.width
    }

    pub fn height(&self) -> usize {
        self.config.height
    }

    pub fn resolution(&self) -> f32 {
        self.config.resolution
    }

    /// Pose at the geometric center of the grid, heading 0.
    pub fn initial_pose(&self) -> Pose2D {
        let (w, h) = self.config.extent();
        Pose2D::new(w / 2.0, h / 2.0, 0.0)
    }

    /// Convert world coordinates to cell indices.
    ///
    /// Returns `None` if outside grid bounds.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let (cx, cy) = self.world_to_cell_signed(x, y);
        self.is_valid_cell(cx, cy)
            .then_some((cx as usize, cy as usize))
    }

    /// Convert world coordinates to cell indices, unbounded.
    #[inline]
    pub fn world_to_cell_signed(&self, x: f32, y: f32) -> (i32, i32) {
        let cx = (x / self.config.resolution).floor() as i32;
        let cy = (y / self.config.resolution).floor() as i32;
        (cx, cy)
    }

    /// World coordinates of a cell center.
    #[inline]
    pub fn cell_to_world(&self, cx: usize, cy: usize) -> Point2D {
        Point2D::new(
            (cx as f32 + 0.5) * self.config.resolution,
            (cy as f32 + 0.5) * self.config.resolution,
        )
    }

    #[inline]
    pub fn is_valid_cell(&self, cx: i32, cy: i32) -> bool {
        cx >= 0 && cy >= 0 && (cx as usize) < self.config.width && (cy as usize) < self.config.height
    }

    #[inline]
    fn index(&self, cx: i32, cy: i32) -> Option<usize> {
        self.is_valid_cell(cx, cy)
            .then(|| cy as usize * self.config.width + cx as usize)
    }

    /// Confidence of a cell; `None` when never touched or out of bounds.
    #[inline]
    pub fn confidence(&self, cx: usize, cy: usize) -> Option<u16> {
        if cx < self.config.width && cy < self.config.height {
            self.cells[cy * self.config.width + cx]
        } else {
            None
        }
    }

    /// Confidence at signed indices; `None` when never touched or out of bounds.
    #[inline]
    pub fn confidence_signed(&self, cx: i32, cy: i32) -> Option<u16> {
        self.index(cx, cy).and_then(|i| self.cells[i])
    }

    /// Whether the cell has been observed at least once.
    #[inline]
    pub fn is_touched(&self, cx: i32, cy: i32) -> bool {
        self.confidence_signed(cx, cy).is_some()
    }

    /// Display band of a cell. Out of bounds reads as unknown.
    pub fn state(&self, cx: usize, cy: usize) -> CellState {
        if cx < self.config.width && cy < self.config.height {
            self.display[cy * self.config.width + cx]
        } else {
            CellState::Unknown
        }
    }

    /// Apply one hit or miss observation.
    ///
    /// Returns false (and changes nothing) for cells outside the grid.
    #[inline]
    pub fn update_cell(&mut self, cx: i32, cy: i32, hit: bool) -> bool {
        let Some(idx) = self.index(cx, cy) else {
            return false;
        };

        let current = self.cells[idx].unwrap_or(BASELINE_CONFIDENCE);
        let updated = if hit {
            current.saturating_add(self.config.hit_increment)
        } else {
            current.saturating_sub(self.config.miss_decrement)
        };

        self.cells[idx] = Some(updated);
        self.display[idx] = self.config.classify(updated);
        true
    }

    /// Ray-cast a batch of samples taken at `pose` into the grid.
    ///
    /// For each sample, every cell on the line from the pose cell up to (not
    /// including) the hit cell takes a miss, and the hit cell takes a hit.
    /// Cells outside the grid are skipped. A ray whose hit lies off the grid
    /// is traced no further than the grid's larger side.
    pub fn integrate(&mut self, samples: &[Sample], pose: &Pose2D) {
        let origin = self.world_to_cell_signed(pose.x, pose.y);
        let reach_limit =
            self.config.width.max(self.config.height) as f32 * self.config.resolution;
        let mut hits = 0usize;
        let mut misses = 0usize;

        for sample in samples {
            let end_point = pose.project(sample);
            let end = self.world_to_cell_signed(end_point.x, end_point.y);

            if !self.is_valid_cell(end.0, end.1) {
                let edge = self.clip_reach(pose, &end_point, reach_limit);
                for (x, y) in BresenhamLine::new(origin, edge) {
                    if self.update_cell(x, y, false) {
                        misses += 1;
                    }
                }
                continue;
            }

            for (x, y) in cells_excluding_end(origin, end) {
                if self.update_cell(x, y, false) {
                    misses += 1;
                }
            }
            if self.update_cell(end.0, end.1, true) {
                hits += 1;
            }
        }

        log::trace!(
            "Integrated {} samples: {} hits, {} misses",
            samples.len(),
            hits,
            misses
        );
    }

    /// Cell of `end`, pulled back toward `pose` so that neither axis spans
    /// more than `limit` meters.
    fn clip_reach(&self, pose: &Pose2D, end: &Point2D, limit: f32) -> (i32, i32) {
        let (dx, dy) = (end.x - pose.x, end.y - pose.y);
        let reach = dx.abs().max(dy.abs());
        if reach <= limit {
            return self.world_to_cell_signed(end.x, end.y);
        }
        let scale = limit / reach;
        self.world_to_cell_signed(pose.x + dx * scale, pose.y + dy * scale)
    }

    /// Copy of the display bands.
    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot::new(self.config.width, self.config.height, self.display.clone())
    }

    /// Totals per display band.
    pub fn counts(&self) -> CellCounts {
        let mut counts = CellCounts::default();
        for (cell, state) in self.cells.iter().zip(&self.display) {
            match state {
                CellState::Free => counts.free += 1,
                CellState::Occupied => counts.occupied += 1,
                CellState::Unknown => {
                    counts.unknown += 1;
                    if cell.is_none() {
                        counts.untouched += 1;
                    }
                }
            }
        }
        counts
    }

    /// Forget every observation.
    pub fn reset(&mut self) {
        self.cells.fill(None);
        self.display.fill(CellState::Unknown);
    }
}

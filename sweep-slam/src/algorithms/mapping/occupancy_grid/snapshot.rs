//! Display quantization of the grid for renderers.

use super::CellState;

/// Read-only copy of every cell's display band, row-major (`y * width + x`).
///
/// Derived from the grid; modifying the grid afterwards does not affect an
/// existing snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySnapshot {
    width: usize,
    height: usize,
    cells: Vec<CellState>,
}

/// Totals per display band, plus cells never touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellCounts {
    pub free: usize,
    pub unknown: usize,
    pub occupied: usize,
    /// Subset of `unknown` that was never observed
    pub untouched: usize,
}

impl DisplaySnapshot {
    pub(crate) fn new(width: usize, height: usize, cells: Vec<CellState>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Band of one cell, `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<CellState> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// One byte per cell: free 0, unknown 127, occupied 255.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.as_byte()).collect()
    }

    /// Number of cells in the given band.
    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&c| c == state).count()
    }
}

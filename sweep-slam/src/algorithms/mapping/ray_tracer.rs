//! Bresenham ray tracing over grid cells.
//!
//! A range sample says every cell between the sensor and the hit is empty
//! and the hit cell is occupied. [`BresenhamLine`] walks the discrete cells
//! along that segment, integer-only, in all eight octants.

/// Bresenham's line algorithm iterator.
///
/// Yields every cell from `start` to `end`, both inclusive, in order. The
/// first item is always `start` and the last is always `end`.
#[derive(Debug, Clone)]
pub struct BresenhamLine {
    x: i32,
    y: i32,
    end_x: i32,
    end_y: i32,
    dx: i64,
    dy: i64,
    step_x: i32,
    step_y: i32,
    // Wide enough that `2 * error` holds for any pair of i32 endpoints
    error: i64,
    done: bool,
}

impl BresenhamLine {
    pub fn new(start: (i32, i32), end: (i32, i32)) -> Self {
        let dx = (i64::from(end.0) - i64::from(start.0)).abs();
        // Kept negative so one error term covers every octant
        let dy = -(i64::from(end.1) - i64::from(start.1)).abs();

        Self {
            x: start.0,
            y: start.1,
            end_x: end.0,
            end_y: end.1,
            dx,
            dy,
            step_x: if start.0 < end.0 { 1 } else { -1 },
            step_y: if start.1 < end.1 { 1 } else { -1 },
            error: dx + dy,
            done: false,
        }
    }
}

impl Iterator for BresenhamLine {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let current = (self.x, self.y);
        if self.x == self.end_x && self.y == self.end_y {
            self.done = true;
            return Some(current);
        }

        let e2 = 2 * self.error;
        if e2 >= self.dy {
            self.error += self.dy;
            self.x += self.step_x;
        }
        if e2 <= self.dx {
            self.error += self.dx;
            self.y += self.step_y;
        }

        Some(current)
    }
}

/// Cells strictly before `end` on the line from `start`.
pub fn cells_excluding_end(start: (i32, i32), end: (i32, i32)) -> impl Iterator<Item = (i32, i32)> {
    BresenhamLine::new(start, end).take_while(move |&cell| cell != end)
}

//! Fixed-size spatial accumulator
//!
//! Each cell holds the relative timestamp of the last paint event, in arrival
//! order, whose mapped rectangle covered it. `0` marks a cell never painted.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vc_types::{GridBounds, Rect, Viewport};

/// Cell value of a never-painted sector
pub const UNUSED_SECTOR: i64 = 0;

/// A write addressed a cell outside the grid
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Heatmap write out of bounds at row {row}, column {col}")]
pub struct GridWriteError {
    pub row: usize,
    pub col: usize,
}

/// A heatmap row list was not square
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Heatmap row {row} has {len} cells, expected {expected}")]
pub struct RaggedHeatmap {
    pub row: usize,
    pub len: usize,
    pub expected: usize,
}

/// Square grid of last-paint timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i64>>", into = "Vec<Vec<i64>>")]
pub struct Heatmap {
    size: usize,
    cells: Vec<i64>,
}

impl Heatmap {
    /// Create an unpainted `size x size` grid
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![UNUSED_SECTOR; size * size],
        }
    }

    /// Side length
    pub fn size(&self) -> usize {
        self.size
    }

    /// Cell value, `None` outside the grid
    pub fn get(&self, row: usize, col: usize) -> Option<i64> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells.get(row * self.size + col).copied()
    }

    /// All cells, row-major
    pub fn cells(&self) -> &[i64] {
        &self.cells
    }

    /// Cells as a list of rows
    pub fn rows(&self) -> Vec<Vec<i64>> {
        if self.size == 0 {
            return Vec::new();
        }
        self.cells.chunks(self.size).map(<[i64]>::to_vec).collect()
    }

    /// Map a viewport rectangle onto grid cells
    ///
    /// Lower edges are floored, upper edges ceiled, then all four are clamped
    /// into `[0, size]`. An unmeasurable viewport maps everything to no cells.
    pub fn map_rect(&self, rect: &Rect, viewport: &Viewport) -> GridBounds {
        if !viewport.is_measurable() {
            return GridBounds::EMPTY;
        }

        let n = self.size as f64;
        let clamp = |v: f64| -> usize {
            if v.is_nan() {
                0
            } else {
                v.clamp(0.0, n) as usize
            }
        };

        let l = clamp((rect.left / viewport.width * n).floor());
        let t = clamp((rect.top / viewport.height * n).floor());
        let r = clamp((rect.right() / viewport.width * n).ceil());
        let b = clamp((rect.bottom() / viewport.height * n).ceil());

        GridBounds {
            l,
            t,
            r: r.max(l),
            b: b.max(t),
        }
    }

    /// Fraction of the grid covered by `bounds`
    pub fn element_ratio(&self, bounds: &GridBounds) -> f64 {
        let total = self.size * self.size;
        if total == 0 {
            return 0.0;
        }
        bounds.cell_count() as f64 / total as f64
    }

    /// Stamp `time` on every cell in `bounds`
    ///
    /// Stops at the first out-of-range cell; cells written before it keep
    /// their new value.
    pub fn apply(&mut self, bounds: &GridBounds, time: i64) -> Result<(), GridWriteError> {
        for row in bounds.t..bounds.b {
            for col in bounds.l..bounds.r {
                if row >= self.size || col >= self.size {
                    return Err(GridWriteError { row, col });
                }
                self.cells[row * self.size + col] = time;
            }
        }
        Ok(())
    }
}

impl From<Heatmap> for Vec<Vec<i64>> {
    fn from(heatmap: Heatmap) -> Self {
        heatmap.rows()
    }
}

impl TryFrom<Vec<Vec<i64>>> for Heatmap {
    type Error = RaggedHeatmap;

    fn try_from(rows: Vec<Vec<i64>>) -> Result<Self, Self::Error> {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != size {
                return Err(RaggedHeatmap {
                    row,
                    len: values.len(),
                    expected: size,
                });
            }
            cells.extend(values);
        }
        Ok(Self { size, cells })
    }
}

/// Round a millisecond value half up
pub fn round_ms(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Milliseconds between `start` and `raw`, rounded half up
pub fn relative_time(raw: f64, start: f64) -> i64 {
    round_ms(raw - start)
}

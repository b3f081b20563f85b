// Geometry types: viewport rectangles and heatmap cell ranges

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in CSS pixels, relative to the viewport origin
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    /// Left edge
    pub left: f64,
    /// Top edge
    pub top: f64,
    /// Width (non-negative for real intersection rectangles)
    pub width: f64,
    /// Height (non-negative for real intersection rectangles)
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Whether the rectangle covers a strictly positive area
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Viewport dimensions captured once at session start
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Viewport {
    /// Viewport width in CSS pixels
    pub width: f64,
    /// Viewport height in CSS pixels
    pub height: f64,
}

impl Viewport {
    /// Create a new viewport
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are usable as normalization divisors
    pub fn is_measurable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Half-open range of heatmap cells `[l, r) x [t, b)` covered by a rectangle
///
/// Invariant: `0 <= l <= r <= size` and `0 <= t <= b <= size` for the grid the
/// bounds were mapped onto.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GridBounds {
    pub l: usize,
    pub t: usize,
    pub r: usize,
    pub b: usize,
}

impl GridBounds {
    /// Bounds covering no cells
    pub const EMPTY: GridBounds = GridBounds {
        l: 0,
        t: 0,
        r: 0,
        b: 0,
    };

    /// Number of cells covered
    pub fn cell_count(&self) -> usize {
        (self.r - self.l) * (self.b - self.t)
    }

    /// Whether the bounds cover no cells
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }
}

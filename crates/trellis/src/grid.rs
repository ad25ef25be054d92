//! Uniform walkability grid.
//!
//! A [`Grid`] rasterizes a rectangular playfield into square cells, each of
//! which is either walkable or blocked. Cells are addressed by integer
//! [`Cell`] coordinates with the origin in the top-left corner, matching
//! screen space where `y` grows downward.
//!
//! # Example
//!
//! ```
//! use trellis::{Cell, Grid};
//!
//! let mut grid = Grid::new(4, 3).unwrap();
//! grid.set_walkable(Cell::new(1, 1), false).unwrap();
//!
//! assert!(grid.is_walkable(Cell::new(0, 0)));
//! assert!(!grid.is_walkable(Cell::new(1, 1)));
//! assert!(!grid.is_walkable(Cell::new(9, 9)));
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::GridError;

// =============================================================================
// Cell
// =============================================================================

/// Integer coordinate of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl Cell {
    /// Creates a cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the cell displaced by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Chebyshev distance: the number of king moves between two cells.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Whether the two cells touch, orthogonally or diagonally.
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self != other && self.chebyshev(other) == 1
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

// =============================================================================
// Grid
// =============================================================================

/// A `width x height` matrix of walkable/blocked cells.
///
/// Cells outside the grid are never walkable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    blocked: Vec<bool>,
}

impl Grid {
    /// Creates a fully walkable grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ZeroSize`] when either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::ZeroSize { width, height });
        }
        Ok(Self {
            width,
            height,
            blocked: vec![false; width as usize * height as usize],
        })
    }

    /// Creates a grid that covers a playfield of `extent` world units with
    /// square cells of `cell_size` units. Partial cells at the far edges are
    /// rounded up into whole cells.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidCellSize`] for a non-positive cell size and
    /// [`GridError::ZeroSize`] for an empty playfield.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn covering(extent: Vec2, cell_size: f32) -> Result<Self, GridError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        let width = (extent.x.max(0.0) / cell_size).ceil() as u32;
        let height = (extent.y.max(0.0) / cell_size).ceil() as u32;
        Self::new(width, height)
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    /// Always false; a grid has at least one cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    /// Whether `cell` lies inside the grid.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// Whether `cell` is inside the grid and not blocked.
    #[must_use]
    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.index(cell).is_some_and(|i| !self.blocked[i])
    }

    /// Marks a single cell walkable or blocked.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] when `cell` is outside the grid.
    pub fn set_walkable(&mut self, cell: Cell, walkable: bool) -> Result<(), GridError> {
        let index = self.index(cell).ok_or(GridError::OutOfBounds {
            x: cell.x,
            y: cell.y,
            width: self.width,
            height: self.height,
        })?;
        self.blocked[index] = !walkable;
        Ok(())
    }

    /// Blocks every cell in the inclusive rectangle `min..=max`, clipped to
    /// the grid. Returns how many cells changed from walkable to blocked.
    #[allow(clippy::cast_possible_wrap)]
    pub fn block_rect(&mut self, min: Cell, max: Cell) -> usize {
        let x0 = min.x.min(max.x).max(0);
        let y0 = min.y.min(max.y).max(0);
        let x1 = min.x.max(max.x).min(self.width as i32 - 1);
        let y1 = min.y.max(max.y).min(self.height as i32 - 1);

        let mut changed = 0;
        for y in y0..=y1 {
            for x in x0..=x1 {
                if let Some(i) = self.index(Cell::new(x, y)) {
                    if !self.blocked[i] {
                        self.blocked[i] = true;
                        changed += 1;
                    }
                }
            }
        }
        changed
    }

    /// Number of blocked cells.
    #[must_use]
    pub fn blocked_count(&self) -> usize {
        self.blocked.iter().filter(|b| **b).count()
    }

    /// Converts a world-space point to the cell containing it, clamped onto
    /// the grid so points past an edge map to the nearest border cell.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn cell_at(&self, point: Vec2, cell_size: f32) -> Cell {
        let x = (point.x / cell_size).floor() as i32;
        let y = (point.y / cell_size).floor() as i32;
        Cell::new(
            x.clamp(0, self.width as i32 - 1),
            y.clamp(0, self.height as i32 - 1),
        )
    }

    /// World-space center of `cell`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_center(cell: Cell, cell_size: f32) -> Vec2 {
        Vec2::new(
            cell.x as f32 * cell_size + cell_size / 2.0,
            cell.y as f32 * cell_size + cell_size / 2.0,
        )
    }

    /// Iterates over every blocked cell in row-major order.
    pub fn blocked_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.blocked
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(|(i, _)| self.cell_of(i))
    }

    #[allow(clippy::cast_sign_loss)]
    pub(crate) fn index(&self, cell: Cell) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.y as usize * self.width as usize + cell.x as usize)
        } else {
            None
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub(crate) fn cell_of(&self, index: usize) -> Cell {
        let w = self.width as usize;
        Cell::new((index % w) as i32, (index / w) as i32)
    }
}

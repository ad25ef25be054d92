//! Error types for grid construction and mutation.

use thiserror::Error;

/// Errors raised when building or mutating a [`Grid`](crate::Grid).
///
/// Search never fails with an error: an unreachable goal is reported as an
/// empty path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// A grid needs at least one cell on each axis.
    #[error("grid dimensions must be non-zero (got {width}x{height})")]
    ZeroSize {
        /// Requested width in cells
        width: u32,
        /// Requested height in cells
        height: u32,
    },

    /// A cell coordinate fell outside the grid.
    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        /// Cell column
        x: i32,
        /// Cell row
        y: i32,
        /// Grid width in cells
        width: u32,
        /// Grid height in cells
        height: u32,
    },

    /// Cell size used to rasterize world space was zero, negative or not finite.
    #[error("cell size must be positive and finite (got {0})")]
    InvalidCellSize(f32),
}

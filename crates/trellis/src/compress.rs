//! Path compression and expansion.
//!
//! A raw search result lists every cell stepped through. Agents steer toward
//! one waypoint at a time, so long straight runs collapse to their endpoints
//! with [`compress_path`]. [`expand_path`] is the inverse, rasterizing the
//! straight segments between waypoints back into cells.

use crate::grid::Cell;

/// Keeps the first cell, every cell where the step direction changes, and
/// the last cell.
///
/// Paths of fewer than three cells are returned unchanged.
///
/// # Example
///
/// ```
/// use trellis::{compress_path, Cell};
///
/// let raw: Vec<Cell> = [(0, 0), (1, 0), (2, 0), (3, 1), (4, 2)]
///     .into_iter()
///     .map(Cell::from)
///     .collect();
///
/// assert_eq!(
///     compress_path(&raw),
///     vec![Cell::new(0, 0), Cell::new(2, 0), Cell::new(4, 2)]
/// );
/// ```
#[must_use]
pub fn compress_path(path: &[Cell]) -> Vec<Cell> {
    if path.len() < 3 {
        return path.to_vec();
    }

    let direction = |a: Cell, b: Cell| ((b.x - a.x).signum(), (b.y - a.y).signum());

    let mut out = vec![path[0]];
    let mut heading = direction(path[0], path[1]);
    for pair in path[1..].windows(2) {
        let next = direction(pair[0], pair[1]);
        if next != heading {
            out.push(pair[0]);
            heading = next;
        }
    }
    out.push(path[path.len() - 1]);
    out
}

/// Cells on the straight segment from `a` to `b`, both inclusive
/// (Bresenham).
#[must_use]
pub fn interpolate(a: Cell, b: Cell) -> Vec<Cell> {
    let dx = (b.x - a.x).abs();
    let dy = -(b.y - a.y).abs();
    let sx = if a.x < b.x { 1 } else { -1 };
    let sy = if a.y < b.y { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::new();
    let (mut x, mut y) = (a.x, a.y);
    loop {
        cells.push(Cell::new(x, y));
        if x == b.x && y == b.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

/// Rasterizes a waypoint list back into a cell-by-cell path.
#[must_use]
pub fn expand_path(waypoints: &[Cell]) -> Vec<Cell> {
    let Some(first) = waypoints.first() else {
        return Vec::new();
    };
    let mut out = vec![*first];
    for pair in waypoints.windows(2) {
        out.extend(interpolate(pair[0], pair[1]).into_iter().skip(1));
    }
    out
}

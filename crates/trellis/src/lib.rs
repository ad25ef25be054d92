//! # Trellis
//!
//! Grid navigation for 2D playfields.
//!
//! Trellis rasterizes a playfield into a uniform grid of walkable and blocked
//! cells, searches it for a route between two cells, and compresses the raw
//! route into the turn points an agent actually needs to steer through.
//!
//! - **[`Grid`]**: walkability matrix with world-space helpers
//! - **[`Finder`]**: A*, bidirectional A* and bidirectional BFS
//! - **[`compress_path`]**: collapse straight runs to their endpoints
//!
//! ## Quick Start
//!
//! ```
//! use glam::Vec2;
//! use trellis::{compress_path, Finder, Grid};
//!
//! let mut grid = Grid::covering(Vec2::new(320.0, 320.0), 32.0).unwrap();
//! let blocker = grid.cell_at(Vec2::new(160.0, 160.0), 32.0);
//! grid.block_rect(blocker.offset(-1, -1), blocker.offset(1, 1));
//!
//! let start = grid.cell_at(Vec2::new(16.0, 16.0), 32.0);
//! let goal = grid.cell_at(Vec2::new(300.0, 300.0), 32.0);
//! let waypoints = compress_path(&Finder::default().find_path(&grid, start, goal));
//!
//! assert_eq!(waypoints.first(), Some(&start));
//! assert_eq!(waypoints.last(), Some(&goal));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compress;
pub mod error;
pub mod grid;
pub mod search;

pub use compress::{compress_path, expand_path, interpolate};
pub use error::GridError;
pub use grid::{Cell, Grid};
pub use search::{neighbors_into, DiagonalMovement, Finder, SearchAlgorithm};

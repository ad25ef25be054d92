//! Shortest-path search over a [`Grid`].
//!
//! Three algorithms are available, all sharing the same neighbor rules:
//!
//! - [`SearchAlgorithm::AStar`]: classic A* with an octile (or Manhattan when
//!   diagonals are disabled) heuristic. Returns an optimal path.
//! - [`SearchAlgorithm::BiAStar`]: A* run from both ends, alternating
//!   expansions until the frontiers touch. Usually expands fewer nodes; the
//!   path is not guaranteed optimal.
//! - [`SearchAlgorithm::BiBreadthFirst`]: bidirectional breadth-first search,
//!   optimal in step count.
//!
//! The start cell is always treated as walkable, so an agent standing inside
//! an obstacle's padding can still walk out. The goal must be walkable;
//! otherwise the result is empty.
//!
//! # Example
//!
//! ```
//! use trellis::{Cell, DiagonalMovement, Finder, Grid, SearchAlgorithm};
//!
//! let mut grid = Grid::new(5, 5).unwrap();
//! grid.block_rect(Cell::new(2, 0), Cell::new(2, 3));
//!
//! let finder = Finder::new(SearchAlgorithm::AStar, DiagonalMovement::Never);
//! let path = finder.find_path(&grid, Cell::new(0, 0), Cell::new(4, 0));
//!
//! assert_eq!(path.first(), Some(&Cell::new(0, 0)));
//! assert_eq!(path.last(), Some(&Cell::new(4, 0)));
//! assert!(path.iter().all(|c| grid.is_walkable(*c) || *c == Cell::new(0, 0)));
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::grid::{Cell, Grid};

const SQRT_2: f32 = std::f32::consts::SQRT_2;

// =============================================================================
// Options
// =============================================================================

/// When a search may step diagonally between cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagonalMovement {
    /// Diagonal steps are always allowed, even between two blocked cells.
    Always,
    /// Only the four orthogonal neighbors are reachable.
    Never,
    /// A diagonal step is allowed if at most one of the two orthogonal cells
    /// it passes between is blocked.
    IfAtMostOneObstacle,
    /// A diagonal step is allowed only when both orthogonal cells it passes
    /// between are walkable. Paths never cut corners.
    #[default]
    OnlyWhenNoObstacles,
}

/// Search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchAlgorithm {
    /// Unidirectional A*.
    AStar,
    /// Bidirectional A*.
    #[default]
    BiAStar,
    /// Bidirectional breadth-first search.
    BiBreadthFirst,
}

// =============================================================================
// Neighbors
// =============================================================================

/// Collects the cells reachable in one step from `cell` into `out`.
///
/// Orthogonal neighbors come first (up, right, down, left) followed by the
/// permitted diagonals, which keeps expansion order stable.
pub fn neighbors_into(grid: &Grid, cell: Cell, diagonal: DiagonalMovement, out: &mut Vec<Cell>) {
    out.clear();

    let up = cell.offset(0, -1);
    let right = cell.offset(1, 0);
    let down = cell.offset(0, 1);
    let left = cell.offset(-1, 0);

    let s0 = grid.is_walkable(up);
    let s1 = grid.is_walkable(right);
    let s2 = grid.is_walkable(down);
    let s3 = grid.is_walkable(left);

    for (open, next) in [(s0, up), (s1, right), (s2, down), (s3, left)] {
        if open {
            out.push(next);
        }
    }

    let (d0, d1, d2, d3) = match diagonal {
        DiagonalMovement::Never => return,
        DiagonalMovement::Always => (true, true, true, true),
        DiagonalMovement::OnlyWhenNoObstacles => (s3 && s0, s0 && s1, s1 && s2, s2 && s3),
        DiagonalMovement::IfAtMostOneObstacle => (s3 || s0, s0 || s1, s1 || s2, s2 || s3),
    };

    let corners = [
        (d0, cell.offset(-1, -1)),
        (d1, cell.offset(1, -1)),
        (d2, cell.offset(1, 1)),
        (d3, cell.offset(-1, 1)),
    ];
    for (allowed, next) in corners {
        if allowed && grid.is_walkable(next) {
            out.push(next);
        }
    }
}

fn step_cost(from: Cell, to: Cell) -> f32 {
    if from.x != to.x && from.y != to.y {
        SQRT_2
    } else {
        1.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn heuristic(diagonal: DiagonalMovement, a: Cell, b: Cell) -> f32 {
    let dx = a.x.abs_diff(b.x) as f32;
    let dy = a.y.abs_diff(b.y) as f32;
    match diagonal {
        DiagonalMovement::Never => dx + dy,
        _ => {
            let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
            (SQRT_2 - 1.0) * lo + hi
        }
    }
}

// =============================================================================
// Open-list node
// =============================================================================

/// Min-heap entry: lowest `f` first, ties broken by insertion order.
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    f: f32,
    order: u64,
    index: usize,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Per-direction bookkeeping for the A* family.
struct Frontier {
    g: Vec<f32>,
    parent: Vec<Option<usize>>,
    closed: Vec<bool>,
    open: BinaryHeap<OpenNode>,
    target: Cell,
}

impl Frontier {
    fn new(len: usize, root: usize, target: Cell, h: f32) -> Self {
        let mut g = vec![f32::INFINITY; len];
        g[root] = 0.0;
        let mut open = BinaryHeap::new();
        open.push(OpenNode {
            f: h,
            order: 0,
            index: root,
        });
        Self {
            g,
            parent: vec![None; len],
            closed: vec![false; len],
            open,
            target,
        }
    }

    /// Pops the best node not yet closed.
    fn pop(&mut self) -> Option<usize> {
        while let Some(node) = self.open.pop() {
            if !self.closed[node.index] {
                self.closed[node.index] = true;
                return Some(node.index);
            }
        }
        None
    }
}

/// Walks parent links from `index` back to the root; returned root-first.
fn unwind(grid: &Grid, parent: &[Option<usize>], index: usize) -> Vec<Cell> {
    let mut path = vec![grid.cell_of(index)];
    let mut cursor = index;
    while let Some(prev) = parent[cursor] {
        path.push(grid.cell_of(prev));
        cursor = prev;
    }
    path.reverse();
    path
}

fn join(grid: &Grid, fwd: &[Option<usize>], a: usize, bwd: &[Option<usize>], b: usize) -> Vec<Cell> {
    let mut path = unwind(grid, fwd, a);
    let mut tail = unwind(grid, bwd, b);
    tail.reverse();
    path.extend(tail);
    path
}

// =============================================================================
// Finder
// =============================================================================

/// A configured path finder.
///
/// Finders are cheap value types; build one per query or keep one around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Finder {
    /// Search strategy
    pub algorithm: SearchAlgorithm,
    /// Diagonal stepping rule
    pub diagonal: DiagonalMovement,
}

impl Finder {
    /// Creates a finder.
    #[must_use]
    pub const fn new(algorithm: SearchAlgorithm, diagonal: DiagonalMovement) -> Self {
        Self {
            algorithm,
            diagonal,
        }
    }

    /// Finds a path of adjacent cells from `start` to `goal`, both inclusive.
    ///
    /// Returns an empty vector when either endpoint is off the grid, the goal
    /// is blocked, or no route exists. When `start == goal` the path is that
    /// single cell.
    #[must_use]
    pub fn find_path(&self, grid: &Grid, start: Cell, goal: Cell) -> Vec<Cell> {
        let (Some(si), Some(gi)) = (grid.index(start), grid.index(goal)) else {
            return Vec::new();
        };
        if !grid.is_walkable(goal) {
            return Vec::new();
        }
        if si == gi {
            return vec![start];
        }

        let path = match self.algorithm {
            SearchAlgorithm::AStar => self.astar(grid, si, gi),
            SearchAlgorithm::BiAStar => self.bi_astar(grid, si, gi),
            SearchAlgorithm::BiBreadthFirst => self.bi_bfs(grid, si, gi),
        };
        trace!(
            algorithm = ?self.algorithm,
            from = ?start,
            to = ?goal,
            steps = path.len(),
            "grid search finished"
        );
        path
    }

    fn astar(&self, grid: &Grid, si: usize, gi: usize) -> Vec<Cell> {
        let start = grid.cell_of(si);
        let goal = grid.cell_of(gi);
        let mut frontier = Frontier::new(grid.len(), si, goal, heuristic(self.diagonal, start, goal));
        let mut order = 0u64;
        let mut buf = Vec::with_capacity(8);

        while let Some(index) = frontier.pop() {
            if index == gi {
                return unwind(grid, &frontier.parent, gi);
            }
            self.relax(grid, &mut frontier, index, &mut order, &mut buf);
        }
        Vec::new()
    }

    /// Expands `index`, pushing improved neighbors. The examined neighbors
    /// are left in `buf`.
    fn relax(
        &self,
        grid: &Grid,
        frontier: &mut Frontier,
        index: usize,
        order: &mut u64,
        buf: &mut Vec<Cell>,
    ) {
        let cell = grid.cell_of(index);
        neighbors_into(grid, cell, self.diagonal, buf);
        for &next in buf.iter() {
            let Some(ni) = grid.index(next) else { continue };
            if frontier.closed[ni] {
                continue;
            }
            let cost = frontier.g[index] + step_cost(cell, next);
            if cost < frontier.g[ni] {
                frontier.g[ni] = cost;
                frontier.parent[ni] = Some(index);
                *order += 1;
                frontier.open.push(OpenNode {
                    f: cost + heuristic(self.diagonal, next, frontier.target),
                    order: *order,
                    index: ni,
                });
            }
        }
    }

    fn bi_astar(&self, grid: &Grid, si: usize, gi: usize) -> Vec<Cell> {
        const NONE: u8 = 0;
        const FWD: u8 = 1;
        const BWD: u8 = 2;

        let start = grid.cell_of(si);
        let goal = grid.cell_of(gi);
        let h = heuristic(self.diagonal, start, goal);
        let mut fwd = Frontier::new(grid.len(), si, goal, h);
        let mut bwd = Frontier::new(grid.len(), gi, start, h);

        let mut opened_by = vec![NONE; grid.len()];
        opened_by[si] = FWD;
        opened_by[gi] = BWD;

        let mut order = 0u64;
        let mut buf = Vec::with_capacity(8);

        loop {
            let Some(index) = fwd.pop() else { break };
            self.relax(grid, &mut fwd, index, &mut order, &mut buf);
            for &next in &buf {
                let Some(ni) = grid.index(next) else { continue };
                match opened_by[ni] {
                    BWD => return join(grid, &fwd.parent, index, &bwd.parent, ni),
                    NONE => opened_by[ni] = FWD,
                    _ => {}
                }
            }

            let Some(index) = bwd.pop() else { break };
            self.relax(grid, &mut bwd, index, &mut order, &mut buf);
            for &next in &buf {
                let Some(ni) = grid.index(next) else { continue };
                match opened_by[ni] {
                    FWD => return join(grid, &fwd.parent, ni, &bwd.parent, index),
                    NONE => opened_by[ni] = BWD,
                    _ => {}
                }
            }
        }
        Vec::new()
    }

    fn bi_bfs(&self, grid: &Grid, si: usize, gi: usize) -> Vec<Cell> {
        let len = grid.len();
        let mut fwd_parent: Vec<Option<usize>> = vec![None; len];
        let mut bwd_parent: Vec<Option<usize>> = vec![None; len];
        let mut fwd_seen = vec![false; len];
        let mut bwd_seen = vec![false; len];
        fwd_seen[si] = true;
        bwd_seen[gi] = true;

        let mut fwd_queue = VecDeque::from([si]);
        let mut bwd_queue = VecDeque::from([gi]);
        let mut buf = Vec::with_capacity(8);

        while !fwd_queue.is_empty() && !bwd_queue.is_empty() {
            if let Some(index) = fwd_queue.pop_front() {
                neighbors_into(grid, grid.cell_of(index), self.diagonal, &mut buf);
                for &next in &buf {
                    let Some(ni) = grid.index(next) else { continue };
                    if fwd_seen[ni] {
                        continue;
                    }
                    fwd_parent[ni] = Some(index);
                    if bwd_seen[ni] {
                        return join(grid, &fwd_parent, ni, &bwd_parent, ni)
                            .into_iter()
                            .fold(Vec::new(), dedup_adjacent);
                    }
                    fwd_seen[ni] = true;
                    fwd_queue.push_back(ni);
                }
            }

            if let Some(index) = bwd_queue.pop_front() {
                neighbors_into(grid, grid.cell_of(index), self.diagonal, &mut buf);
                for &next in &buf {
                    let Some(ni) = grid.index(next) else { continue };
                    if bwd_seen[ni] {
                        continue;
                    }
                    bwd_parent[ni] = Some(index);
                    if fwd_seen[ni] {
                        return join(grid, &fwd_parent, ni, &bwd_parent, ni)
                            .into_iter()
                            .fold(Vec::new(), dedup_adjacent);
                    }
                    bwd_seen[ni] = true;
                    bwd_queue.push_back(ni);
                }
            }
        }
        Vec::new()
    }
}

/// Fold step that drops a cell equal to the one before it; the meeting cell
/// appears on both halves of a bidirectional join.
fn dedup_adjacent(mut acc: Vec<Cell>, cell: Cell) -> Vec<Cell> {
    if acc.last() != Some(&cell) {
        acc.push(cell);
    }
    acc
}

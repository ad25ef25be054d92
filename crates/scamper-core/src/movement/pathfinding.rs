//! Grid path planning for entities.
//!
//! [`find_path`] rasterizes the playfield into a walkability grid, blocks
//! the padded bounds of every other entity (the requester and a followed
//! target excepted), searches from the requester's cell to the destination
//! cell, compresses the route to its turn points and stores the cell centers
//! as the entity's [`PathData`], replacing any previous path.
//!
//! [`next_path_point`] hands out the waypoint to steer toward, popping
//! waypoints once the entity is within `node_proximity` of them on both
//! axes. A followed target that drifts more than one cell from the end of
//! the path triggers a re-plan; one that leaves the playfield or is
//! destroyed clears the path. An exhausted path is removed.
//!
//! # Recalculation on collision
//!
//! The first path request for an entity installs a collision hook. A
//! collision while a path is active zeroes the entity's velocity and marks
//! the path as recalculating. Once `recalculate_delay_ms` has passed,
//! [`poll_recalculation`] re-plans from the current position if the
//! destination is still more than a cell away, and clears the path
//! otherwise.

use std::collections::VecDeque;

use glam::Vec2;
use tracing::{debug, warn};
use trellis::{compress_path, Cell, Finder, Grid};

use super::settings::{MovementSettings, PathfindingSettings};
use super::{settings_for, PATH, TOUCH};
use crate::entity::EntityId;
use crate::error::Result;
use crate::names::EventName;
use crate::world::World;

/// An entity's planned route.
#[derive(Debug, Clone, PartialEq)]
pub struct PathData {
    /// Remaining waypoints in world coordinates, next first
    pub waypoints: VecDeque<Vec2>,
    /// Where the path was planned to
    pub destination: Vec2,
    /// Entity being followed, if any
    pub target: Option<EntityId>,
    /// When a collision-triggered re-plan is due
    pub recalculate_at: Option<u64>,
    /// Consecutive ticks spent below the stuck speed
    pub slow_ticks: u32,
}

impl PathData {
    /// Whether the path is waiting out a collision.
    #[must_use]
    pub fn is_recalculating(&self) -> bool {
        self.recalculate_at.is_some()
    }
}

/// Marks entities whose collision hook is installed.
#[derive(Debug, Clone, Copy)]
struct CollisionHook;

/// Settings used for planning: the path plugin's, else the pointer
/// plugin's, else the defaults.
#[must_use]
pub fn planning_settings(world: &World, id: EntityId) -> MovementSettings {
    if world.has_plugin(id, &PATH) || !world.has_plugin(id, &TOUCH) {
        settings_for(world, id, &PATH)
    } else {
        settings_for(world, id, &TOUCH)
    }
}

/// Walkability grid as seen by `id`, with `target` left unblocked.
///
/// # Errors
///
/// [`CoreError::Grid`](crate::CoreError::Grid) if the playfield and cell
/// size do not make a grid.
#[allow(clippy::cast_possible_truncation)]
pub fn obstacle_grid(world: &World, id: EntityId, target: Option<EntityId>, settings: &PathfindingSettings) -> Result<Grid> {
    let cs = settings.grid_cell_size;
    let mut grid = Grid::covering(world.playfield(), cs)?;

    for other in world.entity_ids() {
        if other == id || Some(other) == target {
            continue;
        }
        let Some(bounds) = world.bounds(other) else {
            continue;
        };
        let min = Cell::new(
            (bounds.min.x / cs).floor() as i32 - settings.padding,
            (bounds.min.y / cs).floor() as i32 - settings.padding,
        );
        let max = Cell::new(
            (bounds.max.x / cs).ceil() as i32 - 1 + settings.padding,
            (bounds.max.y / cs).ceil() as i32 - 1 + settings.padding,
        );
        grid.block_rect(min, max);
    }
    Ok(grid)
}

/// Plans a path for `id` to `destination` and stores it.
///
/// Any previous path is dropped first. Returns the waypoints, or an empty
/// vector when the destination is off the playfield, already within
/// `arrival_tolerance`, or unreachable.
pub fn find_path(world: &mut World, id: EntityId, destination: Vec2, target: Option<EntityId>) -> Vec<Vec2> {
    clear_path(world, id);

    let Some(position) = world.position(id) else {
        warn!(entity = %id, "path requested for unknown entity");
        return Vec::new();
    };
    if !world.in_playfield(destination) {
        debug!(entity = %id, ?destination, "destination outside playfield");
        return Vec::new();
    }
    let settings = planning_settings(world, id);
    if position.distance(destination) <= settings.arrival_tolerance {
        return Vec::new();
    }

    ensure_collision_hook(world, id);

    let pf = settings.pathfinding;
    let grid = match obstacle_grid(world, id, target, &pf) {
        Ok(grid) => grid,
        Err(err) => {
            warn!(entity = %id, error = %err, "cannot build path grid");
            return Vec::new();
        }
    };
    let start = grid.cell_at(position, pf.grid_cell_size);
    let goal = grid.cell_at(destination, pf.grid_cell_size);
    let cells = Finder::new(pf.algorithm, pf.diagonal_movement).find_path(&grid, start, goal);
    if cells.is_empty() {
        debug!(entity = %id, ?destination, "no path found");
        return Vec::new();
    }

    let waypoints: VecDeque<Vec2> = compress_path(&cells)
        .into_iter()
        .map(|cell| Grid::cell_center(cell, pf.grid_cell_size))
        .collect();
    debug!(entity = %id, ?destination, waypoints = waypoints.len(), "path planned");

    let out = waypoints.iter().copied().collect();
    world.side_mut::<PathData>().insert(
        id,
        PathData {
            waypoints,
            destination,
            target,
            recalculate_at: None,
            slow_ticks: 0,
        },
    );
    out
}

/// Plans a path to another entity and keeps following it.
pub fn follow(world: &mut World, id: EntityId, target: EntityId) -> Vec<Vec2> {
    match world.position(target) {
        Some(destination) => find_path(world, id, destination, Some(target)),
        None => {
            clear_path(world, id);
            Vec::new()
        }
    }
}

/// Drops the entity's path. Returns false if there was none.
pub fn clear_path(world: &mut World, id: EntityId) -> bool {
    let cleared = world.side_mut::<PathData>().remove(id).is_some();
    if cleared {
        debug!(entity = %id, "path cleared");
    }
    cleared
}

/// Whether the entity has a path, including one waiting to re-plan.
#[must_use]
pub fn has_active_path(world: &World, id: EntityId) -> bool {
    world.state::<PathData>(id).is_some()
}

/// Whether the entity's path is waiting out a collision.
#[must_use]
pub fn is_recalculating(world: &World, id: EntityId) -> bool {
    world.state::<PathData>(id).is_some_and(PathData::is_recalculating)
}

/// The entity's stored path.
#[must_use]
pub fn path(world: &World, id: EntityId) -> Option<&PathData> {
    world.state::<PathData>(id)
}

/// The waypoint to steer toward, or `None` when there is no path, the path
/// is recalculating, or it has just been completed.
pub fn next_path_point(world: &mut World, id: EntityId) -> Option<Vec2> {
    let path = world.state::<PathData>(id)?;
    if path.is_recalculating() {
        return None;
    }
    let pf = planning_settings(world, id).pathfinding;

    if let Some(target) = path.target {
        let last = path.waypoints.back().copied();
        match world.position(target) {
            Some(tp) if world.in_playfield(tp) => {
                let drifted = last.is_some_and(|last| {
                    (tp.x - last.x).abs() > pf.grid_cell_size || (tp.y - last.y).abs() > pf.grid_cell_size
                });
                if drifted {
                    debug!(entity = %id, target = %target, "followed target drifted; re-planning");
                    return find_path(world, id, tp, Some(target)).first().copied();
                }
            }
            _ => {
                debug!(entity = %id, target = %target, "followed target lost");
                clear_path(world, id);
                return None;
            }
        }
    }

    let position = world.position(id)?;
    let path = world.side_mut::<PathData>().get_mut(id)?;
    while let Some(head) = path.waypoints.front() {
        if (head.x - position.x).abs() < pf.node_proximity && (head.y - position.y).abs() < pf.node_proximity {
            path.waypoints.pop_front();
        } else {
            break;
        }
    }
    let head = path.waypoints.front().copied();
    if head.is_none() {
        world.side_mut::<PathData>().remove(id);
        debug!(entity = %id, "path completed");
    }
    head
}

/// Runs a due collision re-plan. Returns true while the path is still
/// settling.
pub fn poll_recalculation(world: &mut World, id: EntityId) -> bool {
    let Some(path) = world.state::<PathData>(id) else {
        return false;
    };
    let Some(due) = path.recalculate_at else {
        return false;
    };
    if world.now_ms() < due {
        return true;
    }

    let target = path.target;
    let destination = match target {
        Some(t) => match world.position(t) {
            Some(p) => p,
            None => {
                clear_path(world, id);
                return false;
            }
        },
        None => path.destination,
    };
    let Some(position) = world.position(id) else {
        return false;
    };

    let cs = planning_settings(world, id).pathfinding.grid_cell_size;
    if position.distance_squared(destination) > cs * cs {
        debug!(entity = %id, "re-planning after collision");
        find_path(world, id, destination, target);
    } else {
        clear_path(world, id);
    }
    false
}

fn ensure_collision_hook(world: &mut World, id: EntityId) {
    if world.state::<CollisionHook>(id).is_some() {
        return;
    }
    world.side_mut::<CollisionHook>().insert(id, CollisionHook);
    world.on_entity(id, EventName::COLLISION, move |world, event| {
        if event.involves(id) {
            on_collision(world, id);
        }
    });
}

fn on_collision(world: &mut World, id: EntityId) {
    let delay = planning_settings(world, id).pathfinding.recalculate_delay_ms;
    let now = world.now_ms();
    let Some(path) = world.side_mut::<PathData>().get_mut(id) else {
        return;
    };
    if path.is_recalculating() {
        return;
    }
    path.recalculate_at = Some(now + delay);
    world.set_velocity(id, Vec2::ZERO);
    debug!(entity = %id, delay_ms = delay, "collision on path; recalculating");
}

//! Path following (`topDown:path`).
//!
//! A pointer tap or a `touch:move` drag plans a grid path to the point;
//! [`pathfinding::follow`] plans to another entity. Every tick the plugin:
//!
//! 1. lets a collision re-plan settle ([`pathfinding::poll_recalculation`]);
//! 2. steers toward [`pathfinding::next_path_point`];
//! 3. abandons the path if the entity has crawled below
//!    `stuck_speed_fraction * max_speed` for `stuck_ticks` ticks in a row
//!    while still away from the destination;
//! 4. stops the entity when the path completes.
//!
//! Without a path the plugin only keeps the state machine running, and not
//! even that when keyboard movement is attached to the same entity.

use glam::Vec2;
use serde_json::Value;
use tracing::debug;

use super::keyboard::KEYBOARD;
use super::pathfinding::{self, PathData};
use super::settings::MovementSettings;
use crate::entity::EntityId;
use crate::events::Event;
use crate::names::EventName;
use crate::plugin::{Plugin, PluginId};
use crate::world::World;

/// Plugin id.
pub const PATH: PluginId = PluginId::from_static("topDown:path");

/// Grid path following.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathFollow;

impl PathFollow {
    /// Counts slow ticks; returns true once the entity counts as stuck.
    fn stuck(world: &mut World, id: EntityId, settings: &MovementSettings) -> bool {
        let speed = world.velocity(id).map_or(0.0, Vec2::length);
        let position = world.position(id);
        let Some(path) = world.side_mut::<PathData>().get_mut(id) else {
            return false;
        };
        let far = position.is_some_and(|p| p.distance(path.destination) > settings.arrival_tolerance);
        if far && speed < settings.max_speed * settings.pathfinding.stuck_speed_fraction {
            path.slow_ticks += 1;
        } else {
            path.slow_ticks = 0;
        }
        path.slow_ticks >= settings.pathfinding.stuck_ticks
    }
}

impl Plugin for PathFollow {
    fn id(&self) -> PluginId {
        PATH
    }

    fn events(&self) -> Vec<EventName> {
        vec![EventName::POINTER_TAP, EventName::TOUCH_MOVE]
    }

    fn has_update(&self) -> bool {
        true
    }

    fn init(&self, world: &mut World, entity: EntityId, settings: &Value) {
        super::install(world, entity, &PATH, settings);
    }

    fn update(&self, world: &mut World, entity: EntityId) {
        let settings = super::settings_for(world, entity, &PATH);

        if !pathfinding::has_active_path(world, entity) {
            if !world.has_plugin(entity, &KEYBOARD) {
                super::drive(world, entity, Vec2::ZERO, &settings);
            }
            return;
        }
        if pathfinding::poll_recalculation(world, entity) {
            super::drive(world, entity, Vec2::ZERO, &settings);
            return;
        }

        let Some(waypoint) = pathfinding::next_path_point(world, entity) else {
            if !pathfinding::has_active_path(world, entity) {
                world.set_velocity(entity, Vec2::ZERO);
            }
            super::drive(world, entity, Vec2::ZERO, &settings);
            return;
        };
        let Some(position) = world.position(entity) else {
            return;
        };
        super::drive(world, entity, waypoint - position, &settings);

        if Self::stuck(world, entity, &settings) {
            debug!(entity = %entity, "stuck on path; abandoning");
            pathfinding::clear_path(world, entity);
            world.set_velocity(entity, Vec2::ZERO);
        }
    }

    fn on_event(&self, world: &mut World, entity: EntityId, event: &Event) {
        if let Some(point) = event.point() {
            pathfinding::find_path(world, entity, point, None);
        }
    }
}

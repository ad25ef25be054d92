//! Pointer steering (`topDown:touch`).
//!
//! A pointer tap or a `touch:move` drag sets the steer target and zeroes the
//! entity's velocity. Each tick the entity is driven in a straight line
//! toward the target; within `arrival_tolerance` it stops and the target is
//! dropped.

use glam::Vec2;
use serde_json::Value;
use tracing::debug;

use crate::entity::EntityId;
use crate::events::Event;
use crate::names::EventName;
use crate::plugin::{Plugin, PluginId};
use crate::world::World;

/// Plugin id.
pub const TOUCH: PluginId = PluginId::from_static("topDown:touch");

/// Point the entity is heading for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteerTarget(pub Vec2);

/// Straight-line steering toward tapped points.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerSteering;

impl Plugin for PointerSteering {
    fn id(&self) -> PluginId {
        TOUCH
    }

    fn events(&self) -> Vec<EventName> {
        vec![EventName::POINTER_TAP, EventName::TOUCH_MOVE]
    }

    fn has_update(&self) -> bool {
        true
    }

    fn init(&self, world: &mut World, entity: EntityId, settings: &Value) {
        super::install(world, entity, &TOUCH, settings);
    }

    fn update(&self, world: &mut World, entity: EntityId) {
        let settings = super::settings_for(world, entity, &TOUCH);
        let Some(position) = world.position(entity) else {
            return;
        };
        let input = match world.state::<SteerTarget>(entity).copied() {
            Some(SteerTarget(target)) if position.distance(target) <= settings.arrival_tolerance => {
                world.side_mut::<SteerTarget>().remove(entity);
                world.set_velocity(entity, Vec2::ZERO);
                debug!(entity = %entity, "steer target reached");
                Vec2::ZERO
            }
            Some(SteerTarget(target)) => target - position,
            None => Vec2::ZERO,
        };
        super::drive(world, entity, input, &settings);
    }

    fn on_event(&self, world: &mut World, entity: EntityId, event: &Event) {
        if world.is_static(entity) {
            return;
        }
        let Some(point) = event.point() else {
            return;
        };
        world.side_mut::<SteerTarget>().insert(entity, SteerTarget(point));
        world.set_velocity(entity, Vec2::ZERO);
    }
}

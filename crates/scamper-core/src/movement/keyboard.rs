//! Keyboard-driven movement (`topDown:keyboard`).
//!
//! A key down on a movement key sets its axis to ±1. A key up clears the
//! axis only if it still holds that key's value, so releasing `A` while `D`
//! is held does not stop the entity. Static entities ignore keys.
//!
//! Pressing a movement key cancels any active path: manual input takes over.
//! While a path is active the path plugin drives, and this plugin's update
//! stands aside.

use glam::Vec2;
use serde_json::Value;
use tracing::debug;

use super::pathfinding;
use crate::entity::EntityId;
use crate::events::Event;
use crate::keys::AxisInput;
use crate::names::EventName;
use crate::plugin::{Plugin, PluginId};
use crate::world::World;

/// Plugin id.
pub const KEYBOARD: PluginId = PluginId::from_static("topDown:keyboard");

/// Axes currently held down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldAxes {
    /// -1 left, 1 right, 0 neither
    pub x: i8,
    /// -1 up, 1 down, 0 neither
    pub y: i8,
}

impl HeldAxes {
    /// Raw input direction.
    #[must_use]
    pub fn direction(self) -> Vec2 {
        Vec2::new(f32::from(self.x), f32::from(self.y))
    }

    fn press(&mut self, axis: AxisInput) {
        match axis {
            AxisInput::X(v) => self.x = v,
            AxisInput::Y(v) => self.y = v,
        }
    }

    fn release(&mut self, axis: AxisInput) {
        match axis {
            AxisInput::X(v) if self.x == v => self.x = 0,
            AxisInput::Y(v) if self.y == v => self.y = 0,
            _ => {}
        }
    }
}

/// WASD / arrow key movement.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardMovement;

impl Plugin for KeyboardMovement {
    fn id(&self) -> PluginId {
        KEYBOARD
    }

    fn events(&self) -> Vec<EventName> {
        vec![EventName::KEY_DOWN, EventName::KEY_UP]
    }

    fn has_update(&self) -> bool {
        true
    }

    fn init(&self, world: &mut World, entity: EntityId, settings: &Value) {
        super::install(world, entity, &KEYBOARD, settings);
        world.side_mut::<HeldAxes>().insert(entity, HeldAxes::default());
    }

    fn update(&self, world: &mut World, entity: EntityId) {
        if pathfinding::has_active_path(world, entity) {
            return;
        }
        let input = world.state::<HeldAxes>(entity).copied().unwrap_or_default().direction();
        let settings = super::settings_for(world, entity, &KEYBOARD);
        super::drive(world, entity, input, &settings);
    }

    fn on_event(&self, world: &mut World, entity: EntityId, event: &Event) {
        if world.is_static(entity) {
            return;
        }
        let Some(axis) = event.key().and_then(|k| k.axis()) else {
            return;
        };
        let pressed = event.name == EventName::KEY_DOWN;
        if pressed && pathfinding::has_active_path(world, entity) {
            debug!(entity = %entity, "key input cancels active path");
            pathfinding::clear_path(world, entity);
        }
        let held = world.side_mut::<HeldAxes>().get_or_insert_with(entity, HeldAxes::default);
        if pressed {
            held.press(axis);
        } else {
            held.release(axis);
        }
    }
}

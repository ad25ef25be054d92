//! Top-down movement.
//!
//! The shared pieces are free functions over the [`World`]:
//!
//! - [`drive`] runs one tick of the movement state machine for an entity:
//!   ramps the force, pushes the body, caps its speed, advances the phase,
//!   updates facing and requests the matching animation;
//! - [`pathfinding`] plans grid paths and hands out waypoints.
//!
//! The input-specific plugins compose them:
//!
//! | Plugin | Id | Input |
//! |--------|----|-------|
//! | [`KeyboardMovement`] | `topDown:keyboard` | WASD / arrow keys |
//! | [`PointerSteering`] | `topDown:touch` | pointer taps, straight line |
//! | [`PathFollow`] | `topDown:path` | pointer taps or a followed entity, via the grid |
//!
//! Each plugin decodes its settings blob into [`MovementSettings`] on attach
//! and keeps it in the entity's [`MovementProfiles`].
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use glam::Vec2;
//! use scamper_core::clock::ManualClock;
//! use scamper_core::entity::EntityDesc;
//! use scamper_core::events::{Event, Payload};
//! use scamper_core::game::{Game, GameConfig};
//! use scamper_core::keys::Key;
//! use scamper_core::movement::{self, MovementPhase, KEYBOARD};
//! use scamper_core::names::EventName;
//! use scamper_core::physics::KinematicWorld;
//!
//! let clock = ManualClock::new();
//! let mut game = Game::new(GameConfig::default(), Box::new(KinematicWorld::default()), Rc::new(clock.clone())).unwrap();
//! let hero = game.world_mut().spawn(EntityDesc::at(Vec2::new(400.0, 300.0), Vec2::splat(16.0)));
//! game.add_entity(hero);
//! game.world_mut().use_registered(hero, &KEYBOARD, serde_json::Value::Null).unwrap();
//!
//! game.world_mut().emit(Event::new(EventName::KEY_DOWN).with(Payload::Key(Key::D)));
//! for _ in 0..60 {
//!     clock.advance(16);
//!     game.tick(16.0);
//! }
//!
//! assert_eq!(movement::phase(game.world(), hero), Some(MovementPhase::Moving));
//! assert!(game.world().position(hero).unwrap().x > 400.0);
//! ```

pub mod animate;
pub mod force;
pub mod keyboard;
pub mod path;
pub mod pathfinding;
pub mod settings;
pub mod state;
pub mod touch;

use glam::Vec2;
use serde_json::Value;
use tracing::trace;

use crate::entity::EntityId;
use crate::plugin::{settings_or_default, PluginId};
use crate::world::World;

pub use keyboard::{HeldAxes, KeyboardMovement, KEYBOARD};
pub use path::{PathFollow, PATH};
pub use pathfinding::PathData;
pub use settings::{AccelerationSettings, MovementProfiles, MovementSettings, PathfindingSettings};
pub use state::{next_phase, Facing, MovementPhase, MovementState, PhaseInputs};
pub use touch::{PointerSteering, SteerTarget, TOUCH};

/// Decodes a plugin's settings blob, stores it in the entity's profiles and
/// makes sure movement state exists.
pub(crate) fn install(world: &mut World, id: EntityId, plugin: &PluginId, blob: &Value) -> MovementSettings {
    let settings: MovementSettings = settings_or_default(plugin, blob);
    world
        .side_mut::<MovementProfiles>()
        .get_or_insert_with(id, MovementProfiles::default)
        .insert(plugin.clone(), settings);
    let now = world.now_ms();
    world
        .side_mut::<MovementState>()
        .get_or_insert_with(id, || MovementState::new(&settings, now));
    settings
}

/// Settings the entity's `plugin` was attached with, or the defaults.
#[must_use]
pub fn settings_for(world: &World, id: EntityId, plugin: &PluginId) -> MovementSettings {
    world
        .state::<MovementProfiles>(id)
        .and_then(|p| p.get(plugin))
        .copied()
        .unwrap_or_default()
}

/// Current movement phase.
#[must_use]
pub fn phase(world: &World, id: EntityId) -> Option<MovementPhase> {
    world.state::<MovementState>(id).map(|s| s.phase)
}

/// Current facing.
#[must_use]
pub fn facing(world: &World, id: EntityId) -> Option<Facing> {
    world.state::<MovementState>(id).map(|s| s.facing)
}

/// Runs one tick of movement for `id` with raw input direction `input`.
///
/// Returns the phase after the tick, or `None` if the entity is gone.
#[allow(clippy::cast_precision_loss)]
pub fn drive(world: &mut World, id: EntityId, input: Vec2, settings: &MovementSettings) -> Option<MovementPhase> {
    let now = world.now_ms();
    let velocity = world.velocity(id)?;

    let direction = force::normalize(input);
    let has_input = direction != Vec2::ZERO;

    let state = world
        .side_mut::<MovementState>()
        .get_or_insert_with(id, || MovementState::new(settings, now));
    let dt_secs = now.saturating_sub(state.last_tick_ms) as f32 / 1000.0;
    state.last_tick_ms = now;
    state.direction = direction;
    if has_input {
        state.last_input_ms = now;
    }
    state.current_force = force::ramp(state.current_force, has_input, dt_secs, settings);
    let applied = direction * state.current_force;
    let current_force = state.current_force;

    if has_input {
        world.apply_force(id, applied);
    }
    let velocity = {
        let clamped = force::clamp_speed(velocity, settings.max_speed);
        if clamped != velocity {
            world.set_velocity(id, clamped);
        }
        clamped
    };
    let speed = velocity.length();

    let state = world.side_mut::<MovementState>().get_mut(id)?;
    let inputs = PhaseInputs {
        has_input,
        speed,
        force: current_force,
        since_input_ms: now.saturating_sub(state.last_input_ms),
        in_phase_ms: now.saturating_sub(state.phase_since_ms),
    };
    let next = next_phase(state.phase, inputs, settings);
    if next != state.phase {
        trace!(entity = %id, from = ?state.phase, to = ?next, speed, "movement phase changed");
        state.phase = next;
        state.phase_since_ms = now;
    }
    if speed > settings.velocity_threshold {
        if let Some(facing) = Facing::from_vector(velocity) {
            state.facing = facing;
        }
    }
    let (phase, facing) = (state.phase, state.facing);

    let animation = animate::request(world, id, phase, facing, settings.sprite_direction);
    if let Some(state) = world.side_mut::<MovementState>().get_mut(id) {
        state.animation = animation;
    }
    Some(phase)
}

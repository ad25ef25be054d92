//! # Scamper Core
//!
//! Runtime core for 2D top-down games.
//!
//! Game objects are [entities](entity) that own a physics body and a visual
//! and gain behavior from [plugins](plugin). Everything they share lives in
//! the [`World`]:
//!
//! - **Event bus** ([`bus`]): synchronous publish/subscribe with a recursion
//!   guard and per-key throttling.
//! - **Layers** ([`layer`]): named entity groups. An entity listening on a
//!   layer is told, by an event named after the layer, whenever a member
//!   starts touching it.
//! - **Physics** ([`physics`]): a pluggable rigid-body world; the built-in
//!   [`KinematicWorld`](physics::KinematicWorld) handles axis-aligned boxes.
//! - **Movement** ([`movement`]): the phase state machine, force ramping,
//!   directional animation and grid pathfinding, packaged as the keyboard,
//!   pointer and path plugins.
//!
//! A [`Game`] drives the world one frame at a time.
//!
//! ## Usage
//!
//! ```
//! use std::rc::Rc;
//! use glam::Vec2;
//! use scamper_core::clock::ManualClock;
//! use scamper_core::entity::EntityDesc;
//! use scamper_core::events::Event;
//! use scamper_core::movement::{self, PATH};
//! use scamper_core::names::EventName;
//! use scamper_core::physics::KinematicWorld;
//! use scamper_core::{Game, GameConfig};
//!
//! let clock = ManualClock::new();
//! let mut game = Game::new(GameConfig::default(), Box::new(KinematicWorld::default()), Rc::new(clock.clone()))?;
//! let hero = game.world_mut().spawn(EntityDesc::at(Vec2::new(48.0, 48.0), Vec2::splat(16.0)));
//! game.add_entity(hero);
//! game.world_mut().use_registered(hero, &PATH, serde_json::Value::Null)?;
//!
//! game.world_mut().emit(Event::new(EventName::POINTER_TAP).with(scamper_core::events::Payload::Point(Vec2::new(400.0, 48.0))));
//! assert!(movement::pathfinding::has_active_path(game.world(), hero));
//! # Ok::<(), scamper_core::CoreError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bus;
pub mod clock;
pub mod entity;
pub mod error;
pub mod events;
pub mod game;
pub mod keys;
pub mod layer;
pub mod movement;
pub mod names;
pub mod physics;
pub mod plugin;
pub mod side;
pub mod visual;
pub mod world;

// Re-exports for convenience
pub use bus::{BusConfig, Dispatch};
pub use entity::{EntityDesc, EntityId};
pub use error::{CoreError, Result};
pub use events::{Event, Payload};
pub use game::{Game, GameConfig};
pub use names::{AnimationName, EventName, LayerName, PluginId};
pub use plugin::Plugin;
pub use world::World;

#[cfg(test)]
mod tests;

//! Game factory and frame loop.
//!
//! A [`Game`] wraps the [`World`] with the frame loop and pause state. Only
//! one game may be alive per thread; creating a second one fails with
//! [`CoreError::AlreadyInitialized`] until the first is dropped.
//!
//! Each [`Game::tick`]:
//!
//! 1. advances the physics world by the frame time, routing collisions;
//! 2. calls [`World::update_entity`] on every member of the primary
//!    `entities` layer, in the order they were added.
//!
//! A paused game's tick does nothing.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use glam::Vec2;
//! use scamper_core::clock::ManualClock;
//! use scamper_core::entity::EntityDesc;
//! use scamper_core::game::{Game, GameConfig};
//! use scamper_core::physics::KinematicWorld;
//!
//! let clock = ManualClock::new();
//! let mut game = Game::new(
//!     GameConfig::default(),
//!     Box::new(KinematicWorld::default()),
//!     Rc::new(clock.clone()),
//! )
//! .unwrap();
//!
//! let id = game.world_mut().spawn(EntityDesc::at(Vec2::new(50.0, 50.0), Vec2::splat(16.0)));
//! game.add_entity(id);
//! game.world_mut().set_velocity(id, Vec2::new(1.0, 0.0));
//!
//! clock.advance(16);
//! game.tick(1000.0 / 60.0);
//! assert!(game.world().position(id).unwrap().x > 50.0);
//! assert_eq!(game.ticks(), 1);
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bus::BusConfig;
use crate::clock::Clock;
use crate::entity::EntityId;
use crate::error::{CoreError, Result};
use crate::events::{Event, Payload};
use crate::movement::{KeyboardMovement, PathFollow, PointerSteering};
use crate::names::{EventName, LayerName};
use crate::physics::{KinematicConfig, PhysicsWorld};
use crate::world::{World, DEFAULT_PLAYFIELD};

thread_local! {
    static LIVE: Cell<bool> = const { Cell::new(false) };
}

// =============================================================================
// Configuration
// =============================================================================

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Playfield size in world units
    pub playfield: Vec2,
    /// Event bus guards
    pub bus: BusConfig,
    /// Settings for the kinematic physics world
    pub physics: KinematicConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            playfield: DEFAULT_PLAYFIELD,
            bus: BusConfig::default(),
            physics: KinematicConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidConfig`] if the document is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// =============================================================================
// Game
// =============================================================================

/// The single live game on this thread.
pub struct Game {
    world: World,
    paused: bool,
    ticks: u64,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("world", &self.world)
            .field("paused", &self.paused)
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl Game {
    /// Creates the game and registers the built-in movement plugins.
    ///
    /// # Errors
    ///
    /// [`CoreError::AlreadyInitialized`] if another game is alive on this
    /// thread.
    pub fn new(config: GameConfig, physics: Box<dyn PhysicsWorld>, clock: Rc<dyn Clock>) -> Result<Self> {
        if LIVE.with(|live| live.replace(true)) {
            return Err(CoreError::AlreadyInitialized);
        }

        let mut world = World::new(config.bus, physics, clock, config.playfield);
        world.register_plugin(Rc::new(KeyboardMovement));
        world.register_plugin(Rc::new(PointerSteering));
        world.register_plugin(Rc::new(PathFollow));

        info!(playfield = ?config.playfield, "game initialized");
        Ok(Self {
            world,
            paused: false,
            ticks: 0,
        })
    }

    /// Whether a game is alive on this thread.
    #[must_use]
    pub fn is_initialized() -> bool {
        LIVE.with(Cell::get)
    }

    /// Runs one frame of `dt_ms` milliseconds.
    pub fn tick(&mut self, dt_ms: f32) {
        if self.paused {
            return;
        }
        self.world.step_physics(dt_ms);

        let ids = self.world.layer_entities(&LayerName::ENTITIES).to_vec();
        for id in ids {
            self.world.update_entity(id);
        }
        self.ticks += 1;
    }

    /// Frames run so far, paused frames excluded.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Pauses the loop. Emits `pauseChange(true)` if it was running.
    pub fn pause(&mut self) {
        if !self.paused {
            self.set_paused(true);
        }
    }

    /// Resumes the loop. Emits `pauseChange(false)` if it was paused.
    pub fn resume(&mut self) {
        if self.paused {
            self.set_paused(false);
        }
    }

    /// Flips the pause state and returns the new one.
    pub fn toggle_pause(&mut self) -> bool {
        self.set_paused(!self.paused);
        self.paused
    }

    /// Whether the loop is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        debug!(paused, "pause changed");
        self.world
            .emit(Event::new(EventName::PAUSE_CHANGE).with(Payload::Flag(paused)));
    }

    /// Puts an entity in the primary layer so the loop updates it.
    pub fn add_entity(&mut self, id: EntityId) -> bool {
        self.world.add_to_layer(id, &LayerName::ENTITIES)
    }

    /// Takes an entity out of the primary layer. The entity stays alive.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        self.world.remove_from_layer(id, &LayerName::ENTITIES)
    }

    /// Resizes the playfield and emits `resize`.
    pub fn resize(&mut self, size: Vec2) {
        self.world.set_playfield(size);
        self.world
            .emit(Event::new(EventName::RESIZE).with(Payload::Point(size)));
    }

    /// Emits `cleanup` and destroys whatever is left.
    pub fn teardown(&mut self) {
        self.world.emit(Event::new(EventName::CLEANUP));
        for id in self.world.entity_ids() {
            self.world.destroy(id);
        }
        info!("game torn down");
    }

    /// The world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The world, mutably.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        LIVE.with(|live| live.set(false));
    }
}

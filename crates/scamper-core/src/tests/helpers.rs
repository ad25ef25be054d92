//! Test setup utilities.
//!
//! Games here always run on a [`ManualClock`], so tests decide exactly when
//! time passes. [`run`] advances the clock by one frame before every tick.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use serde_json::Value;

use crate::clock::ManualClock;
use crate::entity::{EntityDesc, EntityId};
use crate::events::{Event, Payload};
use crate::game::{Game, GameConfig};
use crate::keys::Key;
use crate::names::EventName;
use crate::physics::{Aabb, BodyDesc, BodyHandle, CollisionPair, KinematicWorld, PhysicsWorld};
use crate::plugin::PluginId;

/// Frame length used by [`run`].
pub const FRAME_MS: u64 = 16;

// =============================================================================
// Game setup
// =============================================================================

/// A game on the kinematic world, plus its clock.
pub fn game_with(config: GameConfig) -> (Game, ManualClock) {
    let clock = ManualClock::new();
    let game = Game::new(
        config,
        Box::new(KinematicWorld::default()),
        Rc::new(clock.clone()),
    )
    .unwrap();
    (game, clock)
}

/// A default game, plus its clock.
pub fn game() -> (Game, ManualClock) {
    game_with(GameConfig::default())
}

/// A game whose physics world records every force applied.
pub fn probed_game() -> (Game, ManualClock, ForceLog) {
    let clock = ManualClock::new();
    let probe = ForceProbe::new(KinematicWorld::default());
    let log = probe.log();
    let game = Game::new(GameConfig::default(), Box::new(probe), Rc::new(clock.clone())).unwrap();
    (game, clock, log)
}

// =============================================================================
// Entities
// =============================================================================

/// Spawns a 16x16 dynamic entity and puts it in the primary layer.
pub fn spawn_mover(game: &mut Game, position: Vec2) -> EntityId {
    let id = game
        .world_mut()
        .spawn(EntityDesc::at(position, Vec2::splat(16.0)));
    game.add_entity(id);
    id
}

/// Spawns a static block of `size` centered on `position`.
pub fn spawn_block(game: &mut Game, position: Vec2, size: Vec2) -> EntityId {
    game.world_mut().spawn(EntityDesc {
        body: BodyDesc::new(position, size).fixed(),
        ..EntityDesc::default()
    })
}

/// Attaches a registered plugin with default settings.
pub fn attach(game: &mut Game, id: EntityId, plugin: &PluginId) {
    assert!(game
        .world_mut()
        .use_registered(id, plugin, Value::Null)
        .unwrap());
}

// =============================================================================
// Input
// =============================================================================

/// Broadcasts a key down.
pub fn press(game: &mut Game, key: Key) {
    game.world_mut()
        .emit(Event::new(EventName::KEY_DOWN).with(Payload::Key(key)));
}

/// Broadcasts a key up.
pub fn release(game: &mut Game, key: Key) {
    game.world_mut()
        .emit(Event::new(EventName::KEY_UP).with(Payload::Key(key)));
}

/// Broadcasts a pointer tap.
pub fn tap(game: &mut Game, point: Vec2) {
    game.world_mut()
        .emit(Event::new(EventName::POINTER_TAP).with(Payload::Point(point)));
}

/// Broadcasts a drag to `point`.
pub fn drag(game: &mut Game, point: Vec2) {
    game.world_mut()
        .emit(Event::new(EventName::TOUCH_MOVE).with(Payload::Point(point)));
}

/// Runs `frames` frames of [`FRAME_MS`].
#[allow(clippy::cast_precision_loss)]
pub fn run(game: &mut Game, clock: &ManualClock, frames: u32) {
    for _ in 0..frames {
        clock.advance(FRAME_MS);
        game.tick(FRAME_MS as f32);
    }
}

/// Runs frames until `done` holds or `limit` frames have passed; returns the
/// frames run.
#[allow(clippy::cast_precision_loss)]
pub fn run_until(game: &mut Game, clock: &ManualClock, limit: u32, done: impl Fn(&Game) -> bool) -> u32 {
    for frame in 0..limit {
        if done(game) {
            return frame;
        }
        clock.advance(FRAME_MS);
        game.tick(FRAME_MS as f32);
    }
    limit
}

// =============================================================================
// Physics probe
// =============================================================================

/// Forces recorded by a [`ForceProbe`].
pub type ForceLog = Rc<RefCell<Vec<(BodyHandle, Vec2)>>>;

/// Physics world wrapper that records `apply_force` calls.
pub struct ForceProbe {
    inner: KinematicWorld,
    log: ForceLog,
}

impl ForceProbe {
    /// Wraps `inner`.
    pub fn new(inner: KinematicWorld) -> Self {
        Self {
            inner,
            log: Rc::default(),
        }
    }

    /// Shared handle on the recorded forces.
    pub fn log(&self) -> ForceLog {
        Rc::clone(&self.log)
    }
}

impl PhysicsWorld for ForceProbe {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        self.inner.add_body(desc)
    }
    fn remove_body(&mut self, body: BodyHandle) -> bool {
        self.inner.remove_body(body)
    }
    fn contains(&self, body: BodyHandle) -> bool {
        self.inner.contains(body)
    }
    fn body_count(&self) -> usize {
        self.inner.body_count()
    }
    fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.inner.position(body)
    }
    fn velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.inner.velocity(body)
    }
    fn angle(&self, body: BodyHandle) -> Option<f32> {
        self.inner.angle(body)
    }
    fn bounds(&self, body: BodyHandle) -> Option<Aabb> {
        self.inner.bounds(body)
    }
    fn is_static(&self, body: BodyHandle) -> bool {
        self.inner.is_static(body)
    }
    fn set_position(&mut self, body: BodyHandle, position: Vec2) {
        self.inner.set_position(body, position);
    }
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        self.inner.set_velocity(body, velocity);
    }
    fn apply_force(&mut self, body: BodyHandle, force: Vec2) {
        self.log.borrow_mut().push((body, force));
        self.inner.apply_force(body, force);
    }
    fn set_static(&mut self, body: BodyHandle, fixed: bool) {
        self.inner.set_static(body, fixed);
    }
    fn step(&mut self, dt_ms: f32) -> Vec<CollisionPair> {
        self.inner.step(dt_ms)
    }
}

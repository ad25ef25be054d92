//! The world context.
//!
//! [`World`] owns everything the runtime shares: entities, the event bus,
//! the layer registry, the physics world, the clock, plugin side tables and
//! the plugin registry. Plugins and event handlers receive it as `&mut World`
//! and reach every other system through it.
//!
//! # Lifecycle of an entity
//!
//! - [`World::spawn`] creates the body, registers the entity as its owner,
//!   and installs two entity-scoped listeners: `animation` plays the
//!   requested animation, `cleanup` destroys the entity.
//! - [`World::use_plugin`] attaches behavior (idempotent by plugin id).
//! - [`World::update_entity`] syncs the visual from the body, then runs the
//!   plugin updaters in attachment order.
//! - [`World::destroy`] removes the body, leaves every layer (announcing
//!   each removal), stops listening, runs the garbage list and purges side
//!   tables. Calling it twice, or updating a destroyed entity, is a no-op.
//!
//! # Collision routing
//!
//! [`World::step_physics`] advances the physics world and routes each
//! collision-start pair whose bodies both have owners: first a `collision`
//! broadcast carrying the pair, then, for every layer the first entity
//! belongs to on which the second listens, the layer-named event targeted at
//! the listener with the first entity as payload, and the same the other way
//! round.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use glam::Vec2;
//! use scamper_core::entity::EntityDesc;
//! use scamper_core::names::LayerName;
//! use scamper_core::World;
//!
//! let mut world = World::headless();
//! let player = LayerName::new("player");
//!
//! let hero = world.spawn(EntityDesc::at(Vec2::new(100.0, 100.0), Vec2::splat(20.0)));
//! let npc = world.spawn(EntityDesc::at(Vec2::new(110.0, 100.0), Vec2::splat(20.0)));
//! world.add_to_layer(hero, &player);
//!
//! let greeted = Rc::new(Cell::new(false));
//! let flag = Rc::clone(&greeted);
//! world.on_layer(npc, &player, move |_, event| flag.set(event.entity() == Some(hero)));
//!
//! world.step_physics(1000.0 / 60.0);
//! assert!(greeted.get());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use glam::Vec2;
use serde_json::Value;
use tracing::debug;

use crate::bus::{self, BusConfig, BusHost, Dispatch, EventBus, SubscriptionId};
use crate::clock::{Clock, SystemClock};
use crate::entity::{Cleanup, Entity, EntityDesc, EntityId, EntityOptions};
use crate::error::{CoreError, Result};
use crate::events::{Event, Payload};
use crate::layer::LayerRegistry;
use crate::names::{AnimationName, EventName, LayerName};
use crate::physics::{Aabb, BodyHandle, KinematicWorld, PhysicsWorld};
use crate::plugin::{Plugin, PluginId, PluginRegistry};
use crate::side::{SideTable, SideTables};
use crate::visual::{Frames, Visual};

/// Playfield used when none is configured.
pub const DEFAULT_PLAYFIELD: Vec2 = Vec2::new(800.0, 600.0);

/// Shared game-world context.
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u64,
    bus: EventBus<World>,
    layers: LayerRegistry,
    physics: Box<dyn PhysicsWorld>,
    body_owner: HashMap<BodyHandle, EntityId>,
    clock: Rc<dyn Clock>,
    playfield: Vec2,
    side: SideTables,
    plugins: PluginRegistry,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("next_id", &self.next_id)
            .field("bus", &self.bus)
            .field("layers", &self.layers.len())
            .field("bodies", &self.physics.body_count())
            .field("playfield", &self.playfield)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

impl BusHost for World {
    fn bus_mut(&mut self) -> &mut EventBus<Self> {
        &mut self.bus
    }

    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new(bus: BusConfig, physics: Box<dyn PhysicsWorld>, clock: Rc<dyn Clock>, playfield: Vec2) -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 0,
            bus: EventBus::new(bus),
            layers: LayerRegistry::new(),
            physics,
            body_owner: HashMap::new(),
            clock,
            playfield,
            side: SideTables::default(),
            plugins: PluginRegistry::new(),
        }
    }

    /// A world with default settings, the kinematic physics world and the
    /// system clock.
    #[must_use]
    pub fn headless() -> Self {
        Self::new(
            BusConfig::default(),
            Box::new(KinematicWorld::default()),
            Rc::new(SystemClock::new()),
            DEFAULT_PLAYFIELD,
        )
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Spawns an entity and its body.
    pub fn spawn(&mut self, desc: EntityDesc) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;

        let body = self.physics.add_body(desc.body);
        self.body_owner.insert(body, id);
        self.entities.insert(id, Entity::new(id, body, Visual::with_idle(desc.idle)));

        self.on_entity(id, EventName::ANIMATION, move |world, event| {
            world.apply_animation(id, event);
        });
        self.on_entity(id, EventName::CLEANUP, move |world, _| {
            world.destroy(id);
        });

        debug!(entity = %id, body = body.as_u64(), "entity spawned");
        id
    }

    /// Destroys an entity. Returns false if it was already gone.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        let Some(mut entity) = self.entities.remove(&id) else {
            return false;
        };

        self.physics.remove_body(entity.body());
        self.body_owner.remove(&entity.body());

        for layer in std::mem::take(&mut entity.layers) {
            if self.layers.remove(&layer, id) {
                self.announce(EventName::ENTITY_REMOVED, layer, id);
            }
        }
        self.layers.unlisten_everywhere(id);

        for cleanup in std::mem::take(&mut entity.garbage) {
            self.run_cleanup(id, cleanup);
        }
        self.side.purge(id);

        debug!(entity = %id, "entity destroyed");
        true
    }

    /// Whether the entity exists.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Live entity ids in ascending order.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Syncs the visual from the body, then runs the plugin updaters.
    ///
    /// Does nothing for a destroyed entity. Stops early if an updater
    /// destroys the entity.
    pub fn update_entity(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        let body = entity.body();
        let updaters = entity.updaters.clone();

        if let Some(position) = self.physics.position(body) {
            let angle = self.physics.angle(body).unwrap_or_default();
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.visual.sync(position, angle);
            }
        }

        for plugin in updaters {
            if !self.is_alive(id) {
                break;
            }
            plugin.update(self, id);
        }
    }

    /// Applies a bulk update. Returns false for a destroyed entity.
    pub fn set(&mut self, id: EntityId, options: EntityOptions) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        entity.settings.extend(options.settings);
        let body = entity.body();

        if let Some(fixed) = options.fixed {
            self.physics.set_static(body, fixed);
        }
        if let Some(position) = options.position {
            self.physics.set_position(body, position);
        }
        if let Some(velocity) = options.velocity {
            self.physics.set_velocity(body, velocity);
        }
        true
    }

    // =========================================================================
    // Plugins
    // =========================================================================

    /// Attaches a plugin.
    ///
    /// Stores `settings` under the plugin id, calls `init`, registers the
    /// updater, then subscribes the plugin's events with their unsubscribes
    /// put on the garbage list. Returns false, changing nothing, if a plugin
    /// with the same id is already attached or the entity is gone.
    pub fn use_plugin(&mut self, id: EntityId, plugin: Rc<dyn Plugin>, settings: Value) -> bool {
        let plugin_id = plugin.id();
        let Some(entity) = self.entities.get_mut(&id) else {
            debug!(entity = %id, plugin = %plugin_id, "plugin attach on missing entity ignored");
            return false;
        };
        if entity.has_plugin(&plugin_id) {
            debug!(entity = %id, plugin = %plugin_id, "plugin already attached; ignored");
            return false;
        }
        entity.plugins.push(plugin_id.clone());
        entity.settings.insert(plugin_id.clone(), settings.clone());

        plugin.init(self, id, &settings);

        if plugin.has_update() {
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.updaters.push(Rc::clone(&plugin));
            }
        }
        for name in plugin.events() {
            let handler = Rc::clone(&plugin);
            self.on_entity(id, name, move |world, event| handler.on_event(world, id, event));
        }

        debug!(entity = %id, plugin = %plugin_id, "plugin attached");
        true
    }

    /// Attaches a plugin from the registry by id.
    ///
    /// # Errors
    ///
    /// [`CoreError::EntityNotFound`] for a destroyed entity,
    /// [`CoreError::UnknownPlugin`] if the id is not registered.
    pub fn use_registered(&mut self, id: EntityId, plugin: &PluginId, settings: Value) -> Result<bool> {
        if !self.is_alive(id) {
            return Err(CoreError::EntityNotFound(id));
        }
        let plugin = self.plugins.get(plugin)?;
        Ok(self.use_plugin(id, plugin, settings))
    }

    /// Makes a plugin attachable by id.
    pub fn register_plugin(&mut self, plugin: Rc<dyn Plugin>) {
        self.plugins.register(plugin);
    }

    /// Registered plugins.
    #[must_use]
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Whether `plugin` is attached to the entity.
    #[must_use]
    pub fn has_plugin(&self, id: EntityId, plugin: &PluginId) -> bool {
        self.entities.get(&id).is_some_and(|e| e.has_plugin(plugin))
    }

    /// Side table for state type `T`, if anything was stored in it.
    #[must_use]
    pub fn side<T: 'static>(&self) -> Option<&SideTable<T>> {
        self.side.table::<T>()
    }

    /// Side table for state type `T`.
    pub fn side_mut<T: 'static>(&mut self) -> &mut SideTable<T> {
        self.side.table_mut::<T>()
    }

    /// State of type `T` kept for `id`.
    #[must_use]
    pub fn state<T: 'static>(&self, id: EntityId) -> Option<&T> {
        self.side.get::<T>(id)
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Emits an event synchronously.
    pub fn emit(&mut self, event: Event) -> Dispatch {
        bus::emit(self, event)
    }

    /// Subscribes to every event named `name`.
    pub fn on(&mut self, name: EventName, handler: impl Fn(&mut World, &Event) + 'static) -> SubscriptionId {
        self.bus.on(name, None, Rc::new(handler))
    }

    /// Subscribes on behalf of an entity.
    ///
    /// The handler sees broadcasts and events targeted at `id`, and is
    /// unsubscribed when the entity is destroyed. Returns `None` for a
    /// destroyed entity.
    pub fn on_entity(
        &mut self,
        id: EntityId,
        name: EventName,
        handler: impl Fn(&mut World, &Event) + 'static,
    ) -> Option<SubscriptionId> {
        if !self.is_alive(id) {
            return None;
        }
        let sub = self.bus.on(name, Some(id), Rc::new(handler));
        self.gc(id, Cleanup::Unsubscribe(sub));
        Some(sub)
    }

    /// Removes a subscription.
    pub fn off(&mut self, sub: SubscriptionId) -> bool {
        self.bus.off(sub)
    }

    /// Queues cleanup for when the entity is destroyed.
    ///
    /// If the entity is already gone the cleanup runs immediately and false
    /// is returned.
    pub fn gc(&mut self, id: EntityId, cleanup: Cleanup) -> bool {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.garbage.push(cleanup);
            true
        } else {
            self.run_cleanup(id, cleanup);
            false
        }
    }

    /// The event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus<World> {
        &self.bus
    }

    fn run_cleanup(&mut self, id: EntityId, cleanup: Cleanup) {
        match cleanup {
            Cleanup::Unsubscribe(sub) => {
                self.bus.off(sub);
            }
            Cleanup::Unlisten(layer) => {
                self.layers.unlisten(&layer, id);
            }
            Cleanup::Callback(f) => f(self),
        }
    }

    fn announce(&mut self, name: EventName, layer: LayerName, entity: EntityId) {
        self.emit(Event::new(name).with(Payload::Membership { layer, entity }));
    }

    // =========================================================================
    // Layers
    // =========================================================================

    /// Adds the entity to a layer. Returns false if it was already a member
    /// or is destroyed.
    pub fn add_to_layer(&mut self, id: EntityId, layer: &LayerName) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        if !self.layers.add(layer, id) {
            return false;
        }
        entity.layers.push(layer.clone());
        debug!(entity = %id, layer = %layer, "joined layer");
        self.announce(EventName::ENTITY_ADDED, layer.clone(), id);
        true
    }

    /// Adds the entity to several layers; returns how many it joined.
    pub fn add_to_layers(&mut self, id: EntityId, layers: &[LayerName]) -> usize {
        layers.iter().filter(|layer| self.add_to_layer(id, layer)).count()
    }

    /// Removes the entity from a layer. Returns false if it was not a member.
    pub fn remove_from_layer(&mut self, id: EntityId, layer: &LayerName) -> bool {
        if !self.layers.remove(layer, id) {
            return false;
        }
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.layers.retain(|l| l != layer);
        }
        debug!(entity = %id, layer = %layer, "left layer");
        self.announce(EventName::ENTITY_REMOVED, layer.clone(), id);
        true
    }

    /// Removes the entity from every layer; returns how many it left.
    pub fn remove_from_all_layers(&mut self, id: EntityId) -> usize {
        let layers = self.entities.get(&id).map(|e| e.layers.clone()).unwrap_or_default();
        layers.iter().filter(|layer| self.remove_from_layer(id, layer)).count()
    }

    /// Registers the entity as a collision listener on a layer.
    pub fn listen(&mut self, id: EntityId, layer: &LayerName) -> bool {
        self.is_alive(id) && self.layers.listen(layer, id)
    }

    /// Stops listening on a layer.
    pub fn unlisten(&mut self, id: EntityId, layer: &LayerName) -> bool {
        self.layers.unlisten(layer, id)
    }

    /// Listens on `layer` and subscribes `handler` to its deliveries.
    ///
    /// The handler receives the colliding member as [`Event::entity`].
    /// Returns `None` for a dead entity or one already listening on `layer`;
    /// the first handler stays the only one.
    pub fn on_layer(
        &mut self,
        id: EntityId,
        layer: &LayerName,
        handler: impl Fn(&mut World, &Event) + 'static,
    ) -> Option<SubscriptionId> {
        if !self.listen(id, layer) {
            debug!(entity = %id, layer = %layer, "already listening; handler not added");
            return None;
        }
        self.gc(id, Cleanup::Unlisten(layer.clone()));
        self.on_entity(id, EventName::from(layer), handler)
    }

    /// Members of a layer; empty if the layer does not exist.
    #[must_use]
    pub fn layer_entities(&self, layer: &LayerName) -> &[EntityId] {
        self.layers.entities(layer)
    }

    /// Listeners of a layer; empty if the layer does not exist.
    #[must_use]
    pub fn layer_listeners(&self, layer: &LayerName) -> &[EntityId] {
        self.layers.listeners(layer)
    }

    /// Whether the entity is a member of the layer.
    #[must_use]
    pub fn is_in_layer(&self, id: EntityId, layer: &LayerName) -> bool {
        self.layers.has(layer, id)
    }

    /// The layer registry.
    #[must_use]
    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    fn body(&self, id: EntityId) -> Option<BodyHandle> {
        self.entities.get(&id).map(Entity::body)
    }

    /// Body position.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec2> {
        self.body(id).and_then(|b| self.physics.position(b))
    }

    /// Body velocity.
    #[must_use]
    pub fn velocity(&self, id: EntityId) -> Option<Vec2> {
        self.body(id).and_then(|b| self.physics.velocity(b))
    }

    /// Body bounds.
    #[must_use]
    pub fn bounds(&self, id: EntityId) -> Option<Aabb> {
        self.body(id).and_then(|b| self.physics.bounds(b))
    }

    /// Whether the body is static.
    #[must_use]
    pub fn is_static(&self, id: EntityId) -> bool {
        self.body(id).is_some_and(|b| self.physics.is_static(b))
    }

    /// Teleports the body.
    pub fn set_position(&mut self, id: EntityId, position: Vec2) {
        if let Some(body) = self.body(id) {
            self.physics.set_position(body, position);
        }
    }

    /// Overwrites the body velocity.
    pub fn set_velocity(&mut self, id: EntityId, velocity: Vec2) {
        if let Some(body) = self.body(id) {
            self.physics.set_velocity(body, velocity);
        }
    }

    /// Pushes the body for the next physics step.
    pub fn apply_force(&mut self, id: EntityId, force: Vec2) {
        if let Some(body) = self.body(id) {
            self.physics.apply_force(body, force);
        }
    }

    /// The physics world.
    #[must_use]
    pub fn physics(&self) -> &dyn PhysicsWorld {
        self.physics.as_ref()
    }

    /// Entity owning a body, if any.
    #[must_use]
    pub fn owner_of(&self, body: BodyHandle) -> Option<EntityId> {
        self.body_owner.get(&body).copied()
    }

    /// Advances physics by `dt_ms` and routes collision starts.
    pub fn step_physics(&mut self, dt_ms: f32) {
        for pair in self.physics.step(dt_ms) {
            let (Some(a), Some(b)) = (self.owner_of(pair.a), self.owner_of(pair.b)) else {
                continue;
            };
            self.route_collision(a, b);
        }
    }

    fn route_collision(&mut self, a: EntityId, b: EntityId) {
        self.emit(Event::new(EventName::COLLISION).with(Payload::Collision { a, b }));
        self.deliver_to_listeners(a, b);
        self.deliver_to_listeners(b, a);
    }

    /// Sends one layer event to `listener` per layer of `member` it listens on.
    fn deliver_to_listeners(&mut self, member: EntityId, listener: EntityId) {
        let layers = match self.entities.get(&member) {
            Some(entity) => entity.layers.clone(),
            None => return,
        };
        for layer in layers {
            if !self.is_alive(listener) {
                return;
            }
            if self.layers.is_listener(&layer, listener) {
                self.emit(
                    Event::new(EventName::from(&layer))
                        .to(listener)
                        .with(Payload::Entity(member)),
                );
            }
        }
    }

    // =========================================================================
    // Visuals
    // =========================================================================

    /// Visual state of an entity.
    #[must_use]
    pub fn visual(&self, id: EntityId) -> Option<&Visual> {
        self.entities.get(&id).map(Entity::visual)
    }

    /// Registers an animation on an entity.
    pub fn animate(&mut self, id: EntityId, name: AnimationName, frames: Frames) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) => {
                entity.visual.animate(name, frames);
                true
            }
            None => false,
        }
    }

    /// Plays an animation. False if unknown, already playing, or the entity
    /// is gone.
    pub fn play_animation(&mut self, id: EntityId, name: &AnimationName) -> bool {
        self.entities.get_mut(&id).is_some_and(|e| e.visual.play(name))
    }

    fn apply_animation(&mut self, id: EntityId, event: &Event) {
        let Payload::Animation { name, mirror } = &event.payload else {
            return;
        };
        if let Some(entity) = self.entities.get_mut(&id) {
            if let Some(mirror) = mirror {
                entity.visual.set_mirrored(*mirror);
            }
            entity.visual.play(name);
        }
    }

    // =========================================================================
    // Environment
    // =========================================================================

    /// Current clock reading.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Playfield size; the playfield spans `(0, 0)` to this corner.
    #[must_use]
    pub fn playfield(&self) -> Vec2 {
        self.playfield
    }

    /// Resizes the playfield.
    pub fn set_playfield(&mut self, size: Vec2) {
        self.playfield = size;
    }

    /// Whether `point` lies on the playfield, edges included.
    #[must_use]
    pub fn in_playfield(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.playfield.x && point.y <= self.playfield.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::clock::ManualClock;
    use crate::physics::BodyDesc;

    fn world() -> World {
        World::new(
            BusConfig::default(),
            Box::new(KinematicWorld::default()),
            Rc::new(ManualClock::new()),
            DEFAULT_PLAYFIELD,
        )
    }

    fn boxed(world: &mut World, x: f32) -> EntityId {
        world.spawn(EntityDesc::at(Vec2::new(x, 100.0), Vec2::splat(20.0)))
    }

    fn record(world: &mut World, name: EventName) -> Rc<RefCell<Vec<Event>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        world.on(name, move |_, event| sink.borrow_mut().push(event.clone()));
        log
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn spawn_assigns_increasing_ids() {
            let mut w = world();
            let a = boxed(&mut w, 0.0);
            let b = boxed(&mut w, 50.0);
            assert!(a < b);
            assert_eq!(w.entity_ids(), vec![a, b]);
            assert_eq!(w.physics().body_count(), 2);
        }

        #[test]
        fn destroy_is_idempotent_and_releases_everything() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            let body = w.entity(id).unwrap().body();
            w.add_to_layer(id, &LayerName::ENTITIES);
            w.listen(id, &LayerName::new("npc"));

            assert!(w.destroy(id));
            assert!(!w.destroy(id));

            assert!(!w.physics().contains(body));
            assert!(w.owner_of(body).is_none());
            assert!(w.layer_entities(&LayerName::ENTITIES).is_empty());
            assert!(w.layer_listeners(&LayerName::new("npc")).is_empty());
            assert_eq!(w.bus().subscriber_count(&EventName::ANIMATION), 0);
            w.update_entity(id);
        }

        #[test]
        fn destroy_announces_layer_removal() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            w.add_to_layers(id, &[LayerName::ENTITIES, LayerName::new("walls")]);
            let removed = record(&mut w, EventName::ENTITY_REMOVED);

            w.destroy(id);

            let layers: Vec<_> = removed
                .borrow()
                .iter()
                .map(|e| match &e.payload {
                    Payload::Membership { layer, .. } => layer.as_str().to_owned(),
                    _ => String::new(),
                })
                .collect();
            assert_eq!(layers, vec!["entities", "walls"]);
        }

        #[test]
        fn cleanup_event_destroys_entities() {
            let mut w = world();
            let a = boxed(&mut w, 0.0);
            let b = boxed(&mut w, 50.0);
            w.emit(Event::new(EventName::CLEANUP));
            assert!(!w.is_alive(a));
            assert!(!w.is_alive(b));
        }

        #[test]
        fn garbage_callbacks_run_once_on_destroy() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            let runs = Rc::new(RefCell::new(0));
            let counter = Rc::clone(&runs);
            w.gc(id, Cleanup::Callback(Box::new(move |_| *counter.borrow_mut() += 1)));
            w.destroy(id);
            w.destroy(id);
            assert_eq!(*runs.borrow(), 1);
        }

        #[test]
        fn set_applies_only_given_fields() {
            let mut w = world();
            let id = boxed(&mut w, 10.0);
            w.set(
                id,
                EntityOptions {
                    velocity: Some(Vec2::new(1.0, 0.0)),
                    fixed: Some(false),
                    ..EntityOptions::default()
                },
            );
            assert_eq!(w.position(id), Some(Vec2::new(10.0, 100.0)));
            assert_eq!(w.velocity(id), Some(Vec2::new(1.0, 0.0)));
        }
    }

    mod layer_tests {
        use super::*;

        #[test]
        fn membership_is_mirrored_on_the_entity() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            let walls = LayerName::new("walls");

            assert!(w.add_to_layer(id, &walls));
            assert!(!w.add_to_layer(id, &walls));
            assert_eq!(w.entity(id).unwrap().layers(), &[walls.clone()]);
            assert!(w.is_in_layer(id, &walls));

            assert!(w.remove_from_layer(id, &walls));
            assert!(!w.remove_from_layer(id, &walls));
            assert!(w.entity(id).unwrap().layers().is_empty());
        }

        #[test]
        fn notifications_only_on_change() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            let added = record(&mut w, EventName::ENTITY_ADDED);

            w.add_to_layer(id, &LayerName::ENTITIES);
            w.add_to_layer(id, &LayerName::ENTITIES);

            assert_eq!(added.borrow().len(), 1);
            assert_eq!(added.borrow()[0].entity(), Some(id));
        }

        #[test]
        fn remove_from_all_layers_counts() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            w.add_to_layers(id, &[LayerName::new("a"), LayerName::new("b")]);
            assert_eq!(w.remove_from_all_layers(id), 2);
            assert_eq!(w.remove_from_all_layers(id), 0);
        }
    }

    mod collision_tests {
        use super::*;

        fn player() -> LayerName {
            LayerName::new("player")
        }

        #[test]
        fn generic_collision_is_broadcast() {
            let mut w = world();
            let a = boxed(&mut w, 100.0);
            let b = boxed(&mut w, 110.0);
            let hits = record(&mut w, EventName::COLLISION);

            w.step_physics(16.0);

            assert_eq!(hits.borrow().len(), 1);
            assert!(hits.borrow()[0].involves(a));
            assert!(hits.borrow()[0].involves(b));
        }

        #[test]
        fn layer_delivery_reaches_only_listeners() {
            let mut w = world();
            let hero = boxed(&mut w, 100.0);
            let npc = boxed(&mut w, 110.0);
            let bystander = boxed(&mut w, 400.0);
            w.add_to_layer(hero, &player());

            let seen = Rc::new(RefCell::new(Vec::new()));
            for id in [npc, bystander] {
                let sink = Rc::clone(&seen);
                w.on_layer(id, &player(), move |_, e| sink.borrow_mut().push((id, e.entity())));
            }

            w.step_physics(16.0);

            assert_eq!(*seen.borrow(), vec![(npc, Some(hero))]);
        }

        #[test]
        fn non_members_do_not_trigger_layer_events() {
            let mut w = world();
            let a = boxed(&mut w, 100.0);
            let b = boxed(&mut w, 110.0);
            w.listen(b, &player());
            let deliveries = record(&mut w, EventName::from(&player()));

            w.step_physics(16.0);

            assert!(deliveries.borrow().is_empty());
            assert!(!w.is_in_layer(a, &player()));
        }

        #[test]
        fn every_member_hitting_one_listener_is_delivered() {
            let mut w = world();
            let first = boxed(&mut w, 100.0);
            let npc = boxed(&mut w, 115.0);
            let second = boxed(&mut w, 130.0);
            w.add_to_layers(first, &[player()]);
            w.add_to_layer(second, &player());

            let seen = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&seen);
            w.on_layer(npc, &player(), move |_, e| sink.borrow_mut().extend(e.entity()));

            w.step_physics(16.0);

            let mut seen = seen.borrow().clone();
            seen.sort();
            assert_eq!(seen, vec![first, second]);
            assert_eq!(w.bus().stats().throttled, 0);
        }

        #[test]
        fn repeated_delivery_of_one_pair_is_throttled() {
            let mut w = world();
            let hero = boxed(&mut w, 100.0);
            let npc = boxed(&mut w, 110.0);
            w.listen(npc, &player());
            let deliveries = record(&mut w, EventName::from(&player()));
            let delivery = Event::new(EventName::from(&player()))
                .to(npc)
                .with(Payload::Entity(hero));

            w.emit(delivery.clone());
            w.emit(delivery);

            assert_eq!(deliveries.borrow().len(), 1);
        }

        #[test]
        fn second_layer_handler_is_refused() {
            let mut w = world();
            let hero = boxed(&mut w, 100.0);
            let npc = boxed(&mut w, 110.0);
            w.add_to_layer(hero, &player());

            let count = Rc::new(RefCell::new(0));
            let sink = Rc::clone(&count);
            assert!(w.on_layer(npc, &player(), move |_, _| *sink.borrow_mut() += 1).is_some());
            let garbage = w.entity(npc).map(Entity::garbage_len);
            let sink = Rc::clone(&count);
            assert!(w.on_layer(npc, &player(), move |_, _| *sink.borrow_mut() += 1).is_none());
            assert_eq!(w.entity(npc).map(Entity::garbage_len), garbage);

            w.step_physics(16.0);

            assert_eq!(*count.borrow(), 1);
        }

        #[test]
        fn ownerless_bodies_are_ignored() {
            let mut w = world();
            let _a = boxed(&mut w, 100.0);
            let hits = record(&mut w, EventName::COLLISION);
            w.physics.add_body(BodyDesc::new(Vec2::new(105.0, 100.0), Vec2::splat(20.0)).fixed());

            w.step_physics(16.0);

            assert!(hits.borrow().is_empty());
        }
    }

    mod plugin_tests {
        use super::*;

        struct Counter {
            log: Rc<RefCell<Vec<&'static str>>>,
            tag: &'static str,
        }

        impl Plugin for Counter {
            fn id(&self) -> PluginId {
                PluginId::from_static(self.tag)
            }
            fn events(&self) -> Vec<EventName> {
                vec![EventName::new("poke")]
            }
            fn has_update(&self) -> bool {
                true
            }
            fn update(&self, _world: &mut World, _entity: EntityId) {
                self.log.borrow_mut().push(self.tag);
            }
            fn on_event(&self, _world: &mut World, _entity: EntityId, _event: &Event) {
                self.log.borrow_mut().push("poked");
            }
        }

        #[test]
        fn double_attach_registers_once() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            let log = Rc::new(RefCell::new(Vec::new()));
            let plugin = Rc::new(Counter { log: Rc::clone(&log), tag: "counter" });

            assert!(w.use_plugin(id, plugin.clone(), Value::Null));
            assert!(!w.use_plugin(id, plugin, Value::Null));

            w.update_entity(id);
            w.emit(Event::new(EventName::new("poke")));

            assert_eq!(*log.borrow(), vec!["counter", "poked"]);
            assert_eq!(w.entity(id).unwrap().updater_count(), 1);
        }

        #[test]
        fn updaters_run_in_attachment_order() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            let log = Rc::new(RefCell::new(Vec::new()));
            for tag in ["first", "second"] {
                w.use_plugin(id, Rc::new(Counter { log: Rc::clone(&log), tag }), Value::Null);
            }
            w.update_entity(id);
            assert_eq!(*log.borrow(), vec!["first", "second"]);
        }

        #[test]
        fn plugin_subscriptions_end_with_the_entity() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            let log = Rc::new(RefCell::new(Vec::new()));
            w.use_plugin(id, Rc::new(Counter { log: Rc::clone(&log), tag: "c" }), Value::Null);

            w.destroy(id);
            w.emit(Event::new(EventName::new("poke")));

            assert!(log.borrow().is_empty());
        }

        #[test]
        fn registered_attach_reports_lookup_misses() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            assert!(matches!(
                w.use_registered(id, &PluginId::new("ghost"), Value::Null),
                Err(CoreError::UnknownPlugin(_))
            ));
            w.destroy(id);
            assert!(matches!(
                w.use_registered(id, &PluginId::new("ghost"), Value::Null),
                Err(CoreError::EntityNotFound(missing)) if missing == id
            ));
        }

        #[test]
        fn animation_event_plays_and_mirrors() {
            let mut w = world();
            let id = boxed(&mut w, 0.0);
            w.animate(id, AnimationName::MOVING, Frames::from("run"));
            w.emit(
                Event::new(EventName::ANIMATION)
                    .to(id)
                    .with(Payload::Animation { name: AnimationName::MOVING, mirror: Some(true) }),
            );
            let visual = w.visual(id).unwrap();
            assert_eq!(visual.current(), Some(&AnimationName::MOVING));
            assert!(visual.is_mirrored());
        }
    }
}

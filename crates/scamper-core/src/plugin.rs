//! Plugins: named, stateless bundles of entity behavior.
//!
//! A plugin has up to three hooks, all optional:
//!
//! - `init`, called once when the plugin is attached to an entity, with the
//!   settings blob supplied at attach time;
//! - `update`, called every tick for each entity it is attached to, in
//!   attachment order, when [`Plugin::has_update`] is true;
//! - `on_event`, called for every event named in [`Plugin::events`] that
//!   reaches the entity (broadcasts, or events targeted at it).
//!
//! Plugins hold no per-entity state. Anything that must survive between
//! calls goes into a [`SideTable`](crate::side::SideTable) on the world,
//! keyed by entity, and is dropped with the entity.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use glam::Vec2;
//! use scamper_core::entity::{EntityDesc, EntityId};
//! use scamper_core::events::Event;
//! use scamper_core::names::EventName;
//! use scamper_core::plugin::{Plugin, PluginId};
//! use scamper_core::World;
//!
//! struct Jump;
//!
//! impl Plugin for Jump {
//!     fn id(&self) -> PluginId {
//!         PluginId::new("jump")
//!     }
//!     fn events(&self) -> Vec<EventName> {
//!         vec![EventName::KEY_DOWN]
//!     }
//!     fn on_event(&self, world: &mut World, entity: EntityId, _event: &Event) {
//!         world.set_velocity(entity, Vec2::new(0.0, -4.0));
//!     }
//! }
//!
//! let mut world = World::headless();
//! let hero = world.spawn(EntityDesc::default());
//! assert!(world.use_plugin(hero, Rc::new(Jump), serde_json::Value::Null));
//! assert!(!world.use_plugin(hero, Rc::new(Jump), serde_json::Value::Null)); // idempotent
//! ```

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::entity::EntityId;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::names::EventName;
use crate::world::World;

pub use crate::names::PluginId;

// =============================================================================
// Plugin Trait
// =============================================================================

/// Behavior attachable to entities.
///
/// Every hook has a no-op default; implement the ones the plugin needs.
pub trait Plugin {
    /// Unique name. Attaching a second plugin with the same id to one entity
    /// is ignored.
    fn id(&self) -> PluginId;

    /// Events this plugin handles through [`Plugin::on_event`].
    fn events(&self) -> Vec<EventName> {
        Vec::new()
    }

    /// Whether [`Plugin::update`] should run every tick.
    fn has_update(&self) -> bool {
        false
    }

    /// Called once on attach.
    fn init(&self, _world: &mut World, _entity: EntityId, _settings: &Value) {}

    /// Called every tick while attached.
    fn update(&self, _world: &mut World, _entity: EntityId) {}

    /// Called for each subscribed event that reaches the entity.
    fn on_event(&self, _world: &mut World, _entity: EntityId, _event: &Event) {}
}

// =============================================================================
// Plugin Registry
// =============================================================================

/// Plugins known by id, so entities can attach them by name.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<PluginId, Rc<dyn Plugin>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.plugins.keys()).finish()
    }
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin` under its own id, replacing any previous holder.
    pub fn register(&mut self, plugin: Rc<dyn Plugin>) {
        self.plugins.insert(plugin.id(), plugin);
    }

    /// Looks up a plugin.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownPlugin`] if nothing is registered under `id`.
    pub fn get(&self, id: &PluginId) -> Result<Rc<dyn Plugin>> {
        self.plugins
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownPlugin(id.clone()))
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &PluginId> + '_ {
        self.plugins.keys()
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Decodes a settings blob, merging it over `T::default()`.
///
/// `null` yields the defaults. `T` should carry `#[serde(default)]` so a
/// partial object only overrides the fields it names.
///
/// # Errors
///
/// [`CoreError::InvalidSettings`] if the blob does not fit `T`.
pub fn decode_settings<T: DeserializeOwned + Default>(plugin: &PluginId, blob: &Value) -> Result<T> {
    if blob.is_null() {
        return Ok(T::default());
    }
    T::deserialize(blob).map_err(|source| CoreError::InvalidSettings {
        plugin: plugin.clone(),
        source,
    })
}

/// Like [`decode_settings`], but logs a rejected blob and falls back to the
/// defaults.
pub fn settings_or_default<T: DeserializeOwned + Default>(plugin: &PluginId, blob: &Value) -> T {
    decode_settings(plugin, blob).unwrap_or_else(|err| {
        warn!(plugin = %plugin, error = %err, "plugin settings rejected; using defaults");
        T::default()
    })
}

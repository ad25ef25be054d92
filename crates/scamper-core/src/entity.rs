//! Entity types.
//!
//! An [`Entity`] pairs a physics body with a [`Visual`], and records which
//! layers it belongs to, which plugins are attached (with their settings),
//! the per-tick updaters those plugins contributed, and the cleanup work to
//! run when it is destroyed.
//!
//! Entities live inside the [`World`](crate::world::World); everything that
//! touches the bus, the layers or the physics world goes through it.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use scamper_core::entity::{EntityDesc, EntityId};
//! use scamper_core::physics::BodyDesc;
//! use scamper_core::World;
//!
//! let mut world = World::headless();
//! let crate_id = world.spawn(EntityDesc {
//!     body: BodyDesc::new(Vec2::new(64.0, 64.0), Vec2::splat(32.0)).fixed(),
//!     ..EntityDesc::default()
//! });
//!
//! assert_eq!(crate_id, EntityId::new(0));
//! assert_eq!(world.position(crate_id), Some(Vec2::new(64.0, 64.0)));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bus::SubscriptionId;
use crate::names::LayerName;
use crate::physics::{BodyDesc, BodyHandle};
use crate::plugin::{Plugin, PluginId};
use crate::visual::{Frames, Visual};
use crate::world::World;

// =============================================================================
// Entity ID
// =============================================================================

/// Unique identifier for an entity.
///
/// Ids are handed out in increasing order and never reused within a world.
///
/// # Example
///
/// ```
/// use scamper_core::entity::EntityId;
///
/// let id1 = EntityId::new(1);
/// let id2 = EntityId::new(2);
///
/// assert!(id1 < id2);
/// assert_eq!(id1.as_u64(), 1);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an `EntityId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

// =============================================================================
// Construction
// =============================================================================

/// Everything needed to spawn an entity.
#[derive(Debug, Clone)]
pub struct EntityDesc {
    /// Body to create in the physics world
    pub body: BodyDesc,
    /// Textures for the `idle` animation, played immediately
    pub idle: Frames,
}

impl Default for EntityDesc {
    fn default() -> Self {
        Self {
            body: BodyDesc::default(),
            idle: Frames::Sequence(Vec::new()),
        }
    }
}

impl EntityDesc {
    /// A dynamic body of `size` centered on `position`.
    #[must_use]
    pub fn at(position: Vec2, size: Vec2) -> Self {
        Self {
            body: BodyDesc::new(position, size),
            ..Self::default()
        }
    }
}

/// Bulk update applied with [`World::set`].
///
/// Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityOptions {
    /// Teleport to this position
    pub position: Option<Vec2>,
    /// Overwrite velocity
    pub velocity: Option<Vec2>,
    /// Make the body static or dynamic
    #[serde(rename = "static")]
    pub fixed: Option<bool>,
    /// Replace stored settings for these plugins
    pub settings: HashMap<PluginId, Value>,
}

// =============================================================================
// Cleanup
// =============================================================================

/// Work deferred until the entity is destroyed.
pub enum Cleanup {
    /// Drop a bus subscription.
    Unsubscribe(SubscriptionId),
    /// Stop listening on a layer.
    Unlisten(LayerName),
    /// Run arbitrary code against the world.
    Callback(Box<dyn FnOnce(&mut World)>),
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsubscribe(id) => f.debug_tuple("Unsubscribe").field(id).finish(),
            Self::Unlisten(layer) => f.debug_tuple("Unlisten").field(layer).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

// =============================================================================
// Entity
// =============================================================================

/// A composed game object.
pub struct Entity {
    id: EntityId,
    body: BodyHandle,
    pub(crate) visual: Visual,
    pub(crate) layers: Vec<LayerName>,
    pub(crate) plugins: Vec<PluginId>,
    pub(crate) settings: HashMap<PluginId, Value>,
    pub(crate) updaters: Vec<Rc<dyn Plugin>>,
    pub(crate) garbage: Vec<Cleanup>,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("body", &self.body)
            .field("visual", &self.visual.current())
            .field("layers", &self.layers)
            .field("plugins", &self.plugins)
            .field("updaters", &self.updaters.len())
            .field("garbage", &self.garbage.len())
            .finish()
    }
}

impl Entity {
    pub(crate) fn new(id: EntityId, body: BodyHandle, visual: Visual) -> Self {
        Self {
            id,
            body,
            visual,
            layers: Vec::new(),
            plugins: Vec::new(),
            settings: HashMap::new(),
            updaters: Vec::new(),
            garbage: Vec::new(),
        }
    }

    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Handle of the owned physics body.
    #[must_use]
    pub const fn body(&self) -> BodyHandle {
        self.body
    }

    /// Visual state.
    #[must_use]
    pub fn visual(&self) -> &Visual {
        &self.visual
    }

    /// Layers this entity is a member of, in the order it joined them.
    #[must_use]
    pub fn layers(&self) -> &[LayerName] {
        &self.layers
    }

    /// Attached plugin ids, in attachment order.
    #[must_use]
    pub fn plugins(&self) -> &[PluginId] {
        &self.plugins
    }

    /// Whether a plugin with this id is attached.
    #[must_use]
    pub fn has_plugin(&self, id: &PluginId) -> bool {
        self.plugins.contains(id)
    }

    /// Settings stored for a plugin.
    #[must_use]
    pub fn settings(&self, plugin: &PluginId) -> Option<&Value> {
        self.settings.get(plugin)
    }

    /// Number of per-tick updaters.
    #[must_use]
    pub fn updater_count(&self) -> usize {
        self.updaters.len()
    }

    /// Number of pending cleanup entries.
    #[must_use]
    pub fn garbage_len(&self) -> usize {
        self.garbage.len()
    }
}

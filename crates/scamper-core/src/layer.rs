//! Named entity collections.
//!
//! A [`Layer`] holds two ordered sets: `entities`, the members physically
//! "in" the layer, and `listeners`, the entities notified when a member of
//! the layer collides with them. Layers are created lazily on first
//! reference.
//!
//! The registry only stores ids. Keeping each entity's own membership list
//! in step with the registry, and announcing changes on the bus, is the job
//! of [`World`](crate::world::World), which is the only caller of the
//! mutating methods in normal use.
//!
//! # Example
//!
//! ```
//! use scamper_core::entity::EntityId;
//! use scamper_core::layer::LayerRegistry;
//! use scamper_core::names::LayerName;
//!
//! let mut layers = LayerRegistry::new();
//! let player = LayerName::new("player");
//! let hero = EntityId::new(1);
//!
//! assert!(layers.add(&player, hero));
//! assert!(!layers.add(&player, hero)); // already a member
//! assert_eq!(layers.entities(&player), &[hero]);
//! assert!(layers.entities(&LayerName::new("unknown")).is_empty());
//! ```

use std::collections::HashMap;

use crate::entity::EntityId;
use crate::names::LayerName;

/// One named layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    name: LayerName,
    entities: Vec<EntityId>,
    listeners: Vec<EntityId>,
}

impl Layer {
    fn new(name: LayerName) -> Self {
        Self {
            name,
            entities: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Layer name.
    #[must_use]
    pub fn name(&self) -> &LayerName {
        &self.name
    }

    /// Members, in insertion order.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Collision listeners, in registration order.
    #[must_use]
    pub fn listeners(&self) -> &[EntityId] {
        &self.listeners
    }

    /// Whether `id` is a member.
    #[must_use]
    pub fn has(&self, id: EntityId) -> bool {
        self.entities.contains(&id)
    }

    /// Whether `id` listens for collisions with members.
    #[must_use]
    pub fn is_listener(&self, id: EntityId) -> bool {
        self.listeners.contains(&id)
    }
}

fn insert_unique(set: &mut Vec<EntityId>, id: EntityId) -> bool {
    if set.contains(&id) {
        false
    } else {
        set.push(id);
        true
    }
}

fn remove_present(set: &mut Vec<EntityId>, id: EntityId) -> bool {
    match set.iter().position(|e| *e == id) {
        Some(i) => {
            set.remove(i);
            true
        }
        None => false,
    }
}

/// All layers, in creation order.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
    index: HashMap<LayerName, usize>,
}

impl LayerRegistry {
    /// Creates a registry holding only the primary [`LayerName::ENTITIES`]
    /// layer.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.get_or_create(&LayerName::ENTITIES);
        registry
    }

    /// Returns the layer, creating it if needed.
    pub fn get_or_create(&mut self, name: &LayerName) -> &mut Layer {
        let i = match self.index.get(name) {
            Some(&i) => i,
            None => {
                self.layers.push(Layer::new(name.clone()));
                let i = self.layers.len() - 1;
                self.index.insert(name.clone(), i);
                i
            }
        };
        &mut self.layers[i]
    }

    /// Returns the layer if it exists.
    #[must_use]
    pub fn get(&self, name: &LayerName) -> Option<&Layer> {
        self.index.get(name).map(|&i| &self.layers[i])
    }

    /// Members of `name`; empty for an unknown layer.
    #[must_use]
    pub fn entities(&self, name: &LayerName) -> &[EntityId] {
        self.get(name).map_or(&[][..], Layer::entities)
    }

    /// Listeners of `name`; empty for an unknown layer.
    #[must_use]
    pub fn listeners(&self, name: &LayerName) -> &[EntityId] {
        self.get(name).map_or(&[][..], Layer::listeners)
    }

    /// Whether `id` is a member of `name`.
    #[must_use]
    pub fn has(&self, name: &LayerName, id: EntityId) -> bool {
        self.get(name).is_some_and(|l| l.has(id))
    }

    /// Whether `id` listens on `name`.
    #[must_use]
    pub fn is_listener(&self, name: &LayerName, id: EntityId) -> bool {
        self.get(name).is_some_and(|l| l.is_listener(id))
    }

    /// Adds a member. Returns false if it was already present.
    pub fn add(&mut self, name: &LayerName, id: EntityId) -> bool {
        insert_unique(&mut self.get_or_create(name).entities, id)
    }

    /// Removes a member. Returns false if it was absent.
    pub fn remove(&mut self, name: &LayerName, id: EntityId) -> bool {
        match self.index.get(name) {
            Some(&i) => remove_present(&mut self.layers[i].entities, id),
            None => false,
        }
    }

    /// Registers a collision listener. Returns false if already listening.
    pub fn listen(&mut self, name: &LayerName, id: EntityId) -> bool {
        insert_unique(&mut self.get_or_create(name).listeners, id)
    }

    /// Unregisters a collision listener. Returns false if it was not
    /// listening.
    pub fn unlisten(&mut self, name: &LayerName, id: EntityId) -> bool {
        match self.index.get(name) {
            Some(&i) => remove_present(&mut self.layers[i].listeners, id),
            None => false,
        }
    }

    /// Drops `id` from every listener set. Returns how many it left.
    pub fn unlisten_everywhere(&mut self, id: EntityId) -> usize {
        let mut left = 0;
        for layer in &mut self.layers {
            if remove_present(&mut layer.listeners, id) {
                left += 1;
            }
        }
        left
    }

    /// Layer names in creation order.
    pub fn names(&self) -> impl Iterator<Item = &LayerName> + '_ {
        self.layers.iter().map(Layer::name)
    }

    /// Number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True only for a registry built with `Default` and never touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

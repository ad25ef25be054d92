//! Per-entity side tables.
//!
//! Plugins keep their mutable state out of [`Entity`](crate::entity::Entity):
//! each state type gets a [`SideTable`] keyed by [`EntityId`], and the world
//! purges every table when an entity is destroyed. Nothing in a table keeps
//! an entity alive.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::entity::EntityId;

/// Map from entity to one piece of plugin state.
#[derive(Debug, Clone)]
pub struct SideTable<T> {
    entries: HashMap<EntityId, T>,
}

impl<T> Default for SideTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> SideTable<T> {
    /// State for `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entries.get(&id)
    }

    /// Mutable state for `id`.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    /// State for `id`, created with `init` on first access.
    pub fn get_or_insert_with(&mut self, id: EntityId, init: impl FnOnce() -> T) -> &mut T {
        self.entries.entry(id).or_insert_with(init)
    }

    /// Stores state, returning what was there before.
    pub fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        self.entries.insert(id, value)
    }

    /// Drops state for `id`.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        self.entries.remove(&id)
    }

    /// Whether `id` has state.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entity has state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

trait ErasedTable {
    fn purge(&mut self, id: EntityId);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedTable for SideTable<T> {
    fn purge(&mut self, id: EntityId) {
        self.entries.remove(&id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One [`SideTable`] per state type.
#[derive(Default)]
pub struct SideTables {
    tables: HashMap<TypeId, Box<dyn ErasedTable>>,
}

impl std::fmt::Debug for SideTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideTables").field("tables", &self.tables.len()).finish()
    }
}

impl SideTables {
    /// The table for `T`, if anything was ever stored in it.
    #[must_use]
    pub fn table<T: 'static>(&self) -> Option<&SideTable<T>> {
        self.tables
            .get(&TypeId::of::<T>())
            .and_then(|t| t.as_any().downcast_ref())
    }

    /// The table for `T`, created empty on first access.
    pub fn table_mut<T: 'static>(&mut self) -> &mut SideTable<T> {
        let table = self
            .tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SideTable::<T>::default()));
        match table.as_any_mut().downcast_mut() {
            Some(table) => table,
            None => unreachable!("side table registered under a foreign TypeId"),
        }
    }

    /// State of type `T` for `id`.
    #[must_use]
    pub fn get<T: 'static>(&self, id: EntityId) -> Option<&T> {
        self.table::<T>().and_then(|t| t.get(id))
    }

    /// Drops every piece of state held for `id`.
    pub fn purge(&mut self, id: EntityId) {
        for table in self.tables.values_mut() {
            table.purge(id);
        }
    }
}

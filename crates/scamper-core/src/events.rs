//! Event values carried on the bus.
//!
//! An [`Event`] is a name, an optional target entity and a typed
//! [`Payload`]. Untargeted events are broadcasts: every subscriber of the
//! name receives them. Targeted events reach global subscribers and the
//! subscriptions scoped to that one entity.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use scamper_core::entity::EntityId;
//! use scamper_core::events::{Event, Payload};
//! use scamper_core::names::EventName;
//!
//! let tap = Event::new(EventName::POINTER_TAP).with(Payload::Point(Vec2::new(40.0, 8.0)));
//! assert_eq!(tap.point(), Some(Vec2::new(40.0, 8.0)));
//! assert!(tap.target.is_none());
//!
//! let bump = Event::new(EventName::COLLISION)
//!     .with(Payload::Collision { a: EntityId::new(1), b: EntityId::new(2) });
//! assert!(bump.involves(EntityId::new(2)));
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::keys::Key;
use crate::names::{AnimationName, EventName, LayerName};

/// Data attached to an event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Payload {
    /// No data.
    #[default]
    None,
    /// A boolean, e.g. the new paused state.
    Flag(bool),
    /// A key press or release.
    Key(Key),
    /// A world-space position or size.
    Point(Vec2),
    /// Another entity, e.g. the collider in a layer delivery.
    Entity(EntityId),
    /// Two entities whose bodies started touching.
    Collision {
        /// First entity of the pair
        a: EntityId,
        /// Second entity of the pair
        b: EntityId,
    },
    /// A layer membership change.
    Membership {
        /// Layer that changed
        layer: LayerName,
        /// Entity added or removed
        entity: EntityId,
    },
    /// Request to play an animation, optionally setting horizontal mirroring.
    Animation {
        /// Animation to play
        name: AnimationName,
        /// New mirroring, or `None` to leave it unchanged
        mirror: Option<bool>,
    },
    /// Free text, e.g. a scene name.
    Text(String),
    /// Game-defined structured data.
    Value(serde_json::Value),
}

/// A named, optionally targeted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name
    pub name: EventName,
    /// Entity the event is addressed to; `None` broadcasts
    pub target: Option<EntityId>,
    /// Attached data
    pub payload: Payload,
}

impl Event {
    /// Creates an untargeted event without payload.
    #[must_use]
    pub fn new(name: EventName) -> Self {
        Self {
            name,
            target: None,
            payload: Payload::None,
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Addresses the event to a single entity.
    #[must_use]
    pub fn to(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    /// The key, for key events.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        match &self.payload {
            Payload::Key(key) => Some(key),
            _ => None,
        }
    }

    /// The position, for pointer and resize events.
    #[must_use]
    pub fn point(&self) -> Option<Vec2> {
        match self.payload {
            Payload::Point(p) => Some(p),
            _ => None,
        }
    }

    /// The referenced entity, for layer deliveries.
    #[must_use]
    pub fn entity(&self) -> Option<EntityId> {
        match self.payload {
            Payload::Entity(id) | Payload::Membership { entity: id, .. } => Some(id),
            _ => None,
        }
    }

    /// The colliding pair, for collision events.
    #[must_use]
    pub fn collision(&self) -> Option<(EntityId, EntityId)> {
        match self.payload {
            Payload::Collision { a, b } => Some((a, b)),
            _ => None,
        }
    }

    /// The flag, for pause changes.
    #[must_use]
    pub fn flag(&self) -> Option<bool> {
        match self.payload {
            Payload::Flag(f) => Some(f),
            _ => None,
        }
    }

    /// Whether `id` is one side of a collision payload.
    #[must_use]
    pub fn involves(&self, id: EntityId) -> bool {
        self.collision().is_some_and(|(a, b)| a == id || b == id)
    }
}

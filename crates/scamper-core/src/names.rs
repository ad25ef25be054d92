//! Open, string-keyed vocabularies.
//!
//! Events, layers, animations and plugins are all identified by name. The
//! core ships a base vocabulary as associated constants; game code adds its
//! own names with `new` without touching the core.
//!
//! # Example
//!
//! ```
//! use scamper_core::names::{EventName, LayerName};
//!
//! const PLAYER: LayerName = LayerName::from_static("player");
//!
//! let door_opened = EventName::new("door:open");
//! assert_eq!(door_opened.as_str(), "door:open");
//! assert_eq!(EventName::from(&PLAYER), EventName::new("player"));
//! ```

use std::borrow::{Borrow, Cow};
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            /// Creates a name from a static string; usable in `const` items.
            #[must_use]
            pub const fn from_static(name: &'static str) -> Self {
                Self(Cow::Borrowed(name))
            }

            /// Creates a name from any string.
            #[must_use]
            pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
                Self(name.into())
            }

            /// Returns the name as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(Cow::Owned(s.to_owned()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Cow::Owned(s))
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

name_type! {
    /// Name of an event carried on the [`EventBus`](crate::bus::EventBus).
    EventName
}

name_type! {
    /// Name of a [`Layer`](crate::layer::Layer).
    LayerName
}

name_type! {
    /// Key of a registered animation on an entity's visual.
    AnimationName
}

name_type! {
    /// Unique identifier for a plugin type.
    ///
    /// Attaching a plugin is idempotent per id.
    PluginId
}

// =============================================================================
// Base vocabulary
// =============================================================================

impl EventName {
    /// Global teardown; every entity destroys itself.
    pub const CLEANUP: Self = Self::from_static("cleanup");
    /// Active scene changed.
    pub const SCENE_CHANGE: Self = Self::from_static("sceneChange");
    /// Game paused or resumed. Payload: [`Payload::Flag`](crate::events::Payload::Flag).
    pub const PAUSE_CHANGE: Self = Self::from_static("pauseChange");
    /// Key pressed. Payload: [`Payload::Key`](crate::events::Payload::Key).
    pub const KEY_DOWN: Self = Self::from_static("keydown");
    /// Key released. Payload: [`Payload::Key`](crate::events::Payload::Key).
    pub const KEY_UP: Self = Self::from_static("keyup");
    /// Playfield resized. Payload: [`Payload::Point`](crate::events::Payload::Point).
    pub const RESIZE: Self = Self::from_static("resize");
    /// Pointer tapped at a world position.
    pub const POINTER_TAP: Self = Self::from_static("pointertap");
    /// Pointer pressed.
    pub const POINTER_DOWN: Self = Self::from_static("pointerdown");
    /// Pointer released.
    pub const POINTER_UP: Self = Self::from_static("pointerup");
    /// Pointer moved.
    pub const POINTER_MOVE: Self = Self::from_static("pointermove");
    /// Touch dragged.
    pub const TOUCH_MOVE: Self = Self::from_static("touch:move");
    /// A dialog opened.
    pub const DIALOG_OPEN: Self = Self::from_static("dialog:open");
    /// A dialog closed.
    pub const DIALOG_CLOSE: Self = Self::from_static("dialog:close");
    /// Two entity bodies started touching. Payload: [`Payload::Collision`](crate::events::Payload::Collision).
    pub const COLLISION: Self = Self::from_static("collision");
    /// Animation change request. Payload: [`Payload::Animation`](crate::events::Payload::Animation).
    pub const ANIMATION: Self = Self::from_static("animation");
    /// Entity joined a layer. Payload: [`Payload::Membership`](crate::events::Payload::Membership).
    pub const ENTITY_ADDED: Self = Self::from_static("entityAdded");
    /// Entity left a layer. Payload: [`Payload::Membership`](crate::events::Payload::Membership).
    pub const ENTITY_REMOVED: Self = Self::from_static("entityRemoved");
}

impl LayerName {
    /// The primary layer; the game loop updates its members every tick and
    /// pathfinding treats its members as obstacles.
    pub const ENTITIES: Self = Self::from_static("entities");
}

impl From<&LayerName> for EventName {
    fn from(layer: &LayerName) -> Self {
        Self(layer.0.clone())
    }
}

impl AnimationName {
    /// Resting.
    pub const IDLE: Self = Self::from_static("idle");
    /// Ramping up force.
    pub const ACCELERATING: Self = Self::from_static("accelerating");
    /// At cruising speed.
    pub const MOVING: Self = Self::from_static("moving");
    /// Coasting to a halt.
    pub const STOPPING: Self = Self::from_static("stopping");
    /// Halted, not yet idle.
    pub const STOPPED: Self = Self::from_static("stopped");
    /// Bumped into something.
    pub const COLLISION: Self = Self::from_static("collision");

    /// Appends `suffix`, e.g. `moving` + `Right` = `movingRight`.
    #[must_use]
    pub fn suffixed(&self, suffix: &str) -> Self {
        Self(Cow::Owned(format!("{}{suffix}", self.0)))
    }
}

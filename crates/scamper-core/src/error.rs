//! Error types for the runtime core.
//!
//! Errors cover configuration (bad JSON, bad settings blobs, a second game)
//! and explicit lookups by id. Idempotency violations, missing animations,
//! runaway event recursion and unreachable destinations are handled in place
//! (ignored, defaulted, dropped or reported as an empty path) and never reach
//! the caller as an `Err`.

use thiserror::Error;

use crate::entity::EntityId;
use crate::plugin::PluginId;

/// Errors returned by the runtime core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A second [`Game`](crate::game::Game) was created while one is alive on
    /// this thread.
    #[error("game already initialized")]
    AlreadyInitialized,

    /// The entity does not exist or has been destroyed.
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// No plugin with this id has been registered.
    #[error("plugin `{0}` is not registered")]
    UnknownPlugin(PluginId),

    /// A plugin settings blob did not match the plugin's settings shape.
    #[error("invalid settings for plugin `{plugin}`: {source}")]
    InvalidSettings {
        /// Plugin the settings were meant for
        plugin: PluginId,
        /// Underlying decode failure
        #[source]
        source: serde_json::Error,
    },

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// Grid construction failed.
    #[error(transparent)]
    Grid(#[from] trellis::GridError),
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, CoreError>;

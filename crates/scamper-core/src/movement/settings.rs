//! Movement tuning.
//!
//! Every struct here is `#[serde(default)]`, so a plugin settings blob only
//! has to name the fields it changes:
//!
//! ```
//! use scamper_core::movement::MovementSettings;
//!
//! let settings: MovementSettings =
//!     serde_json::from_str(r#"{ "maxSpeed": 3.0, "acceleration": { "enabled": false } }"#).unwrap();
//! assert_eq!(settings.max_speed, 3.0);
//! assert!(!settings.acceleration.enabled);
//! assert_eq!(settings.pathfinding.grid_cell_size, 32.0);
//! ```

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use trellis::{DiagonalMovement, SearchAlgorithm};

use crate::plugin::PluginId;

/// Force ramping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccelerationSettings {
    /// Ramp force instead of applying it at full strength at once
    pub enabled: bool,
    /// Force gained per second while input is held
    pub rate: f32,
    /// Force lost per second once input stops
    pub deceleration: f32,
    /// Floor the force decays to
    pub min_force: f32,
}

impl Default for AccelerationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 4.0,
            deceleration: 4.0,
            min_force: 0.0,
        }
    }
}

/// Grid planning and re-planning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PathfindingSettings {
    /// Side of one grid cell in world units
    pub grid_cell_size: f32,
    /// Extra cells blocked around each obstacle
    pub padding: i32,
    /// A waypoint counts as reached when both axis distances are below this
    pub node_proximity: f32,
    /// Diagonal step policy
    pub diagonal_movement: DiagonalMovement,
    /// Search strategy
    pub algorithm: SearchAlgorithm,
    /// Settle time after a collision before re-planning
    pub recalculate_delay_ms: u64,
    /// Speed below `max_speed * stuck_speed_fraction` counts as not moving
    pub stuck_speed_fraction: f32,
    /// Consecutive slow ticks before a path is abandoned
    pub stuck_ticks: u32,
}

impl Default for PathfindingSettings {
    fn default() -> Self {
        Self {
            grid_cell_size: 32.0,
            padding: 1,
            node_proximity: 8.0,
            diagonal_movement: DiagonalMovement::OnlyWhenNoObstacles,
            algorithm: SearchAlgorithm::BiAStar,
            recalculate_delay_ms: 250,
            stuck_speed_fraction: 0.05,
            stuck_ticks: 30,
        }
    }
}

/// Everything a movement plugin can be tuned with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MovementSettings {
    /// Target force while input is held
    pub force: f32,
    /// Velocity magnitude cap
    pub max_speed: f32,
    /// Direction the sprite art faces; drives mirroring and initial facing
    pub sprite_direction: Vec2,
    /// Force ramping
    pub acceleration: AccelerationSettings,
    /// Speed above which the entity counts as moving
    pub velocity_threshold: f32,
    /// Speed above which a released entity enters `stopping` rather than
    /// going straight to `stopped`
    pub stopping_threshold: f32,
    /// Grace period after the last input before stopping begins
    pub input_timeout_ms: u64,
    /// Time spent `stopped` before going `idle`
    pub idle_delay_ms: u64,
    /// Distance at which a destination counts as reached
    pub arrival_tolerance: f32,
    /// Grid planning
    pub pathfinding: PathfindingSettings,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            force: 1.0,
            max_speed: 5.0,
            sprite_direction: Vec2::X,
            acceleration: AccelerationSettings::default(),
            velocity_threshold: 0.1,
            stopping_threshold: 0.1,
            input_timeout_ms: 100,
            idle_delay_ms: 500,
            arrival_tolerance: 5.0,
            pathfinding: PathfindingSettings::default(),
        }
    }
}

/// Decoded settings per movement plugin attached to one entity.
#[derive(Debug, Clone, Default)]
pub struct MovementProfiles(HashMap<PluginId, MovementSettings>);

impl MovementProfiles {
    /// Settings stored for `plugin`.
    #[must_use]
    pub fn get(&self, plugin: &PluginId) -> Option<&MovementSettings> {
        self.0.get(plugin)
    }

    /// Stores settings for `plugin`.
    pub fn insert(&mut self, plugin: PluginId, settings: MovementSettings) {
        self.0.insert(plugin, settings);
    }
}

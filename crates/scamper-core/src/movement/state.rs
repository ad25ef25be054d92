//! Movement state machine.
//!
//! ```text
//! idle ──input──▶ accelerating ──force ≥ 80% and speed > threshold──▶ moving
//!  ▲                    │                                               │
//!  │               no input for input_timeout_ms ◀──────────────────────┘
//!  │                    ▼
//! stopped ◀──speed ≤ threshold── stopping
//!  (after idle_delay_ms → idle; input in stopping/stopped → accelerating)
//! ```
//!
//! [`next_phase`] is a pure function of the current phase and a
//! [`PhaseInputs`] sample, so the transition table is testable without a
//! world.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::settings::MovementSettings;
use crate::names::AnimationName;

/// Share of the target force at which acceleration counts as done.
pub const ACCELERATION_DONE: f32 = 0.8;

/// Discrete movement phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MovementPhase {
    /// At rest, no recent input.
    #[default]
    Idle,
    /// Input held, force still ramping up.
    Accelerating,
    /// Input held at speed.
    Moving,
    /// Input released, still coasting.
    Stopping,
    /// Input released, at rest.
    Stopped,
}

impl MovementPhase {
    /// Base animation name for the phase.
    #[must_use]
    pub fn animation(self) -> AnimationName {
        match self {
            Self::Idle => AnimationName::IDLE,
            Self::Accelerating => AnimationName::ACCELERATING,
            Self::Moving => AnimationName::MOVING,
            Self::Stopping => AnimationName::STOPPING,
            Self::Stopped => AnimationName::STOPPED,
        }
    }
}

/// Last direction the entity moved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facing {
    /// Negative y
    Up,
    /// Positive y
    Down,
    /// Negative x
    Left,
    /// Positive x
    Right,
}

impl Facing {
    /// Facing along the dominant axis of `v`; ties go vertical. `None` for
    /// the zero vector.
    #[must_use]
    pub fn from_vector(v: Vec2) -> Option<Self> {
        if v == Vec2::ZERO {
            return None;
        }
        Some(if v.x.abs() > v.y.abs() {
            if v.x > 0.0 {
                Self::Right
            } else {
                Self::Left
            }
        } else if v.y > 0.0 {
            Self::Down
        } else {
            Self::Up
        })
    }

    /// Suffix used in directional animation names.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }

    /// Whether this facing lies on the horizontal axis.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Unit vector.
    #[must_use]
    pub const fn vector(self) -> Vec2 {
        match self {
            Self::Up => Vec2::NEG_Y,
            Self::Down => Vec2::Y,
            Self::Left => Vec2::NEG_X,
            Self::Right => Vec2::X,
        }
    }
}

/// Per-entity movement state, kept in a side table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementState {
    /// Normalized input direction; zero without input
    pub direction: Vec2,
    /// Current phase
    pub phase: MovementPhase,
    /// Force currently applied
    pub current_force: f32,
    /// Last facing while moving
    pub facing: Facing,
    /// When input was last non-zero
    pub last_input_ms: u64,
    /// When `phase` was entered
    pub phase_since_ms: u64,
    /// When the state was last driven
    pub last_tick_ms: u64,
    /// Animation last requested
    pub animation: Option<AnimationName>,
}

impl MovementState {
    /// Fresh idle state facing the sprite's authored direction.
    #[must_use]
    pub fn new(settings: &MovementSettings, now_ms: u64) -> Self {
        Self {
            direction: Vec2::ZERO,
            phase: MovementPhase::Idle,
            current_force: 0.0,
            facing: Facing::from_vector(settings.sprite_direction).unwrap_or(Facing::Right),
            last_input_ms: now_ms,
            phase_since_ms: now_ms,
            last_tick_ms: now_ms,
            animation: None,
        }
    }
}

/// One sample of what drives a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseInputs {
    /// Whether input is non-zero this tick
    pub has_input: bool,
    /// Current speed
    pub speed: f32,
    /// Current applied force
    pub force: f32,
    /// Milliseconds since the last non-zero input
    pub since_input_ms: u64,
    /// Milliseconds spent in the current phase
    pub in_phase_ms: u64,
}

/// Computes the next phase.
#[must_use]
pub fn next_phase(phase: MovementPhase, inputs: PhaseInputs, settings: &MovementSettings) -> MovementPhase {
    use MovementPhase::{Accelerating, Idle, Moving, Stopped, Stopping};

    if inputs.has_input {
        return match phase {
            Idle | Stopping | Stopped => Accelerating,
            Accelerating => {
                let ramped = !settings.acceleration.enabled
                    || inputs.force >= settings.force * ACCELERATION_DONE;
                if ramped && inputs.speed > settings.velocity_threshold {
                    Moving
                } else {
                    Accelerating
                }
            }
            Moving => Moving,
        };
    }

    match phase {
        Accelerating | Moving if inputs.since_input_ms >= settings.input_timeout_ms => {
            if inputs.speed > settings.stopping_threshold {
                Stopping
            } else {
                Stopped
            }
        }
        Stopping if inputs.speed <= settings.velocity_threshold => Stopped,
        Stopped if inputs.in_phase_ms >= settings.idle_delay_ms => Idle,
        other => other,
    }
}

//! Visual state holder.
//!
//! Rendering happens outside the core. A [`Visual`] records what the
//! renderer should show: the registered animations, the one currently
//! playing, horizontal mirroring, and the transform copied from the physics
//! body on every entity update.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::names::AnimationName;

/// Texture identifiers making up one animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frames {
    /// A static sprite.
    Single(String),
    /// An animated sprite, frames in play order.
    Sequence(Vec<String>),
}

impl Frames {
    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Sequence(frames) => frames.len(),
        }
    }

    /// True for an empty sequence.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Frames {
    fn from(texture: &str) -> Self {
        Self::Single(texture.to_owned())
    }
}

impl From<Vec<String>> for Frames {
    fn from(frames: Vec<String>) -> Self {
        Self::Sequence(frames)
    }
}

/// What an entity looks like right now.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Visual {
    animations: BTreeMap<AnimationName, Frames>,
    current: Option<AnimationName>,
    mirrored: bool,
    position: Vec2,
    rotation: f32,
    swaps: u32,
}

impl Visual {
    /// A visual whose `idle` animation is `frames`, already playing.
    #[must_use]
    pub fn with_idle(frames: Frames) -> Self {
        let mut visual = Self::default();
        visual.animate(AnimationName::IDLE, frames);
        visual.play(&AnimationName::IDLE);
        visual
    }

    /// Registers or replaces an animation.
    pub fn animate(&mut self, name: AnimationName, frames: Frames) {
        self.animations.insert(name, frames);
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn has_animation(&self, name: &AnimationName) -> bool {
        self.animations.contains_key(name)
    }

    /// Frames registered for `name`.
    #[must_use]
    pub fn frames(&self, name: &AnimationName) -> Option<&Frames> {
        self.animations.get(name)
    }

    /// Switches to `name`.
    ///
    /// Returns false without touching the sprite if `name` is unknown or is
    /// already playing.
    pub fn play(&mut self, name: &AnimationName) -> bool {
        if !self.has_animation(name) || self.current.as_ref() == Some(name) {
            return false;
        }
        self.current = Some(name.clone());
        self.swaps += 1;
        true
    }

    /// Animation currently playing.
    #[must_use]
    pub fn current(&self) -> Option<&AnimationName> {
        self.current.as_ref()
    }

    /// Sets horizontal mirroring.
    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    /// Whether the sprite is drawn mirrored.
    #[must_use]
    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// Copies the body transform.
    pub fn sync(&mut self, position: Vec2, rotation: f32) {
        self.position = position;
        self.rotation = rotation;
    }

    /// Last synced position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Last synced rotation.
    #[must_use]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// How many times the sprite has been swapped.
    #[must_use]
    pub fn swaps(&self) -> u32 {
        self.swaps
    }
}

//! Animation selection for movement phases.
//!
//! For phase `moving` facing left, the lookup order is:
//!
//! 1. `movingLeft`, unmirrored;
//! 2. `movingX`, mirrored when left is the opposite of the sprite's authored
//!    horizontal facing (`movingY` for up/down, never mirrored);
//! 3. `moving`, mirroring left as is.
//!
//! When nothing matches, the current animation keeps playing.

use glam::Vec2;

use super::state::{Facing, MovementPhase};
use crate::entity::EntityId;
use crate::events::{Event, Payload};
use crate::names::{AnimationName, EventName};
use crate::visual::Visual;
use crate::world::World;

/// A resolved animation and the mirroring to apply with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationChoice {
    /// Animation to play
    pub name: AnimationName,
    /// New mirroring, or `None` to leave it as is
    pub mirror: Option<bool>,
}

/// Picks the animation for `phase` and `facing` among those `visual` has.
#[must_use]
pub fn resolve(visual: &Visual, phase: MovementPhase, facing: Facing, sprite_direction: Vec2) -> Option<AnimationChoice> {
    let base = phase.animation();

    let specific = base.suffixed(facing.suffix());
    if visual.has_animation(&specific) {
        return Some(AnimationChoice {
            name: specific,
            mirror: Some(false),
        });
    }

    let (axis, mirror) = if facing.is_horizontal() {
        ("X", facing.vector().x * sprite_direction.x < 0.0)
    } else {
        ("Y", false)
    };
    let generic = base.suffixed(axis);
    if visual.has_animation(&generic) {
        return Some(AnimationChoice {
            name: generic,
            mirror: Some(mirror),
        });
    }

    visual.has_animation(&base).then_some(AnimationChoice {
        name: base,
        mirror: None,
    })
}

/// Whether playing `choice` would change what `visual` shows.
#[must_use]
pub fn differs(visual: &Visual, choice: &AnimationChoice) -> bool {
    visual.current() != Some(&choice.name) || choice.mirror.is_some_and(|m| m != visual.is_mirrored())
}

/// Requests the animation for the entity's phase and facing, if it differs
/// from what is showing. Returns the animation now playing.
pub fn request(world: &mut World, id: EntityId, phase: MovementPhase, facing: Facing, sprite_direction: Vec2) -> Option<AnimationName> {
    let visual = world.visual(id)?;
    let choice = resolve(visual, phase, facing, sprite_direction)?;
    if differs(visual, &choice) {
        world.emit(
            Event::new(EventName::ANIMATION)
                .to(id)
                .with(Payload::Animation {
                    name: choice.name.clone(),
                    mirror: choice.mirror,
                }),
        );
    }
    Some(choice.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::Frames;

    fn visual_with(names: &[&str]) -> Visual {
        let mut visual = Visual::with_idle(Frames::from("idle"));
        for name in names {
            visual.animate(AnimationName::new((*name).to_owned()), Frames::from(*name));
        }
        visual
    }

    #[test]
    fn specific_beats_generic() {
        let visual = visual_with(&["movingLeft", "movingX", "moving"]);
        let choice = resolve(&visual, MovementPhase::Moving, Facing::Left, Vec2::X).unwrap();
        assert_eq!(choice.name.as_str(), "movingLeft");
        assert_eq!(choice.mirror, Some(false));
    }

    #[test]
    fn generic_mirrors_against_sprite_direction() {
        let visual = visual_with(&["movingX"]);
        let left = resolve(&visual, MovementPhase::Moving, Facing::Left, Vec2::X).unwrap();
        let right = resolve(&visual, MovementPhase::Moving, Facing::Right, Vec2::X).unwrap();
        let left_art = resolve(&visual, MovementPhase::Moving, Facing::Left, Vec2::NEG_X).unwrap();
        assert_eq!(left.mirror, Some(true));
        assert_eq!(right.mirror, Some(false));
        assert_eq!(left_art.mirror, Some(false));
    }

    #[test]
    fn vertical_uses_y_variant() {
        let visual = visual_with(&["movingX", "movingY"]);
        let up = resolve(&visual, MovementPhase::Moving, Facing::Up, Vec2::X).unwrap();
        assert_eq!(up.name.as_str(), "movingY");
    }

    #[test]
    fn falls_back_to_bare_phase_then_nothing() {
        let visual = visual_with(&["stopping"]);
        let bare = resolve(&visual, MovementPhase::Stopping, Facing::Down, Vec2::X).unwrap();
        assert_eq!(bare, AnimationChoice { name: AnimationName::STOPPING, mirror: None });
        assert!(resolve(&visual, MovementPhase::Moving, Facing::Down, Vec2::X).is_none());
    }

    #[test]
    fn same_choice_does_not_differ() {
        let mut visual = visual_with(&["movingX"]);
        let choice = resolve(&visual, MovementPhase::Moving, Facing::Left, Vec2::X).unwrap();
        assert!(differs(&visual, &choice));
        visual.set_mirrored(true);
        visual.play(&choice.name);
        assert!(!differs(&visual, &choice));
    }
}

//! Force ramping and speed limiting.

use glam::Vec2;

use super::settings::MovementSettings;

/// Unit vector of `direction`, or zero for the zero vector.
#[must_use]
pub fn normalize(direction: Vec2) -> Vec2 {
    direction.normalize_or_zero()
}

/// Moves `current` toward the target force over `dt_secs`.
///
/// Without acceleration the force snaps to `settings.force` while input is
/// held and to zero otherwise. With it, the force climbs at `rate` per
/// second up to `settings.force`, and decays at `deceleration` per second
/// down to `min_force`.
#[must_use]
pub fn ramp(current: f32, has_input: bool, dt_secs: f32, settings: &MovementSettings) -> f32 {
    let accel = &settings.acceleration;
    if !accel.enabled {
        return if has_input { settings.force } else { 0.0 };
    }
    if has_input {
        (current + accel.rate * dt_secs).min(settings.force)
    } else {
        (current - accel.deceleration * dt_secs).max(accel.min_force)
    }
}

/// Rescales `velocity` so its length is at most `max_speed`, keeping its
/// direction.
#[must_use]
pub fn clamp_speed(velocity: Vec2, max_speed: f32) -> Vec2 {
    let speed = velocity.length();
    if speed > max_speed && speed > 0.0 {
        velocity * (max_speed / speed)
    } else {
        velocity
    }
}

//! Physics boundary.
//!
//! The core never integrates motion itself. It drives bodies through the
//! [`PhysicsWorld`] trait: add and remove bodies, push them with forces, set
//! velocity or position outright, read them back, and advance the world one
//! step at a time. Each step reports the body pairs that *started* touching.
//!
//! [`KinematicWorld`] is a small reference implementation used by the tests
//! and the sandbox: axis-aligned boxes, no rotation, air friction, and
//! overlap resolution that pushes dynamic bodies out of solid ones.
//!
//! # Units
//!
//! Velocity is measured in world units per reference step
//! ([`KinematicConfig::step_ms`], one 60 Hz frame by default) and force in
//! mass-units per reference step squared. A `dt_ms` different from the
//! reference step scales integration proportionally.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use scamper_core::physics::{BodyDesc, KinematicWorld, PhysicsWorld};
//!
//! let mut world = KinematicWorld::default();
//! let body = world.add_body(BodyDesc::new(Vec2::ZERO, Vec2::splat(10.0)));
//!
//! world.set_velocity(body, Vec2::new(2.0, 0.0));
//! world.step(1000.0 / 60.0);
//!
//! let pos = world.position(body).unwrap();
//! assert!(pos.x > 1.5 && pos.x < 2.0); // air friction bleeds some speed
//! ```

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Reference step length: one frame at 60 Hz.
pub const STEP_MS: f32 = 1000.0 / 60.0;

// =============================================================================
// Body types
// =============================================================================

/// Opaque handle to a body inside a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(u64);

impl BodyHandle {
    /// Wraps a raw handle value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

bitflags! {
    /// Body behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct BodyFlags: u8 {
        /// Never moves; ignores forces and velocity.
        const STATIC = 0b0000_0001;
        /// Reports collisions but is never pushed apart from other bodies.
        const SENSOR = 0b0000_0010;
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Aabb {
    /// Box of `size` centered on `center`.
    #[must_use]
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Strict overlap: boxes that only share an edge do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    /// Whether `point` lies strictly inside the box.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x > self.min.x && point.x < self.max.x && point.y > self.min.y && point.y < self.max.y
    }

    /// The box grown by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Width and height.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}

/// Everything needed to create a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyDesc {
    /// Center position
    pub position: Vec2,
    /// Width and height
    pub size: Vec2,
    /// Mass; forces are divided by it
    pub mass: f32,
    /// Fraction of velocity lost per reference step
    pub friction_air: f32,
    /// Static / sensor flags
    pub flags: BodyFlags,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            size: Vec2::splat(32.0),
            mass: 1.0,
            friction_air: 0.1,
            flags: BodyFlags::empty(),
        }
    }
}

impl BodyDesc {
    /// A dynamic, solid body with default mass and friction.
    #[must_use]
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            ..Self::default()
        }
    }

    /// Marks the body static.
    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.flags |= BodyFlags::STATIC;
        self
    }

    /// Marks the body as a sensor.
    #[must_use]
    pub fn sensor(mut self) -> Self {
        self.flags |= BodyFlags::SENSOR;
        self
    }
}

/// Two bodies that started touching during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionPair {
    /// Body with the lower handle
    pub a: BodyHandle,
    /// Body with the higher handle
    pub b: BodyHandle,
}

// =============================================================================
// Boundary trait
// =============================================================================

/// The physics engine as seen by the runtime core.
///
/// Calls naming a body that does not exist are ignored (setters) or return
/// `None` (getters).
pub trait PhysicsWorld {
    /// Adds a body and returns its handle.
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle;
    /// Removes a body. Returns false if it was not present.
    fn remove_body(&mut self, body: BodyHandle) -> bool;
    /// Whether the body exists.
    fn contains(&self, body: BodyHandle) -> bool;
    /// Number of bodies.
    fn body_count(&self) -> usize;

    /// Center position.
    fn position(&self, body: BodyHandle) -> Option<Vec2>;
    /// Current velocity.
    fn velocity(&self, body: BodyHandle) -> Option<Vec2>;
    /// Rotation in radians.
    fn angle(&self, body: BodyHandle) -> Option<f32>;
    /// World-space bounds.
    fn bounds(&self, body: BodyHandle) -> Option<Aabb>;
    /// Whether the body is static.
    fn is_static(&self, body: BodyHandle) -> bool;

    /// Teleports the body.
    fn set_position(&mut self, body: BodyHandle, position: Vec2);
    /// Overwrites the velocity.
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2);
    /// Accumulates a force for the next step, applied at the body center.
    fn apply_force(&mut self, body: BodyHandle, force: Vec2);
    /// Makes the body static or dynamic.
    fn set_static(&mut self, body: BodyHandle, fixed: bool);

    /// Advances the world by `dt_ms` and returns pairs that began touching.
    fn step(&mut self, dt_ms: f32) -> Vec<CollisionPair>;
}

// =============================================================================
// Kinematic reference world
// =============================================================================

/// Tuning for [`KinematicWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicConfig {
    /// Reference step the velocity unit is defined against.
    pub step_ms: f32,
    /// Gap within which two bodies still count as touching, so resting
    /// contact does not re-trigger collision starts.
    pub contact_slop: f32,
}

impl Default for KinematicConfig {
    fn default() -> Self {
        Self {
            step_ms: STEP_MS,
            contact_slop: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
struct Body {
    position: Vec2,
    velocity: Vec2,
    force: Vec2,
    size: Vec2,
    mass: f32,
    friction_air: f32,
    flags: BodyFlags,
}

impl Body {
    fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.size)
    }

    fn is_static(&self) -> bool {
        self.flags.contains(BodyFlags::STATIC)
    }

    fn is_solid(&self) -> bool {
        !self.flags.contains(BodyFlags::SENSOR)
    }
}

/// Axis-aligned, rotation-free physics world.
#[derive(Debug, Clone, Default)]
pub struct KinematicWorld {
    bodies: BTreeMap<BodyHandle, Body>,
    contacts: BTreeSet<(BodyHandle, BodyHandle)>,
    next_handle: u64,
    config: KinematicConfig,
}

impl KinematicWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new(config: KinematicConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Tuning in effect.
    #[must_use]
    pub fn config(&self) -> &KinematicConfig {
        &self.config
    }

    /// Pairs currently in contact.
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    fn integrate(&mut self, scale: f32) {
        for body in self.bodies.values_mut() {
            if body.is_static() {
                body.force = Vec2::ZERO;
                continue;
            }
            if body.mass > 0.0 {
                body.velocity += body.force / body.mass * scale;
            }
            body.velocity *= (1.0 - body.friction_air).clamp(0.0, 1.0).powf(scale);
            body.position += body.velocity * scale;
            body.force = Vec2::ZERO;
        }
    }

    /// Pushes `a` and `b` apart along the axis of least penetration.
    fn separate(&mut self, a: BodyHandle, b: BodyHandle) {
        let (Some(ba), Some(bb)) = (self.bodies.get(&a), self.bodies.get(&b)) else {
            return;
        };
        let (ra, rb) = (ba.bounds(), bb.bounds());
        let overlap = Vec2::new(
            ra.max.x.min(rb.max.x) - ra.min.x.max(rb.min.x),
            ra.max.y.min(rb.max.y) - ra.min.y.max(rb.min.y),
        );
        let delta = ra.center() - rb.center();
        let push = if overlap.x < overlap.y {
            Vec2::new(if delta.x < 0.0 { -overlap.x } else { overlap.x }, 0.0)
        } else {
            Vec2::new(0.0, if delta.y < 0.0 { -overlap.y } else { overlap.y })
        };

        let (share_a, share_b) = match (ba.is_static(), bb.is_static()) {
            (false, false) => (0.5, 0.5),
            (false, true) => (1.0, 0.0),
            (true, false) => (0.0, 1.0),
            (true, true) => return,
        };

        let axis = push.normalize_or_zero();
        if let Some(body) = self.bodies.get_mut(&a) {
            body.position += push * share_a;
            if share_a > 0.0 && body.velocity.dot(axis) < 0.0 {
                body.velocity -= axis * body.velocity.dot(axis);
            }
        }
        if let Some(body) = self.bodies.get_mut(&b) {
            body.position -= push * share_b;
            if share_b > 0.0 && body.velocity.dot(axis) > 0.0 {
                body.velocity -= axis * body.velocity.dot(axis);
            }
        }
    }

    fn pairs(&self) -> Vec<(BodyHandle, BodyHandle)> {
        let handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();
        let mut out = Vec::new();
        for (i, &a) in handles.iter().enumerate() {
            for &b in &handles[i + 1..] {
                out.push((a, b));
            }
        }
        out
    }
}

impl PhysicsWorld for KinematicWorld {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(
            handle,
            Body {
                position: desc.position,
                velocity: Vec2::ZERO,
                force: Vec2::ZERO,
                size: desc.size,
                mass: desc.mass,
                friction_air: desc.friction_air,
                flags: desc.flags,
            },
        );
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        self.contacts.retain(|(a, b)| *a != body && *b != body);
        self.bodies.remove(&body).is_some()
    }

    fn contains(&self, body: BodyHandle) -> bool {
        self.bodies.contains_key(&body)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.position)
    }

    fn velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.velocity)
    }

    fn angle(&self, body: BodyHandle) -> Option<f32> {
        self.bodies.get(&body).map(|_| 0.0)
    }

    fn bounds(&self, body: BodyHandle) -> Option<Aabb> {
        self.bodies.get(&body).map(Body::bounds)
    }

    fn is_static(&self, body: BodyHandle) -> bool {
        self.bodies.get(&body).is_some_and(Body::is_static)
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.position = position;
        }
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if !b.is_static() {
                b.velocity = velocity;
            }
        }
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if !b.is_static() {
                b.force += force;
            }
        }
    }

    fn set_static(&mut self, body: BodyHandle, fixed: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.flags.set(BodyFlags::STATIC, fixed);
            if fixed {
                b.velocity = Vec2::ZERO;
                b.force = Vec2::ZERO;
            }
        }
    }

    fn step(&mut self, dt_ms: f32) -> Vec<CollisionPair> {
        self.integrate(dt_ms / self.config.step_ms);

        let pairs = self.pairs();
        let mut started = Vec::new();
        for &(a, b) in &pairs {
            let (Some(ba), Some(bb)) = (self.bodies.get(&a), self.bodies.get(&b)) else {
                continue;
            };
            if ba.is_static() && bb.is_static() {
                continue;
            }
            if !ba.bounds().overlaps(&bb.bounds()) {
                continue;
            }
            if !self.contacts.contains(&(a, b)) {
                started.push(CollisionPair { a, b });
            }
            if ba.is_solid() && bb.is_solid() {
                self.separate(a, b);
            }
        }

        let slop = self.config.contact_slop;
        self.contacts = pairs
            .into_iter()
            .filter(|(a, b)| match (self.bodies.get(a), self.bodies.get(b)) {
                (Some(ba), Some(bb)) => {
                    !(ba.is_static() && bb.is_static())
                        && ba.bounds().expanded(slop).overlaps(&bb.bounds())
                }
                _ => false,
            })
            .collect();

        started
    }
}

//! Synchronous publish/subscribe event bus.
//!
//! The bus stores subscriptions and the two guards that keep dispatch sane;
//! the dispatch itself is [`emit`], which runs handlers against the value
//! that owns the bus (its [`BusHost`]). Handlers get `&mut` access to the
//! host, so they can mutate the world and emit further events.
//!
//! # Guards
//!
//! - **Recursion depth**: every nested `emit` increments a counter. Once the
//!   counter reaches [`BusConfig::max_depth`] further emissions are dropped
//!   with a warning instead of dispatched.
//! - **Throttling**: the last delivery time is tracked per
//!   `(name, target, colliding pair)`. A repeat inside
//!   [`BusConfig::throttle_interval_ms`] is dropped silently. Once the table
//!   grows past [`BusConfig::throttle_table_limit`] entries older than
//!   [`BusConfig::stale_after_ms`] are evicted. Names listed in
//!   [`BusConfig::unthrottled`] bypass the throttle.
//!
//! # Ordering
//!
//! Subscribers of one name fire in subscription order. A handler removed
//! during a dispatch (e.g. because an earlier handler destroyed its entity)
//! is skipped for the rest of that dispatch.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use scamper_core::bus::{emit, BusConfig, BusHost, Dispatch, EventBus};
//! use scamper_core::events::Event;
//! use scamper_core::names::EventName;
//!
//! struct Host {
//!     bus: EventBus<Host>,
//!     hits: u32,
//! }
//!
//! impl BusHost for Host {
//!     fn bus_mut(&mut self) -> &mut EventBus<Self> {
//!         &mut self.bus
//!     }
//!     fn now_ms(&self) -> u64 {
//!         0
//!     }
//! }
//!
//! let mut host = Host { bus: EventBus::new(BusConfig::default()), hits: 0 };
//! host.bus.on(EventName::new("ping"), None, Rc::new(|h: &mut Host, _: &Event| h.hits += 1));
//!
//! assert_eq!(emit(&mut host, Event::new(EventName::new("ping"))), Dispatch::Delivered(1));
//! // Same name again inside the throttle window
//! assert_eq!(emit(&mut host, Event::new(EventName::new("ping"))), Dispatch::Throttled);
//! assert_eq!(host.hits, 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::entity::EntityId;
use crate::events::Event;
use crate::names::EventName;

/// Default recursion depth limit.
pub const MAX_DEPTH: u32 = 50;

/// Event handler. Receives the bus host and the event.
pub type Handler<H> = Rc<dyn Fn(&mut H, &Event)>;

// =============================================================================
// Configuration
// =============================================================================

/// Bus guard settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Nested `emit` calls allowed before emissions are dropped.
    pub max_depth: u32,
    /// Minimum spacing between two deliveries of the same throttle key.
    /// Zero disables throttling.
    pub throttle_interval_ms: u64,
    /// Age after which a throttle entry may be evicted.
    pub stale_after_ms: u64,
    /// Table size that triggers eviction of stale entries.
    pub throttle_table_limit: usize,
    /// Event names that are never throttled.
    pub unthrottled: Vec<EventName>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            throttle_interval_ms: 16,
            stale_after_ms: 1_000,
            throttle_table_limit: 256,
            unthrottled: vec![
                EventName::KEY_DOWN,
                EventName::KEY_UP,
                EventName::POINTER_TAP,
                EventName::POINTER_DOWN,
                EventName::POINTER_UP,
                EventName::ANIMATION,
                EventName::ENTITY_ADDED,
                EventName::ENTITY_REMOVED,
                EventName::PAUSE_CHANGE,
                EventName::CLEANUP,
                EventName::DIALOG_OPEN,
                EventName::DIALOG_CLOSE,
            ],
        }
    }
}

// =============================================================================
// Subscriptions
// =============================================================================

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription<H> {
    id: SubscriptionId,
    scope: Option<EntityId>,
    handler: Handler<H>,
}

/// Outcome of a single [`emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Dispatched to this many handlers (possibly zero).
    Delivered(usize),
    /// Dropped by the throttle.
    Throttled,
    /// Dropped by the recursion guard.
    DepthExceeded,
}

/// Running counters, mostly for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Emissions dispatched
    pub delivered: u64,
    /// Emissions dropped by the throttle
    pub throttled: u64,
    /// Emissions dropped by the recursion guard
    pub depth_dropped: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ThrottleKey {
    name: EventName,
    target: Option<EntityId>,
    pair: Option<(EntityId, EntityId)>,
}

impl ThrottleKey {
    /// Collisions key on their pair; targeted entity payloads (layer
    /// deliveries) key on `(member, target)`.
    fn of(event: &Event) -> Self {
        let pair = event
            .collision()
            .or_else(|| event.entity().zip(event.target))
            .map(|(a, b)| (a.min(b), a.max(b)));
        Self {
            name: event.name.clone(),
            target: event.target,
            pair,
        }
    }
}

/// Subscription registry plus dispatch guards.
///
/// `H` is the host type handlers receive mutably during dispatch.
pub struct EventBus<H> {
    subscriptions: HashMap<EventName, Vec<Subscription<H>>>,
    index: HashMap<SubscriptionId, EventName>,
    next_id: u64,
    depth: u32,
    last_delivered: HashMap<ThrottleKey, u64>,
    config: BusConfig,
    stats: BusStats,
}

impl<H> fmt::Debug for EventBus<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.index.len())
            .field("depth", &self.depth)
            .field("throttle_entries", &self.last_delivered.len())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<H> EventBus<H> {
    /// Creates an empty bus.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self {
            subscriptions: HashMap::new(),
            index: HashMap::new(),
            next_id: 0,
            depth: 0,
            last_delivered: HashMap::new(),
            config,
            stats: BusStats::default(),
        }
    }

    /// Subscribes `handler` to `name`.
    ///
    /// With `scope: Some(entity)` the handler only sees broadcasts and events
    /// targeted at that entity. With `None` it sees every event of the name.
    pub fn on(&mut self, name: EventName, scope: Option<EntityId>, handler: Handler<H>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.index.insert(id, name.clone());
        self.subscriptions.entry(name).or_default().push(Subscription { id, scope, handler });
        id
    }

    /// Removes a subscription. Returns false if it was already gone.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let Some(name) = self.index.remove(&id) else {
            return false;
        };
        if let Some(subs) = self.subscriptions.get_mut(&name) {
            subs.retain(|s| s.id != id);
            if subs.is_empty() {
                self.subscriptions.remove(&name);
            }
        }
        true
    }

    /// Whether the subscription is still registered.
    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of live subscriptions to `name`.
    #[must_use]
    pub fn subscriber_count(&self, name: &EventName) -> usize {
        self.subscriptions.get(name).map_or(0, Vec::len)
    }

    /// Current nesting depth of `emit`.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Guard settings.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Running counters.
    #[must_use]
    pub const fn stats(&self) -> BusStats {
        self.stats
    }

    /// Number of tracked throttle keys.
    #[must_use]
    pub fn throttle_entries(&self) -> usize {
        self.last_delivered.len()
    }

    fn handlers_for(&self, event: &Event) -> Vec<(SubscriptionId, Handler<H>)> {
        self.subscriptions
            .get(&event.name)
            .map(|subs| {
                subs.iter()
                    .filter(|s| match (s.scope, event.target) {
                        (Some(scope), Some(target)) => scope == target,
                        _ => true,
                    })
                    .map(|s| (s.id, Rc::clone(&s.handler)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Records a delivery for `event` at `now`, or returns false if the
    /// event falls inside the throttle window.
    fn admit(&mut self, event: &Event, now: u64) -> bool {
        let interval = self.config.throttle_interval_ms;
        if interval == 0 || self.config.unthrottled.contains(&event.name) {
            return true;
        }

        let key = ThrottleKey::of(event);
        if let Some(&last) = self.last_delivered.get(&key) {
            if now.saturating_sub(last) < interval {
                return false;
            }
        }
        self.last_delivered.insert(key, now);

        if self.last_delivered.len() > self.config.throttle_table_limit {
            let stale = self.config.stale_after_ms;
            self.last_delivered.retain(|_, t| now.saturating_sub(*t) <= stale);
        }
        true
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// A value that owns an [`EventBus`] and can be handed to its handlers.
pub trait BusHost: Sized {
    /// The bus handlers are registered on.
    fn bus_mut(&mut self) -> &mut EventBus<Self>;

    /// Current time for the throttle.
    fn now_ms(&self) -> u64;
}

/// Dispatches `event` synchronously to every matching subscriber.
///
/// Emitting a name nobody listens to is a no-op that reports
/// `Delivered(0)`.
pub fn emit<H: BusHost>(host: &mut H, event: Event) -> Dispatch {
    let now = host.now_ms();
    let bus = host.bus_mut();

    if bus.depth >= bus.config.max_depth {
        bus.stats.depth_dropped += 1;
        warn!(
            event = %event.name,
            depth = bus.depth,
            "event recursion limit reached; emission dropped"
        );
        return Dispatch::DepthExceeded;
    }

    if !bus.admit(&event, now) {
        bus.stats.throttled += 1;
        trace!(event = %event.name, target = ?event.target, "event throttled");
        return Dispatch::Throttled;
    }

    let handlers = bus.handlers_for(&event);
    bus.stats.delivered += 1;
    bus.depth += 1;

    let mut called = 0;
    for (id, handler) in handlers {
        if !host.bus_mut().is_subscribed(id) {
            continue;
        }
        handler(host, &event);
        called += 1;
    }

    host.bus_mut().depth -= 1;
    Dispatch::Delivered(called)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::events::Payload;

    struct TestHost {
        bus: EventBus<TestHost>,
        clock: ManualClock,
        log: Vec<String>,
        max_seen_depth: u32,
    }

    impl BusHost for TestHost {
        fn bus_mut(&mut self) -> &mut EventBus<Self> {
            &mut self.bus
        }
        fn now_ms(&self) -> u64 {
            self.clock.now_ms()
        }
    }

    fn host(config: BusConfig) -> TestHost {
        TestHost {
            bus: EventBus::new(config),
            clock: ManualClock::new(),
            log: Vec::new(),
            max_seen_depth: 0,
        }
    }

    fn unthrottled() -> BusConfig {
        BusConfig {
            throttle_interval_ms: 0,
            ..BusConfig::default()
        }
    }

    fn ping() -> EventName {
        EventName::new("ping")
    }

    mod subscription_tests {
        use super::*;

        #[test]
        fn delivery_follows_subscription_order() {
            let mut h = host(unthrottled());
            for tag in ["first", "second", "third"] {
                h.bus.on(ping(), None, Rc::new(move |h: &mut TestHost, _: &Event| h.log.push(tag.into())));
            }
            emit(&mut h, Event::new(ping()));
            assert_eq!(h.log, vec!["first", "second", "third"]);
        }

        #[test]
        fn missing_subscribers_is_a_noop() {
            let mut h = host(BusConfig::default());
            assert_eq!(emit(&mut h, Event::new(ping())), Dispatch::Delivered(0));
        }

        #[test]
        fn off_removes_exactly_one_subscription() {
            let mut h = host(unthrottled());
            let a = h.bus.on(ping(), None, Rc::new(|h: &mut TestHost, _: &Event| h.log.push("a".into())));
            h.bus.on(ping(), None, Rc::new(|h: &mut TestHost, _: &Event| h.log.push("b".into())));
            assert!(h.bus.off(a));
            assert!(!h.bus.off(a));
            emit(&mut h, Event::new(ping()));
            assert_eq!(h.log, vec!["b"]);
            assert_eq!(h.bus.subscriber_count(&ping()), 1);
        }

        #[test]
        fn scoped_subscription_filters_targeted_events() {
            let mut h = host(unthrottled());
            let one = EntityId::new(1);
            let two = EntityId::new(2);
            h.bus.on(ping(), Some(one), Rc::new(|h: &mut TestHost, _: &Event| h.log.push("one".into())));
            h.bus.on(ping(), Some(two), Rc::new(|h: &mut TestHost, _: &Event| h.log.push("two".into())));

            emit(&mut h, Event::new(ping()).to(two));
            assert_eq!(h.log, vec!["two"]);

            h.log.clear();
            emit(&mut h, Event::new(ping()));
            assert_eq!(h.log, vec!["one", "two"]);
        }

        #[test]
        fn handler_removed_mid_dispatch_is_skipped() {
            let mut h = host(unthrottled());
            let victim = Rc::new(std::cell::Cell::new(None));
            let v = Rc::clone(&victim);
            h.bus.on(
                ping(),
                None,
                Rc::new(move |h: &mut TestHost, _: &Event| {
                    if let Some(id) = v.get() {
                        h.bus.off(id);
                    }
                    h.log.push("killer".into());
                }),
            );
            let id = h.bus.on(ping(), None, Rc::new(|h: &mut TestHost, _: &Event| h.log.push("victim".into())));
            victim.set(Some(id));

            assert_eq!(emit(&mut h, Event::new(ping())), Dispatch::Delivered(1));
            assert_eq!(h.log, vec!["killer"]);
        }
    }

    mod recursion_tests {
        use super::*;

        #[test]
        fn self_reemitting_handler_stops_at_depth_limit() {
            let mut h = host(unthrottled());
            h.bus.on(
                ping(),
                None,
                Rc::new(|h: &mut TestHost, e: &Event| {
                    let depth = h.bus.depth();
                    h.max_seen_depth = h.max_seen_depth.max(depth);
                    emit(h, e.clone());
                }),
            );

            emit(&mut h, Event::new(ping()));

            assert_eq!(h.max_seen_depth, MAX_DEPTH);
            assert_eq!(h.bus.depth(), 0);
            assert_eq!(h.bus.stats().depth_dropped, 1);
            assert_eq!(h.bus.stats().delivered, u64::from(MAX_DEPTH));
        }

        #[test]
        fn configured_depth_is_honored() {
            let mut h = host(BusConfig {
                max_depth: 3,
                ..unthrottled()
            });
            h.bus.on(
                ping(),
                None,
                Rc::new(|h: &mut TestHost, e: &Event| {
                    h.log.push(format!("depth {}", h.bus.depth()));
                    emit(h, e.clone());
                }),
            );
            emit(&mut h, Event::new(ping()));
            assert_eq!(h.log, vec!["depth 1", "depth 2", "depth 3"]);
        }
    }

    mod throttle_tests {
        use super::*;

        fn counting_host() -> TestHost {
            let mut h = host(BusConfig::default());
            h.bus.on(ping(), None, Rc::new(|h: &mut TestHost, _: &Event| h.log.push("hit".into())));
            h
        }

        #[test]
        fn repeat_inside_window_is_dropped() {
            let mut h = counting_host();
            assert_eq!(emit(&mut h, Event::new(ping())), Dispatch::Delivered(1));
            h.clock.advance(15);
            assert_eq!(emit(&mut h, Event::new(ping())), Dispatch::Throttled);
            h.clock.advance(1);
            assert_eq!(emit(&mut h, Event::new(ping())), Dispatch::Delivered(1));
            assert_eq!(h.log.len(), 2);
            assert_eq!(h.bus.stats().throttled, 1);
        }

        #[test]
        fn dropped_emission_does_not_extend_window() {
            let mut h = counting_host();
            emit(&mut h, Event::new(ping()));
            h.clock.advance(10);
            emit(&mut h, Event::new(ping()));
            h.clock.advance(6);
            assert_eq!(emit(&mut h, Event::new(ping())), Dispatch::Delivered(1));
        }

        #[test]
        fn distinct_targets_and_pairs_are_tracked_separately() {
            let mut h = counting_host();
            emit(&mut h, Event::new(ping()).to(EntityId::new(1)));
            assert_eq!(emit(&mut h, Event::new(ping()).to(EntityId::new(2))), Dispatch::Delivered(1));

            let pair = |a, b| {
                Event::new(ping()).with(Payload::Collision {
                    a: EntityId::new(a),
                    b: EntityId::new(b),
                })
            };
            emit(&mut h, pair(1, 2));
            assert_eq!(emit(&mut h, pair(1, 3)), Dispatch::Delivered(1));
            assert_eq!(emit(&mut h, pair(2, 1)), Dispatch::Throttled);
        }

        #[test]
        fn unthrottled_names_bypass_window() {
            let mut h = host(BusConfig::default());
            h.bus.on(EventName::KEY_DOWN, None, Rc::new(|h: &mut TestHost, _: &Event| h.log.push("key".into())));
            emit(&mut h, Event::new(EventName::KEY_DOWN));
            emit(&mut h, Event::new(EventName::KEY_DOWN));
            assert_eq!(h.log.len(), 2);
        }

        #[test]
        fn stale_entries_are_evicted_past_table_limit() {
            let mut h = host(BusConfig {
                throttle_table_limit: 4,
                ..BusConfig::default()
            });
            for i in 0..4 {
                emit(&mut h, Event::new(ping()).to(EntityId::new(i)));
            }
            assert_eq!(h.bus.throttle_entries(), 4);

            h.clock.advance(1_001);
            emit(&mut h, Event::new(ping()).to(EntityId::new(99)));
            assert_eq!(h.bus.throttle_entries(), 1);
        }

        #[test]
        fn config_deserializes_partially() {
            let config: BusConfig = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
            assert_eq!(config.max_depth, 8);
            assert_eq!(config.throttle_interval_ms, 16);
            assert!(config.unthrottled.contains(&EventName::CLEANUP));
        }
    }
}

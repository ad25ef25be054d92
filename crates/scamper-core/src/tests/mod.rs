//! Cross-module tests for the runtime core.
//!
//! - `integration.rs`: plugins, the bus and collision routing driven through
//!   the frame loop
//! - `scenarios.rs`: the end-to-end guarantees (single registration, unit
//!   force, bus guards, the movement cycle and pathfinding)
//! - `helpers.rs`: game factories, spawn helpers, input shortcuts and a
//!   force-recording physics wrapper

mod helpers;
mod scenarios;

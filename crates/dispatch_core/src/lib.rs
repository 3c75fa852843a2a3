//! Taxi dispatch simulation core.
//!
//! Taxis and clients live in a `bevy_ecs` world driven by a discrete-event
//! clock. Scans pair waiting clients with the cheapest available taxi, a claim
//! locks the pair, and each trip runs two routed legs before the taxi is
//! released.

pub mod assignment;
pub mod clock;
pub mod control;
pub mod ecs;
pub mod error;
pub mod geo;
pub mod interpolation;
pub mod matching;
pub mod registry;
pub mod render;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod systems;
pub mod telemetry;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

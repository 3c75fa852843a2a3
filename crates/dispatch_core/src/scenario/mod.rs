//! Scenario setup: dispatch settings, seeded randomness and the initial fleet.

mod build;
mod params;

pub use build::{build_scenario, build_scenario_with};
pub use params::{
    DispatchConfig, DispatchRng, ScenarioParams, DEFAULT_GENERATION_RANGE_DEG,
    DEFAULT_MAP_CENTER,
};

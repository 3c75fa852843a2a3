use bevy_ecs::prelude::World;
use dispatch_core::geo::Coordinate;
use dispatch_core::render::RenderLog;
use dispatch_core::routing::RouteGateway;
use dispatch_core::scenario::ScenarioParams;
use dispatch_core::test_helpers::{create_test_world_with, test_params, ScriptedRouteGateway};

/// Coordinates used across dispatch tests. The scripted gateway keys costs by origin.
pub const ORIGIN: Coordinate = Coordinate::new(0.0, 0.0);
pub const NEAR: Coordinate = Coordinate::new(0.001, 0.0);
pub const FAR: Coordinate = Coordinate::new(0.02, 0.0);

/// Builder for reproducible test worlds.
pub struct TestWorldBuilder {
    params: ScenarioParams,
    gateway: Box<dyn RouteGateway>,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorldBuilder {
    /// Seeded parameters, short paths, and a scripted gateway with default behaviour.
    pub fn new() -> Self {
        Self {
            params: test_params(),
            gateway: Box::new(ScriptedRouteGateway::default()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params = self.params.with_seed(seed);
        self
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.params = self.params.with_speed(speed);
        self
    }

    pub fn with_interpolation_points(mut self, points: usize) -> Self {
        self.params = self.params.with_interpolation_points(points);
        self
    }

    pub fn with_fleet(mut self, taxis: usize, clients: usize) -> Self {
        self.params = self.params.with_taxis(taxis).with_clients(clients);
        self
    }

    pub fn with_gateway(mut self, gateway: impl RouteGateway + 'static) -> Self {
        self.gateway = Box::new(gateway);
        self
    }

    pub fn build(self) -> (World, RenderLog) {
        create_test_world_with(self.params, self.gateway)
    }
}

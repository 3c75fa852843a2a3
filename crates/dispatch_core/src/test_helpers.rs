//! Test helpers: a scripted route gateway and a ready-to-run world.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bevy_ecs::prelude::World;

use crate::ecs::{ClientId, Status};
use crate::error::{RoutingError, RoutingResult};
use crate::geo::Coordinate;
use crate::registry::{add_client, update_status, AgentRef};
use crate::render::{RecordingRenderer, RenderLog};
use crate::routing::{DistanceMetric, Route, RouteGateway, TrafficModel};
use crate::scenario::{build_scenario_with, ScenarioParams};

/// Seed used by [`create_test_world`].
pub const TEST_SEED: u64 = 42;

/// Route gateway with per-origin costs and switchable failures.
///
/// Routes are single straight segments. Unless scripted, the cost of a trip is
/// its haversine length in kilometres, for either metric.
#[derive(Debug, Default)]
pub struct ScriptedRouteGateway {
    costs: HashMap<(i64, i64), f64>,
    default_cost: Option<f64>,
    failing_costs: HashSet<(i64, i64)>,
    failing_route_calls: HashSet<usize>,
    fail_every: Option<usize>,
    fail_all_routes: bool,
    route_calls: Arc<AtomicUsize>,
    cost_calls: Arc<AtomicUsize>,
}

impl ScriptedRouteGateway {
    /// Cost of any trip starting at `origin`.
    pub fn with_cost_from(mut self, origin: Coordinate, cost: f64) -> Self {
        self.costs.insert(origin.quantized(), cost);
        self
    }

    pub fn with_default_cost(mut self, cost: f64) -> Self {
        self.default_cost = Some(cost);
        self
    }

    /// Cost queries from `origin` fail.
    pub fn failing_cost_from(mut self, origin: Coordinate) -> Self {
        self.failing_costs.insert(origin.quantized());
        self
    }

    /// The `n`-th route request (1-based) fails.
    pub fn failing_route_call(mut self, n: usize) -> Self {
        self.failing_route_calls.insert(n);
        self
    }

    /// Every `n`-th route request fails.
    pub fn failing_every(mut self, n: usize) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }

    pub fn failing_all_routes(mut self) -> Self {
        self.fail_all_routes = true;
        self
    }

    /// Shared counter of route requests, readable after the gateway is moved into a world.
    pub fn route_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.route_calls)
    }

    pub fn cost_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.cost_calls)
    }

    fn cost(&self, origin: Coordinate, destination: Coordinate) -> f64 {
        self.costs
            .get(&origin.quantized())
            .copied()
            .or(self.default_cost)
            .unwrap_or_else(|| origin.distance_km(destination))
    }
}

impl RouteGateway for ScriptedRouteGateway {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _traffic: TrafficModel,
    ) -> RoutingResult<Route> {
        let call = self.route_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let periodic = self.fail_every.is_some_and(|n| call % n == 0);
        if self.fail_all_routes || periodic || self.failing_route_calls.contains(&call) {
            return Err(RoutingError::Api("ZERO_RESULTS".to_string()));
        }
        Ok(Route::from_waypoints(
            &[origin, destination],
            self.cost(origin, destination),
        ))
    }

    fn travel_cost(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _traffic: TrafficModel,
        _metric: DistanceMetric,
    ) -> RoutingResult<f64> {
        self.cost_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_costs.contains(&origin.quantized()) {
            return Err(RoutingError::Api("OVER_QUERY_LIMIT".to_string()));
        }
        Ok(self.cost(origin, destination))
    }
}

/// Parameters used by [`create_test_world`]: fixed seed, short paths.
pub fn test_params() -> ScenarioParams {
    ScenarioParams::default()
        .with_seed(TEST_SEED)
        .with_interpolation_points(10)
}

/// A fully built world with `gateway` and a recording renderer, simulation stopped.
pub fn create_test_world(gateway: impl RouteGateway + 'static) -> (World, RenderLog) {
    create_test_world_with(test_params(), gateway)
}

pub fn create_test_world_with(
    params: ScenarioParams,
    gateway: impl RouteGateway + 'static,
) -> (World, RenderLog) {
    let mut world = World::new();
    let (renderer, log) = RecordingRenderer::new();
    build_scenario_with(&mut world, params, Box::new(gateway), Box::new(renderer));
    (world, log)
}

/// Add a client and promote it immediately; its lifecycle timer later finds it
/// already awake and does nothing.
pub fn add_available_client(world: &mut World, name: &str, location: Coordinate) -> ClientId {
    let id = add_client(world, name, location);
    update_status(world, AgentRef::Client(id), Status::Available);
    id
}

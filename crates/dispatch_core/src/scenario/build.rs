use bevy_ecs::prelude::World;
use tracing::info;

use crate::assignment::AssignmentBook;
use crate::clock::SimulationClock;
use crate::control::{add_client_at_random, add_taxi_at_random, start_simulation, SimulationControl};
use crate::interpolation::InterpolationCache;
use crate::registry::RegistryIndex;
use crate::render::{NullRenderer, RenderResource, RenderSink};
use crate::routing::{build_route_gateway, RouteGateway, RouteGatewayResource};
use crate::scenario::params::{DispatchRng, ScenarioParams};
use crate::systems::motion::MotionSequence;
use crate::telemetry::DispatchTelemetry;

/// Insert every dispatch resource into `world`, using the gateway named by
/// `params.route_gateway` and a headless renderer, then spawn the initial fleet.
pub fn build_scenario(world: &mut World, params: ScenarioParams) {
    let gateway = build_route_gateway(&params.route_gateway);
    build_scenario_with(world, params, gateway, Box::new(NullRenderer::default()));
}

/// Like [`build_scenario`] with an explicit gateway and render sink.
pub fn build_scenario_with(
    world: &mut World,
    params: ScenarioParams,
    gateway: Box<dyn RouteGateway>,
    renderer: Box<dyn RenderSink>,
) {
    world.insert_resource(SimulationClock::default());
    world.insert_resource(params.config);
    world.insert_resource(SimulationControl::default());
    world.insert_resource(RegistryIndex::default());
    world.insert_resource(AssignmentBook::default());
    world.insert_resource(InterpolationCache::default());
    world.insert_resource(DispatchTelemetry::default());
    world.insert_resource(MotionSequence::default());
    world.insert_resource(DispatchRng::new(params.seed));
    world.insert_resource(RouteGatewayResource(gateway));
    world.insert_resource(RenderResource(renderer));

    for _ in 0..params.initial_taxis {
        add_taxi_at_random(world);
    }
    for _ in 0..params.initial_clients {
        add_client_at_random(world);
    }
    info!(
        taxis = params.initial_taxis,
        clients = params.initial_clients,
        seed = ?params.seed,
        "scenario built"
    );

    if params.autostart {
        start_simulation(world);
    }
}

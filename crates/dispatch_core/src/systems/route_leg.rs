//! Route leg system: asks the gateway for one leg of an assignment and hands
//! the densified path to the motion driver.
//!
//! A gateway failure aborts the whole assignment: the taxi is unlocked and
//! both parties go back to `Available`. Nothing is retried here; a later scan
//! may pair them again from scratch. A routed drop-off leg marks the client
//! `Finished`, after which it is swept from the registry.

use bevy_ecs::change_detection::DetectChangesMut;
use bevy_ecs::prelude::{Commands, Query, Res, ResMut, With, Without};
use tracing::{info, warn};

use crate::assignment::{AssignmentBook, AssignmentPhase};
use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::control::SimulationControl;
use crate::ecs::{Client, Motion, Position, Status, Taxi, TripLeg};
use crate::error::RoutingError;
use crate::interpolation::InterpolationCache;
use crate::registry::RegistryIndex;
use crate::render::RenderResource;
use crate::routing::RouteGatewayResource;
use crate::scenario::DispatchConfig;
use crate::systems::motion::MotionSequence;
use crate::telemetry::{AbortedTripRecord, DispatchTelemetry};

#[allow(clippy::too_many_arguments)]
pub fn route_leg_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    config: Res<DispatchConfig>,
    control: Res<SimulationControl>,
    index: Res<RegistryIndex>,
    mut book: ResMut<AssignmentBook>,
    gateway: Res<RouteGatewayResource>,
    mut cache: ResMut<InterpolationCache>,
    mut render: ResMut<RenderResource>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut sequences: ResMut<MotionSequence>,
    mut taxis: Query<(&Position, &mut Status), (With<Taxi>, Without<Client>)>,
    mut clients: Query<(&Position, &mut Status), (With<Client>, Without<Taxi>)>,
) {
    if event.0.kind != EventKind::RouteLeg {
        return;
    }
    let Some(EventSubject::Leg(key, leg)) = event.0.subject else {
        return;
    };
    let Some(assignment) = book.get_mut(key) else {
        return;
    };
    let Some(taxi_entity) = index.taxi(key.taxi) else {
        return;
    };
    let Ok((taxi_position, _)) = taxis.get(taxi_entity) else {
        return;
    };
    let origin = taxi_position.0;

    let (phase, destination) = match leg {
        TripLeg::ToClient => (
            AssignmentPhase::LegToClient,
            index
                .client(key.client)
                .and_then(|entity| clients.get(entity).ok())
                .map(|(position, _)| position.0),
        ),
        TripLeg::ToDestination => (AssignmentPhase::LegToDestination, assignment.destination),
    };
    assignment.phase = phase;

    let routed = destination
        .ok_or(RoutingError::NoRoute)
        .and_then(|to| gateway.0.route(origin, to, config.traffic_model));

    let route = match routed {
        Ok(route) => route,
        Err(err) => {
            warn!(pair = %key, ?phase, error = %err, "routing failed, assignment aborted");
            if let Some(aborted) = book.release(key) {
                if let Some(marker) = aborted.marker {
                    render.0.remove_destination_marker(marker);
                }
            }
            if let Ok((_, mut status)) = taxis.get_mut(taxi_entity) {
                status.set_if_neq(Status::Available);
            }
            if let Some(client_entity) = index.client(key.client) {
                if let Ok((_, mut status)) = clients.get_mut(client_entity) {
                    if *status == Status::Busy {
                        *status = Status::Available;
                    }
                }
            }
            telemetry.aborted_trips.push(AbortedTripRecord {
                taxi: key.taxi,
                client: key.client,
                phase,
                reason: err.to_string(),
                at: clock.now(),
            });
            return;
        }
    };

    if leg == TripLeg::ToDestination {
        if let Some(client_entity) = index.client(key.client) {
            if let Ok((_, mut status)) = clients.get_mut(client_entity) {
                status.set_if_neq(Status::Finished);
            }
        }
    }

    let path = cache.densify(&route.segments, config.interpolation_points);
    render.0.draw_route(key.taxi, &path);
    info!(
        pair = %key,
        ?leg,
        points = path.len(),
        distance_km = route.distance_km,
        duration_secs = route.duration_secs,
        "leg routed"
    );

    let sequence = sequences.next();
    let mut motion = Motion::new(key, leg, path, sequence);
    if control.active {
        clock.schedule_in(
            0,
            EventKind::MotionTick,
            Some(EventSubject::Motion(key.taxi, sequence)),
        );
    } else {
        motion.parked = true;
    }
    commands.entity(taxi_entity).insert(motion);
}

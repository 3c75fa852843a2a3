use bevy_ecs::change_detection::DetectChangesMut;
use bevy_ecs::prelude::{Query, Res, ResMut, With, Without};
use tracing::{debug, info};

use crate::assignment::AssignmentBook;
use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Client, Status, Taxi, TripLeg};
use crate::registry::RegistryIndex;
use crate::telemetry::DispatchTelemetry;

/// Claims a proposed pair after re-checking that both parties are still free,
/// then requests the pickup leg.
pub fn claim_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    index: Res<RegistryIndex>,
    mut book: ResMut<AssignmentBook>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut taxis: Query<&mut Status, (With<Taxi>, Without<Client>)>,
    mut clients: Query<&mut Status, (With<Client>, Without<Taxi>)>,
) {
    if event.0.kind != EventKind::Claim {
        return;
    }
    let Some(EventSubject::Pair(key)) = event.0.subject else {
        return;
    };

    let (Some(taxi_entity), Some(client_entity)) = (index.taxi(key.taxi), index.client(key.client))
    else {
        debug!(pair = %key, "claim for removed entity dropped");
        telemetry.skipped_claims += 1;
        return;
    };
    let (Ok(mut taxi_status), Ok(mut client_status)) =
        (taxis.get_mut(taxi_entity), clients.get_mut(client_entity))
    else {
        return;
    };

    if *taxi_status != Status::Available || *client_status != Status::Available {
        debug!(
            pair = %key,
            taxi_status = ?*taxi_status,
            client_status = ?*client_status,
            "pair no longer available, claim skipped"
        );
        telemetry.skipped_claims += 1;
        return;
    }
    if let Err(rejection) = book.claim(key, clock.now()) {
        debug!(pair = %key, %rejection, "claim skipped");
        telemetry.skipped_claims += 1;
        return;
    }

    taxi_status.set_if_neq(Status::Busy);
    client_status.set_if_neq(Status::Busy);
    info!(pair = %key, "assignment claimed");

    clock.schedule_in(
        0,
        EventKind::RouteLeg,
        Some(EventSubject::Leg(key, TripLeg::ToClient)),
    );
}

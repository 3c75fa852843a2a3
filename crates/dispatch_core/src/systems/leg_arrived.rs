//! Leg completion: pickup starts the drop-off leg, drop-off releases the taxi.
//!
//! The client stays `Busy` through pickup. It only becomes `Finished` once the
//! drop-off leg is actually routed, so a failed drop-off route can still hand
//! it back to the waiting pool.

use bevy_ecs::change_detection::DetectChangesMut;
use bevy_ecs::prelude::{Query, Res, ResMut, Without};
use tracing::{debug, info};

use crate::assignment::AssignmentBook;
use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::control::{schedule_scan, SimulationControl};
use crate::ecs::{Client, Status, Taxi, TripLeg};
use crate::geo::random_location_around;
use crate::registry::RegistryIndex;
use crate::render::RenderResource;
use crate::scenario::{DispatchConfig, DispatchRng};
use crate::telemetry::{CompletedTripRecord, DispatchTelemetry};

#[allow(clippy::too_many_arguments)]
pub fn leg_arrived_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    config: Res<DispatchConfig>,
    control: Res<SimulationControl>,
    index: Res<RegistryIndex>,
    mut book: ResMut<AssignmentBook>,
    mut rng: ResMut<DispatchRng>,
    mut render: ResMut<RenderResource>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut taxis: Query<(&mut Taxi, &mut Status), Without<Client>>,
) {
    if event.0.kind != EventKind::LegArrived {
        return;
    }
    let Some(EventSubject::Leg(key, leg)) = event.0.subject else {
        return;
    };
    if !book.contains(key) {
        debug!(pair = %key, "arrival for abandoned assignment ignored");
        return;
    }
    let now = clock.now();

    match leg {
        TripLeg::ToClient => {
            let destination = random_location_around(
                &mut rng.0,
                config.map_center,
                config.generation_range_deg,
            );
            let marker = render.0.add_destination_marker(destination);
            if let Some(assignment) = book.get_mut(key) {
                assignment.picked_up_at = Some(now);
                assignment.destination = Some(destination);
                assignment.marker = Some(marker);
            }
            info!(pair = %key, %destination, "client picked up");
            clock.schedule_in(
                0,
                EventKind::RouteLeg,
                Some(EventSubject::Leg(key, TripLeg::ToDestination)),
            );
        }
        TripLeg::ToDestination => {
            let Some(assignment) = book.release(key) else {
                return;
            };
            if let Some(marker) = assignment.marker {
                render.0.remove_destination_marker(marker);
            }
            let mut rides = 0;
            if let Some(entity) = index.taxi(key.taxi) {
                if let Ok((mut taxi, mut status)) = taxis.get_mut(entity) {
                    status.set_if_neq(Status::Available);
                    taxi.rides += 1;
                    rides = taxi.rides;
                }
            }
            telemetry.completed_trips.push(CompletedTripRecord {
                taxi: key.taxi,
                client: key.client,
                claimed_at: assignment.claimed_at,
                picked_up_at: assignment.picked_up_at.unwrap_or(assignment.claimed_at),
                completed_at: now,
            });
            info!(pair = %key, rides, "trip completed");
            schedule_scan(&mut clock, &control);
        }
    }
}

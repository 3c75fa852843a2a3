//! Scan system: proposes a taxi for every waiting client.
//!
//! A scan never claims anything itself. Each proposal becomes a `Claim` event,
//! which re-checks both parties, since an overlapping scan may have taken
//! either of them in between.
//!
//! Every waiting client is matched against the full candidate set, so two
//! clients in one scan may both be proposed the same taxi. The first claim
//! wins and the other client waits for a later scan.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::assignment::AssignmentBook;
use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::control::SimulationControl;
use crate::ecs::{Client, ClientId, PairKey, Position, Status, Taxi, TaxiId};
use crate::geo::Coordinate;
use crate::matching::find_closest_taxi;
use crate::routing::RouteGatewayResource;
use crate::scenario::DispatchConfig;

#[allow(clippy::too_many_arguments)]
pub fn scan_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    control: Res<SimulationControl>,
    config: Res<DispatchConfig>,
    book: Res<AssignmentBook>,
    gateway: Res<RouteGatewayResource>,
    taxis: Query<(&Taxi, &Status, &Position)>,
    clients: Query<(&Client, &Status, &Position)>,
) {
    match (event.0.kind, event.0.subject) {
        (EventKind::ScanTick, Some(EventSubject::Epoch(epoch))) => {
            if !control.active || epoch != control.epoch {
                debug!(epoch, current = control.epoch, "scan chain stopped");
                return;
            }
            clock.schedule_in(
                config.scan_interval_ms,
                EventKind::ScanTick,
                Some(EventSubject::Epoch(epoch)),
            );
        }
        (EventKind::Scan, _) if control.active => {}
        _ => return,
    }

    let mut candidates: Vec<(TaxiId, Coordinate)> = taxis
        .iter()
        .filter(|(taxi, status, _)| **status == Status::Available && !book.is_locked(taxi.id))
        .map(|(taxi, _, position)| (taxi.id, position.0))
        .collect();
    candidates.sort_by_key(|(id, _)| *id);

    let mut waiting: Vec<(ClientId, Coordinate)> = clients
        .iter()
        .filter(|(client, status, _)| {
            **status == Status::Available && !book.is_client_engaged(client.id)
        })
        .map(|(client, _, position)| (client.id, position.0))
        .collect();
    waiting.sort_by_key(|(id, _)| *id);

    if candidates.is_empty() {
        if !waiting.is_empty() {
            debug!(waiting = waiting.len(), "no available taxis for this scan");
        }
        return;
    }

    for (client, client_at) in waiting {
        let Some((taxi, cost)) = find_closest_taxi(
            gateway.0.as_ref(),
            &candidates,
            client_at,
            config.traffic_model,
            config.distance_metric,
        ) else {
            debug!(%client, "no eligible taxi");
            continue;
        };
        debug!(%taxi, %client, cost, "pair proposed");
        clock.schedule_in(
            0,
            EventKind::Claim,
            Some(EventSubject::Pair(PairKey::new(taxi, client))),
        );
    }
}

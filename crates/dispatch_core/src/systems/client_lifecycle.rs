//! Client lifecycle timer: a new client hibernates for a random delay before
//! it becomes eligible for matching.

use bevy_ecs::prelude::{Query, Res, ResMut, With};
use rand::Rng;
use tracing::{debug, info};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::control::{schedule_scan, SimulationControl};
use crate::ecs::{Client, Status};
use crate::registry::RegistryIndex;
use crate::scenario::DispatchConfig;

/// Uniform delay in `[min, max)` milliseconds from the configured window.
pub fn activation_delay_ms<R: Rng + ?Sized>(rng: &mut R, config: &DispatchConfig) -> u64 {
    let min = config.client_activation_min_ms;
    let max = config.client_activation_max_ms.max(min + 1);
    rng.gen_range(min..max)
}

pub fn client_activation_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    control: Res<SimulationControl>,
    index: Res<RegistryIndex>,
    mut clients: Query<&mut Status, With<Client>>,
) {
    if event.0.kind != EventKind::ClientActivation {
        return;
    }
    let Some(EventSubject::Client(id)) = event.0.subject else {
        return;
    };
    let Some(entity) = index.client(id) else {
        debug!(client = %id, "activation for removed client ignored");
        return;
    };
    let Ok(mut status) = clients.get_mut(entity) else {
        return;
    };
    // Only a hibernating client is promoted.
    if *status != Status::Hibernate {
        return;
    }
    *status = Status::Available;
    info!(client = %id, "client available");
    schedule_scan(&mut clock, &control);
}

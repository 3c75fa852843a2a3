//! Telemetry / KPIs: completed and aborted trips, plus status counts.

use bevy_ecs::prelude::{Resource, World};

use crate::assignment::{AssignmentBook, AssignmentPhase};
use crate::ecs::{Client, ClientId, Status, Taxi, TaxiId};

/// One completed two-leg trip, recorded when the taxi reaches the drop-off.
/// Timestamps are simulation milliseconds; use the helper methods for derived KPIs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTripRecord {
    pub taxi: TaxiId,
    pub client: ClientId,
    pub claimed_at: u64,
    pub picked_up_at: u64,
    pub completed_at: u64,
}

impl CompletedTripRecord {
    /// Time from claim to arrival at the client.
    pub fn time_to_pickup(&self) -> u64 {
        self.picked_up_at.saturating_sub(self.claimed_at)
    }

    /// Time from pickup to drop-off.
    pub fn ride_duration(&self) -> u64 {
        self.completed_at.saturating_sub(self.picked_up_at)
    }

    pub fn total_duration(&self) -> u64 {
        self.completed_at.saturating_sub(self.claimed_at)
    }
}

/// An assignment abandoned because the route gateway failed.
#[derive(Debug, Clone, PartialEq)]
pub struct AbortedTripRecord {
    pub taxi: TaxiId,
    pub client: ClientId,
    pub phase: AssignmentPhase,
    pub reason: String,
    pub at: u64,
}

#[derive(Debug, Default, Resource)]
pub struct DispatchTelemetry {
    pub completed_trips: Vec<CompletedTripRecord>,
    pub aborted_trips: Vec<AbortedTripRecord>,
    /// Claims refused by the re-check (pair already taken between scan and claim).
    pub skipped_claims: u64,
}

impl DispatchTelemetry {
    pub fn completed_for(&self, taxi: TaxiId) -> usize {
        self.completed_trips.iter().filter(|r| r.taxi == taxi).count()
    }
}

/// Aggregated counts at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub taxis_available: usize,
    pub taxis_busy: usize,
    pub clients_hibernating: usize,
    pub clients_available: usize,
    pub clients_busy: usize,
    pub clients_finished: usize,
    pub active_assignments: usize,
    pub locked_taxis: usize,
}

pub fn snapshot_counts(world: &mut World) -> StatusCounts {
    let mut counts = StatusCounts::default();

    let mut taxis = world.query::<(&Taxi, &Status)>();
    for (_, status) in taxis.iter(world) {
        match status {
            Status::Available => counts.taxis_available += 1,
            Status::Busy => counts.taxis_busy += 1,
            Status::Hibernate | Status::Finished => {}
        }
    }

    let mut clients = world.query::<(&Client, &Status)>();
    for (_, status) in clients.iter(world) {
        match status {
            Status::Hibernate => counts.clients_hibernating += 1,
            Status::Available => counts.clients_available += 1,
            Status::Busy => counts.clients_busy += 1,
            Status::Finished => counts.clients_finished += 1,
        }
    }

    let book = world.resource::<AssignmentBook>();
    counts.active_assignments = book.active_count();
    counts.locked_taxis = book.locked_count();
    counts
}

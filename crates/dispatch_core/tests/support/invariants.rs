use std::collections::HashSet;

use bevy_ecs::prelude::World;
use dispatch_core::assignment::AssignmentBook;
use dispatch_core::clock::Event;
use dispatch_core::ecs::{Status, Taxi};
use dispatch_core::registry::RegistryIndex;

/// Dispatch invariants that must hold after every processed event:
/// no taxi or client in two assignments, a taxi is busy exactly when it is
/// locked, and a busy client is part of an assignment.
pub fn assert_invariants(world: &World, event: &Event) {
    let index = world.resource::<RegistryIndex>();
    let book = world.resource::<AssignmentBook>();

    let mut taxis = HashSet::new();
    let mut clients = HashSet::new();
    for assignment in book.iter() {
        assert!(
            taxis.insert(assignment.key.taxi),
            "{} in two assignments after {event:?}",
            assignment.key.taxi
        );
        assert!(
            clients.insert(assignment.key.client),
            "{} in two assignments after {event:?}",
            assignment.key.client
        );
    }
    assert_eq!(book.locked_count(), book.active_count());

    for id in index.taxi_ids() {
        let entity = index.taxi(id).expect("indexed taxi");
        let status = *world.get::<Status>(entity).expect("taxi status");
        assert!(
            matches!(status, Status::Available | Status::Busy),
            "{id} has client-only status {status:?}"
        );
        assert_eq!(
            status == Status::Busy,
            book.is_locked(id),
            "{id} is {status:?} but locked={} after {event:?}",
            book.is_locked(id)
        );
    }
    for id in book.locked_taxis() {
        assert!(index.taxi(id).is_some(), "lock held for unknown {id}");
    }

    for id in index.client_ids() {
        let entity = index.client(id).expect("indexed client");
        let status = *world.get::<Status>(entity).expect("client status");
        if status == Status::Busy {
            assert!(
                book.is_client_engaged(id),
                "{id} is busy without an assignment after {event:?}"
            );
        }
    }
}

/// Sum of taxi ride counters.
pub fn total_rides(world: &World) -> u32 {
    let index = world.resource::<RegistryIndex>();
    index
        .taxi_ids()
        .filter_map(|id| index.taxi(id))
        .filter_map(|entity| world.get::<Taxi>(entity))
        .map(|taxi| taxi.rides)
        .sum()
}

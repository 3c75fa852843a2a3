//! Entity registry: the id-to-entity index plus the add / update / remove
//! operations every other part of the crate goes through.
//!
//! Ids are allocated from counters that survive [`remove_all`], so an event
//! scheduled before a reset can never address an entity created after it.

use std::collections::BTreeMap;

use bevy_ecs::change_detection::DetectChangesMut;
use bevy_ecs::prelude::{Entity, Resource, World};
use tracing::{debug, info};

use crate::assignment::AssignmentBook;
use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::control::request_scan;
use crate::ecs::{Client, ClientId, Position, Status, Taxi, TaxiId};
use crate::geo::Coordinate;
use crate::render::RenderResource;
use crate::scenario::{DispatchConfig, DispatchRng};
use crate::systems::client_lifecycle::activation_delay_ms;

#[derive(Debug, Default, Resource)]
pub struct RegistryIndex {
    taxis: BTreeMap<TaxiId, Entity>,
    clients: BTreeMap<ClientId, Entity>,
    last_taxi_id: u32,
    last_client_id: u32,
}

impl RegistryIndex {
    pub fn taxi(&self, id: TaxiId) -> Option<Entity> {
        self.taxis.get(&id).copied()
    }

    pub fn client(&self, id: ClientId) -> Option<Entity> {
        self.clients.get(&id).copied()
    }

    /// Taxi ids in ascending order.
    pub fn taxi_ids(&self) -> impl Iterator<Item = TaxiId> + '_ {
        self.taxis.keys().copied()
    }

    /// Client ids in ascending order.
    pub fn client_ids(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.clients.keys().copied()
    }

    pub fn taxi_count(&self) -> usize {
        self.taxis.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxis.is_empty() && self.clients.is_empty()
    }

    pub(crate) fn forget_client(&mut self, id: ClientId) -> Option<Entity> {
        self.clients.remove(&id)
    }

    fn allocate_taxi(&mut self) -> TaxiId {
        self.last_taxi_id += 1;
        TaxiId(self.last_taxi_id)
    }

    fn allocate_client(&mut self) -> ClientId {
        self.last_client_id += 1;
        ClientId(self.last_client_id)
    }

    /// Forget every entity, keeping the id counters. Returns the entities to despawn.
    fn clear(&mut self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.taxis.values().copied().collect();
        entities.extend(self.clients.values().copied());
        self.taxis.clear();
        self.clients.clear();
        entities
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRef {
    Taxi(TaxiId),
    Client(ClientId),
}

fn entity_of(world: &World, agent: AgentRef) -> Option<Entity> {
    let index = world.resource::<RegistryIndex>();
    match agent {
        AgentRef::Taxi(id) => index.taxi(id),
        AgentRef::Client(id) => index.client(id),
    }
}

/// Register a new available taxi with no completed rides.
pub fn add_taxi(world: &mut World, name: impl Into<String>, location: Coordinate) -> TaxiId {
    let id = world.resource_mut::<RegistryIndex>().allocate_taxi();
    let name = name.into();
    info!(taxi = %id, %name, %location, "taxi added");
    let entity = world
        .spawn((
            Taxi { id, name, rides: 0 },
            Status::Available,
            Position(location),
        ))
        .id();
    world.resource_mut::<RegistryIndex>().taxis.insert(id, entity);
    request_scan(world);
    id
}

/// Register a new hibernating client and arm its lifecycle timer.
pub fn add_client(world: &mut World, name: impl Into<String>, location: Coordinate) -> ClientId {
    let id = world.resource_mut::<RegistryIndex>().allocate_client();
    let name = name.into();
    let entity = world
        .spawn((Client { id, name }, Status::Hibernate, Position(location)))
        .id();
    world.resource_mut::<RegistryIndex>().clients.insert(id, entity);

    let config = *world.resource::<DispatchConfig>();
    let delay_ms = activation_delay_ms(&mut world.resource_mut::<DispatchRng>().0, &config);
    world.resource_mut::<SimulationClock>().schedule_in(
        delay_ms,
        EventKind::ClientActivation,
        Some(EventSubject::Client(id)),
    );
    info!(client = %id, %location, delay_ms, "client added");
    id
}

/// Set an entity's status if it differs from the current one.
///
/// Returns `true` when the status changed. Unknown ids and no-change updates
/// are no-ops and leave change detection untouched.
pub fn update_status(world: &mut World, agent: AgentRef, status: Status) -> bool {
    let Some(entity) = entity_of(world, agent) else {
        debug!(?agent, ?status, "status update for unknown entity ignored");
        return false;
    };
    let Some(mut current) = world.get_mut::<Status>(entity) else {
        return false;
    };
    current.set_if_neq(status)
}

/// Move a taxi. Returns `false` for unknown ids.
pub fn set_taxi_location(world: &mut World, id: TaxiId, location: Coordinate) -> bool {
    let Some(entity) = world.resource::<RegistryIndex>().taxi(id) else {
        return false;
    };
    let Some(mut position) = world.get_mut::<Position>(entity) else {
        return false;
    };
    position.set_if_neq(Position(location));
    true
}

/// Remove every taxi and client and abandon all in-flight assignments.
///
/// Trips in progress are dropped without being counted. Pending events for the
/// removed ids become no-ops.
pub fn remove_all(world: &mut World) {
    let entities = world.resource_mut::<RegistryIndex>().clear();
    let removed = entities.len();
    for entity in entities {
        world.despawn(entity);
    }

    let abandoned = world.resource_mut::<AssignmentBook>().drain();
    let mut render = world.resource_mut::<RenderResource>();
    for assignment in &abandoned {
        if let Some(marker) = assignment.marker {
            render.0.remove_destination_marker(marker);
        }
    }
    render.0.clear_all_routes();
    info!(removed, abandoned = abandoned.len(), "registry cleared");
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxiSnapshot {
    pub id: TaxiId,
    pub name: String,
    pub location: Coordinate,
    pub status: Status,
    pub rides: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSnapshot {
    pub id: ClientId,
    pub name: String,
    pub location: Coordinate,
    pub status: Status,
}

/// Point-in-time copy of the registry, ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub taxis: Vec<TaxiSnapshot>,
    pub clients: Vec<ClientSnapshot>,
}

impl RegistrySnapshot {
    pub fn taxi(&self, id: TaxiId) -> Option<&TaxiSnapshot> {
        self.taxis.iter().find(|t| t.id == id)
    }

    pub fn client(&self, id: ClientId) -> Option<&ClientSnapshot> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.taxis.is_empty() && self.clients.is_empty()
    }
}

pub fn snapshot(world: &World) -> RegistrySnapshot {
    let index = world.resource::<RegistryIndex>();
    let taxis = index
        .taxis
        .values()
        .filter_map(|&entity| {
            let taxi = world.get::<Taxi>(entity)?;
            Some(TaxiSnapshot {
                id: taxi.id,
                name: taxi.name.clone(),
                location: world.get::<Position>(entity)?.0,
                status: *world.get::<Status>(entity)?,
                rides: taxi.rides,
            })
        })
        .collect();
    let clients = index
        .clients
        .values()
        .filter_map(|&entity| {
            let client = world.get::<Client>(entity)?;
            Some(ClientSnapshot {
                id: client.id,
                name: client.name.clone(),
                location: world.get::<Position>(entity)?.0,
                status: *world.get::<Status>(entity)?,
            })
        })
        .collect();
    RegistrySnapshot { taxis, clients }
}

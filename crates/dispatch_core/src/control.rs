//! Simulation controls: start / pause / restart, live settings, and random
//! placement of new taxis and clients.

use bevy_ecs::prelude::{Resource, World};
use tracing::info;

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::ecs::{ClientId, Motion, Taxi, TaxiId};
use crate::geo::{random_location_around, Coordinate};
use crate::interpolation::clamp_points;
use crate::registry::{add_client, add_taxi, remove_all, RegistryIndex};
use crate::render::RenderResource;
use crate::routing::{DistanceMetric, TrafficModel};
use crate::scenario::{DispatchConfig, DispatchRng};

/// Liveness flag plus the epoch of the periodic scan chain. Each start bumps
/// the epoch so a scan chain from an earlier run stops on its next tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Resource)]
pub struct SimulationControl {
    pub active: bool,
    pub epoch: u64,
}

/// Schedule an immediate scan if the simulation is running.
pub(crate) fn schedule_scan(clock: &mut SimulationClock, control: &SimulationControl) {
    if control.active {
        clock.schedule_in(0, EventKind::Scan, None);
    }
}

pub fn request_scan(world: &mut World) {
    let control = *world.resource::<SimulationControl>();
    schedule_scan(&mut world.resource_mut::<SimulationClock>(), &control);
}

/// Start (or resume) the simulation. Returns `false` if it was already running.
pub fn start_simulation(world: &mut World) -> bool {
    let epoch = {
        let mut control = world.resource_mut::<SimulationControl>();
        if control.active {
            return false;
        }
        control.active = true;
        control.epoch += 1;
        control.epoch
    };
    world.resource_mut::<SimulationClock>().schedule_in(
        0,
        EventKind::ScanTick,
        Some(EventSubject::Epoch(epoch)),
    );
    let resumed = resume_parked_motions(world);
    info!(epoch, resumed, "simulation started");
    true
}

/// Pause the simulation. Motions park on their next frame and keep their progress.
pub fn pause_simulation(world: &mut World) -> bool {
    let mut control = world.resource_mut::<SimulationControl>();
    if !control.active {
        return false;
    }
    control.active = false;
    info!("simulation paused");
    true
}

/// Flip between running and paused. Returns whether the simulation is now running.
pub fn toggle_pause(world: &mut World) -> bool {
    if world.resource::<SimulationControl>().active {
        pause_simulation(world);
        false
    } else {
        start_simulation(world);
        true
    }
}

/// Abandon everything: clear the registry and assignments, reset the map, and stop.
pub fn restart_simulation(world: &mut World) {
    remove_all(world);
    world.resource_mut::<RenderResource>().0.reset_map();
    world.resource_mut::<SimulationControl>().active = false;
    info!("simulation restarted");
}

fn resume_parked_motions(world: &mut World) -> usize {
    let mut query = world.query::<(&Taxi, &mut Motion)>();
    let mut parked = Vec::new();
    for (taxi, mut motion) in query.iter_mut(world) {
        if motion.parked {
            motion.parked = false;
            parked.push((taxi.id, motion.sequence));
        }
    }
    let mut clock = world.resource_mut::<SimulationClock>();
    for &(taxi, sequence) in &parked {
        clock.schedule_in(
            0,
            EventKind::MotionTick,
            Some(EventSubject::Motion(taxi, sequence)),
        );
    }
    parked.len()
}

pub fn set_speed(world: &mut World, speed: u32) {
    world.resource_mut::<DispatchConfig>().speed = speed.max(1);
}

pub fn set_traffic_model(world: &mut World, model: TrafficModel) {
    world.resource_mut::<DispatchConfig>().traffic_model = model;
}

pub fn set_distance_metric(world: &mut World, metric: DistanceMetric) {
    world.resource_mut::<DispatchConfig>().distance_metric = metric;
}

pub fn set_interpolation_points(world: &mut World, points: usize) {
    world.resource_mut::<DispatchConfig>().interpolation_points = clamp_points(points);
}

fn random_location(world: &mut World) -> Coordinate {
    let config = *world.resource::<DispatchConfig>();
    random_location_around(
        &mut world.resource_mut::<DispatchRng>().0,
        config.map_center,
        config.generation_range_deg,
    )
}

pub fn add_taxi_at_random(world: &mut World) -> TaxiId {
    let location = random_location(world);
    let name = format!("Taxi {}", world.resource::<RegistryIndex>().taxi_count() + 1);
    add_taxi(world, name, location)
}

pub fn add_client_at_random(world: &mut World) -> ClientId {
    let location = random_location(world);
    let name = format!("Client {}", world.resource::<RegistryIndex>().client_count() + 1);
    add_client(world, name, location)
}

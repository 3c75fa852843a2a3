//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule.

use bevy_ecs::prelude::Res;
use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::systems::{
    claim::claim_system, client_lifecycle::client_activation_system,
    finished_clients::finished_client_sweep_system, leg_arrived::leg_arrived_system,
    motion::motion_system, route_leg::route_leg_system, scan::scan_system,
};

fn is_scan(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| matches!(e.0.kind, EventKind::ScanTick | EventKind::Scan))
        .unwrap_or(false)
}

fn is_claim(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::Claim)
        .unwrap_or(false)
}

fn is_route_leg(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RouteLeg)
        .unwrap_or(false)
}

fn is_motion_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::MotionTick)
        .unwrap_or(false)
}

fn is_leg_arrived(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::LegArrived)
        .unwrap_or(false)
}

fn is_client_activation(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ClientActivation)
        .unwrap_or(false)
}

/// Runs one simulation step: pops the next event, inserts it as [CurrentEvent], then runs the schedule.
/// Returns `false` if the clock was empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Runs one simulation step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    hook(world, &event);
    true
}

/// Runs simulation steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
///
/// While the simulation is active the periodic scan keeps the queue non-empty,
/// so `max_steps` is what ends the run; prefer [run_until] in that case.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Runs every event scheduled at or before `end_ms`, then moves the clock to `end_ms`.
/// Returns the number of steps executed.
pub fn run_until(world: &mut World, schedule: &mut Schedule, end_ms: u64) -> usize {
    run_until_with_hook(world, schedule, end_ms, |_, _| {})
}

/// Like [run_until], invoking `hook` after each step.
pub fn run_until_with_hook<F>(
    world: &mut World,
    schedule: &mut Schedule,
    end_ms: u64,
    mut hook: F,
) -> usize
where
    F: FnMut(&World, &Event),
{
    let mut steps = 0;
    while world
        .resource::<SimulationClock>()
        .next_event_time()
        .is_some_and(|ts| ts <= end_ms)
    {
        run_next_event_with_hook(world, schedule, &mut hook);
        steps += 1;
    }
    world.resource_mut::<SimulationClock>().advance_to(end_ms);
    steps
}

/// Builds the dispatch schedule: one event-reacting system per event kind, then
/// [apply_deferred] so inserted and removed [crate::ecs::Motion] components are
/// visible, then the finished-client sweep.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.add_systems(
        (
            (
                scan_system.run_if(is_scan),
                claim_system.run_if(is_claim),
                route_leg_system.run_if(is_route_leg),
                motion_system.run_if(is_motion_tick),
                leg_arrived_system.run_if(is_leg_arrived),
                client_activation_system.run_if(is_client_activation),
            ),
            apply_deferred,
            finished_client_sweep_system,
            apply_deferred,
        )
            .chain(),
    );

    schedule
}

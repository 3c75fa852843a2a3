//! Run a small taxi fleet for ten simulated minutes and print completed trips.
//!
//! Run with: cargo run -p dispatch_core --example dispatch_demo

use bevy_ecs::prelude::World;
use dispatch_core::clock::{SimulationClock, ONE_SEC_MS};
use dispatch_core::runner::{run_until, simulation_schedule};
use dispatch_core::scenario::{build_scenario, ScenarioParams};
use dispatch_core::telemetry::{snapshot_counts, DispatchTelemetry};

fn main() {
    const NUM_TAXIS: usize = 8;
    const NUM_CLIENTS: usize = 40;
    const SIMULATION_MINUTES: u64 = 10;

    tracing_subscriber::fmt().with_target(false).init();

    let mut world = World::new();
    build_scenario(
        &mut world,
        ScenarioParams::default()
            .with_taxis(NUM_TAXIS)
            .with_clients(NUM_CLIENTS)
            .with_seed(123)
            .with_speed(20)
            .with_autostart(true),
    );

    let mut schedule = simulation_schedule();
    let steps = run_until(&mut world, &mut schedule, SIMULATION_MINUTES * 60 * ONE_SEC_MS);

    let sim_time_secs = world.resource::<SimulationClock>().now() / ONE_SEC_MS;
    let counts = snapshot_counts(&mut world);
    let telemetry = world.resource::<DispatchTelemetry>();

    println!(
        "--- Dispatch run ({NUM_TAXIS} taxis, {NUM_CLIENTS} clients, {SIMULATION_MINUTES} min, seed 123) ---"
    );
    println!("Steps executed: {steps}");
    println!("Simulation time: {sim_time_secs} s");
    println!("Completed trips: {}", telemetry.completed_trips.len());
    println!("Aborted trips: {}", telemetry.aborted_trips.len());
    println!("Skipped claims: {}", telemetry.skipped_claims);
    println!(
        "Taxis available/busy: {}/{}  clients waiting/hibernating: {}/{}",
        counts.taxis_available,
        counts.taxis_busy,
        counts.clients_available,
        counts.clients_hibernating,
    );

    for (i, trip) in telemetry.completed_trips.iter().take(20).enumerate() {
        println!(
            "  {:>2}  {} -> {}  pickup={} ms  ride={} ms  completed_at={} s",
            i + 1,
            trip.taxi,
            trip.client,
            trip.time_to_pickup(),
            trip.ride_duration(),
            trip.completed_at / ONE_SEC_MS,
        );
    }
}

mod support;

use dispatch_core::assignment::{AssignmentBook, AssignmentPhase};
use dispatch_core::clock::{EventKind, SimulationClock, ONE_SEC_MS};
use dispatch_core::control::{restart_simulation, start_simulation, toggle_pause};
use dispatch_core::ecs::{Motion, Status};
use dispatch_core::geo::Coordinate;
use dispatch_core::registry::{add_client, add_taxi, snapshot, RegistryIndex};
use dispatch_core::render::RenderCommand;
use dispatch_core::routing::{DistanceMetric, H3GridRouteGateway};
use dispatch_core::scenario::DispatchConfig;
use dispatch_core::telemetry::DispatchTelemetry;
use dispatch_core::test_helpers::{add_available_client, ScriptedRouteGateway};

use support::invariants::total_rides;
use support::schedule::ScheduleRunner;
use support::world::{TestWorldBuilder, FAR, NEAR, ORIGIN};

#[test]
fn single_pair_is_claimed_by_one_scan_and_completes_one_ride() {
    let (mut world, log) = TestWorldBuilder::new()
        .with_gateway(ScriptedRouteGateway::default().with_default_cost(10.0))
        .build();
    let taxi = add_taxi(&mut world, "Taxi 1", ORIGIN);
    let client = add_available_client(&mut world, "Client 1", ORIGIN);
    start_simulation(&mut world);

    let mut runner = ScheduleRunner::new();
    runner.run_through(&mut world, EventKind::Claim);

    let snap = snapshot(&world);
    assert_eq!(snap.taxi(taxi).map(|t| t.status), Some(Status::Busy));
    assert_eq!(snap.client(client).map(|c| c.status), Some(Status::Busy));
    assert!(world.resource::<AssignmentBook>().is_locked(taxi));

    runner.run_until(&mut world, 20 * ONE_SEC_MS);

    let snap = snapshot(&world);
    let taxi_after = snap.taxi(taxi).expect("taxi");
    assert_eq!(taxi_after.status, Status::Available);
    assert_eq!(taxi_after.rides, 1);
    assert!(snap.client(client).is_none());

    let book = world.resource::<AssignmentBook>();
    assert_eq!(book.active_count(), 0);
    assert!(!book.is_locked(taxi));

    let commands = log.commands();
    assert!(commands.contains(&RenderCommand::RemoveClientMarker { client }));
    assert_eq!(
        log.count(|c| matches!(c, RenderCommand::DrawRoute { .. })),
        2
    );
    assert_eq!(
        log.count(|c| matches!(c, RenderCommand::AddDestinationMarker { .. })),
        1
    );
    assert_eq!(
        log.count(|c| matches!(c, RenderCommand::RemoveDestinationMarker { .. })),
        1
    );
}

#[test]
fn cheapest_taxi_wins_and_the_other_stays_free() {
    let (mut world, _) = TestWorldBuilder::new()
        .with_gateway(
            ScriptedRouteGateway::default()
                .with_cost_from(NEAR, 5.0)
                .with_cost_from(FAR, 20.0),
        )
        .build();
    // Add the expensive taxi first so iteration order alone would pick it.
    let taxi_b = add_taxi(&mut world, "Taxi B", FAR);
    let taxi_a = add_taxi(&mut world, "Taxi A", NEAR);
    add_available_client(&mut world, "Client 1", ORIGIN);
    start_simulation(&mut world);

    let mut runner = ScheduleRunner::new();
    runner.run_through(&mut world, EventKind::Claim);

    let snap = snapshot(&world);
    assert_eq!(snap.taxi(taxi_a).map(|t| t.status), Some(Status::Busy));
    assert_eq!(snap.taxi(taxi_b).map(|t| t.status), Some(Status::Available));
    let book = world.resource::<AssignmentBook>();
    assert!(book.is_locked(taxi_a));
    assert!(!book.is_locked(taxi_b));
}

#[test]
fn distance_metric_selects_the_physically_closer_taxi() {
    let client_at = Coordinate::new(51.1079, 17.0385);
    let (mut world, _) = TestWorldBuilder::new()
        .with_gateway(H3GridRouteGateway)
        .build();
    world.resource_mut::<DispatchConfig>().distance_metric = DistanceMetric::Distance;
    let far = add_taxi(&mut world, "Taxi 1", Coordinate::new(51.1500, 17.0900));
    let near = add_taxi(&mut world, "Taxi 2", Coordinate::new(51.1090, 17.0400));
    add_available_client(&mut world, "Client 1", client_at);
    start_simulation(&mut world);

    let mut runner = ScheduleRunner::new();
    runner.run_through(&mut world, EventKind::Claim);

    let book = world.resource::<AssignmentBook>();
    assert!(book.is_locked(near));
    assert!(!book.is_locked(far));
}

#[test]
fn routing_failure_on_pickup_leg_rolls_back_without_retry() {
    let (mut world, _) = TestWorldBuilder::new()
        .with_gateway(ScriptedRouteGateway::default().failing_route_call(1))
        .build();
    let taxi = add_taxi(&mut world, "Taxi 1", NEAR);
    let client = add_available_client(&mut world, "Client 1", ORIGIN);
    start_simulation(&mut world);

    let mut runner = ScheduleRunner::new();
    runner.run_through(&mut world, EventKind::Claim);
    runner.run_through(&mut world, EventKind::RouteLeg);

    let snap = snapshot(&world);
    assert_eq!(snap.taxi(taxi).map(|t| t.status), Some(Status::Available));
    assert_eq!(snap.taxi(taxi).map(|t| t.rides), Some(0));
    assert_eq!(snap.client(client).map(|c| c.status), Some(Status::Available));

    let book = world.resource::<AssignmentBook>();
    assert_eq!(book.active_count(), 0);
    assert_eq!(book.locked_count(), 0);

    let clock = world.resource::<SimulationClock>();
    assert_eq!(clock.pending_of(EventKind::Scan), 0, "abort must not rescan");
    assert_eq!(clock.pending_of(EventKind::MotionTick), 0);

    let telemetry = world.resource::<DispatchTelemetry>();
    assert_eq!(telemetry.aborted_trips.len(), 1);
    assert_eq!(telemetry.aborted_trips[0].phase, AssignmentPhase::LegToClient);

    // The next periodic scan starts over and succeeds.
    runner.run_until(&mut world, 20 * ONE_SEC_MS);
    assert_eq!(snapshot(&world).taxi(taxi).map(|t| t.rides), Some(1));
}

#[test]
fn routing_failure_on_drop_off_leg_returns_both_parties_to_the_pool() {
    let (mut world, log) = TestWorldBuilder::new()
        .with_gateway(ScriptedRouteGateway::default().failing_route_call(2))
        .build();
    let taxi = add_taxi(&mut world, "Taxi 1", NEAR);
    let client = add_available_client(&mut world, "Client 1", ORIGIN);
    start_simulation(&mut world);

    let mut runner = ScheduleRunner::new();
    runner.run_through(&mut world, EventKind::LegArrived);
    assert_eq!(
        snapshot(&world).client(client).map(|c| c.status),
        Some(Status::Busy),
        "client waits in the taxi until the drop-off leg is routed"
    );

    runner.run_through(&mut world, EventKind::RouteLeg);

    let snap = snapshot(&world);
    assert_eq!(snap.taxi(taxi).map(|t| t.status), Some(Status::Available));
    assert_eq!(snap.taxi(taxi).map(|t| t.rides), Some(0));
    assert_eq!(snap.client(client).map(|c| c.status), Some(Status::Available));
    let book = world.resource::<AssignmentBook>();
    assert_eq!(book.active_count(), 0);
    assert_eq!(book.locked_count(), 0);
    assert_eq!(
        log.count(|c| matches!(c, RenderCommand::RemoveDestinationMarker { .. })),
        1
    );
    assert!(!log
        .commands()
        .contains(&RenderCommand::RemoveClientMarker { client }));
    let telemetry = world.resource::<DispatchTelemetry>();
    assert_eq!(
        telemetry.aborted_trips[0].phase,
        AssignmentPhase::LegToDestination
    );
    assert!(telemetry.completed_trips.is_empty());

    // The client is still waiting, so the next periodic scan serves it.
    runner.run_until(&mut world, 20 * ONE_SEC_MS);
    let snap = snapshot(&world);
    assert_eq!(snap.taxi(taxi).map(|t| t.rides), Some(1));
    assert!(snap.client(client).is_none());
}

#[test]
fn client_finishes_only_once_the_drop_off_leg_is_routed() {
    let (mut world, log) = TestWorldBuilder::new().build();
    add_taxi(&mut world, "Taxi 1", NEAR);
    let client = add_available_client(&mut world, "Client 1", ORIGIN);
    start_simulation(&mut world);

    let mut runner = ScheduleRunner::new();
    runner.run_through(&mut world, EventKind::LegArrived);
    assert!(snapshot(&world).client(client).is_some());
    assert!(!log
        .commands()
        .contains(&RenderCommand::RemoveClientMarker { client }));

    runner.run_through(&mut world, EventKind::RouteLeg);
    assert!(snapshot(&world).client(client).is_none());
    assert!(log
        .commands()
        .contains(&RenderCommand::RemoveClientMarker { client }));
}

#[test]
fn restart_mid_motion_abandons_the_trip_and_stale_ticks_do_nothing() {
    let (mut world, log) = TestWorldBuilder::new().build();
    let taxi = add_taxi(&mut world, "Taxi 1", NEAR);
    add_available_client(&mut world, "Client 1", ORIGIN);
    start_simulation(&mut world);

    let mut runner = ScheduleRunner::new();
    runner.run_through(&mut world, EventKind::MotionTick);
    runner.run_through(&mut world, EventKind::MotionTick);
    let entity = world.resource::<RegistryIndex>().taxi(taxi).expect("taxi");
    assert!(world.get::<Motion>(entity).is_some());
    assert_eq!(snapshot(&world).taxi(taxi).map(|t| t.status), Some(Status::Busy));

    restart_simulation(&mut world);

    assert!(snapshot(&world).is_empty());
    let book = world.resource::<AssignmentBook>();
    assert_eq!(book.active_count(), 0);
    assert_eq!(book.locked_count(), 0);
    assert!(world.resource::<SimulationClock>().pending_of(EventKind::MotionTick) > 0);
    assert!(log.commands().contains(&RenderCommand::ResetMap));

    let now = world.resource::<SimulationClock>().now();
    runner.run_until(&mut world, now + 15 * ONE_SEC_MS);
    assert!(snapshot(&world).is_empty());
    assert!(world
        .resource::<DispatchTelemetry>()
        .completed_trips
        .is_empty());

    // A fresh fleet after the restart gets new ids and runs normally.
    let fresh = add_taxi(&mut world, "Taxi 1", NEAR);
    assert_ne!(fresh, taxi);
    add_available_client(&mut world, "Client 1", ORIGIN);
    start_simulation(&mut world);
    let now = world.resource::<SimulationClock>().now();
    runner.run_until(&mut world, now + 20 * ONE_SEC_MS);
    assert_eq!(snapshot(&world).taxi(fresh).map(|t| t.rides), Some(1));
}

#[test]
fn hibernating_client_becomes_available_only_after_its_delay() {
    let (mut world, _) = TestWorldBuilder::new().build();
    let client = add_client(&mut world, "Client 1", ORIGIN);
    let due = world
        .resource::<SimulationClock>()
        .next_event_time()
        .expect("activation scheduled");
    assert!((ONE_SEC_MS..10 * ONE_SEC_MS).contains(&due));

    let mut runner = ScheduleRunner::new();
    runner.run_until(&mut world, due - 1);
    assert_eq!(
        snapshot(&world).client(client).map(|c| c.status),
        Some(Status::Hibernate)
    );

    runner.run_until(&mut world, due);
    assert_eq!(
        snapshot(&world).client(client).map(|c| c.status),
        Some(Status::Available)
    );
}

#[test]
fn hibernating_clients_are_never_matched() {
    let (mut world, _) = TestWorldBuilder::new().build();
    add_taxi(&mut world, "Taxi 1", NEAR);
    let client = add_client(&mut world, "Client 1", ORIGIN);
    start_simulation(&mut world);

    let mut runner = ScheduleRunner::new();
    runner.run_through(&mut world, EventKind::ScanTick);
    assert_eq!(
        world.resource::<SimulationClock>().pending_of(EventKind::Claim),
        0
    );

    // Activation triggers a scan straight away.
    runner.run_through(&mut world, EventKind::ClientActivation);
    assert_eq!(
        snapshot(&world).client(client).map(|c| c.status),
        Some(Status::Available)
    );
    assert_eq!(
        world.resource::<SimulationClock>().pending_of(EventKind::Scan),
        1
    );
}

#[test]
fn pause_mid_trip_holds_position_and_resume_finishes_it() {
    let (mut world, _) = TestWorldBuilder::new().with_interpolation_points(100).build();
    let taxi = add_taxi(&mut world, "Taxi 1", FAR);
    add_available_client(&mut world, "Client 1", ORIGIN);
    start_simulation(&mut world);

    let mut runner = ScheduleRunner::new();
    for _ in 0..5 {
        runner.run_through(&mut world, EventKind::MotionTick);
    }
    assert!(!toggle_pause(&mut world));
    // Let the pending frame park the motion, then idle for a while.
    let now = world.resource::<SimulationClock>().now();
    runner.run_until(&mut world, now + 60 * ONE_SEC_MS);

    let entity = world.resource::<RegistryIndex>().taxi(taxi).expect("taxi");
    let parked = world.get::<Motion>(entity).expect("motion kept").clone();
    assert!(parked.parked);
    assert_eq!(parked.index, 10);
    let held_at = snapshot(&world).taxi(taxi).map(|t| t.location);
    assert_eq!(snapshot(&world).taxi(taxi).map(|t| t.rides), Some(0));

    assert!(toggle_pause(&mut world));
    runner.run_through(&mut world, EventKind::MotionTick);
    let resumed = world.get::<Motion>(entity).expect("motion");
    assert_eq!(resumed.index, 12);
    assert_ne!(snapshot(&world).taxi(taxi).map(|t| t.location), held_at);

    let now = world.resource::<SimulationClock>().now();
    runner.run_until(&mut world, now + 20 * ONE_SEC_MS);
    assert_eq!(total_rides(&world), 1);
}

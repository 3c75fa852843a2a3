pub mod claim;
pub mod client_lifecycle;
pub mod finished_clients;
pub mod leg_arrived;
pub mod motion;
pub mod route_leg;
pub mod scan;

#[cfg(test)]
mod end_to_end_tests {
    use crate::clock::ONE_SEC_MS;
    use crate::control::start_simulation;
    use crate::ecs::Status;
    use crate::geo::Coordinate;
    use crate::registry::{add_client, add_taxi, snapshot};
    use crate::runner::{run_until, simulation_schedule};
    use crate::telemetry::DispatchTelemetry;
    use crate::test_helpers::{create_test_world, ScriptedRouteGateway};

    #[test]
    fn simulates_one_ride_end_to_end() {
        let (mut world, _) = create_test_world(ScriptedRouteGateway::default());
        let taxi = add_taxi(&mut world, "Taxi 1", Coordinate::new(51.10, 17.03));
        let client = add_client(&mut world, "Client 1", Coordinate::new(51.11, 17.04));
        start_simulation(&mut world);

        let mut schedule = simulation_schedule();
        run_until(&mut world, &mut schedule, 30 * ONE_SEC_MS);

        let snap = snapshot(&world);
        let taxi = snap.taxi(taxi).expect("taxi");
        assert_eq!(taxi.status, Status::Available);
        assert_eq!(taxi.rides, 1);
        assert!(snap.client(client).is_none(), "finished client is removed");

        let telemetry = world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.completed_trips.len(), 1);
        let record = &telemetry.completed_trips[0];
        assert!(record.claimed_at >= ONE_SEC_MS, "client hibernates at least 1s");
        assert!(record.claimed_at <= record.picked_up_at);
        assert!(record.picked_up_at <= record.completed_at);
    }

    #[test]
    fn simulates_two_concurrent_rides_end_to_end() {
        let (mut world, _) = create_test_world(ScriptedRouteGateway::default());
        let t1 = add_taxi(&mut world, "Taxi 1", Coordinate::new(51.10, 17.03));
        let t2 = add_taxi(&mut world, "Taxi 2", Coordinate::new(51.12, 17.05));
        add_client(&mut world, "Client 1", Coordinate::new(51.101, 17.031));
        add_client(&mut world, "Client 2", Coordinate::new(51.121, 17.051));
        start_simulation(&mut world);

        let mut schedule = simulation_schedule();
        run_until(&mut world, &mut schedule, 30 * ONE_SEC_MS);

        let snap = snapshot(&world);
        assert!(snap.clients.is_empty());
        let rides: u32 = snap.taxis.iter().map(|t| t.rides).sum();
        assert_eq!(rides, 2);
        for id in [t1, t2] {
            assert_eq!(snap.taxi(id).map(|t| t.status), Some(Status::Available));
        }
        assert_eq!(world.resource::<DispatchTelemetry>().completed_trips.len(), 2);
    }
}

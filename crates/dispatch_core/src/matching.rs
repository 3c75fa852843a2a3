//! Closest-taxi selection by route-gateway travel cost.

use tracing::warn;

use crate::ecs::TaxiId;
use crate::geo::Coordinate;
use crate::routing::{DistanceMetric, RouteGateway, TrafficModel};

/// Pick the candidate with the lowest travel cost to `client_at`.
///
/// Candidates are compared in the order given; on equal cost the first one
/// wins. A candidate whose cost query fails (or yields a non-finite cost) is
/// skipped. Returns `None` if no candidate has a usable cost.
pub fn find_closest_taxi(
    gateway: &dyn RouteGateway,
    candidates: &[(TaxiId, Coordinate)],
    client_at: Coordinate,
    traffic: TrafficModel,
    metric: DistanceMetric,
) -> Option<(TaxiId, f64)> {
    let mut best: Option<(TaxiId, f64)> = None;
    for &(taxi, location) in candidates {
        let cost = match gateway.travel_cost(location, client_at, traffic, metric) {
            Ok(cost) if cost.is_finite() => cost,
            Ok(cost) => {
                warn!(%taxi, cost, "ignoring non-finite travel cost");
                continue;
            }
            Err(err) => {
                warn!(%taxi, error = %err, "travel cost query failed");
                continue;
            }
        };
        match best {
            Some((_, best_cost)) if cost >= best_cost => {}
            _ => best = Some((taxi, cost)),
        }
    }
    best
}

//! Route gateways: the seam between dispatch and whatever computes geography.
//!
//! Implementations, selectable via [`RouteGatewayKind`]:
//!
//! - **`H3GridRouteGateway`**: H3 grid path + haversine distance. Offline, no I/O.
//! - **`OsrmRouteGateway`** (feature `osrm`): calls an OSRM HTTP endpoint.
//!
//! The gateway is stored as a `Box<dyn RouteGateway>` ECS resource, built from
//! `RouteGatewayKind` during scenario building.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use bevy_ecs::prelude::Resource;
use h3o::{CellIndex, Resolution};
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::error::{RoutingError, RoutingResult};
use crate::geo::{Coordinate, PathSegment};

/// Free-flow city speed used to estimate durations.
const AVERAGE_SPEED_KMH: f64 = 40.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficModel {
    Optimistic,
    #[default]
    Pessimistic,
}

impl TrafficModel {
    /// Multiplier applied to free-flow durations.
    pub fn duration_factor(self) -> f64 {
        match self {
            TrafficModel::Optimistic => 0.85,
            TrafficModel::Pessimistic => 1.35,
        }
    }
}

/// Which travel-cost figure the matcher minimizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Duration,
    Distance,
}

/// A coarse route: ordered segments plus the gateway's cost estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub segments: Vec<PathSegment>,
    pub distance_km: f64,
    pub duration_secs: f64,
}

impl Route {
    /// Build a route from consecutive waypoints. Distance is the haversine sum.
    pub fn from_waypoints(waypoints: &[Coordinate], duration_secs: f64) -> Self {
        let segments: Vec<PathSegment> = waypoints
            .windows(2)
            .map(|pair| PathSegment::new(pair[0], pair[1]))
            .collect();
        let distance_km = segments.iter().map(PathSegment::length_km).sum();
        Self {
            segments,
            distance_km,
            duration_secs,
        }
    }

    pub fn cost(&self, metric: DistanceMetric) -> f64 {
        match metric {
            DistanceMetric::Duration => self.duration_secs,
            DistanceMetric::Distance => self.distance_km,
        }
    }
}

/// Trait for routing backends. Implementations must be `Send + Sync` so the
/// gateway can be stored as a shared ECS resource.
pub trait RouteGateway: Send + Sync {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        traffic: TrafficModel,
    ) -> RoutingResult<Route>;

    /// Cost of travelling from `origin` to `destination` under `metric`.
    fn travel_cost(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        traffic: TrafficModel,
        metric: DistanceMetric,
    ) -> RoutingResult<f64> {
        self.route(origin, destination, traffic)
            .map(|route| route.cost(metric))
    }
}

impl<G: RouteGateway + ?Sized> RouteGateway for Box<G> {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        traffic: TrafficModel,
    ) -> RoutingResult<Route> {
        (**self).route(origin, destination, traffic)
    }

    fn travel_cost(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        traffic: TrafficModel,
        metric: DistanceMetric,
    ) -> RoutingResult<f64> {
        (**self).travel_cost(origin, destination, traffic, metric)
    }
}

/// ECS resource wrapping a boxed route gateway.
#[derive(Resource)]
pub struct RouteGatewayResource(pub Box<dyn RouteGateway>);

// ---------------------------------------------------------------------------
// H3 grid gateway (always available)
// ---------------------------------------------------------------------------

/// Routes along the H3 resolution-9 grid. Interior waypoints are cell centers;
/// the first and last waypoints are the exact origin and destination.
pub struct H3GridRouteGateway;

impl H3GridRouteGateway {
    fn cell_of(point: Coordinate) -> RoutingResult<CellIndex> {
        point
            .to_lat_lng()
            .map(|ll| ll.to_cell(Resolution::Nine))
            .ok_or(RoutingError::InvalidCoordinate(point))
    }
}

impl RouteGateway for H3GridRouteGateway {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        traffic: TrafficModel,
    ) -> RoutingResult<Route> {
        let from = Self::cell_of(origin)?;
        let to = Self::cell_of(destination)?;
        let cells: Vec<CellIndex> = from
            .grid_path_cells(to)
            .map_err(|_| RoutingError::NoRoute)?
            .collect::<Result<_, _>>()
            .map_err(|_| RoutingError::NoRoute)?;
        if cells.is_empty() {
            return Err(RoutingError::NoRoute);
        }

        let mut waypoints = Vec::with_capacity(cells.len().max(2));
        waypoints.push(origin);
        if cells.len() > 2 {
            waypoints.extend(
                cells[1..cells.len() - 1]
                    .iter()
                    .map(|cell| Coordinate::from(h3o::LatLng::from(*cell))),
            );
        }
        waypoints.push(destination);

        let mut route = Route::from_waypoints(&waypoints, 0.0);
        route.duration_secs =
            (route.distance_km / AVERAGE_SPEED_KMH) * 3600.0 * traffic.duration_factor();
        Ok(route)
    }
}

// ---------------------------------------------------------------------------
// OSRM gateway (behind `osrm` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "osrm")]
pub mod osrm {
    use super::*;
    use reqwest::blocking::Client;
    use std::time::Duration;

    /// Routes via an OSRM HTTP endpoint. OSRM has no traffic model, so its
    /// durations are scaled by [`TrafficModel::duration_factor`].
    pub struct OsrmRouteGateway {
        client: Client,
        endpoint: String,
    }

    impl OsrmRouteGateway {
        pub fn new(endpoint: &str) -> RoutingResult<Self> {
            let client = Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .map_err(|e| RoutingError::Http(e.to_string()))?;
            Ok(Self {
                client,
                endpoint: endpoint.trim_end_matches('/').to_string(),
            })
        }
    }

    #[derive(Deserialize)]
    struct OsrmResponse {
        code: String,
        routes: Option<Vec<OsrmRoute>>,
    }

    #[derive(Deserialize)]
    struct OsrmRoute {
        distance: f64, // metres
        duration: f64, // seconds
        geometry: OsrmGeometry,
    }

    #[derive(Deserialize)]
    struct OsrmGeometry {
        coordinates: Vec<Vec<f64>>, // [lng, lat]
    }

    impl RouteGateway for OsrmRouteGateway {
        fn route(
            &self,
            origin: Coordinate,
            destination: Coordinate,
            traffic: TrafficModel,
        ) -> RoutingResult<Route> {
            let url = format!(
                "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
                self.endpoint, origin.lng, origin.lat, destination.lng, destination.lat,
            );

            let resp: OsrmResponse = self
                .client
                .get(&url)
                .send()
                .and_then(|r| r.json())
                .map_err(|e| RoutingError::Http(e.to_string()))?;

            if resp.code != "Ok" {
                return Err(RoutingError::Api(resp.code));
            }

            let route = resp
                .routes
                .and_then(|routes| routes.into_iter().next())
                .ok_or(RoutingError::NoRoute)?;

            let waypoints: Vec<Coordinate> = route
                .geometry
                .coordinates
                .iter()
                .filter(|c| c.len() >= 2)
                .map(|c| Coordinate::new(c[1], c[0]))
                .collect();
            if waypoints.len() < 2 {
                return Err(RoutingError::NoRoute);
            }

            let mut result =
                Route::from_waypoints(&waypoints, route.duration * traffic.duration_factor());
            result.distance_km = route.distance / 1000.0;
            Ok(result)
        }
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

type RouteKey = ((i64, i64), (i64, i64), TrafficModel);

/// LRU-cached wrapper around any [`RouteGateway`].
///
/// Keyed by quantized origin, destination and traffic model. Failures are not
/// cached; with `fallback_to_h3` set, an inner failure is retried on the grid.
pub struct CachedRouteGateway {
    inner: Box<dyn RouteGateway>,
    cache: Mutex<LruCache<RouteKey, Route>>,
    fallback_to_h3: bool,
}

impl CachedRouteGateway {
    pub fn new(inner: Box<dyn RouteGateway>, capacity: usize, fallback_to_h3: bool) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            fallback_to_h3,
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl RouteGateway for CachedRouteGateway {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        traffic: TrafficModel,
    ) -> RoutingResult<Route> {
        let key = (origin.quantized(), destination.quantized(), traffic);

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&key) {
                return Ok(cached.clone());
            }
        }

        let result = self
            .inner
            .route(origin, destination, traffic)
            .or_else(|err| {
                if self.fallback_to_h3 {
                    H3GridRouteGateway.route(origin, destination, traffic)
                } else {
                    Err(err)
                }
            });

        if let Ok(ref route) = result {
            if let Ok(mut cache) = self.cache.lock() {
                cache.put(key, route.clone());
            }
        }

        result
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Which routing backend to use.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub enum RouteGatewayKind {
    #[default]
    H3Grid,
    /// OSRM HTTP endpoint (e.g. `"http://localhost:5000"`).
    #[cfg(feature = "osrm")]
    Osrm { endpoint: String },
}

#[cfg(feature = "osrm")]
const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 20_000;

/// Construct a boxed [`RouteGateway`] from a [`RouteGatewayKind`].
///
/// The grid gateway is returned uncached. OSRM is wrapped in a
/// [`CachedRouteGateway`] that falls back to the grid when OSRM fails.
pub fn build_route_gateway(kind: &RouteGatewayKind) -> Box<dyn RouteGateway> {
    match kind {
        RouteGatewayKind::H3Grid => Box::new(H3GridRouteGateway),

        #[cfg(feature = "osrm")]
        RouteGatewayKind::Osrm { endpoint } => match osrm::OsrmRouteGateway::new(endpoint) {
            Ok(gateway) => Box::new(CachedRouteGateway::new(
                Box::new(gateway),
                DEFAULT_ROUTE_CACHE_CAPACITY,
                true,
            )),
            Err(err) => {
                tracing::warn!(%endpoint, error = %err, "OSRM client unavailable, using H3 grid routing");
                Box::new(H3GridRouteGateway)
            }
        },
    }
}

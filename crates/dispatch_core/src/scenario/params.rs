use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::geo::Coordinate;
use crate::interpolation::{clamp_points, DEFAULT_POINTS_PER_SEGMENT};
use crate::routing::{DistanceMetric, RouteGatewayKind, TrafficModel};

/// Default map center: Wrocław, Poland.
pub const DEFAULT_MAP_CENTER: Coordinate = Coordinate::new(51.1079, 17.0385);

/// Side of the square (degrees) in which random taxis, clients and drop-offs are placed.
pub const DEFAULT_GENERATION_RANGE_DEG: f64 = 0.08;

const DEFAULT_SPEED: u32 = 10;
const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;
const DEFAULT_SCAN_INTERVAL_MS: u64 = 2000;
const DEFAULT_ACTIVATION_MIN_MS: u64 = 1000;
const DEFAULT_ACTIVATION_MAX_MS: u64 = 10_000;

/// Runtime dispatch settings. The controls mutate this in place.
#[derive(Debug, Clone, Copy, PartialEq, Resource)]
pub struct DispatchConfig {
    /// Simulation speed; higher means larger path jumps per frame.
    pub speed: u32,
    pub traffic_model: TrafficModel,
    pub distance_metric: DistanceMetric,
    /// Sub-points per route segment when densifying.
    pub interpolation_points: usize,
    pub frame_interval_ms: u64,
    pub scan_interval_ms: u64,
    pub map_center: Coordinate,
    pub generation_range_deg: f64,
    /// Client lifecycle delay window, `[min, max)` milliseconds.
    pub client_activation_min_ms: u64,
    pub client_activation_max_ms: u64,
}

impl DispatchConfig {
    /// Path indices advanced per motion frame: `ceil(speed / 5)`, at least 1.
    pub fn step_per_tick(&self) -> usize {
        (self.speed.div_ceil(5)).max(1) as usize
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            traffic_model: TrafficModel::default(),
            distance_metric: DistanceMetric::default(),
            interpolation_points: DEFAULT_POINTS_PER_SEGMENT,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            map_center: DEFAULT_MAP_CENTER,
            generation_range_deg: DEFAULT_GENERATION_RANGE_DEG,
            client_activation_min_ms: DEFAULT_ACTIVATION_MIN_MS,
            client_activation_max_ms: DEFAULT_ACTIVATION_MAX_MS,
        }
    }
}

/// Random source for placement, drop-off destinations and lifecycle delays.
#[derive(Debug, Resource)]
pub struct DispatchRng(pub StdRng);

impl DispatchRng {
    pub fn new(seed: Option<u64>) -> Self {
        Self(seed.map(StdRng::seed_from_u64).unwrap_or_else(StdRng::from_entropy))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioParams {
    pub initial_taxis: usize,
    pub initial_clients: usize,
    pub seed: Option<u64>,
    pub config: DispatchConfig,
    pub route_gateway: RouteGatewayKind,
    /// Start the simulation as soon as the scenario is built.
    pub autostart: bool,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            initial_taxis: 0,
            initial_clients: 0,
            seed: None,
            config: DispatchConfig::default(),
            route_gateway: RouteGatewayKind::default(),
            autostart: false,
        }
    }
}

impl ScenarioParams {
    pub fn with_taxis(mut self, count: usize) -> Self {
        self.initial_taxis = count;
        self
    }

    pub fn with_clients(mut self, count: usize) -> Self {
        self.initial_clients = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.config.speed = speed.max(1);
        self
    }

    pub fn with_traffic_model(mut self, model: TrafficModel) -> Self {
        self.config.traffic_model = model;
        self
    }

    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.config.distance_metric = metric;
        self
    }

    pub fn with_interpolation_points(mut self, points: usize) -> Self {
        self.config.interpolation_points = clamp_points(points);
        self
    }

    pub fn with_scan_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.scan_interval_ms = interval_ms.max(1);
        self
    }

    pub fn with_frame_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.frame_interval_ms = interval_ms.max(1);
        self
    }

    pub fn with_map_center(mut self, center: Coordinate, range_deg: f64) -> Self {
        self.config.map_center = center;
        self.config.generation_range_deg = range_deg;
        self
    }

    /// Client lifecycle delay window in milliseconds, `[min_ms, max_ms)`.
    pub fn with_activation_window_ms(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.config.client_activation_min_ms = min_ms;
        self.config.client_activation_max_ms = max_ms.max(min_ms + 1);
        self
    }

    pub fn with_route_gateway(mut self, kind: RouteGatewayKind) -> Self {
        self.route_gateway = kind;
        self
    }

    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }
}

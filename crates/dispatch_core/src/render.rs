//! Render collaborator: receives draw and marker commands from the dispatch
//! systems. It never mutates simulation state.

use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::Resource;

use crate::ecs::{ClientId, TaxiId};
use crate::geo::Coordinate;

/// Opaque handle for a destination marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

pub trait RenderSink: Send + Sync {
    fn draw_route(&mut self, taxi: TaxiId, path: &[Coordinate]);
    /// Trim the drawn route of `taxi` to the points from `from_index` onwards.
    fn clear_route_segment(&mut self, taxi: TaxiId, from_index: usize);
    fn clear_route(&mut self, taxi: TaxiId);
    fn add_destination_marker(&mut self, at: Coordinate) -> MarkerHandle;
    fn remove_destination_marker(&mut self, marker: MarkerHandle);
    fn remove_client_marker(&mut self, client: ClientId);
    fn reset_map(&mut self);
    fn clear_all_routes(&mut self);
}

#[derive(Resource)]
pub struct RenderResource(pub Box<dyn RenderSink>);

/// Headless sink: accepts everything, draws nothing.
#[derive(Debug, Default)]
pub struct NullRenderer {
    next_marker: u64,
}

impl RenderSink for NullRenderer {
    fn draw_route(&mut self, _taxi: TaxiId, _path: &[Coordinate]) {}
    fn clear_route_segment(&mut self, _taxi: TaxiId, _from_index: usize) {}
    fn clear_route(&mut self, _taxi: TaxiId) {}

    fn add_destination_marker(&mut self, _at: Coordinate) -> MarkerHandle {
        self.next_marker += 1;
        MarkerHandle(self.next_marker)
    }

    fn remove_destination_marker(&mut self, _marker: MarkerHandle) {}
    fn remove_client_marker(&mut self, _client: ClientId) {}
    fn reset_map(&mut self) {}
    fn clear_all_routes(&mut self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    DrawRoute { taxi: TaxiId, points: usize },
    ClearRouteSegment { taxi: TaxiId, from_index: usize },
    ClearRoute { taxi: TaxiId },
    AddDestinationMarker { marker: MarkerHandle, at: Coordinate },
    RemoveDestinationMarker { marker: MarkerHandle },
    RemoveClientMarker { client: ClientId },
    ResetMap,
    ClearAllRoutes,
}

/// Shared view of the commands captured by a [`RecordingRenderer`].
#[derive(Debug, Clone, Default)]
pub struct RenderLog(Arc<Mutex<Vec<RenderCommand>>>);

impl RenderLog {
    pub fn commands(&self) -> Vec<RenderCommand> {
        self.0.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn count(&self, predicate: impl Fn(&RenderCommand) -> bool) -> usize {
        self.0
            .lock()
            .map(|log| log.iter().filter(|c| predicate(c)).count())
            .unwrap_or(0)
    }

    fn push(&self, command: RenderCommand) {
        if let Ok(mut log) = self.0.lock() {
            log.push(command);
        }
    }
}

/// Sink that records every command, for tests and headless inspection.
/// Segment trims are not recorded unless enabled, since there is one per frame.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    log: RenderLog,
    next_marker: u64,
    record_segments: bool,
}

impl RecordingRenderer {
    pub fn new() -> (Self, RenderLog) {
        let log = RenderLog::default();
        (
            Self {
                log: log.clone(),
                next_marker: 0,
                record_segments: false,
            },
            log,
        )
    }

    pub fn with_segments(mut self) -> Self {
        self.record_segments = true;
        self
    }
}

impl RenderSink for RecordingRenderer {
    fn draw_route(&mut self, taxi: TaxiId, path: &[Coordinate]) {
        self.log.push(RenderCommand::DrawRoute {
            taxi,
            points: path.len(),
        });
    }

    fn clear_route_segment(&mut self, taxi: TaxiId, from_index: usize) {
        if self.record_segments {
            self.log
                .push(RenderCommand::ClearRouteSegment { taxi, from_index });
        }
    }

    fn clear_route(&mut self, taxi: TaxiId) {
        self.log.push(RenderCommand::ClearRoute { taxi });
    }

    fn add_destination_marker(&mut self, at: Coordinate) -> MarkerHandle {
        self.next_marker += 1;
        let marker = MarkerHandle(self.next_marker);
        self.log
            .push(RenderCommand::AddDestinationMarker { marker, at });
        marker
    }

    fn remove_destination_marker(&mut self, marker: MarkerHandle) {
        self.log
            .push(RenderCommand::RemoveDestinationMarker { marker });
    }

    fn remove_client_marker(&mut self, client: ClientId) {
        self.log.push(RenderCommand::RemoveClientMarker { client });
    }

    fn reset_map(&mut self) {
        self.log.push(RenderCommand::ResetMap);
    }

    fn clear_all_routes(&mut self) {
        self.log.push(RenderCommand::ClearAllRoutes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_renderer_hands_out_distinct_markers() {
        let (mut renderer, log) = RecordingRenderer::new();
        let a = renderer.add_destination_marker(Coordinate::new(1.0, 1.0));
        let b = renderer.add_destination_marker(Coordinate::new(2.0, 2.0));
        assert_ne!(a, b);
        renderer.remove_destination_marker(a);
        assert_eq!(
            log.count(|c| matches!(c, RenderCommand::AddDestinationMarker { .. })),
            2
        );
        assert_eq!(
            log.commands().last(),
            Some(&RenderCommand::RemoveDestinationMarker { marker: a })
        );
    }

    #[test]
    fn segment_trims_are_opt_in() {
        let (renderer, log) = RecordingRenderer::new();
        let mut renderer = renderer;
        renderer.clear_route_segment(TaxiId(1), 3);
        assert!(log.commands().is_empty());

        let mut renderer = renderer.with_segments();
        renderer.clear_route_segment(TaxiId(1), 4);
        assert_eq!(
            log.commands(),
            vec![RenderCommand::ClearRouteSegment {
                taxi: TaxiId(1),
                from_index: 4
            }]
        );
    }
}

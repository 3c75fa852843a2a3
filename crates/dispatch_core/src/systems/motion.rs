//! Motion system: advances a taxi along its densified path, one frame per tick.
//!
//! Every tick carries the sequence number of the motion it belongs to. Ticks
//! for a removed taxi or a superseded motion are dropped. While the simulation
//! is paused the motion parks itself instead of rescheduling, and resuming
//! restarts it from the same index.

use bevy_ecs::change_detection::DetectChangesMut;
use bevy_ecs::prelude::{Commands, Query, Res, ResMut, Resource, With};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::control::SimulationControl;
use crate::ecs::{Motion, Position, Taxi};
use crate::registry::RegistryIndex;
use crate::render::RenderResource;
use crate::scenario::DispatchConfig;

/// Source of motion sequence numbers. Never reset.
#[derive(Debug, Default, Resource)]
pub struct MotionSequence(u64);

impl MotionSequence {
    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

#[allow(clippy::too_many_arguments)]
pub fn motion_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    config: Res<DispatchConfig>,
    control: Res<SimulationControl>,
    index: Res<RegistryIndex>,
    mut render: ResMut<RenderResource>,
    mut taxis: Query<(&mut Position, &mut Motion), With<Taxi>>,
) {
    if event.0.kind != EventKind::MotionTick {
        return;
    }
    let Some(EventSubject::Motion(taxi, sequence)) = event.0.subject else {
        return;
    };
    let Some(entity) = index.taxi(taxi) else {
        debug!(%taxi, "motion tick for removed taxi ignored");
        return;
    };
    let Ok((mut position, mut motion)) = taxis.get_mut(entity) else {
        return;
    };
    if motion.sequence != sequence {
        debug!(%taxi, sequence, "stale motion tick ignored");
        return;
    }
    if !control.active {
        motion.parked = true;
        return;
    }

    if motion.is_complete() {
        render.0.clear_route(taxi);
        let arrived = EventSubject::Leg(motion.pair, motion.leg);
        commands.entity(entity).remove::<Motion>();
        clock.schedule_in(0, EventKind::LegArrived, Some(arrived));
        return;
    }

    let at = motion.index;
    position.set_if_neq(Position(motion.path[at]));
    render.0.clear_route_segment(taxi, at);
    motion.advance(config.step_per_tick());
    clock.schedule_in(
        config.frame_interval_ms,
        EventKind::MotionTick,
        Some(EventSubject::Motion(taxi, sequence)),
    );
}

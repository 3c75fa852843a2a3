use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use dispatch_core::clock::EventKind;
use dispatch_core::runner::{
    run_next_event, run_next_event_with_hook, run_until, run_until_empty, run_until_with_hook,
    simulation_schedule,
};

use super::invariants::assert_invariants;

/// Owns a reusable `Schedule` so tests can step or drain the event queue.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    /// Run a single event (returns `true` if an event was processed).
    pub fn run_one(&mut self, world: &mut World) -> bool {
        run_next_event(world, &mut self.schedule)
    }

    /// Run single events until one of `kind` has been processed.
    pub fn run_through(&mut self, world: &mut World, kind: EventKind) {
        loop {
            let mut processed = None;
            let ran = run_next_event_with_hook(world, &mut self.schedule, |_, event| {
                processed = Some(event.kind);
            });
            assert!(ran, "queue ran dry before {kind:?}");
            if processed == Some(kind) {
                return;
            }
        }
    }

    pub fn run_until_empty(&mut self, world: &mut World, max_steps: usize) -> usize {
        run_until_empty(world, &mut self.schedule, max_steps)
    }

    pub fn run_until(&mut self, world: &mut World, end_ms: u64) -> usize {
        run_until(world, &mut self.schedule, end_ms)
    }

    /// Run to `end_ms`, checking the dispatch invariants after every step.
    pub fn run_checked(&mut self, world: &mut World, end_ms: u64) -> usize {
        run_until_with_hook(world, &mut self.schedule, end_ms, |world, event| {
            assert_invariants(world, event);
        })
    }
}

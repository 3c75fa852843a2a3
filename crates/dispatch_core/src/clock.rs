use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;

use crate::ecs::{ClientId, PairKey, TaxiId, TripLeg};

pub const ONE_SEC_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Periodic matching pass; re-arms itself while its epoch is current.
    ScanTick,
    /// One-off matching pass triggered by a registry change.
    Scan,
    /// Claim attempt for a pair chosen by a scan.
    Claim,
    /// Route request for one leg of an assignment.
    RouteLeg,
    /// One animation frame of a taxi's motion.
    MotionTick,
    /// A taxi reached the end of its current leg.
    LegArrived,
    /// Lifecycle timer promoting a hibernating client.
    ClientActivation,
}

/// What an event is about. Handlers validate the subject against current state,
/// so events that outlive their subject are harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubject {
    Taxi(TaxiId),
    Client(ClientId),
    Pair(PairKey),
    Leg(PairKey, TripLeg),
    Motion(TaxiId, u64),
    Epoch(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
    sequence: u64,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap; equal timestamps pop in
        // scheduling order.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Discrete-event clock in simulated milliseconds.
#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    next_sequence: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedule an event at an absolute time. Times in the past are clamped to now.
    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind, subject: Option<EventSubject>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(Event {
            timestamp: timestamp.max(self.now),
            kind,
            subject,
            sequence,
        });
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now.saturating_add(delay_ms), kind, subject);
    }

    pub fn schedule_in_secs(&mut self, secs: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_in(secs.saturating_mul(ONE_SEC_MS), kind, subject);
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|e| e.timestamp)
    }

    /// Move the clock forward without processing anything. Never moves backwards.
    pub fn advance_to(&mut self, timestamp: u64) {
        self.now = self.now.max(timestamp);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    pub fn pending_of(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

/// The event being processed in the current schedule run.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

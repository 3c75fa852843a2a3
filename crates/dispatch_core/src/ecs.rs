use std::fmt;
use std::sync::Arc;

use bevy_ecs::prelude::Component;

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxiId(pub u32);

impl fmt::Display for TaxiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "taxi#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Identifies one assignment: a taxi paired with a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub taxi: TaxiId,
    pub client: ClientId,
}

impl PairKey {
    pub const fn new(taxi: TaxiId, client: ClientId) -> Self {
        Self { taxi, client }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.taxi, self.client)
    }
}

/// Lifecycle state shared by taxis and clients.
///
/// Taxis only ever hold `Available` or `Busy`. `Hibernate` and `Finished` are
/// client-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Component)]
pub enum Status {
    Available,
    Busy,
    Hibernate,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct Taxi {
    pub id: TaxiId,
    pub name: String,
    /// Completed two-leg trips. Only ever incremented.
    pub rides: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Position(pub Coordinate);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripLeg {
    ToClient,
    ToDestination,
}

/// A taxi following a densified path. Present only while a leg is being driven.
#[derive(Debug, Clone, Component)]
pub struct Motion {
    pub pair: PairKey,
    pub leg: TripLeg,
    pub path: Arc<Vec<Coordinate>>,
    /// Index of the next path point to visit.
    pub index: usize,
    /// Matches the sequence carried by this motion's tick events.
    pub sequence: u64,
    /// Set when a tick found the simulation paused; resume reschedules it.
    pub parked: bool,
}

impl Motion {
    pub fn new(pair: PairKey, leg: TripLeg, path: Arc<Vec<Coordinate>>, sequence: u64) -> Self {
        Self {
            pair,
            leg,
            path,
            index: 0,
            sequence,
            parked: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.path.len()
    }

    pub fn remaining(&self) -> usize {
        self.path.len().saturating_sub(self.index)
    }

    /// Move the cursor forward by `step`, never skipping the final point.
    pub fn advance(&mut self, step: usize) {
        let last = self.path.len().saturating_sub(1);
        if self.index >= last {
            self.index = self.path.len();
        } else {
            self.index = (self.index + step.max(1)).min(last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(len: usize) -> Arc<Vec<Coordinate>> {
        Arc::new((0..len).map(|i| Coordinate::new(i as f64, 0.0)).collect())
    }

    #[test]
    fn advance_lands_on_last_point_before_completing() {
        let pair = PairKey::new(TaxiId(1), ClientId(1));
        let mut motion = Motion::new(pair, TripLeg::ToClient, path(6), 0);
        let mut visited = Vec::new();
        while !motion.is_complete() {
            visited.push(motion.index);
            motion.advance(4);
        }
        assert_eq!(visited, vec![0, 4, 5]);
    }

    #[test]
    fn empty_path_is_complete_immediately() {
        let pair = PairKey::new(TaxiId(1), ClientId(1));
        let motion = Motion::new(pair, TripLeg::ToDestination, path(0), 0);
        assert!(motion.is_complete());
        assert_eq!(motion.remaining(), 0);
    }

    #[test]
    fn ids_display_with_kind_prefix() {
        let key = PairKey::new(TaxiId(3), ClientId(9));
        assert_eq!(key.to_string(), "taxi#3->client#9");
    }
}

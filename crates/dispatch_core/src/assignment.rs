//! Assignment book: the active-assignment set and the taxi lock set, owned
//! together so a claim is a single check-then-set.

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::Resource;
use thiserror::Error;

use crate::ecs::{ClientId, PairKey, TaxiId};
use crate::geo::Coordinate;
use crate::render::MarkerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentPhase {
    Claiming,
    LegToClient,
    LegToDestination,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub key: PairKey,
    pub phase: AssignmentPhase,
    pub claimed_at: u64,
    pub picked_up_at: Option<u64>,
    /// Drop-off point, chosen on arrival at the client.
    pub destination: Option<Coordinate>,
    pub marker: Option<MarkerHandle>,
}

/// Why a claim was refused. Refusals are expected under overlapping scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClaimRejection {
    #[error("pair {0} already has an active assignment")]
    PairActive(PairKey),
    #[error("{0} is locked by another assignment")]
    TaxiLocked(TaxiId),
    #[error("{0} is already part of an assignment")]
    ClientEngaged(ClientId),
}

#[derive(Debug, Default, Resource)]
pub struct AssignmentBook {
    active: HashMap<PairKey, Assignment>,
    locked_taxis: HashSet<TaxiId>,
    engaged_clients: HashSet<ClientId>,
}

impl AssignmentBook {
    /// Register a new assignment and lock its taxi. Refused if either party is
    /// already engaged.
    pub fn claim(&mut self, key: PairKey, now: u64) -> Result<(), ClaimRejection> {
        if self.active.contains_key(&key) {
            return Err(ClaimRejection::PairActive(key));
        }
        if self.locked_taxis.contains(&key.taxi) {
            return Err(ClaimRejection::TaxiLocked(key.taxi));
        }
        if self.engaged_clients.contains(&key.client) {
            return Err(ClaimRejection::ClientEngaged(key.client));
        }
        self.locked_taxis.insert(key.taxi);
        self.engaged_clients.insert(key.client);
        self.active.insert(
            key,
            Assignment {
                key,
                phase: AssignmentPhase::Claiming,
                claimed_at: now,
                picked_up_at: None,
                destination: None,
                marker: None,
            },
        );
        Ok(())
    }

    /// Drop the assignment and unlock its taxi.
    pub fn release(&mut self, key: PairKey) -> Option<Assignment> {
        let assignment = self.active.remove(&key)?;
        self.locked_taxis.remove(&key.taxi);
        self.engaged_clients.remove(&key.client);
        Some(assignment)
    }

    /// Remove every assignment and lock, returning what was in flight.
    pub fn drain(&mut self) -> Vec<Assignment> {
        self.locked_taxis.clear();
        self.engaged_clients.clear();
        let mut drained: Vec<Assignment> = self.active.drain().map(|(_, a)| a).collect();
        drained.sort_by_key(|a| a.key);
        drained
    }

    pub fn get(&self, key: PairKey) -> Option<&Assignment> {
        self.active.get(&key)
    }

    pub fn get_mut(&mut self, key: PairKey) -> Option<&mut Assignment> {
        self.active.get_mut(&key)
    }

    pub fn contains(&self, key: PairKey) -> bool {
        self.active.contains_key(&key)
    }

    pub fn is_locked(&self, taxi: TaxiId) -> bool {
        self.locked_taxis.contains(&taxi)
    }

    pub fn is_client_engaged(&self, client: ClientId) -> bool {
        self.engaged_clients.contains(&client)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn locked_count(&self) -> usize {
        self.locked_taxis.len()
    }

    pub fn locked_taxis(&self) -> impl Iterator<Item = TaxiId> + '_ {
        self.locked_taxis.iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.active.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(taxi: u32, client: u32) -> PairKey {
        PairKey::new(TaxiId(taxi), ClientId(client))
    }

    #[test]
    fn claim_locks_taxi_and_client() {
        let mut book = AssignmentBook::default();
        book.claim(key(1, 10), 5).expect("first claim");
        assert!(book.is_locked(TaxiId(1)));
        assert!(book.is_client_engaged(ClientId(10)));
        let assignment = book.get(key(1, 10)).expect("assignment");
        assert_eq!(assignment.phase, AssignmentPhase::Claiming);
        assert_eq!(assignment.claimed_at, 5);
    }

    #[test]
    fn second_claim_on_either_party_is_refused() {
        let mut book = AssignmentBook::default();
        book.claim(key(1, 10), 0).expect("first claim");
        assert_eq!(
            book.claim(key(1, 10), 0),
            Err(ClaimRejection::PairActive(key(1, 10)))
        );
        assert_eq!(
            book.claim(key(1, 11), 0),
            Err(ClaimRejection::TaxiLocked(TaxiId(1)))
        );
        assert_eq!(
            book.claim(key(2, 10), 0),
            Err(ClaimRejection::ClientEngaged(ClientId(10)))
        );
        assert_eq!(book.active_count(), 1);
        assert_eq!(book.locked_count(), 1);
    }

    #[test]
    fn release_unlocks_and_allows_reclaim() {
        let mut book = AssignmentBook::default();
        book.claim(key(1, 10), 0).expect("claim");
        assert!(book.release(key(1, 10)).is_some());
        assert!(!book.is_locked(TaxiId(1)));
        assert!(book.release(key(1, 10)).is_none());
        book.claim(key(1, 11), 0).expect("taxi is free again");
    }

    #[test]
    fn drain_empties_everything() {
        let mut book = AssignmentBook::default();
        book.claim(key(2, 20), 0).expect("claim");
        book.claim(key(1, 10), 0).expect("claim");
        let drained = book.drain();
        assert_eq!(
            drained.iter().map(|a| a.key).collect::<Vec<_>>(),
            vec![key(1, 10), key(2, 20)]
        );
        assert_eq!(book.active_count(), 0);
        assert_eq!(book.locked_count(), 0);
        assert!(!book.is_client_engaged(ClientId(10)));
    }
}

//! Identity ↔ participant bookkeeping and spawn arbitration.
//!
//! A participant becomes associated with a social identity only through a
//! claim, never through transport connection metadata. The host queues spawn
//! requests per participant and materialises each at most once, spreading
//! representations along the x axis.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::ops::Add;

use indexmap::IndexSet;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::social::UserId;
use crate::transport::ParticipantId;
use crate::utils::arena::{Arena, Handle};

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnPlacement {
    pub base: Vec3,
    pub offset: f32,
}

impl SpawnPlacement {
    pub fn position(&self, already_spawned: usize) -> Vec3 {
        self.base + Vec3::new(already_spawned as f32 * self.offset, 0.0, 0.0)
    }
}

impl Default for SpawnPlacement {
    fn default() -> Self {
        Self {
            base: Vec3::ZERO,
            offset: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    pub participant: ParticipantId,
    pub identity: Option<UserId>,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spawn {
    pub handle: Handle,
    pub participant: ParticipantId,
    pub identity: Option<UserId>,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Despawn {
    pub participant: ParticipantId,
    pub identity: Option<UserId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpawnDecision {
    Queued,
    AlreadyPending,
    AlreadySpawned,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpawnFailure {
    Disconnected,
    CapacityReached,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpawnOutcome {
    Spawned(Spawn),
    Failed {
        participant: ParticipantId,
        reason: SpawnFailure,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Bound,
    /// Same pair as before
    Unchanged,
    /// An older mapping of the participant or the identity was dropped
    Rebound,
    /// The participant already left this session
    Rejected,
}

impl ClaimOutcome {
    /// True when the claim changed the mapping.
    pub fn is_new(self) -> bool {
        matches!(self, ClaimOutcome::Bound | ClaimOutcome::Rebound)
    }
}

/// What [`IdentityBinder::clear`] took down.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Teardown {
    pub cancelled: Vec<ParticipantId>,
    pub despawned: Vec<Despawn>,
}

pub struct IdentityBinder {
    placement: SpawnPlacement,
    capacity: usize,
    local_identity: Option<UserId>,
    local_participant: Option<ParticipantId>,
    connected: HashSet<ParticipantId>,
    departed: HashSet<ParticipantId>,
    by_participant: HashMap<ParticipantId, UserId>,
    by_identity: HashMap<UserId, ParticipantId>,
    pending: IndexSet<ParticipantId>,
    representations: Arena<Representation>,
    spawned: HashMap<ParticipantId, Handle>,
}

impl IdentityBinder {
    pub fn new(placement: SpawnPlacement) -> Self {
        Self {
            placement,
            capacity: 0,
            local_identity: None,
            local_participant: None,
            connected: HashSet::new(),
            departed: HashSet::new(),
            by_participant: HashMap::new(),
            by_identity: HashMap::new(),
            pending: IndexSet::new(),
            representations: Arena::new(),
            spawned: HashMap::new(),
        }
    }

    /// Start tracking a new session, dropping anything left from the last one.
    pub fn begin(&mut self, local_identity: UserId, capacity: usize) {
        let leftover = self.clear();
        if !leftover.cancelled.is_empty() || !leftover.despawned.is_empty() {
            warn!(
                "Binder still held {} pending spawns and {} representations",
                leftover.cancelled.len(),
                leftover.despawned.len()
            );
        }
        self.local_identity = Some(local_identity);
        self.capacity = capacity;
    }

    /// Returns true when `participant` is the local endpoint. The local
    /// identity is bound to it right away since it needs no claim.
    pub fn on_participant_connected(
        &mut self,
        participant: ParticipantId,
        local: Option<ParticipantId>,
    ) -> bool {
        self.connected.insert(participant);
        self.departed.remove(&participant);
        if local != Some(participant) {
            debug!("Participant {} connected, waiting for its claim", participant);
            return false;
        }

        info!("Local participant {} connected", participant);
        self.local_participant = Some(participant);
        if let Some(identity) = self.local_identity {
            self.on_identity_claimed(identity, participant);
        }
        true
    }

    pub fn on_identity_claimed(
        &mut self,
        identity: UserId,
        participant: ParticipantId,
    ) -> ClaimOutcome {
        if self.departed.contains(&participant) {
            warn!(
                "Participant {} claimed {} after disconnecting, ignoring",
                participant, identity
            );
            return ClaimOutcome::Rejected;
        }
        if self.by_participant.get(&participant) == Some(&identity) {
            return ClaimOutcome::Unchanged;
        }

        let mut outcome = ClaimOutcome::Bound;
        if let Some(previous) = self.by_participant.insert(participant, identity) {
            warn!(
                "Participant {} reclaimed as {}, dropping its binding to {}",
                participant, identity, previous
            );
            self.by_identity.remove(&previous);
            outcome = ClaimOutcome::Rebound;
        }
        if let Some(previous) = self.by_identity.insert(identity, participant) {
            warn!(
                "Identity {} moved from participant {} to {}",
                identity, previous, participant
            );
            self.by_participant.remove(&previous);
            if let Some(&handle) = self.spawned.get(&previous) {
                if let Some(representation) = self.representations.get_mut(handle) {
                    representation.identity = None;
                }
            }
            outcome = ClaimOutcome::Rebound;
        }

        if let Some(&handle) = self.spawned.get(&participant) {
            if let Some(representation) = self.representations.get_mut(handle) {
                representation.identity = Some(identity);
            }
        }
        debug!("Bound identity {} to participant {}", identity, participant);
        outcome
    }

    pub fn request_spawn(&mut self, participant: ParticipantId) -> SpawnDecision {
        if self.spawned.contains_key(&participant) {
            debug!("Participant {} already spawned", participant);
            return SpawnDecision::AlreadySpawned;
        }
        if !self.pending.insert(participant) {
            debug!("Spawn for participant {} already pending", participant);
            return SpawnDecision::AlreadyPending;
        }
        SpawnDecision::Queued
    }

    /// Decide every pending request. Requests from participants that have
    /// not connected or not claimed an identity yet stay queued, connection
    /// and claim may arrive in either order.
    pub fn resolve_pending_spawns(&mut self) -> Vec<SpawnOutcome> {
        let mut outcomes = Vec::new();
        for participant in mem::take(&mut self.pending) {
            if self.departed.contains(&participant) {
                outcomes.push(SpawnOutcome::Failed {
                    participant,
                    reason: SpawnFailure::Disconnected,
                });
                continue;
            }
            let identity = match self.by_participant.get(&participant) {
                Some(&identity) if self.connected.contains(&participant) => identity,
                _ => {
                    self.pending.insert(participant);
                    continue;
                }
            };
            if self.spawned.len() >= self.capacity {
                warn!(
                    "Cannot spawn participant {}, {} of {} slots taken",
                    participant,
                    self.spawned.len(),
                    self.capacity
                );
                outcomes.push(SpawnOutcome::Failed {
                    participant,
                    reason: SpawnFailure::CapacityReached,
                });
                continue;
            }

            let position = self.placement.position(self.spawned.len());
            let handle = self.representations.insert(Representation {
                participant,
                identity: Some(identity),
                position,
            });
            self.spawned.insert(participant, handle);
            info!(
                "Spawned participant {} ({}) at {:?}",
                participant, identity, position
            );
            outcomes.push(SpawnOutcome::Spawned(Spawn {
                handle,
                participant,
                identity: Some(identity),
                position,
            }));
        }
        outcomes
    }

    /// Record a spawn the host announced. Returns `None` if the participant
    /// already has a representation.
    pub fn mirror_spawn(
        &mut self,
        participant: ParticipantId,
        identity: Option<UserId>,
        position: Vec3,
    ) -> Option<Handle> {
        self.pending.shift_remove(&participant);
        if self.spawned.contains_key(&participant) {
            debug!("Ignoring repeated spawn of participant {}", participant);
            return None;
        }
        let handle = self.representations.insert(Representation {
            participant,
            identity,
            position,
        });
        self.spawned.insert(participant, handle);
        Some(handle)
    }

    pub fn on_participant_disconnected(&mut self, participant: ParticipantId) -> Option<Despawn> {
        self.connected.remove(&participant);
        self.departed.insert(participant);
        if self.local_participant == Some(participant) {
            self.local_participant = None;
        }
        match self.by_participant.remove(&participant) {
            Some(identity) => {
                self.by_identity.remove(&identity);
            }
            None => debug!("Participant {} left without a claim", participant),
        }
        self.pending.shift_remove(&participant);
        self.release(participant)
    }

    pub fn on_identity_left(&mut self, identity: UserId) -> Option<Despawn> {
        let participant = match self.by_identity.remove(&identity) {
            Some(participant) => participant,
            None => {
                warn!("Identity {} left but was never bound, ignoring", identity);
                return None;
            }
        };
        self.by_participant.remove(&participant);
        self.pending.shift_remove(&participant);
        self.release(participant)
    }

    /// Destroy the representation of `participant`, if any.
    pub fn release(&mut self, participant: ParticipantId) -> Option<Despawn> {
        let handle = self.spawned.remove(&participant)?;
        let representation = self.representations.remove(handle)?;
        info!("Despawned participant {}", participant);
        Some(Despawn {
            participant,
            identity: representation.identity,
        })
    }

    pub fn clear(&mut self) -> Teardown {
        let cancelled = mem::take(&mut self.pending).into_iter().collect();
        let despawned = self
            .representations
            .drain()
            .into_iter()
            .map(|representation| Despawn {
                participant: representation.participant,
                identity: representation.identity,
            })
            .collect();
        self.spawned.clear();
        self.by_participant.clear();
        self.by_identity.clear();
        self.connected.clear();
        self.departed.clear();
        self.local_identity = None;
        self.local_participant = None;
        self.capacity = 0;
        Teardown {
            cancelled,
            despawned,
        }
    }

    pub fn identity_of(&self, participant: ParticipantId) -> Option<UserId> {
        self.by_participant.get(&participant).copied()
    }

    pub fn participant_of(&self, identity: UserId) -> Option<ParticipantId> {
        self.by_identity.get(&identity).copied()
    }

    /// Every binding, ordered by participant.
    pub fn bindings(&self) -> Vec<(UserId, ParticipantId)> {
        let mut bindings: Vec<_> = self
            .by_participant
            .iter()
            .map(|(&participant, &identity)| (identity, participant))
            .collect();
        bindings.sort_by_key(|&(_, participant)| participant);
        bindings
    }

    pub fn local_identity(&self) -> Option<UserId> {
        self.local_identity
    }

    pub fn local_participant(&self) -> Option<ParticipantId> {
        self.local_participant
    }

    pub fn is_local_connected(&self) -> bool {
        self.local_participant.is_some()
    }

    pub fn is_connected(&self, participant: ParticipantId) -> bool {
        self.connected.contains(&participant)
    }

    pub fn is_pending(&self, participant: ParticipantId) -> bool {
        self.pending.contains(&participant)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_spawned(&self, participant: ParticipantId) -> bool {
        self.spawned.contains_key(&participant)
    }

    pub fn spawned_count(&self) -> usize {
        self.spawned.len()
    }

    pub fn representation(&self, participant: ParticipantId) -> Option<&Representation> {
        let handle = *self.spawned.get(&participant)?;
        self.representations.get(handle)
    }

    pub fn representations(&self) -> impl Iterator<Item = &Representation> {
        self.representations
            .iter()
            .map(|(_, representation)| representation)
    }
}

#[cfg(test)]
mod tests {
    use crate::binder::{
        ClaimOutcome, IdentityBinder, SpawnDecision, SpawnFailure, SpawnOutcome, SpawnPlacement,
        Vec3,
    };

    fn host_binder(capacity: usize) -> IdentityBinder {
        let mut binder = IdentityBinder::new(SpawnPlacement::default());
        binder.begin(1, capacity);
        binder.on_participant_connected(0, Some(0));
        binder
    }

    fn assert_bijective(binder: &IdentityBinder) {
        for (identity, participant) in binder.bindings() {
            assert_eq!(binder.identity_of(participant), Some(identity));
            assert_eq!(binder.participant_of(identity), Some(participant));
        }
    }

    #[test]
    fn local_connection_binds_local_identity() {
        let binder = host_binder(4);
        assert!(binder.is_local_connected());
        assert_eq!(binder.identity_of(0), Some(1));
    }

    #[test]
    fn remote_connection_does_not_bind() {
        let mut binder = host_binder(4);
        assert!(!binder.on_participant_connected(7, Some(0)));
        assert_eq!(binder.identity_of(7), None);
        assert!(binder.is_connected(7));
    }

    #[test]
    fn claims_stay_bijective() {
        let mut binder = host_binder(4);
        binder.on_participant_connected(7, Some(0));
        binder.on_participant_connected(8, Some(0));

        assert_eq!(binder.on_identity_claimed(42, 7), ClaimOutcome::Bound);
        assert_eq!(binder.on_identity_claimed(42, 7), ClaimOutcome::Unchanged);
        assert_eq!(binder.on_identity_claimed(43, 7), ClaimOutcome::Rebound);
        assert_eq!(binder.participant_of(42), None);
        assert_bijective(&binder);

        assert_eq!(binder.on_identity_claimed(43, 8), ClaimOutcome::Rebound);
        assert_eq!(binder.identity_of(7), None);
        assert_eq!(binder.participant_of(43), Some(8));
        assert_bijective(&binder);

        binder.on_participant_disconnected(8);
        assert_eq!(binder.participant_of(43), None);
        assert_bijective(&binder);
    }

    #[test]
    fn duplicate_spawn_requests_yield_one_representation() {
        let mut binder = host_binder(4);
        binder.on_participant_connected(7, Some(0));
        binder.on_identity_claimed(42, 7);

        assert_eq!(binder.request_spawn(7), SpawnDecision::Queued);
        assert_eq!(binder.request_spawn(7), SpawnDecision::AlreadyPending);

        let outcomes = binder.resolve_pending_spawns();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], SpawnOutcome::Spawned(_)));
        assert_eq!(binder.spawned_count(), 1);
        assert_eq!(binder.request_spawn(7), SpawnDecision::AlreadySpawned);
        assert!(binder.resolve_pending_spawns().is_empty());
    }

    #[test]
    fn unclaimed_spawn_waits_for_claim() {
        let mut binder = host_binder(4);
        binder.on_participant_connected(7, Some(0));
        binder.request_spawn(7);

        assert!(binder.resolve_pending_spawns().is_empty());
        assert!(binder.is_pending(7));

        binder.on_identity_claimed(42, 7);
        let outcomes = binder.resolve_pending_spawns();
        match &outcomes[..] {
            [SpawnOutcome::Spawned(spawn)] => assert_eq!(spawn.identity, Some(42)),
            other => panic!("unexpected outcomes {:?}", other),
        }
    }

    #[test]
    fn claimed_spawn_waits_for_connection() {
        let mut binder = host_binder(4);
        assert_eq!(binder.on_identity_claimed(42, 7), ClaimOutcome::Bound);
        binder.request_spawn(7);

        assert!(binder.resolve_pending_spawns().is_empty());
        assert!(binder.is_pending(7));

        binder.on_participant_connected(7, Some(0));
        let outcomes = binder.resolve_pending_spawns();
        assert!(matches!(&outcomes[..], [SpawnOutcome::Spawned(spawn)] if spawn.identity == Some(42)));
        assert!(binder.is_spawned(7));
        assert_eq!(binder.pending_count(), 0);
    }

    #[test]
    fn late_claim_from_departed_participant_is_dropped() {
        let mut binder = host_binder(4);
        binder.on_participant_connected(7, Some(0));
        binder.on_participant_disconnected(7);

        assert_eq!(binder.on_identity_claimed(42, 7), ClaimOutcome::Rejected);
        assert_eq!(binder.identity_of(7), None);
        assert_eq!(binder.participant_of(42), None);

        // a reconnect under the same id starts over
        binder.on_participant_connected(7, Some(0));
        assert_eq!(binder.on_identity_claimed(42, 7), ClaimOutcome::Bound);
    }

    #[test]
    fn moved_identity_leaves_old_representation_unclaimed() {
        let mut binder = host_binder(4);
        binder.on_participant_connected(7, Some(0));
        binder.on_participant_connected(8, Some(0));
        binder.on_identity_claimed(42, 7);
        binder.request_spawn(7);
        binder.resolve_pending_spawns();

        assert_eq!(binder.on_identity_claimed(42, 8), ClaimOutcome::Rebound);
        assert_eq!(binder.representation(7).unwrap().identity, None);
        let claimed: Vec<_> = binder
            .representations()
            .filter(|representation| representation.identity == Some(42))
            .collect();
        assert!(claimed.is_empty());
    }

    #[test]
    fn placement_spreads_along_x() {
        let mut binder = host_binder(4);
        binder.on_participant_connected(7, Some(0));
        binder.on_identity_claimed(42, 7);
        binder.request_spawn(0);
        binder.request_spawn(7);

        let positions: Vec<Vec3> = binder
            .resolve_pending_spawns()
            .into_iter()
            .filter_map(|outcome| match outcome {
                SpawnOutcome::Spawned(spawn) => Some(spawn.position),
                SpawnOutcome::Failed { .. } => None,
            })
            .collect();
        assert_eq!(positions, vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)]);
    }

    #[test]
    fn failures_leave_the_pending_set() {
        let mut binder = host_binder(1);
        binder.on_participant_connected(7, Some(0));
        binder.on_identity_claimed(42, 7);
        binder.on_participant_connected(9, Some(0));
        binder.on_participant_disconnected(9);
        binder.request_spawn(0);
        binder.request_spawn(7);
        binder.request_spawn(9);

        let outcomes = binder.resolve_pending_spawns();
        assert!(matches!(outcomes[0], SpawnOutcome::Spawned(_)));
        assert_eq!(
            outcomes[1],
            SpawnOutcome::Failed {
                participant: 7,
                reason: SpawnFailure::CapacityReached
            }
        );
        assert_eq!(
            outcomes[2],
            SpawnOutcome::Failed {
                participant: 9,
                reason: SpawnFailure::Disconnected
            }
        );
        assert_eq!(binder.pending_count(), 0);
        assert_eq!(binder.request_spawn(7), SpawnDecision::Queued);
    }

    #[test]
    fn departure_releases_representation() {
        let mut binder = host_binder(4);
        binder.on_participant_connected(7, Some(0));
        binder.on_identity_claimed(42, 7);
        binder.request_spawn(7);
        binder.resolve_pending_spawns();

        let despawn = binder.on_identity_left(42).unwrap();
        assert_eq!(despawn.participant, 7);
        assert!(!binder.is_spawned(7));
        assert!(binder.on_identity_left(42).is_none());
        assert!(binder.on_participant_disconnected(7).is_none());
    }

    #[test]
    fn clear_cancels_and_despawns_everything() {
        let mut binder = host_binder(4);
        binder.request_spawn(0);
        binder.resolve_pending_spawns();
        binder.on_participant_connected(7, Some(0));
        binder.request_spawn(7);

        let teardown = binder.clear();
        assert_eq!(teardown.cancelled, vec![7]);
        assert_eq!(teardown.despawned.len(), 1);
        assert!(binder.bindings().is_empty());
        assert!(!binder.is_local_connected());
        assert_eq!(binder.representations().count(), 0);
    }

    #[test]
    fn mirrored_spawns_are_deduplicated() {
        let mut binder = IdentityBinder::new(SpawnPlacement::default());
        binder.begin(2, 4);
        assert!(binder.mirror_spawn(0, Some(1), Vec3::ZERO).is_some());
        assert!(binder.mirror_spawn(0, Some(1), Vec3::ZERO).is_none());
        assert_eq!(binder.representation(0).unwrap().identity, Some(1));
    }
}

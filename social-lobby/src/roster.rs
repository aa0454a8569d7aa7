//! Friends list reconciliation.
//!
//! Entries keep the order in which friends were first seen. Buckets are not
//! stored: [`Roster::partition`] derives them from the current statuses every
//! time, so a bucket can never disagree with its entries.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::social::{
    ClientStatus, Identity, RelationshipGroup, SocialClient, SocialEvent, Status, UserId,
};
use crate::utils::arena::{Arena, Handle};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Bucket {
    InGame,
    Online,
    Offline,
}

impl Bucket {
    pub fn of(status: Status) -> Bucket {
        match status {
            Status::PlayingGame => Bucket::InGame,
            Status::Online | Status::Idle | Status::DoNotDisturb => Bucket::Online,
            Status::Offline => Bucket::Offline,
        }
    }
}

impl From<RelationshipGroup> for Bucket {
    fn from(group: RelationshipGroup) -> Bucket {
        match group {
            RelationshipGroup::OnlinePlayingGame => Bucket::InGame,
            RelationshipGroup::OnlineElsewhere => Bucket::Online,
            RelationshipGroup::Offline => Bucket::Offline,
        }
    }
}

/// What the presentation layer draws for one friend.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendView {
    pub user_id: UserId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub identity: Identity,
    pub handle: Handle,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Partition {
    pub in_game: Vec<Identity>,
    pub online: Vec<Identity>,
    pub offline: Vec<Identity>,
}

impl Partition {
    pub fn bucket(&self, bucket: Bucket) -> &[Identity] {
        match bucket {
            Bucket::InGame => &self.in_game,
            Bucket::Online => &self.online,
            Bucket::Offline => &self.offline,
        }
    }

    pub fn ids(&self, bucket: Bucket) -> Vec<UserId> {
        self.bucket(bucket).iter().map(|identity| identity.id).collect()
    }

    /// (in game, online, offline)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.in_game.len(), self.online.len(), self.offline.len())
    }

    pub fn len(&self) -> usize {
        self.in_game.len() + self.online.len() + self.offline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Roster {
    entries: IndexMap<UserId, RosterEntry>,
    views: Arena<FriendView>,
    layout_requested: bool,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            views: Arena::new(),
            layout_requested: false,
        }
    }

    /// Replace the roster with a full snapshot. Friends already present keep
    /// their place and handle, friends missing from the snapshot are dropped.
    /// A duplicate id overwrites the earlier one.
    pub fn load_initial(&mut self, identities: Vec<Identity>) {
        let mut seen: HashMap<UserId, Identity> = HashMap::new();
        let mut order = Vec::new();
        for identity in identities {
            if !identity.is_friend() {
                debug!("Skipping non-friend {} in snapshot", identity.id);
                continue;
            }
            let user_id = identity.id;
            if seen.insert(user_id, identity).is_some() {
                warn!("Duplicate id {} in roster snapshot, keeping the last one", user_id);
            } else {
                order.push(user_id);
            }
        }

        let stale: Vec<UserId> = self
            .entries
            .keys()
            .copied()
            .filter(|user_id| !seen.contains_key(user_id))
            .collect();
        for user_id in stale {
            self.remove(user_id);
        }

        for user_id in order {
            if let Some(identity) = seen.remove(&user_id) {
                self.upsert(identity);
            }
        }
        info!("Roster loaded with {} friends", self.entries.len());
        self.layout_requested = true;
    }

    /// Refresh one entry from the backend cache. Returns false when the event
    /// did not concern a friend we track or could track.
    pub fn apply_status_event(&mut self, user_id: UserId, social: &dyn SocialClient) -> bool {
        match social.relationship(user_id) {
            Some(identity) if identity.is_friend() => {
                self.upsert(identity);
            }
            _ => {
                if !self.remove(user_id) {
                    debug!("Ignoring presence change of non-friend {}", user_id);
                    return false;
                }
                info!("{} is no longer a friend", user_id);
            }
        }
        self.layout_requested = true;
        true
    }

    pub fn partition(&self) -> Partition {
        let mut partition = Partition::default();
        for entry in self.entries.values() {
            let identity = entry.identity.clone();
            match Bucket::of(identity.status) {
                Bucket::InGame => partition.in_game.push(identity),
                Bucket::Online => partition.online.push(identity),
                Bucket::Offline => partition.offline.push(identity),
            }
        }
        partition
    }

    /// True at most once per batch of changes.
    pub fn take_layout_request(&mut self) -> bool {
        std::mem::replace(&mut self.layout_requested, false)
    }

    /// Compare our buckets with the backend's own grouping. Returns the
    /// number of friends filed differently; mismatches are only logged.
    pub fn audit(&self, social: &dyn SocialClient) -> usize {
        let partition = self.partition();
        let mut mismatches = 0;
        for group in RelationshipGroup::ALL {
            let bucket = Bucket::from(group);
            let ours = partition.ids(bucket);
            for identity in social.relationships_by_group(group) {
                if identity.is_friend() && !ours.contains(&identity.id) {
                    warn!(
                        "Backend files {} under {:?}, roster does not have it in {:?}",
                        identity.id, group, bucket
                    );
                    mismatches += 1;
                }
            }
        }
        mismatches
    }

    pub fn handle_social_event(&mut self, event: &SocialEvent, social: &dyn SocialClient) {
        match event {
            SocialEvent::StatusChanged {
                status: ClientStatus::Ready,
                ..
            } => {
                self.load_initial(social.relationships());
                self.audit(social);
            }
            SocialEvent::RelationshipsUpdated(user_id) => {
                self.apply_status_event(*user_id, social);
            }
            _ => {}
        }
    }

    pub fn get(&self, user_id: UserId) -> Option<&RosterEntry> {
        self.entries.get(&user_id)
    }

    pub fn view(&self, handle: Handle) -> Option<&FriendView> {
        self.views.get(handle)
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.entries.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn upsert(&mut self, identity: Identity) {
        if let Some(entry) = self.entries.get_mut(&identity.id) {
            if let Some(view) = self.views.get_mut(entry.handle) {
                view.label = identity.display_name.clone();
            }
            entry.identity = identity;
            return;
        }

        let handle = self.views.insert(FriendView {
            user_id: identity.id,
            label: identity.display_name.clone(),
        });
        debug!("New roster entry {} ({})", identity.id, identity.display_name);
        self.entries.insert(identity.id, RosterEntry { identity, handle });
    }

    fn remove(&mut self, user_id: UserId) -> bool {
        // shift, not swap: later entries keep their relative order
        match self.entries.shift_remove(&user_id) {
            Some(entry) => {
                self.views.remove(entry.handle);
                true
            }
            None => false,
        }
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

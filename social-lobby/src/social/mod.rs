//! Surface of the social backend: identities, presence, lobbies and invites.
//!
//! The backend SDK itself lives outside this crate. [`SocialClient`] is the
//! boundary the rest of the crate talks to, [`loopback::LoopbackSocial`] an
//! in-memory stand-in for it.

use serde::{Deserialize, Serialize};

use crate::Result;

pub mod loopback;

pub type UserId = u64;
pub type LobbyId = u64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Online,
    Idle,
    DoNotDisturb,
    Offline,
    PlayingGame,
}

impl Status {
    /// Relationship group the backend files a user with this status under.
    pub fn group(self) -> RelationshipGroup {
        match self {
            Status::PlayingGame => RelationshipGroup::OnlinePlayingGame,
            Status::Online | Status::Idle | Status::DoNotDisturb => {
                RelationshipGroup::OnlineElsewhere
            }
            Status::Offline => RelationshipGroup::Offline,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    Friend,
    Other,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipGroup {
    OnlinePlayingGame,
    OnlineElsewhere,
    Offline,
}

impl RelationshipGroup {
    pub const ALL: [RelationshipGroup; 3] = [
        RelationshipGroup::OnlinePlayingGame,
        RelationshipGroup::OnlineElsewhere,
        RelationshipGroup::Offline,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub display_name: String,
    pub status: Status,
    pub relationship: RelationshipKind,
}

impl Identity {
    pub fn friend(id: UserId, display_name: &str, status: Status) -> Self {
        Self {
            id,
            display_name: display_name.to_owned(),
            status,
            relationship: RelationshipKind::Friend,
        }
    }

    pub fn is_friend(&self) -> bool {
        self.relationship == RelationshipKind::Friend
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClientStatus {
    Disconnected,
    Connecting,
    Connected,
    Ready,
    Disconnecting,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusError {
    None,
    ConnectionFailed,
    UnexpectedClose,
    ConnectionCanceled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityInvite {
    pub sender_id: UserId,
    pub party_id: String,
    pub message_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityParty {
    pub id: String,
    pub current_size: u32,
    pub max_size: u32,
}

/// Rich presence shown to friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub state: String,
    pub details: String,
    pub started_at: u64,
    pub party: Option<ActivityParty>,
    pub join_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocialEvent {
    StatusChanged {
        status: ClientStatus,
        error: StatusError,
        code: i32,
    },
    RelationshipsUpdated(UserId),
    LobbyCreated(LobbyId),
    LobbyDeleted(LobbyId),
    LobbyMemberAdded {
        lobby_id: LobbyId,
        user_id: UserId,
    },
    LobbyMemberRemoved {
        lobby_id: LobbyId,
        user_id: UserId,
    },
    ActivityInviteCreated(ActivityInvite),
}

/// The backend offers a single callback slot for all of its events.
pub type EventHandler = Box<dyn FnMut(SocialEvent)>;

pub trait SocialClient {
    /// Replace the single event callback.
    fn set_event_handler(&mut self, handler: EventHandler);

    fn status(&self) -> ClientStatus;

    fn current_user(&self) -> Option<Identity>;

    fn relationships(&self) -> Vec<Identity>;

    fn relationships_by_group(&self, group: RelationshipGroup) -> Vec<Identity>;

    /// Cached state of a single relationship, `None` if the user is unknown.
    fn relationship(&self, user_id: UserId) -> Option<Identity>;

    /// Create the lobby keyed by `secret`, or join it if it already exists.
    fn create_or_join_lobby(&mut self, secret: &str) -> Result<LobbyId>;

    fn leave_lobby(&mut self, lobby_id: LobbyId) -> Result<()>;

    fn lobby_member_ids(&self, lobby_id: LobbyId) -> Vec<UserId>;

    fn send_activity_invite(&mut self, user_id: UserId, message: &str) -> Result<()>;

    /// Accept an invite, returning the join secret of the inviter's lobby.
    fn accept_activity_invite(&mut self, invite: &ActivityInvite) -> Result<String>;

    fn update_rich_presence(&mut self, activity: &Activity) -> Result<()>;
}

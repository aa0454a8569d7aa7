use std::collections::HashMap;

use log::debug;

use crate::social::{
    Activity, ActivityInvite, ClientStatus, EventHandler, Identity, LobbyId, RelationshipGroup,
    SocialClient, SocialEvent, StatusError, UserId,
};
use crate::{ErrorKind, Result};

const NOT_FOUND: i32 = 404;

/// Backend calls that can be made to fail with [`LoopbackSocial::fail_next`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateOrJoinLobby,
    LeaveLobby,
    SendActivityInvite,
    AcceptActivityInvite,
    UpdateRichPresence,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::CreateOrJoinLobby => "create_or_join_lobby",
            Operation::LeaveLobby => "leave_lobby",
            Operation::SendActivityInvite => "send_activity_invite",
            Operation::AcceptActivityInvite => "accept_activity_invite",
            Operation::UpdateRichPresence => "update_rich_presence",
        }
    }
}

struct LoopbackLobby {
    secret: String,
    members: Vec<UserId>,
}

/// In-memory social backend. Events are delivered synchronously to the
/// registered handler, the way the real SDK invokes its callback.
pub struct LoopbackSocial {
    handler: Option<EventHandler>,
    status: ClientStatus,
    current_user: Identity,
    relationships: Vec<Identity>,
    lobbies: HashMap<LobbyId, LoopbackLobby>,
    next_lobby_id: LobbyId,
    failures: HashMap<Operation, i32>,
    invite_secrets: HashMap<String, String>,
    next_invite_id: u64,
    sent_invites: Vec<(UserId, String)>,
    presence: Option<Activity>,
    presence_updates: usize,
}

impl LoopbackSocial {
    pub fn new(current_user: Identity) -> Self {
        Self {
            handler: None,
            status: ClientStatus::Disconnected,
            current_user,
            relationships: Vec::new(),
            lobbies: HashMap::new(),
            next_lobby_id: 1_000,
            failures: HashMap::new(),
            invite_secrets: HashMap::new(),
            next_invite_id: 1,
            sent_invites: Vec::new(),
            presence: None,
            presence_updates: 0,
        }
    }

    /// Add a relationship without notifying anyone, for building the
    /// initial snapshot.
    pub fn with_relationship(mut self, identity: Identity) -> Self {
        self.relationships.push(identity);
        self
    }

    /// Walk through the connection states up to `Ready`.
    pub fn connect(&mut self) {
        self.set_status(ClientStatus::Connecting, StatusError::None, 0);
        self.set_status(ClientStatus::Connected, StatusError::None, 0);
        self.set_status(ClientStatus::Ready, StatusError::None, 0);
    }

    pub fn set_status(&mut self, status: ClientStatus, error: StatusError, code: i32) {
        self.status = status;
        self.emit(SocialEvent::StatusChanged {
            status,
            error,
            code,
        });
    }

    pub fn upsert_relationship(&mut self, identity: Identity) {
        let user_id = identity.id;
        match self.relationships.iter_mut().find(|r| r.id == user_id) {
            Some(existing) => *existing = identity,
            None => self.relationships.push(identity),
        }
        self.emit(SocialEvent::RelationshipsUpdated(user_id));
    }

    pub fn remove_relationship(&mut self, user_id: UserId) {
        self.relationships.retain(|r| r.id != user_id);
        self.emit(SocialEvent::RelationshipsUpdated(user_id));
    }

    /// Register a lobby that other users already sit in, without events.
    pub fn seed_lobby(&mut self, secret: &str, members: &[UserId]) -> LobbyId {
        let lobby_id = self.allocate_lobby_id();
        self.lobbies.insert(
            lobby_id,
            LoopbackLobby {
                secret: secret.to_owned(),
                members: members.to_vec(),
            },
        );
        lobby_id
    }

    pub fn add_member(&mut self, lobby_id: LobbyId, user_id: UserId) {
        if let Some(lobby) = self.lobbies.get_mut(&lobby_id) {
            if !lobby.members.contains(&user_id) {
                lobby.members.push(user_id);
            }
        }
        self.emit(SocialEvent::LobbyMemberAdded { lobby_id, user_id });
    }

    pub fn remove_member(&mut self, lobby_id: LobbyId, user_id: UserId) {
        if let Some(lobby) = self.lobbies.get_mut(&lobby_id) {
            lobby.members.retain(|&member| member != user_id);
        }
        self.emit(SocialEvent::LobbyMemberRemoved { lobby_id, user_id });
    }

    pub fn delete_lobby(&mut self, lobby_id: LobbyId) {
        self.lobbies.remove(&lobby_id);
        self.emit(SocialEvent::LobbyDeleted(lobby_id));
    }

    /// Deliver an invite from `sender_id` pointing at the lobby keyed by `secret`.
    pub fn receive_invite(&mut self, sender_id: UserId, secret: &str) -> ActivityInvite {
        let message_id = self.next_invite_id;
        self.next_invite_id += 1;
        let invite = ActivityInvite {
            sender_id,
            party_id: format!("party-{}", message_id),
            message_id,
        };
        self.invite_secrets
            .insert(invite.party_id.clone(), secret.to_owned());
        self.emit(SocialEvent::ActivityInviteCreated(invite.clone()));
        invite
    }

    /// Make the next call to `operation` fail with `code`.
    pub fn fail_next(&mut self, operation: Operation, code: i32) {
        self.failures.insert(operation, code);
    }

    pub fn sent_invites(&self) -> &[(UserId, String)] {
        &self.sent_invites
    }

    pub fn presence(&self) -> Option<&Activity> {
        self.presence.as_ref()
    }

    pub fn presence_updates(&self) -> usize {
        self.presence_updates
    }

    pub fn lobby_secret(&self, lobby_id: LobbyId) -> Option<&str> {
        self.lobbies.get(&lobby_id).map(|lobby| lobby.secret.as_str())
    }

    fn allocate_lobby_id(&mut self) -> LobbyId {
        let lobby_id = self.next_lobby_id;
        self.next_lobby_id += 1;
        lobby_id
    }

    fn check(&mut self, operation: Operation) -> Result<()> {
        match self.failures.remove(&operation) {
            Some(code) => Err(remote(operation, code, "injected failure")),
            None => Ok(()),
        }
    }

    fn emit(&mut self, event: SocialEvent) {
        match self.handler.as_mut() {
            Some(handler) => handler(event),
            None => debug!("No handler registered, dropping {:?}", event),
        }
    }
}

fn remote(operation: Operation, code: i32, message: &str) -> Box<ErrorKind> {
    Box::new(ErrorKind::Remote {
        operation: operation.name(),
        code,
        message: message.to_owned(),
    })
}

impl SocialClient for LoopbackSocial {
    fn set_event_handler(&mut self, handler: EventHandler) {
        self.handler = Some(handler);
    }

    fn status(&self) -> ClientStatus {
        self.status
    }

    fn current_user(&self) -> Option<Identity> {
        Some(self.current_user.clone())
    }

    fn relationships(&self) -> Vec<Identity> {
        self.relationships.clone()
    }

    fn relationships_by_group(&self, group: RelationshipGroup) -> Vec<Identity> {
        self.relationships
            .iter()
            .filter(|identity| identity.status.group() == group)
            .cloned()
            .collect()
    }

    fn relationship(&self, user_id: UserId) -> Option<Identity> {
        self.relationships.iter().find(|r| r.id == user_id).cloned()
    }

    fn create_or_join_lobby(&mut self, secret: &str) -> Result<LobbyId> {
        self.check(Operation::CreateOrJoinLobby)?;
        let me = self.current_user.id;
        let existing = self
            .lobbies
            .iter()
            .find(|(_, lobby)| lobby.secret == secret)
            .map(|(&lobby_id, _)| lobby_id);
        let lobby_id = match existing {
            Some(lobby_id) => {
                if let Some(lobby) = self.lobbies.get_mut(&lobby_id) {
                    if !lobby.members.contains(&me) {
                        lobby.members.push(me);
                    }
                }
                lobby_id
            }
            None => {
                let lobby_id = self.allocate_lobby_id();
                self.lobbies.insert(
                    lobby_id,
                    LoopbackLobby {
                        secret: secret.to_owned(),
                        members: vec![me],
                    },
                );
                lobby_id
            }
        };
        self.emit(SocialEvent::LobbyCreated(lobby_id));
        Ok(lobby_id)
    }

    fn leave_lobby(&mut self, lobby_id: LobbyId) -> Result<()> {
        self.check(Operation::LeaveLobby)?;
        let me = self.current_user.id;
        let lobby = self
            .lobbies
            .get_mut(&lobby_id)
            .ok_or_else(|| remote(Operation::LeaveLobby, NOT_FOUND, "unknown lobby"))?;
        lobby.members.retain(|&member| member != me);
        if lobby.members.is_empty() {
            self.lobbies.remove(&lobby_id);
        }
        self.emit(SocialEvent::LobbyDeleted(lobby_id));
        Ok(())
    }

    fn lobby_member_ids(&self, lobby_id: LobbyId) -> Vec<UserId> {
        self.lobbies
            .get(&lobby_id)
            .map(|lobby| lobby.members.clone())
            .unwrap_or_default()
    }

    fn send_activity_invite(&mut self, user_id: UserId, message: &str) -> Result<()> {
        self.check(Operation::SendActivityInvite)?;
        self.sent_invites.push((user_id, message.to_owned()));
        Ok(())
    }

    fn accept_activity_invite(&mut self, invite: &ActivityInvite) -> Result<String> {
        self.check(Operation::AcceptActivityInvite)?;
        self.invite_secrets
            .remove(&invite.party_id)
            .ok_or_else(|| remote(Operation::AcceptActivityInvite, NOT_FOUND, "unknown invite"))
    }

    fn update_rich_presence(&mut self, activity: &Activity) -> Result<()> {
        self.check(Operation::UpdateRichPresence)?;
        self.presence = Some(activity.clone());
        self.presence_updates += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::social::loopback::{LoopbackSocial, Operation};
    use crate::social::{Identity, SocialClient, SocialEvent, Status};
    use crate::ErrorKind;

    fn me() -> Identity {
        Identity::friend(1, "me", Status::Online)
    }

    #[test]
    fn create_then_join_by_secret() {
        let mut social = LoopbackSocial::new(me());
        let lobby_id = social.create_or_join_lobby("secret").unwrap();
        assert_eq!(social.lobby_member_ids(lobby_id), vec![1]);

        let mut other = LoopbackSocial::new(Identity::friend(2, "other", Status::Online));
        let seeded = other.seed_lobby("secret", &[1]);
        assert_eq!(other.create_or_join_lobby("secret").unwrap(), seeded);
        assert_eq!(other.lobby_member_ids(seeded), vec![1, 2]);
    }

    #[test]
    fn events_reach_the_single_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut social = LoopbackSocial::new(me());
        social.set_event_handler(Box::new(move |event| sink.borrow_mut().push(event)));

        let lobby_id = social.create_or_join_lobby("secret").unwrap();
        social.leave_lobby(lobby_id).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                SocialEvent::LobbyCreated(lobby_id),
                SocialEvent::LobbyDeleted(lobby_id)
            ]
        );
    }

    #[test]
    fn injected_failure_applies_once() {
        let mut social = LoopbackSocial::new(me());
        social.fail_next(Operation::CreateOrJoinLobby, 500);

        let err = social.create_or_join_lobby("secret").unwrap_err();
        assert!(matches!(*err, ErrorKind::Remote { code: 500, .. }));
        assert!(social.create_or_join_lobby("secret").is_ok());
    }

    #[test]
    fn accepted_invite_yields_secret_once() {
        let mut social = LoopbackSocial::new(me());
        let invite = social.receive_invite(7, "their-secret");
        assert_eq!(social.accept_activity_invite(&invite).unwrap(), "their-secret");
        assert!(social.accept_activity_invite(&invite).is_err());
    }
}

//! Lobby lifecycle and the transport that follows it.
//!
//! `Idle → Forming → Active → Idle`. While a session is active the transport
//! runs in the role elected when the lobby formed; whenever the session ends,
//! for whatever reason, the transport is shut down and the binder cleared.

use std::collections::VecDeque;

use bytes::Bytes;
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::binder::{ClaimOutcome, Despawn, IdentityBinder, SpawnOutcome};
use crate::config::Config;
use crate::social::{
    Activity, ActivityInvite, ActivityParty, ClientStatus, LobbyId, SocialClient, SocialEvent,
    StatusError, UserId,
};
use crate::transport::control::ControlMessage;
use crate::transport::{ParticipantId, Target, Transport, TransportEvent};
use crate::utils::time::unix_millis;
use crate::utils::wait::{BoundedWait, WaitResult};
use crate::{ClientEvent, ErrorKind, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A create or join call is in flight
    Forming,
    Active,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Unassigned,
    Host,
    Client,
}

impl Role {
    /// Whoever finds the lobby empty apart from themselves hosts it.
    pub fn elect(member_count: usize) -> Role {
        if member_count <= 1 {
            Role::Host
        } else {
            Role::Client
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EndReason {
    Left,
    Deleted,
    /// The local user was removed from the lobby
    Removed,
    TransportLost,
    TimedOut,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: LobbyId,
    pub secret: String,
    pub capacity: u32,
    pub members: Vec<UserId>,
    pub role: Role,
    pub self_created: bool,
}

impl Session {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Everything the orchestrator drives, borrowed for one call.
pub struct Context<'a> {
    pub social: &'a mut dyn SocialClient,
    pub transport: &'a mut dyn Transport,
    pub binder: &'a mut IdentityBinder,
    pub events: &'a mut VecDeque<ClientEvent>,
}

pub struct SessionOrchestrator {
    config: Config,
    state: SessionState,
    session: Option<Session>,
    awaiting_ready: bool,
    ready_wait: Option<BoundedWait>,
    transport_ready: bool,
    pending_invite: Option<ActivityInvite>,
    /// Lobbies we left whose `LobbyDeleted` has not come back yet
    left_lobbies: Vec<LobbyId>,
    idle_since: u64,
    active_since: u64,
}

impl SessionOrchestrator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            session: None,
            awaiting_ready: false,
            ready_wait: None,
            transport_ready: false,
            pending_invite: None,
            left_lobbies: Vec::new(),
            idle_since: 0,
            active_since: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn role(&self) -> Role {
        self.session
            .as_ref()
            .map_or(Role::Unassigned, |session| session.role)
    }

    pub fn is_transport_ready(&self) -> bool {
        self.transport_ready
    }

    pub fn pending_invite(&self) -> Option<&ActivityInvite> {
        self.pending_invite.as_ref()
    }

    pub fn create_session(&mut self, ctx: &mut Context, capacity: u32) -> Result<LobbyId> {
        let local = ensure_ready(ctx.social)?;
        if capacity == 0 {
            return Err(Box::new(ErrorKind::InvalidArg(
                "session capacity must be at least 1".to_owned(),
            )));
        }
        self.ensure_idle("create a session")?;
        let secret = Uuid::new_v4().to_string();
        self.form(ctx, local, secret, capacity, true)
    }

    pub fn join_session(&mut self, ctx: &mut Context, secret: &str) -> Result<LobbyId> {
        let local = ensure_ready(ctx.social)?;
        if secret.is_empty() {
            return Err(Box::new(ErrorKind::InvalidArg(
                "join secret is empty".to_owned(),
            )));
        }
        self.ensure_idle("join a session")?;
        let capacity = self.config.max_lobby_size;
        self.form(ctx, local, secret.to_owned(), capacity, false)
    }

    fn form(
        &mut self,
        ctx: &mut Context,
        local: UserId,
        secret: String,
        capacity: u32,
        self_created: bool,
    ) -> Result<LobbyId> {
        self.state = SessionState::Forming;
        let lobby_id = match ctx.social.create_or_join_lobby(&secret) {
            Ok(lobby_id) => lobby_id,
            Err(err) => {
                error!("Could not create or join lobby: {}", err);
                self.state = SessionState::Idle;
                ctx.events.push_back(ClientEvent::SessionFailed((*err).clone()));
                return Err(err);
            }
        };

        let mut members = ctx.social.lobby_member_ids(lobby_id);
        if !members.contains(&local) {
            members.push(local);
        }
        self.session = Some(Session {
            id: lobby_id,
            secret,
            capacity,
            members: Vec::new(),
            role: Role::Unassigned,
            self_created,
        });
        self.on_lobby_created_or_joined(ctx, lobby_id, members)?;
        Ok(lobby_id)
    }

    /// Elect the role from the membership observed at formation and start
    /// the transport in that role.
    pub fn on_lobby_created_or_joined(
        &mut self,
        ctx: &mut Context,
        lobby_id: LobbyId,
        members: Vec<UserId>,
    ) -> Result<Role> {
        if self.state == SessionState::Active {
            return match &self.session {
                Some(session) if session.id == lobby_id => Ok(session.role),
                _ => Err(Box::new(ErrorKind::InvalidState(format!(
                    "lobby {} formed while another session is active",
                    lobby_id
                )))),
            };
        }
        let local = match ctx.social.current_user() {
            Some(user) => user.id,
            None => {
                self.session = None;
                self.state = SessionState::Idle;
                return Err(Box::new(ErrorKind::NoCurrentUser));
            }
        };
        let session = match self.session.as_mut() {
            Some(session) if self.state == SessionState::Forming && session.id == lobby_id => {
                session
            }
            _ => {
                return Err(Box::new(ErrorKind::InvalidState(format!(
                    "lobby {} formed without a create or join in flight",
                    lobby_id
                ))))
            }
        };

        session.role = if session.self_created {
            Role::elect(members.len())
        } else {
            Role::Client
        };
        session.members = members;
        let role = session.role;
        let capacity = session.capacity;
        let member_count = session.members.len();
        info!(
            "Session {} active as {:?} with {} member(s)",
            lobby_id, role, member_count
        );

        self.state = SessionState::Active;
        self.active_since = unix_millis();
        ctx.binder.begin(local, capacity as usize);
        ctx.events.push_back(ClientEvent::SessionActive {
            session_id: lobby_id,
            role,
            member_count,
        });
        self.publish_presence(ctx);

        let started = match role {
            Role::Host => ctx.transport.start_host(),
            _ => ctx.transport.start_client(),
        };
        if !started {
            error!("Transport refused to start as {:?}", role);
            let err = ErrorKind::TransportStart(role);
            ctx.events.push_back(ClientEvent::SessionFailed(err.clone()));
            self.abandon(ctx, EndReason::TransportLost, true);
            return Err(Box::new(err));
        }

        self.awaiting_ready = true;
        self.ready_wait = None;
        self.transport_ready = false;
        Ok(role)
    }

    pub fn on_lobby_deleted(&mut self, ctx: &mut Context, lobby_id: LobbyId) {
        if let Some(index) = self.left_lobbies.iter().position(|&left| left == lobby_id) {
            self.left_lobbies.remove(index);
            debug!("Lobby {} deleted after we left it", lobby_id);
            return;
        }
        match &self.session {
            Some(session) if session.id == lobby_id => {
                info!("Lobby {} deleted", lobby_id);
                self.end(ctx, EndReason::Deleted);
            }
            _ => debug!("Ignoring deletion of untracked lobby {}", lobby_id),
        }
    }

    /// Leave the current lobby. Without a session this does nothing.
    pub fn leave_session(&mut self, ctx: &mut Context) -> Result<()> {
        let lobby_id = match &self.session {
            Some(session) => session.id,
            None => {
                debug!("Leave requested without a session");
                return Ok(());
            }
        };
        if let Err(err) = ctx.social.leave_lobby(lobby_id) {
            error!("Could not leave lobby {}: {}", lobby_id, err);
            return Err(err);
        }
        self.left_lobbies.push(lobby_id);
        self.end(ctx, EndReason::Left);
        Ok(())
    }

    /// Shut the transport down and forget the session. Safe to call any
    /// number of times.
    pub fn teardown(&mut self, ctx: &mut Context) {
        self.awaiting_ready = false;
        self.ready_wait = None;
        self.transport_ready = false;
        ctx.transport.shutdown();

        let teardown = ctx.binder.clear();
        for participant in teardown.cancelled {
            ctx.events.push_back(ClientEvent::SpawnCancelled(participant));
        }
        for despawn in teardown.despawned {
            ctx.events.push_back(despawned_event(despawn));
        }

        let had_session = self.session.take().is_some();
        self.state = SessionState::Idle;
        if had_session {
            self.publish_presence(ctx);
        }
    }

    fn end(&mut self, ctx: &mut Context, reason: EndReason) {
        let session_id = self.session.as_ref().map(|session| session.id);
        self.teardown(ctx);
        if let Some(session_id) = session_id {
            info!("Session {} ended: {:?}", session_id, reason);
            ctx.events
                .push_back(ClientEvent::SessionEnded { session_id, reason });
        }
    }

    /// End the session after a local failure, leaving the lobby on a best
    /// effort basis when `leave` is set.
    fn abandon(&mut self, ctx: &mut Context, reason: EndReason, leave: bool) {
        if leave {
            if let Some(session) = &self.session {
                match ctx.social.leave_lobby(session.id) {
                    Ok(()) => self.left_lobbies.push(session.id),
                    Err(err) => {
                        warn!("Could not leave lobby {} while abandoning it: {}", session.id, err)
                    }
                }
            }
        }
        self.end(ctx, reason);
    }

    pub fn on_member_added(&mut self, ctx: &mut Context, lobby_id: LobbyId, user_id: UserId) {
        let session = match self.session.as_mut() {
            Some(session) if session.id == lobby_id => session,
            _ => {
                debug!("Member {} joined untracked lobby {}", user_id, lobby_id);
                return;
            }
        };
        if session.members.contains(&user_id) {
            debug!("Member {} already in lobby {}", user_id, lobby_id);
            return;
        }
        session.members.push(user_id);
        info!("Member {} joined lobby {}", user_id, lobby_id);
        ctx.events.push_back(ClientEvent::MemberJoined {
            session_id: lobby_id,
            user_id,
        });
        self.publish_presence(ctx);
    }

    pub fn on_member_removed(&mut self, ctx: &mut Context, lobby_id: LobbyId, user_id: UserId) {
        let session = match self.session.as_mut() {
            Some(session) if session.id == lobby_id => session,
            _ => {
                debug!("Member {} left untracked lobby {}", user_id, lobby_id);
                return;
            }
        };
        if ctx.binder.local_identity() == Some(user_id) {
            warn!("Removed from lobby {}", lobby_id);
            self.abandon(ctx, EndReason::Removed, false);
            return;
        }
        let before = session.members.len();
        session.members.retain(|&member| member != user_id);
        if session.members.len() == before {
            warn!("Member {} left lobby {} but was never seen joining", user_id, lobby_id);
            return;
        }

        info!("Member {} left lobby {}", user_id, lobby_id);
        ctx.events.push_back(ClientEvent::MemberLeft {
            session_id: lobby_id,
            user_id,
        });
        if let Some(despawn) = ctx.binder.on_identity_left(user_id) {
            self.announce_despawn(ctx, despawn);
        }
        self.publish_presence(ctx);
    }

    pub fn on_transport_event(&mut self, ctx: &mut Context, event: TransportEvent) {
        if self.state != SessionState::Active {
            debug!("Dropping transport event outside a session: {:?}", event);
            return;
        }
        match event {
            TransportEvent::ServerStarted => info!("Transport hosting"),
            TransportEvent::ClientConnected(participant) => {
                let local = ctx.transport.local_participant();
                ctx.binder.on_participant_connected(participant, local);
            }
            TransportEvent::ClientDisconnected(participant) => {
                if ctx.binder.local_participant() == Some(participant) {
                    warn!("Local participant {} lost its connection", participant);
                    self.abandon(ctx, EndReason::TransportLost, true);
                    return;
                }
                if let Some(despawn) = ctx.binder.on_participant_disconnected(participant) {
                    self.announce_despawn(ctx, despawn);
                }
            }
            TransportEvent::Message { from, payload } => match ControlMessage::decode(&payload) {
                Ok(message) => self.on_control_message(ctx, from, message),
                Err(err) => warn!("Dropping frame from participant {}: {}", from, err),
            },
        }
    }

    fn on_control_message(&mut self, ctx: &mut Context, from: ParticipantId, message: ControlMessage) {
        debug!("{} from participant {}", message.name(), from);
        if self.role() == Role::Client
            && message.is_host_announcement()
            && ctx.transport.host_participant() != Some(from)
        {
            warn!(
                "Participant {} is not the host, dropping its {}",
                from,
                message.name()
            );
            return;
        }
        match (self.role(), message) {
            (Role::Host, ControlMessage::ClaimIdentity { identity }) => {
                let is_member = self
                    .session
                    .as_ref()
                    .map_or(false, |session| session.members.contains(&identity));
                if !is_member {
                    debug!("Participant {} claims {} before the lobby reported it", from, identity);
                }
                let outcome = ctx.binder.on_identity_claimed(identity, from);
                if outcome == ClaimOutcome::Rejected {
                    return;
                }
                if outcome.is_new() {
                    ctx.events
                        .push_back(ClientEvent::IdentityBound { identity, participant: from });
                    send(
                        ctx.transport,
                        Target::Broadcast,
                        &ControlMessage::IdentityBound {
                            identity,
                            participant: from,
                        },
                    );
                }
                self.send_snapshot(ctx, from);
            }
            (Role::Host, ControlMessage::RequestSpawn) => {
                let decision = ctx.binder.request_spawn(from);
                debug!("Spawn request from {}: {:?}", from, decision);
            }
            (Role::Host, message) => warn!(
                "Participant {} sent {} to a host, another peer may believe it hosts this lobby",
                from,
                message.name()
            ),
            (Role::Client, ControlMessage::IdentityBound { identity, participant }) => {
                if ctx.binder.on_identity_claimed(identity, participant).is_new() {
                    ctx.events
                        .push_back(ClientEvent::IdentityBound { identity, participant });
                }
            }
            (Role::Client, ControlMessage::Spawned { participant, identity, position }) => {
                if ctx.binder.mirror_spawn(participant, identity, position).is_some() {
                    ctx.events.push_back(ClientEvent::Spawned {
                        participant,
                        identity,
                        position,
                    });
                }
            }
            (Role::Client, ControlMessage::Despawned { participant }) => {
                if let Some(despawn) = ctx.binder.release(participant) {
                    ctx.events.push_back(despawned_event(despawn));
                }
            }
            (role, message) => warn!(
                "Ignoring {} from participant {} while {:?}",
                message.name(),
                from,
                role
            ),
        }
    }

    /// Bring a fresh claimer up to date with what it missed.
    fn send_snapshot(&self, ctx: &mut Context, participant: ParticipantId) {
        let target = Target::Participant(participant);
        for (identity, bound) in ctx.binder.bindings() {
            if bound != participant {
                send(
                    ctx.transport,
                    target,
                    &ControlMessage::IdentityBound {
                        identity,
                        participant: bound,
                    },
                );
            }
        }
        let spawned: Vec<ControlMessage> = ctx
            .binder
            .representations()
            .map(|representation| ControlMessage::Spawned {
                participant: representation.participant,
                identity: representation.identity,
                position: representation.position,
            })
            .collect();
        for message in &spawned {
            send(ctx.transport, target, message);
        }
    }

    /// Advance the transport readiness wait, if one is running.
    pub fn poll_ready(&mut self, ctx: &mut Context, now: std::time::Instant) {
        if !self.awaiting_ready {
            return;
        }
        let timeout = self.config.ready_timeout();
        let interval = self.config.ready_poll_interval();
        let ready = ctx.binder.is_local_connected();
        let wait = self
            .ready_wait
            .get_or_insert_with(|| BoundedWait::new(now, timeout, interval));

        match wait.poll(now, || ready) {
            WaitResult::Pending => {}
            WaitResult::Ready => {
                debug!(
                    "Transport ready after {:?} ({} poll(s))",
                    wait.elapsed(now),
                    wait.poll_count()
                );
                self.awaiting_ready = false;
                self.ready_wait = None;
                self.on_transport_ready(ctx);
            }
            WaitResult::Expired => {
                let timeout = wait.timeout();
                error!("Transport not ready after {:?}, giving up", timeout);
                ctx.events
                    .push_back(ClientEvent::SessionFailed(ErrorKind::Timeout(timeout)));
                self.abandon(ctx, EndReason::TimedOut, true);
            }
        }
    }

    fn on_transport_ready(&mut self, ctx: &mut Context) {
        let participant = match ctx.binder.local_participant() {
            Some(participant) => participant,
            None => return,
        };
        self.transport_ready = true;
        let role = self.role();
        info!("Transport ready as {:?}, local participant {}", role, participant);
        ctx.events
            .push_back(ClientEvent::TransportReady { role, participant });

        match role {
            Role::Host => {
                ctx.binder.request_spawn(participant);
            }
            Role::Client => {
                if let Some(identity) = ctx.binder.local_identity() {
                    send(ctx.transport, Target::Host, &ControlMessage::ClaimIdentity { identity });
                }
                send(ctx.transport, Target::Host, &ControlMessage::RequestSpawn);
            }
            Role::Unassigned => {}
        }
    }

    /// Host only: settle the queued spawn requests and announce the results.
    pub fn resolve_spawns(&mut self, ctx: &mut Context) {
        if self.role() != Role::Host {
            return;
        }
        for outcome in ctx.binder.resolve_pending_spawns() {
            match outcome {
                SpawnOutcome::Spawned(spawn) => {
                    send(
                        ctx.transport,
                        Target::Broadcast,
                        &ControlMessage::Spawned {
                            participant: spawn.participant,
                            identity: spawn.identity,
                            position: spawn.position,
                        },
                    );
                    ctx.events.push_back(ClientEvent::Spawned {
                        participant: spawn.participant,
                        identity: spawn.identity,
                        position: spawn.position,
                    });
                }
                SpawnOutcome::Failed {
                    participant,
                    reason,
                } => {
                    warn!("Spawn of participant {} failed: {:?}", participant, reason);
                    ctx.events
                        .push_back(ClientEvent::SpawnFailed { participant, reason });
                }
            }
        }
    }

    fn announce_despawn(&self, ctx: &mut Context, despawn: Despawn) {
        if self.role() == Role::Host {
            send(
                ctx.transport,
                Target::Broadcast,
                &ControlMessage::Despawned {
                    participant: despawn.participant,
                },
            );
        }
        ctx.events.push_back(despawned_event(despawn));
    }

    pub fn send_invite(&mut self, ctx: &mut Context, user_id: UserId) -> Result<()> {
        ensure_ready(ctx.social)?;
        if self.session.is_none() {
            return Err(Box::new(ErrorKind::NoSession));
        }
        if let Err(err) = ctx
            .social
            .send_activity_invite(user_id, &self.config.invite_message)
        {
            error!("Could not invite {}: {}", user_id, err);
            return Err(err);
        }
        info!("Invited {}", user_id);
        ctx.events.push_back(ClientEvent::InviteSent(user_id));
        Ok(())
    }

    pub fn on_invite_created(&mut self, ctx: &mut Context, invite: ActivityInvite) {
        if let Some(previous) = self.pending_invite.replace(invite.clone()) {
            debug!("Invite from {} replaced by one from {}", previous.sender_id, invite.sender_id);
        }
        info!("Invite received from {}", invite.sender_id);
        ctx.events.push_back(ClientEvent::InviteReceived(invite));
    }

    /// Accept the latest invite and join the inviter's lobby, leaving the
    /// current session first.
    pub fn accept_invite(&mut self, ctx: &mut Context) -> Result<LobbyId> {
        ensure_ready(ctx.social)?;
        let invite = self
            .pending_invite
            .take()
            .ok_or_else(|| Box::new(ErrorKind::NoPendingInvite))?;
        let secret = match ctx.social.accept_activity_invite(&invite) {
            Ok(secret) => secret,
            Err(err) => {
                error!("Could not accept invite from {}: {}", invite.sender_id, err);
                self.pending_invite = Some(invite);
                return Err(err);
            }
        };
        if let Err(err) = self.leave_session(ctx) {
            self.pending_invite = Some(invite);
            return Err(err);
        }
        self.join_session(ctx, &secret)
    }

    pub fn decline_invite(&mut self) -> Result<()> {
        let invite = self
            .pending_invite
            .take()
            .ok_or_else(|| Box::new(ErrorKind::NoPendingInvite))?;
        info!("Declined invite from {}", invite.sender_id);
        Ok(())
    }

    pub fn on_status_changed(
        &mut self,
        ctx: &mut Context,
        status: ClientStatus,
        status_error: StatusError,
        code: i32,
    ) {
        if status_error != StatusError::None {
            error!(
                "Social client {:?} with error {:?} (code {})",
                status, status_error, code
            );
        } else {
            info!("Social client {:?}", status);
        }
        match status {
            ClientStatus::Ready => {
                self.idle_since = unix_millis();
                self.publish_presence(ctx);
            }
            ClientStatus::Disconnected if self.session.is_some() => {
                warn!("Social client disconnected during a session");
                self.abandon(ctx, EndReason::Disconnected, false);
            }
            _ => {}
        }
    }

    pub fn handle_social_event(&mut self, ctx: &mut Context, event: &SocialEvent) {
        match event {
            SocialEvent::StatusChanged {
                status,
                error,
                code,
            } => self.on_status_changed(ctx, *status, *error, *code),
            SocialEvent::LobbyCreated(lobby_id) => match &self.session {
                Some(session) if session.id == *lobby_id => {
                    debug!("Lobby {} confirmed", lobby_id)
                }
                _ => debug!("Ignoring untracked lobby {}", lobby_id),
            },
            SocialEvent::LobbyDeleted(lobby_id) => self.on_lobby_deleted(ctx, *lobby_id),
            SocialEvent::LobbyMemberAdded { lobby_id, user_id } => {
                self.on_member_added(ctx, *lobby_id, *user_id)
            }
            SocialEvent::LobbyMemberRemoved { lobby_id, user_id } => {
                self.on_member_removed(ctx, *lobby_id, *user_id)
            }
            SocialEvent::ActivityInviteCreated(invite) => {
                self.on_invite_created(ctx, invite.clone())
            }
            SocialEvent::RelationshipsUpdated(_) => {}
        }
    }

    fn publish_presence(&self, ctx: &mut Context) {
        if ctx.social.status() != ClientStatus::Ready {
            debug!("Social client not ready, skipping rich presence");
            return;
        }
        let presence = &self.config.presence;
        let activity = match &self.session {
            Some(session) => Activity {
                state: presence.lobby_state.clone(),
                details: presence.lobby_details.clone(),
                started_at: self.active_since,
                party: Some(ActivityParty {
                    id: session.id.to_string(),
                    current_size: session.members.len() as u32,
                    max_size: session.capacity,
                }),
                join_secret: Some(session.secret.clone()),
            },
            None => Activity {
                state: presence.idle_state.clone(),
                details: presence.idle_details.clone(),
                started_at: self.idle_since,
                party: None,
                join_secret: None,
            },
        };
        if let Err(err) = ctx.social.update_rich_presence(&activity) {
            warn!("Could not update rich presence: {}", err);
        }
    }

    fn ensure_idle(&self, action: &str) -> Result<()> {
        match self.state {
            SessionState::Idle => Ok(()),
            state => Err(Box::new(ErrorKind::InvalidState(format!(
                "cannot {} while {:?}",
                action, state
            )))),
        }
    }
}

/// The social client must be connected and know who we are.
pub fn ensure_ready(social: &dyn SocialClient) -> Result<UserId> {
    if social.status() != ClientStatus::Ready {
        return Err(Box::new(ErrorKind::NotReady));
    }
    social
        .current_user()
        .map(|user| user.id)
        .ok_or_else(|| Box::new(ErrorKind::NoCurrentUser))
}

fn send(transport: &mut dyn Transport, target: Target, message: &ControlMessage) {
    let payload: Bytes = match message.encode() {
        Ok(payload) => payload,
        Err(err) => {
            error!("{}", err);
            return;
        }
    };
    if let Err(err) = transport.send(target, payload) {
        warn!("Could not send {} to {:?}: {}", message.name(), target, err);
    }
}

fn despawned_event(despawn: Despawn) -> ClientEvent {
    ClientEvent::Despawned {
        participant: despawn.participant,
        identity: despawn.identity,
    }
}

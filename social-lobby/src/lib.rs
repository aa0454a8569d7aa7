use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::debug;

use crate::binder::{IdentityBinder, SpawnFailure, Vec3};
use crate::bus::{EventBus, Subscription};
use crate::config::Config;
use crate::roster::{Partition, Roster};
use crate::session::{Context, EndReason, Role, Session, SessionOrchestrator, SessionState};
use crate::social::{
    ActivityInvite, ClientStatus, LobbyId, SocialClient, SocialEvent, StatusError, UserId,
};
use crate::transport::{ParticipantId, Transport};

pub mod binder;
pub mod bus;
pub mod config;
pub mod roster;
pub mod session;
pub mod social;
pub mod transport;
pub mod utils;

/// Everything the presentation layer needs to hear about, drained with
/// [`LobbyClient::poll_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    StatusChanged {
        status: ClientStatus,
        error: StatusError,
        code: i32,
    },
    /// The friend buckets changed and should be laid out again
    RosterLayout(Partition),
    SessionActive {
        session_id: LobbyId,
        role: Role,
        member_count: usize,
    },
    SessionEnded {
        session_id: LobbyId,
        reason: EndReason,
    },
    SessionFailed(ErrorKind),
    MemberJoined {
        session_id: LobbyId,
        user_id: UserId,
    },
    MemberLeft {
        session_id: LobbyId,
        user_id: UserId,
    },
    TransportReady {
        role: Role,
        participant: ParticipantId,
    },
    IdentityBound {
        identity: UserId,
        participant: ParticipantId,
    },
    Spawned {
        participant: ParticipantId,
        identity: Option<UserId>,
        position: Vec3,
    },
    Despawned {
        participant: ParticipantId,
        identity: Option<UserId>,
    },
    SpawnCancelled(ParticipantId),
    SpawnFailed {
        participant: ParticipantId,
        reason: SpawnFailure,
    },
    InviteReceived(ActivityInvite),
    InviteSent(UserId),
}

pub type Result<T> = ::std::result::Result<T, Error>;

pub type Error = Box<ErrorKind>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("{operation} failed with code {code}: {message}")]
    Remote {
        operation: &'static str,
        code: i32,
        message: String,
    },
    #[error("social client is not ready")]
    NotReady,
    #[error("no current user")]
    NoCurrentUser,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("no active session")]
    NoSession,
    #[error("no pending invite")]
    NoPendingInvite,
    #[error("transport failed to start as {0:?}")]
    TransportStart(Role),
    #[error("transport not ready after {0:?}")]
    Timeout(Duration),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialize(String),
    #[error("deserialization error: {0}")]
    Deserialize(String),
    #[error("send error: {0}")]
    Send(String),
}

pub struct LobbyClient<S: SocialClient, T: Transport> {
    config: Config,
    social: S,
    transport: T,
    bus: EventBus<SocialEvent>,
    social_events: Subscription<SocialEvent>,
    roster: Roster,
    orchestrator: SessionOrchestrator,
    binder: IdentityBinder,
    events: VecDeque<ClientEvent>,
}

impl<S: SocialClient, T: Transport> LobbyClient<S, T> {
    /// Take ownership of both collaborators and register the single social
    /// event handler.
    pub fn new(config: Config, mut social: S, transport: T) -> Result<Self> {
        config.validate()?;

        let mut bus = EventBus::new();
        let social_events = bus.subscribe("lobby-client");
        let publisher = bus.publisher();
        social.set_event_handler(Box::new(move |event| {
            if !publisher.publish(event) {
                debug!("Social event published after the client went away");
            }
        }));
        if social.status() == ClientStatus::Ready {
            bus.publisher().publish(SocialEvent::StatusChanged {
                status: ClientStatus::Ready,
                error: StatusError::None,
                code: 0,
            });
        }

        Ok(Self {
            orchestrator: SessionOrchestrator::new(config.clone()),
            binder: IdentityBinder::new(config.spawn),
            config,
            social,
            transport,
            bus,
            social_events,
            roster: Roster::new(),
            events: VecDeque::new(),
        })
    }

    pub fn tick(&mut self, now: Instant) {
        self.bus.pump();
        for event in self.social_events.drain() {
            self.roster.handle_social_event(&event, &self.social);
            if let SocialEvent::StatusChanged {
                status,
                error,
                code,
            } = event
            {
                self.events.push_back(ClientEvent::StatusChanged {
                    status,
                    error,
                    code,
                });
            }
            let (orchestrator, mut ctx) = self.split();
            orchestrator.handle_social_event(&mut ctx, &event);
        }

        let mut transport_events = Vec::new();
        self.transport.poll_events(&mut transport_events);
        for event in transport_events {
            let (orchestrator, mut ctx) = self.split();
            orchestrator.on_transport_event(&mut ctx, event);
        }

        let (orchestrator, mut ctx) = self.split();
        orchestrator.poll_ready(&mut ctx, now);
        orchestrator.resolve_spawns(&mut ctx);

        if self.roster.take_layout_request() {
            self.events
                .push_back(ClientEvent::RosterLayout(self.roster.partition()));
        }
    }

    pub fn poll_events(&mut self, events: &mut Vec<ClientEvent>) {
        events.extend(self.events.drain(..));
    }

    /// Create a lobby of `capacity` seats, or of the configured size.
    pub fn create_session(&mut self, capacity: Option<u32>) -> Result<LobbyId> {
        let capacity = capacity.unwrap_or(self.config.max_lobby_size);
        let (orchestrator, mut ctx) = self.split();
        orchestrator.create_session(&mut ctx, capacity)
    }

    pub fn join_session(&mut self, secret: &str) -> Result<LobbyId> {
        let (orchestrator, mut ctx) = self.split();
        orchestrator.join_session(&mut ctx, secret)
    }

    pub fn leave_session(&mut self) -> Result<()> {
        let (orchestrator, mut ctx) = self.split();
        orchestrator.leave_session(&mut ctx)
    }

    pub fn send_invite(&mut self, user_id: UserId) -> Result<()> {
        let (orchestrator, mut ctx) = self.split();
        orchestrator.send_invite(&mut ctx, user_id)
    }

    pub fn accept_invite(&mut self) -> Result<LobbyId> {
        let (orchestrator, mut ctx) = self.split();
        orchestrator.accept_invite(&mut ctx)
    }

    pub fn decline_invite(&mut self) -> Result<()> {
        self.orchestrator.decline_invite()
    }

    pub fn partition(&self) -> Partition {
        self.roster.partition()
    }

    pub fn role(&self) -> Role {
        self.orchestrator.role()
    }

    pub fn session_id(&self) -> Option<LobbyId> {
        self.orchestrator.session().map(|session| session.id)
    }

    pub fn session(&self) -> Option<&Session> {
        self.orchestrator.session()
    }

    pub fn state(&self) -> SessionState {
        self.orchestrator.state()
    }

    pub fn pending_invite(&self) -> Option<&ActivityInvite> {
        self.orchestrator.pending_invite()
    }

    /// Receive a copy of every social event from the next tick on.
    pub fn subscribe(&mut self, name: &str) -> Subscription<SocialEvent> {
        let subscription = self.bus.subscribe(name);
        debug!("{} subscribed, {} subscriber(s)", name, self.bus.subscriber_count());
        subscription
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn binder(&self) -> &IdentityBinder {
        &self.binder
    }

    pub fn social(&self) -> &S {
        &self.social
    }

    pub fn social_mut(&mut self) -> &mut S {
        &mut self.social
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn split(&mut self) -> (&mut SessionOrchestrator, Context<'_>) {
        (
            &mut self.orchestrator,
            Context {
                social: &mut self.social,
                transport: &mut self.transport,
                binder: &mut self.binder,
                events: &mut self.events,
            },
        )
    }
}

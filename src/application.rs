use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};
use social_lobby::config::Config;
use social_lobby::social::loopback::LoopbackSocial;
use social_lobby::social::{Identity, LobbyId, Status, UserId};
use social_lobby::transport::loopback::LoopbackTransport;
use social_lobby::transport::TransportEvent;
use social_lobby::{ClientEvent, LobbyClient, Result};

use crate::time::{Clock, FrameLimiter};
use crate::ui::screens::events_screen::EventScreen;
use crate::ui::screens::friend_list_screen::FriendListScreen;
use crate::ui::screens::lobby_screen::LobbyScreen;
use crate::ui::{Ui, View};

type Client = LobbyClient<LoopbackSocial, LoopbackTransport>;

const PLAYER: UserId = 1;
const PLAYER_PARTICIPANT: u64 = 1;
const ADA: UserId = 2;
const ADA_PARTICIPANT: u64 = 2;
const GRACE: UserId = 3;
const LINUS: UserId = 4;

pub enum State {
    Boot,
    Initialize,
    Run,
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum Action {
    FriendUpdate(Identity),
    CreateSession,
    InviteFriend(UserId),
    AcceptInvite,
    DeclineInvite,
    LeaveSession,
    /// Ada opens her own lobby and invites the player
    PeerHosts,
    Quit,
}

/// Actions played back at fixed frames, standing in for a user.
struct Script {
    steps: Vec<(u64, Action)>,
    next: usize,
}

impl Script {
    fn demo() -> Self {
        Self {
            steps: vec![
                (5, Action::FriendUpdate(Identity::friend(ADA, "Ada", Status::PlayingGame))),
                (10, Action::FriendUpdate(Identity::friend(GRACE, "Grace", Status::Idle))),
                (20, Action::CreateSession),
                (30, Action::InviteFriend(ADA)),
                (90, Action::LeaveSession),
                (100, Action::PeerHosts),
                (160, Action::LeaveSession),
                (170, Action::Quit),
            ],
            next: 0,
        }
    }

    fn run(&mut self, frame: u64, action_sender: &Sender<Action>) {
        while let Some((at, action)) = self.steps.get(self.next) {
            if *at > frame {
                break;
            }
            if action_sender.send(action.clone()).is_err() {
                return;
            }
            self.next += 1;
        }
    }
}

pub struct Application {
    state: State,
    clock: Clock,
    frame_limiter: FrameLimiter,
    ui: Ui,
    script: Script,
    action_sender: Sender<Action>,
    action_receiver: Receiver<Action>,
    player: Client,
    peer: Client,
    events: Vec<ClientEvent>,
    peer_events: Vec<ClientEvent>,
}

impl Application {
    pub fn new(config: Config) -> Result<Self> {
        let mut player_social = LoopbackSocial::new(Identity::friend(PLAYER, "You", Status::Online))
            .with_relationship(Identity::friend(ADA, "Ada", Status::Offline))
            .with_relationship(Identity::friend(GRACE, "Grace", Status::Online))
            .with_relationship(Identity::friend(LINUS, "Linus", Status::Offline));
        player_social.connect();
        let mut peer_social = LoopbackSocial::new(Identity::friend(ADA, "Ada", Status::Online))
            .with_relationship(Identity::friend(PLAYER, "You", Status::Online));
        peer_social.connect();

        let player = LobbyClient::new(
            config.clone(),
            player_social,
            LoopbackTransport::new(PLAYER_PARTICIPANT),
        )?;
        let peer = LobbyClient::new(config, peer_social, LoopbackTransport::new(ADA_PARTICIPANT))?;

        let (action_sender, action_receiver) = unbounded();
        Ok(Self {
            state: State::Boot,
            clock: Clock::new(Instant::now()),
            frame_limiter: FrameLimiter::new(60, Duration::from_millis(2)),
            ui: Ui::new(action_sender.clone()),
            script: Script::demo(),
            action_sender,
            action_receiver,
            player,
            peer,
            events: Vec::with_capacity(256),
            peer_events: Vec::with_capacity(256),
        })
    }

    fn initialize(&mut self) {
        self.ui.add_screen(Box::new(EventScreen::new()));
        self.ui.add_screen(Box::new(FriendListScreen::new()));
        self.ui.add_screen(Box::new(LobbyScreen::new(true)));
        info!("Demo ready, {} ms per frame", self.frame_limiter.frame_duration().as_millis());
    }

    fn tick(&mut self) {
        let now = self.clock.now();
        self.script.run(self.clock.frame(), &self.action_sender);
        self.handle_actions();

        self.player.tick(now);
        self.peer.tick(now);
        self.player.transport_mut().forward_to(self.peer.transport_mut());
        self.peer.transport_mut().forward_to(self.player.transport_mut());
        self.update_peer();

        self.player.poll_events(&mut self.events);
        let view = View {
            frame: self.clock.frame(),
            role: self.player.role(),
            session: self.player.session().cloned(),
            representations: self.player.binder().representations().cloned().collect(),
            partition: self.player.partition(),
        };
        self.ui.draw(&view, &self.events);
        self.events.clear();

        let now = self.frame_limiter.wait();
        self.clock.advance(now);
    }

    fn handle_actions(&mut self) {
        while let Ok(action) = self.action_receiver.try_recv() {
            debug!("Action {:?}", action);
            if let Err(err) = self.apply(action) {
                error!("Action failed: {}", err);
            }
        }
    }

    fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            Action::FriendUpdate(identity) => {
                self.player.social_mut().upsert_relationship(identity);
            }
            Action::CreateSession => {
                self.player.create_session(None)?;
            }
            Action::InviteFriend(user_id) => {
                self.player.send_invite(user_id)?;
                if user_id == ADA {
                    deliver_invite(&self.player, &mut self.peer, PLAYER);
                }
            }
            Action::AcceptInvite => {
                self.player.accept_invite()?;
                if let Some(lobby_id) = self.peer.session_id() {
                    admit(&mut self.peer, lobby_id, PLAYER, PLAYER_PARTICIPANT);
                }
            }
            Action::DeclineInvite => self.player.decline_invite()?,
            Action::LeaveSession => {
                self.player.leave_session()?;
                self.peer.leave_session()?;
            }
            Action::PeerHosts => {
                self.peer.create_session(None)?;
                self.peer.send_invite(PLAYER)?;
                deliver_invite(&self.peer, &mut self.player, ADA);
            }
            Action::Quit => self.state = State::Shutdown,
        }
        Ok(())
    }

    /// Ada's side of the demo: she accepts every invite she gets.
    fn update_peer(&mut self) {
        self.peer.poll_events(&mut self.peer_events);
        for event in self.peer_events.drain(..) {
            debug!("[Ada] {:?}", event);
            if let ClientEvent::InviteReceived(_) = event {
                match self.peer.accept_invite() {
                    Ok(_) => {
                        if let Some(lobby_id) = self.player.session_id() {
                            admit(&mut self.player, lobby_id, ADA, ADA_PARTICIPANT);
                        }
                    }
                    Err(err) => error!("[Ada] Could not accept invite: {}", err),
                }
            }
        }
    }

    fn shutdown(&mut self) {
        for client in [&mut self.player, &mut self.peer] {
            if let Err(err) = client.leave_session() {
                error!("Could not leave session on shutdown: {}", err);
            }
        }
        info!(
            "Shutting down after {} frames ({:.2}s)",
            self.clock.frame(),
            self.clock.elapsed().as_secs_f32()
        );
    }

    pub fn run(mut self) {
        loop {
            match self.state {
                State::Boot => {
                    self.state = State::Initialize;
                }
                State::Initialize => {
                    self.initialize();
                    self.state = State::Run;
                }
                State::Run => self.tick(),
                State::Shutdown => {
                    self.shutdown();
                    break;
                }
            }
        }
    }
}

/// Play the backend: make the host's lobby and invite visible to the guest.
fn deliver_invite(host: &Client, guest: &mut Client, sender: UserId) {
    let session = match host.session() {
        Some(session) => session,
        None => return,
    };
    guest.social_mut().seed_lobby(&session.secret, &session.members);
    guest.social_mut().receive_invite(sender, &session.secret);
}

/// Play the backend and the network: the guest shows up in the host's lobby
/// and connects to its transport.
fn admit(host: &mut Client, lobby_id: LobbyId, guest: UserId, participant: u64) {
    host.social_mut().add_member(lobby_id, guest);
    host.transport_mut()
        .inject(TransportEvent::ClientConnected(participant));
}

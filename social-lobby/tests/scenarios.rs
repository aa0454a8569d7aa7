use std::time::{Duration, Instant};

use bytes::Bytes;

use social_lobby::binder::Vec3;
use social_lobby::config::Config;
use social_lobby::roster::Bucket;
use social_lobby::session::{EndReason, Role, SessionState};
use social_lobby::social::loopback::LoopbackSocial;
use social_lobby::social::{Identity, SocialEvent, Status};
use social_lobby::transport::control::ControlMessage;
use social_lobby::transport::loopback::{LoopbackTransport, HOST_PARTICIPANT};
use social_lobby::transport::{Target, Transport, TransportEvent};
use social_lobby::{ClientEvent, ErrorKind, LobbyClient};

type Client = LobbyClient<LoopbackSocial, LoopbackTransport>;

fn user(id: u64, status: Status) -> Identity {
    Identity::friend(id, &format!("user-{}", id), status)
}

fn client_with(mut social: LoopbackSocial, transport: LoopbackTransport) -> Client {
    social.connect();
    LobbyClient::new(Config::default(), social, transport).unwrap()
}

fn client(id: u64, participant: u64) -> Client {
    client_with(
        LoopbackSocial::new(user(id, Status::Online)),
        LoopbackTransport::new(participant),
    )
}

fn drain(client: &mut Client) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    client.poll_events(&mut events);
    events
}

fn frame(message: ControlMessage) -> Bytes {
    message.encode().unwrap()
}

fn message(from: u64, message: ControlMessage) -> TransportEvent {
    TransportEvent::Message {
        from,
        payload: frame(message),
    }
}

fn spawns_of(events: &[ClientEvent], participant: u64) -> usize {
    events
        .iter()
        .filter(|event| {
            matches!(event, ClientEvent::Spawned { participant: p, .. } if *p == participant)
        })
        .count()
}

#[test]
fn sole_creator_hosts_and_spawns_a_claimed_member_once() {
    let now = Instant::now();
    let mut host = client(1, 5);
    host.tick(now);

    let lobby_id = host.create_session(Some(4)).unwrap();
    assert_eq!(host.role(), Role::Host);
    assert_eq!(host.state(), SessionState::Active);
    assert_eq!(host.session().unwrap().member_count(), 1);

    host.tick(now);
    assert!(host.binder().is_spawned(HOST_PARTICIPANT));
    assert!(drain(&mut host)
        .iter()
        .any(|event| matches!(event, ClientEvent::TransportReady { role: Role::Host, .. })));

    host.social_mut().add_member(lobby_id, 42);
    host.transport_mut().inject(TransportEvent::ClientConnected(7));
    host.tick(now);
    assert_eq!(host.session().unwrap().member_count(), 2);
    assert_eq!(host.binder().identity_of(7), None);
    assert_eq!(host.binder().participant_of(42), None);

    host.transport_mut()
        .inject(message(7, ControlMessage::ClaimIdentity { identity: 42 }));
    host.transport_mut().inject(message(7, ControlMessage::RequestSpawn));
    host.transport_mut().inject(message(7, ControlMessage::RequestSpawn));
    host.tick(now);

    let events = drain(&mut host);
    assert_eq!(host.binder().identity_of(7), Some(42));
    assert_eq!(spawns_of(&events, 7), 1);
    assert_eq!(host.binder().spawned_count(), 2);
    assert_eq!(
        host.binder().representation(7).unwrap().position,
        Vec3::new(2.0, 0.0, 0.0)
    );
}

#[test]
fn claimer_receives_a_snapshot_of_earlier_state() {
    let now = Instant::now();
    let mut host = client(1, 5);
    host.tick(now);
    host.create_session(None).unwrap();
    host.tick(now);
    host.transport_mut().take_sent();

    host.transport_mut().inject(TransportEvent::ClientConnected(7));
    host.transport_mut()
        .inject(message(7, ControlMessage::ClaimIdentity { identity: 42 }));
    host.tick(now);

    let sent: Vec<(Target, ControlMessage)> = host
        .transport_mut()
        .take_sent()
        .into_iter()
        .map(|(target, payload)| (target, ControlMessage::decode(&payload).unwrap()))
        .collect();
    assert_eq!(
        sent,
        vec![
            (
                Target::Broadcast,
                ControlMessage::IdentityBound {
                    identity: 42,
                    participant: 7
                }
            ),
            (
                Target::Participant(7),
                ControlMessage::IdentityBound {
                    identity: 1,
                    participant: HOST_PARTICIPANT
                }
            ),
            (
                Target::Participant(7),
                ControlMessage::Spawned {
                    participant: HOST_PARTICIPANT,
                    identity: Some(1),
                    position: Vec3::ZERO
                }
            ),
        ]
    );
}

#[test]
fn lobby_deletion_cancels_pending_spawns() {
    let now = Instant::now();
    let mut host = client(1, 5);
    host.tick(now);
    let lobby_id = host.create_session(Some(4)).unwrap();
    host.tick(now);

    for participant in [7, 8] {
        host.transport_mut()
            .inject(TransportEvent::ClientConnected(participant));
        host.transport_mut()
            .inject(message(participant, ControlMessage::RequestSpawn));
    }
    host.tick(now);
    assert_eq!(host.binder().pending_count(), 2);
    drain(&mut host);

    host.social_mut().delete_lobby(lobby_id);
    host.tick(now);

    let events = drain(&mut host);
    assert!(events.contains(&ClientEvent::SpawnCancelled(7)));
    assert!(events.contains(&ClientEvent::SpawnCancelled(8)));
    assert!(events.contains(&ClientEvent::SessionEnded {
        session_id: lobby_id,
        reason: EndReason::Deleted,
    }));
    assert_eq!(host.state(), SessionState::Idle);
    assert_eq!(host.role(), Role::Unassigned);
    assert!(host.binder().bindings().is_empty());
    assert_eq!(host.binder().pending_count(), 0);
    assert!(!host.transport().is_running());
}

#[test]
fn leaving_twice_matches_leaving_once() {
    let now = Instant::now();
    let mut host = client(1, 5);
    host.tick(now);
    let lobby_id = host.create_session(None).unwrap();
    host.tick(now);
    drain(&mut host);

    host.leave_session().unwrap();
    host.leave_session().unwrap();
    host.tick(now);

    let ended = drain(&mut host)
        .into_iter()
        .filter(|event| matches!(event, ClientEvent::SessionEnded { .. }))
        .count();
    assert_eq!(ended, 1);
    assert_eq!(host.transport().shutdown_count(), 1);
    assert_eq!(host.state(), SessionState::Idle);
    assert_eq!(host.session_id(), None);
    assert!(host.social().lobby_secret(lobby_id).is_none());
}

#[test]
fn rejoining_a_lobby_just_left_ignores_the_old_deletion() {
    let now = Instant::now();
    let mut guest = client(2, 6);
    guest.tick(now);
    guest.social_mut().seed_lobby("shared", &[1]);

    let first = guest.join_session("shared").unwrap();
    guest.leave_session().unwrap();
    let second = guest.join_session("shared").unwrap();
    assert_eq!(first, second);

    guest.tick(now);
    assert_eq!(guest.state(), SessionState::Active);
    assert_eq!(guest.session_id(), Some(second));
    assert!(guest.transport().is_running());

    guest.social_mut().delete_lobby(second);
    guest.tick(now);
    assert_eq!(guest.state(), SessionState::Idle);
    assert!(drain(&mut guest).contains(&ClientEvent::SessionEnded {
        session_id: second,
        reason: EndReason::Deleted,
    }));
}

#[test]
fn readiness_timeout_tears_the_session_down() {
    let start = Instant::now();
    let mut host = client_with(
        LoopbackSocial::new(user(1, Status::Online)),
        LoopbackTransport::new(5).manual_connect(),
    );
    host.tick(start);
    host.create_session(None).unwrap();

    host.tick(start);
    host.tick(start + Duration::from_secs(4));
    assert_eq!(host.state(), SessionState::Active);

    host.tick(start + Duration::from_secs(5));
    let events = drain(&mut host);
    assert!(events.contains(&ClientEvent::SessionFailed(ErrorKind::Timeout(
        Duration::from_secs(5)
    ))));
    assert_eq!(host.state(), SessionState::Idle);
    assert!(!host.transport().is_running());
}

#[test]
fn transport_start_failure_returns_to_idle() {
    let now = Instant::now();
    let mut host = client(1, 5);
    host.tick(now);
    host.transport_mut().refuse_start(true);

    let err = host.create_session(None).unwrap_err();
    assert_eq!(*err, ErrorKind::TransportStart(Role::Host));
    assert_eq!(host.state(), SessionState::Idle);

    host.tick(now);
    assert_eq!(host.state(), SessionState::Idle);

    host.transport_mut().refuse_start(false);
    assert!(host.create_session(None).is_ok());
}

#[test]
fn host_and_client_converge() {
    let now = Instant::now();
    let mut host = client(1, 5);
    let mut guest = client(2, 5);
    host.tick(now);
    guest.tick(now);

    let lobby_id = host.create_session(None).unwrap();
    let secret = host.session().unwrap().secret.clone();
    guest.social_mut().seed_lobby(&secret, &[1]);
    guest.join_session(&secret).unwrap();
    assert_eq!(guest.role(), Role::Client);

    host.social_mut().add_member(lobby_id, 2);
    host.transport_mut()
        .inject(TransportEvent::ClientConnected(5));
    host.tick(now);
    guest.tick(now);

    guest.transport_mut().forward_to(host.transport_mut());
    host.tick(now);
    host.transport_mut().forward_to(guest.transport_mut());
    guest.tick(now);

    assert_eq!(host.binder().identity_of(5), Some(2));
    assert!(host.binder().is_spawned(5));
    assert_eq!(guest.binder().identity_of(HOST_PARTICIPANT), Some(1));
    assert_eq!(guest.binder().identity_of(5), Some(2));
    assert!(guest.binder().is_spawned(HOST_PARTICIPANT));
    assert_eq!(
        guest.binder().representation(5).unwrap().position,
        Vec3::new(2.0, 0.0, 0.0)
    );
    let guest_events = drain(&mut guest);
    assert_eq!(spawns_of(&guest_events, HOST_PARTICIPANT), 1);
    assert_eq!(spawns_of(&guest_events, 5), 1);

    guest.leave_session().unwrap();
    drain(&mut host);
    host.social_mut().remove_member(lobby_id, 2);
    host.transport_mut()
        .inject(TransportEvent::ClientDisconnected(5));
    host.tick(now);

    let events = drain(&mut host);
    let despawns = events
        .iter()
        .filter(|event| matches!(event, ClientEvent::Despawned { participant: 5, .. }))
        .count();
    assert_eq!(despawns, 1);
    assert!(!host.binder().is_spawned(5));
    assert_eq!(host.session().unwrap().member_count(), 1);
}

#[test]
fn invite_round_trip() {
    let now = Instant::now();
    let mut host = client(1, 5);
    host.tick(now);
    assert_eq!(*host.send_invite(2).unwrap_err(), ErrorKind::NoSession);

    host.create_session(None).unwrap();
    host.send_invite(2).unwrap();
    assert_eq!(
        host.social().sent_invites(),
        &[(2, "Join my lobby!".to_owned())]
    );
    let secret = host.session().unwrap().secret.clone();
    let presence = host.social().presence().unwrap();
    assert_eq!(presence.join_secret.as_deref(), Some(secret.as_str()));

    let mut guest = client(2, 6);
    guest.tick(now);
    guest.social_mut().seed_lobby(&secret, &[1]);
    guest.social_mut().receive_invite(1, &secret);
    guest.tick(now);
    assert!(drain(&mut guest)
        .iter()
        .any(|event| matches!(event, ClientEvent::InviteReceived(invite) if invite.sender_id == 1)));

    guest.accept_invite().unwrap();
    assert_eq!(guest.role(), Role::Client);
    assert_eq!(guest.session().unwrap().secret, secret);
    assert!(guest.pending_invite().is_none());
}

#[test]
fn accepting_an_invite_leaves_the_current_session() {
    let now = Instant::now();
    let mut player = client(2, 6);
    player.tick(now);
    let own_lobby = player.create_session(None).unwrap();

    player.social_mut().seed_lobby("other-secret", &[1]);
    player.social_mut().receive_invite(1, "other-secret");
    player.tick(now);
    let joined = player.accept_invite().unwrap();

    assert_ne!(joined, own_lobby);
    assert_eq!(player.role(), Role::Client);
    assert!(player.social().lobby_secret(own_lobby).is_none());
}

#[test]
fn roster_layout_is_coalesced_per_tick() {
    let now = Instant::now();
    let social = LoopbackSocial::new(user(100, Status::Online))
        .with_relationship(user(1, Status::Online))
        .with_relationship(user(2, Status::Offline))
        .with_relationship(user(3, Status::PlayingGame));
    let mut client = client_with(social, LoopbackTransport::new(5));
    client.tick(now);

    let layouts = |events: &[ClientEvent]| {
        events
            .iter()
            .filter(|event| matches!(event, ClientEvent::RosterLayout(_)))
            .count()
    };
    let events = drain(&mut client);
    assert_eq!(layouts(&events), 1);
    assert_eq!(client.partition().counts(), (1, 1, 1));

    client.social_mut().upsert_relationship(user(2, Status::Online));
    client.social_mut().upsert_relationship(user(1, Status::PlayingGame));
    client.social_mut().upsert_relationship(user(4, Status::Idle));
    client.tick(now);

    let events = drain(&mut client);
    assert_eq!(layouts(&events), 1);
    let partition = client.partition();
    assert_eq!(partition.ids(Bucket::InGame), vec![1, 3]);
    assert_eq!(partition.ids(Bucket::Online), vec![2, 4]);
    assert!(partition.ids(Bucket::Offline).is_empty());

    client.tick(now);
    assert_eq!(layouts(&drain(&mut client)), 0);
}

#[test]
fn external_subscribers_see_social_events() {
    let now = Instant::now();
    let mut client = client(1, 5);
    let ui = client.subscribe("ui");
    client.tick(now);
    client.social_mut().upsert_relationship(user(9, Status::Online));
    client.tick(now);

    let seen = ui.drain();
    assert!(seen.contains(&SocialEvent::RelationshipsUpdated(9)));
    assert!(client.roster().contains(9));
}

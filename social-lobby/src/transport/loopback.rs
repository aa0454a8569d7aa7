use std::collections::VecDeque;

use bytes::Bytes;
use log::{debug, warn};

use crate::transport::{ParticipantId, Target, Transport, TransportEvent};
use crate::{ErrorKind, Result};

/// Participant id a loopback host assigns to itself.
pub const HOST_PARTICIPANT: ParticipantId = 0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
    Host,
    Client,
}

/// In-memory transport. Outgoing frames are queued until forwarded to a peer
/// with [`LoopbackTransport::forward_to`] or inspected with
/// [`LoopbackTransport::take_sent`]; incoming events are injected by hand.
pub struct LoopbackTransport {
    client_participant: ParticipantId,
    mode: Option<Mode>,
    refuse_start: bool,
    auto_connect: bool,
    incoming: VecDeque<TransportEvent>,
    outgoing: Vec<(Target, Bytes)>,
    start_count: usize,
    shutdown_count: usize,
}

impl LoopbackTransport {
    /// `client_participant` is the id this endpoint gets when started as a client.
    pub fn new(client_participant: ParticipantId) -> Self {
        Self {
            client_participant,
            mode: None,
            refuse_start: false,
            auto_connect: true,
            incoming: VecDeque::new(),
            outgoing: Vec::new(),
            start_count: 0,
            shutdown_count: 0,
        }
    }

    /// Do not report the local connection on start, it has to be injected.
    pub fn manual_connect(mut self) -> Self {
        self.auto_connect = false;
        self
    }

    pub fn refuse_start(&mut self, refuse: bool) {
        self.refuse_start = refuse;
    }

    pub fn inject(&mut self, event: TransportEvent) {
        self.incoming.push_back(event);
    }

    pub fn sent(&self) -> &[(Target, Bytes)] {
        &self.outgoing
    }

    pub fn take_sent(&mut self) -> Vec<(Target, Bytes)> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn start_count(&self) -> usize {
        self.start_count
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdown_count
    }

    pub fn is_host(&self) -> bool {
        self.mode == Some(Mode::Host)
    }

    /// Move every queued frame addressed to `peer` into its incoming queue,
    /// attributed to this endpoint. Frames for anyone else stay queued.
    pub fn forward_to(&mut self, peer: &mut LoopbackTransport) -> usize {
        let from = match self.local_participant() {
            Some(from) => from,
            None => return 0,
        };
        let peer_id = match peer.local_participant() {
            Some(peer_id) => peer_id,
            None => return 0,
        };
        let mut forwarded = 0;
        let mut kept = Vec::new();
        for (target, payload) in self.outgoing.drain(..) {
            let addressed = match target {
                Target::Host => peer.is_host(),
                Target::Participant(id) => id == peer_id,
                Target::Broadcast => peer_id != from,
            };
            if addressed {
                peer.incoming
                    .push_back(TransportEvent::Message { from, payload });
                forwarded += 1;
            } else {
                kept.push((target, payload));
            }
        }
        self.outgoing = kept;
        forwarded
    }

    fn start(&mut self, mode: Mode) -> bool {
        if self.refuse_start {
            debug!("Loopback transport refusing to start as {:?}", mode);
            return false;
        }
        if let Some(current) = self.mode {
            warn!("Loopback transport already running as {:?}", current);
            return false;
        }
        self.mode = Some(mode);
        self.start_count += 1;
        if mode == Mode::Host {
            self.incoming.push_back(TransportEvent::ServerStarted);
        }
        if self.auto_connect {
            if let Some(local) = self.local_participant() {
                self.incoming
                    .push_back(TransportEvent::ClientConnected(local));
            }
        }
        true
    }
}

impl Transport for LoopbackTransport {
    fn start_host(&mut self) -> bool {
        self.start(Mode::Host)
    }

    fn start_client(&mut self) -> bool {
        self.start(Mode::Client)
    }

    fn shutdown(&mut self) {
        if self.mode.take().is_some() {
            self.shutdown_count += 1;
            self.incoming.clear();
            self.outgoing.clear();
        }
    }

    fn is_running(&self) -> bool {
        self.mode.is_some()
    }

    fn local_participant(&self) -> Option<ParticipantId> {
        match self.mode? {
            Mode::Host => Some(HOST_PARTICIPANT),
            Mode::Client => Some(self.client_participant),
        }
    }

    fn host_participant(&self) -> Option<ParticipantId> {
        self.mode.map(|_| HOST_PARTICIPANT)
    }

    fn send(&mut self, target: Target, payload: Bytes) -> Result<()> {
        if self.mode.is_none() {
            return Err(Box::new(ErrorKind::Send(format!(
                "transport not running, dropping frame for {:?}",
                target
            ))));
        }
        self.outgoing.push((target, payload));
        Ok(())
    }

    fn poll_events(&mut self, events: &mut Vec<TransportEvent>) {
        events.extend(self.incoming.drain(..));
    }
}

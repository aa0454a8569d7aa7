//! Boundary to the peer-to-peer transport.
//!
//! The transport itself (signaling, relay, wire format) is provided from
//! outside; this crate only needs to start it in one of two roles, shut it
//! down, exchange opaque payloads and hear about participants coming and going.

use bytes::Bytes;

use crate::Result;

pub mod control;
pub mod loopback;

/// Transport-level id of a live connection endpoint.
pub type ParticipantId = u64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    Host,
    Participant(ParticipantId),
    /// Every remote participant
    Broadcast,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    ServerStarted,
    ClientConnected(ParticipantId),
    ClientDisconnected(ParticipantId),
    /// Payload whose sender is attested by the transport.
    Message {
        from: ParticipantId,
        payload: Bytes,
    },
}

pub trait Transport {
    fn start_host(&mut self) -> bool;

    fn start_client(&mut self) -> bool;

    /// Stop the transport. Calling it on a stopped transport does nothing.
    fn shutdown(&mut self);

    fn is_running(&self) -> bool;

    /// Id of the local endpoint once the transport has assigned one.
    fn local_participant(&self) -> Option<ParticipantId>;

    /// Id behind [`Target::Host`] while running. Only frames attested from
    /// it may carry host announcements.
    fn host_participant(&self) -> Option<ParticipantId>;

    fn send(&mut self, target: Target, payload: Bytes) -> Result<()>;

    /// Append every event received since the last call.
    fn poll_events(&mut self, events: &mut Vec<TransportEvent>);
}

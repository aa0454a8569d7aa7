use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::binder::Vec3;
use crate::social::UserId;
use crate::transport::ParticipantId;
use crate::{ErrorKind, Result};

/// Leading byte of every control frame.
pub const CONTROL_VERSION: u8 = 1;

/// Session bookkeeping exchanged between host and clients on top of the
/// transport. The participant a message is about is always the attested
/// sender unless the message is a host announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Client → host: the sending participant is this social identity.
    ClaimIdentity { identity: UserId },
    /// Client → host: materialize a representation for the sender.
    RequestSpawn,
    /// Host → clients
    IdentityBound {
        identity: UserId,
        participant: ParticipantId,
    },
    /// Host → clients
    Spawned {
        participant: ParticipantId,
        identity: Option<UserId>,
        position: Vec3,
    },
    /// Host → clients
    Despawned { participant: ParticipantId },
}

impl ControlMessage {
    pub fn name(&self) -> &'static str {
        match self {
            ControlMessage::ClaimIdentity { .. } => "ClaimIdentity",
            ControlMessage::RequestSpawn => "RequestSpawn",
            ControlMessage::IdentityBound { .. } => "IdentityBound",
            ControlMessage::Spawned { .. } => "Spawned",
            ControlMessage::Despawned { .. } => "Despawned",
        }
    }

    /// Only the host may send these.
    pub fn is_host_announcement(&self) -> bool {
        matches!(
            self,
            ControlMessage::IdentityBound { .. }
                | ControlMessage::Spawned { .. }
                | ControlMessage::Despawned { .. }
        )
    }

    pub fn encode(&self) -> Result<Bytes> {
        let body = bincode::serialize(self).map_err(|err| {
            Box::new(ErrorKind::Serialize(format!(
                "Could not serialize control message {}: {:?}",
                self.name(),
                err
            )))
        })?;
        let mut frame = BytesMut::with_capacity(1 + body.len());
        frame.put_u8(CONTROL_VERSION);
        frame.put_slice(&body);
        Ok(frame.freeze())
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        match frame.split_first() {
            Some((&CONTROL_VERSION, body)) => bincode::deserialize(body).map_err(|err| {
                Box::new(ErrorKind::Deserialize(format!(
                    "Could not deserialize control message: {:?}",
                    err
                )))
            }),
            Some((version, _)) => Err(Box::new(ErrorKind::Deserialize(format!(
                "Unsupported control version {}",
                version
            )))),
            None => Err(Box::new(ErrorKind::Deserialize(
                "Empty control frame".to_owned(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::binder::Vec3;
    use crate::transport::control::{ControlMessage, CONTROL_VERSION};
    use crate::ErrorKind;

    #[test]
    fn frame_starts_with_version() {
        let frame = ControlMessage::RequestSpawn.encode().unwrap();
        assert_eq!(frame[0], CONTROL_VERSION);

        let spawned = ControlMessage::Spawned {
            participant: 3,
            identity: Some(42),
            position: Vec3::new(4.0, 0.0, 0.0),
        };
        let frame = spawned.encode().unwrap();
        assert_eq!(ControlMessage::decode(&frame).unwrap(), spawned);
    }

    #[test]
    fn rejects_unknown_version_and_garbage() {
        let mut frame = ControlMessage::ClaimIdentity { identity: 42 }
            .encode()
            .unwrap()
            .to_vec();
        frame[0] = CONTROL_VERSION + 1;
        assert!(matches!(
            *ControlMessage::decode(&frame).unwrap_err(),
            ErrorKind::Deserialize(_)
        ));

        assert!(ControlMessage::decode(&[]).is_err());
        assert!(ControlMessage::decode(&[CONTROL_VERSION, 0xff, 0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn host_announcements() {
        assert!(ControlMessage::Despawned { participant: 1 }.is_host_announcement());
        assert!(!ControlMessage::RequestSpawn.is_host_announcement());
        assert!(!ControlMessage::ClaimIdentity { identity: 1 }.is_host_announcement());
    }
}

use crossbeam_channel::Sender;
use log::{info, warn};
use social_lobby::social::ActivityInvite;
use social_lobby::ClientEvent;

use crate::application::Action;
use crate::ui::screens::Screen;
use crate::ui::View;

/// Shows the current lobby and answers invites on the player's behalf.
pub struct LobbyScreen {
    invite: Option<ActivityInvite>,
    accept_invites: bool,
}

impl LobbyScreen {
    pub fn new(accept_invites: bool) -> Self {
        Self {
            invite: None,
            accept_invites,
        }
    }

    fn update(&mut self, events: &[ClientEvent]) -> bool {
        let mut changed = false;
        for event in events {
            match event {
                ClientEvent::InviteReceived(invite) => self.invite = Some(invite.clone()),
                ClientEvent::SessionActive { .. }
                | ClientEvent::SessionEnded { .. }
                | ClientEvent::MemberJoined { .. }
                | ClientEvent::MemberLeft { .. }
                | ClientEvent::Spawned { .. }
                | ClientEvent::Despawned { .. } => changed = true,
                _ => {}
            }
        }
        changed
    }
}

impl Screen for LobbyScreen {
    fn draw(&mut self, view: &View, events: &[ClientEvent], action_sender: &Sender<Action>) {
        let changed = self.update(events);

        if let Some(invite) = self.invite.take() {
            info!("[lobby] Invite from {}", invite.sender_id);
            let action = if self.accept_invites {
                Action::AcceptInvite
            } else {
                Action::DeclineInvite
            };
            if action_sender.send(action).is_err() {
                warn!("[lobby] Application stopped listening to actions");
            }
        }

        if !changed {
            return;
        }
        match &view.session {
            Some(session) => {
                info!(
                    "[lobby] Lobby {} as {:?}, {}/{} members",
                    session.id,
                    view.role,
                    session.member_count(),
                    session.capacity
                );
                for representation in &view.representations {
                    let position = representation.position;
                    info!(
                        "[lobby]   participant {} ({}) at ({:.1}, {:.1}, {:.1})",
                        representation.participant,
                        representation
                            .identity
                            .map_or_else(|| "unclaimed".to_owned(), |id| id.to_string()),
                        position.x,
                        position.y,
                        position.z
                    );
                }
            }
            None => info!("[lobby] Not in a lobby"),
        }
    }
}

use crossbeam_channel::Sender;
use social_lobby::ClientEvent;

use crate::application::Action;
use crate::ui::View;

pub mod events_screen;
pub mod friend_list_screen;
pub mod lobby_screen;

/// Text screens render into the log; user input comes back as [`Action`]s.
pub trait Screen {
    fn draw(&mut self, view: &View, events: &[ClientEvent], action_sender: &Sender<Action>);
}

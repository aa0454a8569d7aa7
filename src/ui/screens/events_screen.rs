use crossbeam_channel::Sender;
use log::debug;
use social_lobby::ClientEvent;

use crate::application::Action;
use crate::ui::screens::Screen;
use crate::ui::View;

const MAX_HISTORY_SIZE: usize = 500;

pub struct EventScreen {
    event_history: Vec<ClientEvent>,
}

impl EventScreen {
    pub fn new() -> Self {
        Self {
            event_history: Vec::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    fn update_history(&mut self, new_events: &[ClientEvent]) {
        if self.event_history.len() + new_events.len() > MAX_HISTORY_SIZE {
            let overflow = self.event_history.len() + new_events.len() - MAX_HISTORY_SIZE;
            let drain_count = overflow.min(self.event_history.len());
            self.event_history.drain(0..drain_count);
        }
        self.event_history.extend_from_slice(new_events);
    }
}

impl Screen for EventScreen {
    fn draw(&mut self, view: &View, events: &[ClientEvent], _action_sender: &Sender<Action>) {
        for event in events {
            debug!("[events #{}] {:?}", view.frame, event);
        }
        self.update_history(events);
    }
}

#[cfg(test)]
mod tests {
    use social_lobby::ClientEvent;

    use crate::ui::screens::events_screen::{EventScreen, MAX_HISTORY_SIZE};

    #[test]
    fn history_is_bounded() {
        let mut screen = EventScreen::new();
        let batch = vec![ClientEvent::InviteSent(1); 300];
        screen.update_history(&batch);
        screen.update_history(&batch);
        assert_eq!(screen.event_history.len(), MAX_HISTORY_SIZE);
    }
}

use crossbeam_channel::Sender;
use social_lobby::binder::Representation;
use social_lobby::roster::Partition;
use social_lobby::session::{Role, Session};
use social_lobby::ClientEvent;

use crate::application::Action;
use crate::ui::screens::Screen;

pub mod screens;

/// What the screens get to look at each frame.
pub struct View {
    pub frame: u64,
    pub role: Role,
    pub session: Option<Session>,
    pub representations: Vec<Representation>,
    pub partition: Partition,
}

pub struct Ui {
    action_sender: Sender<Action>,
    screens: Vec<Box<dyn Screen>>,
}

impl Ui {
    pub fn new(action_sender: Sender<Action>) -> Self {
        Self {
            action_sender,
            screens: Vec::new(),
        }
    }

    pub fn add_screen(&mut self, screen: Box<dyn Screen>) {
        self.screens.push(screen);
    }

    pub fn draw(&mut self, view: &View, events: &[ClientEvent]) {
        for screen in self.screens.iter_mut() {
            screen.draw(view, events, &self.action_sender);
        }
    }
}

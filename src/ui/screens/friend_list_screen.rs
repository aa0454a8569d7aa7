use crossbeam_channel::Sender;
use log::info;
use social_lobby::roster::{Bucket, Partition};
use social_lobby::social::Identity;
use social_lobby::ClientEvent;

use crate::application::Action;
use crate::ui::screens::Screen;
use crate::ui::View;

const SECTIONS: [(Bucket, &str); 3] = [
    (Bucket::InGame, "In game"),
    (Bucket::Online, "Online"),
    (Bucket::Offline, "Offline"),
];

pub struct FriendListScreen {
    lines: Vec<String>,
}

impl FriendListScreen {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn layout(&mut self, partition: &Partition) {
        self.lines = SECTIONS
            .iter()
            .map(|&(bucket, title)| {
                let names: Vec<&str> = partition
                    .bucket(bucket)
                    .iter()
                    .map(|identity: &Identity| identity.display_name.as_str())
                    .collect();
                format!("{} ({}): {}", title, names.len(), names.join(", "))
            })
            .collect();
    }
}

impl Screen for FriendListScreen {
    fn draw(&mut self, view: &View, events: &[ClientEvent], _action_sender: &Sender<Action>) {
        let relayout = events
            .iter()
            .any(|event| matches!(event, ClientEvent::RosterLayout(_)));
        if !relayout {
            return;
        }
        self.layout(&view.partition);
        info!("[friends] frame {}", view.frame);
        for line in &self.lines {
            info!("[friends]   {}", line);
        }
    }
}

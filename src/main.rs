use std::process;

use log::error;
use social_lobby::config::Config;

use crate::application::Application;

mod application;
mod time;
mod ui;

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match Config::load(&path) {
            Ok(config) => config,
            Err(err) => {
                error!("Could not load config from {}: {}", path, err);
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    match Application::new(config) {
        Ok(app) => app.run(),
        Err(err) => {
            error!("Could not start: {}", err);
            process::exit(1);
        }
    }
}

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::binder::SpawnPlacement;
use crate::{ErrorKind, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub idle_state: String,
    pub idle_details: String,
    pub lobby_state: String,
    pub lobby_details: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            idle_state: "In Menus".to_owned(),
            idle_details: "Browsing friends".to_owned(),
            lobby_state: "In Lobby".to_owned(),
            lobby_details: "Waiting for players".to_owned(),
        }
    }
}

/// Client settings, read from RON. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capacity of sessions this client creates
    pub max_lobby_size: u32,
    /// How long a freshly formed session may wait for the transport
    pub ready_timeout_ms: u64,
    pub ready_poll_interval_ms: u64,
    pub invite_message: String,
    pub spawn: SpawnPlacement,
    pub presence: PresenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_lobby_size: 4,
            ready_timeout_ms: 5_000,
            ready_poll_interval_ms: 100,
            invite_message: "Join my lobby!".to_owned(),
            spawn: SpawnPlacement::default(),
            presence: PresenceConfig::default(),
        }
    }
}

impl Config {
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: Config = ron::from_str(source)
            .map_err(|err| Box::new(ErrorKind::Config(format!("Invalid RON: {}", err))))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| {
            Box::new(ErrorKind::Config(format!(
                "Could not read {}: {}",
                path.display(),
                err
            )))
        })?;
        Self::from_ron(&source)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(Box::new(ErrorKind::InvalidConfig(reason.to_owned())));
        if self.max_lobby_size == 0 {
            return invalid("max_lobby_size must be at least 1");
        }
        if self.ready_poll_interval_ms == 0 {
            return invalid("ready_poll_interval_ms must be positive");
        }
        if self.ready_poll_interval_ms > self.ready_timeout_ms {
            return invalid("ready_poll_interval_ms must not exceed ready_timeout_ms");
        }
        if !self.spawn.offset.is_finite() || self.spawn.offset < 0.0 {
            return invalid("spawn.offset must be a finite, non-negative number");
        }
        Ok(())
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}

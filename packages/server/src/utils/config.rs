use once_cell::sync::Lazy;
use std::env;

use crate::models::notice::Channel;

pub static CONFIG: Lazy<Config> = Lazy::new(Config::new);

#[derive(Debug, Clone)]
pub struct ChannelNames {
    pub phase: String,
    pub faction: String,
}

impl ChannelNames {
    pub fn name(&self, channel: Channel) -> &str {
        match channel {
            Channel::Phase => &self.phase,
            Channel::Faction => &self.faction,
        }
    }
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            phase: "town-square".to_string(),
            faction: "mafia-den".to_string(),
        }
    }
}

pub struct Config {
    pub server_addr: String,
    pub allowed_origin: String,
    pub log_level: String,
    pub channels: ChannelNames,
}

impl Config {
    fn new() -> Self {
        let defaults = ChannelNames::default();
        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            allowed_origin: env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            channels: ChannelNames {
                phase: env::var("PHASE_CHANNEL").unwrap_or(defaults.phase),
                faction: env::var("FACTION_CHANNEL").unwrap_or(defaults.faction),
            },
        }
    }
}

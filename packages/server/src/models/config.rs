use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub intro_seconds: u64,
    pub night_seconds: u64,
    pub discussion_seconds: u64,
    pub trial_decision_seconds: u64,
    pub trial_statement_seconds: u64,
    pub vote_seconds: u64,
    // ゲーム開始に必要な最少人数。マフィアの人数計算にも使う
    pub min_players: usize,
    pub max_players: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            intro_seconds: 30,
            night_seconds: 60,
            discussion_seconds: 120,
            trial_decision_seconds: 60,
            trial_statement_seconds: 30,
            vote_seconds: 30,
            min_players: 6,
            max_players: 16,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            intro_seconds: env_or("INTRO_SECONDS", defaults.intro_seconds),
            night_seconds: env_or("NIGHT_SECONDS", defaults.night_seconds),
            discussion_seconds: env_or("DISCUSSION_SECONDS", defaults.discussion_seconds),
            trial_decision_seconds: env_or(
                "TRIAL_DECISION_SECONDS",
                defaults.trial_decision_seconds,
            ),
            trial_statement_seconds: env_or(
                "TRIAL_STATEMENT_SECONDS",
                defaults.trial_statement_seconds,
            ),
            vote_seconds: env_or("VOTE_SECONDS", defaults.vote_seconds),
            min_players: env_or("MIN_PLAYERS", defaults.min_players),
            max_players: env_or("MAX_PLAYERS", defaults.max_players),
        }
    }

    pub fn intro(&self) -> Duration {
        Duration::from_secs(self.intro_seconds)
    }

    pub fn night(&self) -> Duration {
        Duration::from_secs(self.night_seconds)
    }

    pub fn discussion(&self) -> Duration {
        Duration::from_secs(self.discussion_seconds)
    }

    pub fn trial_decision(&self) -> Duration {
        Duration::from_secs(self.trial_decision_seconds)
    }

    pub fn trial_statement(&self) -> Duration {
        Duration::from_secs(self.trial_statement_seconds)
    }

    pub fn vote(&self) -> Duration {
        Duration::from_secs(self.vote_seconds)
    }
}

use dotenvy::dotenv;
use std::sync::{Mutex, Once};

use crate::models::{
    notice::{Channel, Notice, SpeakerGroup},
    player::{Participant, Player, PlayerId},
    role::Role,
};
use crate::services::gateway::{Gateway, GatewayError};

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        // テスト中はフェーズ進行のログだけ見えれば十分
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// 配送された通知をそのまま記録するゲートウェイ。`failing`なら全て失敗させる。
#[derive(Default)]
pub struct RecordingGateway {
    delivered: Mutex<Vec<Notice>>,
    failing: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn record(&self, notice: Notice) -> Result<(), GatewayError> {
        if self.failing {
            return Err(GatewayError::Delivery("gateway offline".to_string()));
        }
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(notice);
        }
        Ok(())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.notices()
            .iter()
            .filter_map(|n| n.text().map(str::to_string))
            .collect()
    }

    pub fn private_to(&self, player: PlayerId) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Private { player: p, text } if p == player => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }
}

impl Gateway for RecordingGateway {
    fn send(&self, channel: Channel, text: &str) -> Result<(), GatewayError> {
        self.record(Notice::Broadcast {
            channel,
            text: text.to_string(),
        })
    }

    fn send_private(&self, player: PlayerId, text: &str) -> Result<(), GatewayError> {
        self.record(Notice::private(player, text))
    }

    fn set_can_speak(
        &self,
        channel: Channel,
        group: SpeakerGroup,
        allowed: bool,
    ) -> Result<(), GatewayError> {
        self.record(Notice::speak(channel, group, allowed))
    }
}

pub fn participants(n: usize) -> Vec<Participant> {
    (0..n)
        .map(|i| Participant::new(format!("user-{}", i), format!("Player{}", i)))
        .collect()
}

/// 役職を固定したロスター。ユーザーIDは`user-{id}`、名前は`Player{id}`。
pub fn fixed_roster(roles: &[Role]) -> Vec<Player> {
    roles
        .iter()
        .enumerate()
        .map(|(id, role)| Player::new(id, format!("user-{}", id), format!("Player{}", id), *role))
        .collect()
}

/// 0,1 Mafia / 2 Detective / 3 Healer / 4..6 Townsperson
pub fn seven_player_roster() -> Vec<Player> {
    fixed_roster(&[
        Role::Mafia,
        Role::Mafia,
        Role::Detective,
        Role::Healer,
        Role::Townsperson,
        Role::Townsperson,
        Role::Townsperson,
    ])
}

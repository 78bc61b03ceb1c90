use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// エンジンが使う論理チャンネル。実際の送信先への対応付けは外部で行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Phase,
    Faction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerGroup {
    Everyone,
    Living,
    Mafia,
    Player(PlayerId),
}

/// 状態変更の結果として外部に送る副作用。ロックの外で配送する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    Broadcast {
        channel: Channel,
        text: String,
    },
    Private {
        player: PlayerId,
        text: String,
    },
    Permission {
        channel: Channel,
        group: SpeakerGroup,
        allowed: bool,
    },
}

impl Notice {
    pub fn public(text: impl Into<String>) -> Self {
        Notice::Broadcast {
            channel: Channel::Phase,
            text: text.into(),
        }
    }

    pub fn faction(text: impl Into<String>) -> Self {
        Notice::Broadcast {
            channel: Channel::Faction,
            text: text.into(),
        }
    }

    pub fn private(player: PlayerId, text: impl Into<String>) -> Self {
        Notice::Private {
            player,
            text: text.into(),
        }
    }

    pub fn speak(channel: Channel, group: SpeakerGroup, allowed: bool) -> Self {
        Notice::Permission {
            channel,
            group,
            allowed,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Notice::Broadcast { text, .. } | Notice::Private { text, .. } => Some(text),
            Notice::Permission { .. } => None,
        }
    }
}

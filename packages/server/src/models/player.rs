use serde::{Deserialize, Serialize};

use super::role::Role;

/// ロスター上のインデックス。ユーザーに表示される公開ID。
pub type PlayerId = usize;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub is_dead: bool,
}

impl Player {
    pub fn new(id: PlayerId, user_id: String, name: String, role: Role) -> Self {
        Self {
            id,
            user_id,
            name,
            role,
            is_dead: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }
}

/// ロスター作成前の参加者
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub name: String,
}

impl Participant {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
        }
    }
}

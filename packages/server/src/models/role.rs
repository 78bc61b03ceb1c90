use serde::{Deserialize, Serialize};
use std::fmt;

use super::player::Player;
use crate::models::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Mafia,
    Healer,
    Detective,
    Townsperson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    Town,
    Mafia,
}

/// 夜に使える能力。役職ごとに高々1つ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NightAbility {
    Kill,
    Heal,
    Investigate,
}

impl Role {
    pub fn faction(&self) -> Faction {
        match self {
            Role::Mafia => Faction::Mafia,
            _ => Faction::Town,
        }
    }

    pub fn is_mafia(&self) -> bool {
        self.faction() == Faction::Mafia
    }

    pub fn night_ability(&self) -> Option<NightAbility> {
        match self {
            Role::Mafia => Some(NightAbility::Kill),
            Role::Healer => Some(NightAbility::Heal),
            Role::Detective => Some(NightAbility::Investigate),
            Role::Townsperson => None,
        }
    }

    /// 死亡発表で使う表記
    pub fn reveal_name(&self) -> &'static str {
        match self {
            Role::Mafia => "member of the Mafia",
            Role::Healer => "healer",
            Role::Detective => "detective",
            Role::Townsperson => "townsperson",
        }
    }

    pub fn briefing(&self) -> &'static str {
        match self {
            Role::Mafia => {
                "You are a member of the **Mafia**. Each night you may choose one player to kill. \
                 Eliminate the town without getting caught."
            }
            Role::Healer => {
                "You are the **Healer**. Each night you may protect one player from being killed."
            }
            Role::Detective => {
                "You are the **Detective**. Each night you may investigate one player and \
                 receive a hint about their role."
            }
            Role::Townsperson => {
                "You are a **Townsperson**. You have no night ability; find the Mafia during the day."
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Mafia => write!(f, "Mafia"),
            Role::Healer => write!(f, "Healer"),
            Role::Detective => write!(f, "Detective"),
            Role::Townsperson => write!(f, "Townsperson"),
        }
    }
}

impl NightAbility {
    pub fn verb(&self) -> &'static str {
        match self {
            NightAbility::Kill => "kill",
            NightAbility::Heal => "heal",
            NightAbility::Investigate => "investigate",
        }
    }

    /// 対象の妥当性チェック。生存確認は呼び出し側で済ませている前提。
    pub fn check_target(&self, actor: &Player, target: &Player) -> Result<(), CommandError> {
        match self {
            NightAbility::Kill if target.role.is_mafia() => Err(CommandError::FriendlyFire),
            NightAbility::Investigate if actor.id == target.id => {
                Err(CommandError::SelfInvestigation)
            }
            _ => Ok(()),
        }
    }

    pub fn can_target(&self, actor: &Player, target: &Player) -> bool {
        !target.is_dead && self.check_target(actor, target).is_ok()
    }
}

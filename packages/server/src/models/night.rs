use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::player::{Player, PlayerId};
use super::role::{NightAbility, Role};

/// 夜のアクション記録。アクターごとに最新の1件だけを保持する。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NightActions {
    pub kills: BTreeMap<PlayerId, PlayerId>,
    pub heals: BTreeMap<PlayerId, PlayerId>,
    pub investigations: BTreeMap<PlayerId, PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Investigation {
    pub detective: PlayerId,
    pub subject: PlayerId,
    /// "Mafia or <hint>" の <hint> 部分。対象がマフィアでなければ真の役職。
    pub hint: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DawnReport {
    pub deaths: Vec<PlayerId>,
    pub saves: Vec<PlayerId>,
    pub investigations: Vec<Investigation>,
}

impl NightActions {
    fn ledger(&self, ability: NightAbility) -> &BTreeMap<PlayerId, PlayerId> {
        match ability {
            NightAbility::Kill => &self.kills,
            NightAbility::Heal => &self.heals,
            NightAbility::Investigate => &self.investigations,
        }
    }

    fn ledger_mut(&mut self, ability: NightAbility) -> &mut BTreeMap<PlayerId, PlayerId> {
        match ability {
            NightAbility::Kill => &mut self.kills,
            NightAbility::Heal => &mut self.heals,
            NightAbility::Investigate => &mut self.investigations,
        }
    }

    /// Records `actor`'s choice, replacing any earlier one. Returns the replaced target.
    pub fn submit(
        &mut self,
        ability: NightAbility,
        actor: PlayerId,
        target: PlayerId,
    ) -> Option<PlayerId> {
        self.ledger_mut(ability).insert(actor, target)
    }

    pub fn cancel(&mut self, ability: NightAbility, actor: PlayerId) -> Option<PlayerId> {
        self.ledger_mut(ability).remove(&actor)
    }

    pub fn entry(&self, ability: NightAbility, actor: PlayerId) -> Option<PlayerId> {
        self.ledger(ability).get(&actor).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.kills.is_empty() && self.heals.is_empty() && self.investigations.is_empty()
    }

    pub fn clear(&mut self) {
        *self = NightActions::default();
    }

    /// 夜明けの解決。`players`は夜の間の状態(まだ誰も死んでいない)を渡す。
    ///
    /// Each kill is resolved on its own: several Mafia members choosing different
    /// victims can produce several deaths. A victim chosen twice dies (or is saved) once.
    pub fn resolve<R: Rng + ?Sized>(&self, players: &[Player], rng: &mut R) -> DawnReport {
        let healed: BTreeSet<PlayerId> = self.heals.values().copied().collect();
        let mut seen = BTreeSet::new();
        let mut report = DawnReport::default();

        for &victim in self.kills.values() {
            if !seen.insert(victim) {
                continue;
            }
            let alive = players.get(victim).map(Player::is_alive).unwrap_or(false);
            if !alive {
                continue;
            }
            if healed.contains(&victim) {
                report.saves.push(victim);
            } else {
                report.deaths.push(victim);
            }
        }

        for (&detective, &subject) in &self.investigations {
            let Some(target) = players.get(subject) else {
                continue;
            };
            let hint = if target.role.is_mafia() {
                decoy_role(players, detective, rng)
            } else {
                target.role
            };
            report.investigations.push(Investigation {
                detective,
                subject,
                hint,
            });
        }

        report
    }
}

/// マフィアを調べた探偵に見せる偽の候補役職。
/// 調査者以外の生存市民 → 調査者を含む生存市民 → 市民、の順に候補を広げる。
fn decoy_role<R: Rng + ?Sized>(players: &[Player], detective: PlayerId, rng: &mut R) -> Role {
    let others: Vec<&Player> = players
        .iter()
        .filter(|p| p.is_alive() && !p.role.is_mafia() && p.id != detective)
        .collect();
    if let Some(p) = others.choose(rng) {
        return p.role;
    }
    players
        .iter()
        .filter(|p| p.is_alive() && !p.role.is_mafia())
        .collect::<Vec<_>>()
        .choose(rng)
        .map(|p| p.role)
        .unwrap_or(Role::Townsperson)
}

use serde::{Deserialize, Serialize};

use super::error::PhaseError;
use super::night::NightActions;
use super::notice::Channel;
use super::player::{Player, PlayerId};
use super::role::Role;
use super::trial::{Nominations, Trial};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Game {
    pub room_id: String,
    /// 並び順は固定。インデックスが公開ID。
    pub players: Vec<Player>,
    /// 死亡順
    pub dead: Vec<PlayerId>,
    pub phase: GamePhase,
    pub day: u32,
    pub result: GameResult,
    pub night_actions: NightActions,
    pub nominations: Nominations,
    pub trial: Option<Trial>,
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Game {{ room_id: {}, players: {}, alive: {}, phase: {:?}, day: {}, result: {:?} }}",
            self.room_id,
            self.players.len(),
            self.living().count(),
            self.phase,
            self.day,
            self.result
        )
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GamePhase {
    Initializing,
    DayIntro,
    Night,
    DayAnnouncements,
    DayDiscussion,
    DayTrialDecision,
    DayTrialStatement,
    DayVote,
    Finished,
}

impl GamePhase {
    /// 許可される遷移。夜→昼のループ以外は後戻りしない。
    pub fn can_advance_to(&self, next: GamePhase) -> bool {
        use GamePhase::*;
        matches!(
            (self, next),
            (Initializing, DayIntro)
                | (DayIntro, Night)
                | (Night, DayAnnouncements)
                | (Night, Finished)
                | (DayAnnouncements, DayDiscussion)
                | (DayDiscussion, DayTrialDecision)
                | (DayTrialDecision, DayTrialStatement)
                | (DayTrialDecision, Night)
                | (DayTrialStatement, DayVote)
                | (DayVote, Night)
                | (DayVote, Finished)
        )
    }

    pub fn is_day(&self) -> bool {
        matches!(
            self,
            GamePhase::DayIntro
                | GamePhase::DayAnnouncements
                | GamePhase::DayDiscussion
                | GamePhase::DayTrialDecision
                | GamePhase::DayTrialStatement
                | GamePhase::DayVote
        )
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameResult {
    InProgress,
    TownWin,
    MafiaWin,
}

impl Game {
    pub fn new(room_id: String, players: Vec<Player>) -> Self {
        Game {
            room_id,
            players,
            dead: Vec::new(),
            phase: GamePhase::Initializing,
            day: 1,
            result: GameResult::InProgress,
            night_actions: NightActions::default(),
            nominations: Nominations::default(),
            trial: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::Finished
    }

    pub fn advance_phase(&mut self, next: GamePhase) -> Result<(), PhaseError> {
        if !self.phase.can_advance_to(next) {
            return Err(PhaseError::IllegalTransition {
                from: self.phase,
                to: next,
            });
        }
        log::info!("[{}] phase {:?} -> {:?}", self.room_id, self.phase, next);
        self.phase = next;
        Ok(())
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn find_by_user(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn living(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive())
    }

    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.player(id).map(Player::is_alive).unwrap_or(false)
    }

    pub fn mafia(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.role.is_mafia())
    }

    /// 生存→死亡は一度きり。既に死んでいれば何もしない。
    pub fn kill(&mut self, id: PlayerId) -> bool {
        match self.players.get_mut(id) {
            Some(player) if player.is_alive() => {
                player.is_dead = true;
                self.dead.push(id);
                log::info!(
                    "[{}] player {} ({}) died",
                    self.room_id,
                    id,
                    player.role
                );
                true
            }
            _ => false,
        }
    }

    /// 発言権。フェーズ遷移で配る Permission 通知と同じ規則で判定する。
    pub fn can_speak(&self, id: PlayerId, channel: Channel) -> bool {
        let Some(player) = self.player(id) else {
            return false;
        };
        match channel {
            Channel::Phase => match self.phase {
                GamePhase::Finished => true,
                _ if player.is_dead => false,
                GamePhase::Night | GamePhase::DayAnnouncements => false,
                GamePhase::DayTrialStatement => {
                    self.trial.as_ref().map(|t| t.accused) == Some(id)
                }
                _ => true,
            },
            Channel::Faction => {
                player.is_alive() && player.role.is_mafia() && self.phase == GamePhase::Night
            }
        }
    }

    pub fn public_view(&self) -> GameView {
        let reveal_all = self.is_finished();
        GameView {
            room_id: self.room_id.clone(),
            phase: self.phase,
            day: self.day,
            result: self.result,
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    id: p.id,
                    name: p.name.clone(),
                    is_dead: p.is_dead,
                    role: (reveal_all || p.is_dead).then_some(p.role),
                })
                .collect(),
            dead: self.dead.clone(),
            accused: self.trial.as_ref().map(|t| t.accused),
        }
    }
}

/// 役職を伏せた公開用の状態
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GameView {
    pub room_id: String,
    pub phase: GamePhase,
    pub day: u32,
    pub result: GameResult,
    pub players: Vec<PlayerView>,
    pub dead: Vec<PlayerId>,
    pub accused: Option<PlayerId>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub is_dead: bool,
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> Game {
        let players = [Role::Mafia, Role::Townsperson, Role::Healer]
            .into_iter()
            .enumerate()
            .map(|(i, r)| Player::new(i, format!("u{}", i), format!("P{}", i), r))
            .collect();
        Game::new("room".to_string(), players)
    }

    #[test]
    fn phases_only_move_along_the_table() {
        let mut g = game();
        assert!(g.advance_phase(GamePhase::Night).is_err());
        g.advance_phase(GamePhase::DayIntro).unwrap();
        g.advance_phase(GamePhase::Night).unwrap();
        assert!(g.advance_phase(GamePhase::DayDiscussion).is_err());
        g.advance_phase(GamePhase::Finished).unwrap();
        assert!(!GamePhase::Finished.can_advance_to(GamePhase::Night));
    }

    #[test]
    fn death_is_recorded_once() {
        let mut g = game();
        assert!(g.kill(1));
        assert!(!g.kill(1));
        assert_eq!(g.dead, vec![1]);
        assert!(!g.is_alive(1));
        assert_eq!(g.living().count(), 2);
    }

    #[test]
    fn dead_players_and_night_are_muted() {
        let mut g = game();
        g.phase = GamePhase::DayDiscussion;
        assert!(g.can_speak(1, Channel::Phase));
        g.kill(1);
        assert!(!g.can_speak(1, Channel::Phase));
        assert!(!g.can_speak(7, Channel::Phase));

        g.phase = GamePhase::Night;
        assert!(!g.can_speak(2, Channel::Phase));
        g.phase = GamePhase::Finished;
        assert!(g.can_speak(1, Channel::Phase));
    }

    #[test]
    fn only_the_accused_speaks_during_the_statement() {
        let mut g = game();
        g.phase = GamePhase::DayTrialStatement;
        g.trial = Some(Trial::new(2));
        assert!(g.can_speak(2, Channel::Phase));
        assert!(!g.can_speak(0, Channel::Phase));
        g.phase = GamePhase::DayVote;
        assert!(g.can_speak(0, Channel::Phase));
    }

    #[test]
    fn faction_channel_is_for_living_mafia_at_night() {
        let mut g = game();
        g.phase = GamePhase::Night;
        assert!(g.can_speak(0, Channel::Faction));
        assert!(!g.can_speak(1, Channel::Faction));
        g.phase = GamePhase::DayDiscussion;
        assert!(!g.can_speak(0, Channel::Faction));
        g.phase = GamePhase::Night;
        g.kill(0);
        assert!(!g.can_speak(0, Channel::Faction));
    }

    #[test]
    fn public_view_hides_living_roles() {
        let mut g = game();
        g.kill(2);
        let view = g.public_view();
        assert_eq!(view.players[0].role, None);
        assert_eq!(view.players[2].role, Some(Role::Healer));
    }
}

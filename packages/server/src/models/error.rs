use thiserror::Error;

use super::game::GamePhase;

/// コマンドの拒否理由。Displayがそのまま送信者への返信になる。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("The game is over.")]
    GameOver,
    #[error("You are not part of this game.")]
    NotAPlayer,
    #[error("Invalid player ID.")]
    InvalidPlayerId,
    #[error("That player is already dead.")]
    TargetDead,
    #[error("You cannot kill a member of the Mafia.")]
    FriendlyFire,
    #[error("You cannot investigate yourself.")]
    SelfInvestigation,
    #[error("You cannot nominate yourself.")]
    SelfNomination,
    #[error("You have no night ability.")]
    NoNightAbility,
    #[error("It is day; you cannot use your ability yet.")]
    AbilityUnavailable,
    #[error("Nominations are not open right now.")]
    NominationsClosed,
    #[error("The trial vote is not open right now.")]
    TrialVoteClosed,
    #[error("There is nothing to cancel right now.")]
    CancelUnavailable,
    #[error("You have already voted; use !cancel first.")]
    AlreadyVoted,
    #[error("You have no vote to cancel.")]
    NoActiveVote,
    #[error("You are on trial and cannot vote.")]
    AccusedCannotVote,
    #[error("Dead players cannot vote.")]
    DeadVoter,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("at least {required} players are required, got {found}")]
    NotEnoughPlayers { required: usize, found: usize },
    #[error("at most {max} players are supported, got {found}")]
    TooManyPlayers { max: usize, found: usize },
    #[error("participant {0} was listed more than once")]
    DuplicateParticipant(String),
    #[error("role counts exceed the {0} available players")]
    RoleOverflow(usize),
    #[error("minimum player count must be at least 3, got {0}")]
    InvalidMinimum(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("illegal phase transition {from:?} -> {to:?}")]
    IllegalTransition { from: GamePhase, to: GamePhase },
}

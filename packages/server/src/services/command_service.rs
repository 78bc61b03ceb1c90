use crate::models::{
    command::{Command, CommandContext},
    error::CommandError,
    game::{Game, GamePhase},
    notice::Notice,
    player::{Player, PlayerId},
    trial::Ballot,
};
use crate::services::gateway::{dispatch, Gateway};
use crate::state::GameHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// 受理。`reply`は送信者への返信、`notices`は他への通知。
    Accepted { reply: String, notices: Vec<Notice> },
    /// 対象外(死者の夜コマンド、ただの雑談など)。返信もしない。
    Ignored,
}

impl CommandOutcome {
    fn reply(reply: impl Into<String>) -> Self {
        CommandOutcome::Accepted {
            reply: reply.into(),
            notices: Vec::new(),
        }
    }

    fn with_notice(reply: impl Into<String>, notice: Notice) -> Self {
        CommandOutcome::Accepted {
            reply: reply.into(),
            notices: vec![notice],
        }
    }
}

/// Validates one inbound command against the current phase and roster and applies it.
/// A rejection leaves the game untouched.
pub fn interpret(
    game: &mut Game,
    sender: &str,
    text: &str,
    context: CommandContext,
) -> Result<CommandOutcome, CommandError> {
    if game.is_finished() {
        return Err(CommandError::GameOver);
    }
    let actor = game
        .find_by_user(sender)
        .cloned()
        .ok_or(CommandError::NotAPlayer)?;

    // 死者は夜の能力を使えない。黙って無視する
    if context == CommandContext::Private && actor.is_dead {
        return Ok(CommandOutcome::Ignored);
    }

    // 夜の能力はフェーズを先に見る。昼のDMには昼の返事を返す
    if context == CommandContext::Private {
        if actor.role.night_ability().is_none() {
            return Err(CommandError::NoNightAbility);
        }
        if game.phase != GamePhase::Night {
            return Err(CommandError::AbilityUnavailable);
        }
    }

    let Some(command) = Command::parse(text, context)? else {
        return Ok(CommandOutcome::Ignored);
    };

    match command {
        Command::Target(id) => choose_target(game, &actor, id),
        Command::CancelAction => cancel_action(game, &actor),
        Command::Nominate(id) => nominate(game, &actor, id),
        Command::CancelVote => cancel_vote(game, &actor),
        Command::Guilty => cast_ballot(game, &actor, Ballot::Guilty),
        Command::Innocent => cast_ballot(game, &actor, Ballot::Innocent),
    }
}

fn living_target(game: &Game, id: PlayerId) -> Result<&Player, CommandError> {
    let target = game.player(id).ok_or(CommandError::InvalidPlayerId)?;
    if target.is_dead {
        return Err(CommandError::TargetDead);
    }
    Ok(target)
}

fn choose_target(
    game: &mut Game,
    actor: &Player,
    id: PlayerId,
) -> Result<CommandOutcome, CommandError> {
    let ability = actor
        .role
        .night_ability()
        .ok_or(CommandError::NoNightAbility)?;
    if game.phase != GamePhase::Night {
        return Err(CommandError::AbilityUnavailable);
    }
    let target = living_target(game, id)?;
    ability.check_target(actor, target)?;
    let target_name = target.name.clone();

    game.night_actions.submit(ability, actor.id, id);
    log::debug!(
        "[{}] {} chose to {} {}",
        game.room_id,
        actor.id,
        ability.verb(),
        id
    );

    let reply = format!("You will {} **{}** tonight.", ability.verb(), target_name);
    if actor.role.is_mafia() {
        let echo = Notice::faction(format!(
            "**{}** has chosen to {} **{}**.",
            actor.name,
            ability.verb(),
            target_name
        ));
        return Ok(CommandOutcome::with_notice(reply, echo));
    }
    Ok(CommandOutcome::reply(reply))
}

fn cancel_action(game: &mut Game, actor: &Player) -> Result<CommandOutcome, CommandError> {
    let ability = actor
        .role
        .night_ability()
        .ok_or(CommandError::NoNightAbility)?;
    if game.phase != GamePhase::Night {
        return Err(CommandError::AbilityUnavailable);
    }
    let Some(previous) = game.night_actions.cancel(ability, actor.id) else {
        return Ok(CommandOutcome::reply("You have no choice to cancel."));
    };
    let name = game
        .player(previous)
        .map(|p| p.name.clone())
        .unwrap_or_default();
    let reply = format!("You no longer {} **{}** tonight.", ability.verb(), name);
    if actor.role.is_mafia() {
        let echo = Notice::faction(format!(
            "**{}** withdrew their choice to {} **{}**.",
            actor.name,
            ability.verb(),
            name
        ));
        return Ok(CommandOutcome::with_notice(reply, echo));
    }
    Ok(CommandOutcome::reply(reply))
}

fn nominate(game: &mut Game, actor: &Player, id: PlayerId) -> Result<CommandOutcome, CommandError> {
    if actor.is_dead {
        return Err(CommandError::DeadVoter);
    }
    if game.phase != GamePhase::DayTrialDecision {
        return Err(CommandError::NominationsClosed);
    }
    let target_name = living_target(game, id)?.name.clone();
    if actor.id == id {
        return Err(CommandError::SelfNomination);
    }
    game.nominations.vote(actor.id, id)?;
    let count = game.nominations.count_for(id);
    Ok(CommandOutcome::with_notice(
        format!("You nominated **{}**.", target_name),
        Notice::public(format!(
            "**{}** nominated **{}** ({} vote{}).",
            actor.name,
            target_name,
            count,
            if count == 1 { "" } else { "s" }
        )),
    ))
}

fn cancel_vote(game: &mut Game, actor: &Player) -> Result<CommandOutcome, CommandError> {
    if actor.is_dead {
        return Err(CommandError::DeadVoter);
    }
    match game.phase {
        GamePhase::DayTrialDecision => {
            let nominee = game.nominations.cancel(actor.id)?;
            let name = game
                .player(nominee)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            Ok(CommandOutcome::with_notice(
                "Your nomination was withdrawn.",
                Notice::public(format!(
                    "**{}** withdrew their nomination of **{}**.",
                    actor.name, name
                )),
            ))
        }
        GamePhase::DayVote => {
            let trial = game.trial.as_mut().ok_or(CommandError::CancelUnavailable)?;
            trial.cancel(actor.id)?;
            Ok(CommandOutcome::reply("Your vote was withdrawn."))
        }
        _ => Err(CommandError::CancelUnavailable),
    }
}

fn cast_ballot(
    game: &mut Game,
    actor: &Player,
    ballot: Ballot,
) -> Result<CommandOutcome, CommandError> {
    if actor.is_dead {
        return Err(CommandError::DeadVoter);
    }
    if game.phase != GamePhase::DayVote {
        return Err(CommandError::TrialVoteClosed);
    }
    let trial = game.trial.as_mut().ok_or(CommandError::TrialVoteClosed)?;
    trial.cast(actor.id, ballot)?;
    let word = match ballot {
        Ballot::Guilty => "guilty",
        Ballot::Innocent => "innocent",
    };
    Ok(CommandOutcome::reply(format!(
        "Your vote of **{}** was recorded.",
        word
    )))
}

/// Locks the game for exactly one command, then delivers the resulting notices.
pub async fn handle_command(
    game: &GameHandle,
    gateway: &dyn Gateway,
    sender: &str,
    text: &str,
    context: CommandContext,
) -> Result<CommandOutcome, CommandError> {
    let outcome = {
        let mut game = game.lock().await;
        interpret(&mut game, sender, text, context)?
    };
    if let CommandOutcome::Accepted { notices, .. } = &outcome {
        dispatch(gateway, notices);
    }
    Ok(outcome)
}

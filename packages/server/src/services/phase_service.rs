use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{
    config::GameConfig,
    error::PhaseError,
    game::{Game, GamePhase, GameResult},
    notice::{Channel, Notice, SpeakerGroup},
    player::{Player, PlayerId},
    trial::{Trial, Verdict},
};
use crate::services::gateway::{dispatch, Gateway};
use crate::services::judge::{judge, summary};
use crate::state::GameHandle;

fn listing<'a>(players: impl Iterator<Item = &'a Player>) -> String {
    players
        .map(|p| format!("`{}`: {}", p.id, p.name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn name_of(game: &Game, id: PlayerId) -> String {
    game.player(id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| format!("Player {}", id))
}

/// Initializing → DayIntro。役職通知と開始のあいさつ。
pub fn introduce(game: &mut Game) -> Result<Vec<Notice>, PhaseError> {
    game.advance_phase(GamePhase::DayIntro)?;
    let mut notices = Vec::new();

    let mafia_names: Vec<String> = game.mafia().map(|p| p.name.clone()).collect();
    for player in &game.players {
        let mut text = player.role.briefing().to_string();
        if player.role.is_mafia() {
            text.push_str(&format!("\nThe Mafia: {}", mafia_names.join(", ")));
        }
        notices.push(Notice::private(player.id, text));
    }

    notices.push(Notice::speak(Channel::Phase, SpeakerGroup::Everyone, true));
    notices.push(Notice::speak(Channel::Faction, SpeakerGroup::Mafia, false));
    notices.push(Notice::public(format!(
        "Welcome to Mafia! Check your direct messages for your role. The players are:\n{}",
        listing(game.players.iter())
    )));
    Ok(notices)
}

/// Moves into the night: clears the day's votes and prompts everyone with an ability.
pub fn enter_night(game: &mut Game) -> Result<Vec<Notice>, PhaseError> {
    game.advance_phase(GamePhase::Night)?;
    game.nominations.clear();
    game.trial = None;
    game.night_actions.clear();

    let mut notices = vec![
        Notice::speak(Channel::Phase, SpeakerGroup::Living, false),
        Notice::speak(Channel::Faction, SpeakerGroup::Mafia, true),
        Notice::public(format!(
            "Night {} falls. Everyone with a night ability, check your direct messages.",
            game.day
        )),
    ];

    for actor in game.living() {
        let Some(ability) = actor.role.night_ability() else {
            continue;
        };
        let targets = game.living().filter(|t| ability.can_target(actor, t));
        notices.push(Notice::private(
            actor.id,
            format!(
                "Night {}: choose a player to **{}**. Reply with their ID, or `cancel` to withdraw your choice.\n{}",
                game.day,
                ability.verb(),
                listing(targets)
            ),
        ));
    }
    Ok(notices)
}

fn death_notices(game: &Game, id: PlayerId, notices: &mut Vec<Notice>) {
    notices.push(Notice::speak(Channel::Phase, SpeakerGroup::Player(id), false));
    if game.player(id).map(|p| p.role.is_mafia()).unwrap_or(false) {
        notices.push(Notice::speak(Channel::Faction, SpeakerGroup::Player(id), false));
    }
}

fn finish(game: &mut Game, result: GameResult, notices: &mut Vec<Notice>) -> Result<(), PhaseError> {
    game.advance_phase(GamePhase::Finished)?;
    game.result = result;
    game.nominations.clear();
    game.trial = None;
    game.night_actions.clear();
    log::info!("[{}] game finished: {:?}", game.room_id, result);

    if let Some(text) = summary(result) {
        notices.push(Notice::public(text));
    }
    let roles = game
        .players
        .iter()
        .map(|p| format!("{} was a **{}**", p.name, p.role))
        .collect::<Vec<_>>()
        .join("\n");
    notices.push(Notice::public(roles));
    notices.push(Notice::speak(Channel::Phase, SpeakerGroup::Everyone, true));
    Ok(())
}

/// 夜明け。アクションを解決し、勝敗を判定して昼のアナウンスへ進む。
pub fn resolve_night<R: Rng + ?Sized>(
    game: &mut Game,
    rng: &mut R,
) -> Result<Vec<Notice>, PhaseError> {
    if game.phase != GamePhase::Night {
        return Err(PhaseError::IllegalTransition {
            from: game.phase,
            to: GamePhase::DayAnnouncements,
        });
    }
    let report = game.night_actions.resolve(&game.players, rng);
    game.night_actions.clear();

    let mut announcements = Vec::new();
    for &id in &report.deaths {
        if game.kill(id) {
            if let Some(p) = game.player(id) {
                announcements.push(Notice::public(format!(
                    "**{}** was found dead this morning. They were a **{}**.",
                    p.name,
                    p.role.reveal_name()
                )));
            }
            death_notices(game, id, &mut announcements);
        }
    }
    for &id in &report.saves {
        announcements.push(Notice::public(format!(
            "**{}** was attacked last night, but a healer saved them!",
            name_of(game, id)
        )));
    }
    if report.deaths.is_empty() && report.saves.is_empty() {
        announcements.push(Notice::public("The night passed quietly. Nobody died."));
    }

    let result = judge(game);
    if result != GameResult::InProgress {
        let mut notices = announcements;
        finish(game, result, &mut notices)?;
        return Ok(notices);
    }

    game.day += 1;
    game.advance_phase(GamePhase::DayAnnouncements)?;
    let mut notices = vec![Notice::public(format!("Day {} begins.", game.day))];
    notices.extend(announcements);
    for inv in &report.investigations {
        notices.push(Notice::private(
            inv.detective,
            format!(
                "**{}** is either Mafia, or a **{}**.",
                name_of(game, inv.subject),
                inv.hint
            ),
        ));
    }
    Ok(notices)
}

pub fn open_discussion(game: &mut Game) -> Result<Vec<Notice>, PhaseError> {
    game.advance_phase(GamePhase::DayDiscussion)?;
    Ok(vec![
        Notice::speak(Channel::Faction, SpeakerGroup::Mafia, false),
        Notice::speak(Channel::Phase, SpeakerGroup::Living, true),
        Notice::public("Discuss! Who do you suspect? Nominations open soon."),
    ])
}

pub fn open_trial_decision(game: &mut Game) -> Result<Vec<Notice>, PhaseError> {
    game.advance_phase(GamePhase::DayTrialDecision)?;
    game.nominations.clear();
    Ok(vec![Notice::public(format!(
        "Nominations are open. Use `!vote <id>` to nominate, `!cancel` to withdraw.\n{}",
        listing(game.living())
    ))])
}

/// 指名の締め切り。単独最多なら裁判へ、同数(または票なし)ならそのまま夜へ。
pub fn close_nominations(game: &mut Game) -> Result<Vec<Notice>, PhaseError> {
    if game.phase != GamePhase::DayTrialDecision {
        return Err(PhaseError::IllegalTransition {
            from: game.phase,
            to: GamePhase::DayTrialStatement,
        });
    }
    let leader = game.nominations.leader().filter(|&id| game.is_alive(id));

    let Some(accused) = leader else {
        let mut notices = vec![Notice::public(
            "No one received the most nominations outright. There is no trial today.",
        )];
        notices.extend(enter_night(game)?);
        return Ok(notices);
    };

    let votes = game.nominations.count_for(accused);
    game.nominations.clear();
    game.trial = Some(Trial::new(accused));
    game.advance_phase(GamePhase::DayTrialStatement)?;
    Ok(vec![
        Notice::speak(Channel::Phase, SpeakerGroup::Living, false),
        Notice::speak(Channel::Phase, SpeakerGroup::Player(accused), true),
        Notice::public(format!(
            "**{}** has been put on trial with {} votes. They may now make their statement.",
            name_of(game, accused),
            votes
        )),
    ])
}

pub fn open_vote(game: &mut Game) -> Result<Vec<Notice>, PhaseError> {
    game.advance_phase(GamePhase::DayVote)?;
    let accused = game.trial.as_ref().map(|t| t.accused);
    let mut notices = Vec::new();
    if let Some(id) = accused {
        notices.push(Notice::speak(Channel::Phase, SpeakerGroup::Player(id), false));
    }
    notices.push(Notice::speak(Channel::Phase, SpeakerGroup::Living, true));
    notices.push(Notice::public(
        "Cast your vote: `!guilty` or `!innocent`. Use `!cancel` to withdraw.",
    ));
    Ok(notices)
}

/// 評決。有罪が多ければ処刑し、勝敗判定の後に夜へ戻る。
pub fn resolve_verdict(game: &mut Game) -> Result<Vec<Notice>, PhaseError> {
    if game.phase != GamePhase::DayVote {
        return Err(PhaseError::IllegalTransition {
            from: game.phase,
            to: GamePhase::Night,
        });
    }
    let mut notices = Vec::new();
    if let Some(trial) = game.trial.take() {
        let (guilty, innocent) = (trial.guilty.len(), trial.innocent.len());
        match trial.verdict() {
            Verdict::Executed => {
                game.kill(trial.accused);
                let role = game
                    .player(trial.accused)
                    .map(|p| p.role.reveal_name())
                    .unwrap_or("townsperson");
                notices.push(Notice::public(format!(
                    "The town has spoken ({} guilty, {} innocent): **{}** was executed. They were a **{}**.",
                    guilty,
                    innocent,
                    name_of(game, trial.accused),
                    role
                )));
                death_notices(game, trial.accused, &mut notices);
            }
            Verdict::Acquitted => {
                notices.push(Notice::public(format!(
                    "**{}** was acquitted ({} guilty, {} innocent).",
                    name_of(game, trial.accused),
                    guilty,
                    innocent
                )));
            }
        }
    }

    let result = judge(game);
    if result != GameResult::InProgress {
        finish(game, result, &mut notices)?;
        return Ok(notices);
    }
    notices.extend(enter_night(game)?);
    Ok(notices)
}

fn window(phase: GamePhase, config: &GameConfig) -> Option<Duration> {
    match phase {
        GamePhase::DayIntro => Some(config.intro()),
        GamePhase::Night => Some(config.night()),
        GamePhase::DayDiscussion => Some(config.discussion()),
        GamePhase::DayTrialDecision => Some(config.trial_decision()),
        GamePhase::DayTrialStatement => Some(config.trial_statement()),
        GamePhase::DayVote => Some(config.vote()),
        GamePhase::Initializing | GamePhase::DayAnnouncements | GamePhase::Finished => None,
    }
}

/// Drives one room from `Initializing` to `Finished`.
///
/// Each phase window is a plain sleep taken without the lock; each transition is one
/// critical section over the game, and its notices are delivered before the next wait.
pub async fn run_phase_loop(
    game: GameHandle,
    gateway: Arc<dyn Gateway>,
    config: GameConfig,
    mut rng: StdRng,
) -> Result<(), PhaseError> {
    loop {
        let phase = game.lock().await.phase;
        if phase == GamePhase::Finished {
            return Ok(());
        }
        if let Some(wait) = window(phase, &config) {
            tokio::time::sleep(wait).await;
        }

        let notices = {
            let mut g = game.lock().await;
            match phase {
                GamePhase::Initializing => introduce(&mut g),
                GamePhase::DayIntro => enter_night(&mut g),
                GamePhase::Night => resolve_night(&mut g, &mut rng),
                GamePhase::DayAnnouncements => open_discussion(&mut g),
                GamePhase::DayDiscussion => open_trial_decision(&mut g),
                GamePhase::DayTrialDecision => close_nominations(&mut g),
                GamePhase::DayTrialStatement => open_vote(&mut g),
                GamePhase::DayVote => resolve_verdict(&mut g),
                GamePhase::Finished => Ok(Vec::new()),
            }
        };

        match notices {
            Ok(notices) => {
                dispatch(gateway.as_ref(), &notices);
            }
            Err(e) => {
                log::error!("phase loop stopped: {}", e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::player::Player;
    use crate::models::role::{NightAbility, Role};
    use crate::models::trial::Ballot;
    use rand::SeedableRng;

    // 0 Mafia, 1 Detective, 2 Healer, 3..5 Townsperson
    fn six_player_game() -> Game {
        let roles = [
            Role::Mafia,
            Role::Detective,
            Role::Healer,
            Role::Townsperson,
            Role::Townsperson,
            Role::Townsperson,
        ];
        let players = roles
            .iter()
            .enumerate()
            .map(|(i, r)| Player::new(i, format!("u{}", i), format!("P{}", i), *r))
            .collect();
        let mut game = Game::new("room".to_string(), players);
        introduce(&mut game).unwrap();
        enter_night(&mut game).unwrap();
        game
    }

    fn texts(notices: &[Notice]) -> Vec<&str> {
        notices.iter().filter_map(Notice::text).collect()
    }

    #[test]
    fn introduction_reveals_roles_privately() {
        let players = vec![
            Player::new(0, "a".into(), "A".into(), Role::Mafia),
            Player::new(1, "b".into(), "B".into(), Role::Townsperson),
        ];
        let mut game = Game::new("room".to_string(), players);
        let notices = introduce(&mut game).unwrap();
        assert_eq!(game.phase, GamePhase::DayIntro);
        let private: Vec<_> = notices
            .iter()
            .filter(|n| matches!(n, Notice::Private { .. }))
            .collect();
        assert_eq!(private.len(), 2);
    }

    #[test]
    fn night_prompts_only_ability_holders() {
        let game = {
            let roles = [Role::Mafia, Role::Healer, Role::Townsperson];
            let players = roles
                .iter()
                .enumerate()
                .map(|(i, r)| Player::new(i, format!("u{}", i), format!("P{}", i), *r))
                .collect();
            let mut g = Game::new("room".to_string(), players);
            introduce(&mut g).unwrap();
            g
        };
        let mut game = game;
        let notices = enter_night(&mut game).unwrap();
        let prompted: Vec<PlayerId> = notices
            .iter()
            .filter_map(|n| match n {
                Notice::Private { player, .. } => Some(*player),
                _ => None,
            })
            .collect();
        assert_eq!(prompted, vec![0, 1]);
    }

    #[test]
    fn dawn_without_heal_kills_and_advances_day() {
        let mut game = six_player_game();
        game.night_actions.submit(NightAbility::Kill, 0, 3);
        let notices = resolve_night(&mut game, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(game.dead, vec![3]);
        assert_eq!(game.day, 2);
        assert_eq!(game.phase, GamePhase::DayAnnouncements);
        assert!(game.night_actions.is_empty());
        assert!(texts(&notices).iter().any(|t| t.contains("found dead")));
    }

    #[test]
    fn investigation_result_goes_to_detective() {
        let mut game = six_player_game();
        game.night_actions.submit(NightAbility::Investigate, 1, 2);
        let notices = resolve_night(&mut game, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(notices.contains(&Notice::private(
            1,
            "**P2** is either Mafia, or a **Healer**."
        )));
    }

    #[test]
    fn detective_killed_overnight_still_gets_the_result() {
        let mut game = six_player_game();
        game.night_actions.submit(NightAbility::Kill, 0, 1);
        game.night_actions.submit(NightAbility::Investigate, 1, 2);
        let notices = resolve_night(&mut game, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(game.dead, vec![1]);
        assert!(notices.contains(&Notice::private(
            1,
            "**P2** is either Mafia, or a **Healer**."
        )));
    }

    #[test]
    fn three_guilty_against_two_innocent_executes() {
        let mut game = six_player_game();
        resolve_night(&mut game, &mut StdRng::seed_from_u64(1)).unwrap();
        open_discussion(&mut game).unwrap();
        open_trial_decision(&mut game).unwrap();
        game.nominations.vote(1, 3).unwrap();
        close_nominations(&mut game).unwrap();
        open_vote(&mut game).unwrap();
        let trial = game.trial.as_mut().unwrap();
        for voter in [0, 1, 2] {
            trial.cast(voter, Ballot::Guilty).unwrap();
        }
        for voter in [4, 5] {
            trial.cast(voter, Ballot::Innocent).unwrap();
        }
        let notices = resolve_verdict(&mut game).unwrap();
        assert_eq!(game.dead, vec![3]);
        assert!(texts(&notices)
            .iter()
            .any(|t| t.contains("(3 guilty, 2 innocent): **P3** was executed")));
        assert_eq!(game.phase, GamePhase::Night);
    }

    #[test]
    fn tie_skips_trial_and_returns_to_night() {
        let mut game = six_player_game();
        resolve_night(&mut game, &mut StdRng::seed_from_u64(1)).unwrap();
        open_discussion(&mut game).unwrap();
        open_trial_decision(&mut game).unwrap();
        for (voter, nominee) in [(0, 2), (1, 2), (3, 4), (5, 4)] {
            game.nominations.vote(voter, nominee).unwrap();
        }
        close_nominations(&mut game).unwrap();
        assert!(game.trial.is_none());
        assert_eq!(game.phase, GamePhase::Night);
        assert!(game.nominations.votes.is_empty());
    }

    #[test]
    fn guilty_majority_executes_and_town_wins() {
        let mut game = six_player_game();
        resolve_night(&mut game, &mut StdRng::seed_from_u64(1)).unwrap();
        open_discussion(&mut game).unwrap();
        open_trial_decision(&mut game).unwrap();
        game.nominations.vote(1, 0).unwrap();
        close_nominations(&mut game).unwrap();
        assert_eq!(game.phase, GamePhase::DayTrialStatement);
        open_vote(&mut game).unwrap();
        let trial = game.trial.as_mut().unwrap();
        trial.cast(1, Ballot::Guilty).unwrap();
        trial.cast(2, Ballot::Guilty).unwrap();
        trial.cast(3, Ballot::Innocent).unwrap();
        resolve_verdict(&mut game).unwrap();
        assert_eq!(game.dead, vec![0]);
        assert_eq!(game.result, GameResult::TownWin);
        assert!(game.is_finished());
    }

    #[test]
    fn acquittal_keeps_accused_alive() {
        let mut game = six_player_game();
        resolve_night(&mut game, &mut StdRng::seed_from_u64(1)).unwrap();
        open_discussion(&mut game).unwrap();
        open_trial_decision(&mut game).unwrap();
        game.nominations.vote(0, 4).unwrap();
        close_nominations(&mut game).unwrap();
        open_vote(&mut game).unwrap();
        let trial = game.trial.as_mut().unwrap();
        trial.cast(0, Ballot::Guilty).unwrap();
        trial.cast(1, Ballot::Innocent).unwrap();
        resolve_verdict(&mut game).unwrap();
        assert!(game.is_alive(4));
        assert!(game.trial.is_none());
        assert_eq!(game.phase, GamePhase::Night);
    }
}

use crate::models::game::{Game, GameResult};

/// 勝利判定。夜明けの解決と評決のたびに呼ぶ。
///
/// Town wins once every Mafia member is dead. Mafia wins once every non-Mafia player
/// is dead, or when exactly two players remain and at least one of them is Mafia.
pub fn judge(game: &Game) -> GameResult {
    let mafia_alive = game.living().filter(|p| p.role.is_mafia()).count();
    let town_alive = game.living().filter(|p| !p.role.is_mafia()).count();

    if mafia_alive == 0 {
        GameResult::TownWin
    } else if town_alive == 0 || mafia_alive + town_alive == 2 {
        GameResult::MafiaWin
    } else {
        GameResult::InProgress
    }
}

pub fn summary(result: GameResult) -> Option<&'static str> {
    match result {
        GameResult::InProgress => None,
        GameResult::TownWin => Some("**The Town wins!** Every member of the Mafia has been eliminated."),
        GameResult::MafiaWin => Some("**The Mafia wins!** The town can no longer outvote them."),
    }
}

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::models::{
    config::GameConfig,
    error::SetupError,
    player::{Participant, Player},
    role::Role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleCounts {
    pub mafia: usize,
    pub detectives: usize,
    pub healers: usize,
    pub townspeople: usize,
}

/// 役職の人数計算
///
/// `mafia = 1 + (n - min) / 2`, each further special role one fewer than the
/// previous but never below one, and the rest are townspeople.
pub fn role_counts(n: usize, min_players: usize) -> Result<RoleCounts, SetupError> {
    if min_players < 3 {
        return Err(SetupError::InvalidMinimum(min_players));
    }
    if n < min_players {
        return Err(SetupError::NotEnoughPlayers {
            required: min_players,
            found: n,
        });
    }
    let mafia = 1 + (n - min_players) / 2;
    let detectives = mafia.saturating_sub(1).max(1);
    let healers = detectives.saturating_sub(1).max(1);
    let special = mafia + detectives + healers;
    if special > n {
        return Err(SetupError::RoleOverflow(n));
    }
    Ok(RoleCounts {
        mafia,
        detectives,
        healers,
        townspeople: n - special,
    })
}

/// 参加者に役職を割り当てる。
///
/// The roster keeps the participants' order (so public IDs say nothing about roles);
/// roles are dealt over a shuffled index order.
pub fn assign_roles<R: Rng + ?Sized>(
    participants: &[Participant],
    config: &GameConfig,
    rng: &mut R,
) -> Result<Vec<Player>, SetupError> {
    let n = participants.len();
    if n > config.max_players {
        return Err(SetupError::TooManyPlayers {
            max: config.max_players,
            found: n,
        });
    }
    let mut seen = HashSet::new();
    for p in participants {
        if !seen.insert(p.user_id.as_str()) {
            return Err(SetupError::DuplicateParticipant(p.user_id.clone()));
        }
    }
    let counts = role_counts(n, config.min_players)?;

    let deck = std::iter::repeat(Role::Mafia)
        .take(counts.mafia)
        .chain(std::iter::repeat(Role::Detective).take(counts.detectives))
        .chain(std::iter::repeat(Role::Healer).take(counts.healers))
        .chain(std::iter::repeat(Role::Townsperson).take(counts.townspeople));

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut roles = vec![Role::Townsperson; n];
    for (&slot, role) in order.iter().zip(deck) {
        roles[slot] = role;
    }

    Ok(participants
        .iter()
        .zip(roles)
        .enumerate()
        .map(|(id, (p, role))| Player::new(id, p.user_id.clone(), p.name.clone(), role))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn participants(n: usize) -> Vec<Participant> {
        (0..n)
            .map(|i| Participant::new(format!("user-{}", i), format!("Player{}", i)))
            .collect()
    }

    #[test]
    fn six_players_get_one_of_each_special_role() {
        assert_eq!(
            role_counts(6, 6),
            Ok(RoleCounts {
                mafia: 1,
                detectives: 1,
                healers: 1,
                townspeople: 3,
            })
        );
    }

    #[test]
    fn counts_grow_with_player_count() {
        let counts = role_counts(10, 6).unwrap();
        assert_eq!((counts.mafia, counts.detectives, counts.healers), (3, 2, 1));
        assert_eq!(counts.townspeople, 4);
    }

    #[test]
    fn rejects_bad_sizes() {
        assert_eq!(
            role_counts(5, 6),
            Err(SetupError::NotEnoughPlayers {
                required: 6,
                found: 5
            })
        );
        assert_eq!(role_counts(20, 6), Err(SetupError::RoleOverflow(20)));
        assert_eq!(role_counts(6, 2), Err(SetupError::InvalidMinimum(2)));
    }

    #[test]
    fn assignment_keeps_participant_order() {
        let config = GameConfig::default();
        let players =
            assign_roles(&participants(8), &config, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(players.len(), 8);
        for (i, p) in players.iter().enumerate() {
            assert_eq!(p.id, i);
            assert_eq!(p.user_id, format!("user-{}", i));
            assert!(p.is_alive());
        }
        let mafia = players.iter().filter(|p| p.role == Role::Mafia).count();
        let detectives = players.iter().filter(|p| p.role == Role::Detective).count();
        let healers = players.iter().filter(|p| p.role == Role::Healer).count();
        assert_eq!((mafia, detectives, healers), (2, 1, 1));
    }

    #[test]
    fn rejects_duplicate_participants() {
        let mut list = participants(6);
        list[5] = Participant::new("user-0", "Again");
        let result = assign_roles(&list, &GameConfig::default(), &mut StdRng::seed_from_u64(1));
        assert_eq!(
            result.unwrap_err(),
            SetupError::DuplicateParticipant("user-0".to_string())
        );
    }

    #[test]
    fn rejects_more_than_max_players() {
        let config = GameConfig {
            max_players: 7,
            ..GameConfig::default()
        };
        let result = assign_roles(&participants(8), &config, &mut StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(SetupError::TooManyPlayers { .. })));
    }
}

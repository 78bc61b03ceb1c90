use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::error::CommandError;
use super::player::PlayerId;

/// 裁判にかける候補への指名投票。投票者ごとに1票。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Nominations {
    pub votes: BTreeMap<PlayerId, PlayerId>,
}

impl Nominations {
    /// 取り消すまで二重投票はできない
    pub fn vote(&mut self, voter: PlayerId, nominee: PlayerId) -> Result<(), CommandError> {
        if self.votes.contains_key(&voter) {
            return Err(CommandError::AlreadyVoted);
        }
        self.votes.insert(voter, nominee);
        Ok(())
    }

    pub fn cancel(&mut self, voter: PlayerId) -> Result<PlayerId, CommandError> {
        self.votes.remove(&voter).ok_or(CommandError::NoActiveVote)
    }

    pub fn tally(&self) -> BTreeMap<PlayerId, usize> {
        let mut tally = BTreeMap::new();
        for &nominee in self.votes.values() {
            *tally.entry(nominee).or_insert(0) += 1;
        }
        tally
    }

    pub fn count_for(&self, nominee: PlayerId) -> usize {
        self.votes.values().filter(|&&n| n == nominee).count()
    }

    /// The nominee with the strictly highest count. A shared maximum (or no votes) yields `None`.
    pub fn leader(&self) -> Option<PlayerId> {
        let tally = self.tally();
        let max = *tally.values().max()?;
        let mut top = tally.iter().filter(|&(_, &count)| count == max);
        let (&leader, _) = top.next()?;
        if top.next().is_some() {
            return None;
        }
        Some(leader)
    }

    pub fn clear(&mut self) {
        self.votes.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ballot {
    Guilty,
    Innocent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Executed,
    Acquitted,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    pub accused: PlayerId,
    pub guilty: BTreeSet<PlayerId>,
    pub innocent: BTreeSet<PlayerId>,
}

impl Trial {
    pub fn new(accused: PlayerId) -> Self {
        Self {
            accused,
            guilty: BTreeSet::new(),
            innocent: BTreeSet::new(),
        }
    }

    pub fn ballot_of(&self, voter: PlayerId) -> Option<Ballot> {
        if self.guilty.contains(&voter) {
            Some(Ballot::Guilty)
        } else if self.innocent.contains(&voter) {
            Some(Ballot::Innocent)
        } else {
            None
        }
    }

    pub fn cast(&mut self, voter: PlayerId, ballot: Ballot) -> Result<(), CommandError> {
        if voter == self.accused {
            return Err(CommandError::AccusedCannotVote);
        }
        if self.ballot_of(voter).is_some() {
            return Err(CommandError::AlreadyVoted);
        }
        match ballot {
            Ballot::Guilty => self.guilty.insert(voter),
            Ballot::Innocent => self.innocent.insert(voter),
        };
        Ok(())
    }

    pub fn cancel(&mut self, voter: PlayerId) -> Result<Ballot, CommandError> {
        if self.guilty.remove(&voter) {
            Ok(Ballot::Guilty)
        } else if self.innocent.remove(&voter) {
            Ok(Ballot::Innocent)
        } else {
            Err(CommandError::NoActiveVote)
        }
    }

    /// 有罪票が無罪票を上回った場合のみ処刑。同数は無罪。
    pub fn verdict(&self) -> Verdict {
        if self.guilty.len() > self.innocent.len() {
            Verdict::Executed
        } else {
            Verdict::Acquitted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_nomination_requires_cancel() {
        let mut n = Nominations::default();
        n.vote(0, 2).unwrap();
        assert_eq!(n.vote(0, 3), Err(CommandError::AlreadyVoted));
        assert_eq!(n.cancel(0), Ok(2));
        n.vote(0, 3).unwrap();
        assert_eq!(n.count_for(3), 1);
        assert_eq!(n.count_for(2), 0);
    }

    #[test]
    fn tied_leaders_produce_no_accused() {
        let mut n = Nominations::default();
        for (voter, nominee) in [(0, 2), (1, 2), (3, 2), (2, 4), (5, 4), (6, 4)] {
            n.vote(voter, nominee).unwrap();
        }
        assert_eq!(n.tally().get(&2), Some(&3));
        assert_eq!(n.leader(), None);
    }

    #[test]
    fn strict_leader_is_accused() {
        let mut n = Nominations::default();
        assert_eq!(n.leader(), None);
        n.vote(0, 2).unwrap();
        n.vote(1, 2).unwrap();
        n.vote(2, 4).unwrap();
        assert_eq!(n.leader(), Some(2));
    }

    #[test]
    fn ballots_are_exclusive_and_accused_cannot_vote() {
        let mut t = Trial::new(1);
        assert_eq!(t.cast(1, Ballot::Guilty), Err(CommandError::AccusedCannotVote));
        t.cast(0, Ballot::Guilty).unwrap();
        assert_eq!(t.cast(0, Ballot::Innocent), Err(CommandError::AlreadyVoted));
        assert_eq!(t.cancel(0), Ok(Ballot::Guilty));
        t.cast(0, Ballot::Innocent).unwrap();
        assert!(t.guilty.is_empty());
        assert_eq!(t.ballot_of(0), Some(Ballot::Innocent));
    }

    #[test]
    fn tie_acquits() {
        let mut t = Trial::new(4);
        t.cast(0, Ballot::Guilty).unwrap();
        t.cast(1, Ballot::Innocent).unwrap();
        assert_eq!(t.verdict(), Verdict::Acquitted);
        t.cast(2, Ballot::Guilty).unwrap();
        assert_eq!(t.verdict(), Verdict::Executed);
    }
}

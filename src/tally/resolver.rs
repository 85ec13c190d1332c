//! Winner / runoff resolution. Pure; no I/O.
//!
//! Applies the two-round rule: a slate wins outright by strictly exceeding
//! the majority threshold of valid votes, otherwise the two best placed
//! slates go to a runoff. Ties that decide the outcome are never broken here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::common::{Decision, MajorityRule, NoWinnerReason, Percentage, SlateId};

/// A slate's place in the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedSlate {
    pub slate_id: SlateId,
    pub votes: u64,
    /// Share of the valid votes.
    pub share: Percentage,
    /// Competition rank (1, 1, 3, ...).
    pub rank: u32,
}

/// Rank slates by votes, highest first. Slates with equal votes share a
/// rank and are listed by slate ID.
pub fn rank(per_slate: &BTreeMap<SlateId, u64>) -> Vec<RankedSlate> {
    let total_valid: u64 = per_slate.values().sum();
    let mut ordered: Vec<(&SlateId, u64)> = per_slate.iter().map(|(id, v)| (id, *v)).collect();
    // Stable sort keeps the slate ID order among equals.
    ordered.sort_by(|a, b| b.1.cmp(&a.1));

    let mut ranking: Vec<RankedSlate> = Vec::with_capacity(ordered.len());
    for (position, (slate_id, votes)) in ordered.into_iter().enumerate() {
        let rank = match ranking.last() {
            Some(previous) if previous.votes == votes => previous.rank,
            _ => position as u32 + 1,
        };
        ranking.push(RankedSlate {
            slate_id: slate_id.clone(),
            votes,
            share: Percentage::ratio(votes, total_valid),
            rank,
        });
    }
    ranking
}

fn slates_at(ranking: &[RankedSlate], rank: u32) -> Vec<&RankedSlate> {
    ranking.iter().filter(|s| s.rank == rank).collect()
}

/// Decide the outcome from a ranking produced by [`rank`].
pub fn resolve(ranking: &[RankedSlate], quorum_met: bool, majority_rule: MajorityRule) -> Decision {
    if !quorum_met {
        return Decision::NoWinner {
            reason: NoWinnerReason::QuorumNotMet,
        };
    }
    let total_valid: u64 = ranking.iter().map(|s| s.votes).sum();
    if total_valid == 0 {
        return Decision::NoWinner {
            reason: NoWinnerReason::NoValidVotes,
        };
    }

    let leaders = slates_at(ranking, 1);
    if leaders.len() > 1 {
        return Decision::TieDetected {
            rank: 1,
            slates: leaders.iter().map(|s| s.slate_id.clone()).collect(),
        };
    }
    let leader = leaders[0];
    if majority_rule
        .threshold()
        .is_exceeded_by(leader.votes, total_valid)
    {
        return Decision::Winner {
            slate: leader.slate_id.clone(),
        };
    }

    let runners_up = slates_at(ranking, 2);
    match runners_up.as_slice() {
        [] => Decision::NoWinner {
            reason: NoWinnerReason::NoRunoffOpponent,
        },
        [second] => Decision::RunoffRequired {
            slates: [leader.slate_id.clone(), second.slate_id.clone()],
        },
        tied => Decision::TieDetected {
            rank: 2,
            slates: tied.iter().map(|s| s.slate_id.clone()).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slates(votes: &[(&str, u64)]) -> BTreeMap<SlateId, u64> {
        votes.iter().map(|(id, v)| (id.to_string(), *v)).collect()
    }

    fn decide(votes: &[(&str, u64)]) -> Decision {
        resolve(&rank(&slates(votes)), true, MajorityRule::Absolute)
    }

    #[test]
    fn competition_ranking() {
        let ranking = rank(&slates(&[("C", 10), ("A", 30), ("B", 30), ("D", 5)]));
        let summary: Vec<_> = ranking
            .iter()
            .map(|s| (s.slate_id.as_str(), s.rank))
            .collect();
        assert_eq!(summary, [("A", 1), ("B", 1), ("C", 3), ("D", 4)]);
        assert_eq!(ranking[0].share, Percentage::from_bps(4000));
    }

    #[test]
    fn majority_of_valid_votes_wins() {
        assert_eq!(
            decide(&[("A", 310), ("B", 290)]),
            Decision::Winner {
                slate: "A".to_string()
            }
        );
        // 280 of 550 valid is 50.9%, even though it is under half of all 600 cast.
        assert_eq!(
            decide(&[("A", 280), ("B", 270)]),
            Decision::Winner {
                slate: "A".to_string()
            }
        );
    }

    #[test]
    fn exactly_half_goes_to_runoff() {
        assert_eq!(
            decide(&[("A", 50), ("B", 30), ("C", 20)]),
            Decision::RunoffRequired {
                slates: ["A".to_string(), "B".to_string()]
            }
        );
    }

    #[test]
    fn tie_for_first_is_escalated() {
        assert_eq!(
            decide(&[("A", 300), ("B", 300)]),
            Decision::TieDetected {
                rank: 1,
                slates: vec!["A".to_string(), "B".to_string()]
            }
        );
    }

    #[test]
    fn tie_for_second_is_escalated() {
        assert_eq!(
            decide(&[("A", 40), ("B", 30), ("C", 30)]),
            Decision::TieDetected {
                rank: 2,
                slates: vec!["B".to_string(), "C".to_string()]
            }
        );
    }

    #[test]
    fn quorum_miss_overrides_everything() {
        let ranking = rank(&slates(&[("A", 290), ("B", 10)]));
        assert_eq!(
            resolve(&ranking, false, MajorityRule::Absolute),
            Decision::NoWinner {
                reason: NoWinnerReason::QuorumNotMet
            }
        );
    }

    #[test]
    fn no_valid_votes() {
        assert_eq!(
            decide(&[("A", 0), ("B", 0)]),
            Decision::NoWinner {
                reason: NoWinnerReason::NoValidVotes
            }
        );
    }

    #[test]
    fn qualified_majority() {
        let ranking = rank(&slates(&[("A", 60), ("B", 40)]));
        let rule = MajorityRule::Qualified(Percentage::from_bps(6000));
        assert_eq!(
            resolve(&ranking, true, rule),
            Decision::RunoffRequired {
                slates: ["A".to_string(), "B".to_string()]
            }
        );
        let rule = MajorityRule::Qualified(Percentage::from_bps(5999));
        assert!(resolve(&ranking, true, rule).winner().is_some());
    }

    #[test]
    fn lone_slate_without_opponent() {
        let ranking = rank(&slates(&[("A", 10)]));
        let rule = MajorityRule::Qualified(Percentage::FULL);
        assert_eq!(
            resolve(&ranking, true, rule),
            Decision::NoWinner {
                reason: NoWinnerReason::NoRunoffOpponent
            }
        );
    }
}

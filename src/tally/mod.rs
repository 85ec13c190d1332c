//! The tally engine.
//!
//! Control flow for one session: open, cast, close ([`sessions`]), then a
//! single tally ([`aggregator`]) which runs statistics, resolution and the
//! integrity hasher over the aggregated counts. Recounts ([`recount`]) and
//! the result lifecycle ([`lifecycle`]) act on the committed tally afterwards.

mod aggregator;
mod fingerprint;
mod lifecycle;
mod recount;
mod resolver;
mod sessions;
mod statistics;

use std::sync::Arc;

use crate::collaborators::{ElectionParameters, EligibilityRoll, VotingCalendar};
use crate::config::Config;
use crate::crypto::{Fingerprint, GrantAuthority, KeyRing, VoterPseudonymiser};
use crate::error::Result;
use crate::model::common::{Decision, MajorityRule, Percentage, SessionId};
use crate::model::db::TallyCounts;
use crate::store::TallyStore;

pub use aggregator::aggregate;
pub use fingerprint::{closing_fingerprint, fingerprint, still_matches};
pub use lifecycle::{Complaint, Resolution};
pub use recount::RecountAuthorization;
pub use resolver::{rank, resolve, RankedSlate};
pub use statistics::{compute_statistics, Statistics};

/// Everything derived from one set of counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyResult {
    pub counts: TallyCounts,
    pub statistics: Statistics,
    pub quorum_threshold: Percentage,
    pub majority_rule: MajorityRule,
    pub ranking: Vec<RankedSlate>,
    pub decision: Decision,
    pub fingerprint: Fingerprint,
}

/// Run statistics, resolution and the integrity hasher over a session's counts.
pub fn compute(
    session_id: SessionId,
    counts: TallyCounts,
    quorum_threshold: Percentage,
    majority_rule: MajorityRule,
) -> Result<TallyResult> {
    let statistics = compute_statistics(
        counts.eligible_voters(),
        counts.ballots_cast(),
        counts.blank(),
        counts.null(),
        quorum_threshold,
    )?;
    let ranking = rank(counts.per_slate());
    let decision = resolve(&ranking, statistics.quorum_met, majority_rule);
    let fingerprint = fingerprint(session_id, &counts, &decision);

    Ok(TallyResult {
        counts,
        statistics,
        quorum_threshold,
        majority_rule,
        ranking,
        decision,
        fingerprint,
    })
}

/// External services the engine consults.
#[derive(Clone)]
pub struct Collaborators {
    pub roll: Arc<dyn EligibilityRoll>,
    pub parameters: Arc<dyn ElectionParameters>,
    pub calendar: Arc<dyn VotingCalendar>,
}

/// The engine. Cheap to clone; clones share the store and key custody.
pub struct TallyEngine<S> {
    store: Arc<S>,
    collaborators: Collaborators,
    keys: Arc<KeyRing>,
    /// Only ever verifies: grants are issued by the supervising authority.
    grants: Arc<GrantAuthority>,
    pseudonyms: Arc<VoterPseudonymiser>,
}

impl<S> Clone for TallyEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            collaborators: self.collaborators.clone(),
            keys: self.keys.clone(),
            grants: self.grants.clone(),
            pseudonyms: self.pseudonyms.clone(),
        }
    }
}

impl<S: TallyStore> TallyEngine<S> {
    pub fn new(store: S, collaborators: Collaborators, config: &Config) -> Self {
        Self {
            store: Arc::new(store),
            collaborators,
            keys: Arc::new(KeyRing::new()),
            grants: Arc::new(GrantAuthority::new(config.hmac_secret())),
            pseudonyms: Arc::new(VoterPseudonymiser::new(config.hmac_secret())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::common::NoWinnerReason;

    fn counts(eligible: u64, blank: u64, null: u64, slates: &[(&str, u64)]) -> TallyCounts {
        let per_slate: BTreeMap<_, _> = slates.iter().map(|(id, v)| (id.to_string(), *v)).collect();
        let cast = blank + null + per_slate.values().sum::<u64>();
        TallyCounts::new(eligible, cast, blank, null, per_slate).unwrap()
    }

    fn decide(counts: TallyCounts) -> Decision {
        compute(1, counts, Percentage::HALF, MajorityRule::Absolute)
            .unwrap()
            .decision
    }

    #[test]
    fn clear_majority() {
        let result = compute(
            1,
            counts(1000, 0, 0, &[("A", 310), ("B", 290)]),
            Percentage::HALF,
            MajorityRule::Absolute,
        )
        .unwrap();
        assert_eq!(result.statistics.participation, Percentage::from_bps(6000));
        assert!(result.statistics.quorum_met);
        assert_eq!(result.statistics.valid_votes, 600);
        assert_eq!(result.ranking[0].share, Percentage::from_bps(5167));
        assert_eq!(
            result.decision,
            Decision::Winner {
                slate: "A".to_string()
            }
        );
        assert_eq!(
            result.fingerprint,
            fingerprint(1, &result.counts, &result.decision)
        );
    }

    #[test]
    fn majority_is_of_valid_votes() {
        assert_eq!(
            decide(counts(1000, 30, 20, &[("A", 280), ("B", 270)])),
            Decision::Winner {
                slate: "A".to_string()
            }
        );
    }

    #[test]
    fn top_tie() {
        assert_eq!(
            decide(counts(1000, 0, 0, &[("A", 300), ("B", 300)])),
            Decision::TieDetected {
                rank: 1,
                slates: vec!["A".to_string(), "B".to_string()]
            }
        );
    }

    #[test]
    fn quorum_miss() {
        let result = compute(
            1,
            counts(1000, 0, 0, &[("A", 290), ("B", 10)]),
            Percentage::HALF,
            MajorityRule::Absolute,
        )
        .unwrap();
        assert_eq!(result.statistics.participation, Percentage::from_bps(3000));
        assert_eq!(
            result.decision,
            Decision::NoWinner {
                reason: NoWinnerReason::QuorumNotMet
            }
        );
    }

    #[test]
    fn exactly_half_of_valid_votes() {
        assert!(decide(counts(1000, 5, 5, &[("A", 300), ("B", 200), ("C", 100)])).runoff_required());
    }

    #[test]
    fn deterministic() {
        let first = compute(3, TallyCounts::example(), Percentage::HALF, MajorityRule::Absolute).unwrap();
        let second = compute(3, TallyCounts::example(), Percentage::HALF, MajorityRule::Absolute).unwrap();
        assert_eq!(first, second);
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::Fingerprint;
use crate::model::common::{
    Decision, ElectionId, MajorityRule, Percentage, Region, ResultStatus, SessionId, SlateId,
    TallyId,
};
use crate::model::db::{SessionTally, SlateTally, TallyCounts};
use crate::tally;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Slate votes plus blanks and nulls do not add up to the ballots cast.
    #[error("Counted {counted} ballots but {cast} were cast")]
    Conservation { counted: u64, cast: u64 },
    #[error("{claimed} valid votes claimed, but the counts give {expected}")]
    ValidVotes { claimed: u64, expected: u64 },
    /// A derived statistic does not follow from the counts.
    #[error("{field} is {claimed}, but the counts give {recomputed}")]
    Statistic {
        field: &'static str,
        claimed: String,
        recomputed: String,
    },
    /// A slate row's share, rank or flags do not follow from the counts.
    #[error("The row for slate {slate_id} does not match the counts")]
    Slate { slate_id: SlateId },
    #[error("The decision \"{claimed}\" does not follow from the counts, which give \"{recomputed}\"")]
    Decision {
        claimed: Decision,
        recomputed: Decision,
    },
    #[error("The fingerprint does not match the published result")]
    Fingerprint,
}

/// Everything published about one session tally, sufficient to re-verify it
/// independently of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyProjection {
    pub tally_id: TallyId,
    pub session_id: SessionId,
    pub election_id: ElectionId,
    pub region: Region,
    pub round: u32,
    pub status: ResultStatus,
    pub eligible_voters: u64,
    pub ballots_cast: u64,
    pub blank: u64,
    pub null: u64,
    pub valid: u64,
    pub participation: Percentage,
    pub abstention: Percentage,
    pub quorum_threshold: Percentage,
    pub quorum_met: bool,
    pub majority_rule: MajorityRule,
    /// In rank order.
    pub slates: Vec<SlateTally>,
    pub decision: Decision,
    pub fingerprint: Fingerprint,
    pub computed_at: DateTime<Utc>,
}

impl From<&SessionTally> for TallyProjection {
    fn from(tally: &SessionTally) -> Self {
        let counts = tally.counts();
        Self {
            tally_id: tally.id,
            session_id: tally.session_id,
            election_id: tally.election_id,
            region: tally.region.clone(),
            round: tally.round,
            status: tally.status(),
            eligible_voters: counts.eligible_voters(),
            ballots_cast: counts.ballots_cast(),
            blank: counts.blank(),
            null: counts.null(),
            valid: counts.valid(),
            participation: tally.participation,
            abstention: tally.abstention,
            quorum_threshold: tally.quorum_threshold,
            quorum_met: tally.quorum_met,
            majority_rule: tally.majority_rule,
            slates: tally.slates().to_vec(),
            decision: tally.decision().clone(),
            fingerprint: tally.fingerprint().clone(),
            computed_at: tally.computed_at,
        }
    }
}

fn check_statistic<T: PartialEq + ToString>(
    field: &'static str,
    claimed: T,
    recomputed: T,
) -> Result<(), VerificationError> {
    if claimed == recomputed {
        Ok(())
    } else {
        Err(VerificationError::Statistic {
            field,
            claimed: claimed.to_string(),
            recomputed: recomputed.to_string(),
        })
    }
}

impl TallyProjection {
    /// Recompute every derived figure from the raw counts and check it
    /// against what was published.
    pub fn verify(&self) -> Result<(), VerificationError> {
        // Conservation.
        let counted = self
            .slates
            .iter()
            .fold(self.blank.saturating_add(self.null), |acc, s| {
                acc.saturating_add(s.votes)
            });
        let conservation = VerificationError::Conservation {
            counted,
            cast: self.ballots_cast,
        };
        let per_slate: BTreeMap<SlateId, u64> = self
            .slates
            .iter()
            .map(|s| (s.slate_id.clone(), s.votes))
            .collect();
        if per_slate.len() != self.slates.len() {
            return Err(conservation);
        }
        let counts = TallyCounts::new(
            self.eligible_voters,
            self.ballots_cast,
            self.blank,
            self.null,
            per_slate,
        )
        .map_err(|_| conservation.clone())?;
        if counts.valid() != self.valid {
            return Err(VerificationError::ValidVotes {
                claimed: self.valid,
                expected: counts.valid(),
            });
        }

        // Statistics.
        let result = tally::compute(
            self.session_id,
            counts,
            self.quorum_threshold,
            self.majority_rule,
        )
        .map_err(|_| conservation)?;
        check_statistic(
            "participation",
            self.participation,
            result.statistics.participation,
        )?;
        check_statistic("abstention", self.abstention, result.statistics.abstention)?;
        check_statistic("quorum_met", self.quorum_met, result.statistics.quorum_met)?;

        // Ranking and slate flags.
        for (row, ranked) in self.slates.iter().zip(&result.ranking) {
            let consistent = row.slate_id == ranked.slate_id
                && row.votes == ranked.votes
                && row.share == ranked.share
                && row.rank == ranked.rank
                && row.winner == (result.decision.winner() == Some(&row.slate_id))
                && row.runoff == result.decision.runoff_candidates().contains(&row.slate_id);
            if !consistent {
                return Err(VerificationError::Slate {
                    slate_id: row.slate_id.clone(),
                });
            }
        }

        // Decision and fingerprint.
        if self.decision != result.decision {
            return Err(VerificationError::Decision {
                claimed: self.decision.clone(),
                recomputed: result.decision,
            });
        }
        if self.fingerprint != result.fingerprint {
            return Err(VerificationError::Fingerprint);
        }
        Ok(())
    }
}

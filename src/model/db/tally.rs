use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::Fingerprint;
use crate::error::{Error, Result};
use crate::model::common::{
    Decision, ElectionId, MajorityRule, Percentage, Region, ResultStatus, SessionId, SlateId,
    TallyId, Transition,
};
use crate::model::db::VotingSession;
use crate::tally::TallyResult;

/// Raw ballot counts for one session.
///
/// Only constructible through [`TallyCounts::new`], which enforces
/// conservation: every cast ballot is counted exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CountsRecord", into = "CountsRecord")]
pub struct TallyCounts {
    eligible_voters: u64,
    ballots_cast: u64,
    blank: u64,
    null: u64,
    per_slate: BTreeMap<SlateId, u64>,
}

impl TallyCounts {
    /// Validate and assemble counts.
    pub fn new(
        eligible_voters: u64,
        ballots_cast: u64,
        blank: u64,
        null: u64,
        per_slate: BTreeMap<SlateId, u64>,
    ) -> Result<Self> {
        let counted = per_slate
            .values()
            .try_fold(blank, |acc, votes| acc.checked_add(*votes))
            .and_then(|acc| acc.checked_add(null))
            .unwrap_or(u64::MAX);
        if counted != ballots_cast {
            return Err(Error::CountMismatch {
                counted,
                cast: ballots_cast,
            });
        }
        Ok(Self {
            eligible_voters,
            ballots_cast,
            blank,
            null,
            per_slate,
        })
    }

    pub fn eligible_voters(&self) -> u64 {
        self.eligible_voters
    }

    pub fn ballots_cast(&self) -> u64 {
        self.ballots_cast
    }

    pub fn blank(&self) -> u64 {
        self.blank
    }

    pub fn null(&self) -> u64 {
        self.null
    }

    /// Ballots for an eligible slate.
    pub fn valid(&self) -> u64 {
        self.ballots_cast - self.blank - self.null
    }

    /// Votes per eligible slate, ordered by slate ID.
    pub fn per_slate(&self) -> &BTreeMap<SlateId, u64> {
        &self.per_slate
    }

    /// Compare field by field against another count of the same session.
    pub fn diff(&self, other: &TallyCounts) -> Vec<FieldDivergence> {
        let mut divergences = Vec::new();
        let mut check = |field: String, original: u64, recounted: u64| {
            if original != recounted {
                divergences.push(FieldDivergence {
                    field,
                    original: original.to_string(),
                    recounted: recounted.to_string(),
                });
            }
        };
        check("eligible_voters".into(), self.eligible_voters, other.eligible_voters);
        check("ballots_cast".into(), self.ballots_cast, other.ballots_cast);
        check("blank".into(), self.blank, other.blank);
        check("null".into(), self.null, other.null);
        check("valid".into(), self.valid(), other.valid());
        let slates: BTreeSet<&SlateId> = self.per_slate.keys().chain(other.per_slate.keys()).collect();
        for slate in slates {
            check(
                format!("slate:{slate}"),
                self.per_slate.get(slate).copied().unwrap_or(0),
                other.per_slate.get(slate).copied().unwrap_or(0),
            );
        }
        divergences
    }
}

/// Serialised form of [`TallyCounts`]; checked on the way back in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CountsRecord {
    eligible_voters: u64,
    ballots_cast: u64,
    blank: u64,
    null: u64,
    valid: u64,
    per_slate: BTreeMap<SlateId, u64>,
}

impl TryFrom<CountsRecord> for TallyCounts {
    type Error = Error;

    fn try_from(record: CountsRecord) -> Result<Self> {
        let counts = Self::new(
            record.eligible_voters,
            record.ballots_cast,
            record.blank,
            record.null,
            record.per_slate,
        )?;
        if counts.valid() != record.valid {
            return Err(Error::CountMismatch {
                counted: counts.valid(),
                cast: record.valid,
            });
        }
        Ok(counts)
    }
}

impl From<TallyCounts> for CountsRecord {
    fn from(counts: TallyCounts) -> Self {
        Self {
            valid: counts.valid(),
            eligible_voters: counts.eligible_voters,
            ballots_cast: counts.ballots_cast,
            blank: counts.blank,
            null: counts.null,
            per_slate: counts.per_slate,
        }
    }
}

/// One field that differs between an original tally and its recount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDivergence {
    pub field: String,
    pub original: String,
    pub recounted: String,
}

/// Per-slate result row. Written once per tally run, never partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlateTally {
    pub slate_id: SlateId,
    pub votes: u64,
    /// Share of the valid votes.
    pub share: Percentage,
    /// Competition rank: equal counts share a rank.
    pub rank: u32,
    pub eligible: bool,
    pub winner: bool,
    pub runoff: bool,
}

/// Core session tally data, as stored.
///
/// Counts, decision and fingerprint are fixed at construction; the only
/// mutable part is the lifecycle status, through [`TallyCore::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyCore {
    pub session_id: SessionId,
    pub election_id: ElectionId,
    pub region: Region,
    pub round: u32,
    counts: TallyCounts,
    pub participation: Percentage,
    pub abstention: Percentage,
    pub quorum_threshold: Percentage,
    pub quorum_met: bool,
    pub majority_rule: MajorityRule,
    /// Rows for every eligible slate, in rank order.
    slates: Vec<SlateTally>,
    decision: Decision,
    fingerprint: Fingerprint,
    status: ResultStatus,
    pub computed_at: DateTime<Utc>,
}

impl TallyCore {
    /// Assemble a freshly computed tally for the given session.
    pub fn computed(session: &VotingSession, result: TallyResult, computed_at: DateTime<Utc>) -> Self {
        let slates = result
            .ranking
            .iter()
            .map(|ranked| SlateTally {
                slate_id: ranked.slate_id.clone(),
                votes: ranked.votes,
                share: ranked.share,
                rank: ranked.rank,
                eligible: session.is_eligible_slate(&ranked.slate_id),
                winner: result.decision.winner() == Some(&ranked.slate_id),
                runoff: result.decision.runoff_candidates().contains(&ranked.slate_id),
            })
            .collect();

        Self {
            session_id: session.id,
            election_id: session.election_id,
            region: session.region.clone(),
            round: session.round,
            counts: result.counts,
            participation: result.statistics.participation,
            abstention: result.statistics.abstention,
            quorum_threshold: result.quorum_threshold,
            quorum_met: result.statistics.quorum_met,
            majority_rule: result.majority_rule,
            slates,
            decision: result.decision,
            fingerprint: result.fingerprint,
            status: ResultStatus::Computed,
            computed_at,
        }
    }

    pub fn counts(&self) -> &TallyCounts {
        &self.counts
    }

    pub fn slates(&self) -> &[SlateTally] {
        &self.slates
    }

    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    /// The fingerprint recorded at computation time.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn status(&self) -> ResultStatus {
        self.status
    }

    pub fn winner(&self) -> Option<&SlateId> {
        self.decision.winner()
    }

    pub fn runoff_required(&self) -> bool {
        self.decision.runoff_required()
    }

    pub fn runoff_candidates(&self) -> &[SlateId] {
        self.decision.runoff_candidates()
    }

    /// Move the lifecycle status, validated by the result state machine.
    pub fn apply(&mut self, transition: Transition) -> Result<ResultStatus> {
        let next = self
            .status
            .apply(transition)
            .ok_or(Error::InvalidTransition {
                from: self.status,
                transition,
            })?;
        self.status = next;
        Ok(next)
    }
}

/// A tally ready for insertion is just [`TallyCore`].
pub type NewSessionTally = TallyCore;

/// A session tally from the store, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTally {
    pub id: TallyId,
    #[serde(flatten)]
    pub tally: TallyCore,
}

impl Deref for SessionTally {
    type Target = TallyCore;

    fn deref(&self) -> &Self::Target {
        &self.tally
    }
}

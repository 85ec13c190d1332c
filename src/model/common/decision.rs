use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::model::common::{Percentage, SlateId};

/// The rule a slate's share of valid votes must satisfy to win outright.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MajorityRule {
    /// Strictly more than half of the valid votes.
    Absolute,
    /// Strictly more than the given share of the valid votes.
    Qualified(Percentage),
}

impl MajorityRule {
    /// The share that must be strictly exceeded.
    pub fn threshold(self) -> Percentage {
        match self {
            Self::Absolute => Percentage::HALF,
            Self::Qualified(threshold) => threshold,
        }
    }
}

impl Default for MajorityRule {
    fn default() -> Self {
        Self::Absolute
    }
}

/// Why no slate was (or could be) declared.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoWinnerReason {
    /// Participation fell below the quorum threshold.
    QuorumNotMet,
    /// Every ballot was blank or null.
    NoValidVotes,
    /// The only slate standing missed the majority rule and has nobody to face in a runoff.
    NoRunoffOpponent,
}

impl Display for NoWinnerReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuorumNotMet => f.write_str("quorum not met"),
            Self::NoValidVotes => f.write_str("no valid votes"),
            Self::NoRunoffOpponent => f.write_str("no runoff opponent"),
        }
    }
}

/// The result-determination outcome for one session.
///
/// Ties and quorum misses are first-class outcomes, not errors: they are
/// escalated to humans and never resolved by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    /// The slate satisfied the majority rule.
    Winner { slate: SlateId },
    /// No slate satisfied the majority rule; the two best placed go to a runoff.
    RunoffRequired { slates: [SlateId; 2] },
    /// Slates share a rank that decides the outcome (1 for the win, 2 for the
    /// second runoff place). Must be adjudicated externally.
    TieDetected { rank: u32, slates: Vec<SlateId> },
    /// No result can be declared.
    NoWinner { reason: NoWinnerReason },
}

impl Decision {
    /// The winning slate, if any.
    pub fn winner(&self) -> Option<&SlateId> {
        match self {
            Self::Winner { slate } => Some(slate),
            _ => None,
        }
    }

    /// Is a runoff required?
    pub fn runoff_required(&self) -> bool {
        matches!(self, Self::RunoffRequired { .. })
    }

    /// The slates going to a runoff; empty unless one is required.
    pub fn runoff_candidates(&self) -> &[SlateId] {
        match self {
            Self::RunoffRequired { slates } => slates,
            _ => &[],
        }
    }

    /// Does this outcome need to be escalated for adjudication?
    pub fn needs_adjudication(&self) -> bool {
        matches!(self, Self::TieDetected { .. })
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Winner { slate } => write!(f, "winner: {slate}"),
            Self::RunoffRequired { slates: [first, second] } => {
                write!(f, "runoff required between {first} and {second}")
            }
            Self::TieDetected { rank, slates } => {
                write!(f, "tie detected at rank {rank} between {}", slates.join(", "))
            }
            Self::NoWinner { reason } => write!(f, "no winner: {reason}"),
        }
    }
}

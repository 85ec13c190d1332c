use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::Fingerprint;
use crate::model::common::{Decision, ElectionId, Region, SessionId, SlateId, TallyId};
use crate::model::db::SessionTally;

/// A homologated result, as consumed by diplomation and runoff scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertifiedResult {
    pub tally_id: TallyId,
    pub session_id: SessionId,
    pub election_id: ElectionId,
    pub region: Region,
    pub round: u32,
    pub decision: Decision,
    /// The slate to be diplomated, if any.
    pub winner: Option<SlateId>,
    /// The slates going to a runoff; empty unless one is required.
    pub runoff: Vec<SlateId>,
    pub fingerprint: Fingerprint,
    pub computed_at: DateTime<Utc>,
}

impl From<&SessionTally> for CertifiedResult {
    fn from(tally: &SessionTally) -> Self {
        Self {
            tally_id: tally.id,
            session_id: tally.session_id,
            election_id: tally.election_id,
            region: tally.region.clone(),
            round: tally.round,
            decision: tally.decision().clone(),
            winner: tally.winner().cloned(),
            runoff: tally.runoff_candidates().to_vec(),
            fingerprint: tally.fingerprint().clone(),
            computed_at: tally.computed_at,
        }
    }
}

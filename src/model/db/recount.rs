use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::Fingerprint;
use crate::model::common::{Decision, RecountId, SessionId, TallyId};
use crate::model::db::{FieldDivergence, TallyCounts};

/// Core recount run data, as stored. Append-only; never touches the original tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecountCore {
    /// The tally being checked.
    pub tally_id: TallyId,
    pub session_id: SessionId,
    /// Who requested the recount.
    pub requested_by: String,
    /// Who issued the re-identification grant it ran under.
    pub authorized_by: String,
    pub counts: TallyCounts,
    pub decision: Decision,
    pub fingerprint: Fingerprint,
    /// Fields that differ from the original; empty when the result is confirmed.
    pub divergences: Vec<FieldDivergence>,
    pub completed_at: DateTime<Utc>,
}

impl RecountCore {
    pub fn divergent(&self) -> bool {
        !self.divergences.is_empty()
    }
}

/// A recount run ready for insertion is just [`RecountCore`].
pub type NewRecountRun = RecountCore;

/// A recount run from the store, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecountRun {
    pub id: RecountId,
    #[serde(flatten)]
    pub run: RecountCore,
}

impl Deref for RecountRun {
    type Target = RecountCore;

    fn deref(&self) -> &Self::Target {
        &self.run
    }
}

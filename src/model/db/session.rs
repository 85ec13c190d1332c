use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::Fingerprint;
use crate::model::common::{CalendarId, ElectionId, Region, SessionId, SessionStatus, SlateId};

/// Core voting session data, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCore {
    /// Electoral calendar this session belongs to.
    pub calendar_id: CalendarId,
    /// Election whose parameters govern this session.
    pub election_id: ElectionId,
    pub region: Region,
    /// 1 for the first round, 2 for a runoff.
    pub round: u32,
    /// Slates that may legitimately receive votes.
    pub slates: Vec<SlateId>,
    pub status: SessionStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Binds the session ID, close time and accepted ballot count.
    pub closing_fingerprint: Option<Fingerprint>,
    /// Exclusive tally claim; set while a tally is running.
    pub tally_claimed_at: Option<DateTime<Utc>>,
}

impl SessionCore {
    /// Create a new open session.
    pub fn new(
        calendar_id: CalendarId,
        election_id: ElectionId,
        region: impl Into<Region>,
        round: u32,
        slates: impl IntoIterator<Item = SlateId>,
    ) -> Self {
        Self {
            calendar_id,
            election_id,
            region: region.into(),
            round,
            slates: slates.into_iter().collect(),
            status: SessionStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
            closing_fingerprint: None,
            tally_claimed_at: None,
        }
    }

    /// Is this slate on the session's eligible list?
    pub fn is_eligible_slate(&self, slate: &str) -> bool {
        self.slates.iter().any(|s| s == slate)
    }

    /// Do two sessions compete for the same (calendar, region, round) slot?
    pub fn same_slot(&self, other: &SessionCore) -> bool {
        self.calendar_id == other.calendar_id
            && self.region == other.region
            && self.round == other.round
    }
}

/// A session without an ID.
pub type NewSession = SessionCore;

/// A voting session from the store, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSession {
    pub id: SessionId,
    #[serde(flatten)]
    pub session: SessionCore,
}

impl Deref for VotingSession {
    type Target = SessionCore;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl DerefMut for VotingSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl SessionCore {
        pub fn example() -> Self {
            Self::new(1, 1, "north", 1, ["A".to_string(), "B".to_string()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_ignores_election_and_slates() {
        let a = SessionCore::example();
        let mut b = SessionCore::example();
        b.election_id = 2;
        b.slates.clear();
        assert!(a.same_slot(&b));
        b.round = 2;
        assert!(!a.same_slot(&b));
    }

    #[test]
    fn eligible_slates() {
        let session = SessionCore::example();
        assert!(session.is_eligible_slate("A"));
        assert!(!session.is_eligible_slate("Z"));
    }
}

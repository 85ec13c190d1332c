use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{SealedChoice, VoterRef};
use crate::model::common::{BallotId, SessionId};

/// Core ballot data, as stored. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCore {
    /// Foreign key session ID.
    pub session_id: SessionId,
    /// Voter pseudonym, used only to refuse a second ballot.
    pub voter: VoterRef,
    pub cast_at: DateTime<Utc>,
    /// The encrypted choice.
    pub sealed: SealedChoice,
}

/// A ballot ready for insertion is just [`BallotCore`].
pub type NewBallot = BallotCore;

/// A ballot from the store, with its unique ID and receipt protocol number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub id: BallotId,
    /// Receipt protocol number, unique within the session.
    pub protocol: String,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Ballot {
    /// Format the protocol number for the `seq`-th ballot of a session.
    pub fn protocol_number(session_id: SessionId, seq: u64) -> String {
        format!("{session_id:06}-{seq:08}")
    }
}

impl Deref for Ballot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}

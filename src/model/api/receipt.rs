use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::Fingerprint;
use crate::model::common::SessionId;
use crate::model::db::Ballot;

/// A voter's receipt. Proves a ballot was recorded without revealing the choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub session_id: SessionId,
    /// Protocol number, unique within the session.
    pub protocol: String,
    pub cast_at: DateTime<Utc>,
    /// Digest of the sealed choice as stored.
    pub sealed_digest: Fingerprint,
}

impl From<&Ballot> for Receipt {
    fn from(ballot: &Ballot) -> Self {
        Self {
            session_id: ballot.session_id,
            protocol: ballot.protocol.clone(),
            cast_at: ballot.cast_at,
            sealed_digest: ballot.sealed.digest(),
        }
    }
}

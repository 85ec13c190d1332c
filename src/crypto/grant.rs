use data_encoding::HEXLOWER;
use hmac::Mac;
use serde::{Deserialize, Serialize};

use crate::crypto::HmacSha256;
use crate::model::common::{SessionId, TallyId};

const GRANT_LABEL: &[u8] = b"reidentification-grant";

/// Explicit permission to re-decrypt the ballots behind one tally, issued by
/// the supervising authority. Ballots are never re-read without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReidentificationGrant {
    pub tally_id: TallyId,
    pub session_id: SessionId,
    /// Who issued the grant.
    pub issued_by: String,
    /// Hex HMAC over the fields above.
    pub signature: String,
}

/// Proof that a grant was checked. Only [`GrantAuthority::verify`] makes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedGrant {
    tally_id: TallyId,
    session_id: SessionId,
    issued_by: String,
}

impl VerifiedGrant {
    pub fn tally_id(&self) -> TallyId {
        self.tally_id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn issued_by(&self) -> &str {
        &self.issued_by
    }
}

/// Issues and checks re-identification grants with a shared secret.
pub struct GrantAuthority {
    secret: Vec<u8>,
}

impl GrantAuthority {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: secret.to_vec(),
        }
    }

    fn mac(&self, tally_id: TallyId, session_id: SessionId, issued_by: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(GRANT_LABEL);
        mac.update(&tally_id.to_le_bytes());
        mac.update(&session_id.to_le_bytes());
        mac.update(issued_by.as_bytes());
        mac
    }

    /// Issue a grant covering the given tally.
    pub fn issue(
        &self,
        tally_id: TallyId,
        session_id: SessionId,
        issued_by: impl Into<String>,
    ) -> ReidentificationGrant {
        let issued_by = issued_by.into();
        let signature = self.mac(tally_id, session_id, &issued_by).finalize();
        ReidentificationGrant {
            tally_id,
            session_id,
            signature: HEXLOWER.encode(&signature.into_bytes()),
            issued_by,
        }
    }

    /// Check a grant's signature in constant time.
    pub fn verify(&self, grant: &ReidentificationGrant) -> Option<VerifiedGrant> {
        let signature = HEXLOWER.decode(grant.signature.as_bytes()).ok()?;
        self.mac(grant.tally_id, grant.session_id, &grant.issued_by)
            .verify_slice(&signature)
            .ok()?;
        Some(VerifiedGrant {
            tally_id: grant.tally_id,
            session_id: grant.session_id,
            issued_by: grant.issued_by.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_grants_verify() {
        let authority = GrantAuthority::new(b"secret");
        let grant = authority.issue(3, 7, "electoral board");
        let verified = authority.verify(&grant).unwrap();
        assert_eq!(verified.tally_id(), 3);
        assert_eq!(verified.session_id(), 7);
        assert_eq!(verified.issued_by(), "electoral board");
    }

    #[test]
    fn forged_grants_are_rejected() {
        let authority = GrantAuthority::new(b"secret");
        let mut grant = authority.issue(3, 7, "electoral board");
        grant.tally_id = 4;
        assert!(authority.verify(&grant).is_none());

        let other = GrantAuthority::new(b"other secret").issue(3, 7, "electoral board");
        assert!(authority.verify(&other).is_none());

        let mut garbled = authority.issue(3, 7, "electoral board");
        garbled.signature = "not hex".to_string();
        assert!(authority.verify(&garbled).is_none());
    }
}

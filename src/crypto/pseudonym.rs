use hmac::Mac;

use crate::crypto::HmacSha256;

const VOTER_LABEL: &[u8] = b"voter";

/// The stored stand-in for a voter: the HMAC of their roll reference.
/// Only used to prevent a second ballot, never joined to a choice.
pub type VoterRef = Vec<u8>;

/// Derives voter pseudonyms so the raw voter reference is never stored.
pub struct VoterPseudonymiser {
    secret: Vec<u8>,
}

impl VoterPseudonymiser {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: secret.to_vec(),
        }
    }

    pub fn pseudonym(&self, voter: &str) -> VoterRef {
        let mut hmac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        hmac.update(VOTER_LABEL);
        hmac.update(voter.as_bytes());
        hmac.finalize().into_bytes().to_vec()
    }
}

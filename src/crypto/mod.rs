//! Cryptographic building blocks: ballot sealing, key custody,
//! re-identification grants, voter pseudonyms and fingerprints.

mod fingerprint;
mod grant;
mod keyring;
mod pseudonym;
mod sealing;

use hmac::Hmac;
use sha2::Sha256;

pub use fingerprint::{CanonicalHasher, Fingerprint};
pub use grant::{GrantAuthority, ReidentificationGrant, VerifiedGrant};
pub use keyring::KeyRing;
pub use pseudonym::{VoterPseudonymiser, VoterRef};
pub use sealing::{SealedChoice, SessionKey};

pub type HmacSha256 = Hmac<Sha256>;

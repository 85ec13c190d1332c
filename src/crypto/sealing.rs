use std::fmt::{Debug, Formatter};

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::Fingerprint;
use crate::model::common::{Choice, SessionId};

pub const KEY_LENGTH: usize = 32;
pub const NONCE_LENGTH: usize = 12;

/// Per-session symmetric key used to seal ballot choices.
/// Generated when the session opens; wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_LENGTH]);

impl SessionKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut key = [0; KEY_LENGTH];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Seal a choice. The session ID is bound as associated data, so a
    /// sealed choice cannot be replayed into another session.
    pub fn seal(&self, session_id: SessionId, choice: &Choice) -> SealedChoice {
        let mut nonce = [0; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce);
        let plaintext = serde_json::to_vec(choice).expect("Serialisation is infallible");
        let aad = associated_data(session_id);
        let ciphertext = self
            .cipher()
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &plaintext,
                    aad: &aad,
                },
            )
            .expect("Encryption into a Vec is infallible");

        SealedChoice { nonce, ciphertext }
    }

    /// Open a sealed choice. Returns `None` if authentication fails or the
    /// plaintext is not a well-formed choice.
    pub fn open(&self, session_id: SessionId, sealed: &SealedChoice) -> Option<Choice> {
        let aad = associated_data(session_id);
        let plaintext = self
            .cipher()
            .decrypt(
                Nonce::from_slice(&sealed.nonce),
                Payload {
                    msg: &sealed.ciphertext,
                    aad: &aad,
                },
            )
            .ok()?;
        serde_json::from_slice(&plaintext).ok()
    }
}

impl Debug for SessionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

fn associated_data(session_id: SessionId) -> Vec<u8> {
    let mut aad = b"ballot".to_vec();
    aad.extend(session_id.to_le_bytes());
    aad
}

/// An opaque, authenticated-encrypted ballot choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedChoice {
    pub nonce: [u8; NONCE_LENGTH],
    pub ciphertext: Vec<u8>,
}

impl SealedChoice {
    /// Digest of the sealed payload, handed to the voter on their receipt.
    pub fn digest(&self) -> Fingerprint {
        let mut bytes = self.nonce.to_vec();
        bytes.extend(&self.ciphertext);
        Fingerprint::of(&bytes)
    }
}

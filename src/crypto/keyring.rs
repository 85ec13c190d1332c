use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::crypto::{SessionKey, VerifiedGrant};
use crate::model::common::SessionId;

#[derive(Default)]
struct Keys {
    /// Keys usable for routine reads (the one tally per session).
    active: HashMap<SessionId, SessionKey>,
    /// Retired keys, released only against a verified grant.
    escrow: HashMap<SessionId, SessionKey>,
}

/// Custody of per-session ballot keys.
#[derive(Default)]
pub struct KeyRing {
    keys: Mutex<Keys>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and hold a key for a newly opened session.
    pub async fn issue(&self, session_id: SessionId) -> SessionKey {
        let key = SessionKey::generate();
        self.keys.lock().await.active.insert(session_id, key.clone());
        key
    }

    /// The active key for routine use, if the session has not been retired.
    pub async fn active(&self, session_id: SessionId) -> Option<SessionKey> {
        self.keys.lock().await.active.get(&session_id).cloned()
    }

    /// Take the session's key out of routine use and into escrow.
    pub async fn retire(&self, session_id: SessionId) {
        let mut keys = self.keys.lock().await;
        if let Some(key) = keys.active.remove(&session_id) {
            keys.escrow.insert(session_id, key);
            debug!("Retired ballot key for session {session_id} into escrow");
        }
    }

    /// Release an escrowed key under a verified grant for that session.
    pub async fn release_escrowed(&self, grant: &VerifiedGrant) -> Option<SessionKey> {
        let key = self
            .keys
            .lock()
            .await
            .escrow
            .get(&grant.session_id())
            .cloned();
        if key.is_some() {
            info!(
                "Released escrowed key for session {} under grant for tally {}",
                grant.session_id(),
                grant.tally_id()
            );
        }
        key
    }
}

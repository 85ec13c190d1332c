//! Domain events. The engine never delivers them itself: every operation
//! returns its events alongside its value, and the caller hands them to a
//! dispatcher of its choosing.

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::crypto::Fingerprint;
use crate::model::common::{Decision, RecountId, SessionId, SlateId, TallyId};
use crate::model::db::FieldDivergence;

/// Who an event is meant for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// Fire-and-forget notification collaborator.
    Notification,
    /// Adjudication collaborator, which answers with a resolution.
    Adjudication,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    SessionClosed {
        session_id: SessionId,
        closed_at: DateTime<Utc>,
        ballot_count: u64,
        fingerprint: Fingerprint,
    },
    ResultComputed {
        tally_id: TallyId,
        session_id: SessionId,
        decision: Decision,
        fingerprint: Fingerprint,
    },
    TieDetected {
        tally_id: TallyId,
        session_id: SessionId,
        rank: u32,
        slates: Vec<SlateId>,
    },
    ResultContested {
        tally_id: TallyId,
        filed_by: String,
        grounds: String,
    },
    RecountConfirmed {
        tally_id: TallyId,
        recount_id: RecountId,
    },
    RecountDivergenceFound {
        tally_id: TallyId,
        recount_id: RecountId,
        divergences: Vec<FieldDivergence>,
    },
    ResultHomologated {
        tally_id: TallyId,
        fingerprint: Fingerprint,
    },
    ResultInvalidated {
        tally_id: TallyId,
    },
}

impl DomainEvent {
    pub fn audiences(&self) -> &'static [Audience] {
        match self {
            Self::TieDetected { .. } | Self::ResultContested { .. } => &[Audience::Adjudication],
            // A divergence leaves the result contested.
            Self::RecountDivergenceFound { .. } => {
                &[Audience::Notification, Audience::Adjudication]
            }
            _ => &[Audience::Notification],
        }
    }

    pub fn is_for(&self, audience: Audience) -> bool {
        self.audiences().contains(&audience)
    }
}

impl Display for DomainEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionClosed {
                session_id,
                ballot_count,
                ..
            } => write!(f, "session {session_id} closed with {ballot_count} ballots"),
            Self::ResultComputed {
                tally_id, decision, ..
            } => write!(f, "tally {tally_id} computed ({decision})"),
            Self::TieDetected {
                tally_id,
                rank,
                slates,
                ..
            } => write!(
                f,
                "tally {tally_id} tied at rank {rank} between {}",
                slates.join(", ")
            ),
            Self::ResultContested {
                tally_id, filed_by, ..
            } => write!(f, "tally {tally_id} contested by {filed_by}"),
            Self::RecountConfirmed {
                tally_id,
                recount_id,
            } => write!(f, "recount {recount_id} confirmed tally {tally_id}"),
            Self::RecountDivergenceFound {
                tally_id,
                recount_id,
                divergences,
            } => write!(
                f,
                "recount {recount_id} of tally {tally_id} diverged in {} field(s)",
                divergences.len()
            ),
            Self::ResultHomologated { tally_id, .. } => write!(f, "tally {tally_id} homologated"),
            Self::ResultInvalidated { tally_id } => write!(f, "tally {tally_id} invalidated"),
        }
    }
}

/// The value of an engine operation plus the events it raised.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "events must be handed to a dispatcher"]
pub struct Outcome<T> {
    pub value: T,
    pub events: Vec<DomainEvent>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: DomainEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Dispatch every event in order and return the value.
    pub async fn deliver(self, dispatcher: &dyn EventDispatcher) -> T {
        for event in &self.events {
            dispatcher.dispatch(event).await;
        }
        self.value
    }
}

/// Delivers events to collaborators. Delivery failures are the dispatcher's
/// own concern and never reach the engine.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, event: &DomainEvent);
}

/// Logs each event.
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl EventDispatcher for LogDispatcher {
    async fn dispatch(&self, event: &DomainEvent) {
        if event.is_for(Audience::Adjudication) {
            warn!("For adjudication: {event}");
        } else {
            info!("Event: {event}");
        }
    }
}

/// Keeps every event it is given.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    pub async fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }

    /// Drain the recorded events.
    pub async fn take(&self) -> Vec<DomainEvent> {
        std::mem::take(&mut *self.events.lock().await)
    }
}

#[async_trait]
impl EventDispatcher for RecordingDispatcher {
    async fn dispatch(&self, event: &DomainEvent) {
        self.events.lock().await.push(event.clone());
    }
}

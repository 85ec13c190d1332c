use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::events::{DomainEvent, Outcome};
use crate::model::api::{CertifiedResult, TallyProjection};
use crate::model::common::{ResultStatus, SessionId, TallyId, Transition};
use crate::model::db::SessionTally;
use crate::store::TallyStore;
use crate::tally::{still_matches, RecountAuthorization, TallyEngine};

/// A complaint against a computed result, from the complaint collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub filed_by: String,
    pub grounds: String,
}

/// The adjudication collaborator's answer to a tie or a contested result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution {
    /// The complaint is rejected; the result returns to `Computed`.
    Dismiss,
    /// Recount under the given authorization.
    OrderRecount(RecountAuthorization),
    /// The result is annulled.
    Invalidate,
}

impl<S: TallyStore> TallyEngine<S> {
    pub(super) async fn tally_record(&self, tally_id: TallyId) -> Result<SessionTally> {
        self.store
            .tally(tally_id)
            .await?
            .ok_or(Error::TallyNotFound(tally_id))
    }

    /// Apply a transition to the status the tally was read in.
    async fn transition(&self, tally: &SessionTally, transition: Transition) -> Result<SessionTally> {
        let updated = self
            .store
            .transition_tally(tally.id, tally.status(), transition)
            .await?;
        info!(
            "Tally {}: {} -> {} ({transition})",
            tally.id,
            tally.status(),
            updated.status()
        );
        Ok(updated)
    }

    /// Read-only projection of a tally, for publication.
    pub async fn result(&self, tally_id: TallyId) -> Result<TallyProjection> {
        Ok(TallyProjection::from(&self.tally_record(tally_id).await?))
    }

    pub async fn result_for_session(&self, session_id: SessionId) -> Result<Option<TallyProjection>> {
        Ok(self
            .store
            .tally_for_session(session_id)
            .await?
            .as_ref()
            .map(TallyProjection::from))
    }

    /// Approve a computed result, provided nothing changed since computation.
    ///
    /// A tie is never approved: it stays open until adjudication invalidates
    /// it or orders a recount.
    pub async fn homologate(&self, tally_id: TallyId) -> Result<Outcome<SessionTally>> {
        let tally = self.tally_record(tally_id).await?;
        if tally.decision().needs_adjudication() {
            return Err(Error::PendingAdjudication(tally_id));
        }
        if !still_matches(&tally) {
            error!("Tally {tally_id}: fingerprint no longer matches the stored counts");
            return Err(Error::FingerprintMismatch(tally_id));
        }
        let tally = self.transition(&tally, Transition::Homologate).await?;
        let event = DomainEvent::ResultHomologated {
            tally_id,
            fingerprint: tally.fingerprint().clone(),
        };
        Ok(Outcome::new(tally).with_event(event))
    }

    /// Record a complaint against a computed result.
    pub async fn contest(
        &self,
        tally_id: TallyId,
        complaint: Complaint,
    ) -> Result<Outcome<SessionTally>> {
        let tally = self.tally_record(tally_id).await?;
        let tally = self.transition(&tally, Transition::Contest).await?;
        Ok(Outcome::new(tally).with_event(DomainEvent::ResultContested {
            tally_id,
            filed_by: complaint.filed_by,
            grounds: complaint.grounds,
        }))
    }

    /// Act on an adjudication decision. Returns the tally in its new state.
    pub async fn apply_resolution(
        &self,
        tally_id: TallyId,
        resolution: Resolution,
    ) -> Result<Outcome<SessionTally>> {
        match resolution {
            Resolution::Dismiss => {
                let tally = self.tally_record(tally_id).await?;
                let recounts = self.store.recounts(tally_id).await?;
                if recounts.last().map_or(false, |r| r.divergent()) {
                    return Err(Error::UnresolvedDivergence(tally_id));
                }
                Ok(Outcome::new(self.transition(&tally, Transition::Dismiss).await?))
            }
            Resolution::OrderRecount(authorization) => {
                let recount = self.recount(tally_id, authorization).await?;
                let tally = self.tally_record(tally_id).await?;
                Ok(Outcome {
                    value: tally,
                    events: recount.events,
                })
            }
            Resolution::Invalidate => self.invalidate(tally_id).await,
        }
    }

    /// Annul a result. It can never be certified afterwards.
    pub async fn invalidate(&self, tally_id: TallyId) -> Result<Outcome<SessionTally>> {
        let tally = self.tally_record(tally_id).await?;
        let tally = self.transition(&tally, Transition::Invalidate).await?;
        Ok(Outcome::new(tally).with_event(DomainEvent::ResultInvalidated { tally_id }))
    }

    /// The result for diplomation: only a homologated tally whose
    /// fingerprint still verifies.
    pub async fn certified_result(&self, tally_id: TallyId) -> Result<CertifiedResult> {
        let tally = self.tally_record(tally_id).await?;
        if tally.status() != ResultStatus::Homologated {
            return Err(Error::ResultNotCertifiable {
                tally_id,
                status: tally.status(),
            });
        }
        if !still_matches(&tally) {
            error!("Tally {tally_id}: homologated but its fingerprint no longer matches");
            return Err(Error::FingerprintMismatch(tally_id));
        }
        Ok(CertifiedResult::from(&tally))
    }
}

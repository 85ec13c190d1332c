use chrono::Utc;

use crate::error::{Error, Result};
use crate::events::{DomainEvent, Outcome};
use crate::model::api::Receipt;
use crate::model::common::{
    CalendarId, Choice, ElectionId, Region, SessionId, SessionStatus, SlateId,
};
use crate::model::db::{BallotCore, SessionCore, VotingSession};
use crate::store::TallyStore;
use crate::tally::TallyEngine;

impl<S: TallyStore> TallyEngine<S> {
    /// Open a session and generate its ballot key.
    pub async fn open_session(
        &self,
        calendar_id: CalendarId,
        election_id: ElectionId,
        region: impl Into<Region>,
        round: u32,
        slates: impl IntoIterator<Item = SlateId>,
    ) -> Result<VotingSession> {
        let session = SessionCore::new(calendar_id, election_id, region, round, slates);
        if session.slates.is_empty() {
            return Err(Error::NoEligibleSlates);
        }
        let session = self.store.insert_session(session).await?;
        self.keys.issue(session.id).await;
        info!(
            "Opened session {} for region {} round {} ({} slates)",
            session.id,
            session.region,
            session.round,
            session.slates.len()
        );
        Ok(session)
    }

    pub async fn session(&self, session_id: SessionId) -> Result<VotingSession> {
        self.store
            .session(session_id)
            .await?
            .ok_or(Error::SessionNotFound(session_id))
    }

    /// Seal and store one voter's ballot. Only a pseudonym of the voter is kept.
    pub async fn cast_ballot(
        &self,
        session_id: SessionId,
        voter: &str,
        choice: &Choice,
    ) -> Result<Receipt> {
        let session = self.session(session_id).await?;
        if session.status != SessionStatus::Open {
            return Err(Error::SessionClosed(session_id));
        }
        let key = self
            .keys
            .active(session_id)
            .await
            .ok_or(Error::KeyUnavailable(session_id))?;

        let ballot = BallotCore {
            session_id,
            voter: self.pseudonyms.pseudonym(voter),
            cast_at: Utc::now(),
            sealed: key.seal(session_id, choice),
        };
        let ballot = self.store.append_ballot(ballot).await?;
        trace!("Accepted ballot {} in session {session_id}", ballot.protocol);
        Ok(Receipt::from(&ballot))
    }

    /// Close a session to further ballots and record its closing fingerprint.
    ///
    /// Refused before the region's voting window opens.
    pub async fn close_session(&self, session_id: SessionId) -> Result<Outcome<VotingSession>> {
        let session = self.session(session_id).await?;
        if session.status != SessionStatus::Open {
            return Err(Error::SessionAlreadyClosed(session_id));
        }
        let position = self
            .collaborators
            .calendar
            .window_position(session.calendar_id, &session.region, Utc::now())
            .await?;
        if !position.permits_close() {
            return Err(Error::OutsideVotingWindow(session_id));
        }

        let closed_at = Utc::now();
        let (session, ballot_count) = self.store.close_session(session_id, closed_at).await?;
        let fingerprint = session
            .closing_fingerprint
            .clone()
            .ok_or_else(|| Error::Store(format!("session {session_id} closed without a fingerprint")))?;
        info!("Closed session {session_id} with {ballot_count} ballots ({fingerprint})");

        Ok(Outcome::new(session).with_event(DomainEvent::SessionClosed {
            session_id,
            closed_at,
            ballot_count,
            fingerprint,
        }))
    }
}

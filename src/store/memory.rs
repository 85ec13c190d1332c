use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::common::{ResultStatus, SessionId, SessionStatus, TallyId, Transition};
use crate::model::db::{
    Ballot, NewBallot, NewRecountRun, NewSession, NewSessionTally, RecountRun, SessionTally,
    VotingSession,
};
use crate::store::TallyStore;
use crate::tally::closing_fingerprint;

#[derive(Default)]
struct Tables {
    sessions: BTreeMap<SessionId, VotingSession>,
    ballots: BTreeMap<SessionId, Vec<Ballot>>,
    tallies: BTreeMap<TallyId, SessionTally>,
    recounts: Vec<RecountRun>,
    next_session: u32,
    next_ballot: u64,
    next_tally: u32,
    next_recount: u32,
}

/// Auto-increment: IDs start at 1.
fn next_id<T: Copy + std::ops::AddAssign + From<u8>>(counter: &mut T) -> T {
    *counter += T::from(1);
    *counter
}

impl Tables {
    fn session_mut(&mut self, session_id: SessionId) -> Result<&mut VotingSession> {
        self.sessions
            .get_mut(&session_id)
            .ok_or(Error::SessionNotFound(session_id))
    }

    fn tally_mut(&mut self, tally_id: TallyId) -> Result<&mut SessionTally> {
        self.tallies
            .get_mut(&tally_id)
            .ok_or(Error::TallyNotFound(tally_id))
    }

    /// Check a tally's current status, then apply the transition.
    fn transition(
        &mut self,
        tally_id: TallyId,
        expected: ResultStatus,
        transition: Transition,
    ) -> Result<SessionTally> {
        let tally = self.tally_mut(tally_id)?;
        if tally.status() != expected {
            return Err(Error::StatusChanged {
                tally_id,
                expected,
                actual: tally.status(),
            });
        }
        tally.tally.apply(transition)?;
        Ok(tally.clone())
    }
}

/// In-memory [`TallyStore`]. One lock over all tables makes every call atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a stored tally wholesale, bypassing every check.
    #[cfg(test)]
    pub async fn overwrite_tally(&self, tally: SessionTally) {
        self.tables.lock().await.tallies.insert(tally.id, tally);
    }
}

#[async_trait]
impl TallyStore for MemoryStore {
    async fn insert_session(&self, session: NewSession) -> Result<VotingSession> {
        let mut tables = self.tables.lock().await;
        if let Some(open) = tables
            .sessions
            .values()
            .find(|s| s.status == SessionStatus::Open && s.same_slot(&session))
        {
            return Err(Error::SessionAlreadyOpen(open.id));
        }
        let id = next_id(&mut tables.next_session);
        let session = VotingSession { id, session };
        tables.sessions.insert(id, session.clone());
        tables.ballots.insert(id, Vec::new());
        Ok(session)
    }

    async fn session(&self, session_id: SessionId) -> Result<Option<VotingSession>> {
        Ok(self.tables.lock().await.sessions.get(&session_id).cloned())
    }

    async fn append_ballot(&self, ballot: NewBallot) -> Result<Ballot> {
        let mut tables = self.tables.lock().await;
        let session_id = ballot.session_id;
        if tables.session_mut(session_id)?.status != SessionStatus::Open {
            return Err(Error::SessionClosed(session_id));
        }
        let accepted = tables.ballots.entry(session_id).or_default();
        if accepted.iter().any(|b| b.voter == ballot.voter) {
            return Err(Error::DuplicateBallot(session_id));
        }
        let seq = accepted.len() as u64 + 1;
        let ballot = Ballot {
            id: next_id(&mut tables.next_ballot),
            protocol: Ballot::protocol_number(session_id, seq),
            ballot,
        };
        tables
            .ballots
            .entry(session_id)
            .or_default()
            .push(ballot.clone());
        Ok(ballot)
    }

    async fn close_session(
        &self,
        session_id: SessionId,
        closed_at: DateTime<Utc>,
    ) -> Result<(VotingSession, u64)> {
        let mut tables = self.tables.lock().await;
        let count = tables.ballots.get(&session_id).map_or(0, Vec::len) as u64;
        let session = tables.session_mut(session_id)?;
        if session.status != SessionStatus::Open {
            return Err(Error::SessionAlreadyClosed(session_id));
        }
        session.status = SessionStatus::Closed;
        session.closed_at = Some(closed_at);
        session.closing_fingerprint = Some(closing_fingerprint(session_id, closed_at, count));
        Ok((session.clone(), count))
    }

    async fn ballots(&self, session_id: SessionId) -> Result<Vec<Ballot>> {
        let tables = self.tables.lock().await;
        tables
            .ballots
            .get(&session_id)
            .cloned()
            .ok_or(Error::SessionNotFound(session_id))
    }

    async fn claim_tally(
        &self,
        session_id: SessionId,
        claimed_at: DateTime<Utc>,
    ) -> Result<VotingSession> {
        let mut tables = self.tables.lock().await;
        let session = tables.session_mut(session_id)?;
        match session.status {
            SessionStatus::Open => Err(Error::SessionNotClosed {
                session_id,
                status: session.status,
            }),
            SessionStatus::Tallied => Err(Error::AlreadyTallied(session_id)),
            SessionStatus::Closed if session.tally_claimed_at.is_some() => {
                Err(Error::TallyInProgress(session_id))
            }
            SessionStatus::Closed => {
                session.tally_claimed_at = Some(claimed_at);
                Ok(session.clone())
            }
        }
    }

    async fn release_tally_claim(&self, session_id: SessionId) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.session_mut(session_id)?.tally_claimed_at = None;
        Ok(())
    }

    async fn commit_tally(&self, tally: NewSessionTally) -> Result<SessionTally> {
        let mut tables = self.tables.lock().await;
        let session_id = tally.session_id;
        let session = tables.session_mut(session_id)?;
        match session.status {
            SessionStatus::Closed if session.tally_claimed_at.is_some() => {}
            SessionStatus::Closed => {
                return Err(Error::Store(format!(
                    "tally of session {session_id} committed without holding its claim"
                )))
            }
            SessionStatus::Tallied => return Err(Error::AlreadyTallied(session_id)),
            status => return Err(Error::SessionNotClosed { session_id, status }),
        }
        session.status = SessionStatus::Tallied;
        session.tally_claimed_at = None;

        let id = next_id(&mut tables.next_tally);
        let tally = SessionTally { id, tally };
        tables.tallies.insert(id, tally.clone());
        Ok(tally)
    }

    async fn tally(&self, tally_id: TallyId) -> Result<Option<SessionTally>> {
        Ok(self.tables.lock().await.tallies.get(&tally_id).cloned())
    }

    async fn tally_for_session(&self, session_id: SessionId) -> Result<Option<SessionTally>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tallies
            .values()
            .find(|t| t.session_id == session_id)
            .cloned())
    }

    async fn transition_tally(
        &self,
        tally_id: TallyId,
        expected: ResultStatus,
        transition: Transition,
    ) -> Result<SessionTally> {
        self.tables
            .lock()
            .await
            .transition(tally_id, expected, transition)
    }

    async fn complete_recount(
        &self,
        run: NewRecountRun,
        transition: Transition,
    ) -> Result<(RecountRun, SessionTally)> {
        let mut tables = self.tables.lock().await;
        let tally = tables.transition(run.tally_id, ResultStatus::Recount, transition)?;
        let id = next_id(&mut tables.next_recount);
        let run = RecountRun { id, run };
        tables.recounts.push(run.clone());
        Ok((run, tally))
    }

    async fn recounts(&self, tally_id: TallyId) -> Result<Vec<RecountRun>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .recounts
            .iter()
            .filter(|r| r.tally_id == tally_id)
            .cloned()
            .collect())
    }
}

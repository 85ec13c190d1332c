//! Persistence seam for sessions, ballots, tallies and recount runs.
//!
//! Every method is a single atomic step: a backend must never expose the
//! intermediate state of one call to another. The engine relies on this for
//! the at-most-once tally claim and for status changes.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::common::{ResultStatus, SessionId, TallyId, Transition};
use crate::model::db::{
    Ballot, NewBallot, NewRecountRun, NewSession, NewSessionTally, RecountRun, SessionTally,
    VotingSession,
};

pub use memory::MemoryStore;

#[async_trait]
pub trait TallyStore: Send + Sync {
    /// Insert an open session.
    ///
    /// Fails with `SessionAlreadyOpen` if another open session holds the
    /// same (calendar, region, round) slot.
    async fn insert_session(&self, session: NewSession) -> Result<VotingSession>;

    async fn session(&self, session_id: SessionId) -> Result<Option<VotingSession>>;

    /// Append a ballot, assigning its ID and receipt protocol number.
    ///
    /// Serialised per session: fails with `SessionClosed` unless the session
    /// is open, and with `DuplicateBallot` if the voter already has a ballot.
    async fn append_ballot(&self, ballot: NewBallot) -> Result<Ballot>;

    /// Move an open session to closed and record its closing fingerprint
    /// ([`closing_fingerprint`] over the ballots it holds) in the same step.
    /// Returns the closed session with its ballot count. No ballot can be
    /// appended afterwards.
    ///
    /// [`closing_fingerprint`]: crate::tally::closing_fingerprint
    async fn close_session(
        &self,
        session_id: SessionId,
        closed_at: DateTime<Utc>,
    ) -> Result<(VotingSession, u64)>;

    /// All ballots of a session, in the order they were accepted.
    async fn ballots(&self, session_id: SessionId) -> Result<Vec<Ballot>>;

    /// Compare-and-swap the exclusive tally claim of a closed session.
    ///
    /// Fails with `SessionNotClosed`, `AlreadyTallied` or `TallyInProgress`.
    async fn claim_tally(
        &self,
        session_id: SessionId,
        claimed_at: DateTime<Utc>,
    ) -> Result<VotingSession>;

    async fn release_tally_claim(&self, session_id: SessionId) -> Result<()>;

    /// Persist a computed tally, mark its session tallied and drop the claim,
    /// all or nothing.
    async fn commit_tally(&self, tally: NewSessionTally) -> Result<SessionTally>;

    async fn tally(&self, tally_id: TallyId) -> Result<Option<SessionTally>>;

    async fn tally_for_session(&self, session_id: SessionId) -> Result<Option<SessionTally>>;

    /// Compare-and-swap a tally's status.
    ///
    /// Fails with `StatusChanged` if the tally is no longer in `expected`,
    /// and with `InvalidTransition` if the move is not allowed from there.
    async fn transition_tally(
        &self,
        tally_id: TallyId,
        expected: ResultStatus,
        transition: Transition,
    ) -> Result<SessionTally>;

    /// Append a recount run and move its tally out of `Recount` in one step.
    async fn complete_recount(
        &self,
        run: NewRecountRun,
        transition: Transition,
    ) -> Result<(RecountRun, SessionTally)>;

    /// Recount runs of a tally, oldest first.
    async fn recounts(&self, tally_id: TallyId) -> Result<Vec<RecountRun>>;
}

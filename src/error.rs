use thiserror::Error;

use crate::model::common::{ResultStatus, SessionId, SessionStatus, TallyId, Transition};

pub type Result<T> = std::result::Result<T, Error>;

/// The class an error belongs to, which dictates how callers must react.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected up front; nothing was changed.
    Precondition,
    /// Fatal; the operation was aborted as a whole and needs manual investigation.
    Integrity,
    /// An external collaborator failed; the caller may retry the whole call.
    Collaborator,
    /// The storage backend failed; the caller may retry the whole call.
    Storage,
}

#[derive(Debug, Error)]
pub enum Error {
    // Preconditions.
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),
    #[error("Session {0} is already closed")]
    SessionAlreadyClosed(SessionId),
    #[error("Session {0} is closed to new ballots")]
    SessionClosed(SessionId),
    #[error("Session {session_id} is {status}, not closed")]
    SessionNotClosed {
        session_id: SessionId,
        status: SessionStatus,
    },
    #[error("An open session already exists for this calendar, region and round (session {0})")]
    SessionAlreadyOpen(SessionId),
    #[error("A session needs at least one eligible slate")]
    NoEligibleSlates,
    #[error("Session {0} cannot be closed before its voting window opens")]
    OutsideVotingWindow(SessionId),
    #[error("This voter has already cast a ballot in session {0}")]
    DuplicateBallot(SessionId),
    #[error("Session {0} has already been tallied")]
    AlreadyTallied(SessionId),
    #[error("A tally for session {0} is already in progress")]
    TallyInProgress(SessionId),
    #[error("Tally {0} not found")]
    TallyNotFound(TallyId),
    #[error("Tally {tally_id} is {status}, which does not permit a recount")]
    RecountNotPermitted {
        tally_id: TallyId,
        status: ResultStatus,
    },
    #[error("Recount of tally {0} is not covered by a valid re-identification grant")]
    RecountNotAuthorized(TallyId),
    #[error("Cannot apply {transition} to a {from} result")]
    InvalidTransition {
        from: ResultStatus,
        transition: Transition,
    },
    #[error("Tally {tally_id} changed status concurrently: expected {expected}, found {actual}")]
    StatusChanged {
        tally_id: TallyId,
        expected: ResultStatus,
        actual: ResultStatus,
    },
    #[error("Tally {0} has an unresolved recount divergence")]
    UnresolvedDivergence(TallyId),
    #[error("Tally {0} is a tie awaiting adjudication")]
    PendingAdjudication(TallyId),
    #[error("Tally {tally_id} is {status} and cannot be certified")]
    ResultNotCertifiable {
        tally_id: TallyId,
        status: ResultStatus,
    },

    // Integrity violations.
    #[error("Ballot {ballot_id} in session {session_id} could not be decrypted")]
    Decryption { session_id: SessionId, ballot_id: u64 },
    #[error("Session {session_id} contains {duplicates} ballot(s) from voters who already voted")]
    DuplicateVoter {
        session_id: SessionId,
        duplicates: usize,
    },
    #[error("Counted {counted} ballots but {cast} were cast")]
    CountMismatch { counted: u64, cast: u64 },
    #[error("Session {session_id} holds {cast} ballots for only {eligible} eligible voters")]
    BallotsExceedElectorate {
        session_id: SessionId,
        cast: u64,
        eligible: u64,
    },
    #[error("Fingerprint of tally {0} no longer matches its counts")]
    FingerprintMismatch(TallyId),
    #[error("No ballot key is available for session {0}")]
    KeyUnavailable(SessionId),

    // Environment.
    #[error("{service} failed: {message}")]
    Collaborator {
        service: &'static str,
        message: String,
    },
    #[error("Storage error: {0}")]
    Store(String),
}

impl Error {
    /// Which class of the error taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decryption { .. }
            | Self::DuplicateVoter { .. }
            | Self::CountMismatch { .. }
            | Self::BallotsExceedElectorate { .. }
            | Self::FingerprintMismatch(_)
            | Self::KeyUnavailable(_) => ErrorKind::Integrity,
            Self::Collaborator { .. } => ErrorKind::Collaborator,
            Self::Store(_) => ErrorKind::Storage,
            _ => ErrorKind::Precondition,
        }
    }

    /// Shorthand for an integrity-class check.
    pub fn is_integrity_violation(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }

    /// Wrap a collaborator failure.
    pub fn collaborator(service: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            service,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy() {
        assert_eq!(Error::AlreadyTallied(1).kind(), ErrorKind::Precondition);
        assert_eq!(Error::TallyInProgress(1).kind(), ErrorKind::Precondition);
        assert_eq!(Error::PendingAdjudication(1).kind(), ErrorKind::Precondition);
        assert!(Error::Decryption {
            session_id: 1,
            ballot_id: 2
        }
        .is_integrity_violation());
        assert!(Error::CountMismatch { counted: 1, cast: 2 }.is_integrity_violation());
        assert_eq!(
            Error::collaborator("roll", "timeout").kind(),
            ErrorKind::Collaborator
        );
        assert_eq!(Error::Store("down".into()).kind(), ErrorKind::Storage);
    }
}

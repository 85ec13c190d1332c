use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// States in the VotingSession lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Accepting ballots.
    Open,
    /// Frozen; no further ballots accepted, awaiting tally.
    Closed,
    /// A tally has been committed for this session.
    Tallied,
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
            Self::Tallied => "Tallied",
        };
        f.write_str(name)
    }
}

/// Where an instant falls relative to a session's configured voting window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowPosition {
    Before,
    Within,
    After,
}

impl WindowPosition {
    /// Closing is allowed once the window has opened.
    pub fn permits_close(self) -> bool {
        matches!(self, Self::Within | Self::After)
    }
}

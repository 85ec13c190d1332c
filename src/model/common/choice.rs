use serde::{Deserialize, Serialize};

use crate::model::common::SlateId;

/// The disclosed content of a ballot, only ever visible after decryption.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    /// A vote for a slate.
    Slate(SlateId),
    /// Deliberately left blank.
    Blank,
    /// Deliberately spoiled.
    Null,
}

impl Choice {
    /// Convenience constructor for a slate vote.
    pub fn slate(id: impl Into<SlateId>) -> Self {
        Self::Slate(id.into())
    }
}

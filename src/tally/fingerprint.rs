//! Integrity hasher: tamper-evident digests of tally results and session closes.

use chrono::{DateTime, Utc};

use crate::crypto::{CanonicalHasher, Fingerprint};
use crate::model::common::{Decision, NoWinnerReason, SessionId};
use crate::model::db::{TallyCore, TallyCounts};

const TALLY_DOMAIN: &str = "tally-fingerprint/v1";
const CLOSING_DOMAIN: &str = "session-close/v1";

/// Digest binding a session's counts and decision.
///
/// Per-slate pairs are hashed in slate ID order, so the digest does not
/// depend on the order ballots were counted in.
pub fn fingerprint(session_id: SessionId, counts: &TallyCounts, decision: &Decision) -> Fingerprint {
    let mut hasher = CanonicalHasher::new(TALLY_DOMAIN);
    hasher
        .u32(session_id)
        .u64(counts.eligible_voters())
        .u64(counts.ballots_cast())
        .u64(counts.blank())
        .u64(counts.null())
        .u64(counts.valid())
        .u64(counts.per_slate().len() as u64);
    for (slate, votes) in counts.per_slate() {
        hasher.str(slate).u64(*votes);
    }
    hash_decision(&mut hasher, decision);
    hasher.finish()
}

fn hash_decision(hasher: &mut CanonicalHasher, decision: &Decision) {
    match decision {
        Decision::Winner { slate } => {
            hasher.tag(0).str(slate);
        }
        Decision::RunoffRequired {
            slates: [first, second],
        } => {
            hasher.tag(1).str(first).str(second);
        }
        Decision::TieDetected { rank, slates } => {
            hasher.tag(2).u32(*rank).u64(slates.len() as u64);
            for slate in slates {
                hasher.str(slate);
            }
        }
        Decision::NoWinner { reason } => {
            let reason = match reason {
                NoWinnerReason::QuorumNotMet => 0,
                NoWinnerReason::NoValidVotes => 1,
                NoWinnerReason::NoRunoffOpponent => 2,
            };
            hasher.tag(3).tag(reason);
        }
    }
}

/// Does the tally's stored fingerprint still match its stored counts and decision?
pub fn still_matches(tally: &TallyCore) -> bool {
    fingerprint(tally.session_id, tally.counts(), tally.decision()) == *tally.fingerprint()
}

/// Digest recorded when a session closes.
pub fn closing_fingerprint(
    session_id: SessionId,
    closed_at: DateTime<Utc>,
    ballot_count: u64,
) -> Fingerprint {
    let mut hasher = CanonicalHasher::new(CLOSING_DOMAIN);
    hasher
        .u32(session_id)
        .u64(closed_at.timestamp_millis() as u64)
        .u64(ballot_count);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use super::*;

    fn counts(blank: u64, null: u64, a: u64, b: u64) -> TallyCounts {
        TallyCounts::new(
            1000,
            blank + null + a + b,
            blank,
            null,
            BTreeMap::from([("A".to_string(), a), ("B".to_string(), b)]),
        )
        .unwrap()
    }

    fn winner_a() -> Decision {
        Decision::Winner {
            slate: "A".to_string(),
        }
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let first = fingerprint(1, &TallyCounts::example(), &winner_a());
        let second = fingerprint(1, &TallyCounts::example(), &winner_a());
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn any_single_count_change_is_detected() {
        let original = fingerprint(1, &counts(0, 0, 310, 290), &winner_a());
        let variants = [
            counts(1, 0, 309, 290),
            counts(0, 1, 309, 290),
            counts(0, 0, 311, 289),
            counts(0, 0, 310, 291),
        ];
        for variant in variants {
            assert_ne!(fingerprint(1, &variant, &winner_a()), original);
        }

        let other_electorate = TallyCounts::new(
            1001,
            600,
            0,
            0,
            BTreeMap::from([("A".to_string(), 310), ("B".to_string(), 290)]),
        )
        .unwrap();
        assert_ne!(fingerprint(1, &other_electorate, &winner_a()), original);
    }

    #[test]
    fn session_and_decision_are_bound() {
        let counts = TallyCounts::example();
        let original = fingerprint(1, &counts, &winner_a());
        assert_ne!(fingerprint(2, &counts, &winner_a()), original);
        assert_ne!(
            fingerprint(
                1,
                &counts,
                &Decision::Winner {
                    slate: "B".to_string()
                }
            ),
            original
        );
        assert_ne!(
            fingerprint(
                1,
                &counts,
                &Decision::NoWinner {
                    reason: NoWinnerReason::QuorumNotMet
                }
            ),
            fingerprint(
                1,
                &counts,
                &Decision::NoWinner {
                    reason: NoWinnerReason::NoValidVotes
                }
            )
        );
    }

    #[test]
    fn closing_fingerprint_binds_count_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 10, 6, 17, 0, 0).unwrap();
        let original = closing_fingerprint(1, at, 600);
        assert_eq!(original, closing_fingerprint(1, at, 600));
        assert_ne!(original, closing_fingerprint(1, at, 601));
        assert_ne!(
            original,
            closing_fingerprint(1, at + chrono::Duration::milliseconds(1), 600)
        );
    }
}

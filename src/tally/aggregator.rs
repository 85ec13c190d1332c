use std::collections::{BTreeMap, HashSet};

use chrono::Utc;

use crate::crypto::SessionKey;
use crate::error::{Error, Result};
use crate::events::{DomainEvent, Outcome};
use crate::logging::RunId;
use crate::model::common::{Choice, Decision, SessionId};
use crate::model::db::{Ballot, SessionTally, TallyCore, TallyCounts, VotingSession};
use crate::store::TallyStore;
use crate::tally::{compute, TallyEngine};

/// Decrypt and classify every ballot of a session into exactly one counter.
///
/// Slates on the session's list get a row even with zero votes. A ballot for
/// any other slate counts as null. Fails on the first ballot that does not
/// open, on ballots sharing a voter and on more ballots than eligible voters;
/// never on a partial count.
pub fn aggregate(
    session: &VotingSession,
    ballots: &[Ballot],
    key: &SessionKey,
    eligible_voters: u64,
) -> Result<TallyCounts> {
    let mut voters = HashSet::with_capacity(ballots.len());
    let mut duplicates = 0;
    for ballot in ballots {
        if !voters.insert(&ballot.voter) {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        return Err(Error::DuplicateVoter {
            session_id: session.id,
            duplicates,
        });
    }

    let cast = ballots.len() as u64;
    if cast > eligible_voters {
        return Err(Error::BallotsExceedElectorate {
            session_id: session.id,
            cast,
            eligible: eligible_voters,
        });
    }

    let mut per_slate: BTreeMap<_, u64> = session.slates.iter().map(|s| (s.clone(), 0)).collect();
    let (mut blank, mut null, mut unknown) = (0, 0, 0);
    for ballot in ballots {
        let choice = key
            .open(session.id, &ballot.sealed)
            .ok_or(Error::Decryption {
                session_id: session.id,
                ballot_id: ballot.id,
            })?;
        match choice {
            Choice::Slate(slate) => match per_slate.get_mut(&slate) {
                Some(votes) => *votes += 1,
                None => {
                    null += 1;
                    unknown += 1;
                }
            },
            Choice::Blank => blank += 1,
            Choice::Null => null += 1,
        }
    }
    if unknown > 0 {
        warn!(
            "Session {}: {unknown} ballot(s) for slates not on the eligible list counted as null",
            session.id
        );
    }

    TallyCounts::new(eligible_voters, cast, blank, null, per_slate)
}

impl<S: TallyStore> TallyEngine<S> {
    /// Tally a closed session, at most once.
    ///
    /// Takes the session's exclusive claim, aggregates, computes and commits
    /// the result in one step, then retires the ballot key into escrow. On
    /// any failure the claim is released and nothing is committed.
    pub async fn tally(&self, session_id: SessionId) -> Result<Outcome<SessionTally>> {
        let run = RunId::next();
        let session = match self.store.claim_tally(session_id, Utc::now()).await {
            Ok(session) => session,
            Err(e) => {
                debug!("tally{run}: session {session_id} not claimed: {e}");
                return Err(e);
            }
        };
        info!("tally{run}: started for session {session_id}");

        let tally = match self.tally_claimed(&session).await {
            Ok(tally) => tally,
            Err(e) => {
                if e.is_integrity_violation() {
                    error!("tally{run}: integrity violation, aborted: {e}");
                } else {
                    warn!("tally{run}: aborted: {e}");
                }
                if let Err(release) = self.store.release_tally_claim(session_id).await {
                    error!("tally{run}: failed to release claim on session {session_id}: {release}");
                }
                return Err(e);
            }
        };
        self.keys.retire(session_id).await;
        info!(
            "tally{run}: committed tally {} for session {session_id}: {}",
            tally.id,
            tally.decision()
        );

        let mut outcome = Outcome::new(tally.clone()).with_event(DomainEvent::ResultComputed {
            tally_id: tally.id,
            session_id,
            decision: tally.decision().clone(),
            fingerprint: tally.fingerprint().clone(),
        });
        if let Decision::TieDetected { rank, slates } = tally.decision() {
            outcome = outcome.with_event(DomainEvent::TieDetected {
                tally_id: tally.id,
                session_id,
                rank: *rank,
                slates: slates.clone(),
            });
        }
        Ok(outcome)
    }

    async fn tally_claimed(&self, session: &VotingSession) -> Result<SessionTally> {
        let eligible = self
            .collaborators
            .roll
            .eligible_voter_count(&session.region, session.calendar_id)
            .await?;
        let parameters = &self.collaborators.parameters;
        let quorum_threshold = parameters.quorum_threshold(session.election_id).await?;
        let majority_rule = parameters.majority_rule(session.election_id).await?;
        let key = self
            .keys
            .active(session.id)
            .await
            .ok_or(Error::KeyUnavailable(session.id))?;

        let ballots = self.store.ballots(session.id).await?;
        let counts = aggregate(session, &ballots, &key, eligible)?;
        let result = compute(session.id, counts, quorum_threshold, majority_rule)?;
        self.store
            .commit_tally(TallyCore::computed(session, result, Utc::now()))
            .await
    }
}

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::crypto::{ReidentificationGrant, SessionKey, VerifiedGrant};
use crate::error::{Error, Result};
use crate::events::{DomainEvent, Outcome};
use crate::logging::RunId;
use crate::model::common::{ResultStatus, TallyId, Transition};
use crate::model::db::{
    Ballot, FieldDivergence, RecountCore, RecountRun, SessionTally, VotingSession,
};
use crate::store::TallyStore;
use crate::tally::{aggregate, compute, TallyEngine, TallyResult};

/// A supervised recount request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecountAuthorization {
    pub requested_by: String,
    /// Must cover the tally being recounted.
    pub grant: ReidentificationGrant,
}

struct RecountInputs {
    session: VotingSession,
    key: SessionKey,
    eligible_voters: u64,
    ballots: Vec<Ballot>,
}

impl RecountInputs {
    /// Rerun aggregation under the parameters the tally was computed with.
    /// Only integrity violations can fail here.
    fn recompute(&self, tally: &SessionTally) -> Result<TallyResult> {
        let counts = aggregate(&self.session, &self.ballots, &self.key, self.eligible_voters)?;
        compute(
            self.session.id,
            counts,
            tally.quorum_threshold,
            tally.majority_rule,
        )
    }
}

impl<S: TallyStore> TallyEngine<S> {
    /// Re-aggregate a tally's frozen ballot set under a re-identification
    /// grant and compare the result field by field.
    ///
    /// The original tally is never modified: a matching recount returns it
    /// to `Computed`, a divergent one leaves it `Contested` with the run on
    /// record. A recount whose ballots fail re-aggregation also leaves it
    /// `Contested`. Failing to reach the roll, the store or the escrowed key
    /// leaves the status as it was.
    pub async fn recount(
        &self,
        tally_id: TallyId,
        authorization: RecountAuthorization,
    ) -> Result<Outcome<RecountRun>> {
        let run = RunId::next();
        let tally = self.tally_record(tally_id).await?;
        if !tally.status().permits_recount() {
            return Err(Error::RecountNotPermitted {
                tally_id,
                status: tally.status(),
            });
        }
        let grant = self
            .grants
            .verify(&authorization.grant)
            .filter(|g| g.tally_id() == tally_id && g.session_id() == tally.session_id)
            .ok_or(Error::RecountNotAuthorized(tally_id))?;

        // Everything that can fail transiently is fetched before the result
        // enters `Recount`, so such a failure leaves its status untouched.
        let inputs = self.recount_inputs(&tally, &grant).await?;

        self.store
            .transition_tally(tally_id, tally.status(), Transition::BeginRecount)
            .await?;
        info!(
            "recount{run}: started for tally {tally_id}, requested by {} under grant from {}",
            authorization.requested_by,
            grant.issued_by()
        );

        let result = match inputs.recompute(&tally) {
            Ok(result) => result,
            Err(e) => {
                error!("recount{run}: integrity violation, aborted: {e}");
                if let Err(failed) = self
                    .store
                    .transition_tally(tally_id, ResultStatus::Recount, Transition::RecountFailed)
                    .await
                {
                    error!("recount{run}: failed to mark tally {tally_id} as contested: {failed}");
                }
                return Err(e);
            }
        };

        let mut divergences = tally.counts().diff(&result.counts);
        if result.decision != *tally.decision() {
            divergences.push(FieldDivergence {
                field: "decision".to_string(),
                original: tally.decision().to_string(),
                recounted: result.decision.to_string(),
            });
        }
        let transition = if divergences.is_empty() {
            Transition::ConfirmRecount
        } else {
            Transition::ReportDivergence
        };
        let (recount, _) = self
            .store
            .complete_recount(
                RecountCore {
                    tally_id,
                    session_id: tally.session_id,
                    requested_by: authorization.requested_by,
                    authorized_by: grant.issued_by().to_string(),
                    counts: result.counts,
                    decision: result.decision,
                    fingerprint: result.fingerprint,
                    divergences,
                    completed_at: Utc::now(),
                },
                transition,
            )
            .await?;

        let event = if recount.divergent() {
            warn!(
                "recount{run}: recount {} of tally {tally_id} diverged in {} field(s)",
                recount.id,
                recount.divergences.len()
            );
            DomainEvent::RecountDivergenceFound {
                tally_id,
                recount_id: recount.id,
                divergences: recount.divergences.clone(),
            }
        } else {
            info!("recount{run}: recount {} confirmed tally {tally_id}", recount.id);
            DomainEvent::RecountConfirmed {
                tally_id,
                recount_id: recount.id,
            }
        };
        Ok(Outcome::new(recount).with_event(event))
    }

    /// Recount runs of a tally, oldest first.
    pub async fn recounts(&self, tally_id: TallyId) -> Result<Vec<RecountRun>> {
        self.store.recounts(tally_id).await
    }

    /// Gather what a recount reads: the session, its escrowed key, a fresh
    /// eligible-voter count and the frozen ballot set.
    async fn recount_inputs(
        &self,
        tally: &SessionTally,
        grant: &VerifiedGrant,
    ) -> Result<RecountInputs> {
        let session = self.session(tally.session_id).await?;
        let key = self
            .keys
            .release_escrowed(grant)
            .await
            .ok_or(Error::KeyUnavailable(session.id))?;
        let eligible_voters = self
            .collaborators
            .roll
            .eligible_voter_count(&session.region, session.calendar_id)
            .await?;
        let ballots = self.store.ballots(session.id).await?;
        Ok(RecountInputs {
            session,
            key,
            eligible_voters,
            ballots,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::collaborators::{EligibilityRoll, StaticCalendar, StaticParameters};
    use crate::config::Config;
    use crate::crypto::GrantAuthority;
    use crate::error::ErrorKind;
    use crate::events::RecordingDispatcher;
    use crate::fixtures::{self, supervisor, Scenario, TestEngine};
    use crate::model::common::{CalendarId, SessionId};
    use crate::model::db::TallyCounts;
    use crate::store::MemoryStore;
    use crate::tally::{Collaborators, Complaint};

    /// Answers once, then times out.
    struct FlakyRoll {
        eligible: u64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EligibilityRoll for FlakyRoll {
        async fn eligible_voter_count(&self, _region: &str, _calendar_id: CalendarId) -> Result<u64> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(self.eligible)
            } else {
                Err(Error::collaborator("eligibility roll", "timed out"))
            }
        }
    }

    async fn contested(engine: &TestEngine, session_id: SessionId) -> SessionTally {
        let tally = engine.tally(session_id).await.unwrap().value;
        let complaint = Complaint {
            filed_by: "slate B".to_string(),
            grounds: "irregular counting".to_string(),
        };
        engine.contest(tally.id, complaint).await.unwrap().value
    }

    fn authorization(tally: &SessionTally) -> RecountAuthorization {
        RecountAuthorization {
            requested_by: "slate B".to_string(),
            grant: supervisor().issue(tally.id, tally.session_id, "electoral board"),
        }
    }

    #[engine_test(majority_win)]
    async fn recount_reproduces_the_tally(
        engine: TestEngine,
        dispatcher: RecordingDispatcher,
        session_id: SessionId,
    ) {
        let tally = contested(&engine, session_id).await;
        let recount = engine
            .recount(tally.id, authorization(&tally))
            .await
            .unwrap()
            .deliver(&dispatcher)
            .await;
        assert!(!recount.divergent());
        assert_eq!(recount.fingerprint, *tally.fingerprint());
        assert_eq!(recount.counts, *tally.counts());
        assert_eq!(recount.authorized_by, "electoral board");

        let after = engine.tally_record(tally.id).await.unwrap();
        assert_eq!(after.status(), ResultStatus::Computed);
        assert_eq!(after.fingerprint(), tally.fingerprint());
        assert_eq!(
            dispatcher.take().await,
            [DomainEvent::RecountConfirmed {
                tally_id: tally.id,
                recount_id: recount.id
            }]
        );
        assert_eq!(engine.recounts(tally.id).await.unwrap(), [recount]);
    }

    #[engine_test(majority_win)]
    async fn recount_reports_divergence(
        engine: TestEngine,
        dispatcher: RecordingDispatcher,
        session_id: SessionId,
    ) {
        let tally = contested(&engine, session_id).await;
        let tampered = TallyCounts::new(
            1000,
            600,
            0,
            0,
            BTreeMap::from([("A".to_string(), 300), ("B".to_string(), 300)]),
        )
        .unwrap();
        engine
            .store()
            .overwrite_tally(SessionTally {
                id: tally.id,
                tally: tally.tally.clone().with_tampered_counts(tampered),
            })
            .await;

        let recount = engine
            .recount(tally.id, authorization(&tally))
            .await
            .unwrap()
            .deliver(&dispatcher)
            .await;
        assert!(recount.divergent());
        let fields: Vec<_> = recount.divergences.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, ["slate:A", "slate:B"]);

        let after = engine.tally_record(tally.id).await.unwrap();
        assert_eq!(after.status(), ResultStatus::Contested);
        assert!(matches!(
            &dispatcher.take().await[..],
            [DomainEvent::RecountDivergenceFound { recount_id, .. }] if *recount_id == recount.id
        ));
    }

    #[engine_test(majority_win)]
    async fn recount_needs_a_matching_grant(engine: TestEngine, session_id: SessionId) {
        let tally = contested(&engine, session_id).await;
        let foreign = RecountAuthorization {
            requested_by: "slate B".to_string(),
            grant: supervisor().issue(tally.id + 1, tally.session_id, "electoral board"),
        };
        assert!(matches!(
            engine.recount(tally.id, foreign).await,
            Err(Error::RecountNotAuthorized(id)) if id == tally.id
        ));

        let unsupervised = RecountAuthorization {
            requested_by: "slate B".to_string(),
            grant: GrantAuthority::new(b"not the supervisor's secret").issue(
                tally.id,
                tally.session_id,
                "electoral board",
            ),
        };
        assert!(matches!(
            engine.recount(tally.id, unsupervised).await,
            Err(Error::RecountNotAuthorized(_))
        ));

        let mut forged = authorization(&tally);
        forged.grant.issued_by = "someone else".to_string();
        assert!(matches!(
            engine.recount(tally.id, forged).await,
            Err(Error::RecountNotAuthorized(_))
        ));

        let after = engine.tally_record(tally.id).await.unwrap();
        assert_eq!(after.status(), ResultStatus::Contested);
        assert!(engine.recounts(tally.id).await.unwrap().is_empty());
    }

    #[engine_test(majority_win)]
    async fn homologated_result_is_not_recounted(engine: TestEngine, session_id: SessionId) {
        let tally = engine.tally(session_id).await.unwrap().value;
        let _ = engine.homologate(tally.id).await.unwrap();
        assert!(matches!(
            engine.recount(tally.id, authorization(&tally)).await,
            Err(Error::RecountNotPermitted {
                status: ResultStatus::Homologated,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn unavailable_roll_leaves_status_untouched() {
        fixtures::init_logging();
        let config = Config::example();
        let scenario = Scenario::majority_win();
        let collaborators = Collaborators {
            roll: Arc::new(FlakyRoll {
                eligible: scenario.eligible,
                calls: AtomicUsize::new(0),
            }),
            parameters: Arc::new(StaticParameters::new(
                config.default_quorum_threshold(),
                config.default_majority_rule(),
            )),
            calendar: Arc::new(StaticCalendar::new()),
        };
        let engine = TallyEngine::new(MemoryStore::new(), collaborators, &config);
        let session_id = fixtures::populate(&engine, scenario).await;
        let tally = engine.tally(session_id).await.unwrap().value;

        let err = engine
            .recount(tally.id, authorization(&tally))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Collaborator);

        let after = engine.tally_record(tally.id).await.unwrap();
        assert_eq!(after.status(), ResultStatus::Computed);
        assert!(engine.recounts(tally.id).await.unwrap().is_empty());
    }
}

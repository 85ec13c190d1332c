//! Shared test setup for `#[engine_test]`.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::collaborators::{StaticCalendar, StaticParameters, StaticRoll};
use crate::config::Config;
use crate::crypto::GrantAuthority;
use crate::model::common::{CalendarId, Choice, ElectionId, SessionId, SlateId};
use crate::store::MemoryStore;
use crate::tally::{Collaborators, TallyEngine};

pub type TestEngine = TallyEngine<MemoryStore>;

pub const CALENDAR: CalendarId = 1;
pub const ELECTION: ElectionId = 1;

/// A region whose voting window has not opened yet.
pub const NOT_YET_OPEN: &str = "overseas";
/// A region the eligibility roll does not know.
pub const UNROLLED: &str = "atlantis";

pub fn init_logging() {
    log4rs_test_utils::test_logging::init_logging_once_for(["tally_engine"], None, None);
}

pub fn engine() -> TestEngine {
    let config = Config::example();
    let roll = Scenario::all()
        .into_iter()
        .fold(StaticRoll::new(), |roll, scenario| {
            roll.with_region(scenario.region, scenario.eligible)
        })
        .with_region(NOT_YET_OPEN, 100);
    let calendar = StaticCalendar::new().with_window(
        CALENDAR,
        NOT_YET_OPEN,
        Utc::now() + Duration::days(1),
        Utc::now() + Duration::days(2),
    );
    let collaborators = Collaborators {
        roll: Arc::new(roll),
        parameters: Arc::new(StaticParameters::new(
            config.default_quorum_threshold(),
            config.default_majority_rule(),
        )),
        calendar: Arc::new(calendar),
    };
    TallyEngine::new(MemoryStore::new(), collaborators, &config)
}

/// The supervising authority, sharing the test engine's secret.
pub fn supervisor() -> GrantAuthority {
    GrantAuthority::new(Config::example().hmac_secret())
}

/// A session's slates, electorate and the ballots cast in it.
pub struct Scenario {
    pub region: &'static str,
    pub eligible: u64,
    pub slates: Vec<SlateId>,
    pub ballots: Vec<(Choice, u64)>,
}

impl Scenario {
    fn new(region: &'static str, eligible: u64, ballots: &[(Choice, u64)]) -> Self {
        let slates = ballots
            .iter()
            .filter_map(|(choice, _)| match choice {
                Choice::Slate(slate) => Some(slate.clone()),
                _ => None,
            })
            .collect();
        Self {
            region,
            eligible,
            slates,
            ballots: ballots.to_vec(),
        }
    }

    fn all() -> Vec<Self> {
        vec![
            Self::majority_win(),
            Self::valid_majority(),
            Self::top_tie(),
            Self::quorum_miss(),
            Self::runoff(),
        ]
    }

    /// A beats B 310 to 290 with 60% turnout.
    pub fn majority_win() -> Self {
        Self::new(
            "north",
            1000,
            &[(Choice::slate("A"), 310), (Choice::slate("B"), 290)],
        )
    }

    /// A has 280 of 550 valid votes; blank and null ballots do not count.
    pub fn valid_majority() -> Self {
        Self::new(
            "east",
            1000,
            &[
                (Choice::slate("A"), 280),
                (Choice::slate("B"), 270),
                (Choice::Blank, 30),
                (Choice::Null, 20),
            ],
        )
    }

    /// A and B share first place.
    pub fn top_tie() -> Self {
        Self::new(
            "south",
            1000,
            &[(Choice::slate("A"), 300), (Choice::slate("B"), 300)],
        )
    }

    /// 30% turnout against a 50% quorum.
    pub fn quorum_miss() -> Self {
        Self::new(
            "west",
            1000,
            &[(Choice::slate("A"), 290), (Choice::slate("B"), 10)],
        )
    }

    /// Nobody passes half of the valid votes.
    pub fn runoff() -> Self {
        Self::new(
            "central",
            200,
            &[
                (Choice::slate("A"), 50),
                (Choice::slate("B"), 30),
                (Choice::slate("C"), 20),
            ],
        )
    }
}

/// Open the scenario's session, cast every ballot and close it.
pub async fn populate(engine: &TestEngine, scenario: Scenario) -> SessionId {
    let session = engine
        .open_session(CALENDAR, ELECTION, scenario.region, 1, scenario.slates)
        .await
        .unwrap();
    let mut voter = 0;
    for (choice, count) in &scenario.ballots {
        for _ in 0..*count {
            voter += 1;
            engine
                .cast_ballot(session.id, &format!("voter-{voter}"), choice)
                .await
                .unwrap();
        }
    }
    engine.close_session(session.id).await.unwrap().value.id
}

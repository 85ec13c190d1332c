use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info};
use serde::Deserialize;
use thiserror::Error;

use tally_engine::collaborators::{StaticCalendar, StaticParameters, StaticRoll};
use tally_engine::events::LogDispatcher;
use tally_engine::logging;
use tally_engine::model::api::TallyProjection;
use tally_engine::model::common::{Choice, MajorityRule, Percentage, SlateId};
use tally_engine::store::MemoryStore;
use tally_engine::{Collaborators, Config, TallyEngine};

/// Errors that are critical to the entire run.
#[derive(Debug, Error)]
enum Error {
    #[error("Usage: tally-engine <ELECTION_FILE>")]
    Usage,
    #[error("Failed to read election file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid election file: {0}")]
    Format(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] tally_engine::Error),
}

/// One single-session election to run end to end.
#[derive(Debug, Deserialize)]
struct ElectionFile {
    #[serde(default = "default_id")]
    calendar_id: u32,
    #[serde(default = "default_id")]
    election_id: u32,
    region: String,
    #[serde(default = "default_id")]
    round: u32,
    eligible_voters: u64,
    slates: Vec<SlateId>,
    quorum_threshold: Option<Percentage>,
    majority_rule: Option<MajorityRule>,
    /// One choice per voter.
    ballots: Vec<Choice>,
}

fn default_id() -> u32 {
    1
}

async fn run(config: &Config, path: PathBuf) -> Result<TallyProjection, Error> {
    let election: ElectionFile = serde_json::from_reader(BufReader::new(File::open(path)?))?;

    let collaborators = Collaborators {
        roll: Arc::new(StaticRoll::new().with_region(&election.region, election.eligible_voters)),
        parameters: Arc::new(StaticParameters::new(
            election
                .quorum_threshold
                .unwrap_or_else(|| config.default_quorum_threshold()),
            election
                .majority_rule
                .unwrap_or_else(|| config.default_majority_rule()),
        )),
        calendar: Arc::new(StaticCalendar::new()),
    };
    let engine = TallyEngine::new(MemoryStore::new(), collaborators, config);
    let dispatcher = LogDispatcher;

    let session = engine
        .open_session(
            election.calendar_id,
            election.election_id,
            election.region,
            election.round,
            election.slates,
        )
        .await?;
    for (i, choice) in election.ballots.iter().enumerate() {
        engine
            .cast_ballot(session.id, &format!("voter-{}", i + 1), choice)
            .await?;
    }
    engine.close_session(session.id).await?.deliver(&dispatcher).await;
    let tally = engine.tally(session.id).await?.deliver(&dispatcher).await;

    Ok(TallyProjection::from(&tally))
}

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1)
        }
    };
    if let Err(err) = logging::init(config.log_config()) {
        eprintln!("Failed to initialise logging: {err}");
        std::process::exit(1)
    }
    info!("Initialised logging");

    let result = match std::env::args_os().nth(1) {
        Some(path) => run(&config, PathBuf::from(path)).await,
        None => Err(Error::Usage),
    };
    match result.and_then(|projection| Ok(serde_json::to_string_pretty(&projection)?)) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            error!("{err}");
            error!("Critical failure, shutting down");
            std::process::exit(1)
        }
    }
}

//! A simple CLI tool for verifying published session tallies.
//! This uses the engine's own verification implementation, and is by definition
//! compatible with the projections the engine publishes.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};

use tally_engine::model::api::{TallyProjection, VerificationError};
use tally_engine::model::common::Percentage;

const PROGRAM_NAME: &str = "verify-tally";

const ABOUT_TEXT: &str = "Verify the integrity of a published session tally.

EXIT CODES:
     0: Verification succeeded.
   255: Ran successfully, but verification failed.
 Other: Error.";

const TALLY_DUMP: &str = "TALLY_DUMP";

const TALLY_DUMP_HELP: &str = "The path to a JSON dump of a session tally,\n\
as published by the engine's result projection";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME).about(ABOUT_TEXT).arg(
        Arg::new(TALLY_DUMP)
            .help(TALLY_DUMP_HELP)
            .action(ArgAction::Set)
            .required(true),
    )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
    /// Verification failed due to the contained reason.
    Verification(VerificationError),
}

/// A friendly representation of the results for a particular slate.
#[derive(Debug, Eq, PartialEq)]
struct FriendlyResults {
    pub slate_id: String,
    pub rank: u32,
    pub votes: u64,
    pub share: Percentage,
    pub winner: bool,
    pub runoff: bool,
}

impl Display for FriendlyResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}. {}: {} vote{} ({})",
            self.rank,
            self.slate_id,
            self.votes,
            if self.votes != 1 { "s" } else { "" },
            self.share
        )?;
        if self.winner {
            write!(f, " [winner]")
        } else if self.runoff {
            write!(f, " [runoff]")
        } else {
            Ok(())
        }
    }
}

/// Run verification.
fn verify(path: &str) -> Result<(TallyProjection, Vec<FriendlyResults>), Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let projection: TallyProjection =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    // Run verification.
    projection.verify().map_err(Error::Verification)?;

    // Rows are published in rank order already.
    let friendly_results = projection
        .slates
        .iter()
        .map(|row| FriendlyResults {
            slate_id: row.slate_id.clone(),
            rank: row.rank,
            votes: row.votes,
            share: row.share,
            winner: row.winner,
            runoff: row.runoff,
        })
        .collect();

    Ok((projection, friendly_results))
}

/// Run verification, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(TALLY_DUMP).unwrap(); // Required argument is guaranteed to be present.
    match verify(path) {
        Ok((projection, friendly_results)) => {
            println!("Verification succeeded.");
            println!(
                "Session {} ({}, round {}), tally {}: {}",
                projection.session_id,
                projection.region,
                projection.round,
                projection.tally_id,
                projection.status
            );
            println!(
                "Participation {} of {} eligible voters, quorum {} ({}).",
                projection.participation,
                projection.eligible_voters,
                projection.quorum_threshold,
                if projection.quorum_met { "met" } else { "not met" }
            );
            println!(
                "{} ballots: {} valid, {} blank, {} null.",
                projection.ballots_cast, projection.valid, projection.blank, projection.null
            );
            for result in friendly_results {
                println!("{}", result);
            }
            println!("Decision: {}", projection.decision);
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {}", msg);
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {}", msg);
            1
        }
        Err(Error::Verification(err)) => {
            println!("Verification failed: {}.", err);
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}

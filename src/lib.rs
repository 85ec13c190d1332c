//! Vote tallying and result-determination engine.
//!
//! Aggregates the sealed ballots of a closed voting session exactly once,
//! derives participation and quorum, decides a winner or runoff, binds it all
//! with a fingerprint, and governs the result through recount, homologation
//! and invalidation.

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate engine_test;

pub mod collaborators;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;
pub mod store;
pub mod tally;

#[cfg(test)]
mod fixtures;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use tally::{Collaborators, TallyEngine};

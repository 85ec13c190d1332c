mod ballot;
mod recount;
mod session;
mod tally;

pub use ballot::{Ballot, BallotCore, NewBallot};
pub use recount::{NewRecountRun, RecountCore, RecountRun};
pub use session::{NewSession, SessionCore, VotingSession};
pub use tally::{
    FieldDivergence, NewSessionTally, SessionTally, SlateTally, TallyCore, TallyCounts,
};

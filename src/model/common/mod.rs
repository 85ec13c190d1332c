mod choice;
mod decision;
mod lifecycle;
mod percentage;
mod session;

pub use choice::Choice;
pub use decision::{Decision, MajorityRule, NoWinnerReason};
pub use lifecycle::{ResultStatus, Transition};
pub use percentage::Percentage;
pub use session::{SessionStatus, WindowPosition};

/// Our session IDs are integers.
pub type SessionId = u32;
/// Our tally IDs are integers.
pub type TallyId = u32;
/// Our recount run IDs are integers.
pub type RecountId = u32;
/// Ballot IDs are integers, unique across all sessions.
pub type BallotId = u64;
/// Electoral calendar IDs are assigned by the calendar service.
pub type CalendarId = u32;
/// Election IDs are assigned by the election-parameters service.
pub type ElectionId = u32;
/// Our slate IDs (registered short names) are strings.
pub type SlateId = String;
/// Regions are identified by name.
pub type Region = String;

//! Read-only projections handed to collaborators and voters.

mod certified;
mod receipt;
mod tally;

pub use certified::CertifiedResult;
pub use receipt::Receipt;
pub use tally::{TallyProjection, VerificationError};

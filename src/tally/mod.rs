pub mod summary;
pub mod validation;

use thiserror::Error;

pub use summary::{aggregate_summary, format_percentage, format_thousands, SummaryReport};
pub use validation::{compute_turnout, round_to, validate_vote_consistency, VoteCheck};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TallyError {
    #[error("Registered voters must be greater than zero.")]
    NoRegisteredVoters,
}

use serde::Serialize;

use crate::tally::TallyError;

pub const TOTAL_EXCEEDS_REGISTERED: &str = "Total votes cannot be more than registered voters";
pub const SPOILT_EXCEEDS_VALID: &str = "Spoilt votes cannot be more than valid votes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteCheck {
    pub is_valid: bool,
    pub message: String,
}

impl VoteCheck {
    fn valid() -> Self {
        Self {
            is_valid: true,
            message: String::new(),
        }
    }

    fn invalid(message: &str) -> Self {
        Self {
            is_valid: false,
            message: message.to_string(),
        }
    }
}

/// Checks that the cast votes fit within the register. The total-votes rule
/// wins when both are broken.
pub fn validate_vote_consistency(
    registered_voters: i64,
    valid_votes: i64,
    spoilt_votes: i64,
) -> VoteCheck {
    let total_votes = valid_votes.saturating_add(spoilt_votes);
    if total_votes > registered_voters {
        VoteCheck::invalid(TOTAL_EXCEEDS_REGISTERED)
    } else if spoilt_votes > valid_votes {
        VoteCheck::invalid(SPOILT_EXCEEDS_VALID)
    } else {
        VoteCheck::valid()
    }
}

/// Percentage of registered voters who cast a ballot, valid or spoilt.
pub fn compute_turnout(
    registered_voters: i64,
    valid_votes: i64,
    spoilt_votes: i64,
) -> Result<f64, TallyError> {
    if registered_voters <= 0 {
        return Err(TallyError::NoRegisteredVoters);
    }
    let cast = valid_votes as f64 + spoilt_votes as f64;
    Ok(cast / registered_voters as f64 * 100.0)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistent_counts_are_valid() {
        for (registered, valid, spoilt) in [(1000, 600, 50), (10, 5, 5), (1, 1, 0), (1, 0, 0)] {
            let check = validate_vote_consistency(registered, valid, spoilt);
            assert!(check.is_valid, "{registered}/{valid}/{spoilt}");
            assert!(check.message.is_empty());
        }
    }

    #[test]
    fn total_over_register_is_rejected_first() {
        let check = validate_vote_consistency(1000, 600, 500);
        assert!(!check.is_valid);
        assert_eq!(check.message, TOTAL_EXCEEDS_REGISTERED);

        // both rules broken
        let check = validate_vote_consistency(100, 40, 90);
        assert_eq!(check.message, TOTAL_EXCEEDS_REGISTERED);
    }

    #[test]
    fn spoilt_over_valid_is_rejected() {
        let check = validate_vote_consistency(1000, 100, 150);
        assert!(!check.is_valid);
        assert_eq!(check.message, SPOILT_EXCEEDS_VALID);
    }

    #[test]
    fn turnout_matches_cast_share() {
        let turnout = compute_turnout(1000, 600, 50).expect("turnout");
        assert!((turnout - 65.0).abs() < 1e-9);
        let turnout = compute_turnout(3, 1, 0).expect("turnout");
        assert_eq!(round_to(turnout, 3), 33.333);
    }

    #[test]
    fn turnout_rejects_empty_register() {
        assert_eq!(
            compute_turnout(0, 0, 0),
            Err(TallyError::NoRegisteredVoters)
        );
    }
}

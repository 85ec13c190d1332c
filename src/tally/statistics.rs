//! Participation statistics. Pure; no I/O.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::Percentage;

/// Statistics derived from a session's counts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub participation: Percentage,
    pub abstention: Percentage,
    pub valid_votes: u64,
    pub quorum_met: bool,
}

/// Derive participation, abstention, valid votes and quorum from raw counts.
///
/// The quorum check is exact: participation exactly equal to the threshold
/// meets quorum. Participation is zero when nobody is eligible.
pub fn compute_statistics(
    total_eligible: u64,
    total_cast: u64,
    blanks: u64,
    nulls: u64,
    quorum_threshold: Percentage,
) -> Result<Statistics> {
    let valid_votes = blanks
        .checked_add(nulls)
        .and_then(|invalid| total_cast.checked_sub(invalid))
        .ok_or(Error::CountMismatch {
            counted: blanks.saturating_add(nulls),
            cast: total_cast,
        })?;
    let participation = Percentage::ratio(total_cast, total_eligible);

    Ok(Statistics {
        participation,
        abstention: participation.complement(),
        valid_votes,
        quorum_met: quorum_threshold.is_met_by(total_cast, total_eligible),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_percent_turnout() {
        let stats = compute_statistics(1000, 600, 30, 20, Percentage::HALF).unwrap();
        assert_eq!(stats.participation, Percentage::from_bps(6000));
        assert_eq!(stats.abstention, Percentage::from_bps(4000));
        assert_eq!(stats.valid_votes, 550);
        assert!(stats.quorum_met);
    }

    #[test]
    fn quorum_boundary_is_inclusive() {
        let stats = compute_statistics(1000, 500, 0, 0, Percentage::HALF).unwrap();
        assert!(stats.quorum_met);
        let stats = compute_statistics(1000, 499, 0, 0, Percentage::HALF).unwrap();
        assert!(!stats.quorum_met);
    }

    #[test]
    fn quorum_uses_exact_ratio_not_rounded_percentage() {
        // 2/3 displays as 66.67% but is still below a 66.67% threshold.
        let threshold = Percentage::from_bps(6667);
        assert!(!compute_statistics(3, 2, 0, 0, threshold).unwrap().quorum_met);
    }

    #[test]
    fn quorum_miss() {
        let stats = compute_statistics(1000, 300, 0, 0, Percentage::HALF).unwrap();
        assert_eq!(stats.participation, Percentage::from_bps(3000));
        assert!(!stats.quorum_met);
    }

    #[test]
    fn nobody_eligible() {
        let stats = compute_statistics(0, 0, 0, 0, Percentage::HALF).unwrap();
        assert_eq!(stats.participation, Percentage::ZERO);
        assert_eq!(stats.abstention, Percentage::FULL);
        assert!(!stats.quorum_met);
    }

    #[test]
    fn more_invalid_than_cast_is_rejected() {
        assert!(matches!(
            compute_statistics(10, 5, 4, 2, Percentage::HALF),
            Err(Error::CountMismatch { counted: 6, cast: 5 })
        ));
    }
}

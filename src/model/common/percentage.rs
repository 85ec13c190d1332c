use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Basis points in one hundred percent.
pub const FULL_BPS: u32 = 10_000;

/// A percentage with a resolution of one basis point (0.01%).
///
/// Stored percentages are rounded half-up; every legal comparison
/// (quorum, majority) is done on the exact underlying counts instead,
/// see [`Percentage::is_met_by`] and [`Percentage::is_exceeded_by`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(u32);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const HALF: Percentage = Percentage(FULL_BPS / 2);
    pub const FULL: Percentage = Percentage(FULL_BPS);

    /// Construct from basis points, e.g. `5000` is 50.00%.
    pub const fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    /// The value in basis points.
    pub const fn bps(self) -> u32 {
        self.0
    }

    /// `part / whole`, rounded half-up to the nearest basis point.
    /// A zero `whole` yields zero.
    pub fn ratio(part: u64, whole: u64) -> Self {
        if whole == 0 {
            return Self::ZERO;
        }
        let scaled = u128::from(part) * u128::from(FULL_BPS) * 2 + u128::from(whole);
        let bps = scaled / (u128::from(whole) * 2);
        Self(u32::try_from(bps).unwrap_or(u32::MAX))
    }

    /// The complement of this percentage, saturating at zero.
    pub fn complement(self) -> Self {
        Self(FULL_BPS.saturating_sub(self.0))
    }

    /// Is `part / whole >= self`, compared exactly?
    pub fn is_met_by(self, part: u64, whole: u64) -> bool {
        if whole == 0 {
            return self.0 == 0;
        }
        u128::from(part) * u128::from(FULL_BPS) >= u128::from(self.0) * u128::from(whole)
    }

    /// Is `part / whole > self`, compared exactly?
    pub fn is_exceeded_by(self, part: u64, whole: u64) -> bool {
        if whole == 0 {
            return false;
        }
        u128::from(part) * u128::from(FULL_BPS) > u128::from(self.0) * u128::from(whole)
    }
}

impl Display for Percentage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_rounds_half_up() {
        assert_eq!(Percentage::ratio(310, 600), Percentage::from_bps(5167));
        assert_eq!(Percentage::ratio(280, 550), Percentage::from_bps(5091));
        assert_eq!(Percentage::ratio(1, 8), Percentage::from_bps(1250));
        // 1/3 = 33.333...% rounds down, 2/3 = 66.666...% rounds up.
        assert_eq!(Percentage::ratio(1, 3), Percentage::from_bps(3333));
        assert_eq!(Percentage::ratio(2, 3), Percentage::from_bps(6667));
        assert_eq!(Percentage::ratio(5, 0), Percentage::ZERO);
    }

    #[test]
    fn exact_comparisons() {
        // Exactly half is met but not exceeded.
        assert!(Percentage::HALF.is_met_by(500, 1000));
        assert!(!Percentage::HALF.is_exceeded_by(500, 1000));
        assert!(Percentage::HALF.is_exceeded_by(501, 1000));
        // Rounding must not leak into comparisons: 6667 bps is not met by 2/3.
        assert!(!Percentage::from_bps(6667).is_met_by(2, 3));
        assert!(Percentage::ZERO.is_met_by(0, 0));
        assert!(!Percentage::HALF.is_met_by(0, 0));
    }

    #[test]
    fn display() {
        assert_eq!(Percentage::from_bps(5167).to_string(), "51.67%");
        assert_eq!(Percentage::from_bps(5).to_string(), "0.05%");
        assert_eq!(Percentage::FULL.to_string(), "100.00%");
    }
}

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// States in the SessionTally lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultStatus {
    /// Freshly computed, or confirmed by a recount.
    Computed,
    /// Formally approved. Terminal.
    Homologated,
    /// Under complaint, awaiting adjudication.
    Contested,
    /// A supervised recount is running.
    Recount,
    /// Annulled. Terminal; must never feed diplomation.
    Invalidated,
}

impl ResultStatus {
    /// May a supervised recount start from this state?
    pub fn permits_recount(self) -> bool {
        matches!(self, Self::Computed | Self::Contested)
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Homologated | Self::Invalidated)
    }

    /// The single transition-validation function for results.
    /// Returns the state reached by applying `transition`, or `None` if the
    /// transition is not allowed from here. Guards that need more than the
    /// current state (fingerprints, recount findings) are checked by the
    /// caller before asking.
    pub fn apply(self, transition: Transition) -> Option<ResultStatus> {
        use ResultStatus::*;
        use Transition::*;

        match (self, transition) {
            (Computed, Homologate) => Some(Homologated),
            (Computed, Contest) => Some(Contested),
            (Computed | Contested, BeginRecount) => Some(Recount),
            (Recount, ConfirmRecount) => Some(Computed),
            (Recount, ReportDivergence | RecountFailed) => Some(Contested),
            (Contested, Dismiss) => Some(Computed),
            (Computed | Contested | Recount, Invalidate) => Some(Invalidated),
            _ => None,
        }
    }
}

impl Display for ResultStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Computed => "Computed",
            Self::Homologated => "Homologated",
            Self::Contested => "Contested",
            Self::Recount => "Recount",
            Self::Invalidated => "Invalidated",
        };
        f.write_str(name)
    }
}

/// Every way a result's status may change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    Homologate,
    Contest,
    BeginRecount,
    ConfirmRecount,
    ReportDivergence,
    /// The recount itself hit an integrity violation.
    RecountFailed,
    Dismiss,
    Invalidate,
}

impl Display for Transition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [ResultStatus; 5] = [
        ResultStatus::Computed,
        ResultStatus::Homologated,
        ResultStatus::Contested,
        ResultStatus::Recount,
        ResultStatus::Invalidated,
    ];

    const ALL_TRANSITIONS: [Transition; 8] = [
        Transition::Homologate,
        Transition::Contest,
        Transition::BeginRecount,
        Transition::ConfirmRecount,
        Transition::ReportDivergence,
        Transition::RecountFailed,
        Transition::Dismiss,
        Transition::Invalidate,
    ];

    #[test]
    fn terminal_states_are_final() {
        for state in ALL_STATES.into_iter().filter(|s| s.is_terminal()) {
            for transition in ALL_TRANSITIONS {
                assert_eq!(state.apply(transition), None, "{state} --{transition}-->");
            }
        }
    }

    #[test]
    fn contested_recount_paths() {
        let state = ResultStatus::Computed
            .apply(Transition::Contest)
            .and_then(|s| s.apply(Transition::BeginRecount))
            .unwrap();
        assert_eq!(state, ResultStatus::Recount);
        assert_eq!(
            state.apply(Transition::ConfirmRecount),
            Some(ResultStatus::Computed)
        );
        assert_eq!(
            state.apply(Transition::ReportDivergence),
            Some(ResultStatus::Contested)
        );
        assert_eq!(state.apply(Transition::Invalidate), Some(ResultStatus::Invalidated));
    }

    #[test]
    fn homologation_only_from_computed() {
        for state in ALL_STATES {
            let expected = (state == ResultStatus::Computed).then_some(ResultStatus::Homologated);
            assert_eq!(state.apply(Transition::Homologate), expected);
        }
    }

    #[test]
    fn recount_permission_matches_transitions() {
        for state in ALL_STATES {
            assert_eq!(
                state.permits_recount(),
                state.apply(Transition::BeginRecount).is_some()
            );
        }
    }
}

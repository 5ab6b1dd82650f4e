//! Coordinator state machine.

use serde::{Deserialize, Serialize};

/// The state of a coordinator in its lifecycle.
///
/// State transitions:
/// ```text
/// Idle ──► Running ──┬──► Completed
///                    └──► Compensating ──┬──► Compensated
///                                        └──► CompensationFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CoordinatorState {
    /// Constructed, not yet playing.
    #[default]
    Idle,

    /// Forward actions are being executed.
    Running,

    /// A forward action failed and completed steps are being rolled back.
    Compensating,

    /// Every forward action succeeded (terminal state).
    Completed,

    /// Every compensation that ran succeeded (terminal state).
    Compensated,

    /// At least one compensation failed (terminal state).
    CompensationFailed,
}

impl CoordinatorState {
    /// Returns true if the coordinator may move from `self` to `next`.
    pub fn can_transition_to(&self, next: CoordinatorState) -> bool {
        use CoordinatorState::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Running, Completed)
                | (Running, Compensating)
                | (Compensating, Compensated)
                | (Compensating, CompensationFailed)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CoordinatorState::Completed
                | CoordinatorState::Compensated
                | CoordinatorState::CompensationFailed
        )
    }

    /// Returns true if the run ended with a forward failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CoordinatorState::Compensated | CoordinatorState::CompensationFailed
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatorState::Idle => "Idle",
            CoordinatorState::Running => "Running",
            CoordinatorState::Compensating => "Compensating",
            CoordinatorState::Completed => "Completed",
            CoordinatorState::Compensated => "Compensated",
            CoordinatorState::CompensationFailed => "CompensationFailed",
        }
    }
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CoordinatorState; 6] = [
        CoordinatorState::Idle,
        CoordinatorState::Running,
        CoordinatorState::Compensating,
        CoordinatorState::Completed,
        CoordinatorState::Compensated,
        CoordinatorState::CompensationFailed,
    ];

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(CoordinatorState::default(), CoordinatorState::Idle);
    }

    #[test]
    fn test_allowed_transitions() {
        use CoordinatorState::*;
        assert!(Idle.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Compensating));
        assert!(Compensating.can_transition_to(Compensated));
        assert!(Compensating.can_transition_to(CompensationFailed));
    }

    #[test]
    fn test_rejected_transitions() {
        use CoordinatorState::*;
        assert!(!Idle.can_transition_to(Completed));
        assert!(!Running.can_transition_to(Compensated));
        assert!(!Completed.can_transition_to(Compensating));
        assert!(!Compensating.can_transition_to(Running));
    }

    #[test]
    fn test_terminal_states_have_no_successor() {
        for state in ALL.into_iter().filter(CoordinatorState::is_terminal) {
            assert!(ALL.iter().all(|next| !state.can_transition_to(*next)));
        }
    }

    #[test]
    fn test_failure_states() {
        assert!(!CoordinatorState::Completed.is_failure());
        assert!(CoordinatorState::Compensated.is_failure());
        assert!(CoordinatorState::CompensationFailed.is_failure());
    }

    #[test]
    fn test_display() {
        assert_eq!(CoordinatorState::Idle.to_string(), "Idle");
        assert_eq!(
            CoordinatorState::CompensationFailed.to_string(),
            "CompensationFailed"
        );
    }

    #[test]
    fn test_serialization() {
        let state = CoordinatorState::Compensating;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: CoordinatorState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}

//! Saga state machine.

use serde::{Deserialize, Serialize};

/// The state of a saga execution in its lifecycle.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          ├──► Compensating ──► Failed
///                          └──► Faulted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// Saga has not started yet.
    #[default]
    NotStarted,

    /// Activities are being executed.
    Running,

    /// An activity reported failure and its compensations are running.
    Compensating,

    /// Every activity succeeded (terminal state).
    Completed,

    /// An activity reported failure and its compensations ran (terminal state).
    Failed,

    /// An activity faulted, timed out or was cancelled (terminal state).
    Faulted,
}

impl SagaState {
    /// Returns true if the saga can begin running.
    pub fn can_run(&self) -> bool {
        matches!(self, SagaState::NotStarted)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaState::Completed | SagaState::Failed | SagaState::Faulted
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::NotStarted => "NotStarted",
            SagaState::Running => "Running",
            SagaState::Compensating => "Compensating",
            SagaState::Completed => "Completed",
            SagaState::Failed => "Failed",
            SagaState::Faulted => "Faulted",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_not_started() {
        assert_eq!(SagaState::default(), SagaState::NotStarted);
    }

    #[test]
    fn test_can_run() {
        assert!(SagaState::NotStarted.can_run());
        assert!(!SagaState::Running.can_run());
        assert!(!SagaState::Compensating.can_run());
        assert!(!SagaState::Completed.can_run());
        assert!(!SagaState::Failed.can_run());
        assert!(!SagaState::Faulted.can_run());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SagaState::NotStarted.is_terminal());
        assert!(!SagaState::Running.is_terminal());
        assert!(!SagaState::Compensating.is_terminal());
        assert!(SagaState::Completed.is_terminal());
        assert!(SagaState::Failed.is_terminal());
        assert!(SagaState::Faulted.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(SagaState::Compensating.to_string(), "Compensating");
        assert_eq!(SagaState::Faulted.to_string(), "Faulted");
    }

    #[test]
    fn test_serialization() {
        let state = SagaState::Compensating;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"Compensating\"");
        let deserialized: SagaState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}

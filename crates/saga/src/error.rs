//! Saga error types.

use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by a faulting activity or compensation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A compensation that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("compensation '{compensation}' failed: {reason}")]
pub struct CompensationFailure {
    /// Name of the compensation.
    pub compensation: String,
    /// Error message reported by the compensation.
    pub reason: String,
}

/// Errors that can occur while building or executing a saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// An activity with this name is already registered.
    #[error("Activity '{0}' is already registered")]
    DuplicateActivity(String),

    /// A compensation was registered with a payload type the activity does not produce.
    #[error(
        "Compensation '{compensation}' on activity '{activity}' expects {found}, but the activity produces {expected}"
    )]
    PayloadTypeMismatch {
        activity: String,
        compensation: String,
        expected: &'static str,
        found: &'static str,
    },

    /// An activity's action returned an error instead of a step result.
    #[error("Activity '{activity}' faulted: {source}")]
    ActivityFaulted {
        activity: String,
        #[source]
        source: BoxError,
    },

    /// An activity did not finish within the configured timeout.
    #[error("Activity '{activity}' timed out after {timeout:?}")]
    ActivityTimedOut { activity: String, timeout: Duration },

    /// Execution was cancelled before the activity completed.
    #[error("Saga cancelled before activity '{activity}' completed")]
    Cancelled { activity: String },

    /// One or more compensations of a failed activity did not complete.
    #[error("{} compensation(s) for activity '{activity}' failed", failures.len())]
    CompensationFailed {
        activity: String,
        failures: Vec<CompensationFailure>,
    },

    /// The definition has already been executed.
    #[error("Saga '{0}' has already been executed")]
    AlreadyExecuted(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaError {
    /// Returns true for errors raised while an activity was running.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            SagaError::ActivityFaulted { .. }
                | SagaError::ActivityTimedOut { .. }
                | SagaError::Cancelled { .. }
        )
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

//! Recorded activity outcomes.

use crate::step::{PayloadType, StepResult};

/// The recorded result of one attempted activity.
#[derive(Debug, Clone)]
pub struct ActivityOutcome {
    activity_name: String,
    payload_type: PayloadType,
    result: StepResult,
}

impl ActivityOutcome {
    pub(crate) fn new(
        activity_name: impl Into<String>,
        payload_type: PayloadType,
        result: StepResult,
    ) -> Self {
        Self {
            activity_name: activity_name.into(),
            payload_type,
            result,
        }
    }

    /// Returns the activity name.
    pub fn activity_name(&self) -> &str {
        &self.activity_name
    }

    /// Returns true if the activity reported success.
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// Returns the erased step result.
    pub fn result(&self) -> &StepResult {
        &self.result
    }

    /// Returns the payload type the activity declared.
    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    /// Borrows the payload as a `T`, if the activity produced one.
    pub fn payload<T: 'static>(&self) -> Option<&T> {
        self.result.payload_as::<T>()
    }

    /// Returns the typed step result, if the activity produced a `T`.
    pub fn typed<T: Send + Sync + 'static>(&self) -> Option<StepResult<T>> {
        self.result.downcast::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_exposes_typed_payload() {
        let outcome = ActivityOutcome::new(
            "Remove-User-Activity",
            PayloadType::of::<String>(),
            StepResult::failed(String::from("db conflict")).erase(),
        );

        assert_eq!(outcome.activity_name(), "Remove-User-Activity");
        assert!(!outcome.is_success());
        assert_eq!(outcome.payload::<String>().map(String::as_str), Some("db conflict"));
        assert!(outcome.payload::<u32>().is_none());
        assert!(!outcome.typed::<String>().unwrap().is_success());
        assert_eq!(outcome.payload_type(), PayloadType::of::<String>());
    }
}

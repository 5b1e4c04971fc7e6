//! Execution journal: the ordered event trail of one saga execution.

use common::EntityId;

use crate::error::Result;
use crate::events::SagaEvent;
use crate::state::SagaState;

/// Records every event of a saga execution and folds them into a summary.
///
/// The journal is the source of truth for the saga's lifecycle state.
#[derive(Debug, Clone, Default)]
pub struct SagaJournal {
    execution_id: Option<EntityId>,
    state: SagaState,
    events: Vec<SagaEvent>,
    completed_activities: Vec<String>,
    failed_activity: Option<String>,
    /// Compensations that ran to completion, in invocation order.
    compensations_completed: Vec<String>,
    /// Compensations that reported an error, in invocation order.
    compensations_failed: Vec<String>,
    failure_reason: Option<String>,
}

impl SagaJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event to the summary and appends it to the trail.
    pub(crate) fn record(&mut self, event: SagaEvent) {
        self.apply(&event);
        self.events.push(event);
    }

    fn apply(&mut self, event: &SagaEvent) {
        match event {
            SagaEvent::SagaStarted(data) => {
                self.execution_id = Some(data.execution_id);
                self.state = SagaState::Running;
            }
            SagaEvent::ActivityStarted(_) => {}
            SagaEvent::ActivityCompleted(data) => {
                self.completed_activities.push(data.activity_name.clone());
            }
            SagaEvent::ActivityFailed(data) => {
                self.failed_activity = Some(data.activity_name.clone());
            }
            SagaEvent::ActivityFaulted(data) => {
                self.failed_activity = Some(data.activity_name.clone());
                self.failure_reason = Some(data.error.clone());
                self.state = SagaState::Faulted;
            }
            SagaEvent::CompensationStarted(_) => {
                self.state = SagaState::Compensating;
            }
            SagaEvent::CompensationCompleted(data) => {
                self.compensations_completed
                    .push(data.compensation_name.clone());
            }
            SagaEvent::CompensationFailed(data) => {
                self.compensations_failed.push(data.compensation_name.clone());
            }
            SagaEvent::SagaCompleted(_) => {
                self.state = SagaState::Completed;
            }
            SagaEvent::SagaFailed(data) => {
                self.state = SagaState::Failed;
                self.failure_reason = Some(data.reason.clone());
            }
        }
    }

    /// Returns the identifier of the recorded execution, if it started.
    pub fn execution_id(&self) -> Option<EntityId> {
        self.execution_id
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> SagaState {
        self.state
    }

    /// Returns all recorded events in order.
    pub fn events(&self) -> &[SagaEvent] {
        &self.events
    }

    /// Returns the names of activities that completed successfully.
    pub fn completed_activities(&self) -> &[String] {
        &self.completed_activities
    }

    /// Returns the activity that failed or faulted, if any.
    pub fn failed_activity(&self) -> Option<&str> {
        self.failed_activity.as_deref()
    }

    /// Returns the compensations that completed, in invocation order.
    pub fn compensations_completed(&self) -> &[String] {
        &self.compensations_completed
    }

    /// Returns the compensations that failed, in invocation order.
    pub fn compensations_failed(&self) -> &[String] {
        &self.compensations_failed
    }

    /// Returns the failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Serializes the event trail as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.events)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVITY: &str = "Remove-User-Activity";

    fn started() -> SagaJournal {
        let mut journal = SagaJournal::new();
        journal.record(SagaEvent::saga_started(EntityId::new(), "Remove-User-Saga"));
        journal
    }

    #[test]
    fn test_default_journal() {
        let journal = SagaJournal::new();
        assert!(journal.execution_id().is_none());
        assert_eq!(journal.state(), SagaState::NotStarted);
        assert!(journal.events().is_empty());
    }

    #[test]
    fn test_successful_lifecycle() {
        let mut journal = started();
        assert_eq!(journal.state(), SagaState::Running);
        assert!(journal.execution_id().is_some());

        journal.record(SagaEvent::activity_started(ACTIVITY));
        journal.record(SagaEvent::activity_completed(ACTIVITY));
        journal.record(SagaEvent::saga_completed());

        assert_eq!(journal.state(), SagaState::Completed);
        assert_eq!(journal.completed_activities(), &[ACTIVITY]);
        assert!(journal.failed_activity().is_none());
        assert_eq!(journal.events().len(), 4);
    }

    #[test]
    fn test_failure_and_compensation() {
        let mut journal = started();
        journal.record(SagaEvent::activity_started(ACTIVITY));
        journal.record(SagaEvent::activity_failed(ACTIVITY));
        assert_eq!(journal.failed_activity(), Some(ACTIVITY));

        journal.record(SagaEvent::compensation_started(ACTIVITY, "RollBack-Remove-Org"));
        assert_eq!(journal.state(), SagaState::Compensating);
        journal.record(SagaEvent::compensation_completed(ACTIVITY, "RollBack-Remove-Org"));

        journal.record(SagaEvent::compensation_started(ACTIVITY, "RollBack-Remove-User"));
        journal.record(SagaEvent::compensation_failed(
            ACTIVITY,
            "RollBack-Remove-User",
            "transaction already closed",
        ));
        // Still compensating: a failed compensation does not stop the chain
        assert_eq!(journal.state(), SagaState::Compensating);

        journal.record(SagaEvent::saga_failed("activity failed"));
        assert_eq!(journal.state(), SagaState::Failed);
        assert_eq!(journal.compensations_completed(), &["RollBack-Remove-Org"]);
        assert_eq!(journal.compensations_failed(), &["RollBack-Remove-User"]);
        assert_eq!(journal.failure_reason(), Some("activity failed"));
    }

    #[test]
    fn test_fault_is_terminal() {
        let mut journal = started();
        journal.record(SagaEvent::activity_started(ACTIVITY));
        journal.record(SagaEvent::activity_faulted(ACTIVITY, "connection reset"));

        assert_eq!(journal.state(), SagaState::Faulted);
        assert!(journal.state().is_terminal());
        assert_eq!(journal.failure_reason(), Some("connection reset"));
    }

    #[test]
    fn test_to_json_lists_events_in_order() {
        let mut journal = started();
        journal.record(SagaEvent::activity_started(ACTIVITY));

        let json: serde_json::Value = serde_json::from_str(&journal.to_json().unwrap()).unwrap();
        let types: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|event| event["type"].as_str().unwrap())
            .collect();
        assert_eq!(types, ["SagaStarted", "ActivityStarted"]);
    }
}

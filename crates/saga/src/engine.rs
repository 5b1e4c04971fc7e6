//! Saga execution: runs activities in order and unwinds the failing one.

use std::time::Instant;

use common::EntityId;

use crate::definition::{ActivityDefinition, SagaDefinition};
use crate::error::{CompensationFailure, Result, SagaError};
use crate::events::SagaEvent;
use crate::journal::SagaJournal;
use crate::options::ExecuteOptions;
use crate::outcome::ActivityOutcome;
use crate::step::StepResult;

impl SagaDefinition {
    /// Executes the saga with default options.
    ///
    /// See [`execute_with`](Self::execute_with).
    pub async fn execute(&mut self) -> Result<&[ActivityOutcome]> {
        self.execute_with(ExecuteOptions::default()).await
    }

    /// Executes every activity in registration order.
    ///
    /// - `success = true`: the outcome is recorded and the next activity runs.
    /// - `success = false`: the outcome is recorded, that activity's
    ///   compensations run in registration order with its step result, and
    ///   execution stops. This is not an error.
    /// - the action returns `Err`, times out or is cancelled: execution
    ///   aborts without recording an outcome or compensating anything. Undoing
    ///   earlier activities is left to the caller.
    ///
    /// A definition executes once; later calls return
    /// [`SagaError::AlreadyExecuted`] and leave the outcomes untouched.
    ///
    /// # Errors
    ///
    /// Returns the fault of the first faulting activity, or
    /// [`SagaError::CompensationFailed`] if a compensation did not complete.
    #[tracing::instrument(skip(self, options), fields(saga = %self.name))]
    pub async fn execute_with(&mut self, options: ExecuteOptions) -> Result<&[ActivityOutcome]> {
        if !self.journal.state().can_run() {
            return Err(SagaError::AlreadyExecuted(self.name.clone()));
        }

        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = Instant::now();

        let execution_id = EntityId::new();
        self.journal
            .record(SagaEvent::saga_started(execution_id, &self.name));
        tracing::info!(%execution_id, activities = self.activities.len(), "saga started");

        let result = run_activities(
            &mut self.activities,
            &mut self.outcomes,
            &mut self.journal,
            &options,
        )
        .await;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);

        match &result {
            Ok(()) if self.succeeded() => {
                metrics::counter!("saga_completed").increment(1);
                tracing::info!(%execution_id, duration, "saga completed successfully");
            }
            Ok(()) => {
                metrics::counter!("saga_failed").increment(1);
                tracing::warn!(
                    %execution_id,
                    activity = self.journal.failed_activity().unwrap_or("unknown"),
                    "saga failed"
                );
            }
            Err(SagaError::CompensationFailed { .. }) => {
                metrics::counter!("saga_failed").increment(1);
            }
            Err(error) => {
                metrics::counter!("saga_faulted").increment(1);
                tracing::error!(%execution_id, %error, "saga faulted");
            }
        }

        result.map(|()| self.outcomes.as_slice())
    }
}

async fn run_activities(
    activities: &mut [ActivityDefinition],
    outcomes: &mut Vec<ActivityOutcome>,
    journal: &mut SagaJournal,
    options: &ExecuteOptions,
) -> Result<()> {
    for activity in activities.iter_mut() {
        if options.is_cancelled() {
            let error = SagaError::Cancelled {
                activity: activity.name.clone(),
            };
            journal.record(SagaEvent::activity_faulted(&activity.name, error.to_string()));
            return Err(error);
        }

        tracing::info!(activity = %activity.name, "saga activity started");
        journal.record(SagaEvent::activity_started(&activity.name));

        let result = match invoke_activity(activity, options).await {
            Ok(result) => result,
            Err(error) => {
                journal.record(SagaEvent::activity_faulted(&activity.name, error.to_string()));
                return Err(error);
            }
        };

        outcomes.push(ActivityOutcome::new(
            activity.name.clone(),
            activity.payload_type,
            result.clone(),
        ));

        if result.is_success() {
            journal.record(SagaEvent::activity_completed(&activity.name));
            continue;
        }

        tracing::warn!(activity = %activity.name, "saga activity reported failure");
        journal.record(SagaEvent::activity_failed(&activity.name));

        let failures = compensate(activity, &result, journal, options).await;
        journal.record(SagaEvent::saga_failed(format!(
            "Activity failed: {}",
            activity.name
        )));

        if !failures.is_empty() {
            return Err(SagaError::CompensationFailed {
                activity: activity.name.clone(),
                failures,
            });
        }
        return Ok(());
    }

    journal.record(SagaEvent::saga_completed());
    Ok(())
}

/// Runs one activity's action under the configured timeout and cancellation.
async fn invoke_activity(
    activity: &mut ActivityDefinition,
    options: &ExecuteOptions,
) -> Result<StepResult> {
    let name = activity.name.as_str();
    let action = (activity.action)();

    let run = async {
        let outcome = match options.activity_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, action).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(SagaError::ActivityTimedOut {
                        activity: name.to_string(),
                        timeout,
                    });
                }
            },
            None => action.await,
        };
        outcome.map_err(|source| SagaError::ActivityFaulted {
            activity: name.to_string(),
            source,
        })
    };

    match &options.cancellation {
        Some(token) => {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(SagaError::Cancelled {
                    activity: name.to_string(),
                }),
                result = run => result,
            }
        }
        None => run.await,
    }
}

/// Runs every compensation of a failed activity, in registration order.
///
/// A failing compensation is logged and collected; the rest still run.
async fn compensate(
    activity: &mut ActivityDefinition,
    result: &StepResult,
    journal: &mut SagaJournal,
    options: &ExecuteOptions,
) -> Vec<CompensationFailure> {
    let mut failures = Vec::new();

    for compensation in &mut activity.compensations {
        tracing::info!(
            activity = %activity.name,
            compensation = %compensation.name,
            "compensation started"
        );
        journal.record(SagaEvent::compensation_started(
            &activity.name,
            &compensation.name,
        ));
        metrics::counter!("saga_compensations_total").increment(1);

        let run = (compensation.action)(result.clone());
        let outcome = match options.compensation_timeout {
            Some(timeout) => tokio::time::timeout(timeout, run)
                .await
                .unwrap_or_else(|_| Err(format!("timed out after {timeout:?}").into())),
            None => run.await,
        };

        match outcome {
            Ok(()) => {
                journal.record(SagaEvent::compensation_completed(
                    &activity.name,
                    &compensation.name,
                ));
            }
            Err(error) => {
                tracing::warn!(
                    activity = %activity.name,
                    compensation = %compensation.name,
                    %error,
                    "compensation failed"
                );
                journal.record(SagaEvent::compensation_failed(
                    &activity.name,
                    &compensation.name,
                    error.to_string(),
                ));
                failures.push(CompensationFailure {
                    compensation: compensation.name.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::state::SagaState;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording_activity(
        saga: SagaDefinition,
        name: &'static str,
        success: bool,
        log: &Log,
    ) -> SagaDefinition {
        let log = Arc::clone(log);
        saga.add_activity(name, move || {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name.to_string());
                Ok::<_, Infallible>(StepResult::new(success, name.to_string()))
            }
        })
        .unwrap()
    }

    fn recording_compensation(
        saga: SagaDefinition,
        activity: &'static str,
        name: &'static str,
        log: &Log,
    ) -> SagaDefinition {
        let log = Arc::clone(log);
        saga.add_compensation(activity, name, move |result: StepResult<String>| {
            let log = Arc::clone(&log);
            async move {
                log.lock()
                    .unwrap()
                    .push(format!("{name}<-{}", result.payload()));
                Ok::<_, Infallible>(())
            }
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_saga_completes() {
        let mut saga = SagaDefinition::new("Empty-Saga");
        let outcomes = saga.execute().await.unwrap();
        assert!(outcomes.is_empty());
        assert!(saga.succeeded());
    }

    #[tokio::test]
    async fn test_business_failure_runs_only_failing_compensations() {
        let log = Log::default();
        let mut saga = SagaDefinition::new("Saga");
        saga = recording_activity(saga, "A", true, &log);
        saga = recording_activity(saga, "B", false, &log);
        saga = recording_compensation(saga, "A", "undo-A", &log);
        saga = recording_compensation(saga, "B", "undo-B", &log);

        saga.execute().await.unwrap();

        assert_eq!(*log.lock().unwrap(), ["A", "B", "undo-B<-B"]);
        assert_eq!(saga.state(), SagaState::Failed);
        assert_eq!(saga.journal().failed_activity(), Some("B"));
    }

    #[tokio::test]
    async fn test_second_execution_is_rejected() {
        let log = Log::default();
        let mut saga = recording_activity(SagaDefinition::new("Saga"), "A", true, &log);

        saga.execute().await.unwrap();
        let second = saga.execute().await;

        assert!(matches!(second, Err(SagaError::AlreadyExecuted(name)) if name == "Saga"));
        assert_eq!(saga.activity_outcomes().len(), 1);
        assert_eq!(*log.lock().unwrap(), ["A"]);
    }

    #[tokio::test]
    async fn test_journal_records_full_trail() {
        let log = Log::default();
        let mut saga = SagaDefinition::new("Saga");
        saga = recording_activity(saga, "A", false, &log);
        saga = recording_compensation(saga, "A", "undo-A", &log);

        saga.execute().await.unwrap();

        let types: Vec<&str> = saga
            .journal()
            .events()
            .iter()
            .map(SagaEvent::event_type)
            .collect();
        assert_eq!(
            types,
            [
                "SagaStarted",
                "ActivityStarted",
                "ActivityFailed",
                "CompensationStarted",
                "CompensationCompleted",
                "SagaFailed",
            ]
        );
        assert!(saga.journal().execution_id().is_some());
    }
}

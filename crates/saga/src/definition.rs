//! Saga definition: an ordered list of activities and their compensations.

use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};

use crate::error::{BoxError, Result, SagaError};
use crate::journal::SagaJournal;
use crate::outcome::ActivityOutcome;
use crate::state::SagaState;
use crate::step::{PayloadType, StepResult};

pub(crate) type ActionFn =
    Box<dyn FnMut() -> BoxFuture<'static, std::result::Result<StepResult, BoxError>> + Send>;

pub(crate) type CompensationFn =
    Box<dyn FnMut(StepResult) -> BoxFuture<'static, std::result::Result<(), BoxError>> + Send>;

pub(crate) struct CompensationDefinition {
    pub(crate) name: String,
    pub(crate) action: CompensationFn,
}

pub(crate) struct ActivityDefinition {
    pub(crate) name: String,
    pub(crate) payload_type: PayloadType,
    pub(crate) action: ActionFn,
    pub(crate) compensations: Vec<CompensationDefinition>,
}

/// A named, single-shot saga workflow.
///
/// Build one per workflow invocation: register activities in execution
/// order, attach compensations to activities by name, then call
/// [`execute`](Self::execute). Execution requires `&mut self`, so one
/// instance can never be run by two callers at once.
///
/// ```no_run
/// # use saga::{SagaDefinition, StepResult};
/// # async fn run() -> saga::Result<()> {
/// let mut saga = SagaDefinition::new("Remove-User-Saga")
///     .add_activity("Remove-User-Activity", || async {
///         Ok::<_, std::io::Error>(StepResult::failed(String::from("db conflict")))
///     })?
///     .add_compensation("Remove-User-Activity", "RollBack-Remove-User", |result: StepResult<String>| async move {
///         tracing::warn!(reason = %result.payload(), "rolling back");
///         Ok::<_, std::io::Error>(())
///     })?;
///
/// saga.execute().await?;
/// assert!(!saga.succeeded());
/// # Ok(())
/// # }
/// ```
pub struct SagaDefinition {
    pub(crate) name: String,
    pub(crate) activities: Vec<ActivityDefinition>,
    pub(crate) outcomes: Vec<ActivityOutcome>,
    pub(crate) journal: SagaJournal,
}

fn into_box_error<E: Into<BoxError>>(error: E) -> BoxError {
    error.into()
}

impl SagaDefinition {
    /// Creates an empty, named saga.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            activities: Vec::new(),
            outcomes: Vec::new(),
            journal: SagaJournal::new(),
        }
    }

    /// Appends an activity producing payloads of type `T`.
    ///
    /// The action returns `Ok(StepResult)` for both success and business
    /// failure; an `Err` is a fault that aborts the saga.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::DuplicateActivity`] if `name` is already registered.
    pub fn add_activity<T, F, Fut, E>(mut self, name: impl Into<String>, mut action: F) -> Result<Self>
    where
        T: Send + Sync + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<StepResult<T>, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let name = name.into();
        if self.contains(&name) {
            return Err(SagaError::DuplicateActivity(name));
        }

        let action: ActionFn = Box::new(move || {
            action()
                .map(|outcome| outcome.map(StepResult::<T>::erase).map_err(into_box_error))
                .boxed()
        });

        self.activities.push(ActivityDefinition {
            name,
            payload_type: PayloadType::of::<T>(),
            action,
            compensations: Vec::new(),
        });
        Ok(self)
    }

    /// Appends a compensation to the named activity.
    ///
    /// Compensations run in registration order, and only when that activity
    /// reports `success = false`. Registering against an unknown activity is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::PayloadTypeMismatch`] if `T` is not the payload
    /// type the activity was registered with.
    pub fn add_compensation<T, F, Fut, E>(
        mut self,
        activity_name: &str,
        compensation_name: impl Into<String>,
        mut action: F,
    ) -> Result<Self>
    where
        T: Send + Sync + 'static,
        F: FnMut(StepResult<T>) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let compensation_name = compensation_name.into();

        let Some(index) = self
            .activities
            .iter()
            .position(|activity| activity.name == activity_name)
        else {
            tracing::warn!(
                saga = %self.name,
                activity = activity_name,
                compensation = %compensation_name,
                "compensation target is not registered, ignoring"
            );
            return Ok(self);
        };

        let activity = &mut self.activities[index];
        let expected = activity.payload_type;
        let found = PayloadType::of::<T>();
        let mismatch = {
            let activity = activity.name.clone();
            let compensation = compensation_name.clone();
            move || SagaError::PayloadTypeMismatch {
                activity: activity.clone(),
                compensation: compensation.clone(),
                expected: expected.name(),
                found: found.name(),
            }
        };
        if expected != found {
            return Err(mismatch());
        }

        let action: CompensationFn = Box::new(move |result: StepResult| match result.downcast::<T>() {
            Some(typed) => action(typed)
                .map(|outcome| outcome.map_err(into_box_error))
                .boxed(),
            // Only reachable if a payload bypassed the registration check above.
            None => future::ready(Err(into_box_error(mismatch()))).boxed(),
        });

        activity.compensations.push(CompensationDefinition {
            name: compensation_name,
            action,
        });
        Ok(self)
    }

    /// Returns the saga name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of registered activities.
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    /// Returns true if no activity is registered.
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Returns true if an activity with this name is registered.
    pub fn contains(&self, activity_name: &str) -> bool {
        self.activities
            .iter()
            .any(|activity| activity.name == activity_name)
    }

    /// Returns activity names in registration order.
    pub fn activity_names(&self) -> impl Iterator<Item = &str> {
        self.activities.iter().map(|activity| activity.name.as_str())
    }

    /// Returns the compensation names of an activity in registration order.
    pub fn compensation_names(&self, activity_name: &str) -> Option<Vec<&str>> {
        self.activities
            .iter()
            .find(|activity| activity.name == activity_name)
            .map(|activity| {
                activity
                    .compensations
                    .iter()
                    .map(|compensation| compensation.name.as_str())
                    .collect()
            })
    }

    /// Returns the outcomes recorded so far, in execution order.
    pub fn activity_outcomes(&self) -> &[ActivityOutcome] {
        &self.outcomes
    }

    /// Looks up the outcome of an activity by name.
    pub fn outcome(&self, activity_name: &str) -> Option<&ActivityOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.activity_name() == activity_name)
    }

    /// Returns true if every registered activity ran and succeeded.
    pub fn succeeded(&self) -> bool {
        self.state() == SagaState::Completed
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> SagaState {
        self.journal.state()
    }

    /// Returns the execution journal.
    pub fn journal(&self) -> &SagaJournal {
        &self.journal
    }
}

impl std::fmt::Debug for SagaDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaDefinition")
            .field("name", &self.name)
            .field("activities", &self.activity_names().collect::<Vec<_>>())
            .field("state", &self.state())
            .field("outcomes", &self.outcomes)
            .finish()
    }
}

//! Events recorded while a saga executes.

use chrono::{DateTime, Utc};
use common::EntityId;
use serde::{Deserialize, Serialize};

/// Events that can occur during saga execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    /// Saga execution started.
    SagaStarted(SagaStartedData),

    /// An activity's action was invoked.
    ActivityStarted(ActivityData),

    /// An activity returned a successful step result.
    ActivityCompleted(ActivityData),

    /// An activity returned a step result with `success = false`.
    ActivityFailed(ActivityData),

    /// An activity faulted, timed out or was cancelled before producing a result.
    ActivityFaulted(ActivityFaultedData),

    /// A compensation was invoked.
    CompensationStarted(CompensationData),

    /// A compensation completed.
    CompensationCompleted(CompensationData),

    /// A compensation failed (logged, the remaining compensations still run).
    CompensationFailed(CompensationFailedData),

    /// Every activity succeeded.
    SagaCompleted(SagaCompletedData),

    /// An activity failed and its compensations were run.
    SagaFailed(SagaFailedData),
}

impl SagaEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::SagaStarted(_) => "SagaStarted",
            SagaEvent::ActivityStarted(_) => "ActivityStarted",
            SagaEvent::ActivityCompleted(_) => "ActivityCompleted",
            SagaEvent::ActivityFailed(_) => "ActivityFailed",
            SagaEvent::ActivityFaulted(_) => "ActivityFaulted",
            SagaEvent::CompensationStarted(_) => "CompensationStarted",
            SagaEvent::CompensationCompleted(_) => "CompensationCompleted",
            SagaEvent::CompensationFailed(_) => "CompensationFailed",
            SagaEvent::SagaCompleted(_) => "SagaCompleted",
            SagaEvent::SagaFailed(_) => "SagaFailed",
        }
    }
}

/// Data for SagaStarted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaStartedData {
    /// Identifier of this execution.
    pub execution_id: EntityId,
    /// The saga name (e.g., "Remove-User-Saga").
    pub saga_name: String,
    /// When the saga started.
    pub started_at: DateTime<Utc>,
}

/// Data for activity started/completed/failed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityData {
    /// The activity name.
    pub activity_name: String,
}

/// Data for ActivityFaulted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityFaultedData {
    /// The activity that faulted.
    pub activity_name: String,
    /// Error message describing the fault.
    pub error: String,
}

/// Data for compensation started/completed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationData {
    /// The activity the compensation belongs to.
    pub activity_name: String,
    /// The compensation name.
    pub compensation_name: String,
}

/// Data for CompensationFailed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationFailedData {
    /// The activity the compensation belongs to.
    pub activity_name: String,
    /// The compensation name.
    pub compensation_name: String,
    /// Error message reported by the compensation.
    pub error: String,
}

/// Data for SagaCompleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaCompletedData {
    /// When the saga completed.
    pub completed_at: DateTime<Utc>,
}

/// Data for SagaFailed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaFailedData {
    /// Reason for failure.
    pub reason: String,
    /// When the saga failed.
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl SagaEvent {
    /// Creates a SagaStarted event.
    pub fn saga_started(execution_id: EntityId, saga_name: impl Into<String>) -> Self {
        SagaEvent::SagaStarted(SagaStartedData {
            execution_id,
            saga_name: saga_name.into(),
            started_at: Utc::now(),
        })
    }

    /// Creates an ActivityStarted event.
    pub fn activity_started(activity_name: impl Into<String>) -> Self {
        SagaEvent::ActivityStarted(ActivityData {
            activity_name: activity_name.into(),
        })
    }

    /// Creates an ActivityCompleted event.
    pub fn activity_completed(activity_name: impl Into<String>) -> Self {
        SagaEvent::ActivityCompleted(ActivityData {
            activity_name: activity_name.into(),
        })
    }

    /// Creates an ActivityFailed event.
    pub fn activity_failed(activity_name: impl Into<String>) -> Self {
        SagaEvent::ActivityFailed(ActivityData {
            activity_name: activity_name.into(),
        })
    }

    /// Creates an ActivityFaulted event.
    pub fn activity_faulted(activity_name: impl Into<String>, error: impl Into<String>) -> Self {
        SagaEvent::ActivityFaulted(ActivityFaultedData {
            activity_name: activity_name.into(),
            error: error.into(),
        })
    }

    /// Creates a CompensationStarted event.
    pub fn compensation_started(
        activity_name: impl Into<String>,
        compensation_name: impl Into<String>,
    ) -> Self {
        SagaEvent::CompensationStarted(CompensationData {
            activity_name: activity_name.into(),
            compensation_name: compensation_name.into(),
        })
    }

    /// Creates a CompensationCompleted event.
    pub fn compensation_completed(
        activity_name: impl Into<String>,
        compensation_name: impl Into<String>,
    ) -> Self {
        SagaEvent::CompensationCompleted(CompensationData {
            activity_name: activity_name.into(),
            compensation_name: compensation_name.into(),
        })
    }

    /// Creates a CompensationFailed event.
    pub fn compensation_failed(
        activity_name: impl Into<String>,
        compensation_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        SagaEvent::CompensationFailed(CompensationFailedData {
            activity_name: activity_name.into(),
            compensation_name: compensation_name.into(),
            error: error.into(),
        })
    }

    /// Creates a SagaCompleted event.
    pub fn saga_completed() -> Self {
        SagaEvent::SagaCompleted(SagaCompletedData {
            completed_at: Utc::now(),
        })
    }

    /// Creates a SagaFailed event.
    pub fn saga_failed(reason: impl Into<String>) -> Self {
        SagaEvent::SagaFailed(SagaFailedData {
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }
}

//! Per-execution options: timeouts and cancellation.

use std::time::Duration;

use crate::cancel::CancellationToken;

/// Options applied to a single saga execution.
///
/// The defaults impose no timeout and no cancellation.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Upper bound on each activity's action.
    pub activity_timeout: Option<Duration>,
    /// Upper bound on each compensation's action.
    pub compensation_timeout: Option<Duration>,
    /// Token observed before and during each activity.
    pub cancellation: Option<CancellationToken>,
}

impl ExecuteOptions {
    /// Creates options with no timeouts and no cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the activity timeout.
    pub fn with_activity_timeout(mut self, timeout: Duration) -> Self {
        self.activity_timeout = Some(timeout);
        self
    }

    /// Sets the compensation timeout.
    pub fn with_compensation_timeout(mut self, timeout: Duration) -> Self {
        self.compensation_timeout = Some(timeout);
        self
    }

    /// Attaches a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

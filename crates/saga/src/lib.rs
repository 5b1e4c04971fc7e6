//! Compensating-transaction (saga) orchestration.
//!
//! A [`SagaDefinition`] is an ordered list of named activities. Each activity
//! is an async action producing a [`StepResult`]; compensations attached to an
//! activity by name run only when that activity reports `success = false`.
//!
//! Execution is linear:
//! 1. Activities run one at a time, in registration order
//! 2. The first business failure runs that activity's compensations and stops
//! 3. A fault (the action returns `Err`, times out or is cancelled) aborts
//!    immediately and is returned to the caller
//!
//! Earlier, already-succeeded activities are never compensated by the engine;
//! their side effects belong to the caller (for example a shared database
//! transaction the caller rolls back).

pub mod cancel;
pub mod definition;
mod engine;
pub mod error;
pub mod events;
pub mod journal;
pub mod options;
pub mod outcome;
pub mod state;
pub mod step;

pub use cancel::CancellationToken;
pub use definition::SagaDefinition;
pub use error::{BoxError, CompensationFailure, Result, SagaError};
pub use events::SagaEvent;
pub use journal::SagaJournal;
pub use options::ExecuteOptions;
pub use outcome::ActivityOutcome;
pub use state::SagaState;
pub use step::{ErasedPayload, PayloadType, StepResult};

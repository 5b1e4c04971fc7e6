//! Step results produced by saga activities.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Type-erased payload stored by the engine.
pub type ErasedPayload = dyn Any + Send + Sync;

/// Outcome of one activity invocation: a success flag plus a payload.
///
/// The payload is reference-counted so the same result can be recorded as an
/// outcome and handed to every compensation of the activity without cloning
/// the payload itself. `StepResult<T>` is the typed form activities return;
/// the default `StepResult` is the erased form the engine records.
pub struct StepResult<T: ?Sized = ErasedPayload> {
    success: bool,
    payload: Arc<T>,
}

impl<T> StepResult<T> {
    /// Creates a result with an explicit success flag.
    pub fn new(success: bool, payload: T) -> Self {
        Self {
            success,
            payload: Arc::new(payload),
        }
    }

    /// A successful result.
    pub fn succeeded(payload: T) -> Self {
        Self::new(true, payload)
    }

    /// A business failure: the activity completed but reports `success = false`.
    pub fn failed(payload: T) -> Self {
        Self::new(false, payload)
    }
}

impl<T: ?Sized> StepResult<T> {
    /// Returns true if the activity reported success.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the payload.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Returns a shared handle to the payload.
    pub fn shared_payload(&self) -> Arc<T> {
        Arc::clone(&self.payload)
    }
}

impl<T: Send + Sync + 'static> StepResult<T> {
    pub(crate) fn erase(self) -> StepResult {
        StepResult {
            success: self.success,
            payload: self.payload,
        }
    }
}

impl StepResult {
    /// Narrows an erased result back to its concrete payload type.
    ///
    /// Returns `None` if the payload is not a `T`.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<StepResult<T>> {
        Arc::clone(&self.payload)
            .downcast::<T>()
            .ok()
            .map(|payload| StepResult {
                success: self.success,
                payload,
            })
    }

    /// Borrows the payload as a `T`, if it is one.
    pub fn payload_as<T: 'static>(&self) -> Option<&T> {
        (*self.payload).downcast_ref::<T>()
    }
}

impl<T: ?Sized> Clone for StepResult<T> {
    fn clone(&self) -> Self {
        Self {
            success: self.success,
            payload: Arc::clone(&self.payload),
        }
    }
}

impl<T: ?Sized> fmt::Debug for StepResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepResult")
            .field("success", &self.success)
            .finish_non_exhaustive()
    }
}

/// Type tag declared by an activity for its payload.
///
/// Compensations must be registered with the same payload type as the
/// activity they are attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadType {
    id: TypeId,
    name: &'static str,
}

impl PayloadType {
    /// The tag for `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The Rust type name of the payload.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

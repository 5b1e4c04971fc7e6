//! Membership error types.

use common::{EntityId, StatusCode};
use saga::SagaError;
use thiserror::Error;

use crate::users::TransactionStatus;

/// Errors that can occur in membership operations.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// No user with this identifier.
    #[error("User not found: {0}")]
    UserNotFound(EntityId),

    /// No organization with this identifier.
    #[error("Organization not found: {0}")]
    OrganizationNotFound(EntityId),

    /// A write conflicted with concurrent changes.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The transaction has already been committed or rolled back.
    #[error("Transaction is already {0}")]
    TransactionClosed(TransactionStatus),

    /// The organization service reported a failure.
    #[error("Organization service error ({status_code}): {message}")]
    Organization {
        status_code: StatusCode,
        message: String,
    },

    /// Saga construction or execution error.
    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),
}

impl MembershipError {
    /// Maps the error to the status code reported to callers.
    pub fn status_code(&self) -> StatusCode {
        match self {
            MembershipError::UserNotFound(_) | MembershipError::OrganizationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            MembershipError::Conflict(_) => StatusCode::CONFLICT,
            MembershipError::Organization { status_code, .. } => *status_code,
            MembershipError::TransactionClosed(_) | MembershipError::Saga(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convenience type alias for membership results.
pub type Result<T> = std::result::Result<T, MembershipError>;

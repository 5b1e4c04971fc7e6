//! User and organization membership services.
//!
//! The only multi-step operation is removing a user: the user's owned
//! organization is removed, then the user is deactivated inside a
//! transaction owned by the caller. Both steps run as one saga activity so a
//! failed deactivation can restore the organization and roll back the
//! transaction.

pub mod error;
pub mod model;
pub mod organizations;
pub mod remove_user;
pub mod users;

pub use error::MembershipError;
pub use model::{Organization, User, UserEntityResultSet, UserOrganization};
pub use organizations::{InMemoryOrganizationService, OrganizationResponse, OrganizationService};
pub use remove_user::{
    OrganizationRemoval, RemoveUserCommand, RemoveUserHandler, RemoveUserResponse, RemoveUserSaga,
    RemoveUserSagaResult,
};
pub use users::{
    InMemoryUserStore, InMemoryUserTransaction, TransactionStatus, UnitOfWork, UserRepository,
};

//! User and organization records.

use common::EntityId;
use serde::{Deserialize, Serialize};

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub email: String,
    /// Inactive users are treated as removed.
    pub active: bool,
}

impl User {
    /// Creates an active user with a fresh identifier.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            email: email.into(),
            active: true,
        }
    }
}

/// An organization owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: EntityId,
    pub name: String,
    pub active: bool,
}

impl Organization {
    /// Creates an active organization with a fresh identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            active: true,
        }
    }
}

/// Link between a user and the organization they own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOrganization {
    pub user_id: EntityId,
    pub org_id: EntityId,
}

/// A user together with the organization they own, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntityResultSet {
    pub user: User,
    pub organization: Option<UserOrganization>,
}

//! User repository, unit of work and in-memory implementations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use common::EntityId;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::error::{MembershipError, Result};
use crate::model::{User, UserEntityResultSet, UserOrganization};

/// Lifecycle of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Open,
    Committed,
    RolledBack,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Open => "open",
            TransactionStatus::Committed => "committed",
            TransactionStatus::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// A transaction over user records, created and owned by the caller.
///
/// Writes are staged until [`commit`](Self::commit); [`rollback`](Self::rollback)
/// discards them.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Stages the deactivation of a user.
    async fn deactivate_user(&self, user_id: EntityId) -> Result<()>;

    /// Applies every staged write.
    async fn commit(&self) -> Result<()>;

    /// Discards every staged write. Rolling back twice is a no-op.
    async fn rollback(&self) -> Result<()>;

    /// Returns the current status.
    async fn status(&self) -> TransactionStatus;
}

/// Read access to users plus transaction creation.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// The transaction handle type. Clones refer to the same transaction.
    type Transaction: UnitOfWork + Clone + 'static;

    /// Loads a user with their owned organization link.
    async fn get_user_by_identifier(&self, user_id: EntityId) -> Result<UserEntityResultSet>;

    /// Begins a new transaction.
    async fn begin_transaction(&self) -> Result<Self::Transaction>;
}

#[derive(Debug, Default)]
struct InMemoryUserState {
    users: HashMap<EntityId, User>,
    organizations: HashMap<EntityId, UserOrganization>,
    /// Conflict reason returned by the next staged update.
    fail_on_update: Option<String>,
}

/// In-memory user store for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    state: Arc<RwLock<InMemoryUserState>>,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user, optionally linked to an organization they own.
    pub async fn insert_user(&self, user: User, org_id: Option<EntityId>) {
        let mut state = self.state.write().await;
        if let Some(org_id) = org_id {
            state.organizations.insert(
                user.id,
                UserOrganization {
                    user_id: user.id,
                    org_id,
                },
            );
        }
        state.users.insert(user.id, user);
    }

    /// Returns the committed record of a user.
    pub async fn user(&self, user_id: EntityId) -> Option<User> {
        self.state.read().await.users.get(&user_id).cloned()
    }

    /// Makes the next staged update fail with a conflict carrying `reason`.
    pub async fn set_fail_on_update(&self, reason: Option<String>) {
        self.state.write().await.fail_on_update = reason;
    }
}

#[async_trait]
impl UserRepository for InMemoryUserStore {
    type Transaction = InMemoryUserTransaction;

    async fn get_user_by_identifier(&self, user_id: EntityId) -> Result<UserEntityResultSet> {
        let state = self.state.read().await;
        let user = state
            .users
            .get(&user_id)
            .filter(|user| user.active)
            .cloned()
            .ok_or(MembershipError::UserNotFound(user_id))?;

        Ok(UserEntityResultSet {
            user,
            organization: state.organizations.get(&user_id).copied(),
        })
    }

    async fn begin_transaction(&self) -> Result<InMemoryUserTransaction> {
        Ok(InMemoryUserTransaction {
            store: Arc::clone(&self.state),
            inner: Arc::new(Mutex::new(TransactionState {
                status: TransactionStatus::Open,
                staged: Vec::new(),
            })),
        })
    }
}

#[derive(Debug)]
struct TransactionState {
    status: TransactionStatus,
    /// Users to deactivate on commit.
    staged: Vec<EntityId>,
}

/// Transaction handle over an [`InMemoryUserStore`].
#[derive(Debug, Clone)]
pub struct InMemoryUserTransaction {
    store: Arc<RwLock<InMemoryUserState>>,
    inner: Arc<Mutex<TransactionState>>,
}

impl InMemoryUserTransaction {
    /// Returns the number of staged writes.
    pub async fn staged_len(&self) -> usize {
        self.inner.lock().await.staged.len()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUserTransaction {
    async fn deactivate_user(&self, user_id: EntityId) -> Result<()> {
        let mut tx = self.inner.lock().await;
        if tx.status != TransactionStatus::Open {
            return Err(MembershipError::TransactionClosed(tx.status));
        }

        let mut store = self.store.write().await;
        if !store.users.contains_key(&user_id) {
            return Err(MembershipError::UserNotFound(user_id));
        }
        if let Some(reason) = store.fail_on_update.take() {
            return Err(MembershipError::Conflict(reason));
        }

        tx.staged.push(user_id);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut tx = self.inner.lock().await;
        if tx.status != TransactionStatus::Open {
            return Err(MembershipError::TransactionClosed(tx.status));
        }

        let mut store = self.store.write().await;
        for user_id in tx.staged.drain(..) {
            if let Some(user) = store.users.get_mut(&user_id) {
                user.active = false;
            }
        }
        tx.status = TransactionStatus::Committed;
        tracing::debug!("user transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut tx = self.inner.lock().await;
        match tx.status {
            TransactionStatus::Open => {
                tx.staged.clear();
                tx.status = TransactionStatus::RolledBack;
                tracing::debug!("user transaction rolled back");
                Ok(())
            }
            TransactionStatus::RolledBack => Ok(()),
            TransactionStatus::Committed => {
                Err(MembershipError::TransactionClosed(TransactionStatus::Committed))
            }
        }
    }

    async fn status(&self) -> TransactionStatus {
        self.inner.lock().await.status
    }
}

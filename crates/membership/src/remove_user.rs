//! The Remove-User saga and its command handler.
//!
//! Removing a user first removes the organization they own, then deactivates
//! the user inside a transaction owned by the handler. If either step fails
//! the saga restores the organization and rolls the transaction back; the
//! handler commits only when the saga succeeded.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use common::{DataResponse, EntityId, StatusCode};
use saga::{ExecuteOptions, SagaDefinition, StepResult};
use serde::{Deserialize, Serialize};

use crate::error::{MembershipError, Result};
use crate::model::UserEntityResultSet;
use crate::organizations::OrganizationService;
use crate::users::{TransactionStatus, UnitOfWork, UserRepository};

pub const SAGA_NAME: &str = "Remove-User-Saga";
pub const REMOVE_USER_ACTIVITY: &str = "Remove-User-Activity";
pub const ROLLBACK_REMOVE_ORG: &str = "RollBack-Remove-Org";
pub const ROLLBACK_REMOVE_USER: &str = "RollBack-Remove-User";

/// What happened to the user's organization during the activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganizationRemoval {
    /// The user owns no organization.
    NotOwned,
    /// The organization was removed and must be restored on rollback.
    Removed(EntityId),
    /// The organization service refused the removal.
    Failed {
        status_code: StatusCode,
        message: String,
    },
}

/// Payload of the Remove-User activity.
#[derive(Debug, Clone)]
pub struct RemoveUserSagaResult<T> {
    pub transaction: T,
    pub entity: UserEntityResultSet,
    pub org_removal: OrganizationRemoval,
    pub failure_reason: Option<String>,
}

impl<T> RemoveUserSagaResult<T> {
    fn new(transaction: T, entity: UserEntityResultSet) -> Self {
        Self {
            transaction,
            entity,
            org_removal: OrganizationRemoval::NotOwned,
            failure_reason: None,
        }
    }

    fn fail(mut self, reason: impl Into<String>) -> StepResult<Self> {
        self.failure_reason = Some(reason.into());
        StepResult::failed(self)
    }
}

/// Builds and runs the Remove-User saga.
pub struct RemoveUserSaga<O> {
    organizations: Arc<O>,
    options: ExecuteOptions,
}

impl<O> RemoveUserSaga<O>
where
    O: OrganizationService + 'static,
{
    pub fn new(organizations: Arc<O>) -> Self {
        Self {
            organizations,
            options: ExecuteOptions::default(),
        }
    }

    /// Sets the timeouts and cancellation applied to each run.
    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the saga definition for one user.
    pub fn definition<T>(&self, transaction: T, entity: UserEntityResultSet) -> Result<SagaDefinition>
    where
        T: UnitOfWork + Clone + 'static,
    {
        self.build(transaction, entity, RemovedOrganization::default())
    }

    fn build<T>(
        &self,
        transaction: T,
        entity: UserEntityResultSet,
        removed: RemovedOrganization,
    ) -> Result<SagaDefinition>
    where
        T: UnitOfWork + Clone + 'static,
    {
        let organizations = Arc::clone(&self.organizations);
        let restore_with = Arc::clone(&self.organizations);

        let definition = SagaDefinition::new(SAGA_NAME)
            .add_activity(REMOVE_USER_ACTIVITY, move || {
                let organizations = Arc::clone(&organizations);
                let removed = removed.clone();
                let payload = RemoveUserSagaResult::new(transaction.clone(), entity.clone());
                async move { remove_user(organizations.as_ref(), &removed, payload).await }
            })?
            .add_compensation(
                REMOVE_USER_ACTIVITY,
                ROLLBACK_REMOVE_ORG,
                move |result: StepResult<RemoveUserSagaResult<T>>| {
                    let organizations = Arc::clone(&restore_with);
                    async move { restore_organization(organizations.as_ref(), result.payload()).await }
                },
            )?
            .add_compensation(
                REMOVE_USER_ACTIVITY,
                ROLLBACK_REMOVE_USER,
                |result: StepResult<RemoveUserSagaResult<T>>| async move {
                    result.payload().transaction.rollback().await
                },
            )?;

        Ok(definition)
    }

    /// Runs the saga and reports whether the user was removed.
    ///
    /// Faults are logged and reported as `false`. A fault skips the saga's
    /// compensations, so an organization removed before the fault is restored
    /// here; rolling back the transaction is left to its owner.
    pub async fn run<T>(&self, transaction: T, entity: UserEntityResultSet) -> Result<bool>
    where
        T: UnitOfWork + Clone + 'static,
    {
        let user_id = entity.user.id;
        let removed = RemovedOrganization::default();
        let mut saga = self.build(transaction, entity, removed.clone())?;

        let executed = saga.execute_with(self.options.clone()).await.map(|_| ());
        match executed {
            Ok(()) if saga.succeeded() => Ok(true),
            Ok(()) => {
                let reason = saga
                    .activity_outcomes()
                    .iter()
                    .find_map(|outcome| outcome.payload::<RemoveUserSagaResult<T>>())
                    .and_then(|payload| payload.failure_reason.clone())
                    .unwrap_or_default();
                tracing::warn!(%user_id, reason = %reason, "remove-user saga rolled back");
                Ok(false)
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "remove-user saga did not complete");
                if let Some(org_id) = removed.take().filter(|_| e.is_fault()) {
                    let response = self.organizations.restore_organization(org_id).await;
                    if !response.success {
                        tracing::error!(
                            %user_id,
                            %org_id,
                            status = %response.status_code,
                            message = %response.message,
                            "failed to restore organization after fault"
                        );
                    }
                }
                Ok(false)
            }
        }
    }
}

/// Organization removed by the current run, tracked outside the activity's
/// payload so it survives a fault.
#[derive(Debug, Clone, Default)]
struct RemovedOrganization(Arc<Mutex<Option<EntityId>>>);

impl RemovedOrganization {
    fn set(&self, org_id: EntityId) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(org_id);
    }

    fn take(&self) -> Option<EntityId> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

async fn remove_user<O, T>(
    organizations: &O,
    removed: &RemovedOrganization,
    mut payload: RemoveUserSagaResult<T>,
) -> Result<StepResult<RemoveUserSagaResult<T>>>
where
    O: OrganizationService + ?Sized,
    T: UnitOfWork,
{
    if let Some(link) = payload.entity.organization {
        let response = organizations.remove_organization(link.org_id).await;
        if !response.success {
            let message = response.message.clone();
            payload.org_removal = OrganizationRemoval::Failed {
                status_code: response.status_code,
                message: response.message,
            };
            return Ok(payload.fail(message));
        }
        removed.set(link.org_id);
        payload.org_removal = OrganizationRemoval::Removed(link.org_id);
    }

    let deactivated = payload.transaction.deactivate_user(payload.entity.user.id).await;
    match deactivated {
        Ok(()) => Ok(StepResult::succeeded(payload)),
        Err(e @ MembershipError::TransactionClosed(_)) => Err(e),
        Err(e) => Ok(payload.fail(e.to_string())),
    }
}

async fn restore_organization<O, T>(organizations: &O, payload: &RemoveUserSagaResult<T>) -> Result<()>
where
    O: OrganizationService + ?Sized,
{
    let OrganizationRemoval::Removed(org_id) = payload.org_removal else {
        return Ok(());
    };

    let response = organizations.restore_organization(org_id).await;
    if response.success {
        Ok(())
    } else {
        Err(MembershipError::Organization {
            status_code: response.status_code,
            message: response.message,
        })
    }
}

/// Command to deactivate a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoveUserCommand {
    pub identifier: Option<EntityId>,
}

/// Payload returned after a user was deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveUserResponse {
    pub updated_at: DateTime<Utc>,
}

/// Handles [`RemoveUserCommand`]s.
pub struct RemoveUserHandler<R, O> {
    users: Arc<R>,
    saga: RemoveUserSaga<O>,
}

impl<R, O> RemoveUserHandler<R, O>
where
    R: UserRepository,
    O: OrganizationService + 'static,
{
    pub fn new(users: Arc<R>, organizations: Arc<O>) -> Self {
        Self {
            users,
            saga: RemoveUserSaga::new(organizations),
        }
    }

    /// Sets the options applied to every saga run.
    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.saga = self.saga.with_options(options);
        self
    }

    #[tracing::instrument(skip(self, command), fields(user_id = ?command.identifier))]
    pub async fn handle(&self, command: RemoveUserCommand) -> DataResponse<RemoveUserResponse> {
        let Some(user_id) = command.identifier else {
            return DataResponse::fail(StatusCode::BAD_REQUEST, "Arguments should not be empty");
        };

        let entity = match self.users.get_user_by_identifier(user_id).await {
            Ok(entity) => entity,
            Err(e) => return DataResponse::fail(e.status_code(), e.to_string()),
        };

        match self.remove(entity).await {
            Ok(()) => {
                tracing::info!(%user_id, "user deactivated");
                DataResponse::ok(
                    RemoveUserResponse {
                        updated_at: Utc::now(),
                    },
                    "User deactivated",
                )
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "failed to remove user");
                DataResponse::fail(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
        }
    }

    async fn remove(&self, entity: UserEntityResultSet) -> Result<()> {
        let transaction = self.users.begin_transaction().await?;

        if self.saga.run(transaction.clone(), entity).await? {
            return transaction.commit().await;
        }

        if transaction.status().await == TransactionStatus::Open {
            transaction.rollback().await?;
        }
        Err(MembershipError::Conflict(format!("{SAGA_NAME} was rolled back")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Organization, User};
    use crate::organizations::InMemoryOrganizationService;
    use crate::users::InMemoryUserStore;

    async fn fixture() -> (InMemoryUserStore, Arc<InMemoryOrganizationService>, UserEntityResultSet) {
        let store = InMemoryUserStore::new();
        let organizations = Arc::new(InMemoryOrganizationService::new());
        let org = Organization::new("Acme");
        let user = User::new("ada@example.com");
        organizations.insert(org.clone()).await;
        store.insert_user(user.clone(), Some(org.id)).await;
        let entity = store.get_user_by_identifier(user.id).await.unwrap();
        (store, organizations, entity)
    }

    #[tokio::test]
    async fn test_definition_shape() {
        let (store, organizations, entity) = fixture().await;
        let transaction = store.begin_transaction().await.unwrap();
        let saga = RemoveUserSaga::new(organizations);

        let definition = saga.definition(transaction, entity).unwrap();
        assert_eq!(definition.name(), SAGA_NAME);
        assert_eq!(
            definition.activity_names().collect::<Vec<_>>(),
            vec![REMOVE_USER_ACTIVITY]
        );
        assert_eq!(
            definition.compensation_names(REMOVE_USER_ACTIVITY).unwrap(),
            vec![ROLLBACK_REMOVE_ORG, ROLLBACK_REMOVE_USER]
        );
    }

    #[tokio::test]
    async fn test_run_stages_deactivation_without_committing() {
        let (store, organizations, entity) = fixture().await;
        let user_id = entity.user.id;
        let transaction = store.begin_transaction().await.unwrap();
        let saga = RemoveUserSaga::new(organizations);

        assert!(saga.run(transaction.clone(), entity).await.unwrap());
        assert_eq!(transaction.status().await, TransactionStatus::Open);
        assert!(store.user(user_id).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_closed_transaction_restores_organization() {
        let (store, organizations, entity) = fixture().await;
        let org_id = entity.organization.unwrap().org_id;
        let transaction = store.begin_transaction().await.unwrap();
        transaction.rollback().await.unwrap();
        let saga = RemoveUserSaga::new(Arc::clone(&organizations));

        assert!(!saga.run(transaction, entity).await.unwrap());
        assert!(organizations.organization(org_id).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_missing_identifier_is_rejected() {
        let store = Arc::new(InMemoryUserStore::new());
        let handler = RemoveUserHandler::new(store, Arc::new(InMemoryOrganizationService::new()));

        let response = handler.handle(RemoveUserCommand::default()).await;
        assert!(!response.success);
        assert_eq!(response.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(response.message, "Arguments should not be empty");
    }
}

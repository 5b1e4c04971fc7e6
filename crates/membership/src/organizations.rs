//! Organization service used by the removal workflow.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{DataResponse, EntityId, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::model::Organization;

/// Payload returned by organization commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationResponse {
    pub updated_at: DateTime<Utc>,
}

/// Commands against organizations. Failures are reported through the
/// response status rather than as errors.
#[async_trait]
pub trait OrganizationService: Send + Sync {
    /// Marks an organization as removed.
    async fn remove_organization(&self, org_id: EntityId) -> DataResponse<OrganizationResponse>;

    /// Undoes a previous removal.
    async fn restore_organization(&self, org_id: EntityId) -> DataResponse<OrganizationResponse>;
}

#[derive(Debug, Default)]
struct InMemoryOrganizationState {
    organizations: HashMap<EntityId, Organization>,
    fail_on_remove: bool,
    fail_on_restore: bool,
}

/// In-memory organization service for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrganizationService {
    state: Arc<RwLock<InMemoryOrganizationState>>,
}

impl InMemoryOrganizationService {
    /// Creates an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an organization.
    pub async fn insert(&self, organization: Organization) {
        self.state
            .write()
            .await
            .organizations
            .insert(organization.id, organization);
    }

    /// Returns the current record of an organization.
    pub async fn organization(&self, org_id: EntityId) -> Option<Organization> {
        self.state.read().await.organizations.get(&org_id).cloned()
    }

    /// Makes removals fail with an internal error.
    pub async fn set_fail_on_remove(&self, fail: bool) {
        self.state.write().await.fail_on_remove = fail;
    }

    /// Makes restorations fail with an internal error.
    pub async fn set_fail_on_restore(&self, fail: bool) {
        self.state.write().await.fail_on_restore = fail;
    }

    async fn set_active(
        &self,
        org_id: EntityId,
        active: bool,
    ) -> DataResponse<OrganizationResponse> {
        let mut state = self.state.write().await;
        let fail = if active {
            state.fail_on_restore
        } else {
            state.fail_on_remove
        };

        let Some(organization) = state.organizations.get_mut(&org_id) else {
            return DataResponse::fail(StatusCode::NOT_FOUND, "Organization not found");
        };

        if fail {
            let message = if active {
                "Failed to restore Organization"
            } else {
                "Failed to remove Organization"
            };
            return DataResponse::fail(StatusCode::INTERNAL_SERVER_ERROR, message);
        }

        organization.active = active;
        let message = if active {
            "Organization restored"
        } else {
            "Organization removed"
        };
        DataResponse::ok(
            OrganizationResponse {
                updated_at: Utc::now(),
            },
            message,
        )
    }
}

#[async_trait]
impl OrganizationService for InMemoryOrganizationService {
    async fn remove_organization(&self, org_id: EntityId) -> DataResponse<OrganizationResponse> {
        tracing::debug!(%org_id, "removing organization");
        self.set_active(org_id, false).await
    }

    async fn restore_organization(&self, org_id: EntityId) -> DataResponse<OrganizationResponse> {
        tracing::debug!(%org_id, "restoring organization");
        self.set_active(org_id, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remove_and_restore() {
        let service = InMemoryOrganizationService::new();
        let org = Organization::new("Acme");
        service.insert(org.clone()).await;

        let removed = service.remove_organization(org.id).await;
        assert!(removed.success);
        assert_eq!(removed.status_code, StatusCode::OK);
        assert!(!service.organization(org.id).await.unwrap().active);

        let restored = service.restore_organization(org.id).await;
        assert!(restored.success);
        assert!(service.organization(org.id).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_missing_organization() {
        let service = InMemoryOrganizationService::new();
        let response = service.remove_organization(EntityId::new()).await;
        assert!(!response.success);
        assert_eq!(response.status_code, StatusCode::NOT_FOUND);
        assert_eq!(response.message, "Organization not found");
    }

    #[tokio::test]
    async fn test_injected_remove_failure_leaves_organization_active() {
        let service = InMemoryOrganizationService::new();
        let org = Organization::new("Acme");
        service.insert(org.clone()).await;
        service.set_fail_on_remove(true).await;

        let response = service.remove_organization(org.id).await;
        assert_eq!(response.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.message, "Failed to remove Organization");
        assert!(service.organization(org.id).await.unwrap().active);
    }
}

//! Runner for the remove-user workflow with structured logging.
//!
//! Seeds in-memory user and organization stores, then issues remove-user
//! commands against them: one that succeeds, one whose deactivation
//! conflicts and is rolled back, and one for an unknown user.

pub mod config;

use std::sync::Arc;

use common::{DataResponse, EntityId};
use membership::{
    InMemoryOrganizationService, InMemoryUserStore, Organization, RemoveUserCommand,
    RemoveUserHandler, RemoveUserResponse, User,
};
use saga::ExecuteOptions;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::{Config, ConfigError, LogFormat};

/// Errors that abort the runner.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Installs the global tracing subscriber.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

/// A named remove-user command and the response it produced.
#[derive(Debug)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub response: DataResponse<RemoveUserResponse>,
}

/// Runs the seeded scenarios with the given saga options.
pub async fn run_scenarios(options: ExecuteOptions) -> Vec<ScenarioReport> {
    let users = Arc::new(InMemoryUserStore::new());
    let organizations = Arc::new(InMemoryOrganizationService::new());
    let handler = RemoveUserHandler::new(Arc::clone(&users), Arc::clone(&organizations))
        .with_options(options);

    let owner = seed_owner(&users, &organizations, "owner@example.com", "Acme").await;
    let conflicted = seed_owner(&users, &organizations, "busy@example.com", "Globex").await;

    let mut reports = Vec::with_capacity(3);

    reports.push(ScenarioReport {
        name: "remove-owner",
        response: handler.handle(command(owner)).await,
    });

    users
        .set_fail_on_update(Some("concurrent update".to_string()))
        .await;
    reports.push(ScenarioReport {
        name: "conflicting-update",
        response: handler.handle(command(conflicted)).await,
    });

    reports.push(ScenarioReport {
        name: "unknown-user",
        response: handler.handle(command(EntityId::new())).await,
    });

    reports
}

async fn seed_owner(
    users: &InMemoryUserStore,
    organizations: &InMemoryOrganizationService,
    email: &str,
    org_name: &str,
) -> EntityId {
    let org = Organization::new(org_name);
    let user = User::new(email);
    let user_id = user.id;
    users.insert_user(user, Some(org.id)).await;
    organizations.insert(org).await;
    user_id
}

fn command(identifier: EntityId) -> RemoveUserCommand {
    RemoveUserCommand {
        identifier: Some(identifier),
    }
}

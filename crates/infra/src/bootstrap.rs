//! Service wiring.
//!
//! Every collaborator is constructed here and handed down explicitly; nothing
//! below this module reaches for a global.

use std::sync::Arc;

use anyhow::{Context, anyhow};
use sqlx::postgres::PgPoolOptions;

use omniven_core::{Clock, SystemClock};

use crate::config::Settings;
use crate::{AccountService, InMemoryCompanyRegistry, InMemoryUserStore, PostgresCompanyRegistry, PostgresUserStore};

pub type PostgresAccountService = AccountService<PostgresUserStore, PostgresCompanyRegistry>;
pub type InMemoryAccountService = AccountService<InMemoryUserStore, InMemoryCompanyRegistry>;

/// Connect to `DATABASE_URL` and wire the Postgres-backed service.
pub async fn postgres_account_service(settings: &Settings) -> anyhow::Result<PostgresAccountService> {
    let url = settings
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow!("DATABASE_URL must be set for the Postgres store"))?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    tracing::info!(max_connections = settings.max_connections, "postgres pool ready");

    Ok(AccountService::new(
        Arc::new(PostgresUserStore::new(pool.clone())),
        Arc::new(PostgresCompanyRegistry::new(pool)),
        settings.token_service(),
        Arc::new(settings.hasher()?),
        Arc::new(SystemClock) as Arc<dyn Clock>,
    ))
}

/// In-process service for development: empty store, every company accepted.
pub fn in_memory_account_service(settings: &Settings) -> anyhow::Result<InMemoryAccountService> {
    Ok(AccountService::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryCompanyRegistry::accept_all()),
        settings.token_service(),
        Arc::new(settings.hasher()?),
        Arc::new(SystemClock) as Arc<dyn Clock>,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniven_accounts::AccountError;

    fn settings() -> Settings {
        Settings::from_lookup(|key| match key {
            "OMNIVEN_JWT_SECRET" => Some("bootstrap-secret-0123".to_string()),
            "OMNIVEN_ARGON2_M_COST" => Some("256".to_string()),
            "OMNIVEN_ARGON2_T_COST" | "OMNIVEN_ARGON2_P_COST" => Some("1".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn in_memory_service_is_usable() {
        let service = in_memory_account_service(&settings()).unwrap();
        assert_eq!(service.login("ann", "secret1").await, Err(AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn postgres_service_requires_database_url() {
        assert!(postgres_account_service(&settings()).await.is_err());
    }
}

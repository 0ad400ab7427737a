use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use omniven_core::CompanyId;

use super::CompanyRegistry;
use crate::user_store::StoreError;

/// Looks companies up in the shared `acc_company` table.
#[derive(Debug, Clone)]
pub struct PostgresCompanyRegistry {
    pool: Arc<PgPool>,
}

impl PostgresCompanyRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl CompanyRegistry for PostgresCompanyRegistry {
    #[instrument(skip(self), fields(company_id = %company_id), err)]
    async fn exists(&self, company_id: CompanyId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM acc_company WHERE company_id = $1)",
        )
        .bind(company_id.get())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("company lookup failed: {e}")))
    }
}

//! Company existence check.
//!
//! Companies are owned by another system; accounts only need to know that a
//! referenced company exists.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;

use omniven_core::CompanyId;

use crate::user_store::StoreError;

pub use in_memory::InMemoryCompanyRegistry;
pub use postgres::PostgresCompanyRegistry;

#[async_trait]
pub trait CompanyRegistry: Send + Sync {
    async fn exists(&self, company_id: CompanyId) -> Result<bool, StoreError>;
}

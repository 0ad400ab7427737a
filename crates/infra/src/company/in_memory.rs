use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use omniven_core::CompanyId;

use super::CompanyRegistry;
use crate::user_store::StoreError;

/// Fixed set of known companies, or every company when built with
/// [`InMemoryCompanyRegistry::accept_all`].
#[derive(Debug, Default)]
pub struct InMemoryCompanyRegistry {
    known: RwLock<HashSet<CompanyId>>,
    accept_all: bool,
}

impl InMemoryCompanyRegistry {
    pub fn new(known: impl IntoIterator<Item = CompanyId>) -> Self {
        Self {
            known: RwLock::new(known.into_iter().collect()),
            accept_all: false,
        }
    }

    pub fn accept_all() -> Self {
        Self {
            known: RwLock::default(),
            accept_all: true,
        }
    }

    pub fn register(&self, company_id: CompanyId) {
        if let Ok(mut known) = self.known.write() {
            known.insert(company_id);
        }
    }
}

#[async_trait]
impl CompanyRegistry for InMemoryCompanyRegistry {
    async fn exists(&self, company_id: CompanyId) -> Result<bool, StoreError> {
        if self.accept_all {
            return Ok(true);
        }
        let known = self
            .known
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(known.contains(&company_id))
    }
}

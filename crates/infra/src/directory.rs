//! User Directory: lookups, uniqueness checks and record writes.
//!
//! The directory performs no authorization. Callers gate `update` and
//! `delete` through the access controller before reaching it.

use std::sync::Arc;

use omniven_accounts::{ConflictSet, Email, NewAccount, PhoneNumber, StoredPatch, UserAccount, Username};
use omniven_core::{Clock, UserId};

use crate::user_store::{StoreError, UniquenessProbe, UserStore};

pub struct UserDirectory<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for UserDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: UserStore> UserDirectory<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        self.store.get(id).await
    }

    pub async fn find_by_username(&self, username: &Username) -> Result<Option<UserAccount>, StoreError> {
        self.store.get_by_username(username).await
    }

    /// Fields that collide with a record other than `exclude`. Empty when
    /// nothing collides or nothing was asked about.
    pub async fn check_unique(
        &self,
        email: Option<&Email>,
        username: Option<&Username>,
        phone_number: Option<&PhoneNumber>,
        exclude: Option<UserId>,
    ) -> Result<ConflictSet, StoreError> {
        let probe = UniquenessProbe {
            email,
            username,
            phone_number,
            exclude,
        };
        if probe.is_empty() {
            return Ok(ConflictSet::new());
        }
        self.store.query_conflicts(probe).await
    }

    /// Insert with `created_at = now`. A duplicate that slipped past
    /// `check_unique` comes back as `StoreError::Conflict`; it is not retried.
    pub async fn create(&self, record: NewAccount) -> Result<UserAccount, StoreError> {
        let created_at = self.clock.now();
        let account = self.store.insert(record, created_at).await?;
        tracing::info!(user_id = %account.id, "account created");
        Ok(account)
    }

    pub async fn update(&self, id: UserId, patch: &StoredPatch) -> Result<Option<UserAccount>, StoreError> {
        self.store.update(id, patch).await
    }

    /// Stamp `last_login_at = now`.
    pub async fn record_login(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        self.store.update(id, &StoredPatch::login_at(self.clock.now())).await
    }

    pub async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let removed = self.store.delete(id).await?;
        if removed {
            tracing::info!(user_id = %id, "account deleted");
        }
        Ok(removed)
    }

    pub async fn list(&self) -> Result<Vec<UserAccount>, StoreError> {
        self.store.list().await
    }
}

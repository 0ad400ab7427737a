use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use omniven_accounts::{ConflictSet, ConflictingField, NewAccount, StoredPatch, UserAccount, Username};
use omniven_core::UserId;

use super::{StoreError, UniquenessProbe, UserStore};

/// In-memory user store.
///
/// Intended for tests/dev. Uniqueness is enforced under the write lock, so
/// it behaves like a unique index: a racing duplicate insert fails with
/// `StoreError::Conflict` even when both pre-checks passed.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    records: RwLock<HashMap<UserId, UserAccount>>,
    writes_offline: AtomicBool,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutating call fail with `Unavailable` (reads keep working).
    pub fn set_writes_offline(&self, offline: bool) {
        self.writes_offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.writes_offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes offline".to_string()));
        }
        Ok(())
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("lock poisoned".to_string())
    }

    fn collisions(
        records: &HashMap<UserId, UserAccount>,
        probe: UniquenessProbe<'_>,
    ) -> ConflictSet {
        let mut conflicts = ConflictSet::new();
        for account in records.values() {
            if Some(account.id) == probe.exclude {
                continue;
            }
            if probe.email == Some(&account.email) {
                conflicts.insert(ConflictingField::Email);
            }
            if probe.username == Some(&account.username) {
                conflicts.insert(ConflictingField::Username);
            }
            if probe.phone_number == Some(&account.phone_number) {
                conflicts.insert(ConflictingField::PhoneNumber);
            }
        }
        conflicts
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &Username) -> Result<Option<UserAccount>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.values().find(|a| &a.username == username).cloned())
    }

    async fn query_conflicts(&self, probe: UniquenessProbe<'_>) -> Result<ConflictSet, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(Self::collisions(&records, probe))
    }

    async fn insert(&self, record: NewAccount, created_at: DateTime<Utc>) -> Result<UserAccount, StoreError> {
        self.ensure_writable()?;
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;

        let conflicts = Self::collisions(
            &records,
            UniquenessProbe {
                email: Some(&record.email),
                username: Some(&record.username),
                phone_number: Some(&record.phone_number),
                exclude: None,
            },
        );
        if !conflicts.is_empty() {
            return Err(StoreError::Conflict(conflicts));
        }

        let account = UserAccount::from_new(UserId::new(), record, created_at);
        records.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(&self, id: UserId, patch: &StoredPatch) -> Result<Option<UserAccount>, StoreError> {
        self.ensure_writable()?;
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;

        let Some(current) = records.get(&id) else {
            return Ok(None);
        };
        let mut updated = current.clone();
        updated.apply(patch);

        let conflicts = Self::collisions(
            &records,
            UniquenessProbe {
                email: patch.email.as_ref(),
                username: patch.username.as_ref(),
                phone_number: patch.phone_number.as_ref(),
                exclude: Some(id),
            },
        );
        if !conflicts.is_empty() {
            return Err(StoreError::Conflict(conflicts));
        }

        records.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        Ok(records.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<UserAccount>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        let mut all: Vec<UserAccount> = records.values().cloned().collect();
        all.sort_by_key(|a| (a.created_at, a.id));
        Ok(all)
    }
}

//! User record store boundary.
//!
//! The store is the only point where account mutations are serialized. The
//! application-level uniqueness pre-check is not atomic with the insert, so
//! every implementation must enforce email/username/phone uniqueness itself
//! and report a violation as [`StoreError::Conflict`].

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use omniven_accounts::{ConflictSet, Email, NewAccount, PhoneNumber, StoredPatch, UserAccount, Username};
use omniven_core::UserId;

pub use in_memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(ConflictSet),

    /// Backing persistence failed; the message is for logs only.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Per-field existence lookup, optionally ignoring one record (update-in-place).
#[derive(Debug, Clone, Copy, Default)]
pub struct UniquenessProbe<'a> {
    pub email: Option<&'a Email>,
    pub username: Option<&'a Username>,
    pub phone_number: Option<&'a PhoneNumber>,
    pub exclude: Option<UserId>,
}

impl UniquenessProbe<'_> {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none() && self.phone_number.is_none()
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<UserAccount>, StoreError>;

    async fn get_by_username(&self, username: &Username) -> Result<Option<UserAccount>, StoreError>;

    /// Fields of `probe` that collide with a live record other than `probe.exclude`.
    async fn query_conflicts(&self, probe: UniquenessProbe<'_>) -> Result<ConflictSet, StoreError>;

    /// Insert and assign a fresh id.
    async fn insert(&self, record: NewAccount, created_at: DateTime<Utc>) -> Result<UserAccount, StoreError>;

    /// Apply `patch` atomically. `Ok(None)` when `id` does not exist.
    async fn update(&self, id: UserId, patch: &StoredPatch) -> Result<Option<UserAccount>, StoreError>;

    /// `Ok(false)` when `id` does not exist.
    async fn delete(&self, id: UserId) -> Result<bool, StoreError>;

    async fn list(&self) -> Result<Vec<UserAccount>, StoreError>;
}

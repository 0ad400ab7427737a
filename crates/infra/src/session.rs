//! Bearer token to caller account.
//!
//! Tokens carry no server-side state, so a token keeps verifying after its
//! account is deleted. The resolver closes that gap by re-reading the
//! account on every call: an orphaned token resolves to `Unauthorized`.
//! A token cannot be revoked before `exp` while its account still exists.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use omniven_accounts::{AccountError, UserAccount};
use omniven_auth::TokenService;

use crate::directory::UserDirectory;
use crate::user_store::UserStore;

pub struct SessionResolver<S> {
    tokens: Arc<TokenService>,
    directory: UserDirectory<S>,
}

impl<S> Clone for SessionResolver<S> {
    fn clone(&self) -> Self {
        Self {
            tokens: Arc::clone(&self.tokens),
            directory: self.directory.clone(),
        }
    }
}

impl<S: UserStore> SessionResolver<S> {
    pub fn new(tokens: Arc<TokenService>, directory: UserDirectory<S>) -> Self {
        Self { tokens, directory }
    }

    /// Every token failure collapses to `Unauthorized`; the reason is only
    /// logged at debug level by the token service.
    pub async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<UserAccount, AccountError> {
        let identity = self
            .tokens
            .verify(token, now)
            .map_err(|_| AccountError::Unauthorized)?;

        match self.directory.find_by_id(identity.subject_id).await {
            Ok(Some(account)) => Ok(account),
            Ok(None) => {
                tracing::debug!(user_id = %identity.subject_id, "token subject no longer exists");
                Err(AccountError::Unauthorized)
            }
            Err(err) => {
                tracing::error!(error = %err, "session lookup failed");
                Err(AccountError::StoreUnavailable)
            }
        }
    }
}

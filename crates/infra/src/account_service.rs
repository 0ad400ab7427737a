//! Outward account operations.
//!
//! Every protected operation follows the same pipeline: resolve the bearer
//! token to the caller, run the access check, then touch the directory.
//! A failed check returns before any read or write of the target.

use std::sync::Arc;

use omniven_accounts::{
    AccountError, AccountPatch, AccountResult, NewAccount, Registration, UserAccount, UserProfile,
};
use omniven_auth::{
    AccessToken, AccountStatus, CredentialHasher, PasswordDigest, TokenService, require_admin,
    require_owner_or_admin,
};
use omniven_core::{Clock, CompanyId, UserId};

use crate::authenticator::Authenticator;
use crate::company::CompanyRegistry;
use crate::directory::UserDirectory;
use crate::session::SessionResolver;
use crate::user_store::{StoreError, UserStore};

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(fields) => AccountError::ValidationConflict(fields),
            StoreError::Unavailable(reason) => {
                tracing::error!(%reason, "store unavailable");
                AccountError::StoreUnavailable
            }
        }
    }
}

pub struct AccountService<S, C> {
    directory: UserDirectory<S>,
    authenticator: Authenticator<S>,
    sessions: SessionResolver<S>,
    companies: Arc<C>,
    tokens: Arc<TokenService>,
    hasher: Arc<dyn CredentialHasher>,
    clock: Arc<dyn Clock>,
}

impl<S, C> AccountService<S, C>
where
    S: UserStore,
    C: CompanyRegistry,
{
    pub fn new(
        store: Arc<S>,
        companies: Arc<C>,
        tokens: TokenService,
        hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = Arc::new(tokens);
        let directory = UserDirectory::new(store, Arc::clone(&clock));
        Self {
            authenticator: Authenticator::new(directory.clone(), Arc::clone(&hasher)),
            sessions: SessionResolver::new(Arc::clone(&tokens), directory.clone()),
            directory,
            companies,
            tokens,
            hasher,
            clock,
        }
    }

    pub fn directory(&self) -> &UserDirectory<S> {
        &self.directory
    }

    /// Exchange username/password for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> AccountResult<AccessToken> {
        let account = self
            .authenticator
            .authenticate(username, password)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        let token = self
            .tokens
            .issue(account.id, account.username.as_str(), self.clock.now())
            .map_err(|err| {
                tracing::error!(error = %err, "token issuance failed");
                AccountError::Internal
            })?;

        if let Err(err) = self.directory.record_login(account.id).await {
            tracing::warn!(user_id = %account.id, error = %err, "failed to record login time");
        }

        tracing::info!(user_id = %account.id, "login succeeded");
        Ok(token)
    }

    /// Self-service registration. The new account is a regular account.
    pub async fn register(&self, registration: Registration) -> AccountResult<UserProfile> {
        self.provision(registration, AccountStatus::REGULAR).await
    }

    /// Admin-only account creation with an explicit initial status.
    pub async fn create_account(
        &self,
        token: &str,
        registration: Registration,
        status: AccountStatus,
    ) -> AccountResult<UserProfile> {
        let caller = self.caller(token).await?;
        require_admin(&caller.principal())?;
        self.provision(registration, status).await
    }

    /// The caller's own profile.
    pub async fn current(&self, token: &str) -> AccountResult<UserProfile> {
        Ok(self.caller(token).await?.profile())
    }

    pub async fn get_by_id(&self, token: &str, id: UserId) -> AccountResult<UserProfile> {
        let caller = self.caller(token).await?;
        require_owner_or_admin(&caller.principal(), id)?;

        self.directory
            .find_by_id(id)
            .await?
            .map(|account| account.profile())
            .ok_or(AccountError::NotFound)
    }

    /// Every account, oldest first. Admin only.
    pub async fn list_all(&self, token: &str) -> AccountResult<Vec<UserProfile>> {
        let caller = self.caller(token).await?;
        require_admin(&caller.principal())?;

        let accounts = self.directory.list().await?;
        Ok(accounts.iter().map(UserAccount::profile).collect())
    }

    pub async fn update(&self, token: &str, id: UserId, patch: AccountPatch) -> AccountResult<UserProfile> {
        let caller = self.caller(token).await?;
        let principal = caller.principal();
        require_owner_or_admin(&principal, id)?;
        // A non-admin only gets here for their own account, so `caller.status`
        // is the target's current status.
        if patch.status.is_some_and(|status| status != caller.status) {
            require_admin(&principal)?;
        }

        let current = self.directory.find_by_id(id).await?.ok_or(AccountError::NotFound)?;
        if patch.is_empty() {
            return Ok(current.profile());
        }

        self.ensure_company(patch.new_company()).await?;

        let conflicts = self
            .directory
            .check_unique(
                patch.email.as_ref(),
                patch.username.as_ref(),
                patch.phone_number.as_ref(),
                Some(id),
            )
            .await?;
        if !conflicts.is_empty() {
            return Err(AccountError::ValidationConflict(conflicts));
        }

        let password_hash = patch.password.as_ref().map(|p| self.hash(p.expose())).transpose()?;
        let stored = patch.into_stored(password_hash);

        let updated = self
            .directory
            .update(id, &stored)
            .await?
            .ok_or(AccountError::NotFound)?;

        tracing::info!(user_id = %id, caller_id = %caller.id, "account updated");
        Ok(updated.profile())
    }

    pub async fn delete(&self, token: &str, id: UserId) -> AccountResult<()> {
        let caller = self.caller(token).await?;
        require_owner_or_admin(&caller.principal(), id)?;

        if !self.directory.delete(id).await? {
            return Err(AccountError::NotFound);
        }
        tracing::info!(user_id = %id, caller_id = %caller.id, "account deleted by caller");
        Ok(())
    }

    async fn caller(&self, token: &str) -> AccountResult<UserAccount> {
        self.sessions.resolve(token, self.clock.now()).await
    }

    async fn provision(&self, registration: Registration, status: AccountStatus) -> AccountResult<UserProfile> {
        self.ensure_company(registration.company_id).await?;

        let conflicts = self
            .directory
            .check_unique(
                Some(&registration.email),
                Some(&registration.username),
                Some(&registration.phone_number),
                None,
            )
            .await?;
        if !conflicts.is_empty() {
            return Err(AccountError::ValidationConflict(conflicts));
        }

        let record = NewAccount {
            company_id: registration.company_id,
            email: registration.email,
            username: registration.username,
            password_hash: self.hash(registration.password.expose())?,
            phone_number: registration.phone_number,
            status,
            expires_at: None,
            notification_pref: 0,
            device_id: None,
        };

        match self.directory.create(record).await {
            Ok(account) => Ok(account.profile()),
            Err(StoreError::Conflict(fields)) => {
                tracing::warn!(%fields, "concurrent registration lost the uniqueness race");
                Err(AccountError::CreationFailed)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_company(&self, company_id: Option<CompanyId>) -> AccountResult<()> {
        let Some(company_id) = company_id else {
            return Ok(());
        };
        if self.companies.exists(company_id).await? {
            Ok(())
        } else {
            Err(AccountError::Malformed("invalid company id".to_string()))
        }
    }

    fn hash(&self, plaintext: &str) -> AccountResult<PasswordDigest> {
        self.hasher.hash(plaintext).map_err(|err| {
            tracing::error!(error = %err, "password hashing failed");
            AccountError::Internal
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryCompanyRegistry;
    use crate::test_support::{Harness, registration};
    use omniven_accounts::{ConflictSet, ConflictingField, Email, Password};

    #[tokio::test]
    async fn register_defaults_to_regular_status() {
        let h = Harness::new();
        let profile = h.service.register(registration("ann", "a@x.com", "+10000000000")).await.unwrap();
        assert_eq!(profile.status, AccountStatus::REGULAR);
        assert_eq!(profile.notification_pref, 0);
        assert_eq!(profile.device_id, None);
        assert_eq!(profile.last_login_at, None);
    }

    #[tokio::test]
    async fn register_reports_every_conflicting_field() {
        let h = Harness::new();
        h.service.register(registration("ann", "a@x.com", "+10000000000")).await.unwrap();

        let err = h
            .service
            .register(registration("ann", "A@X.com", "+20000000000"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AccountError::ValidationConflict(
                [ConflictingField::Email, ConflictingField::Username].into_iter().collect()
            )
        );
    }

    #[tokio::test]
    async fn register_with_unknown_company_is_malformed() {
        let h = Harness::with_companies(InMemoryCompanyRegistry::new([CompanyId::new(7).unwrap()]));
        let mut reg = registration("ann", "a@x.com", "+10000000000");
        reg.company_id = Some(CompanyId::new(8).unwrap());
        assert_eq!(
            h.service.register(reg.clone()).await,
            Err(AccountError::Malformed("invalid company id".to_string()))
        );

        reg.company_id = Some(CompanyId::new(7).unwrap());
        assert!(h.service.register(reg).await.is_ok());
    }

    #[tokio::test]
    async fn login_failure_is_uniform() {
        let h = Harness::new();
        h.service.register(registration("ann", "a@x.com", "+10000000000")).await.unwrap();

        assert_eq!(h.service.login("ann", "wrong-pass").await, Err(AccountError::InvalidCredentials));
        assert_eq!(h.service.login("nobody", "secret1").await, Err(AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_records_last_login() {
        let h = Harness::new();
        let ann = h.service.register(registration("ann", "a@x.com", "+10000000000")).await.unwrap();
        let token = h.service.login("ann", "secret1").await.unwrap();

        let me = h.service.current(&token.access_token).await.unwrap();
        assert_eq!(me.id, ann.id);
        assert_eq!(me.last_login_at, Some(h.clock.now()));
    }

    #[tokio::test]
    async fn update_changes_password() {
        let h = Harness::new();
        let ann = h.service.register(registration("ann", "a@x.com", "+10000000000")).await.unwrap();
        let token = h.service.login("ann", "secret1").await.unwrap().access_token;

        let patch = AccountPatch {
            password: Some(Password::parse("new-secret").unwrap()),
            ..AccountPatch::default()
        };
        h.service.update(&token, ann.id, patch).await.unwrap();

        assert_eq!(h.service.login("ann", "secret1").await, Err(AccountError::InvalidCredentials));
        assert!(h.service.login("ann", "new-secret").await.is_ok());
    }

    #[tokio::test]
    async fn update_to_taken_email_conflicts_but_own_email_does_not() {
        let h = Harness::new();
        h.service.register(registration("ann", "a@x.com", "+10000000000")).await.unwrap();
        let bob = h.service.register(registration("bob", "b@x.com", "+20000000000")).await.unwrap();
        let token = h.service.login("bob", "secret1").await.unwrap().access_token;

        let taken = AccountPatch {
            email: Some(Email::parse("a@x.com").unwrap()),
            ..AccountPatch::default()
        };
        assert_eq!(
            h.service.update(&token, bob.id, taken).await,
            Err(AccountError::ValidationConflict(ConflictSet::of(ConflictingField::Email)))
        );

        let own = AccountPatch {
            email: Some(Email::parse("b@x.com").unwrap()),
            notification_pref: Some(1),
            ..AccountPatch::default()
        };
        let updated = h.service.update(&token, bob.id, own).await.unwrap();
        assert_eq!(updated.notification_pref, 1);
    }

    #[tokio::test]
    async fn empty_patch_returns_current_profile() {
        let h = Harness::new();
        let ann = h.service.register(registration("ann", "a@x.com", "+10000000000")).await.unwrap();
        let token = h.service.login("ann", "secret1").await.unwrap().access_token;

        let profile = h.service.update(&token, ann.id, AccountPatch::default()).await.unwrap();
        assert_eq!(profile.id, ann.id);
    }

    #[tokio::test]
    async fn clearing_device_is_distinct_from_leaving_it() {
        let h = Harness::new();
        let ann = h.service.register(registration("ann", "a@x.com", "+10000000000")).await.unwrap();
        let token = h.service.login("ann", "secret1").await.unwrap().access_token;

        let set = AccountPatch {
            device_id: Some(Some(omniven_accounts::DeviceId::parse("pixel-7").unwrap())),
            ..AccountPatch::default()
        };
        let profile = h.service.update(&token, ann.id, set).await.unwrap();
        assert_eq!(profile.device_id.as_ref().map(|d| d.as_str()), Some("pixel-7"));

        let leave = AccountPatch {
            notification_pref: Some(1),
            ..AccountPatch::default()
        };
        let profile = h.service.update(&token, ann.id, leave).await.unwrap();
        assert!(profile.device_id.is_some());

        let clear = AccountPatch {
            device_id: Some(None),
            ..AccountPatch::default()
        };
        let profile = h.service.update(&token, ann.id, clear).await.unwrap();
        assert_eq!(profile.device_id, None);
    }

    #[tokio::test]
    async fn admin_can_create_accounts_with_status() {
        let h = Harness::new();
        let admin_token = h.admin_token().await;

        let profile = h
            .service
            .create_account(&admin_token, registration("carl", "c@x.com", "+30000000000"), AccountStatus::ADMIN)
            .await
            .unwrap();
        assert!(profile.status.is_admin());

        h.service.register(registration("ann", "a@x.com", "+10000000000")).await.unwrap();
        let ann_token = h.service.login("ann", "secret1").await.unwrap().access_token;
        assert_eq!(
            h.service
                .create_account(&ann_token, registration("dave", "d@x.com", "+40000000000"), AccountStatus::REGULAR)
                .await,
            Err(AccountError::Forbidden)
        );
    }
}

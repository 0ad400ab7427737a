//! Shared fixtures for infra unit and scenario tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use omniven_accounts::{Email, NewAccount, Password, PhoneNumber, Registration, Username};
use omniven_auth::{AccountStatus, Argon2Hasher, CredentialHasher, PasswordDigest, SigningSecret, TokenService};
use omniven_core::{Clock, ManualClock};

use crate::{AccountService, InMemoryCompanyRegistry, InMemoryUserStore};

pub const PASSWORD: &str = "secret1";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// Argon2id at minimum cost so tests stay fast.
pub fn cheap_hasher() -> Arc<dyn CredentialHasher> {
    Arc::new(Argon2Hasher::with_cost(256, 1, 1).unwrap())
}

pub fn token_service() -> TokenService {
    TokenService::with_default_validity(&SigningSecret::new("integration-secret-0123").unwrap())
}

/// Insert record with a placeholder digest no password matches.
pub fn new_account(username: &str, email: &str, phone: &str) -> NewAccount {
    NewAccount {
        company_id: None,
        email: Email::parse(email).unwrap(),
        username: Username::parse(username).unwrap(),
        password_hash: PasswordDigest::from_stored("not-a-phc-string"),
        phone_number: PhoneNumber::parse(phone).unwrap(),
        status: AccountStatus::REGULAR,
        expires_at: None,
        notification_pref: 0,
        device_id: None,
    }
}

pub fn new_account_with_password(
    hasher: &dyn CredentialHasher,
    username: &str,
    email: &str,
    phone: &str,
    password: &str,
) -> NewAccount {
    NewAccount {
        password_hash: hasher.hash(password).unwrap(),
        ..new_account(username, email, phone)
    }
}

/// Registration with password [`PASSWORD`].
pub fn registration(username: &str, email: &str, phone: &str) -> Registration {
    Registration {
        email: Email::parse(email).unwrap(),
        username: Username::parse(username).unwrap(),
        password: Password::parse(PASSWORD).unwrap(),
        phone_number: PhoneNumber::parse(phone).unwrap(),
        company_id: None,
    }
}

/// Fully wired in-memory service with a manual clock.
pub struct Harness {
    pub service: AccountService<InMemoryUserStore, InMemoryCompanyRegistry>,
    pub store: Arc<InMemoryUserStore>,
    pub clock: Arc<ManualClock>,
    pub hasher: Arc<dyn CredentialHasher>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_companies(InMemoryCompanyRegistry::accept_all())
    }

    pub fn with_companies(companies: InMemoryCompanyRegistry) -> Self {
        omniven_observability::init_for_tests();

        let store = Arc::new(InMemoryUserStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let hasher = cheap_hasher();
        let service = AccountService::new(
            Arc::clone(&store),
            Arc::new(companies),
            token_service(),
            Arc::clone(&hasher),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        Self {
            service,
            store,
            clock,
            hasher,
        }
    }

    /// Seed an administrator (`root`) and log in as it.
    pub async fn admin_token(&self) -> String {
        let mut record = new_account_with_password(
            self.hasher.as_ref(),
            "root",
            "root@x.com",
            "+99999999999",
            PASSWORD,
        );
        record.status = AccountStatus::ADMIN;
        self.service.directory().create(record).await.unwrap();
        self.service.login("root", PASSWORD).await.unwrap().access_token
    }
}

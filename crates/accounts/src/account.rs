use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use omniven_auth::{AccountStatus, PasswordDigest, Principal};
use omniven_core::{CompanyId, DomainError, UserId};

use crate::fields::{DeviceId, Email, Password, PhoneNumber, Username};
use crate::patch::StoredPatch;

/// A mobile user account as held by the store.
///
/// # Invariants
/// - `id` is assigned by the store and immutable.
/// - `email`, `username`, `phone_number` are each unique among live accounts.
/// - `password_hash` never leaves the service: use [`UserAccount::profile`]
///   for any outward representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub company_id: Option<CompanyId>,
    pub email: Email,
    pub username: Username,
    pub password_hash: PasswordDigest,
    pub phone_number: PhoneNumber,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub expires_at: Option<NaiveDate>,
    pub notification_pref: i16,
    pub device_id: Option<DeviceId>,
}

impl UserAccount {
    /// Materialize a freshly inserted record.
    pub fn from_new(id: UserId, new: NewAccount, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            company_id: new.company_id,
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            phone_number: new.phone_number,
            status: new.status,
            created_at,
            last_login_at: None,
            expires_at: new.expires_at,
            notification_pref: new.notification_pref,
            device_id: new.device_id,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            company_id: self.company_id,
            email: self.email.clone(),
            username: self.username.clone(),
            phone_number: self.phone_number.clone(),
            status: self.status,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
            expires_at: self.expires_at,
            notification_pref: self.notification_pref,
            device_id: self.device_id.clone(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.username.as_str(), self.status)
    }

    /// Apply a stored patch in place. `id` and `created_at` never change.
    pub fn apply(&mut self, patch: &StoredPatch) {
        if let Some(company_id) = patch.company_id {
            self.company_id = company_id;
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(hash) = &patch.password_hash {
            self.password_hash = hash.clone();
        }
        if let Some(phone) = &patch.phone_number {
            self.phone_number = phone.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(expires_at) = patch.expires_at {
            self.expires_at = expires_at;
        }
        if let Some(pref) = patch.notification_pref {
            self.notification_pref = pref;
        }
        if let Some(device_id) = &patch.device_id {
            self.device_id = device_id.clone();
        }
        if let Some(at) = patch.last_login_at {
            self.last_login_at = Some(at);
        }
    }
}

/// Outward view of an account. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub company_id: Option<CompanyId>,
    pub email: Email,
    pub username: Username,
    pub phone_number: PhoneNumber,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub expires_at: Option<NaiveDate>,
    pub notification_pref: i16,
    pub device_id: Option<DeviceId>,
}

/// Record handed to the directory for insertion.
///
/// The store assigns `id`; the directory stamps `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub company_id: Option<CompanyId>,
    pub email: Email,
    pub username: Username,
    pub password_hash: PasswordDigest,
    pub phone_number: PhoneNumber,
    pub status: AccountStatus,
    pub expires_at: Option<NaiveDate>,
    pub notification_pref: i16,
    pub device_id: Option<DeviceId>,
}

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: Email,
    pub username: Username,
    pub password: Password,
    pub phone_number: PhoneNumber,
    pub company_id: Option<CompanyId>,
}

/// Raw registration payload as received from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub phone_number: String,
    #[serde(default)]
    pub company_id: Option<i64>,
}

impl TryFrom<RegistrationRequest> for Registration {
    type Error = DomainError;

    fn try_from(req: RegistrationRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            email: Email::parse(&req.email)?,
            username: Username::parse(&req.username)?,
            password: Password::parse(&req.password)?,
            phone_number: PhoneNumber::parse(&req.phone_number)?,
            company_id: req.company_id.map(CompanyId::new).transpose()?,
        })
    }
}

//! Partial account updates.
//!
//! Every field is independently present or absent. For nullable columns the
//! outer `Option` is presence and the inner one is the new value, so
//! "clear the device" (`Some(None)`) is distinct from "leave it" (`None`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use omniven_auth::{AccountStatus, PasswordDigest};
use omniven_core::{CompanyId, DomainError};

use crate::fields::{DeviceId, Email, Password, PhoneNumber, Username};

/// Caller-facing patch (plaintext password, not yet hashed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub company_id: Option<Option<CompanyId>>,
    pub email: Option<Email>,
    pub username: Option<Username>,
    pub password: Option<Password>,
    pub phone_number: Option<PhoneNumber>,
    pub status: Option<AccountStatus>,
    pub expires_at: Option<Option<NaiveDate>>,
    pub notification_pref: Option<i16>,
    pub device_id: Option<Option<DeviceId>>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Company the patch associates the account with, if it sets one.
    pub fn new_company(&self) -> Option<CompanyId> {
        self.company_id.flatten()
    }

    /// Swap the plaintext password for its digest.
    pub fn into_stored(self, password_hash: Option<PasswordDigest>) -> StoredPatch {
        StoredPatch {
            company_id: self.company_id,
            email: self.email,
            username: self.username,
            password_hash,
            phone_number: self.phone_number,
            status: self.status,
            expires_at: self.expires_at,
            notification_pref: self.notification_pref,
            device_id: self.device_id,
            last_login_at: None,
        }
    }
}

/// Patch as the store applies it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredPatch {
    pub company_id: Option<Option<CompanyId>>,
    pub email: Option<Email>,
    pub username: Option<Username>,
    pub password_hash: Option<PasswordDigest>,
    pub phone_number: Option<PhoneNumber>,
    pub status: Option<AccountStatus>,
    pub expires_at: Option<Option<NaiveDate>>,
    pub notification_pref: Option<i16>,
    pub device_id: Option<Option<DeviceId>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl StoredPatch {
    /// Patch that only records a successful login.
    pub fn login_at(at: DateTime<Utc>) -> Self {
        Self {
            last_login_at: Some(at),
            ..Self::default()
        }
    }
}

/// Raw update payload as received from a client.
///
/// Missing keys are "unchanged"; an explicit `null` on a nullable field clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdateRequest {
    #[serde(default, deserialize_with = "present")]
    pub company_id: Option<Option<i64>>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub status: Option<i16>,
    #[serde(default, deserialize_with = "present")]
    pub expires_at: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub notification_pref: Option<i16>,
    #[serde(default, deserialize_with = "present")]
    pub device_id: Option<Option<String>>,
}

/// Marks a key as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl TryFrom<ProfileUpdateRequest> for AccountPatch {
    type Error = DomainError;

    fn try_from(req: ProfileUpdateRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            company_id: req
                .company_id
                .map(|c| c.map(CompanyId::new).transpose())
                .transpose()?,
            email: req.email.as_deref().map(Email::parse).transpose()?,
            username: req.username.as_deref().map(Username::parse).transpose()?,
            password: req.password.as_deref().map(Password::parse).transpose()?,
            phone_number: req.phone_number.as_deref().map(PhoneNumber::parse).transpose()?,
            status: req.status.map(AccountStatus::new).transpose()?,
            expires_at: req.expires_at,
            notification_pref: req.notification_pref,
            device_id: req
                .device_id
                .map(|d| d.as_deref().map(DeviceId::parse).transpose())
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> AccountPatch {
        let req: ProfileUpdateRequest = serde_json::from_value(value).unwrap();
        AccountPatch::try_from(req).unwrap()
    }

    #[test]
    fn missing_and_null_are_distinct() {
        let untouched = parse(json!({}));
        assert!(untouched.is_empty());

        let cleared = parse(json!({ "device_id": null, "company_id": null }));
        assert_eq!(cleared.device_id, Some(None));
        assert_eq!(cleared.company_id, Some(None));
        assert!(!cleared.is_empty());

        let set = parse(json!({ "device_id": "iPhone13,4", "company_id": 7 }));
        assert_eq!(set.device_id, Some(Some(DeviceId::parse("iPhone13,4").unwrap())));
        assert_eq!(set.new_company(), Some(CompanyId::new(7).unwrap()));
    }

    #[test]
    fn fields_are_validated() {
        for bad in [
            json!({ "email": "nope" }),
            json!({ "username": "ab" }),
            json!({ "password": "123" }),
            json!({ "status": 6 }),
            json!({ "company_id": -1 }),
        ] {
            let req: ProfileUpdateRequest = serde_json::from_value(bad.clone()).unwrap();
            assert!(AccountPatch::try_from(req).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn into_stored_carries_digest_not_password() {
        let patch = parse(json!({ "password": "newpassword" }));
        let digest = PasswordDigest::from_stored("$argon2id$digest");
        let stored = patch.into_stored(Some(digest.clone()));
        assert_eq!(stored.password_hash, Some(digest));
        assert_eq!(stored.last_login_at, None);
    }
}

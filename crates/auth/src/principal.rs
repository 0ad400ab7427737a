use serde::{Deserialize, Serialize};

use omniven_core::{DomainError, UserId};

/// Small-integer account state.
///
/// Only `5` carries a defined meaning (administrator). Values `0..=4` are
/// opaque account states and are never admin-equivalent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct AccountStatus(i16);

impl AccountStatus {
    pub const MIN: i16 = 0;
    pub const MAX: i16 = 5;

    /// Status assigned to self-registered accounts.
    pub const REGULAR: AccountStatus = AccountStatus(1);

    /// Administrator sentinel.
    pub const ADMIN: AccountStatus = AccountStatus(5);

    pub fn new(value: i16) -> Result<Self, DomainError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::validation(format!(
                "status must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i16 {
        self.0
    }

    pub fn is_admin(self) -> bool {
        self == Self::ADMIN
    }
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self::REGULAR
    }
}

impl TryFrom<i16> for AccountStatus {
    type Error = DomainError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountStatus> for i16 {
    fn from(value: AccountStatus) -> Self {
        value.0
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The verified caller of a protected operation.
///
/// Built from a live account record after its token has been verified; the
/// access decision only ever looks at `id` and `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub username: String,
    pub status: AccountStatus,
}

impl Principal {
    pub fn new(id: UserId, username: impl Into<String>, status: AccountStatus) -> Self {
        Self {
            id,
            username: username.into(),
            status,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.status.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_five_is_admin() {
        for raw in 0..=4 {
            assert!(!AccountStatus::new(raw).unwrap().is_admin(), "status {raw}");
        }
        assert!(AccountStatus::new(5).unwrap().is_admin());
    }

    #[test]
    fn out_of_range_status_is_rejected() {
        assert!(AccountStatus::new(-1).is_err());
        assert!(AccountStatus::new(6).is_err());
    }

    #[test]
    fn default_status_is_regular() {
        assert_eq!(AccountStatus::default().get(), 1);
    }
}

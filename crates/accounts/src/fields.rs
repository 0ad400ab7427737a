//! Validated account fields.
//!
//! Each type can only be built through `parse`, which enforces the format
//! rules for that field. `from_stored` skips validation and is reserved for
//! values read back from the store and for exact-match lookups.

use serde::Serialize;

use omniven_core::{DomainError, DomainResult};

const EMAIL_MAX: usize = 100;
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 255;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 255;
const PHONE_MIN: usize = 5;
const PHONE_MAX: usize = 20;
const DEVICE_MAX: usize = 255;

macro_rules! string_value_object {
    ($t:ident) => {
        impl $t {
            /// Wrap a value loaded from storage (already validated on the way in).
            pub fn from_stored(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

/// Email address, case-folded at creation so uniqueness is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value = raw.trim().to_lowercase();
        if value.is_empty() || value.len() > EMAIL_MAX {
            return Err(DomainError::validation(format!(
                "email must be 1-{EMAIL_MAX} characters"
            )));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("email must not contain whitespace"));
        }

        let (local, domain) = value
            .split_once('@')
            .ok_or_else(|| DomainError::validation("email must contain '@'"))?;
        if local.is_empty() || domain.contains('@') {
            return Err(DomainError::validation("email must have exactly one '@' and a local part"));
        }
        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err(DomainError::validation("email domain is invalid"));
        }

        Ok(Self(value))
    }
}

string_value_object!(Email);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value = raw.trim();
        let len = value.chars().count();
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
            return Err(DomainError::validation(format!(
                "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
            )));
        }
        Ok(Self(value.to_string()))
    }
}

string_value_object!(Username);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Digits, spaces and `+-()` only.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value = raw.trim();
        let len = value.chars().count();
        if !(PHONE_MIN..=PHONE_MAX).contains(&len) {
            return Err(DomainError::validation(format!(
                "phone number must be {PHONE_MIN}-{PHONE_MAX} characters"
            )));
        }
        let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')');
        if !value.chars().all(allowed) {
            return Err(DomainError::validation("phone number contains invalid characters"));
        }
        Ok(Self(value.to_string()))
    }
}

string_value_object!(PhoneNumber);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        if raw.chars().count() > DEVICE_MAX {
            return Err(DomainError::validation(format!(
                "device must be at most {DEVICE_MAX} characters"
            )));
        }
        Ok(Self(raw.to_string()))
    }
}

string_value_object!(DeviceId);

/// Plaintext password on its way to the hasher.
///
/// Not `Serialize`, redacted in `Debug`, and never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let len = raw.chars().count();
        if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
            return Err(DomainError::validation(format!(
                "password must be {PASSWORD_MIN}-{PASSWORD_MAX} characters"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Password {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Password(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_case_folded() {
        let email = Email::parse("  Ann@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "ann@example.com");
    }

    #[test]
    fn email_shape_is_enforced() {
        for bad in ["", "ann", "@x.com", "ann@x", "ann@@x.com", "a b@x.com", "ann@x..com", "ann@.com"] {
            assert!(Email::parse(bad).is_err(), "{bad:?} should be rejected");
        }
        let too_long = format!("{}@x.com", "a".repeat(100));
        assert!(Email::parse(&too_long).is_err());
    }

    #[test]
    fn username_length_bounds() {
        assert!(Username::parse("ab").is_err());
        assert!(Username::parse("ann").is_ok());
        assert!(Username::parse(&"u".repeat(255)).is_ok());
        assert!(Username::parse(&"u".repeat(256)).is_err());
        assert!(Username::parse("   ").is_err());
    }

    #[test]
    fn phone_number_pattern() {
        assert!(PhoneNumber::parse("+10000000000").is_ok());
        assert!(PhoneNumber::parse("+90 (500) 400-3020").is_ok());
        assert!(PhoneNumber::parse("1234").is_err());
        assert!(PhoneNumber::parse("+1000000000000000000000").is_err());
        assert!(PhoneNumber::parse("+1-800-FLOWERS").is_err());
    }

    #[test]
    fn password_length_and_redaction() {
        assert!(Password::parse("12345").is_err());
        let password = Password::parse("secret1").unwrap();
        assert_eq!(password.expose(), "secret1");
        assert_eq!(format!("{password:?}"), "Password(***)");
    }

    #[test]
    fn device_id_is_bounded() {
        assert!(DeviceId::parse("iPhone13,4").is_ok());
        assert!(DeviceId::parse(&"d".repeat(256)).is_err());
    }
}

//! Signing key handling.

use thiserror::Error;

/// Minimum accepted key length for HS256.
pub const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("signing secret not configured: {0}")]
    Missing(String),

    #[error("signing secret too short: {actual} bytes (minimum {min})")]
    TooShort { min: usize, actual: usize },
}

/// Server-held symmetric signing key. Opaque, immutable once loaded.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, SecretError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(SecretError::TooShort {
                min: MIN_SECRET_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SigningSecret(***)")
    }
}

/// Supplies the signing key at startup.
pub trait SecretProvider: Send + Sync {
    fn signing_secret(&self) -> Result<SigningSecret, SecretError>;
}

/// Fixed in-process key (tests, embedded use).
#[derive(Debug, Clone)]
pub struct StaticSecretProvider {
    secret: SigningSecret,
}

impl StaticSecretProvider {
    pub fn new(secret: SigningSecret) -> Self {
        Self { secret }
    }
}

impl SecretProvider for StaticSecretProvider {
    fn signing_secret(&self) -> Result<SigningSecret, SecretError> {
        Ok(self.secret.clone())
    }
}

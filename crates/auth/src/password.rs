//! One-way credential hashing.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`),
//! so the algorithm, cost parameters and the per-call random salt travel with
//! the digest and verification never needs outside configuration.

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};
use thiserror::Error;

const SALT_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("salt generation failed: {0}")]
    Salt(String),

    #[error("invalid hashing parameters: {0}")]
    Params(String),

    #[error("hashing failed: {0}")]
    Hash(String),
}

/// Opaque stored password digest.
///
/// Never equal to the plaintext. Deliberately not `Serialize` and redacted in
/// `Debug`, so it cannot leak through a response body or a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap a digest loaded from storage.
    pub fn from_stored(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordDigest(***)")
    }
}

pub trait CredentialHasher: Send + Sync {
    /// Hash `plaintext` with a fresh random salt.
    fn hash(&self, plaintext: &str) -> Result<PasswordDigest, HashError>;

    /// Constant-time check of `plaintext` against `digest`.
    ///
    /// Returns `false` for malformed digests instead of failing.
    fn verify(&self, plaintext: &str, digest: &PasswordDigest) -> bool;
}

/// Argon2id hasher.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Hasher with the argon2 crate's default cost parameters.
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Hasher with explicit cost parameters (memory KiB, iterations, lanes).
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, HashError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| HashError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    fn engine(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<PasswordDigest, HashError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| HashError::Salt(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| HashError::Salt(e.to_string()))?;

        let phc = self
            .engine()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Hash(e.to_string()))?
            .to_string();
        Ok(PasswordDigest(phc))
    }

    fn verify(&self, plaintext: &str, digest: &PasswordDigest) -> bool {
        // Cost parameters come from the digest itself, not from `self`.
        match PasswordHash::new(digest.as_str()) {
            Ok(parsed) => Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Minimal cost keeps the property runs fast; the algorithm is unchanged.
    fn fast_hasher() -> Argon2Hasher {
        Argon2Hasher::with_cost(256, 1, 1).unwrap()
    }

    #[test]
    fn digest_is_phc_and_never_the_plaintext() {
        let digest = fast_hasher().hash("secret1").unwrap();
        assert_ne!(digest.as_str(), "secret1");
        assert!(digest.as_str().starts_with("$argon2id$"));
    }

    #[test]
    fn digest_debug_is_redacted() {
        let digest = fast_hasher().hash("secret1").unwrap();
        assert_eq!(format!("{digest:?}"), "PasswordDigest(***)");
    }

    #[test]
    fn malformed_digest_verifies_false() {
        let hasher = fast_hasher();
        assert!(!hasher.verify("secret1", &PasswordDigest::from_stored("")));
        assert!(!hasher.verify("secret1", &PasswordDigest::from_stored("secret1")));
        assert!(!hasher.verify("secret1", &PasswordDigest::from_stored("$argon2id$v=19$garbage")));
    }

    #[test]
    fn digest_from_another_cost_still_verifies() {
        let stored = fast_hasher().hash("secret1").unwrap();
        let other = Argon2Hasher::with_cost(512, 2, 1).unwrap();
        assert!(other.verify("secret1", &stored));
    }

    #[test]
    fn invalid_cost_is_rejected() {
        assert!(matches!(Argon2Hasher::with_cost(0, 0, 0), Err(HashError::Params(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 16,
            ..ProptestConfig::default()
        })]

        /// Property: hashing is salted (two digests differ) and both verify.
        #[test]
        fn hash_then_verify_accepts_and_salts(p in "\\PC{0,32}") {
            let hasher = fast_hasher();
            let a = hasher.hash(&p).unwrap();
            let b = hasher.hash(&p).unwrap();
            prop_assert_ne!(a.as_str(), b.as_str());
            prop_assert!(hasher.verify(&p, &a));
            prop_assert!(hasher.verify(&p, &b));
        }

        /// Property: a digest never verifies a different plaintext.
        #[test]
        fn different_plaintext_is_rejected(p1 in "\\PC{1,24}", p2 in "\\PC{1,24}") {
            prop_assume!(p1 != p2);
            let hasher = fast_hasher();
            let digest = hasher.hash(&p2).unwrap();
            prop_assert!(!hasher.verify(&p1, &digest));
        }
    }
}

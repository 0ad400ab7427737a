//! `omniven-auth` — pure authentication/authorization core.
//!
//! Password hashing, bearer-token issuance/verification and the
//! owner-or-admin access decision. This crate is intentionally decoupled from
//! HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod principal;
pub mod secret;
pub mod token;

pub use authorize::{AuthzError, require_admin, require_owner_or_admin};
pub use claims::{AccessClaims, TokenError, TokenIdentity, validate_claims};
pub use password::{Argon2Hasher, CredentialHasher, HashError, PasswordDigest};
pub use principal::{AccountStatus, Principal};
pub use secret::{SecretError, SecretProvider, SigningSecret, StaticSecretProvider};
pub use token::{AccessToken, DEFAULT_VALIDITY_DAYS, TokenService};

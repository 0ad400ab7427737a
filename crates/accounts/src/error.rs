//! Outward error taxonomy.
//!
//! Every failure an account operation can report maps to exactly one variant,
//! each with a stable external code. Internal causes (store messages, hashing
//! failures) are logged where they occur and never carried here.

use serde_json::{Map, Value, json};
use thiserror::Error;

use omniven_auth::AuthzError;
use omniven_core::DomainError;

use crate::conflict::ConflictSet;

pub type AccountResult<T> = Result<T, AccountError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Duplicate email/username/phone; always lists the offending fields.
    #[error("validation errors: {0}")]
    ValidationConflict(ConflictSet),

    #[error("user not found")]
    NotFound,

    #[error("insufficient permissions")]
    Forbidden,

    /// Token missing, invalid, expired or orphaned. Deliberately undifferentiated.
    #[error("could not validate credentials")]
    Unauthorized,

    /// Login failure. Unknown user and wrong password are indistinguishable.
    #[error("incorrect username or password")]
    InvalidCredentials,

    /// The store rejected an insert that passed the uniqueness pre-check.
    #[error("user creation failed")]
    CreationFailed,

    #[error("storage unavailable")]
    StoreUnavailable,

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("internal error")]
    Internal,
}

impl AccountError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationConflict(_) => "validation_conflict",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Unauthorized => "unauthorized",
            Self::InvalidCredentials => "invalid_credentials",
            Self::CreationFailed => "creation_failed",
            Self::StoreUnavailable => "store_unavailable",
            Self::Malformed(_) => "malformed",
            Self::Internal => "internal_error",
        }
    }

    /// HTTP-equivalent status for the transport layer.
    pub fn status(&self) -> u16 {
        match self {
            Self::ValidationConflict(_) | Self::Malformed(_) => 400,
            Self::Unauthorized | Self::InvalidCredentials => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::CreationFailed => 409,
            Self::StoreUnavailable => 503,
            Self::Internal => 500,
        }
    }

    /// Stable `{ "error", "message", "fields"? }` body.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });

        if let (Self::ValidationConflict(fields), Some(obj)) = (self, body.as_object_mut()) {
            let detail: Map<String, Value> = fields
                .iter()
                .map(|f| (f.as_str().to_string(), Value::from(f.message())))
                .collect();
            obj.insert("fields".to_string(), Value::Object(detail));
        }

        body
    }
}

impl From<DomainError> for AccountError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Malformed(msg),
        }
    }
}

impl From<AuthzError> for AccountError {
    fn from(_: AuthzError) -> Self {
        Self::Forbidden
    }
}

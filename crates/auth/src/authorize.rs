use thiserror::Error;

use omniven_core::UserId;

use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
}

/// Admin-only gate.
///
/// - No IO
/// - No panics
/// - Must be evaluated before the guarded operation touches storage
pub fn require_admin(caller: &Principal) -> Result<(), AuthzError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::Forbidden("admin privileges required"))
    }
}

/// Owner-or-admin gate for operations that target a single account.
///
/// The decision never depends on whether `target` exists, so a denial does not
/// reveal anything about other accounts.
pub fn require_owner_or_admin(caller: &Principal, target: UserId) -> Result<(), AuthzError> {
    if caller.id == target || caller.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::Forbidden("insufficient permissions"))
    }
}

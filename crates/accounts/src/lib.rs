//! `omniven-accounts` — mobile user account domain model.
//!
//! Validated field types, the account record and its public profile view,
//! registration/patch inputs, and the outward error taxonomy. No I/O.

pub mod account;
pub mod conflict;
pub mod error;
pub mod fields;
pub mod patch;

pub use account::{NewAccount, Registration, RegistrationRequest, UserAccount, UserProfile};
pub use conflict::{ConflictSet, ConflictingField};
pub use error::{AccountError, AccountResult};
pub use fields::{DeviceId, Email, Password, PhoneNumber, Username};
pub use patch::{AccountPatch, ProfileUpdateRequest, StoredPatch};

//! Username/password verification.

use std::sync::Arc;

use omniven_accounts::{UserAccount, Username};
use omniven_auth::{CredentialHasher, PasswordDigest};

use crate::directory::UserDirectory;
use crate::user_store::{StoreError, UserStore};

pub struct Authenticator<S> {
    directory: UserDirectory<S>,
    hasher: Arc<dyn CredentialHasher>,
    /// Verified against when the username is unknown, so both failure paths
    /// cost one hash verification.
    decoy: Option<PasswordDigest>,
}

impl<S> Clone for Authenticator<S> {
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            hasher: Arc::clone(&self.hasher),
            decoy: self.decoy.clone(),
        }
    }
}

impl<S: UserStore> Authenticator<S> {
    pub fn new(directory: UserDirectory<S>, hasher: Arc<dyn CredentialHasher>) -> Self {
        let decoy = hasher.hash("decoy-password").ok();
        Self {
            directory,
            hasher,
            decoy,
        }
    }

    /// The account when `password` matches, `None` otherwise.
    ///
    /// Unknown username and wrong password are indistinguishable in the
    /// result. The username is matched exactly as given, without trimming.
    /// Recording the login time is left to the caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserAccount>, StoreError> {
        let account = if username.is_empty() {
            None
        } else {
            self.directory.find_by_username(&Username::from_stored(username)).await?
        };

        match account {
            Some(account) if self.hasher.verify(password, &account.password_hash) => Ok(Some(account)),
            Some(_) => Ok(None),
            None => {
                if let Some(decoy) = &self.decoy {
                    let _ = self.hasher.verify(password, decoy);
                }
                Ok(None)
            }
        }
    }
}

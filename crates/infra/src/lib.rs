//! Infrastructure layer: stores, account orchestration, config.
//!
//! The directory/authenticator/session/service types here only see storage
//! through the [`UserStore`] and [`CompanyRegistry`] traits; concrete
//! in-memory and Postgres adapters live alongside them.

pub mod account_service;
pub mod authenticator;
pub mod bootstrap;
pub mod company;
pub mod config;
pub mod directory;
pub mod session;
pub mod user_store;

#[cfg(test)]
mod test_support;

pub use account_service::AccountService;
pub use authenticator::Authenticator;
pub use company::{CompanyRegistry, InMemoryCompanyRegistry, PostgresCompanyRegistry};
pub use config::{EnvSecretProvider, Settings};
pub use directory::UserDirectory;
pub use session::SessionResolver;
pub use user_store::{InMemoryUserStore, PostgresUserStore, StoreError, UniquenessProbe, UserStore};
